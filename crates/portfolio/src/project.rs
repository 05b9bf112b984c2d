use keyscape_keycaps::{LogicalKey, TECH_STACKS};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::PortfolioError;

/// A stored project. Timestamps are Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub tech_stack: String,
    #[serde(default)]
    pub project_link: Option<String>,
    #[serde(default)]
    pub github_link: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Project {
    /// The keyboard key this project is filed under.
    pub fn key(&self) -> Option<LogicalKey> {
        LogicalKey::from_tech_stack(&self.tech_stack)
    }
}

/// User-editable fields of a project, as entered in the admin panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectDraft {
    pub title: String,
    pub description: String,
    pub tech_stack: String,
    pub project_link: Option<String>,
    pub github_link: Option<String>,
    pub image_url: Option<String>,
}

impl ProjectDraft {
    pub fn new(title: impl Into<String>, tech_stack: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            tech_stack: tech_stack.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), PortfolioError> {
        if self.title.trim().is_empty() {
            return Err(PortfolioError::MissingField("title"));
        }
        if self.tech_stack.trim().is_empty() {
            return Err(PortfolioError::MissingField("tech_stack"));
        }
        if !TECH_STACKS.contains(&self.tech_stack.as_str()) {
            return Err(PortfolioError::UnknownTechStack(self.tech_stack.clone()));
        }
        Ok(())
    }

    /// Validate and turn into a new project stamped `now`.
    pub(crate) fn into_project(self, now: u64) -> Result<Project, PortfolioError> {
        self.validate()?;
        Ok(Project {
            id: Uuid::new_v4(),
            title: self.title.trim().to_string(),
            description: self.description,
            tech_stack: self.tech_stack,
            project_link: non_empty(self.project_link),
            github_link: non_empty(self.github_link),
            image_url: non_empty(self.image_url),
            created_at: now,
            updated_at: now,
        })
    }

    /// Validate and overwrite the editable fields of `project`.
    pub(crate) fn apply_to(self, project: &mut Project, now: u64) -> Result<(), PortfolioError> {
        self.validate()?;
        project.title = self.title.trim().to_string();
        project.description = self.description;
        project.tech_stack = self.tech_stack;
        project.project_link = non_empty(self.project_link);
        project.github_link = non_empty(self.github_link);
        project.image_url = non_empty(self.image_url);
        project.updated_at = now;
        Ok(())
    }
}

impl From<&Project> for ProjectDraft {
    fn from(p: &Project) -> Self {
        Self {
            title: p.title.clone(),
            description: p.description.clone(),
            tech_stack: p.tech_stack.clone(),
            project_link: p.project_link.clone(),
            github_link: p.github_link.clone(),
            image_url: p.image_url.clone(),
        }
    }
}

/// Form fields left blank are stored as absent.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_and_stack_are_required() {
        assert!(matches!(
            ProjectDraft::new("  ", "C").validate(),
            Err(PortfolioError::MissingField("title"))
        ));
        assert!(matches!(
            ProjectDraft::new("Shell", "").validate(),
            Err(PortfolioError::MissingField("tech_stack"))
        ));
        assert!(ProjectDraft::new("Shell", "C").validate().is_ok());
    }

    #[test]
    fn stack_must_be_known() {
        let err = ProjectDraft::new("Thing", "COBOL").validate().unwrap_err();
        assert!(matches!(err, PortfolioError::UnknownTechStack(s) if s == "COBOL"));
    }

    #[test]
    fn blank_links_become_absent() {
        let draft = ProjectDraft {
            github_link: Some("".into()),
            project_link: Some("https://example.com".into()),
            ..ProjectDraft::new(" Portfolio ", "React")
        };
        let project = draft.into_project(42).unwrap();
        assert_eq!(project.title, "Portfolio");
        assert_eq!(project.github_link, None);
        assert_eq!(project.project_link.as_deref(), Some("https://example.com"));
        assert_eq!(project.created_at, 42);
        assert_eq!(project.key(), Some(LogicalKey::React));
    }

    #[test]
    fn apply_keeps_identity_and_creation_time() {
        let mut project = ProjectDraft::new("Old", "C").into_project(1).unwrap();
        let id = project.id;
        ProjectDraft::new("New", "Python")
            .apply_to(&mut project, 5)
            .unwrap();
        assert_eq!(project.id, id);
        assert_eq!(project.created_at, 1);
        assert_eq!(project.updated_at, 5);
        assert_eq!(project.tech_stack, "Python");
    }
}
