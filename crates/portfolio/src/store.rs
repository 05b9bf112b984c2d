//! Project storage.
//!
//! [`LocalProjectStore`] keeps every project in one JSON document:
//! ```text
//! {
//!   "schema_version": 1,
//!   "projects": [ { "id": "...", "title": "...", ... } ]
//! }
//! ```
//! The document is rewritten on every change, through a temporary file and
//! a rename.

use keyscape_keycaps::LogicalKey;
use serde::Deserialize;
use std::cmp::Reverse;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::PortfolioError;
use crate::project::{Project, ProjectDraft, now_ms};

const SCHEMA_VERSION: u32 = 1;

/// Storage contract used by the project list and the admin panel.
pub trait ProjectStore {
    /// Every project, newest first.
    fn fetch_all(&self) -> Result<Vec<Project>, PortfolioError>;

    /// Projects filed under one tech stack label, newest first.
    fn fetch_by_tag(&self, tech_stack: &str) -> Result<Vec<Project>, PortfolioError>;

    fn insert(&mut self, draft: ProjectDraft) -> Result<Project, PortfolioError>;

    fn update(&mut self, id: Uuid, draft: ProjectDraft) -> Result<Project, PortfolioError>;

    fn delete(&mut self, id: Uuid) -> Result<Project, PortfolioError>;
}

/// Projects shown when `key` is pressed. GitHub has no project list.
pub fn projects_for_key(
    store: &dyn ProjectStore,
    key: LogicalKey,
) -> Result<Vec<Project>, PortfolioError> {
    match key.tech_stack() {
        Some(stack) => store.fetch_by_tag(stack),
        None => Ok(Vec::new()),
    }
}

/// Newest first; among equal timestamps the later insert comes first.
fn newest_first<'a>(rows: impl DoubleEndedIterator<Item = &'a Project>) -> Vec<Project> {
    let mut out: Vec<Project> = rows.rev().cloned().collect();
    out.sort_by_key(|p| Reverse(p.created_at));
    out
}

/// Projects held in memory, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryProjectStore {
    rows: Vec<Project>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_projects(rows: Vec<Project>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn rows(&self) -> &[Project] {
        &self.rows
    }
}

impl ProjectStore for MemoryProjectStore {
    fn fetch_all(&self) -> Result<Vec<Project>, PortfolioError> {
        Ok(newest_first(self.rows.iter()))
    }

    fn fetch_by_tag(&self, tech_stack: &str) -> Result<Vec<Project>, PortfolioError> {
        Ok(newest_first(
            self.rows.iter().filter(|p| p.tech_stack == tech_stack),
        ))
    }

    fn insert(&mut self, draft: ProjectDraft) -> Result<Project, PortfolioError> {
        let project = draft.into_project(now_ms())?;
        tracing::debug!(id = %project.id, title = %project.title, "project added");
        self.rows.push(project.clone());
        Ok(project)
    }

    fn update(&mut self, id: Uuid, draft: ProjectDraft) -> Result<Project, PortfolioError> {
        let project = self
            .rows
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(PortfolioError::NotFound(id))?;
        draft.apply_to(project, now_ms())?;
        tracing::debug!(%id, "project updated");
        Ok(project.clone())
    }

    fn delete(&mut self, id: Uuid) -> Result<Project, PortfolioError> {
        let index = self
            .rows
            .iter()
            .position(|p| p.id == id)
            .ok_or(PortfolioError::NotFound(id))?;
        tracing::debug!(%id, "project deleted");
        Ok(self.rows.remove(index))
    }
}

#[derive(Debug, Deserialize)]
struct ProjectFile {
    schema_version: u32,
    projects: Vec<Project>,
}

/// File-backed store with write-through persistence.
#[derive(Debug)]
pub struct LocalProjectStore {
    path: PathBuf,
    memory: MemoryProjectStore,
}

impl LocalProjectStore {
    /// Open the store at `path`, creating an empty document if none exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PortfolioError> {
        let path = path.as_ref().to_path_buf();
        let memory = if path.exists() {
            let file: ProjectFile = serde_json::from_reader(std::fs::File::open(&path)?)?;
            if file.schema_version != SCHEMA_VERSION {
                return Err(PortfolioError::SchemaMismatch {
                    file_version: file.schema_version,
                    expected_version: SCHEMA_VERSION,
                });
            }
            let (valid, invalid): (Vec<Project>, Vec<Project>) = file
                .projects
                .into_iter()
                .partition(|p| ProjectDraft::from(p).validate().is_ok());
            for p in &invalid {
                tracing::warn!(
                    id = %p.id,
                    path = %path.display(),
                    "dropping invalid stored project"
                );
            }
            MemoryProjectStore::with_projects(valid)
        } else {
            let store = MemoryProjectStore::new();
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            write_document(&path, store.rows())?;
            store
        };
        tracing::info!(path = %path.display(), projects = memory.len(), "project store opened");
        Ok(Self { path, memory })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to a copy of the rows and keep it only once the new
    /// document is on disk.
    fn commit<T>(
        &mut self,
        change: impl FnOnce(&mut MemoryProjectStore) -> Result<T, PortfolioError>,
    ) -> Result<T, PortfolioError> {
        let mut next = self.memory.clone();
        let out = change(&mut next)?;
        write_document(&self.path, next.rows())?;
        self.memory = next;
        Ok(out)
    }
}

fn write_document(path: &Path, projects: &[Project]) -> Result<(), PortfolioError> {
    let doc = serde_json::json!({
        "schema_version": SCHEMA_VERSION,
        "projects": projects,
    });
    let tmp = path.with_extension("json.tmp");
    serde_json::to_writer_pretty(std::fs::File::create(&tmp)?, &doc)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

impl ProjectStore for LocalProjectStore {
    fn fetch_all(&self) -> Result<Vec<Project>, PortfolioError> {
        self.memory.fetch_all()
    }

    fn fetch_by_tag(&self, tech_stack: &str) -> Result<Vec<Project>, PortfolioError> {
        self.memory.fetch_by_tag(tech_stack)
    }

    fn insert(&mut self, draft: ProjectDraft) -> Result<Project, PortfolioError> {
        self.commit(|rows| rows.insert(draft))
    }

    fn update(&mut self, id: Uuid, draft: ProjectDraft) -> Result<Project, PortfolioError> {
        self.commit(|rows| rows.update(id, draft))
    }

    fn delete(&mut self, id: Uuid) -> Result<Project, PortfolioError> {
        self.commit(|rows| rows.delete(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamped(title: &str, stack: &str, created_at: u64) -> Project {
        let mut p = ProjectDraft::new(title, stack).into_project(created_at).unwrap();
        p.updated_at = created_at;
        p
    }

    #[test]
    fn listings_are_newest_first() {
        let store = MemoryProjectStore::with_projects(vec![
            stamped("a", "C", 10),
            stamped("b", "Python", 30),
            stamped("c", "C", 20),
        ]);
        let titles: Vec<_> = store
            .fetch_all()
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, ["b", "c", "a"]);

        let c: Vec<_> = store
            .fetch_by_tag("C")
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(c, ["c", "a"]);
    }

    #[test]
    fn equal_timestamps_list_latest_insert_first() {
        let store = MemoryProjectStore::with_projects(vec![
            stamped("first", "Java", 5),
            stamped("second", "Java", 5),
        ]);
        assert_eq!(store.fetch_all().unwrap()[0].title, "second");
    }

    #[test]
    fn insert_rejects_invalid_drafts() {
        let mut store = MemoryProjectStore::new();
        assert!(store.insert(ProjectDraft::new("", "C")).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn update_and_delete_unknown_ids_fail() {
        let mut store = MemoryProjectStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(
            store.update(id, ProjectDraft::new("x", "C")),
            Err(PortfolioError::NotFound(_))
        ));
        assert!(matches!(store.delete(id), Err(PortfolioError::NotFound(_))));
    }

    #[test]
    fn github_key_has_no_projects() {
        let mut store = MemoryProjectStore::new();
        store.insert(ProjectDraft::new("Site", "HTML5")).unwrap();
        assert!(projects_for_key(&store, LogicalKey::Github).unwrap().is_empty());
        assert_eq!(projects_for_key(&store, LogicalKey::Html5).unwrap().len(), 1);
    }

    #[test]
    fn local_store_writes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("projects.json");

        let mut store = LocalProjectStore::open(&path).unwrap();
        assert!(path.exists());
        let kept = store.insert(ProjectDraft::new("Keyboard", "TypeScript")).unwrap();
        let gone = store.insert(ProjectDraft::new("Scratch", "C#")).unwrap();
        store.delete(gone.id).unwrap();
        store
            .update(kept.id, ProjectDraft::new("Keyboard 3D", "TypeScript"))
            .unwrap();
        drop(store);

        let reopened = LocalProjectStore::open(&path).unwrap();
        let all = reopened.fetch_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, kept.id);
        assert_eq!(all[0].title, "Keyboard 3D");
    }

    #[test]
    fn failed_write_leaves_rows_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        let path = data.join("projects.json");

        let mut store = LocalProjectStore::open(&path).unwrap();
        let kept = store.insert(ProjectDraft::new("Keyboard", "TypeScript")).unwrap();
        std::fs::remove_dir_all(&data).unwrap();

        assert!(store.insert(ProjectDraft::new("Ghost", "C")).is_err());
        assert!(
            store
                .update(kept.id, ProjectDraft::new("Renamed", "TypeScript"))
                .is_err()
        );
        assert!(store.delete(kept.id).is_err());

        let all = store.fetch_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, kept.id);
        assert_eq!(all[0].title, "Keyboard");
        assert!(store.fetch_by_tag("C").unwrap().is_empty());
    }

    #[test]
    fn open_drops_invalid_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects.json");
        let good = stamped("Shell", "C", 1);
        let mut bad = stamped("Legacy", "C", 2);
        bad.tech_stack = "COBOL".into();
        let doc = serde_json::json!({"schema_version": 1, "projects": [good, bad]});
        std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

        let store = LocalProjectStore::open(&path).unwrap();
        let all = store.fetch_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Shell");
    }

    #[test]
    fn schema_mismatch_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects.json");
        std::fs::write(&path, r#"{"schema_version": 9, "projects": []}"#).unwrap();
        let err = LocalProjectStore::open(&path).unwrap_err();
        assert!(matches!(
            err,
            PortfolioError::SchemaMismatch {
                file_version: 9,
                expected_version: 1
            }
        ));
    }
}
