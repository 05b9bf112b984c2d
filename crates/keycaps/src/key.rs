use serde::{Deserialize, Serialize};

/// An interactive keycap, decoupled from the scene node names that trigger it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalKey {
    Html5,
    #[serde(rename = "css5", alias = "css")]
    Css,
    Github,
    C,
    Python,
    Typescript,
    React,
    Java,
    Unity,
    Csharp,
    Javascript,
}

/// Tech stacks a project can be filed under, in admin panel order.
pub const TECH_STACKS: &[&str] = &[
    "C",
    "Python",
    "CSS",
    "TypeScript",
    "React",
    "Java",
    "HTML5",
    "Unity",
    "C#",
    "JavaScript",
];

impl LogicalKey {
    pub const ALL: [LogicalKey; 11] = [
        LogicalKey::Html5,
        LogicalKey::Css,
        LogicalKey::Github,
        LogicalKey::C,
        LogicalKey::Python,
        LogicalKey::Typescript,
        LogicalKey::React,
        LogicalKey::Java,
        LogicalKey::Unity,
        LogicalKey::Csharp,
        LogicalKey::Javascript,
    ];

    /// Stable lowercase identifier handed to key-press listeners.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Html5 => "html5",
            Self::Css => "css5",
            Self::Github => "github",
            Self::C => "c",
            Self::Python => "python",
            Self::Typescript => "typescript",
            Self::React => "react",
            Self::Java => "java",
            Self::Unity => "unity",
            Self::Csharp => "csharp",
            Self::Javascript => "javascript",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Html5 => "HTML5",
            Self::Css => "CSS",
            Self::Github => "GitHub",
            Self::C => "C Language",
            Self::Python => "Python",
            Self::Typescript => "TypeScript",
            Self::React => "React",
            Self::Java => "Java",
            Self::Unity => "Unity",
            Self::Csharp => "C#",
            Self::Javascript => "JavaScript",
        }
    }

    /// The project tech stack behind this key. GitHub has none: it opens the
    /// profile view instead of a project list.
    pub fn tech_stack(self) -> Option<&'static str> {
        match self {
            Self::Html5 => Some("HTML5"),
            Self::Css => Some("CSS"),
            Self::Github => None,
            Self::C => Some("C"),
            Self::Python => Some("Python"),
            Self::Typescript => Some("TypeScript"),
            Self::React => Some("React"),
            Self::Java => Some("Java"),
            Self::Unity => Some("Unity"),
            Self::Csharp => Some("C#"),
            Self::Javascript => Some("JavaScript"),
        }
    }

    pub fn is_github(self) -> bool {
        self == Self::Github
    }

    /// Reverse of [`LogicalKey::tech_stack`].
    pub fn from_tech_stack(stack: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.tech_stack() == Some(stack))
    }
}

impl std::fmt::Display for LogicalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Error returned when parsing an unknown key tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown logical key: {0:?}")]
pub struct UnknownKey(pub String);

impl std::str::FromStr for LogicalKey {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if lower == "css" {
            return Ok(Self::Css);
        }
        Self::ALL
            .into_iter()
            .find(|k| k.tag() == lower)
            .ok_or_else(|| UnknownKey(s.to_string()))
    }
}
