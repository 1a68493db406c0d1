//! Identifiers, priorities and kinds shared by pagelets and resources.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use uuid::Uuid;

use super::error::DomainError;

/// Characters that would break out of an attribute value or a script string literal.
const FORBIDDEN_ID_CHARS: &[char] = &['"', '\'', '<', '>', '&', '`', '\\'];

fn validate_identifier(field: &'static str, value: String) -> Result<String, DomainError> {
    if value.is_empty() {
        return Err(DomainError::invalid_argument(field, "must not be empty"));
    }
    if let Some(ch) = value
        .chars()
        .find(|ch| ch.is_whitespace() || FORBIDDEN_ID_CHARS.contains(ch))
    {
        return Err(DomainError::invalid_argument(
            field,
            format!("character {ch:?} is not allowed in `{value}`"),
        ));
    }
    Ok(value)
}

/// Identity of a pagelet; doubles as its DOM id on the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PageletId(String);

impl PageletId {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        validate_identifier("pagelet.id", value.into()).map(Self)
    }

    /// Generate a fresh identity for callers that do not supply one.
    pub fn generate() -> Self {
        Self(format!("pagelet-{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        validate_identifier("resource.id", value.into()).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Scheduling priority. Higher values are flushed earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Priority(i32);

impl Priority {
    pub const HIGHEST: Priority = Priority(100);
    pub const HIGH: Priority = Priority(75);
    pub const NORMAL: Priority = Priority(50);
    pub const LOW: Priority = Priority(25);
    pub const LOWEST: Priority = Priority(0);

    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    pub const fn get(self) -> i32 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResourceKind {
    Stylesheet,
    Javascript,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 2] = [ResourceKind::Stylesheet, ResourceKind::Javascript];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Stylesheet => "stylesheet",
            ResourceKind::Javascript => "javascript",
        }
    }
}

impl FromStr for ResourceKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stylesheet" | "css" => Ok(ResourceKind::Stylesheet),
            "javascript" | "js" => Ok(ResourceKind::Javascript),
            other => Err(DomainError::invalid_argument(
                "resource.kind",
                format!("unknown resource kind `{other}`"),
            )),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a phase diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Subject {
    Pagelet,
    Stylesheet,
    Javascript,
}

impl From<ResourceKind> for Subject {
    fn from(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Stylesheet => Subject::Stylesheet,
            ResourceKind::Javascript => Subject::Javascript,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_reject_empty_and_unsafe_values() {
        assert!(PageletId::new("").is_err());
        assert!(PageletId::new("has space").is_err());
        assert!(PageletId::new("quote\"d").is_err());
        assert!(ResourceId::new("<script>").is_err());
        assert!(matches!(
            PageletId::new("a\\"),
            Err(DomainError::InvalidArgument {
                field: "pagelet.id",
                ..
            })
        ));
        assert!(ResourceId::new("c:\\theme").is_err());
        assert_eq!(PageletId::new("main-content").unwrap().as_str(), "main-content");
    }

    #[test]
    fn generated_identifiers_are_unique_and_valid() {
        let first = PageletId::generate();
        let second = PageletId::generate();

        assert_ne!(first, second);
        assert!(PageletId::new(first.as_str()).is_ok());
    }

    #[test]
    fn resource_kind_parses_known_names_only() {
        assert_eq!(
            "Stylesheet".parse::<ResourceKind>().unwrap(),
            ResourceKind::Stylesheet
        );
        assert_eq!("js".parse::<ResourceKind>().unwrap(), ResourceKind::Javascript);

        let err = "image".parse::<ResourceKind>().unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvalidArgument {
                field: "resource.kind",
                ..
            }
        ));
    }

    #[test]
    fn priority_presets_are_ordered() {
        assert!(Priority::HIGHEST > Priority::HIGH);
        assert!(Priority::HIGH > Priority::NORMAL);
        assert!(Priority::NORMAL > Priority::LOW);
        assert!(Priority::LOW > Priority::LOWEST);
        assert_eq!(Priority::default(), Priority::NORMAL);
    }
}
