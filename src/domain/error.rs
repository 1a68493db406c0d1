use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid `{field}`: {reason}")]
    InvalidArgument { field: &'static str, reason: String },
    #[error("`{phase}` is not a phase of a {subject}")]
    InvalidPhase { phase: String, subject: &'static str },
}

impl DomainError {
    pub fn invalid_argument(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field,
            reason: reason.into(),
        }
    }

    pub fn invalid_phase(phase: impl Into<String>, subject: &'static str) -> Self {
        Self::InvalidPhase {
            phase: phase.into(),
            subject,
        }
    }
}
