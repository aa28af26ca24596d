use thiserror::Error;

use crate::contract::model::EntityKind;

/// Errors that are safe to expose to other modules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrouperError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: u64 },

    #[error("{kind} with name '{name}' already exists")]
    Conflict { kind: EntityKind, name: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Unknown {kind} ids: {ids:?}")]
    UnknownReference { kind: EntityKind, ids: Vec<u64> },
}

impl GrouperError {
    pub fn not_found(kind: EntityKind, id: u64) -> Self {
        Self::NotFound { kind, id }
    }

    pub fn conflict(kind: EntityKind, name: impl Into<String>) -> Self {
        Self::Conflict {
            kind,
            name: name.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn unknown_reference(kind: EntityKind, ids: Vec<u64>) -> Self {
        Self::UnknownReference { kind, ids }
    }
}

impl From<crate::domain::error::DomainError> for GrouperError {
    fn from(domain_error: crate::domain::error::DomainError) -> Self {
        use crate::domain::error::DomainError::*;
        match domain_error {
            UserNotFound { id } => Self::not_found(EntityKind::User, id),
            GroupNotFound { id } => Self::not_found(EntityKind::Group, id),
            DuplicateName { kind, name } => Self::conflict(kind, name),
            UnknownReference { kind, ids } => Self::unknown_reference(kind, ids),
            Validation { errors } => Self::validation(errors.to_string()),
        }
    }
}
