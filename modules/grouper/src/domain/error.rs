use thiserror::Error;

use crate::contract::model::{EntityKind, GroupId, UserId};
use crate::domain::repo::StoreError;
use crate::domain::validation::FieldErrors;

/// Domain-specific errors using thiserror
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("User not found: {id}")]
    UserNotFound { id: UserId },

    #[error("Group not found: {id}")]
    GroupNotFound { id: GroupId },

    #[error("{kind} with name '{name}' already exists")]
    DuplicateName { kind: EntityKind, name: String },

    #[error("Unknown {kind} ids referenced: {ids:?}")]
    UnknownReference { kind: EntityKind, ids: Vec<u64> },

    #[error("Validation failed: {errors}")]
    Validation { errors: FieldErrors },
}

impl DomainError {
    pub fn user_not_found(id: UserId) -> Self {
        Self::UserNotFound { id }
    }

    pub fn group_not_found(id: GroupId) -> Self {
        Self::GroupNotFound { id }
    }

    pub fn duplicate_name(kind: EntityKind, name: impl Into<String>) -> Self {
        Self::DuplicateName {
            kind,
            name: name.into(),
        }
    }

    pub fn unknown_reference(kind: EntityKind, ids: Vec<u64>) -> Self {
        Self::UnknownReference { kind, ids }
    }

    pub fn validation(errors: FieldErrors) -> Self {
        Self::Validation { errors }
    }
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound {
                kind: EntityKind::User,
                id,
            } => Self::user_not_found(id),
            StoreError::NotFound {
                kind: EntityKind::Group,
                id,
            } => Self::group_not_found(id),
            StoreError::DuplicateName { kind, name } => Self::duplicate_name(kind, name),
            StoreError::UnknownReference { kind, ids } => Self::unknown_reference(kind, ids),
        }
    }
}
