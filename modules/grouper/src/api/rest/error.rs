use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::rest::dto::ErrorDto;
use crate::contract::model::EntityKind;
use crate::domain::error::DomainError;
use crate::domain::validation::FieldErrors;

/// Errors produced by the REST adapter, rendered as `{"message": ...}` bodies.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No input data provided.")]
    NoInput,
    #[error("{0} could not be found.")]
    NotFound(EntityKind),
    #[error("{0} exists.")]
    Conflict(EntityKind),
    #[error("Validation failed.")]
    Validation(FieldErrors),
    #[error("Invalid input data: {0}")]
    Malformed(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NoInput => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Validation(_) | Self::Malformed(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::UserNotFound { .. } => Self::NotFound(EntityKind::User),
            DomainError::GroupNotFound { .. } => Self::NotFound(EntityKind::Group),
            DomainError::DuplicateName { kind, .. } => Self::Conflict(kind),
            DomainError::Validation { errors } => Self::Validation(errors),
            DomainError::UnknownReference { kind, ids } => {
                let field = match kind {
                    EntityKind::User => "users",
                    EntityKind::Group => "groups",
                };
                let listed = ids
                    .iter()
                    .map(u64::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                let mut errors = FieldErrors::new();
                errors.add(field, format!("Not all supplied {field} exist: {listed}"));
                Self::Validation(errors)
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "request body rejected");
        Self::NoInput
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::warn!(error = %self, status = status.as_u16(), "request failed");

        let message = self.to_string();
        let errors = match self {
            Self::Validation(errors) => Some(errors.into_inner()),
            _ => None,
        };
        (status, Json(ErrorDto { message, errors })).into_response()
    }
}
