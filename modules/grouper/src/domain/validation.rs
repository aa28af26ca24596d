//! Input validation applied before the directory is touched.
//!
//! Names must be present and non-blank. Emails follow the strict policy: they
//! must be syntactically valid addresses, not merely non-empty strings.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use validator::ValidateEmail;

use crate::contract::model::{GroupPatch, NewGroup, NewUser, UserPatch};
use crate::domain::error::DomainError;

pub const NOT_PROVIDED: &str = "Data not provided.";
pub const INVALID_EMAIL: &str = "Not a valid email address.";
pub const NOT_NULL: &str = "Field may not be null.";

/// Validation messages keyed by field name, reported together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }

    /// `Ok(())` when nothing was collected, otherwise a validation error.
    pub fn into_result(self) -> Result<(), DomainError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DomainError::validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Limits enforced by the validators.
#[derive(Debug, Clone, Copy)]
pub struct Rules {
    pub max_name_length: usize,
}

impl Rules {
    fn check_name(&self, errors: &mut FieldErrors, name: &str) {
        if name.trim().is_empty() {
            errors.add("name", NOT_PROVIDED);
        } else if name.chars().count() > self.max_name_length {
            errors.add(
                "name",
                format!("Longer than maximum length {}.", self.max_name_length),
            );
        }
    }

    fn check_email(&self, errors: &mut FieldErrors, email: &str) {
        if email.trim().is_empty() {
            errors.add("email", NOT_PROVIDED);
        } else if !email.to_owned().validate_email() {
            errors.add("email", INVALID_EMAIL);
        }
    }

    pub fn validate_new_user(&self, new_user: &NewUser) -> Result<(), DomainError> {
        let mut errors = FieldErrors::new();
        self.check_name(&mut errors, &new_user.name);
        self.check_email(&mut errors, &new_user.email);
        errors.into_result()
    }

    pub fn validate_user_patch(&self, patch: &UserPatch) -> Result<(), DomainError> {
        let mut errors = FieldErrors::new();
        if let Some(ref name) = patch.name {
            self.check_name(&mut errors, name);
        }
        if let Some(ref email) = patch.email {
            self.check_email(&mut errors, email);
        }
        errors.into_result()
    }

    pub fn validate_new_group(&self, new_group: &NewGroup) -> Result<(), DomainError> {
        let mut errors = FieldErrors::new();
        self.check_name(&mut errors, &new_group.name);
        errors.into_result()
    }

    pub fn validate_group_patch(&self, patch: &GroupPatch) -> Result<(), DomainError> {
        let mut errors = FieldErrors::new();
        if let Some(ref name) = patch.name {
            self.check_name(&mut errors, name);
        }
        errors.into_result()
    }
}
