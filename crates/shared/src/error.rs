use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::FormField;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Validation,
    Conflict,
    RateLimited,
    Upstream,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FormError>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn with_errors(mut self, errors: Vec<FormError>) -> Self {
        self.errors = errors;
        self
    }
}

/// Problems with a single form operation.
///
/// `RequiredFieldMissing` is user-correctable and shown next to the field.
/// The remaining variants mean the caller asked for something the form never
/// offers (a nav link that does not exist, removing the last one, a project
/// type outside the catalog).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormError {
    #[error("{field} is required")]
    RequiredFieldMissing { field: FormField },
    #[error("nav link index {index} is out of range ({len} links)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("the last nav link cannot be removed")]
    LastNavLink,
    #[error("'{value}' is not a valid value for {field}")]
    InvalidValue { field: FormField, value: String },
}

/// Every unmet required field of a draft, collected in one pass.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{} required field(s) missing", .errors.len())]
pub struct ValidationFailure {
    pub errors: Vec<FormError>,
}

impl ValidationFailure {
    pub fn missing_fields(&self) -> impl Iterator<Item = FormField> + '_ {
        self.errors.iter().filter_map(|error| match error {
            FormError::RequiredFieldMissing { field } => Some(*field),
            _ => None,
        })
    }

    pub fn is_missing(&self, field: FormField) -> bool {
        self.missing_fields().any(|missing| missing == field)
    }
}
