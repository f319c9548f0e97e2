//! Unified request error model for series resolution and aggregation.
//! All variants but `Config` and `Internal` are request-level failures; the message
//! text is what the REST layer hands back to clients.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message", rename_all = "snake_case")]
pub enum AppError {
    #[error("{0}")]
    EmptyOrMissingDefinition(String),
    #[error("{0}")]
    MalformedDefinition(String),
    #[error("{0}")]
    InvalidAggregationMethod(String),
    #[error("{0}")]
    InvalidIdentifier(String),
    #[error("{0}")]
    TemplateNotFound(String),
    #[error("{0}")]
    FieldNotFound(String),
    #[error("{0}")]
    UnsupportedAggregationMethod(String),
    #[error("{0}")]
    ScopeMismatch(String),
    #[error("{0}")]
    InvalidDateTime(String),
    #[error("{0}")]
    Config(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn code_str(&self) -> &'static str {
        match self {
            AppError::EmptyOrMissingDefinition(_) => "empty_definition",
            AppError::MalformedDefinition(_) => "malformed_definition",
            AppError::InvalidAggregationMethod(_) => "invalid_aggregation_method",
            AppError::InvalidIdentifier(_) => "invalid_identifier",
            AppError::TemplateNotFound(_) => "template_not_found",
            AppError::FieldNotFound(_) => "field_not_found",
            AppError::UnsupportedAggregationMethod(_) => "unsupported_aggregation_method",
            AppError::ScopeMismatch(_) => "scope_mismatch",
            AppError::InvalidDateTime(_) => "invalid_date_time",
            AppError::Config(_) => "config_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::EmptyOrMissingDefinition(m)
            | AppError::MalformedDefinition(m)
            | AppError::InvalidAggregationMethod(m)
            | AppError::InvalidIdentifier(m)
            | AppError::TemplateNotFound(m)
            | AppError::FieldNotFound(m)
            | AppError::UnsupportedAggregationMethod(m)
            | AppError::ScopeMismatch(m)
            | AppError::InvalidDateTime(m)
            | AppError::Config(m)
            | AppError::Internal(m) => m.as_str(),
        }
    }

    pub fn empty_definition() -> Self {
        AppError::EmptyOrMissingDefinition("must provide a series definition".into())
    }
    pub fn empty_date_time() -> Self {
        AppError::EmptyOrMissingDefinition("must provide a date/time".into())
    }
    pub fn insufficient_fields(clause: &str) -> Self {
        AppError::MalformedDefinition(format!(
            "series definition \"{}\" must include at least one system, a category and a field",
            clause
        ))
    }
    pub fn invalid_method(token: &str) -> Self {
        AppError::InvalidAggregationMethod(format!("invalid aggregation method \"{}\"", token))
    }
    pub fn invalid_identifier(token: &str) -> Self {
        AppError::InvalidIdentifier(format!("invalid system or group identifier \"{}\"", token))
    }
    pub fn template_not_found(name: &str) -> Self {
        AppError::TemplateNotFound(format!("category template \"{}\" not found", name))
    }
    pub fn field_not_found(field: &str, template: &str) -> Self {
        AppError::FieldNotFound(format!(
            "field \"{}\" not found in category template \"{}\"",
            field, template
        ))
    }
    pub fn unsupported_method(method: impl std::fmt::Display, field: &str) -> Self {
        AppError::UnsupportedAggregationMethod(format!(
            "aggregation method {} is not supported for field \"{}\"",
            method, field
        ))
    }
    pub fn scope_mismatch(id: impl std::fmt::Display, database: &str) -> Self {
        AppError::ScopeMismatch(format!("identifier {} does not belong to database {}", id, database))
    }
    pub fn invalid_date_time(text: &str) -> Self {
        AppError::InvalidDateTime(format!("invalid date/time \"{}\"", text))
    }

    /// Map to HTTP status code for the REST layer.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::TemplateNotFound(_) | AppError::FieldNotFound(_) => 404,
            AppError::Config(_) | AppError::Internal(_) => 500,
            _ => 400,
        }
    }

    /// True for failures caused by the request text rather than the server.
    pub fn is_request_error(&self) -> bool {
        !matches!(self, AppError::Config(_) | AppError::Internal(_))
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Default mapping: anyhow only surfaces from configuration loading
        AppError::Config(format!("{:#}", err))
    }
}
