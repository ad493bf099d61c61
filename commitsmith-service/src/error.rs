use crate::config::SettingsError;
use crate::expression::ExpressionError;
use crate::form::{ParseError, ValidationError};

use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Top-level error for callers that drive a whole compile
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("form has {} validation error(s): {}", .0.len(), join_messages(.0))]
    Invalid(Vec<ValidationError>),

    #[error(transparent)]
    Expression(#[from] ExpressionError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<Vec<ValidationError>> for ServiceError {
    fn from(errors: Vec<ValidationError>) -> Self {
        ServiceError::Invalid(errors)
    }
}
