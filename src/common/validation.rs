// Field-level form validation; failures become inline messages

use crate::common::error::ApiError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.is_valid = false;
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    /// First message recorded for `field`, if any
    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

pub trait Validator<T> {
    fn validate(&self, data: &T) -> ValidationResult;
}

// Only the messages reach the user, in the order they were recorded
impl From<ValidationResult> for ApiError {
    fn from(result: ValidationResult) -> Self {
        ApiError::Validation(
            result
                .errors
                .into_iter()
                .map(|e| e.message)
                .collect(),
        )
    }
}
