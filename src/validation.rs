use validator::{Validate, ValidationErrors};

use crate::error::AppError;

/// Flattens validator output into `field: message` pairs, sorted by field.
pub fn describe_errors(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, field_errors)| {
            field_errors.iter().map(move |error| {
                let message = error
                    .message
                    .clone()
                    .unwrap_or_else(|| "Invalid value".into());
                format!("{}: {}", field, message)
            })
        })
        .collect();

    messages.sort();
    messages.join("; ")
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(describe_errors(&errors))
    }
}

pub trait ValidateExt: Validate {
    fn validate_app(&self) -> Result<(), AppError> {
        self.validate().map_err(AppError::from)
    }
}

impl<T: Validate> ValidateExt for T {}
