//! The module contains the error the engine can throw.
//!
//! The errors are:
//!
//! - [`Validation`] thrown when submitted account fields are rejected. Nothing
//!   is persisted when it is returned.
//! - [`KeyNotFound`] thrown when an account does not exist.
//! - [`ExistingKey`] thrown when a write collides with a unique key outside of
//!   the validated signup path (the bootstrap seeder).
//! - [`Denied`] thrown when the admission policy no longer holds at write
//!   time.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`ExistingKey`]: EngineError::ExistingKey
//!  [`Denied`]: EngineError::Denied
use sea_orm::DbErr;
use thiserror::Error;
use validator::ValidationErrors;

use crate::Denial;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{}", full_messages(.0).join(", "))]
    Validation(ValidationErrors),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Signup denied: {0:?}")]
    Denied(Denial),
    #[error("Invalid authentication type: {0}")]
    InvalidAuthType(String),
    #[error("Credential service failure: {0}")]
    Credential(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl From<ValidationErrors> for EngineError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value)
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => full_messages(a) == full_messages(b),
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::Denied(a), Self::Denied(b)) => a == b,
            (Self::InvalidAuthType(a), Self::InvalidAuthType(b)) => a == b,
            (Self::Credential(a), Self::Credential(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

/// Form order of the account fields; unknown fields sort last.
const FIELD_ORDER: [&str; 8] = [
    "login",
    "password",
    "password_confirmation",
    "first_name",
    "last_name",
    "email",
    "auth_type",
    "open_id_url",
];

fn field_rank(field: &str) -> usize {
    FIELD_ORDER
        .iter()
        .position(|known| *known == field)
        .unwrap_or(FIELD_ORDER.len())
}

/// Flatten validation errors into `(field, message)` pairs, in form order.
pub fn field_messages(errors: &ValidationErrors) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, issues)| {
            let field = field.to_string();
            issues.iter().map(move |issue| {
                let message = issue
                    .message
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| format!("{} is invalid", humanize(&field)));
                (field.clone(), message)
            })
        })
        .collect();
    pairs.sort_by(|(a, _), (b, _)| field_rank(a).cmp(&field_rank(b)).then_with(|| a.cmp(b)));
    pairs
}

/// Human readable messages, one per failed rule.
pub fn full_messages(errors: &ValidationErrors) -> Vec<String> {
    field_messages(errors)
        .into_iter()
        .map(|(_, message)| message)
        .collect()
}

fn humanize(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use validator::ValidationError;

    use super::*;

    #[test]
    fn messages_follow_form_order() {
        let mut errors = ValidationErrors::new();
        errors.add(
            "email",
            ValidationError::new("email").with_message("Email is invalid".into()),
        );
        errors.add(
            "login",
            ValidationError::new("taken").with_message("Login has already been taken".into()),
        );

        assert_eq!(
            full_messages(&errors),
            vec![
                "Login has already been taken".to_string(),
                "Email is invalid".to_string()
            ]
        );
    }

    #[test]
    fn missing_message_falls_back_to_field_name() {
        let mut errors = ValidationErrors::new();
        errors.add("open_id_url", ValidationError::new("url"));

        assert_eq!(full_messages(&errors), vec!["Open id url is invalid"]);
    }

    #[test]
    fn validation_display_joins_messages() {
        let mut errors = ValidationErrors::new();
        errors.add(
            "login",
            ValidationError::new("blank").with_message("Login can't be blank".into()),
        );
        errors.add(
            "password",
            ValidationError::new("blank").with_message("Password can't be blank".into()),
        );

        assert_eq!(
            EngineError::Validation(errors).to_string(),
            "Login can't be blank, Password can't be blank"
        );
    }
}
