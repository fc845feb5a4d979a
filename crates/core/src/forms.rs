//! Form submission outcomes and field errors.

use std::collections::BTreeMap;

use serde::Serialize;
use validator::ValidationErrors;

/// Field name -> error messages for a rejected form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    /// Create an empty error set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error against a field.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Whether no errors were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Errors recorded for a field.
    #[must_use]
    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }

    /// Fold in the field errors reported by `validator`.
    pub fn extend_from_validation(&mut self, errors: &ValidationErrors) {
        for (field, errs) in errors.field_errors() {
            for err in errs {
                let message = err
                    .message
                    .as_ref()
                    .map_or_else(|| err.code.to_string(), ToString::to_string);
                self.add(field.as_ref(), message);
            }
        }
    }

    /// Ok when empty, otherwise the errors themselves.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl From<&ValidationErrors> for FormErrors {
    fn from(errors: &ValidationErrors) -> Self {
        let mut form_errors = Self::new();
        form_errors.extend_from_validation(errors);
        form_errors
    }
}

/// Outcome of a form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission<T> {
    /// Input was valid and the change was persisted.
    Saved(T),
    /// Input was rejected; nothing was persisted.
    Invalid(FormErrors),
    /// The caller may not change this object; nothing was persisted.
    Denied,
}

impl<T> Submission<T> {
    /// Whether the submission was persisted.
    #[must_use]
    pub const fn is_saved(&self) -> bool {
        matches!(self, Self::Saved(_))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "This field is required."))]
        text: String,
    }

    #[test]
    fn test_from_validation_errors() {
        let errors = Sample {
            text: String::new(),
        }
        .validate()
        .unwrap_err();
        let form_errors = FormErrors::from(&errors);

        assert_eq!(form_errors.field("text"), ["This field is required."]);
        assert!(form_errors.field("group").is_empty());
    }

    #[test]
    fn test_into_result() {
        assert!(FormErrors::new().into_result().is_ok());

        let mut errors = FormErrors::new();
        errors.add("image", "Upload a valid image.");
        errors.add("image", "Second problem.");
        let err = errors.into_result().unwrap_err();
        assert_eq!(err.field("image").len(), 2);
    }

    #[test]
    fn test_serializes_as_map() {
        let mut errors = FormErrors::new();
        errors.add("text", "required");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({"text": ["required"]}));
    }
}
