use std::sync::LazyLock;

use axum::extract::{FromRequest, FromRequestParts};
use regex::Regex;

use crate::error::{AppError, FieldError};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

/// JSON body whose rejections become [`AppError::MalformedPayload`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Payload<T>(pub T);

/// Path parameters whose rejections become a JSON 400.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct PathParam<T>(pub T);

/// Query string whose rejections become a JSON 400.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);

/// Collects every field problem of a request before failing.
#[derive(Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn check(&mut self, ok: bool, field: &'static str, message: &str) {
        if !ok {
            self.errors.push(FieldError {
                field,
                message: message.to_string(),
            });
        }
    }

    /// Trimmed name of 2-50 characters.
    pub fn name(&mut self, field: &'static str, label: &str, value: &str) -> String {
        let value = value.trim().to_string();
        let length = value.chars().count();

        self.check(
            (2..=50).contains(&length),
            field,
            &format!("{label} must be 2-50 characters"),
        );

        value
    }

    pub fn optional_name(
        &mut self,
        field: &'static str,
        label: &str,
        value: Option<&str>,
    ) -> Option<String> {
        value.map(|value| self.name(field, label, value))
    }

    /// Trimmed and lower-cased.
    pub fn email(&mut self, value: &str) -> String {
        let value = value.trim().to_lowercase();

        self.check(EMAIL.is_match(&value), "email", "Please provide a valid email");

        value
    }

    pub fn password(&mut self, field: &'static str, value: &str, message: &str) {
        self.check(value.chars().count() >= 8, field, message);
    }

    pub fn required(&mut self, field: &'static str, value: &str, message: &str) -> String {
        let value = value.trim().to_string();

        self.check(!value.is_empty(), field, message);

        value
    }

    pub fn percentage(&mut self, field: &'static str, value: f64) {
        self.check(
            (0.0..=100.0).contains(&value),
            field,
            &format!("{field} must be between 0 and 100"),
        );
    }

    pub fn finish(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            return Ok(());
        }

        Err(AppError::Validation(self.errors))
    }
}

/// Trimmed value, or `None` when absent or blank.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_fields_pass() {
        let mut validator = Validator::default();

        assert_eq!(validator.name("firstName", "First name", "  Ada "), "Ada");
        assert_eq!(validator.email(" Ada@Example.COM "), "ada@example.com");
        validator.password("password", "longenough", "Password must be at least 8 characters");

        assert!(validator.finish().is_ok());
    }

    #[test]
    fn test_errors_accumulate() {
        let mut validator = Validator::default();

        validator.name("firstName", "First name", "A");
        validator.name("lastName", "Last name", &"x".repeat(51));
        validator.email("not-an-email");
        validator.password("password", "short", "Password must be at least 8 characters");

        let Err(AppError::Validation(errors)) = validator.finish() else {
            panic!("expected validation errors");
        };

        let fields: Vec<_> = errors.iter().map(|error| error.field).collect();
        assert_eq!(fields, vec!["firstName", "lastName", "email", "password"]);
        assert_eq!(errors[0].message, "First name must be 2-50 characters");
    }

    #[test]
    fn test_email_shapes() {
        for email in ["a@b.co", "first.last+tag@school.edu"] {
            assert!(EMAIL.is_match(email), "{email}");
        }

        for email in ["", "a@b", "@b.co", "a b@c.de", "a@@b.co"] {
            assert!(!EMAIL.is_match(email), "{email}");
        }
    }

    #[test]
    fn test_percentage_bounds() {
        let mut validator = Validator::default();
        validator.percentage("score", 0.0);
        validator.percentage("score", 100.0);
        assert!(validator.finish().is_ok());

        let mut validator = Validator::default();
        validator.percentage("score", 100.5);
        assert!(validator.finish().is_err());
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  S-1 ".to_string())), Some("S-1".to_string()));
        assert_eq!(non_empty(Some("   ".to_string())), None);
        assert_eq!(non_empty(None), None);
    }
}
