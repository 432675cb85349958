use std::sync::LazyLock;

use email_address::EmailAddress;
use regex::Regex;
use url::Url;
use uuid::Uuid;

use crate::errors::{ValidationIssue, ValidationError, ValidationResult};

pub const USERNAME_MIN_LENGTH: usize = 3;
pub const USERNAME_MAX_LENGTH: usize = 24;

static USERNAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_]+$").unwrap_or_else(|err| panic!("username pattern must compile: {err}"))
});

/// Returns `true` if the provided string is a syntactically valid email address.
pub fn is_valid_email(value: &str) -> bool {
    EmailAddress::is_valid(value)
}

/// Returns `true` if the provided string parses as a URL with a scheme.
pub fn is_valid_url(value: &str) -> bool {
    Url::parse(value).is_ok()
}

/// Returns `true` if the provided string parses as a UUID.
pub fn is_valid_uuid(value: &str) -> bool {
    Uuid::parse_str(value).is_ok()
}

/// Validates the registration form fields, reporting every failing field at once.
pub fn validate_registration(username: &str, email: &str) -> ValidationResult<()> {
    let mut issues = Vec::new();

    let length = username.chars().count();
    if length < USERNAME_MIN_LENGTH {
        issues.push(ValidationIssue::new(
            "username",
            "validation.length",
            format!("length must be at least {USERNAME_MIN_LENGTH}"),
        ));
    } else if length > USERNAME_MAX_LENGTH {
        issues.push(ValidationIssue::new(
            "username",
            "validation.length",
            format!("length must be at most {USERNAME_MAX_LENGTH}"),
        ));
    }
    if length > 0 && !USERNAME_PATTERN.is_match(username) {
        issues.push(ValidationIssue::new(
            "username",
            "validation.regex",
            "only letters, digits and underscores are allowed",
        ));
    }
    if !is_valid_email(email) {
        issues.push(ValidationIssue::new(
            "email",
            "validation.email",
            "value must be a valid email address",
        ));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(issues))
    }
}
