use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

pub const NOT_BLANK: &str = "This value should not be blank.";
pub const INVALID_EMAIL: &str = "This value is not a valid email address.";
pub const ALREADY_USED: &str = "This value is already used.";

/// One violated constraint, keyed by the payload property it applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub property_path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(property_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            property_path: property_path.into(),
            message: message.into(),
        }
    }
}

/// Accumulates every violation of a submission before reporting.
#[derive(Debug, Default)]
pub struct Violations(Vec<FieldError>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    /// Returns true when the value is present and not blank.
    pub fn not_blank(&mut self, field: &str, value: Option<&str>) -> bool {
        match value {
            Some(v) if !v.trim().is_empty() => true,
            _ => {
                self.add(field, NOT_BLANK);
                false
            }
        }
    }

    pub fn present<T>(&mut self, field: &str, value: Option<&T>) -> bool {
        if value.is_none() {
            self.add(field, NOT_BLANK);
            return false;
        }
        true
    }

    /// Length is counted in characters. Blank values are left to `not_blank`.
    pub fn length(&mut self, field: &str, value: Option<&str>, min: usize, max: usize, max_message: Option<&str>) {
        let Some(v) = value.filter(|v| !v.is_empty()) else {
            return;
        };
        let len = v.chars().count();
        if len < min {
            self.add(
                field,
                format!("This value is too short. It should have {min} characters or more."),
            );
        } else if len > max {
            let msg = max_message
                .map(str::to_string)
                .unwrap_or_else(|| format!("This value is too long. It should have {max} characters or less."));
            self.add(field, msg);
        }
    }

    pub fn email(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
            if !is_valid_email(v) {
                self.add(field, INVALID_EMAIL);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_errors(self) -> Vec<FieldError> {
        self.0
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}
