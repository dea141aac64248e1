use std::sync::LazyLock;

use regex::Regex;

use crate::error::FieldErrors;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});

static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").unwrap());

pub const USERNAME_MAX: usize = 150;
pub const TITLE_MAX: usize = 200;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("This field is required.".to_string());
    }
    if email.len() > 254 || !EMAIL_RE.is_match(email) {
        return Err("Enter a valid email address.".to_string());
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("This field is required.".to_string());
    }
    if username.chars().count() > USERNAME_MAX {
        return Err(format!(
            "Ensure this field has no more than {USERNAME_MAX} characters."
        ));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .to_string(),
        );
    }
    Ok(())
}

pub fn validate_title(title: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("This field may not be blank.".to_string());
    }
    if title.chars().count() > TITLE_MAX {
        return Err(format!("Ensure this field has no more than {TITLE_MAX} characters."));
    }
    Ok(())
}

pub fn validate_choice<T>(value: &str, parse: impl Fn(&str) -> Option<T>) -> Result<T, String> {
    parse(value).ok_or_else(|| format!("\"{value}\" is not a valid choice."))
}

/// Collects per-field failures before turning them into a 400.
#[derive(Debug, Default)]
pub struct Errors(FieldErrors);

impl Errors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn check(&mut self, field: &str, result: Result<(), String>) {
        if let Err(message) = result {
            self.add(field, message);
        }
    }

    /// Like `check`, but hands back the parsed value on success.
    pub fn take<T>(&mut self, field: &str, result: Result<T, String>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(message) => {
                self.add(field, message);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), crate::error::AppError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(crate::error::AppError::Validation(self.0))
        }
    }
}
