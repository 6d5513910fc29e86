//! Input checks shared by the request DTOs. Every helper returns the cleaned
//! value (trimmed, normalized) or a `DomainError::Validation`.

use crate::error::DomainError;
use crate::models::normalize_email;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Trimmed, non-empty, at most `max` characters.
pub fn required(field: &str, value: &str, max: usize) -> Result<String, DomainError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{} is required", field)));
    }
    bounded(field, value, max)
}

/// Trimmed, may be empty, at most `max` characters.
pub fn bounded(field: &str, value: &str, max: usize) -> Result<String, DomainError> {
    let value = value.trim();
    if value.chars().count() > max {
        return Err(DomainError::validation(format!(
            "{} cannot be more than {} characters",
            field, max
        )));
    }
    Ok(value.to_string())
}

pub fn email(value: &str) -> Result<String, DomainError> {
    let email = normalize_email(value);
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
                && domain
                    .rsplit_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && tld.len() >= 2)
        }
        None => false,
    };
    if !valid {
        return Err(DomainError::validation("Please enter a valid email"));
    }
    Ok(email)
}

pub fn password(value: &str) -> Result<(), DomainError> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// ISBN-10 or ISBN-13, optionally prefixed with `ISBN`, `ISBN-10:` or
/// `ISBN-13:`, with hyphens or spaces between groups.
pub fn isbn(value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    let body = trimmed
        .strip_prefix("ISBN-13:")
        .or_else(|| trimmed.strip_prefix("ISBN-10:"))
        .or_else(|| trimmed.strip_prefix("ISBN-13"))
        .or_else(|| trimmed.strip_prefix("ISBN-10"))
        .or_else(|| trimmed.strip_prefix("ISBN:"))
        .or_else(|| trimmed.strip_prefix("ISBN"))
        .unwrap_or(trimmed)
        .trim();

    let compact: Vec<char> = body.chars().filter(|c| *c != '-' && *c != ' ').collect();
    let valid = match compact.len() {
        10 => {
            compact[..9].iter().all(char::is_ascii_digit)
                && (compact[9].is_ascii_digit() || compact[9] == 'X')
        }
        13 => {
            compact.iter().all(char::is_ascii_digit)
                && (compact.starts_with(&['9', '7', '8']) || compact.starts_with(&['9', '7', '9']))
        }
        _ => false,
    };
    if !valid || body.starts_with(['-', ' ']) || body.ends_with(['-', ' ']) {
        return Err(DomainError::validation("Please enter a valid ISBN"));
    }
    Ok(trimmed.to_string())
}
