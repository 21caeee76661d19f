//! Registration input checks
//!
//! Field limits follow the column widths in `migrations/0001_initial.sql`.

use crate::domain::DomainError;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_USERNAME_LEN: usize = 150;
pub const ID_NUMBER_LEN: usize = 13;
pub const MAX_TAX_NUMBER_LEN: usize = 8;
pub const MAX_PHONE_LEN: usize = 10;

pub fn validate_username(username: &str) -> Result<(), DomainError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("username is required"));
    }
    if trimmed.len() > MAX_USERNAME_LEN {
        return Err(DomainError::validation(format!(
            "username must be at most {} characters",
            MAX_USERNAME_LEN
        )));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '@' | '+'))
    {
        return Err(DomainError::validation(
            "username may only contain letters, digits and . _ - @ +",
        ));
    }
    Ok(())
}

/// Shape check only: one `@` with a dotted domain after it
pub fn validate_email(email: &str) -> Result<(), DomainError> {
    let valid = match email.trim().split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(DomainError::validation("email address is not valid"))
    }
}

pub fn validate_password(password: &str, confirmation: &str) -> Result<(), DomainError> {
    if password != confirmation {
        return Err(DomainError::validation("password confirmation does not match"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

pub fn validate_id_number(id_number: &str) -> Result<(), DomainError> {
    if id_number.len() != ID_NUMBER_LEN || !id_number.chars().all(|c| c.is_ascii_digit()) {
        return Err(DomainError::validation(format!(
            "id number must be exactly {} digits",
            ID_NUMBER_LEN
        )));
    }
    Ok(())
}

pub fn validate_tax_number(tax_number: &str) -> Result<(), DomainError> {
    let trimmed = tax_number.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_TAX_NUMBER_LEN {
        return Err(DomainError::validation(format!(
            "tax number must be 1 to {} characters",
            MAX_TAX_NUMBER_LEN
        )));
    }
    Ok(())
}

pub fn validate_phone_number(phone: &str) -> Result<(), DomainError> {
    if phone.is_empty()
        || phone.len() > MAX_PHONE_LEN
        || !phone.chars().all(|c| c.is_ascii_digit())
    {
        return Err(DomainError::validation(format!(
            "phone number must be 1 to {} digits",
            MAX_PHONE_LEN
        )));
    }
    Ok(())
}

/// Trim a free-text field and enforce a maximum length; blank becomes `None`
pub fn optional_text(
    field: &str,
    value: Option<String>,
    max_len: usize,
) -> Result<Option<String>, DomainError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if v.is_empty() => Ok(None),
        Some(v) if v.chars().count() > max_len => Err(DomainError::validation(format!(
            "{} must be at most {} characters",
            field, max_len
        ))),
        other => Ok(other),
    }
}

/// Trim a required free-text field and enforce a maximum length
pub fn required_text(field: &str, value: &str, max_len: usize) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{} is required", field)));
    }
    if trimmed.chars().count() > max_len {
        return Err(DomainError::validation(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(trimmed.to_string())
}
