//! Shape checks run before the protocol touches the nonce store.
//!
//! A malformed request is rejected without consuming its nonce, so an operator typo
//! does not burn the nonce.

use super::entities::RegistrationAttempt;
use super::errors::ValidationError;

pub const MAX_USERNAME_CHARS: usize = 255;
pub const MAX_PASSWORD_BYTES: usize = 512;
pub const MAX_DISPLAY_NAME_CHARS: usize = 256;
pub const MAX_USER_TYPE_CHARS: usize = 255;

/// Characters allowed in a localpart.
fn is_localpart_char(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | '.' | '_' | '=' | '-' | '/')
}

fn reject_nul(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.contains('\0') {
        return Err(ValidationError::new(field, "must not contain NUL bytes"));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() {
        return Err(ValidationError::new("username", "must not be empty"));
    }
    if username.chars().count() > MAX_USERNAME_CHARS {
        return Err(ValidationError::new(
            "username",
            format!("must be at most {} characters", MAX_USERNAME_CHARS),
        ));
    }
    if let Some(bad) = username.chars().find(|c| !is_localpart_char(*c)) {
        return Err(ValidationError::new(
            "username",
            format!("contains invalid character {:?}", bad),
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::new("password", "must not be empty"));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ValidationError::new(
            "password",
            format!("must be at most {} bytes", MAX_PASSWORD_BYTES),
        ));
    }
    reject_nul("password", password)
}

/// Validate every field of an attempt. The MAC itself is not checked here.
pub fn validate_attempt(attempt: &RegistrationAttempt) -> Result<(), ValidationError> {
    let fields = &attempt.fields;

    reject_nul("nonce", &fields.nonce)?;
    validate_username(&fields.username)?;
    validate_password(&fields.password)?;

    if let Some(user_type) = fields.user_type.as_deref() {
        reject_nul("user_type", user_type)?;
        if user_type.chars().count() > MAX_USER_TYPE_CHARS {
            return Err(ValidationError::new(
                "user_type",
                format!("must be at most {} characters", MAX_USER_TYPE_CHARS),
            ));
        }
    }

    if let Some(name) = attempt.display_name.as_deref() {
        if name.chars().count() > MAX_DISPLAY_NAME_CHARS {
            return Err(ValidationError::new(
                "displayname",
                format!("must be at most {} characters", MAX_DISPLAY_NAME_CHARS),
            ));
        }
    }

    Ok(())
}
