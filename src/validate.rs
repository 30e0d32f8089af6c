//! Input checks for account fields. Failures carry messages that are safe to show clients.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Error, Result};

pub const INVALID_EMAIL: &str = "Must use a valid email address";
pub const USERNAME_TOO_SHORT: &str = "Username must be at least 3 characters long";
pub const USERNAME_NOT_URL_COMPATIBLE: &str =
    "Username may only use letters, numbers, and the characters - _ . ~";
pub const PASSWORD_TOO_SHORT: &str = "Password must be 8 or more characters long";
pub const PASSWORD_LACKS_MIX_OF_CHARS: &str =
    "Password must have letters, numbers, and special characters";
pub const PASSWORD_LACKS_MIXED_CASE: &str =
    "Password must have both lower and uppercase characters";

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 8;

lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"^[\w.+-]+@\w[\w-]*(\.[\w-]+)+$").unwrap();
    static ref SPECIAL_CHAR: Regex = Regex::new(r"[!@#$%&*?]").unwrap();
}

pub fn validate_email(email: &str) -> Result<()> {
    if !EMAIL.is_match(email) {
        return Err(Error::Validation(INVALID_EMAIL.to_owned()));
    }
    Ok(())
}

/// Usernames show up in URLs, so they must survive query escaping unchanged.
pub fn validate_username(username: &str) -> Result<()> {
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(Error::Validation(USERNAME_TOO_SHORT.to_owned()));
    }
    let url_safe =
        username.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'));
    if !url_safe {
        return Err(Error::Validation(USERNAME_NOT_URL_COMPATIBLE.to_owned()));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::Validation(PASSWORD_TOO_SHORT.to_owned()));
    }

    let letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    if !letter || !digit || !SPECIAL_CHAR.is_match(password) {
        return Err(Error::Validation(PASSWORD_LACKS_MIX_OF_CHARS.to_owned()));
    }

    let lower = password.chars().any(|c| c.is_ascii_lowercase());
    let upper = password.chars().any(|c| c.is_ascii_uppercase());
    if !lower || !upper {
        return Err(Error::Validation(PASSWORD_LACKS_MIXED_CASE.to_owned()));
    }

    Ok(())
}
