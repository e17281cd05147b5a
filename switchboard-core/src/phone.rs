//! Phone number handling
//!
//! The transport addresses peers as `<digits>@<domain>`; everything that is
//! not an ASCII digit is stripped before composing the address.

use crate::ValidationError;

/// Longest phone number accepted from callers, formatting included
pub const MAX_PHONE_LEN: usize = 20;

/// Keep only the ASCII digits of `phone`.
pub fn digits_only(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Validate a caller-supplied phone number.
pub fn validate(phone: &str) -> Result<(), ValidationError> {
    let trimmed = phone.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_PHONE_LEN {
        return Err(ValidationError::PhoneNumber(phone.to_string()));
    }
    if !trimmed.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::PhoneNumber(phone.to_string()));
    }
    Ok(())
}

/// Compose the transport address for `phone`.
///
/// An input that already carries the `@domain` suffix is returned as-is.
pub fn to_address(phone: &str, domain: &str) -> String {
    let suffix = format!("@{domain}");
    if phone.ends_with(&suffix) {
        return phone.to_string();
    }
    format!("{}{}", digits_only(phone), suffix)
}
