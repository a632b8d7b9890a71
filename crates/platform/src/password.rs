use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("password hashing failed: {0}")]
pub struct PasswordHashError(pub String);

/// One-way, deliberately costly password hash.
///
/// The algorithm is an infrastructure choice; the domain only needs an
/// encoded hash it can store.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, PasswordHashError>;

    fn verify(&self, password: &str, encoded: &str) -> Result<bool, PasswordHashError>;
}

/// Minimum accepted password length for every account created here.
pub const MIN_PASSWORD_LEN: usize = 12;

const MAX_DISPLAY_NAME_LEN: usize = 128;

/// Validate the fields of a new account and hash its email.
///
/// Returns the email digest and the trimmed display name; the raw email is
/// not kept past this call.
pub fn validate_new_account(
    email: &str,
    display_name: &str,
    password: &str,
) -> custodia_core::DomainResult<(custodia_core::EmailHash, String)> {
    use custodia_core::DomainError;

    let email_hash = custodia_core::EmailHash::of(email)?;

    let display_name = display_name.trim();
    if display_name.is_empty() {
        return Err(DomainError::validation("display name cannot be empty"));
    }
    if display_name.chars().count() > MAX_DISPLAY_NAME_LEN {
        return Err(DomainError::validation("display name is too long"));
    }

    if password.trim().is_empty() || password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    Ok((email_hash, display_name.to_string()))
}
