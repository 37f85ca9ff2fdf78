//! Password hashing via bcrypt.

use std::sync::LazyLock;

use crate::error::{VaultError, VaultResult};

/// bcrypt cost factor.
const BCRYPT_COST: u32 = 10;

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Hash checked when no account matches, so unknown emails cost the same
/// as wrong passwords.
static PADDING_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| bcrypt::hash("docvault-padding", BCRYPT_COST).ok());

/// Reject passwords shorter than [`MIN_PASSWORD_LEN`].
pub fn validate_password(password: &str) -> VaultResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(VaultError::Invalid(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Hash a password with bcrypt (cost 10).
pub fn hash_password(password: &str) -> VaultResult<String> {
    bcrypt::hash(password, BCRYPT_COST)
        .map_err(|e| VaultError::Internal(format!("bcrypt hash: {e}")))
}

/// Verify a password against a bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> VaultResult<bool> {
    bcrypt::verify(password, hash).map_err(|e| VaultError::Internal(format!("bcrypt verify: {e}")))
}

/// Burn one verification's worth of work. Always `false`.
pub(crate) fn verify_against_padding(password: &str) -> bool {
    if let Some(hash) = PADDING_HASH.as_deref() {
        let _ = bcrypt::verify(password, hash);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$2"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn short_passwords_are_invalid() {
        assert!(matches!(validate_password("1234567"), Err(VaultError::Invalid(_))));
        assert!(validate_password("12345678").is_ok());
    }

    #[test]
    fn padding_never_matches() {
        assert!(!verify_against_padding("docvault-padding"));
    }
}
