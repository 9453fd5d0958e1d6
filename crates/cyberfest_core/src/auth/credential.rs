//! Salted password hashing and verification.
//!
//! # Responsibility
//! - Generate random salts from the OS CSPRNG.
//! - Compute `SHA-256(salt_bytes || ":" || password)` as lowercase hex.
//! - Compare a candidate password against stored salt + hash.
//!
//! # Invariants
//! - Salts are `SALT_LEN_BYTES` random bytes, hex encoded.
//! - Malformed salt hex is an error, never a silent mismatch.
//!
//! The hash comparison is plain string equality, not constant time. That
//! matches the behavior teams already rely on and is a known hardening gap.

use sha2::{Digest, Sha256};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// Number of random salt bytes per credential.
pub const SALT_LEN_BYTES: usize = 16;

const SALT_PASSWORD_SEPARATOR: &[u8] = b":";

/// Errors from credential issuance and verification.
#[derive(Debug)]
pub enum CredentialError {
    /// Password is empty.
    EmptyPassword,
    /// Stored or supplied salt is not valid hex.
    MalformedSalt(hex::FromHexError),
    /// OS random source failed.
    RandomSource(getrandom::Error),
}

impl Display for CredentialError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPassword => write!(f, "password must not be empty"),
            Self::MalformedSalt(err) => write!(f, "malformed salt: {err}"),
            Self::RandomSource(err) => write!(f, "random source failed: {err}"),
        }
    }
}

impl Error for CredentialError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MalformedSalt(err) => Some(err),
            Self::RandomSource(err) => Some(err),
            Self::EmptyPassword => None,
        }
    }
}

impl From<hex::FromHexError> for CredentialError {
    fn from(value: hex::FromHexError) -> Self {
        Self::MalformedSalt(value)
    }
}

/// Salt + hash pair ready to persist.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub salt: String,
    pub hash: String,
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential { <redacted> }")
    }
}

/// Generates a fresh hex-encoded random salt.
pub fn generate_salt() -> Result<String, CredentialError> {
    let mut bytes = [0u8; SALT_LEN_BYTES];
    getrandom::getrandom(&mut bytes).map_err(CredentialError::RandomSource)?;
    Ok(hex::encode(bytes))
}

/// Hashes `password` with a hex-encoded salt.
pub fn hash_password(password: &str, salt_hex: &str) -> Result<String, CredentialError> {
    let salt = hex::decode(salt_hex.trim())?;
    let mut hasher = Sha256::new();
    hasher.update(&salt);
    hasher.update(SALT_PASSWORD_SEPARATOR);
    hasher.update(password.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Verifies `password` against a stored salt and hash.
///
/// Returns `Ok(false)` on mismatch and `Err` when the salt cannot be decoded.
/// The expected hash is compared case-insensitively.
pub fn verify_password(
    password: &str,
    salt_hex: &str,
    expected_hash: &str,
) -> Result<bool, CredentialError> {
    let computed = hash_password(password, salt_hex)?;
    Ok(computed == expected_hash.trim().to_ascii_lowercase())
}

/// Issues a new credential for `password` with a random salt.
pub fn issue_credential(password: &str) -> Result<Credential, CredentialError> {
    if password.is_empty() {
        return Err(CredentialError::EmptyPassword);
    }
    let salt = generate_salt()?;
    let hash = hash_password(password, &salt)?;
    Ok(Credential { salt, hash })
}

#[cfg(test)]
mod tests {
    use super::{
        generate_salt, hash_password, issue_credential, verify_password, CredentialError,
        SALT_LEN_BYTES,
    };

    #[test]
    fn hash_matches_known_vector() {
        // sha256(0x00 0x01 ':' "pw")
        let expected = {
            use sha2::{Digest, Sha256};
            hex::encode(Sha256::digest([0x00, 0x01, b':', b'p', b'w']))
        };
        assert_eq!(hash_password("pw", "0001").unwrap(), expected);
    }

    #[test]
    fn verify_accepts_exact_password_only() {
        let credential = issue_credential("hunter2").unwrap();
        assert!(verify_password("hunter2", &credential.salt, &credential.hash).unwrap());
        assert!(!verify_password("hunter3", &credential.salt, &credential.hash).unwrap());
        assert!(!verify_password("Hunter2", &credential.salt, &credential.hash).unwrap());
        assert!(!verify_password("hunter", &credential.salt, &credential.hash).unwrap());
    }

    #[test]
    fn verify_rejects_mismatched_salt() {
        let credential = issue_credential("hunter2").unwrap();
        let other_salt = generate_salt().unwrap();
        assert_ne!(other_salt, credential.salt);
        assert!(!verify_password("hunter2", &other_salt, &credential.hash).unwrap());
    }

    #[test]
    fn verify_compares_expected_hash_case_insensitively() {
        let credential = issue_credential("hunter2").unwrap();
        let upper = credential.hash.to_ascii_uppercase();
        assert!(verify_password("hunter2", &credential.salt, &upper).unwrap());
    }

    #[test]
    fn malformed_salt_is_an_error_not_a_mismatch() {
        let err = verify_password("hunter2", "not-hex", "00").unwrap_err();
        assert!(matches!(err, CredentialError::MalformedSalt(_)));
    }

    #[test]
    fn generated_salt_has_expected_length() {
        let salt = generate_salt().unwrap();
        assert_eq!(salt.len(), SALT_LEN_BYTES * 2);
        assert!(salt.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn issue_rejects_empty_password() {
        assert!(matches!(
            issue_credential(""),
            Err(CredentialError::EmptyPassword)
        ));
    }

    #[test]
    fn credential_debug_is_redacted() {
        let credential = issue_credential("hunter2").unwrap();
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains(&credential.hash));
    }
}
