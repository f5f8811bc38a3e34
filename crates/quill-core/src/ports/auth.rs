//! Credential hashing port.

/// One-way password hashing. Implementations return salted, versioned
/// hash strings; plaintext never leaves the caller.
pub trait PasswordService: Send + Sync {
    /// Hash a plain text password.
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// Verify a password against a hash.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError>;
}

/// Authentication errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Hashing error: {0}")]
    HashingError(String),

    #[error("Malformed password hash: {0}")]
    MalformedHash(String),
}
