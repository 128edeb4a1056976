//! Password set/verify pair. Hashing is delegated to bcrypt; its verify
//! compares inside the library in constant time.

/// Hash a plaintext password for storage. Replaces any previous hash
/// unconditionally at the call site.
pub fn set_password(plaintext: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(plaintext, cost)
}

/// Check a plaintext password against a stored hash. Any bcrypt error
/// (malformed hash, etc.) reads as a non-match rather than leaking detail.
pub fn verify_password(plaintext: &str, hash: &str) -> bool {
    bcrypt::verify(plaintext, hash).unwrap_or(false)
}
