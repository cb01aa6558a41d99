//! Hashing utilities using BLAKE3 and Argon2id.

use crate::{constants::*, errors::*};
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use blake3::Hasher as Blake3Hasher;

/// Hash data using BLAKE3
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake3Hasher::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Derive the address of an identity from its Ed25519 public key
///
/// Format: hex(BLAKE3("melange:identity:address:v1" || signing_public_key)[..20])
pub fn derive_address(signing_public_key: &[u8; PUBLIC_KEY_SIZE]) -> String {
    let mut hasher = Blake3Hasher::new();
    hasher.update(DOMAIN_ADDRESS.as_bytes());
    hasher.update(signing_public_key);
    let hash = hasher.finalize();
    hex::encode(&hash.as_bytes()[..ADDRESS_SIZE])
}

/// Derive the fingerprint of an endpoint encryption key
///
/// Format: hex(BLAKE3(encryption_key)[..16])
pub fn derive_fingerprint(encryption_key: &[u8; PUBLIC_KEY_SIZE]) -> String {
    let hash = blake3_hash(encryption_key);
    hex::encode(&hash[..FINGERPRINT_SIZE])
}

/// Short, non-reversible digest of a value for log lines
pub fn hash_for_log(value: &str) -> String {
    let hash = blake3_hash(value.as_bytes());
    hex::encode(&hash[..8])
}

/// Hash a password using Argon2id
///
/// # Returns
///
/// PHC-formatted hash string that includes algorithm, parameters, salt, and hash
pub fn hash_password(password: &[u8], salt: &SaltString) -> Result<String> {
    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2_params::VERSION,
        argon2_params::get_params(),
    );

    let password_hash = argon2
        .hash_password(password, salt)
        .map_err(|e| CryptoError::PasswordHash(e.to_string()))?;

    Ok(password_hash.to_string())
}

/// Verify a password against an Argon2id hash
///
/// `Ok(())` if the password matches, `Err` otherwise
pub fn verify_password(password: &[u8], hash_str: &str) -> Result<()> {
    let parsed_hash = PasswordHash::new(hash_str).map_err(|_| CryptoError::MalformedPasswordHash)?;

    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2_params::VERSION,
        argon2_params::get_params(),
    );

    argon2
        .verify_password(password, &parsed_hash)
        .map_err(|e| CryptoError::PasswordHash(e.to_string()))
}

/// Generate a random salt for password hashing
pub fn generate_salt() -> SaltString {
    SaltString::generate(&mut rand::rngs::OsRng)
}
