//! Key derivation using HKDF-SHA256.

use crate::{constants::*, errors::*};
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Derive a key using HKDF-SHA256
pub fn hkdf_derive(ikm: &[u8], info: &[u8], output_len: usize) -> Result<Vec<u8>> {
    let hkdf = Hkdf::<Sha256>::new(None, ikm);
    let mut output = vec![0u8; output_len];

    hkdf.expand(info, &mut output)
        .map_err(|_| CryptoError::KeyDerivation)?;

    Ok(output)
}

/// Derive a 32-byte key using HKDF-SHA256
pub fn hkdf_derive_32(ikm: &[u8], info: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
    let output = Zeroizing::new(hkdf_derive(ikm, info, 32)?);
    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&output);
    Ok(key)
}

/// Derive the sealing key shared between a new identity and a server
///
/// Formula: HKDF(X25519(a, B), "melange:server:seal:v1" || identity_enc_pk || server_enc_pk)
///
/// Both sides compute the same key: the identity from its secret and the
/// server's public key, the server from its secret and the identity's public key.
pub fn derive_server_seal_key(
    shared_secret: &[u8; 32],
    identity_encryption_public_key: &[u8; PUBLIC_KEY_SIZE],
    server_encryption_public_key: &[u8; PUBLIC_KEY_SIZE],
) -> Result<Zeroizing<[u8; 32]>> {
    let mut info = Vec::with_capacity(DOMAIN_SERVER_SEAL.len() + 2 * PUBLIC_KEY_SIZE);
    info.extend_from_slice(DOMAIN_SERVER_SEAL.as_bytes());
    info.extend_from_slice(identity_encryption_public_key);
    info.extend_from_slice(server_encryption_public_key);

    hkdf_derive_32(shared_secret, &info)
}

/// Derive the key that wraps identity key material at rest
///
/// Formula: HKDF(service_master_key, "melange:identity:key-wrap:v1")
pub fn derive_key_wrap_key(service_master_key: &[u8; 32]) -> Result<Zeroizing<[u8; 32]>> {
    hkdf_derive_32(service_master_key, DOMAIN_KEY_WRAP.as_bytes())
}
