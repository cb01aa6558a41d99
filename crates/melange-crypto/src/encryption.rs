//! Encryption operations using XChaCha20-Poly1305.

use crate::{
    constants::*,
    derivation::{derive_key_wrap_key, derive_server_seal_key},
    errors::*,
    keys::{generate_nonce, Identity, X25519KeyPair},
};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use serde::{Deserialize, Serialize};

/// Ciphertext together with the nonce it was produced under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedPayload {
    /// 24-byte XChaCha20 nonce
    pub nonce: [u8; NONCE_SIZE],
    /// Ciphertext with 16-byte tag appended
    pub ciphertext: Vec<u8>,
}

/// Encrypt data using XChaCha20-Poly1305 AEAD
///
/// # Arguments
///
/// * `key` - 32-byte encryption key
/// * `plaintext` - Data to encrypt
/// * `nonce` - 24-byte nonce (MUST be unique per key)
/// * `aad` - Associated authenticated data
pub fn encrypt(
    key: &[u8; 32],
    plaintext: &[u8],
    nonce: &[u8; NONCE_SIZE],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(key.into());
    let xnonce = XNonce::from_slice(nonce);

    let payload = Payload {
        msg: plaintext,
        aad,
    };

    cipher
        .encrypt(xnonce, payload)
        .map_err(|e| CryptoError::Seal(e.to_string()))
}

/// Decrypt data using XChaCha20-Poly1305 AEAD
pub fn decrypt(
    key: &[u8; 32],
    ciphertext: &[u8],
    nonce: &[u8; NONCE_SIZE],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(key.into());
    let xnonce = XNonce::from_slice(nonce);

    let payload = Payload {
        msg: ciphertext,
        aad,
    };

    cipher
        .decrypt(xnonce, payload)
        .map_err(|e| CryptoError::Open(e.to_string()))
}

fn server_seal_aad(address: &str) -> Vec<u8> {
    let mut aad = Vec::with_capacity(DOMAIN_SERVER_SEAL_AAD.len() + address.len());
    aad.extend_from_slice(DOMAIN_SERVER_SEAL_AAD.as_bytes());
    aad.extend_from_slice(address.as_bytes());
    aad
}

/// Seal registration attributes from a new identity to a server
///
/// Only the holder of the server's X25519 secret can open the payload, and it
/// only opens against the identity's own encryption key, which binds the
/// attributes to the identity that sent them.
pub fn seal_for_server(
    identity: &Identity,
    server_encryption_key: &[u8; PUBLIC_KEY_SIZE],
    plaintext: &[u8],
) -> Result<SealedPayload> {
    let shared = identity
        .encryption_key_pair()
        .diffie_hellman(server_encryption_key);
    let key = derive_server_seal_key(
        &shared,
        &identity.encryption_public_key(),
        server_encryption_key,
    )?;

    let nonce = generate_nonce()?;
    let ciphertext = encrypt(&key, plaintext, &nonce, &server_seal_aad(identity.address()))?;

    Ok(SealedPayload { nonce, ciphertext })
}

/// Open attributes sealed with [`seal_for_server`] on the server side
pub fn open_from_identity(
    server_key: &X25519KeyPair,
    identity_encryption_public_key: &[u8; PUBLIC_KEY_SIZE],
    identity_address: &str,
    sealed: &SealedPayload,
) -> Result<Vec<u8>> {
    let shared = server_key.diffie_hellman(identity_encryption_public_key);
    let key = derive_server_seal_key(
        &shared,
        identity_encryption_public_key,
        &server_key.public_key_bytes(),
    )?;

    decrypt(
        &key,
        &sealed.ciphertext,
        &sealed.nonce,
        &server_seal_aad(identity_address),
    )
}

fn key_wrap_aad(address: &str) -> Vec<u8> {
    let mut aad = Vec::with_capacity(DOMAIN_KEY_WRAP_AAD.len() + address.len());
    aad.extend_from_slice(DOMAIN_KEY_WRAP_AAD.as_bytes());
    aad.extend_from_slice(address.as_bytes());
    aad
}

/// Wrap an identity's secret material under the service master key
///
/// The address is bound as AAD so a wrapped blob cannot be moved to another record.
pub fn wrap_identity_keys(
    service_master_key: &[u8; 32],
    identity: &Identity,
) -> Result<SealedPayload> {
    let key = derive_key_wrap_key(service_master_key)?;
    let nonce = generate_nonce()?;
    let material = identity.secret_material();
    let ciphertext = encrypt(&key, &material, &nonce, &key_wrap_aad(identity.address()))?;

    Ok(SealedPayload { nonce, ciphertext })
}

/// Unwrap key material produced by [`wrap_identity_keys`]
///
/// Fails if the blob was wrapped for another address or the rebuilt identity
/// does not derive to `address`.
pub fn unwrap_identity_keys(
    service_master_key: &[u8; 32],
    address: &str,
    wrapped: &SealedPayload,
) -> Result<Identity> {
    let key = derive_key_wrap_key(service_master_key)?;
    let material = zeroize::Zeroizing::new(decrypt(
        &key,
        &wrapped.ciphertext,
        &wrapped.nonce,
        &key_wrap_aad(address),
    )?);

    let identity = Identity::from_secret_material(&material)?;
    if identity.address() != address {
        return Err(CryptoError::KeyMismatch {
            address: address.to_string(),
        });
    }

    Ok(identity)
}
