//! Digital signature operations using Ed25519.

use crate::{constants::*, errors::*, hashing::blake3_hash, keys::Ed25519KeyPair};
use ed25519_dalek::{Signature, Signer, Verifier, VerifyingKey};

/// Sign a message with Ed25519
///
/// Returns the 64-byte signature
pub fn sign_message(keypair: &Ed25519KeyPair, message: &[u8]) -> [u8; SIGNATURE_SIZE] {
    let signature = keypair.private_key().sign(message);
    signature.to_bytes()
}

/// Verify an Ed25519 signature
///
/// `Ok(())` if the signature is valid, `Err` otherwise
pub fn verify_signature(
    public_key: &[u8; PUBLIC_KEY_SIZE],
    message: &[u8],
    signature: &[u8; SIGNATURE_SIZE],
) -> Result<()> {
    let verifying_key = VerifyingKey::from_bytes(public_key)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;

    let sig = Signature::from_bytes(signature);

    verifying_key
        .verify(message, &sig)
        .map_err(|_| CryptoError::BadSignature)
}

fn push_len_prefixed(message: &mut Vec<u8>, field: &[u8]) {
    message.extend_from_slice(&(field.len() as u32).to_be_bytes());
    message.extend_from_slice(field);
}

/// Create the canonical message an identity signs when registering with a server
///
/// Format: version(1) || domain || signing_public_key(32) ||
///         encryption_public_key(32) || len(4) || server_fingerprint ||
///         BLAKE3(nonce || sealed_attributes)(32) || timestamp(8)
pub fn canonicalize_server_registration_message(
    signing_public_key: &[u8; PUBLIC_KEY_SIZE],
    encryption_public_key: &[u8; PUBLIC_KEY_SIZE],
    server_fingerprint: &str,
    nonce: &[u8; NONCE_SIZE],
    sealed_attributes: &[u8],
    timestamp: u64,
) -> Vec<u8> {
    let mut sealed = Vec::with_capacity(NONCE_SIZE + sealed_attributes.len());
    sealed.extend_from_slice(nonce);
    sealed.extend_from_slice(sealed_attributes);
    let payload_hash = blake3_hash(&sealed);

    let keys_len = 2 * PUBLIC_KEY_SIZE;
    let fingerprint_len = 4 + server_fingerprint.len();
    let mut message = Vec::with_capacity(
        1 + DOMAIN_SERVER_REGISTRATION.len() + keys_len + fingerprint_len + 32 + 8,
    );
    message.push(MESSAGE_VERSION);
    message.extend_from_slice(DOMAIN_SERVER_REGISTRATION.as_bytes());
    message.extend_from_slice(signing_public_key);
    message.extend_from_slice(encryption_public_key);
    push_len_prefixed(&mut message, server_fingerprint.as_bytes());
    message.extend_from_slice(&payload_hash);
    message.extend_from_slice(&timestamp.to_be_bytes());
    message
}

/// Create the canonical message an identity signs when claiming an alias on a tracker
///
/// Format: version(1) || domain || len(4) || alias || len(4) || address ||
///         signing_public_key(32) || encryption_public_key(32) || timestamp(8)
pub fn canonicalize_alias_registration_message(
    alias: &str,
    address: &str,
    signing_public_key: &[u8; PUBLIC_KEY_SIZE],
    encryption_public_key: &[u8; PUBLIC_KEY_SIZE],
    timestamp: u64,
) -> Vec<u8> {
    let names_len = 8 + alias.len() + address.len();
    let mut message = Vec::with_capacity(
        1 + DOMAIN_ALIAS_REGISTRATION.len() + names_len + 2 * PUBLIC_KEY_SIZE + 8,
    );
    message.push(MESSAGE_VERSION);
    message.extend_from_slice(DOMAIN_ALIAS_REGISTRATION.as_bytes());
    push_len_prefixed(&mut message, alias.as_bytes());
    push_len_prefixed(&mut message, address.as_bytes());
    message.extend_from_slice(signing_public_key);
    message.extend_from_slice(encryption_public_key);
    message.extend_from_slice(&timestamp.to_be_bytes());
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let keypair = Ed25519KeyPair::from_seed(&[42u8; 32]);
        let message = b"test message";

        let signature = sign_message(&keypair, message);
        assert!(verify_signature(&keypair.public_key_bytes(), message, &signature).is_ok());
        assert!(matches!(
            verify_signature(&keypair.public_key_bytes(), b"wrong message", &signature),
            Err(CryptoError::BadSignature)
        ));
    }

    #[test]
    fn test_alias_message_length_prefix_prevents_ambiguity() {
        let pk = [1u8; 32];
        let m1 = canonicalize_alias_registration_message("ab", "cdef", &pk, &pk, 7);
        let m2 = canonicalize_alias_registration_message("abc", "def", &pk, &pk, 7);
        assert_ne!(m1, m2);
    }

    #[test]
    fn test_server_message_covers_sealed_payload() {
        let pk = [1u8; 32];
        let nonce = [0u8; NONCE_SIZE];
        let m1 = canonicalize_server_registration_message(&pk, &pk, "fp", &nonce, b"one", 7);
        let m2 = canonicalize_server_registration_message(&pk, &pk, "fp", &nonce, b"two", 7);
        assert_ne!(m1, m2);
        assert_eq!(m1[0], MESSAGE_VERSION);
    }

    #[test]
    fn test_message_timestamp_is_big_endian_suffix() {
        let pk = [1u8; 32];
        let message = canonicalize_alias_registration_message("ada", "addr", &pk, &pk, 0x0102);
        assert_eq!(&message[message.len() - 8..], &0x0102u64.to_be_bytes());
    }
}
