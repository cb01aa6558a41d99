//! JSON bodies exchanged with key servers and trackers.
//!
//! Binary fields travel as lowercase hex. Both messages are signed by the
//! identity being provisioned, and the address is checked against the signing
//! key, so a receiver can verify a message without any prior state.

use crate::types::{Attributes, EndpointDescriptor};
use melange_crypto::{
    canonicalize_alias_registration_message, canonicalize_server_registration_message,
    current_timestamp, derive_address, open_from_identity, seal_for_server, sign_message,
    verify_signature, CryptoError, Identity, SealedPayload, X25519KeyPair, NONCE_SIZE,
    PUBLIC_KEY_SIZE, SIGNATURE_SIZE,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors building or checking a wire message
#[derive(Debug, Error)]
pub enum WireError {
    #[error("Malformed field {field}: {reason}")]
    Malformed { field: &'static str, reason: String },

    #[error("Address does not match signing key")]
    AddressMismatch,

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

type Result<T> = std::result::Result<T, WireError>;

fn decode_fixed<const N: usize>(field: &'static str, value: &str) -> Result<[u8; N]> {
    let bytes = hex::decode(value).map_err(|e| WireError::Malformed {
        field,
        reason: e.to_string(),
    })?;
    bytes.as_slice().try_into().map_err(|_| WireError::Malformed {
        field,
        reason: format!("expected {} bytes, got {}", N, bytes.len()),
    })
}

fn decode_hex(field: &'static str, value: &str) -> Result<Vec<u8>> {
    hex::decode(value).map_err(|e| WireError::Malformed {
        field,
        reason: e.to_string(),
    })
}

fn check_address(address: &str, signing_public_key: &[u8; PUBLIC_KEY_SIZE]) -> Result<()> {
    if derive_address(signing_public_key) != address {
        return Err(WireError::AddressMismatch);
    }
    Ok(())
}

fn encode_attributes(attributes: &Attributes) -> Result<Vec<u8>> {
    let encoded: BTreeMap<&str, String> = attributes
        .iter()
        .map(|(name, value)| (name.as_str(), hex::encode(value)))
        .collect();
    serde_json::to_vec(&encoded).map_err(|e| WireError::Malformed {
        field: "attributes",
        reason: e.to_string(),
    })
}

fn decode_attributes(plaintext: &[u8]) -> Result<Attributes> {
    let encoded: BTreeMap<String, String> =
        serde_json::from_slice(plaintext).map_err(|e| WireError::Malformed {
            field: "attributes",
            reason: e.to_string(),
        })?;

    encoded
        .into_iter()
        .map(|(name, value)| -> Result<(String, Vec<u8>)> {
            Ok((name, decode_hex("attributes", &value)?))
        })
        .collect()
}

/// Body of `POST {server}/v1/register`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRegistrationMessage {
    pub address: String,
    pub signing_public_key: String,
    pub encryption_public_key: String,
    pub server_fingerprint: String,
    pub nonce: String,
    /// Attributes sealed to the server's encryption key
    pub sealed_attributes: String,
    pub timestamp: u64,
    pub signature: String,
}

impl ServerRegistrationMessage {
    /// Seal `attributes` to `server` and sign the registration with `identity`
    pub fn build(
        identity: &Identity,
        server: &EndpointDescriptor,
        attributes: &Attributes,
    ) -> Result<Self> {
        let plaintext = encode_attributes(attributes)?;
        let sealed = seal_for_server(identity, &server.encryption_key, &plaintext)?;
        let timestamp = current_timestamp();

        let signing_public_key = identity.signing_public_key();
        let encryption_public_key = identity.encryption_public_key();
        let message = canonicalize_server_registration_message(
            &signing_public_key,
            &encryption_public_key,
            &server.fingerprint,
            &sealed.nonce,
            &sealed.ciphertext,
            timestamp,
        );
        let signature = sign_message(identity.signing_key_pair(), &message);

        Ok(Self {
            address: identity.address().to_string(),
            signing_public_key: hex::encode(signing_public_key),
            encryption_public_key: hex::encode(encryption_public_key),
            server_fingerprint: server.fingerprint.clone(),
            nonce: hex::encode(sealed.nonce),
            sealed_attributes: hex::encode(&sealed.ciphertext),
            timestamp,
            signature: hex::encode(signature),
        })
    }

    /// Verify the signature and address binding, then open the attributes
    ///
    /// Server side counterpart of [`ServerRegistrationMessage::build`].
    pub fn open(&self, server_key: &X25519KeyPair) -> Result<Attributes> {
        let signing_public_key: [u8; PUBLIC_KEY_SIZE] =
            decode_fixed("signing_public_key", &self.signing_public_key)?;
        let encryption_public_key: [u8; PUBLIC_KEY_SIZE] =
            decode_fixed("encryption_public_key", &self.encryption_public_key)?;
        let nonce: [u8; NONCE_SIZE] = decode_fixed("nonce", &self.nonce)?;
        let ciphertext = decode_hex("sealed_attributes", &self.sealed_attributes)?;
        let signature: [u8; SIGNATURE_SIZE] = decode_fixed("signature", &self.signature)?;

        check_address(&self.address, &signing_public_key)?;

        let message = canonicalize_server_registration_message(
            &signing_public_key,
            &encryption_public_key,
            &self.server_fingerprint,
            &nonce,
            &ciphertext,
            self.timestamp,
        );
        verify_signature(&signing_public_key, &message, &signature)?;

        let sealed = SealedPayload { nonce, ciphertext };
        let plaintext =
            open_from_identity(server_key, &encryption_public_key, &self.address, &sealed)?;
        decode_attributes(&plaintext)
    }
}

/// Body a server answers a successful registration with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationReceipt {
    pub address: String,
}

/// Body of `POST {tracker}/v1/aliases`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRegistrationMessage {
    pub alias: String,
    pub address: String,
    pub signing_public_key: String,
    pub encryption_public_key: String,
    pub timestamp: u64,
    pub signature: String,
}

impl AliasRegistrationMessage {
    /// Claim `alias` for `identity`, signed by the identity itself
    pub fn build(identity: &Identity, alias: &str) -> Self {
        let signing_public_key = identity.signing_public_key();
        let encryption_public_key = identity.encryption_public_key();
        let timestamp = current_timestamp();

        let message = canonicalize_alias_registration_message(
            alias,
            identity.address(),
            &signing_public_key,
            &encryption_public_key,
            timestamp,
        );
        let signature = sign_message(identity.signing_key_pair(), &message);

        Self {
            alias: alias.to_string(),
            address: identity.address().to_string(),
            signing_public_key: hex::encode(signing_public_key),
            encryption_public_key: hex::encode(encryption_public_key),
            timestamp,
            signature: hex::encode(signature),
        }
    }

    /// Verify the signature and that the address belongs to the signing key
    pub fn verify(&self) -> Result<()> {
        let signing_public_key: [u8; PUBLIC_KEY_SIZE] =
            decode_fixed("signing_public_key", &self.signing_public_key)?;
        let encryption_public_key: [u8; PUBLIC_KEY_SIZE] =
            decode_fixed("encryption_public_key", &self.encryption_public_key)?;
        let signature: [u8; SIGNATURE_SIZE] = decode_fixed("signature", &self.signature)?;

        check_address(&self.address, &signing_public_key)?;

        let message = canonicalize_alias_registration_message(
            &self.alias,
            &self.address,
            &signing_public_key,
            &encryption_public_key,
            self.timestamp,
        );
        verify_signature(&signing_public_key, &message, &signature)?;
        Ok(())
    }
}

/// Body a tracker answers a successful alias claim with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasReceipt {
    pub alias: String,
    pub address: String,
}
