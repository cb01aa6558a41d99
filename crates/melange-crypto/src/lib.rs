//! # melange-crypto
//!
//! Cryptographic primitives for melange identities.
//!
//! This crate provides:
//! - Identity key generation (Ed25519 signing plus X25519 encryption) and address derivation
//! - Endpoint fingerprints for verifying directory entries
//! - Canonical registration messages and Ed25519 signatures over them
//! - Sealing of payloads to a remote endpoint's encryption key
//! - Wrapping of identity key material at rest
//! - Argon2id password hashing for local accounts
//!
//! ## Security Properties
//!
//! - Secret key material is zeroized on drop
//! - No unsafe code
//! - Strict domain separation for all derivations

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod constants;
pub mod derivation;
pub mod encryption;
pub mod errors;
pub mod hashing;
pub mod keys;
pub mod signatures;
pub mod utils;

pub use constants::*;
pub use derivation::*;
pub use encryption::*;
pub use errors::{CryptoError, Result};
pub use hashing::*;
pub use keys::*;
pub use signatures::*;
pub use utils::current_timestamp;
