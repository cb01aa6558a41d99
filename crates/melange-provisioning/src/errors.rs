//! Provisioning error types.

use crate::{state::ProvisioningState, types::EndpointKind};
use std::fmt;
use thiserror::Error;

/// Why a tracker refused or failed an alias registration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerRejection {
    /// The alias is already bound to another identity on this tracker
    #[error("alias already taken")]
    AliasTaken,

    /// The tracker could not be reached or the exchange broke off
    #[error("transport failure: {0}")]
    Transport(String),

    /// The tracker answered with an unexpected status or body
    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The tracker refused the identity's signature
    #[error("signature refused")]
    Signature,
}

/// Which write of the persistence step failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceStage {
    IdentityInsert,
    AliasInsert,
    ActivePointerWrite,
}

impl fmt::Display for PersistenceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            PersistenceStage::IdentityInsert => "identity-insert",
            PersistenceStage::AliasInsert => "alias-insert",
            PersistenceStage::ActivePointerWrite => "active-pointer-write",
        };
        f.write_str(stage)
    }
}

/// Provisioning errors
///
/// None of these are retried by the workflow.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// Request body present but not a valid provisioning request
    #[error("Malformed provisioning request: {0}")]
    Decoding(String),

    /// Directory has no endpoint under this reference
    #[error("Unknown {kind} reference: {reference}")]
    UnknownReference { kind: EndpointKind, reference: String },

    /// Directory entry found but failed verification
    #[error("Failed to resolve {kind} reference {reference}: {reason}")]
    Resolution {
        kind: EndpointKind,
        reference: String,
        reason: String,
    },

    /// Randomness source failed
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// Server refused the registration or the exchange failed
    #[error("Server registration failed: {0}")]
    ServerRegistration(String),

    /// Alias registration failed on the named tracker
    #[error("Tracker registration failed at {tracker}: {reason}")]
    TrackerRegistration {
        tracker: String,
        reason: TrackerRejection,
    },

    /// A persistence write failed
    #[error("Persistence failed at {stage}: {reason}")]
    Persistence {
        stage: PersistenceStage,
        reason: String,
    },

    /// Storage error on the read side
    #[error("Storage error: {0}")]
    Storage(#[from] melange_storage::StorageError),

    /// Cryptographic error on the read side
    #[error("Cryptographic error: {0}")]
    Crypto(#[from] melange_crypto::CryptoError),
}

impl ProvisioningError {
    pub(crate) fn persistence(stage: PersistenceStage, reason: impl ToString) -> Self {
        ProvisioningError::Persistence {
            stage,
            reason: reason.to_string(),
        }
    }
}

/// A failed run: the last state reached and the error that ended it
#[derive(Debug, Error)]
#[error("provisioning failed at {state}: {error}")]
pub struct ProvisioningFailure {
    pub state: ProvisioningState,
    #[source]
    pub error: ProvisioningError,
}

/// Result type for provisioning operations
pub type Result<T> = std::result::Result<T, ProvisioningError>;
