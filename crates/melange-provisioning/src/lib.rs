//! # melange-provisioning
//!
//! Provisioning of new cryptographic identities.
//!
//! One run of the workflow:
//! - generates fresh key material
//! - resolves the requested server and tracker through the directory
//! - registers the identity with the server, then its alias with the tracker
//! - persists the identity and alias records and marks the identity active
//!
//! Steps run strictly in order and the first failure ends the run. Nothing is
//! compensated: a server registration stays in place if a later step fails.

#![warn(clippy::all)]

pub mod directory;
pub mod errors;
pub mod persistence;
pub mod registrar;
pub mod service;
pub mod state;
pub mod traits;
pub mod types;
pub mod wire;

pub use directory::{DirectoryEntry, DirectoryLoadError, StaticDirectory};
pub use errors::{
    PersistenceStage, ProvisioningError, ProvisioningFailure, Result, TrackerRejection,
};
pub use persistence::StoragePersistence;
pub use registrar::{HttpServerRegistrar, HttpTrackerRegistrar};
pub use service::{decode_request, ProvisioningService};
pub use state::ProvisioningState;
pub use traits::{
    DirectoryLookup, IdentityPersistence, KeyMaterialGenerator, OsKeyGenerator, ServerRegistrar,
    TrackerRegistrar,
};
pub use types::*;
