//! Static directory of known servers and trackers.

use crate::{errors::*, traits::DirectoryLookup, types::*};
use async_trait::async_trait;
use melange_crypto::{derive_fingerprint, PUBLIC_KEY_SIZE};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::Path};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// One endpoint as written in the directory file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub reference: String,
    pub url: String,
    /// Hex encoded X25519 public key
    pub encryption_key: String,
    /// Hex of the first 16 bytes of BLAKE3(encryption_key)
    pub fingerprint: String,
}

impl DirectoryEntry {
    /// Build an entry for `encryption_key`, computing its fingerprint
    pub fn new(
        reference: impl Into<String>,
        url: impl Into<String>,
        encryption_key: &[u8; PUBLIC_KEY_SIZE],
    ) -> Self {
        Self {
            reference: reference.into(),
            url: url.into(),
            encryption_key: hex::encode(encryption_key),
            fingerprint: derive_fingerprint(encryption_key),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DirectoryFile {
    #[serde(default)]
    servers: Vec<DirectoryEntry>,
    #[serde(default)]
    trackers: Vec<DirectoryEntry>,
}

/// Failure to load the directory file
#[derive(Debug, Error)]
pub enum DirectoryLoadError {
    #[error("Failed to read directory file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse directory file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Directory backed by a fixed table of endpoints
///
/// Entries are verified on every resolution, never on load, so a bad entry
/// only fails the runs that actually use it.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    servers: HashMap<String, DirectoryEntry>,
    trackers: HashMap<String, DirectoryEntry>,
}

impl StaticDirectory {
    pub fn new(servers: Vec<DirectoryEntry>, trackers: Vec<DirectoryEntry>) -> Self {
        let index = |entries: Vec<DirectoryEntry>| -> HashMap<String, DirectoryEntry> {
            entries
                .into_iter()
                .map(|entry| (entry.reference.clone(), entry))
                .collect()
        };

        Self {
            servers: index(servers),
            trackers: index(trackers),
        }
    }

    /// Parse `{"servers": [...], "trackers": [...]}`
    pub fn from_json(json: &str) -> std::result::Result<Self, DirectoryLoadError> {
        let file: DirectoryFile = serde_json::from_str(json)?;
        Ok(Self::new(file.servers, file.trackers))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> std::result::Result<Self, DirectoryLoadError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.servers.len() + self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn verify(kind: EndpointKind, entry: &DirectoryEntry) -> Result<EndpointDescriptor> {
        let fail = |reason: String| ProvisioningError::Resolution {
            kind,
            reference: entry.reference.clone(),
            reason,
        };

        let url = Url::parse(&entry.url).map_err(|e| fail(format!("invalid URL: {}", e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(fail(format!("unsupported URL scheme: {}", url.scheme())));
        }

        let key_bytes =
            hex::decode(&entry.encryption_key).map_err(|e| fail(format!("invalid key: {}", e)))?;
        let encryption_key: [u8; PUBLIC_KEY_SIZE] = key_bytes
            .as_slice()
            .try_into()
            .map_err(|_| fail(format!("key must be {} bytes", PUBLIC_KEY_SIZE)))?;

        let fingerprint = derive_fingerprint(&encryption_key);
        if !fingerprint.eq_ignore_ascii_case(&entry.fingerprint) {
            return Err(fail("fingerprint does not match key".to_string()));
        }

        Ok(EndpointDescriptor {
            kind,
            reference: entry.reference.clone(),
            url: entry.url.trim_end_matches('/').to_string(),
            encryption_key,
            fingerprint,
        })
    }
}

#[async_trait]
impl DirectoryLookup for StaticDirectory {
    async fn resolve(&self, kind: EndpointKind, reference: &str) -> Result<EndpointDescriptor> {
        let table = match kind {
            EndpointKind::Server => &self.servers,
            EndpointKind::Tracker => &self.trackers,
        };

        let entry = table
            .get(reference)
            .ok_or_else(|| ProvisioningError::UnknownReference {
                kind,
                reference: reference.to_string(),
            })?;

        let descriptor = Self::verify(kind, entry)?;
        debug!(%kind, reference, url = %descriptor.url, "Resolved endpoint");
        Ok(descriptor)
    }
}
