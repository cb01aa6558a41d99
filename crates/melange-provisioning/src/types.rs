//! Provisioning type definitions.

use melange_crypto::{SealedPayload, PUBLIC_KEY_SIZE};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};
use uuid::Uuid;

/// Settings key under which the active identity's address is stored
pub const ACTIVE_IDENTITY_KEY: &str = "current_identity";

/// Attributes sent to the server on registration
pub type Attributes = BTreeMap<String, Vec<u8>>;

/// Caller supplied provisioning request
///
/// Every field is untrusted and defaults to the empty string when absent.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningRequest {
    pub first: String,
    pub last: String,
    pub about: String,
    /// Accepted for compatibility with existing clients, never used or stored
    pub password: String,
    pub server: String,
    pub tracker: String,
    pub alias: String,
    pub nickname: String,
}

impl ProvisioningRequest {
    /// Display name registered with the server
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first, self.last)
    }

    /// Registration attributes: `name` always, `about` when given
    pub fn attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert("name".to_string(), self.display_name().into_bytes());
        if !self.about.is_empty() {
            attributes.insert("about".to_string(), self.about.clone().into_bytes());
        }
        attributes
    }
}

impl fmt::Debug for ProvisioningRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisioningRequest")
            .field("first", &self.first)
            .field("last", &self.last)
            .field("server", &self.server)
            .field("tracker", &self.tracker)
            .field("nickname", &self.nickname)
            .finish_non_exhaustive()
    }
}

/// Kind of remote endpoint held by the directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    Server,
    Tracker,
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointKind::Server => f.write_str("server"),
            EndpointKind::Tracker => f.write_str("tracker"),
        }
    }
}

/// Verified connection details of a server or tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub kind: EndpointKind,
    pub reference: String,
    /// Base URL without trailing slash
    pub url: String,
    pub encryption_key: [u8; PUBLIC_KEY_SIZE],
    pub fingerprint: String,
}

/// Generated key of a persisted row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordHandle(pub Uuid);

impl RecordHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Durable identity row, one per address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub address: String,
    pub nickname: String,
    pub server_url: String,
    pub server_encryption_key: [u8; PUBLIC_KEY_SIZE],
    pub server_fingerprint: String,
    pub signing_public_key: [u8; PUBLIC_KEY_SIZE],
    pub encryption_public_key: [u8; PUBLIC_KEY_SIZE],
    pub created_at: u64,
}

/// Alias bound to an identity on a tracker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRecord {
    pub identity_ref: RecordHandle,
    /// Tracker URL
    pub location: String,
    pub alias: String,
    pub created_at: u64,
}

/// Identity row as stored, with its wrapped key material
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredIdentity {
    pub handle: RecordHandle,
    pub record: IdentityRecord,
    pub wrapped_keys: SealedPayload,
}

/// Result of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningOutcome {
    pub address: String,
    pub identity_handle: RecordHandle,
    pub alias_handle: RecordHandle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_fields_default_to_empty() {
        let request: ProvisioningRequest = serde_json::from_str(r#"{"first": "Ada"}"#).unwrap();
        assert_eq!(request.first, "Ada");
        assert_eq!(request.nickname, "");
        assert_eq!(request.alias, "");
    }

    #[test]
    fn test_attributes_include_about_only_when_present() {
        let mut request = ProvisioningRequest {
            first: "Ada".to_string(),
            last: "Lovelace".to_string(),
            ..Default::default()
        };

        let attributes = request.attributes();
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes["name"], b"Ada Lovelace".to_vec());

        request.about = "Analyst".to_string();
        assert_eq!(request.attributes()["about"], b"Analyst".to_vec());
    }

    #[test]
    fn test_debug_omits_password() {
        let request = ProvisioningRequest {
            password: "hunter2".to_string(),
            ..Default::default()
        };
        assert!(!format!("{:?}", request).contains("hunter2"));
    }
}
