//! Tests for the provisioning workflow.

use super::*;
use crate::{directory::*, persistence::StoragePersistence};
use async_trait::async_trait;
use melange_crypto::{derive_address, Identity};
use melange_storage::{RocksDbStorage, Storage, CF_ALIASES, CF_IDENTITIES};
use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

const SERVER_KEY: [u8; 32] = [1u8; 32];
const TRACKER_KEY: [u8; 32] = [2u8; 32];
const SERVER_URL: &str = "http://srv1.example";
const TRACKER_URL: &str = "http://trk1.example";
const DOWN_TRACKER_URL: &str = "http://trk-down.example";
const MASTER_KEY: [u8; 32] = [9u8; 32];

#[derive(Default)]
struct RecordingServerRegistrar {
    calls: Mutex<Vec<(String, Attributes)>>,
    refuse: bool,
}

#[async_trait]
impl ServerRegistrar for RecordingServerRegistrar {
    async fn register(
        &self,
        identity: &Identity,
        server: &EndpointDescriptor,
        attributes: &Attributes,
    ) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((identity.address().to_string(), attributes.clone()));

        if self.refuse {
            return Err(ProvisioningError::ServerRegistration(format!(
                "{} refused",
                server.url
            )));
        }
        Ok(())
    }
}

/// Tracker double keeping aliases unique across runs
#[derive(Default)]
struct RecordingTrackerRegistrar {
    calls: Mutex<Vec<(String, String)>>,
    /// Address of the identity each alias claim was signed with
    signers: Mutex<Vec<String>>,
    taken: Mutex<HashSet<String>>,
}

#[async_trait]
impl TrackerRegistrar for RecordingTrackerRegistrar {
    async fn register_alias(
        &self,
        identity: &Identity,
        trackers: &[String],
        alias: &str,
    ) -> Result<()> {
        self.signers
            .lock()
            .unwrap()
            .push(identity.address().to_string());

        for tracker in trackers {
            self.calls
                .lock()
                .unwrap()
                .push((tracker.clone(), alias.to_string()));

            let reason = if tracker == DOWN_TRACKER_URL {
                TrackerRejection::Transport("connection refused".to_string())
            } else if !self.taken.lock().unwrap().insert(alias.to_string()) {
                TrackerRejection::AliasTaken
            } else {
                continue;
            };

            return Err(ProvisioningError::TrackerRegistration {
                tracker: tracker.clone(),
                reason,
            });
        }
        Ok(())
    }
}

struct FailingKeyGenerator;

impl KeyMaterialGenerator for FailingKeyGenerator {
    fn generate(&self) -> Result<Identity> {
        Err(ProvisioningError::KeyGeneration("entropy unavailable".to_string()))
    }
}

/// Delegates everything but refuses to move the active pointer
struct FailingActivePointer(StoragePersistence<RocksDbStorage>);

#[async_trait]
impl IdentityPersistence for FailingActivePointer {
    async fn persist(&self, record: IdentityRecord, identity: Identity) -> Result<RecordHandle> {
        self.0.persist(record, identity).await
    }

    async fn persist_alias(&self, alias: AliasRecord) -> Result<RecordHandle> {
        self.0.persist_alias(alias).await
    }

    async fn set_active(&self, _address: &str) -> Result<()> {
        Err(ProvisioningError::Persistence {
            stage: PersistenceStage::ActivePointerWrite,
            reason: "settings unavailable".to_string(),
        })
    }

    async fn active(&self) -> Result<Option<String>> {
        self.0.active().await
    }

    async fn identity_by_address(&self, address: &str) -> Result<Option<StoredIdentity>> {
        self.0.identity_by_address(address).await
    }

    async fn aliases_for(&self, identity: RecordHandle) -> Result<Vec<AliasRecord>> {
        self.0.aliases_for(identity).await
    }

    async fn load_identity(&self, address: &str) -> Result<Option<Identity>> {
        self.0.load_identity(address).await
    }
}

/// Refuses the identity row and counts alias inserts that reach it anyway
struct FailingIdentityInsert {
    inner: StoragePersistence<RocksDbStorage>,
    alias_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl IdentityPersistence for FailingIdentityInsert {
    async fn persist(&self, _record: IdentityRecord, _identity: Identity) -> Result<RecordHandle> {
        Err(ProvisioningError::Persistence {
            stage: PersistenceStage::IdentityInsert,
            reason: "identities unavailable".to_string(),
        })
    }

    async fn persist_alias(&self, alias: AliasRecord) -> Result<RecordHandle> {
        self.alias_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.persist_alias(alias).await
    }

    async fn set_active(&self, address: &str) -> Result<()> {
        self.inner.set_active(address).await
    }

    async fn active(&self) -> Result<Option<String>> {
        self.inner.active().await
    }

    async fn identity_by_address(&self, address: &str) -> Result<Option<StoredIdentity>> {
        self.inner.identity_by_address(address).await
    }

    async fn aliases_for(&self, identity: RecordHandle) -> Result<Vec<AliasRecord>> {
        self.inner.aliases_for(identity).await
    }

    async fn load_identity(&self, address: &str) -> Result<Option<Identity>> {
        self.inner.load_identity(address).await
    }
}

fn test_directory() -> StaticDirectory {
    let mut tampered = DirectoryEntry::new("trk-bad", "http://trk-bad.example", &TRACKER_KEY);
    tampered.fingerprint = "00".repeat(16);

    StaticDirectory::new(
        vec![DirectoryEntry::new("srv1", SERVER_URL, &SERVER_KEY)],
        vec![
            DirectoryEntry::new("trk1", TRACKER_URL, &TRACKER_KEY),
            DirectoryEntry::new("trk-down", DOWN_TRACKER_URL, &TRACKER_KEY),
            tampered,
        ],
    )
}

struct Harness<K: KeyMaterialGenerator, P: IdentityPersistence> {
    service: ProvisioningService<
        K,
        StaticDirectory,
        RecordingServerRegistrar,
        RecordingTrackerRegistrar,
        P,
    >,
    server: Arc<RecordingServerRegistrar>,
    tracker: Arc<RecordingTrackerRegistrar>,
    store: Arc<StoragePersistence<RocksDbStorage>>,
}

fn build<K, P>(
    keys: K,
    server: RecordingServerRegistrar,
    wrap: impl FnOnce(StoragePersistence<RocksDbStorage>) -> P,
) -> Harness<K, P>
where
    K: KeyMaterialGenerator,
    P: IdentityPersistence,
{
    // Two views over one database: one for the workflow, one for assertions
    let storage = Arc::new(RocksDbStorage::open_test().unwrap());
    let store = Arc::new(StoragePersistence::new(Arc::clone(&storage), MASTER_KEY));
    let server = Arc::new(server);
    let tracker = Arc::new(RecordingTrackerRegistrar::default());

    let service = ProvisioningService::new(
        Arc::new(keys),
        Arc::new(test_directory()),
        Arc::clone(&server),
        Arc::clone(&tracker),
        Arc::new(wrap(StoragePersistence::new(storage, MASTER_KEY))),
    );

    Harness {
        service,
        server,
        tracker,
        store,
    }
}

type DefaultHarness = Harness<OsKeyGenerator, StoragePersistence<RocksDbStorage>>;

fn create_harness() -> DefaultHarness {
    build(OsKeyGenerator, RecordingServerRegistrar::default(), |store| store)
}

fn ada(alias: &str, tracker: &str) -> ProvisioningRequest {
    ProvisioningRequest {
        first: "Ada".to_string(),
        last: "Lovelace".to_string(),
        server: "srv1".to_string(),
        tracker: tracker.to_string(),
        alias: alias.to_string(),
        ..Default::default()
    }
}

async fn identity_rows(store: &StoragePersistence<RocksDbStorage>) -> Vec<StoredIdentity> {
    let rows: Vec<(Vec<u8>, StoredIdentity)> = store
        .storage()
        .get_by_prefix(CF_IDENTITIES, &())
        .await
        .unwrap();
    rows.into_iter().map(|(_, row)| row).collect()
}

async fn alias_rows(store: &StoragePersistence<RocksDbStorage>) -> Vec<AliasRecord> {
    let rows: Vec<(Vec<u8>, AliasRecord)> = store
        .storage()
        .get_by_prefix(CF_ALIASES, &())
        .await
        .unwrap();
    rows.into_iter().map(|(_, row)| row).collect()
}

#[tokio::test]
async fn test_complete_run() {
    let harness = create_harness();

    let outcome = harness.service.provision(ada("ada", "trk1")).await.unwrap();

    let identities = identity_rows(&harness.store).await;
    assert_eq!(identities.len(), 1);
    let stored = &identities[0];
    assert_eq!(stored.handle, outcome.identity_handle);
    assert_eq!(stored.record.address, outcome.address);
    assert_eq!(stored.record.nickname, "");
    assert_eq!(stored.record.server_url, SERVER_URL);
    assert_eq!(stored.record.server_encryption_key, SERVER_KEY);
    assert_eq!(
        stored.record.address,
        derive_address(&stored.record.signing_public_key)
    );

    let aliases = alias_rows(&harness.store).await;
    assert_eq!(aliases.len(), 1);
    assert_eq!(aliases[0].identity_ref, outcome.identity_handle);
    assert_eq!(aliases[0].location, TRACKER_URL);
    assert_eq!(aliases[0].alias, "ada");

    assert_eq!(
        harness.store.active().await.unwrap(),
        Some(outcome.address.clone())
    );

    let server_calls = harness.server.calls.lock().unwrap();
    assert_eq!(server_calls.len(), 1);
    assert_eq!(server_calls[0].0, outcome.address);
    assert_eq!(server_calls[0].1["name"], b"Ada Lovelace".to_vec());
    assert_eq!(
        *harness.tracker.calls.lock().unwrap(),
        vec![(TRACKER_URL.to_string(), "ada".to_string())]
    );
    // The alias claim is signed by the freshly generated identity
    assert_eq!(
        *harness.tracker.signers.lock().unwrap(),
        vec![outcome.address.clone()]
    );
    assert_eq!(harness.tracker.signers.lock().unwrap()[0], server_calls[0].0);
}

#[tokio::test]
async fn test_persisted_identity_is_loadable() {
    let harness = create_harness();

    let outcome = harness.service.provision(ada("ada", "trk1")).await.unwrap();

    let identity = harness
        .store
        .load_identity(&outcome.address)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(identity.address(), outcome.address);
}

#[tokio::test]
async fn test_malformed_body_fails_at_start() {
    let harness = create_harness();

    let failure = harness
        .service
        .provision_from_body(b"{not json")
        .await
        .unwrap_err();

    assert_eq!(failure.state, ProvisioningState::Start);
    assert!(matches!(failure.error, ProvisioningError::Decoding(_)));
    assert!(harness.server.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_body_is_an_empty_request() {
    let harness = create_harness();

    let failure = harness.service.provision_from_body(b"").await.unwrap_err();

    // Decodes fine, then the empty server reference is unknown
    assert_eq!(failure.state, ProvisioningState::KeysGenerated);
    assert!(matches!(
        failure.error,
        ProvisioningError::UnknownReference {
            kind: EndpointKind::Server,
            ..
        }
    ));
}

#[tokio::test]
async fn test_body_decodes_into_full_run() {
    let harness = create_harness();
    let body = br#"{"first":"Ada","last":"Lovelace","server":"srv1","tracker":"trk1","alias":"ada","nickname":"countess"}"#;

    let outcome = harness.service.provision_from_body(body).await.unwrap();

    let stored = harness
        .store
        .identity_by_address(&outcome.address)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.record.nickname, "countess");
}

#[tokio::test]
async fn test_unknown_tracker_contacts_no_registrar() {
    let harness = create_harness();

    let failure = harness
        .service
        .provision(ada("ada", "trk9"))
        .await
        .unwrap_err();

    assert!(matches!(
        failure.error,
        ProvisioningError::UnknownReference {
            kind: EndpointKind::Tracker,
            ..
        }
    ));
    assert!(harness.server.calls.lock().unwrap().is_empty());
    assert!(harness.tracker.calls.lock().unwrap().is_empty());
    assert!(identity_rows(&harness.store).await.is_empty());
}

#[tokio::test]
async fn test_unverifiable_tracker_contacts_no_registrar() {
    let harness = create_harness();

    let failure = harness
        .service
        .provision(ada("ada", "trk-bad"))
        .await
        .unwrap_err();

    assert!(matches!(failure.error, ProvisioningError::Resolution { .. }));
    assert!(harness.server.calls.lock().unwrap().is_empty());
    assert!(harness.tracker.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_server_failure_stops_before_tracker() {
    let refusing = RecordingServerRegistrar {
        refuse: true,
        ..Default::default()
    };
    let harness = build(OsKeyGenerator, refusing, |store| store);

    let failure = harness
        .service
        .provision(ada("ada", "trk1"))
        .await
        .unwrap_err();

    assert_eq!(failure.state, ProvisioningState::KeysGenerated);
    assert!(matches!(
        failure.error,
        ProvisioningError::ServerRegistration(_)
    ));
    assert!(harness.tracker.calls.lock().unwrap().is_empty());
    assert!(identity_rows(&harness.store).await.is_empty());
    assert!(alias_rows(&harness.store).await.is_empty());
}

#[tokio::test]
async fn test_unreachable_tracker_leaves_no_records() {
    let harness = create_harness();

    let failure = harness
        .service
        .provision(ada("ada", "trk-down"))
        .await
        .unwrap_err();

    assert_eq!(failure.state, ProvisioningState::ServerRegistered);
    match &failure.error {
        ProvisioningError::TrackerRegistration { tracker, reason } => {
            assert_eq!(tracker, DOWN_TRACKER_URL);
            assert!(matches!(reason, TrackerRejection::Transport(_)));
        }
        other => panic!("unexpected error: {:?}", other),
    }

    // The server registration stays in place, nothing is stored locally
    assert_eq!(harness.server.calls.lock().unwrap().len(), 1);
    assert!(identity_rows(&harness.store).await.is_empty());
    assert!(alias_rows(&harness.store).await.is_empty());
    assert_eq!(harness.store.active().await.unwrap(), None);
}

#[tokio::test]
async fn test_distinct_runs_get_distinct_addresses() {
    let harness = create_harness();

    let first = harness.service.provision(ada("ada", "trk1")).await.unwrap();
    let second = harness
        .service
        .provision(ada("countess", "trk1"))
        .await
        .unwrap();

    assert_ne!(first.address, second.address);
    assert_eq!(identity_rows(&harness.store).await.len(), 2);
    assert_eq!(alias_rows(&harness.store).await.len(), 2);
    assert_eq!(harness.store.active().await.unwrap(), Some(second.address));
}

#[tokio::test]
async fn test_repeated_alias_is_taken() {
    let harness = create_harness();

    let first = harness.service.provision(ada("ada", "trk1")).await.unwrap();
    let failure = harness
        .service
        .provision(ada("ada", "trk1"))
        .await
        .unwrap_err();

    assert!(matches!(
        failure.error,
        ProvisioningError::TrackerRegistration {
            reason: TrackerRejection::AliasTaken,
            ..
        }
    ));
    assert_eq!(identity_rows(&harness.store).await.len(), 1);
    assert_eq!(harness.store.active().await.unwrap(), Some(first.address));
}

#[tokio::test]
async fn test_key_generation_failure() {
    let harness = build(
        FailingKeyGenerator,
        RecordingServerRegistrar::default(),
        |store| store,
    );

    let failure = harness
        .service
        .provision(ada("ada", "trk1"))
        .await
        .unwrap_err();

    assert_eq!(failure.state, ProvisioningState::Start);
    assert!(matches!(failure.error, ProvisioningError::KeyGeneration(_)));
    assert!(harness.server.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_active_pointer_failure_keeps_records() {
    let harness = build(
        OsKeyGenerator,
        RecordingServerRegistrar::default(),
        FailingActivePointer,
    );

    let failure = harness
        .service
        .provision(ada("ada", "trk1"))
        .await
        .unwrap_err();

    assert_eq!(failure.state, ProvisioningState::AliasPersisted);
    assert!(matches!(
        failure.error,
        ProvisioningError::Persistence {
            stage: PersistenceStage::ActivePointerWrite,
            ..
        }
    ));
    assert_eq!(identity_rows(&harness.store).await.len(), 1);
    assert_eq!(alias_rows(&harness.store).await.len(), 1);
    assert_eq!(harness.store.active().await.unwrap(), None);
}

#[tokio::test]
async fn test_identity_insert_failure_skips_alias() {
    let alias_calls = Arc::new(AtomicUsize::new(0));
    let harness = build(
        OsKeyGenerator,
        RecordingServerRegistrar::default(),
        |inner| FailingIdentityInsert {
            inner,
            alias_calls: Arc::clone(&alias_calls),
        },
    );

    let failure = harness
        .service
        .provision(ada("ada", "trk1"))
        .await
        .unwrap_err();

    assert_eq!(failure.state, ProvisioningState::TrackerRegistered);
    assert!(matches!(
        failure.error,
        ProvisioningError::Persistence {
            stage: PersistenceStage::IdentityInsert,
            ..
        }
    ));
    assert_eq!(alias_calls.load(Ordering::SeqCst), 0);
    assert!(alias_rows(&harness.store).await.is_empty());
    assert_eq!(harness.store.active().await.unwrap(), None);
}

#[test]
fn test_decode_request_whitespace_body() {
    let request = decode_request(b"  \n").unwrap();
    assert_eq!(request, ProvisioningRequest::default());
}
