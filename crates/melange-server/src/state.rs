use anyhow::{Context, Result};
use melange_accounts::AccountService;
use melange_provisioning::{
    HttpServerRegistrar, HttpTrackerRegistrar, OsKeyGenerator, ProvisioningService,
    StaticDirectory, StoragePersistence,
};
use melange_storage::RocksDbStorage;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;

pub type Persistence = StoragePersistence<RocksDbStorage>;

pub type Provisioning = ProvisioningService<
    OsKeyGenerator,
    StaticDirectory,
    HttpServerRegistrar,
    HttpTrackerRegistrar,
    Persistence,
>;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<RocksDbStorage>,
    pub provisioning: Arc<Provisioning>,
    pub accounts: Arc<AccountService<RocksDbStorage>>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self> {
        let storage = Arc::new(
            RocksDbStorage::open(&config.database_path)
                .with_context(|| format!("opening database at {:?}", config.database_path))?,
        );

        let directory = StaticDirectory::load(&config.directory_path)
            .with_context(|| format!("loading directory from {:?}", config.directory_path))?;
        tracing::info!("Loaded {} directory entries", directory.len());

        Self::from_parts(
            storage,
            directory,
            config.service_master_key,
            config.registrar_timeout,
        )
    }

    /// Wire up services over an already opened store and directory
    pub fn from_parts(
        storage: Arc<RocksDbStorage>,
        directory: StaticDirectory,
        service_master_key: [u8; 32],
        registrar_timeout: Duration,
    ) -> Result<Self> {
        let server_registrar = HttpServerRegistrar::new(registrar_timeout)
            .context("building key server HTTP client")?;
        let tracker_registrar = HttpTrackerRegistrar::new(registrar_timeout)
            .context("building tracker HTTP client")?;

        let persistence = Arc::new(StoragePersistence::new(
            storage.clone(),
            service_master_key,
        ));

        let provisioning = Arc::new(ProvisioningService::new(
            Arc::new(OsKeyGenerator),
            Arc::new(directory),
            Arc::new(server_registrar),
            Arc::new(tracker_registrar),
            persistence,
        ));

        let accounts = Arc::new(AccountService::new(storage.clone()));

        Ok(AppState {
            storage,
            provisioning,
            accounts,
        })
    }
}
