use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use apiary_compiler::{CellCompiler, SandboxCompiler};
use apiary_store::{CacheTier, DiskTier, MemoryTier, TieredStore};
use apiary_txn::{Quorum, TransactionEngine};
use apiary_types::{CodePrivileges, GridKind};

use crate::error::ContextError;
use crate::lifecycle::CellLifecycle;
use crate::seed::{SeedVolume, Seeder, DEFAULT_IMAGE_PATH_TEMPLATE};

/// Platform configuration, usually loaded from a TOML file.
///
/// Every field has a default, so a config file only has to name what it
/// changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Application identity stamped into compiled content.
    pub app_id: String,
    /// Root directory for durable replica storage.
    pub data_dir: PathBuf,
    /// Grid the platform serves.
    pub grid: GridKind,
    /// Durable acknowledgements required per transaction blob.
    pub quorum: u32,
    /// Durable replica directories kept under `data_dir`.
    pub durable_replicas: u32,
    /// Template for page-image paths; `{index}` is replaced.
    pub image_path_template: String,
    /// Policy attached to cells the seeding job creates.
    pub privileges: CodePrivileges,
    /// Volumes the seeding job publishes.
    #[serde(rename = "volume")]
    pub volumes: Vec<SeedVolume>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            app_id: "apiary".to_string(),
            data_dir: PathBuf::from("data"),
            grid: GridKind::Active,
            quorum: 1,
            durable_replicas: 1,
            image_path_template: DEFAULT_IMAGE_PATH_TEMPLATE.to_string(),
            privileges: CodePrivileges::open(),
            volumes: vec![
                SeedVolume {
                    title: "ExploringGeology".to_string(),
                    chapter: 5,
                    page_count: 7,
                    start_image_index: 173,
                },
                SeedVolume {
                    title: "ExploringGeography".to_string(),
                    chapter: 3,
                    page_count: 13,
                    start_image_index: 180,
                },
            ],
        }
    }
}

impl PlatformConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ContextError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ContextError> {
        toml::from_str(text).map_err(|e| ContextError::Config(e.to_string()))
    }
}

/// The wired platform: store, transaction engine, and compiler built once
/// and passed explicitly to every operation.
pub struct PlatformContext {
    config: PlatformConfig,
    quorum: Quorum,
    store: Arc<TieredStore>,
    engine: Arc<TransactionEngine<TieredStore>>,
    compiler: Arc<dyn CellCompiler>,
}

impl PlatformContext {
    /// Wire a context from configuration: in-memory local and shared
    /// cache tiers plus one disk-backed durable replica per
    /// `durable_replicas`, each in its own directory under `data_dir`.
    pub fn open(config: &PlatformConfig) -> Result<Self, ContextError> {
        if config.durable_replicas == 0 {
            return Err(ContextError::Config(
                "durable_replicas must be at least 1".to_string(),
            ));
        }
        let quorum = Quorum::new(config.quorum)
            .ok_or_else(|| ContextError::Config("quorum must be at least 1".to_string()))?;

        let mut store = TieredStore::new()
            .with_local(Arc::new(MemoryTier::new(CacheTier::Local)))
            .with_shared(Arc::new(MemoryTier::new(CacheTier::Shared)));
        for replica in 0..config.durable_replicas {
            let root = config.data_dir.join(format!("replica-{replica}"));
            store = store.with_durable(Arc::new(DiskTier::open(&root)?));
        }

        debug!(
            app_id = %config.app_id,
            data_dir = %config.data_dir.display(),
            replicas = config.durable_replicas,
            "platform context opened"
        );
        Ok(Self::wire(config.clone(), quorum, Arc::new(store)))
    }

    /// Wire an all-memory context, for tests and embedding.
    pub fn in_memory(app_id: &str) -> Self {
        let config = PlatformConfig {
            app_id: app_id.to_string(),
            ..PlatformConfig::default()
        };
        let store = TieredStore::new()
            .with_local(Arc::new(MemoryTier::new(CacheTier::Local)))
            .with_shared(Arc::new(MemoryTier::new(CacheTier::Shared)))
            .with_durable(Arc::new(MemoryTier::new(CacheTier::Durable)));
        Self::wire(config, Quorum::ONE, Arc::new(store))
    }

    fn wire(config: PlatformConfig, quorum: Quorum, store: Arc<TieredStore>) -> Self {
        let engine = Arc::new(TransactionEngine::new(store.clone()));
        let compiler: Arc<dyn CellCompiler> = Arc::new(SandboxCompiler::new(&config.app_id));
        Self {
            config,
            quorum,
            store,
            engine,
            compiler,
        }
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    pub fn quorum(&self) -> Quorum {
        self.quorum
    }

    pub fn store(&self) -> &Arc<TieredStore> {
        &self.store
    }

    pub fn engine(&self) -> &Arc<TransactionEngine<TieredStore>> {
        &self.engine
    }

    /// A lifecycle over this context's store, engine, and compiler.
    pub fn lifecycle(&self) -> CellLifecycle<TieredStore> {
        CellLifecycle::new(
            self.store.clone(),
            self.engine.clone(),
            self.compiler.clone(),
        )
    }

    /// A seeder configured the way this context is.
    pub fn seeder<'a>(&self, lifecycle: &'a CellLifecycle<TieredStore>) -> Seeder<'a, TieredStore> {
        Seeder::new(lifecycle)
            .with_grid(self.config.grid)
            .with_privileges(self.config.privileges)
            .with_quorum(self.quorum)
            .with_image_path_template(self.config.image_path_template.clone())
    }
}

impl std::fmt::Debug for PlatformContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformContext")
            .field("app_id", &self.config.app_id)
            .field("grid", &self.config.grid)
            .field("quorum", &self.quorum)
            .finish()
    }
}
