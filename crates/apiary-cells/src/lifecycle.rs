use std::sync::Arc;

use tracing::{debug, warn};

use apiary_compiler::CellCompiler;
use apiary_store::{BlobKey, BlobRecord, BlobStore, TierSet};
use apiary_txn::{BlobTransaction, Quorum, TransactionRunner, TxnReceipt};
use apiary_types::{
    CancelToken, Cell, CellAddress, CellAddressMapping, CellCode, CodePrivileges,
    CompilationStatus, GridCoordinate, GridKind, UserId,
};

use crate::directory::AddressDirectory;
use crate::error::{PublishError, PublishResult};

/// One publish operation: destination, content, and policy.
#[derive(Clone, Debug)]
pub struct PublishRequest {
    pub grid: GridKind,
    /// Coordinate to create at when the primary address does not resolve.
    /// Ignored when it does; the resolved coordinate wins.
    pub coordinate: GridCoordinate,
    /// Aliases to bind, primary first. Must not be empty.
    pub addresses: Vec<CellAddress>,
    /// Policy for a newly created cell. An existing cell keeps its own.
    pub privileges: CodePrivileges,
    pub source: String,
    pub quorum: Quorum,
}

/// What a successful publish did.
#[derive(Clone, Debug)]
pub struct PublishReceipt {
    pub mapping: CellAddressMapping,
    /// True when this publish created the cell.
    pub created: bool,
    /// True when this publish rebound an existing cell's alias set.
    pub rebound: bool,
    /// Cell version after the save-back.
    pub cell_version: u64,
    /// Receipt of the create or rebind transaction, if one ran.
    pub txn: Option<TxnReceipt>,
}

/// Sequences one cell's publish: resolve, create or rebind, compile, save
/// back.
///
/// The sequence is fail-fast and not transactional end to end. Only the
/// create-or-rebind step is atomic; the gate writes nothing, and the
/// save-back is a plain tiered write whose durable failure is reported as
/// [`PublishError::SaveBack`] since at that point valid compiled content
/// exists but is not durably visible. Cancellation is honored between
/// stages, never in the middle of one.
pub struct CellLifecycle<S: BlobStore> {
    store: Arc<S>,
    runner: Arc<dyn TransactionRunner>,
    compiler: Arc<dyn CellCompiler>,
}

impl<S: BlobStore> CellLifecycle<S> {
    pub fn new(
        store: Arc<S>,
        runner: Arc<dyn TransactionRunner>,
        compiler: Arc<dyn CellCompiler>,
    ) -> Self {
        Self {
            store,
            runner,
            compiler,
        }
    }

    /// Publish content at the request's primary address, creating the cell
    /// if the address is unbound.
    pub fn publish(
        &self,
        request: &PublishRequest,
        cancel: &CancelToken,
    ) -> PublishResult<PublishReceipt> {
        if cancel.is_cancelled() {
            return Err(PublishError::Cancelled);
        }
        let primary = request.addresses.first().ok_or(PublishError::NoAddresses)?;

        let directory = AddressDirectory::new(self.store.as_ref());
        let resolved = directory.resolve(request.grid, primary)?;

        let (mapping, created, rebound, txn) = match resolved {
            None => {
                let mapping = CellAddressMapping::new(request.grid, request.coordinate);
                let receipt = self.runner.perform(
                    BlobTransaction::CreateCell {
                        mapping,
                        addresses: request.addresses.clone(),
                        privileges: request.privileges,
                    },
                    request.quorum,
                    cancel,
                )?;
                (mapping, true, false, Some(receipt))
            }
            Some(coordinate) => {
                let mapping = CellAddressMapping::new(request.grid, coordinate);
                let recorded = directory.addresses_of(request.grid, coordinate)?;
                if recorded == request.addresses {
                    (mapping, false, false, None)
                } else {
                    let receipt = self.runner.perform(
                        BlobTransaction::RebindAddresses {
                            mapping,
                            addresses: request.addresses.clone(),
                        },
                        request.quorum,
                        cancel,
                    )?;
                    (mapping, false, true, Some(receipt))
                }
            }
        };

        if cancel.is_cancelled() {
            return Err(PublishError::Cancelled);
        }

        let mut cell = self
            .cell_for_compile(mapping)?
            .ok_or(PublishError::CellUnavailable { mapping })?;

        let source = CellCode::source(request.source.as_str());
        let result = self.compiler.compile(&cell, &source).map_err(|e| {
            warn!(cell = %mapping, error = %e, "compiler fault");
            PublishError::Compilation {
                status: CompilationStatus::CompilerError,
            }
        })?;
        let Some(unit) = result.unit else {
            debug!(cell = %mapping, status = %result.status, "publish rejected by the gate");
            return Err(PublishError::Compilation {
                status: result.status,
            });
        };

        if cancel.is_cancelled() {
            return Err(PublishError::Cancelled);
        }

        cell.apply_compile(request.source.as_str(), unit.markup);
        cell.bump_version();
        let record = BlobRecord::from_cell(&cell)?;
        self.store
            .write(&BlobKey::cell(mapping), &record, &TierSet::publish_path())
            .map_err(PublishError::SaveBack)?;

        debug!(
            cell = %mapping,
            version = cell.version,
            created,
            rebound,
            "cell published"
        );
        Ok(PublishReceipt {
            mapping,
            created,
            rebound,
            cell_version: cell.version,
            txn,
        })
    }

    /// Record that a user owns a cell.
    pub fn attach_to_user(
        &self,
        user: UserId,
        mapping: CellAddressMapping,
        quorum: Quorum,
        cancel: &CancelToken,
    ) -> PublishResult<TxnReceipt> {
        Ok(self.runner.perform(
            BlobTransaction::AttachCellToUser { user, mapping },
            quorum,
            cancel,
        )?)
    }

    /// Fetch the persisted cell for compilation. The compile path skips
    /// the shared tier; the cell just committed durably and the local
    /// tier is already warm from the transaction's own reads.
    fn cell_for_compile(&self, mapping: CellAddressMapping) -> PublishResult<Option<Cell>> {
        match self
            .store
            .read(&BlobKey::cell(mapping), &TierSet::compile_path())?
        {
            Some(record) => Ok(Some(record.to_cell()?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    use apiary_compiler::{CompilerError, CompilerResult, SandboxCompiler};
    use apiary_store::{CacheTier, MemoryTier, StoreError, StoreResult, TierBackend, TieredStore};
    use apiary_txn::{BlobFailure, TransactionEngine};

    /// Durable replica that starts failing writes after a budget of
    /// successful ones, for forcing failures between pipeline stages.
    struct FailAfterTier {
        inner: MemoryTier,
        writes_left: AtomicI64,
    }

    impl FailAfterTier {
        fn new(writes_left: i64) -> Self {
            Self {
                inner: MemoryTier::new(CacheTier::Durable),
                writes_left: AtomicI64::new(writes_left),
            }
        }
    }

    impl TierBackend for FailAfterTier {
        fn tier(&self) -> CacheTier {
            CacheTier::Durable
        }

        fn read(&self, key: &BlobKey) -> StoreResult<Option<BlobRecord>> {
            self.inner.read(key)
        }

        fn write(&self, key: &BlobKey, record: &BlobRecord) -> StoreResult<()> {
            if self.writes_left.fetch_sub(1, Ordering::SeqCst) <= 0 {
                return Err(StoreError::Io(std::io::Error::other(
                    "injected write failure",
                )));
            }
            self.inner.write(key, record)
        }

        fn evict(&self, key: &BlobKey) -> StoreResult<bool> {
            self.inner.evict(key)
        }
    }

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    fn harness() -> (CellLifecycle<TieredStore>, Arc<TieredStore>) {
        let store = Arc::new(
            TieredStore::new()
                .with_local(Arc::new(MemoryTier::new(CacheTier::Local)))
                .with_shared(Arc::new(MemoryTier::new(CacheTier::Shared)))
                .with_durable(Arc::new(MemoryTier::new(CacheTier::Durable))),
        );
        (lifecycle_over(store.clone()), store)
    }

    fn lifecycle_over(store: Arc<TieredStore>) -> CellLifecycle<TieredStore> {
        let engine = Arc::new(TransactionEngine::new(store.clone()));
        CellLifecycle::new(store, engine, Arc::new(SandboxCompiler::new("apiary-test")))
    }

    fn request(addresses: &[&str], x: i64, y: i64, source: &str) -> PublishRequest {
        PublishRequest {
            grid: GridKind::Active,
            coordinate: GridCoordinate::new(x, y),
            addresses: addresses.iter().map(|s| addr(s)).collect(),
            privileges: CodePrivileges::open(),
            source: source.to_string(),
            quorum: Quorum::ONE,
        }
    }

    fn compiled_markup(store: &TieredStore, mapping: CellAddressMapping) -> Option<String> {
        let directory = AddressDirectory::new(store);
        directory
            .cell_at(mapping)
            .unwrap()
            .and_then(|cell| cell.compiled)
            .map(|code| code.markup)
    }

    // -----------------------------------------------------------------------
    // Create path
    // -----------------------------------------------------------------------

    #[test]
    fn publish_creates_compiles_and_caches() {
        let (lifecycle, store) = harness();
        let markup = "<html><body><img src='/r.img/pages/IMG_0173.jpg'/></body></html>";
        let receipt = lifecycle
            .publish(
                &request(&["Book/Page100"], 0, 0, markup),
                &CancelToken::new(),
            )
            .unwrap();

        assert!(receipt.created);
        assert!(!receipt.rebound);
        assert_eq!(receipt.mapping, CellAddressMapping::at(GridKind::Active, 0, 0));
        // Version 1 from the create, 2 from the save-back.
        assert_eq!(receipt.cell_version, 2);
        assert!(receipt.txn.is_some());

        let cell = AddressDirectory::new(store.as_ref())
            .cell_at(receipt.mapping)
            .unwrap()
            .unwrap();
        assert!(cell.status.is_ok());
        assert!(cell.compiled.unwrap().markup.contains(markup));
        assert_eq!(cell.source.unwrap().markup, markup);

        // Every tier serves the published record on its own.
        for tiers in [
            TierSet::new([CacheTier::Local]),
            TierSet::new([CacheTier::Shared]),
            TierSet::durable_only(),
        ] {
            let record = store
                .read(&BlobKey::cell(receipt.mapping), &tiers)
                .unwrap()
                .unwrap();
            let compiled = record.to_cell().unwrap().compiled.unwrap();
            assert!(compiled.markup.contains(markup));
        }
    }

    #[test]
    fn publish_with_no_addresses_is_rejected() {
        let (lifecycle, store) = harness();
        let err = lifecycle
            .publish(&request(&[], 0, 0, "<p>x</p>"), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, PublishError::NoAddresses));
        assert!(AddressDirectory::new(store.as_ref())
            .cell_at(CellAddressMapping::at(GridKind::Active, 0, 0))
            .unwrap()
            .is_none());
    }

    #[test]
    fn create_failure_surfaces_and_binds_nothing() {
        let (lifecycle, store) = harness();
        let cancel = CancelToken::new();
        lifecycle
            .publish(&request(&["First"], 0, 0, "<p>a</p>"), &cancel)
            .unwrap();

        // Unbound primary, occupied coordinate: the create transaction
        // loses and the new alias must stay unbound.
        let err = lifecycle
            .publish(&request(&["Second"], 0, 0, "<p>b</p>"), &cancel)
            .unwrap_err();
        assert!(matches!(
            err,
            PublishError::Transaction(BlobFailure::CellExists { .. })
        ));
        let directory = AddressDirectory::new(store.as_ref());
        assert_eq!(
            directory.resolve(GridKind::Active, &addr("Second")).unwrap(),
            None
        );
    }

    // -----------------------------------------------------------------------
    // Rebind path
    // -----------------------------------------------------------------------

    #[test]
    fn publish_at_a_resolved_address_rebinds_instead_of_allocating() {
        let (lifecycle, store) = harness();
        let cancel = CancelToken::new();
        lifecycle
            .publish(&request(&["Book/Page100", "Book"], 2, 3, "<p>v1</p>"), &cancel)
            .unwrap();

        // Same primary, different alias set, different requested
        // coordinate: the resolved coordinate wins.
        let receipt = lifecycle
            .publish(
                &request(&["Book/Page100", "Book/Chapter1"], 9, 9, "<p>v2</p>"),
                &cancel,
            )
            .unwrap();

        assert!(!receipt.created);
        assert!(receipt.rebound);
        assert_eq!(receipt.mapping, CellAddressMapping::at(GridKind::Active, 2, 3));

        let directory = AddressDirectory::new(store.as_ref());
        assert!(directory
            .cell_at(CellAddressMapping::at(GridKind::Active, 9, 9))
            .unwrap()
            .is_none());
        assert_eq!(directory.resolve(GridKind::Active, &addr("Book")).unwrap(), None);
        assert_eq!(
            directory
                .resolve(GridKind::Active, &addr("Book/Chapter1"))
                .unwrap(),
            Some(GridCoordinate::new(2, 3))
        );
    }

    #[test]
    fn republish_with_the_same_aliases_runs_no_transaction() {
        let (lifecycle, _) = harness();
        let cancel = CancelToken::new();
        let first = lifecycle
            .publish(&request(&["Book/Page100"], 0, 0, "<p>v1</p>"), &cancel)
            .unwrap();

        let second = lifecycle
            .publish(&request(&["Book/Page100"], 0, 0, "<p>v2</p>"), &cancel)
            .unwrap();

        assert!(!second.created);
        assert!(!second.rebound);
        assert!(second.txn.is_none());
        assert_eq!(second.cell_version, first.cell_version + 1);
    }

    // -----------------------------------------------------------------------
    // Gate and save-back
    // -----------------------------------------------------------------------

    #[test]
    fn failed_compile_preserves_published_content() {
        let (lifecycle, store) = harness();
        let cancel = CancelToken::new();
        let good = lifecycle
            .publish(&request(&["Book/Page100"], 0, 0, "<p>good</p>"), &cancel)
            .unwrap();
        let before = compiled_markup(store.as_ref(), good.mapping).unwrap();

        let err = lifecycle
            .publish(&request(&["Book/Page100"], 0, 0, "   "), &cancel)
            .unwrap_err();
        assert!(matches!(
            err,
            PublishError::Compilation {
                status: CompilationStatus::SourceError,
            }
        ));

        let after = compiled_markup(store.as_ref(), good.mapping).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn compiler_fault_reports_an_internal_status() {
        struct BrokenCompiler;
        impl CellCompiler for BrokenCompiler {
            fn compile(
                &self,
                _cell: &Cell,
                _source: &CellCode,
            ) -> Result<CompilerResult, CompilerError> {
                Err(CompilerError::Backend("sandbox offline".into()))
            }
        }

        let store = Arc::new(
            TieredStore::new().with_durable(Arc::new(MemoryTier::new(CacheTier::Durable))),
        );
        let engine = Arc::new(TransactionEngine::new(store.clone()));
        let lifecycle = CellLifecycle::new(store, engine, Arc::new(BrokenCompiler));

        let err = lifecycle
            .publish(&request(&["Book"], 0, 0, "<p>x</p>"), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(
            err,
            PublishError::Compilation {
                status: CompilationStatus::CompilerError,
            }
        ));
    }

    #[test]
    fn save_back_failure_is_reported_distinctly() {
        // Budget of two durable writes: enough for the create transaction
        // (cell plus one binding), not for the save-back.
        let store = Arc::new(
            TieredStore::new().with_durable(Arc::new(FailAfterTier::new(2))),
        );
        let lifecycle = lifecycle_over(store.clone());

        let err = lifecycle
            .publish(
                &request(&["Book/Page100"], 0, 0, "<p>x</p>"),
                &CancelToken::new(),
            )
            .unwrap_err();
        assert!(matches!(err, PublishError::SaveBack(_)));

        // The created cell is still there, one version behind, with no
        // compiled content yet.
        let cell = AddressDirectory::new(store.as_ref())
            .cell_at(CellAddressMapping::at(GridKind::Active, 0, 0))
            .unwrap()
            .unwrap();
        assert_eq!(cell.version, 1);
        assert!(cell.compiled.is_none());
    }

    // -----------------------------------------------------------------------
    // Cancellation and users
    // -----------------------------------------------------------------------

    #[test]
    fn cancelled_request_publishes_nothing() {
        let (lifecycle, store) = harness();
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = lifecycle
            .publish(&request(&["Book"], 0, 0, "<p>x</p>"), &cancel)
            .unwrap_err();
        assert!(matches!(err, PublishError::Cancelled));
        assert!(AddressDirectory::new(store.as_ref())
            .cell_at(CellAddressMapping::at(GridKind::Active, 0, 0))
            .unwrap()
            .is_none());
    }

    #[test]
    fn attach_to_user_records_ownership() {
        let (lifecycle, _) = harness();
        let cancel = CancelToken::new();
        let receipt = lifecycle
            .publish(&request(&["Book"], 0, 0, "<p>x</p>"), &cancel)
            .unwrap();

        let user = UserId::ephemeral();
        lifecycle
            .attach_to_user(user, receipt.mapping, Quorum::ONE, &cancel)
            .unwrap();

        let err = lifecycle
            .attach_to_user(
                user,
                CellAddressMapping::at(GridKind::Active, 8, 8),
                Quorum::ONE,
                &cancel,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            PublishError::Transaction(BlobFailure::CellMissing { .. })
        ));
    }
}
