use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use apiary_store::{BlobKey, BlobRecord, BlobStore, TierSet};
use apiary_types::{CancelToken, Cell, CellAddress, CellAddressMapping, CodePrivileges, UserId, UserRecord};

use crate::error::{BlobFailure, TxnResult};
use crate::quorum::Quorum;
use crate::receipt::{TxnId, TxnReceipt};
use crate::transaction::BlobTransaction;

/// Upper bound on lock-set widening rounds before a rebind gives up.
const MAX_LOCK_ATTEMPTS: usize = 8;

/// Capability seam for performing transactions.
pub trait TransactionRunner: Send + Sync {
    /// Perform a transaction at the given quorum.
    ///
    /// On `Err`, the store holds none of the transaction's effects.
    fn perform(
        &self,
        txn: BlobTransaction,
        quorum: Quorum,
        cancel: &CancelToken,
    ) -> TxnResult<TxnReceipt>;
}

/// The transaction engine: validates, writes durable blobs in a safe
/// order, and rolls back on failure.
///
/// Conflicting transactions serialize on a per-key lock table acquired in
/// canonical key order. Writes always land cell-record-first, so a reader
/// can never follow an address binding to a cell that is not there yet;
/// rollback runs in reverse order for the same reason.
pub struct TransactionEngine<S: BlobStore> {
    store: Arc<S>,
    locks: Mutex<HashMap<BlobKey, Arc<Mutex<()>>>>,
}

impl<S: BlobStore> TransactionEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn lock_handles(&self, keys: &[BlobKey]) -> Vec<Arc<Mutex<()>>> {
        let mut table = self.locks.lock().expect("lock table poisoned");
        keys.iter()
            .map(|key| {
                table
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(())))
                    .clone()
            })
            .collect()
    }

    fn read_cell(&self, mapping: &CellAddressMapping) -> TxnResult<Option<Cell>> {
        match self
            .store
            .read(&BlobKey::cell(*mapping), &TierSet::durable_only())?
        {
            Some(record) => Ok(Some(record.to_cell()?)),
            None => Ok(None),
        }
    }

    /// Keys a rebind touches beyond its static lock set: the bindings it
    /// removes. Only meaningful while the cell's lock is held.
    fn unbind_keys(&self, txn: &BlobTransaction) -> TxnResult<Vec<BlobKey>> {
        let BlobTransaction::RebindAddresses { mapping, addresses } = txn else {
            return Ok(Vec::new());
        };
        let Some(cell) = self.read_cell(mapping)? else {
            // Missing cell is reported during commit validation.
            return Ok(Vec::new());
        };
        Ok(cell
            .addresses
            .iter()
            .filter(|existing| !addresses.contains(existing))
            .map(|existing| BlobKey::address(mapping.grid, existing.clone()))
            .collect())
    }

    fn commit(&self, txn: &BlobTransaction, quorum: Quorum) -> TxnResult<TxnReceipt> {
        let mut log = WriteLog::new(self.store.as_ref());
        let result = match txn {
            BlobTransaction::CreateCell {
                mapping,
                addresses,
                privileges,
            } => self.create_cell(&mut log, *mapping, addresses, *privileges, quorum),
            BlobTransaction::RebindAddresses { mapping, addresses } => {
                self.rebind_addresses(&mut log, *mapping, addresses, quorum)
            }
            BlobTransaction::SetPrivileges {
                mapping,
                privileges,
            } => self.set_privileges(&mut log, *mapping, *privileges, quorum),
            BlobTransaction::AttachCellToUser { user, mapping } => {
                self.attach_cell_to_user(&mut log, *user, *mapping, quorum)
            }
        };

        match result {
            Ok(()) => {
                let receipt = TxnReceipt {
                    id: TxnId::new(),
                    kind: txn.kind(),
                    blobs_written: log.count(),
                    durable_acks: log.min_acks(),
                };
                debug!(
                    txn = %receipt.id,
                    kind = %receipt.kind,
                    blobs = receipt.blobs_written,
                    "transaction committed"
                );
                Ok(receipt)
            }
            Err(failure) => {
                log.rollback();
                Err(failure)
            }
        }
    }

    fn create_cell(
        &self,
        log: &mut WriteLog<'_, S>,
        mapping: CellAddressMapping,
        addresses: &[CellAddress],
        privileges: CodePrivileges,
        quorum: Quorum,
    ) -> TxnResult<()> {
        if self.read_cell(&mapping)?.is_some() {
            return Err(BlobFailure::CellExists { mapping });
        }
        for address in addresses {
            let key = BlobKey::address(mapping.grid, address.clone());
            if let Some(record) = self.store.read(&key, &TierSet::durable_only())? {
                return Err(BlobFailure::AddressConflict {
                    address: address.clone(),
                    bound_to: record.to_mapping()?,
                });
            }
        }

        let mut cell = Cell::new(mapping, addresses.to_vec(), privileges);
        cell.bump_version();
        log.write(BlobKey::cell(mapping), &BlobRecord::from_cell(&cell)?, quorum)?;

        let binding = BlobRecord::from_mapping(&mapping)?;
        for address in addresses {
            log.write(
                BlobKey::address(mapping.grid, address.clone()),
                &binding,
                quorum,
            )?;
        }
        Ok(())
    }

    fn rebind_addresses(
        &self,
        log: &mut WriteLog<'_, S>,
        mapping: CellAddressMapping,
        addresses: &[CellAddress],
        quorum: Quorum,
    ) -> TxnResult<()> {
        let Some(mut cell) = self.read_cell(&mapping)? else {
            return Err(BlobFailure::CellMissing { mapping });
        };

        for address in addresses {
            if cell.addresses.contains(address) {
                continue;
            }
            let key = BlobKey::address(mapping.grid, address.clone());
            if let Some(record) = self.store.read(&key, &TierSet::durable_only())? {
                let bound_to = record.to_mapping()?;
                if bound_to != mapping {
                    return Err(BlobFailure::AddressConflict {
                        address: address.clone(),
                        bound_to,
                    });
                }
            }
        }

        let added: Vec<CellAddress> = addresses
            .iter()
            .filter(|address| !cell.addresses.contains(address))
            .cloned()
            .collect();
        let removed: Vec<CellAddress> = cell
            .addresses
            .iter()
            .filter(|address| !addresses.contains(address))
            .cloned()
            .collect();

        cell.addresses = addresses.to_vec();
        cell.bump_version();
        log.write(BlobKey::cell(mapping), &BlobRecord::from_cell(&cell)?, quorum)?;

        let binding = BlobRecord::from_mapping(&mapping)?;
        for address in &added {
            log.write(
                BlobKey::address(mapping.grid, address.clone()),
                &binding,
                quorum,
            )?;
        }
        // Unbind last: until then an old alias still reaches a live cell.
        for address in &removed {
            log.remove(BlobKey::address(mapping.grid, address.clone()))?;
        }
        Ok(())
    }

    fn set_privileges(
        &self,
        log: &mut WriteLog<'_, S>,
        mapping: CellAddressMapping,
        privileges: CodePrivileges,
        quorum: Quorum,
    ) -> TxnResult<()> {
        let Some(mut cell) = self.read_cell(&mapping)? else {
            return Err(BlobFailure::CellMissing { mapping });
        };
        cell.privileges = privileges;
        cell.bump_version();
        log.write(BlobKey::cell(mapping), &BlobRecord::from_cell(&cell)?, quorum)
    }

    fn attach_cell_to_user(
        &self,
        log: &mut WriteLog<'_, S>,
        user: UserId,
        mapping: CellAddressMapping,
        quorum: Quorum,
    ) -> TxnResult<()> {
        if self.read_cell(&mapping)?.is_none() {
            return Err(BlobFailure::CellMissing { mapping });
        }
        let key = BlobKey::user(user);
        let mut record = match self.store.read(&key, &TierSet::durable_only())? {
            Some(record) => record.to_user()?,
            None => UserRecord::new(user),
        };
        record.attach(mapping);
        log.write(key, &BlobRecord::from_user(&record)?, quorum)
    }
}

impl<S: BlobStore> TransactionRunner for TransactionEngine<S> {
    fn perform(
        &self,
        txn: BlobTransaction,
        quorum: Quorum,
        cancel: &CancelToken,
    ) -> TxnResult<TxnReceipt> {
        if cancel.is_cancelled() {
            return Err(BlobFailure::Cancelled);
        }

        let mut keys = txn.lock_keys();
        let mut attempts = 0;
        loop {
            let handles = self.lock_handles(&keys);
            let _guards: Vec<MutexGuard<'_, ()>> = handles
                .iter()
                .map(|handle| handle.lock().expect("blob lock poisoned"))
                .collect();

            let extra = self.unbind_keys(&txn)?;
            if extra.iter().all(|key| keys.contains(key)) {
                if cancel.is_cancelled() {
                    return Err(BlobFailure::Cancelled);
                }
                return self.commit(&txn, quorum);
            }

            attempts += 1;
            if attempts >= MAX_LOCK_ATTEMPTS {
                warn!(kind = %txn.kind(), mapping = %txn.mapping(), "lock set unstable, giving up");
                return Err(BlobFailure::Contended);
            }
            keys.extend(extra);
            keys.sort();
            keys.dedup();
            // Guards drop here; the widened set is reacquired in order.
        }
    }
}

impl<S: BlobStore> std::fmt::Debug for TransactionEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys = self.locks.lock().expect("lock table poisoned").len();
        f.debug_struct("TransactionEngine")
            .field("tracked_keys", &keys)
            .finish()
    }
}

/// Durable writes performed so far, with enough state to undo them.
struct WriteLog<'a, S: BlobStore> {
    store: &'a S,
    undo: Vec<(BlobKey, Option<BlobRecord>)>,
    writes: u32,
    min_acks: u32,
}

impl<'a, S: BlobStore> WriteLog<'a, S> {
    fn new(store: &'a S) -> Self {
        Self {
            store,
            undo: Vec::new(),
            writes: 0,
            min_acks: u32::MAX,
        }
    }

    fn write(&mut self, key: BlobKey, record: &BlobRecord, quorum: Quorum) -> TxnResult<()> {
        let prior = self.store.read(&key, &TierSet::durable_only())?;
        self.undo.push((key.clone(), prior));
        let report = self.store.write(&key, record, &TierSet::durable_only())?;
        self.writes += 1;
        self.min_acks = self.min_acks.min(report.durable_acks);
        if report.durable_acks < quorum.get() {
            return Err(BlobFailure::QuorumNotReached {
                required: quorum.get(),
                acked: report.durable_acks,
            });
        }
        Ok(())
    }

    fn remove(&mut self, key: BlobKey) -> TxnResult<()> {
        let prior = self.store.read(&key, &TierSet::durable_only())?;
        self.undo.push((key.clone(), prior));
        self.store.evict(&key, &TierSet::durable_only())?;
        Ok(())
    }

    fn count(&self) -> u32 {
        self.writes
    }

    fn min_acks(&self) -> u32 {
        if self.writes == 0 {
            0
        } else {
            self.min_acks
        }
    }

    /// Undo in reverse order, restoring prior records or evicting blobs
    /// that did not exist. Rollback problems are logged; the original
    /// failure still reaches the caller.
    fn rollback(self) {
        let WriteLog { store, undo, .. } = self;
        for (key, prior) in undo.into_iter().rev() {
            let result = match &prior {
                Some(record) => store
                    .write(&key, record, &TierSet::durable_only())
                    .map(|_| ()),
                None => store.evict(&key, &TierSet::durable_only()),
            };
            if let Err(e) = result {
                warn!(key = %key, error = %e, "rollback step failed");
            }
        }
    }
}
