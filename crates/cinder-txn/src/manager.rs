//! Transaction manager.
//!
//! Hands out transaction ids, tracks the active and committed sets, and
//! builds the snapshots the storage layer uses for tuple visibility.
//! Commit is durable once it returns; there is no in-flight state visible
//! to other transactions.

use crate::{Transaction, TransactionStatus};
use cinder_common::error::TransactionError;
use cinder_common::prelude::*;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

/// Transaction manager configuration.
#[derive(Debug, Clone)]
pub struct TxnConfig {
    /// Maximum number of active transactions
    pub max_active_txns: usize,
    /// Default isolation level
    pub default_isolation: IsolationLevel,
}

impl Default for TxnConfig {
    fn default() -> Self {
        Self {
            max_active_txns: 10000,
            default_isolation: IsolationLevel::RepeatableRead,
        }
    }
}

/// Snapshot for tuple visibility.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Transaction ID of the snapshot creator
    pub txn_id: TxnId,
    /// Maximum transaction ID when the snapshot was created (exclusive)
    pub xmax: TxnId,
    /// Transactions that were active when the snapshot was created
    active_txns: HashSet<TxnId>,
}

impl Snapshot {
    pub fn new(txn_id: TxnId, xmax: TxnId, active_txns: HashSet<TxnId>) -> Self {
        Self {
            txn_id,
            xmax,
            active_txns,
        }
    }

    #[inline]
    fn is_active(&self, txn_id: TxnId) -> bool {
        self.active_txns.contains(&txn_id)
    }

    /// Check if a tuple version stamped with `xmin`/`xmax` is visible to
    /// this snapshot. `xmax == TxnId::INVALID` means the tuple was never
    /// deleted.
    #[inline]
    pub fn is_visible(&self, tuple_xmin: TxnId, tuple_xmax: TxnId) -> bool {
        if !tuple_xmin.is_valid() {
            return false; // Never inserted
        }

        if tuple_xmin == self.txn_id {
            // Our own insert, visible unless we also deleted it
            return !tuple_xmax.is_valid();
        }

        if tuple_xmin >= self.xmax {
            return false; // Inserted by a future transaction
        }

        if self.is_active(tuple_xmin) {
            return false; // Inserted by a still-active transaction
        }

        if !tuple_xmax.is_valid() {
            return true; // Not deleted
        }

        if tuple_xmax == self.txn_id {
            return false; // We deleted it
        }

        if tuple_xmax >= self.xmax {
            return true; // Deleted by a future transaction
        }

        // Deleted by a committed transaction unless the deleter was still
        // active when this snapshot was taken
        self.is_active(tuple_xmax)
    }
}

/// Transaction manager statistics.
#[derive(Debug, Clone, Default)]
pub struct TxnStats {
    pub txns_started: u64,
    pub txns_committed: u64,
    pub txns_aborted: u64,
}

/// Transaction manager.
pub struct TxnManager {
    /// Configuration
    config: TxnConfig,
    /// Next transaction ID
    next_txn_id: AtomicU64,
    /// Active transactions
    active_txns: DashMap<TxnId, RwLock<Transaction>>,
    /// Committed transactions: txn_id -> commit_ts
    committed_txns: DashMap<TxnId, TxnId>,
    /// Statistics
    stats: Mutex<TxnStats>,
}

impl TxnManager {
    /// Create a new transaction manager.
    pub fn new(config: TxnConfig) -> Self {
        Self {
            config,
            next_txn_id: AtomicU64::new(1),
            active_txns: DashMap::new(),
            committed_txns: DashMap::new(),
            stats: Mutex::new(TxnStats::default()),
        }
    }

    /// Begin a new transaction at the default isolation level.
    pub fn begin(&self) -> Result<TxnId> {
        self.begin_with_isolation(self.config.default_isolation)
    }

    /// Begin a new transaction with the specified isolation level.
    pub fn begin_with_isolation(&self, isolation: IsolationLevel) -> Result<TxnId> {
        if self.active_txns.len() >= self.config.max_active_txns {
            return Err(TransactionError::TooManyActive.into());
        }

        let txn_id = TxnId(self.next_txn_id.fetch_add(1, Ordering::SeqCst));
        let txn = Transaction::new(txn_id, isolation);

        self.active_txns.insert(txn_id, RwLock::new(txn));
        self.stats.lock().txns_started += 1;

        Ok(txn_id)
    }

    /// Get the snapshot for an active transaction.
    pub fn snapshot(&self, txn_id: TxnId) -> Result<Snapshot> {
        if !self.active_txns.contains_key(&txn_id) {
            return Err(TransactionError::NotActive(txn_id.0).into());
        }

        let active: HashSet<TxnId> = self.active_txns.iter().map(|e| *e.key()).collect();
        let xmax = TxnId(self.next_txn_id.load(Ordering::SeqCst));

        Ok(Snapshot::new(txn_id, xmax, active))
    }

    /// Commit a transaction, returning its commit timestamp.
    pub fn commit(&self, txn_id: TxnId) -> Result<TxnId> {
        let removed = self.active_txns.remove(&txn_id);
        if removed.is_none() {
            if self.committed_txns.contains_key(&txn_id) {
                return Err(TransactionError::AlreadyCommitted(txn_id.0).into());
            }
            return Err(TransactionError::NotActive(txn_id.0).into());
        }

        let commit_ts = TxnId(self.next_txn_id.fetch_add(1, Ordering::SeqCst));
        self.committed_txns.insert(txn_id, commit_ts);
        self.stats.lock().txns_committed += 1;

        debug!("committed {} at {}", txn_id, commit_ts);
        Ok(commit_ts)
    }

    /// Abort a transaction.
    pub fn abort(&self, txn_id: TxnId) -> Result<()> {
        let removed = self.active_txns.remove(&txn_id);
        if removed.is_none() {
            return Err(TransactionError::NotActive(txn_id.0).into());
        }

        self.stats.lock().txns_aborted += 1;
        debug!("aborted {}", txn_id);
        Ok(())
    }

    /// Check if a transaction is active.
    pub fn is_active(&self, txn_id: TxnId) -> bool {
        self.active_txns.contains_key(&txn_id)
    }

    /// Check if a transaction is committed.
    pub fn is_committed(&self, txn_id: TxnId) -> bool {
        self.committed_txns.contains_key(&txn_id)
    }

    /// Get transaction status.
    pub fn status(&self, txn_id: TxnId) -> Option<TransactionStatus> {
        if self.active_txns.contains_key(&txn_id) {
            Some(TransactionStatus::Active)
        } else if self.committed_txns.contains_key(&txn_id) {
            Some(TransactionStatus::Committed)
        } else {
            None
        }
    }

    /// Get active transaction count.
    pub fn active_txn_count(&self) -> usize {
        self.active_txns.len()
    }

    /// Get statistics.
    pub fn stats(&self) -> TxnStats {
        self.stats.lock().clone()
    }
}

impl Default for TxnManager {
    fn default() -> Self {
        Self::new(TxnConfig::default())
    }
}
