//! In-memory MVCC heap for Cinder.
//!
//! Tuple-level visibility using xmin/xmax version stamps and the
//! transaction manager's snapshots. Rows live entirely in memory; table
//! storage is reclaimed as a whole when the owning catalog entry is
//! dropped.

use crate::RowIterator;
use cinder_common::prelude::*;
use cinder_txn::Snapshot;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A stored tuple with its version header.
#[derive(Debug, Clone)]
struct HeapTuple {
    row_id: RowId,
    xmin: TxnId,
    xmax: TxnId,
    row: Row,
}

/// In-memory heap store.
pub struct HeapStore {
    /// Tuples per table
    tables: DashMap<TableId, Arc<RwLock<Vec<HeapTuple>>>>,
    /// Next row ID per table
    next_row_id: DashMap<TableId, AtomicU64>,
}

impl Default for HeapStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HeapStore {
    /// Create a new heap store.
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
            next_row_id: DashMap::new(),
        }
    }

    /// Allocate the next row ID for a table.
    fn allocate_row_id(&self, table_id: TableId) -> RowId {
        let counter = self
            .next_row_id
            .entry(table_id)
            .or_insert_with(|| AtomicU64::new(1));
        RowId(counter.fetch_add(1, Ordering::SeqCst))
    }

    /// Insert a row, stamping it with the inserting transaction.
    /// The row is owned by the heap from here on.
    pub fn insert(&self, table_id: TableId, txn_id: TxnId, row: Row) -> Result<RowId> {
        let row_id = self.allocate_row_id(table_id);
        let tuple = HeapTuple {
            row_id,
            xmin: txn_id,
            xmax: TxnId::INVALID,
            row,
        };

        let tuples = Arc::clone(
            self.tables
                .entry(table_id)
                .or_insert_with(|| Arc::new(RwLock::new(Vec::new())))
                .value(),
        );
        tuples.write().push(tuple);

        Ok(row_id)
    }

    /// Scan all tuples of a table visible to the snapshot.
    /// An unknown table yields an empty iterator, matching a table that
    /// was created but never written.
    pub fn scan(&self, table_id: TableId, snapshot: &Snapshot) -> HeapIterator {
        let tuples = self.tables.get(&table_id).map(|r| Arc::clone(r.value()));
        HeapIterator {
            tuples,
            position: 0,
            snapshot: snapshot.clone(),
        }
    }

    /// Release all storage for a table. Called when the catalog entry is
    /// dropped; tuples become unreachable immediately.
    pub fn drop_table(&self, table_id: TableId) {
        self.tables.remove(&table_id);
        self.next_row_id.remove(&table_id);
        debug!("released heap storage for {:?}", table_id);
    }

    /// Number of tables with any storage allocated.
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

/// Iterator over snapshot-visible rows of one table.
pub struct HeapIterator {
    tuples: Option<Arc<RwLock<Vec<HeapTuple>>>>,
    position: usize,
    snapshot: Snapshot,
}

impl RowIterator for HeapIterator {
    fn next(&mut self) -> Option<Result<(RowId, Row)>> {
        let tuples = self.tuples.as_ref()?;
        let guard = tuples.read();

        while self.position < guard.len() {
            let tuple = &guard[self.position];
            self.position += 1;

            if self.snapshot.is_visible(tuple.xmin, tuple.xmax) {
                return Some(Ok((tuple.row_id, tuple.row.clone())));
            }
        }

        None
    }
}
