//! Execution bridge.
//!
//! Thin adapter between the sample store and the execution primitives:
//! "insert this row into table T under transaction X" and "scan table T's
//! columns under transaction X, producing tiles of rows". Both require an
//! active transaction; the check happens before any machinery is touched.

use cinder_common::error::TransactionError;
use cinder_common::prelude::*;
use cinder_storage::{HeapIterator, HeapStore, RowIterator, TableDescriptor};
use cinder_txn::{Snapshot, TxnManager};
use std::sync::Arc;

/// Maximum number of rows per tile produced by one scan step.
pub const TILE_CAPACITY: usize = 1024;

/// A batch of rows projected to the requested columns, produced by one
/// step of a sequential scan. Ownership transfers to the caller; the scan
/// retains nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    /// The columns this tile was projected to, in request order
    pub column_ids: Vec<ColumnId>,
    /// Projected rows; `rows[i].values[j]` is the value of `column_ids[j]`
    pub rows: Vec<Row>,
}

impl Tile {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn value(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Initialized,
    Executing,
    Exhausted,
}

/// A sequential scan over one table, bound to a snapshot and a column
/// projection at construction.
///
/// Lifecycle: Initialized (projection validated, iterator bound) →
/// Executing ([`next_tile`] yields zero-or-more tiles) → Exhausted
/// (terminal; [`next_tile`] returns `None` forever).
///
/// [`next_tile`]: SeqScan::next_tile
pub struct SeqScan {
    iter: HeapIterator,
    column_ids: Vec<ColumnId>,
    projection: Vec<usize>,
    state: ScanState,
}

impl SeqScan {
    /// Bind a scan to a table, projection, and snapshot.
    pub fn new(
        heap: &HeapStore,
        table: &TableDescriptor,
        column_ids: &[ColumnId],
        snapshot: &Snapshot,
    ) -> Result<Self> {
        let mut projection = Vec::with_capacity(column_ids.len());
        for &column_id in column_ids {
            let index = column_id.0 as usize;
            if index >= table.schema.len() {
                return Err(Error::InvalidArgument(format!(
                    "column {} out of range for table {} ({} columns)",
                    column_id.0,
                    table.name,
                    table.schema.len()
                )));
            }
            projection.push(index);
        }

        Ok(Self {
            iter: heap.scan(table.id, snapshot),
            column_ids: column_ids.to_vec(),
            projection,
            state: ScanState::Initialized,
        })
    }

    /// Produce the next tile, or `None` once the scan is exhausted.
    pub fn next_tile(&mut self) -> Result<Option<Tile>> {
        if self.state == ScanState::Exhausted {
            return Ok(None);
        }
        self.state = ScanState::Executing;

        let mut rows = Vec::new();
        while rows.len() < TILE_CAPACITY {
            match self.iter.next() {
                Some(Ok((_row_id, row))) => {
                    let mut values = Vec::with_capacity(self.projection.len());
                    for &index in &self.projection {
                        let value = row.get(index).cloned().ok_or_else(|| {
                            Error::Internal(format!(
                                "stored row has no column {} (row width {})",
                                index,
                                row.len()
                            ))
                        })?;
                        values.push(value);
                    }
                    rows.push(Row::new(values));
                }
                Some(Err(e)) => return Err(e),
                None => {
                    self.state = ScanState::Exhausted;
                    break;
                }
            }
        }

        if rows.is_empty() {
            self.state = ScanState::Exhausted;
            return Ok(None);
        }

        Ok(Some(Tile {
            column_ids: self.column_ids.clone(),
            rows,
        }))
    }
}

/// Execution bridge over the heap and transaction manager.
#[derive(Clone)]
pub struct ExecutionBridge {
    heap: Arc<HeapStore>,
    txn_mgr: Arc<TxnManager>,
}

impl ExecutionBridge {
    pub fn new(heap: Arc<HeapStore>, txn_mgr: Arc<TxnManager>) -> Self {
        Self { heap, txn_mgr }
    }

    /// Hard precondition shared by insert and scan: the supplied handle
    /// must name an active transaction.
    fn require_active(&self, txn: TxnId) -> Result<()> {
        if !self.txn_mgr.is_active(txn) {
            return Err(TransactionError::NotActive(txn.0).into());
        }
        Ok(())
    }

    /// Insert one row into a table, consuming it.
    ///
    /// Best-effort per row: a row that does not conform to the table's
    /// schema is rejected with `Ok(false)` and logged, leaving the
    /// transaction usable for the remaining rows. Only machinery failures
    /// (including an inactive transaction) are errors.
    pub fn insert_row(&self, table: &TableDescriptor, row: Row, txn: TxnId) -> Result<bool> {
        self.require_active(txn)?;

        if row.len() != table.schema.len() {
            warn!(
                "rejecting row for {}: {} values against {} columns",
                table.name,
                row.len(),
                table.schema.len()
            );
            return Ok(false);
        }
        for (index, value) in row.values.iter().enumerate() {
            if !table.schema.accepts(index, value) {
                warn!(
                    "rejecting row for {}: {} not accepted by column {}",
                    table.name,
                    value.data_type(),
                    index
                );
                return Ok(false);
            }
        }

        self.heap.insert(table.id, txn, row)?;
        Ok(true)
    }

    /// Sequentially scan a table's requested columns under a transaction,
    /// accumulating all produced tiles.
    pub fn scan(
        &self,
        table: &TableDescriptor,
        column_ids: &[ColumnId],
        txn: TxnId,
    ) -> Result<Vec<Tile>> {
        self.require_active(txn)?;

        let snapshot = self.txn_mgr.snapshot(txn)?;
        let mut scan = SeqScan::new(&self.heap, table, column_ids, &snapshot)?;

        let mut tiles = Vec::new();
        while let Some(tile) = scan.next_tile()? {
            tiles.push(tile);
        }
        Ok(tiles)
    }
}
