//! Row selection for refreshes.

use cinder_common::prelude::*;
use cinder_storage::{HeapStore, RowIterator, TableDescriptor};
use cinder_txn::TxnManager;
use rand::Rng;
use std::sync::Arc;

/// Source of sampled rows for a table.
///
/// Implementations return owned copies of at most `max_rows` of the source
/// table's rows; ownership transfers to the caller, which consumes each
/// row exactly once by inserting it into a sample table.
pub trait SamplingSource: Send + Sync {
    fn sample(&self, source: &TableDescriptor, max_rows: usize) -> Result<Vec<Row>>;
}

/// Single-pass uniform reservoir sampler over a snapshot-visible scan of
/// the source table, under its own read-only transaction.
pub struct ReservoirSampler {
    heap: Arc<HeapStore>,
    txn_mgr: Arc<TxnManager>,
}

impl ReservoirSampler {
    pub fn new(heap: Arc<HeapStore>, txn_mgr: Arc<TxnManager>) -> Self {
        Self { heap, txn_mgr }
    }
}

impl SamplingSource for ReservoirSampler {
    fn sample(&self, source: &TableDescriptor, max_rows: usize) -> Result<Vec<Row>> {
        if max_rows == 0 {
            return Ok(Vec::new());
        }

        let txn = self.txn_mgr.begin()?;
        let snapshot = self.txn_mgr.snapshot(txn)?;

        let mut rng = rand::thread_rng();
        let mut reservoir: Vec<Row> = Vec::with_capacity(max_rows);
        let mut seen = 0usize;

        let mut iter = self.heap.scan(source.id, &snapshot);
        while let Some(result) = iter.next() {
            let (_row_id, row) = match result {
                Ok(entry) => entry,
                Err(e) => {
                    let _ = self.txn_mgr.abort(txn);
                    return Err(e);
                }
            };

            if reservoir.len() < max_rows {
                reservoir.push(row);
            } else {
                let slot = rng.gen_range(0..=seen);
                if slot < max_rows {
                    reservoir[slot] = row;
                }
            }
            seen += 1;
        }

        self.txn_mgr.commit(txn)?;
        debug!(
            "sampled {} of {} rows from {}",
            reservoir.len(),
            seen,
            source.name
        );
        Ok(reservoir)
    }
}
