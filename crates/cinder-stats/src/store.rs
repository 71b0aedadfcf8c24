//! Sample table lifecycle.

use crate::bridge::ExecutionBridge;
use crate::ident::sample_table_name;
use crate::namespace::SampleNamespace;
use crate::reader::SampleReader;
use crate::sampler::SamplingSource;
use cinder_common::error::{StatsError, TransactionError};
use cinder_common::metrics::{Counter, Gauge};
use cinder_common::prelude::*;
use cinder_storage::{Catalog, HeapStore, TableDescriptor};
use cinder_txn::TxnManager;
use std::sync::Arc;

/// Outcome of dropping a sample table. A missing table is a normal,
/// reportable result, not a failure; refresh pipelines must keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleDropResult {
    Dropped,
    NotFound,
}

/// Per-row insertion results of one sample table creation.
#[derive(Debug, Clone, Default)]
pub struct InsertReport {
    /// Rows handed to the insert path
    pub attempted: usize,
    /// Rows that inserted cleanly
    pub inserted: usize,
    /// Indices (in hand-off order) of rows that were rejected
    pub failed: Vec<usize>,
}

impl InsertReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Sample store counters.
#[derive(Debug, Default)]
pub struct StatsMetrics {
    /// Completed refresh operations
    pub refreshes: Counter,
    /// Rows inserted into sample tables
    pub rows_inserted: Counter,
    /// Rows rejected by the insert path
    pub insert_failures: Counter,
    /// Sample tables dropped
    pub drops: Counter,
    /// Sample tables currently materialized
    pub sample_tables: Gauge,
}

/// The sample table manager.
///
/// Owns the lifecycle of every sample table: creation from a source
/// table's schema, wholesale replacement on refresh, and removal. All row
/// movement goes through the execution bridge under transactions from the
/// shared transaction manager; the store adds no locking of its own, so a
/// refresh racing a read on the same table is serialized only by
/// transaction visibility. Between the drop and the create of a refresh a
/// reader can observe "no sample table"; it can never observe stale or
/// half-written samples.
pub struct SampleStore {
    catalog: Arc<Catalog>,
    heap: Arc<HeapStore>,
    txn_mgr: Arc<TxnManager>,
    bridge: ExecutionBridge,
    namespace: SampleNamespace,
    sampler: Arc<dyn SamplingSource>,
    config: StatsConfig,
    metrics: StatsMetrics,
}

impl SampleStore {
    /// Create the store and ensure its namespace exists.
    pub fn new(
        catalog: Arc<Catalog>,
        heap: Arc<HeapStore>,
        txn_mgr: Arc<TxnManager>,
        sampler: Arc<dyn SamplingSource>,
        config: StatsConfig,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|errors| Error::Config(errors.join("; ")))?;

        let namespace = SampleNamespace::new(config.samples_database.clone());
        namespace.ensure(&catalog, &txn_mgr)?;

        let bridge = ExecutionBridge::new(Arc::clone(&heap), Arc::clone(&txn_mgr));

        Ok(Self {
            catalog,
            heap,
            txn_mgr,
            bridge,
            namespace,
            sampler,
            config,
            metrics: StatsMetrics::default(),
        })
    }

    /// The namespace holding all sample tables.
    pub fn namespace(&self) -> &SampleNamespace {
        &self.namespace
    }

    /// Store counters.
    pub fn metrics(&self) -> &StatsMetrics {
        &self.metrics
    }

    /// A reader over this store's sample tables.
    pub fn reader(&self) -> SampleReader {
        SampleReader::new(
            Arc::clone(&self.catalog),
            Arc::clone(&self.txn_mgr),
            self.bridge.clone(),
            self.namespace.name(),
        )
    }

    /// Create the sample table for a source table and fill it with the
    /// given rows, consuming each row exactly once.
    ///
    /// Creation and every insert run under one transaction, committed only
    /// after the last row. Per-row rejections do not fail the operation by
    /// default; they are collected into the returned [`InsertReport`] so
    /// the caller can judge. With [`PartialInsertPolicy::Abort`] any
    /// rejection undoes the whole creation instead.
    pub fn create_sample_table(
        &self,
        source: &TableDescriptor,
        rows: Vec<Row>,
    ) -> Result<InsertReport> {
        let name = sample_table_name(source.database_id, source.id);
        let schema = source.schema.clone();

        let txn = self.txn_mgr.begin()?;
        let table = match self
            .catalog
            .create_table(self.namespace.name(), &name, schema, txn, true)
        {
            Ok(table) => table,
            Err(e) => {
                let _ = self.txn_mgr.abort(txn);
                return Err(e);
            }
        };

        let mut report = InsertReport {
            attempted: rows.len(),
            ..Default::default()
        };
        for (index, row) in rows.into_iter().enumerate() {
            match self.bridge.insert_row(&table, row, txn) {
                Ok(true) => report.inserted += 1,
                Ok(false) => report.failed.push(index),
                Err(e) => {
                    self.undo_create(&name, table.id, txn);
                    return Err(e);
                }
            }
        }

        if !report.is_complete() {
            self.metrics.insert_failures.add(report.failed.len() as u64);
            if self.config.on_partial_insert == PartialInsertPolicy::Abort {
                self.undo_create(&name, table.id, txn);
                return Err(StatsError::PartialInsert {
                    inserted: report.inserted,
                    attempted: report.attempted,
                }
                .into());
            }
            warn!(
                "sample table {}: {} of {} rows rejected",
                name,
                report.failed.len(),
                report.attempted
            );
        }

        self.txn_mgr.commit(txn)?;
        self.metrics.rows_inserted.add(report.inserted as u64);
        self.metrics.sample_tables.inc();
        debug!(
            "created sample table {} with {} rows",
            name, report.inserted
        );
        Ok(report)
    }

    /// Undo a failed creation: the table and its rows must not outlive the
    /// aborted transaction.
    fn undo_create(&self, name: &str, table_id: TableId, txn: TxnId) {
        let _ = self.catalog.drop_table(self.namespace.name(), name, txn);
        self.heap.drop_table(table_id);
        let _ = self.txn_mgr.abort(txn);
    }

    /// Drop the sample table for a source table, if it exists.
    ///
    /// With `txn: None` the drop runs in its own single-statement
    /// transaction; with `Some`, inside the caller's, which the caller
    /// commits. A table that was never sampled (or already dropped)
    /// reports [`SampleDropResult::NotFound`].
    pub fn drop_sample_table(
        &self,
        database_id: DatabaseId,
        table_id: TableId,
        txn: Option<TxnId>,
    ) -> Result<SampleDropResult> {
        let name = sample_table_name(database_id, table_id);

        let (txn_id, single_statement) = match txn {
            Some(txn_id) => {
                if !self.txn_mgr.is_active(txn_id) {
                    return Err(TransactionError::NotActive(txn_id.0).into());
                }
                (txn_id, false)
            }
            None => (self.txn_mgr.begin()?, true),
        };

        let outcome = match self.catalog.drop_table(self.namespace.name(), &name, txn_id) {
            Ok(dropped) => {
                self.heap.drop_table(dropped.id);
                self.metrics.drops.inc();
                self.metrics.sample_tables.dec();
                SampleDropResult::Dropped
            }
            Err(Error::NotFound(_, _)) => SampleDropResult::NotFound,
            Err(e) => {
                if single_statement {
                    let _ = self.txn_mgr.abort(txn_id);
                }
                return Err(e);
            }
        };

        if single_statement {
            self.txn_mgr.commit(txn_id)?;
        }

        debug!("drop sample table {}: {:?}", name, outcome);
        Ok(outcome)
    }

    /// Replace a source table's samples wholesale.
    ///
    /// Sequence: sample the source, drop the existing sample table
    /// (self-committing; a missing table is fine), create the new one and
    /// fill it. The drop and the create are separate transactions: a
    /// concurrent reader can see "no sample table" in between, never stale
    /// data.
    pub fn refresh(&self, source: &TableDescriptor) -> Result<InsertReport> {
        let rows = self.sampler.sample(source, self.config.samples_per_table)?;

        self.drop_sample_table(source.database_id, source.id, None)?;
        let report = self.create_sample_table(source, rows)?;

        self.metrics.refreshes.inc();
        info!(
            "refreshed samples for {}.{} ({} rows)",
            source.database, source.name, report.inserted
        );
        Ok(report)
    }

    /// Refresh on behalf of a caller that already holds a transaction.
    ///
    /// The caller's transaction is only validated up front; the resample
    /// itself manages its own transactions exactly like [`refresh`].
    ///
    /// [`refresh`]: SampleStore::refresh
    pub fn collect_samples(&self, source: &TableDescriptor, txn: TxnId) -> Result<InsertReport> {
        if !self.txn_mgr.is_active(txn) {
            return Err(TransactionError::NotActive(txn.0).into());
        }
        self.refresh(source)
    }
}
