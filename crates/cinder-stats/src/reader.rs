//! Read path for optimizer consumers.

use crate::bridge::{ExecutionBridge, Tile};
use crate::ident::sample_table_name;
use cinder_common::prelude::*;
use cinder_storage::Catalog;
use cinder_txn::TxnManager;
use std::sync::Arc;

/// Reader over the sample tables of one namespace.
///
/// Each query runs under its own transaction; the column set of a full
/// read comes from the resolved sample table's schema at query time, not
/// from any assumption the caller makes about the source table.
pub struct SampleReader {
    catalog: Arc<Catalog>,
    txn_mgr: Arc<TxnManager>,
    bridge: ExecutionBridge,
    namespace: String,
}

impl SampleReader {
    pub fn new(
        catalog: Arc<Catalog>,
        txn_mgr: Arc<TxnManager>,
        bridge: ExecutionBridge,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            txn_mgr,
            bridge,
            namespace: namespace.into(),
        }
    }

    /// Fetch all sampled rows for a source table, as tiles over every
    /// column of the sample table.
    ///
    /// `Ok(None)` means the sample table does not exist, which estimators
    /// must treat differently from `Ok(Some(_))` with zero rows: absence
    /// means "fall back to defaults", emptiness is a data point.
    pub fn get_all_samples(
        &self,
        database_id: DatabaseId,
        table_id: TableId,
    ) -> Result<Option<Vec<Tile>>> {
        let name = sample_table_name(database_id, table_id);
        let txn = self.txn_mgr.begin()?;

        let Some(table) = self.catalog.get_table_by_name(&self.namespace, &name, txn) else {
            self.txn_mgr.commit(txn)?;
            debug!("no sample table {} in {}", name, self.namespace);
            return Ok(None);
        };

        let column_ids: Vec<ColumnId> = (0..table.schema.len() as u32).map(ColumnId).collect();
        let tiles = match self.bridge.scan(&table, &column_ids, txn) {
            Ok(tiles) => tiles,
            Err(e) => {
                let _ = self.txn_mgr.abort(txn);
                return Err(e);
            }
        };
        self.txn_mgr.commit(txn)?;

        Ok(Some(tiles))
    }

    /// Fetch one column's sampled values for a source table, flattened
    /// across all tiles in scan-encounter order.
    ///
    /// A missing sample table (or one with no rows) yields an empty
    /// sequence; only a genuine scan failure (e.g. a column the sample
    /// table does not have) is an error.
    pub fn get_column_samples(
        &self,
        database_id: DatabaseId,
        table_id: TableId,
        column_id: ColumnId,
    ) -> Result<Vec<Value>> {
        let name = sample_table_name(database_id, table_id);
        let txn = self.txn_mgr.begin()?;

        let Some(table) = self.catalog.get_table_by_name(&self.namespace, &name, txn) else {
            self.txn_mgr.commit(txn)?;
            debug!("no sample table {} in {}", name, self.namespace);
            return Ok(Vec::new());
        };

        let tiles = match self.bridge.scan(&table, &[column_id], txn) {
            Ok(tiles) => tiles,
            Err(e) => {
                let _ = self.txn_mgr.abort(txn);
                return Err(e);
            }
        };
        self.txn_mgr.commit(txn)?;

        let mut values = Vec::new();
        for tile in &tiles {
            for row in &tile.rows {
                if let Some(value) = row.get(0) {
                    values.push(value.clone());
                }
            }
        }
        Ok(values)
    }
}
