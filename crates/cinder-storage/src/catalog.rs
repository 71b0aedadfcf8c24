//! Catalog implementation for Cinder.
//!
//! Manages metadata for databases and tables. All DDL entry points take the
//! calling transaction; the catalog itself applies changes immediately and
//! relies on the caller to commit or abort around them.

use cinder_common::prelude::*;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Table descriptor containing all table metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Table ID
    pub id: TableId,
    /// Owning database ID
    pub database_id: DatabaseId,
    /// Owning database name
    pub database: String,
    /// Table name
    pub name: String,
    /// Column definitions
    pub schema: Schema,
    /// Internal tables are system-owned (e.g. sample tables) and hidden
    /// from user-facing listings
    pub is_internal: bool,
}

impl TableDescriptor {
    /// Get the number of columns.
    pub fn column_count(&self) -> usize {
        self.schema.len()
    }
}

/// Catalog implementation.
pub struct Catalog {
    /// Database name to ID mapping
    databases: DashMap<String, DatabaseId>,
    /// Table descriptors
    tables: DashMap<TableId, TableDescriptor>,
    /// (database name, table name) to ID mapping
    table_names: DashMap<(String, String), TableId>,
    /// Next database ID
    next_database_id: AtomicU32,
    /// Next table ID
    next_table_id: AtomicU64,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self {
            databases: DashMap::new(),
            tables: DashMap::new(),
            table_names: DashMap::new(),
            next_database_id: AtomicU32::new(1),
            next_table_id: AtomicU64::new(1),
        }
    }

    /// Create a new database.
    pub fn create_database(&self, name: &str, txn: TxnId) -> Result<DatabaseId> {
        if self.databases.contains_key(name) {
            return Err(Error::AlreadyExists("Database".into(), name.into()));
        }

        let id = DatabaseId(self.next_database_id.fetch_add(1, Ordering::SeqCst));
        self.databases.insert(name.to_string(), id);

        debug!("created database {} ({:?}) in {}", name, id, txn);
        Ok(id)
    }

    /// Check if a database exists.
    pub fn database_exists(&self, name: &str) -> bool {
        self.databases.contains_key(name)
    }

    /// Get a database's ID by name.
    pub fn database_id(&self, name: &str) -> Option<DatabaseId> {
        self.databases.get(name).map(|r| *r)
    }

    /// Create a new table in a database.
    pub fn create_table(
        &self,
        database: &str,
        name: &str,
        schema: Schema,
        txn: TxnId,
        is_internal: bool,
    ) -> Result<TableDescriptor> {
        let database_id = self
            .database_id(database)
            .ok_or_else(|| Error::NotFound("Database".into(), database.into()))?;

        let key = (database.to_string(), name.to_string());
        if self.table_names.contains_key(&key) {
            return Err(Error::AlreadyExists("Table".into(), name.into()));
        }

        let id = TableId(self.next_table_id.fetch_add(1, Ordering::SeqCst));
        let descriptor = TableDescriptor {
            id,
            database_id,
            database: database.to_string(),
            name: name.to_string(),
            schema,
            is_internal,
        };

        self.tables.insert(id, descriptor.clone());
        self.table_names.insert(key, id);

        debug!("created table {}.{} ({:?}) in {}", database, name, id, txn);
        Ok(descriptor)
    }

    /// Get a table by ID.
    pub fn get_table(&self, table_id: TableId) -> Option<TableDescriptor> {
        self.tables.get(&table_id).map(|r| r.clone())
    }

    /// Get a table by name.
    pub fn get_table_by_name(
        &self,
        database: &str,
        name: &str,
        _txn: TxnId,
    ) -> Option<TableDescriptor> {
        let key = (database.to_string(), name.to_string());
        self.table_names
            .get(&key)
            .and_then(|id| self.tables.get(&id).map(|t| t.clone()))
    }

    /// Drop a table, returning its descriptor so callers can release the
    /// table's storage.
    pub fn drop_table(&self, database: &str, name: &str, txn: TxnId) -> Result<TableDescriptor> {
        let key = (database.to_string(), name.to_string());
        let table_id = self
            .table_names
            .remove(&key)
            .map(|(_, id)| id)
            .ok_or_else(|| Error::NotFound("Table".into(), format!("{}.{}", database, name)))?;

        let descriptor = self
            .tables
            .remove(&table_id)
            .map(|(_, t)| t)
            .ok_or_else(|| Error::Internal(format!("table {:?} missing descriptor", table_id)))?;

        debug!("dropped table {}.{} in {}", database, name, txn);
        Ok(descriptor)
    }

    /// List tables in a database.
    pub fn list_tables_in_database(&self, database: &str) -> Vec<TableDescriptor> {
        self.tables
            .iter()
            .filter(|r| r.database == database)
            .map(|r| r.value().clone())
            .collect()
    }

    /// Get database count.
    pub fn database_count(&self) -> usize {
        self.databases.len()
    }

    /// Get table count.
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}
