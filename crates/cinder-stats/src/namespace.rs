//! The internal database holding all sample tables.

use cinder_common::prelude::*;
use cinder_storage::Catalog;
use cinder_txn::TxnManager;
use std::sync::atomic::{AtomicBool, Ordering};

/// The sample namespace: one internal catalog database that exists purely
/// as a container for sample tables.
///
/// This is an explicitly constructed component, owned by the
/// [`SampleStore`](crate::SampleStore) and shared by reference; it is not
/// process-global state. Initialization is single-writer: [`ensure`] runs
/// once per store (guarded, idempotent, safe to re-run after a restart),
/// and the namespace is effectively read-only afterwards. Sample tables
/// inside it come and go; the database itself is never dropped during
/// normal operation.
///
/// [`ensure`]: SampleNamespace::ensure
pub struct SampleNamespace {
    name: String,
    ready: AtomicBool,
}

impl SampleNamespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ready: AtomicBool::new(false),
        }
    }

    /// The namespace's database name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Idempotently create the namespace database.
    ///
    /// Runs in its own transaction and commits immediately. An already
    /// existing database is absorbed as success so that initialization can
    /// run any number of times, including after a process restart against
    /// a catalog that still holds the namespace.
    pub fn ensure(&self, catalog: &Catalog, txn_mgr: &TxnManager) -> Result<()> {
        if self.ready.load(Ordering::Acquire) {
            return Ok(());
        }

        let txn = txn_mgr.begin()?;
        match catalog.create_database(&self.name, txn) {
            Ok(id) => info!("created sample namespace {} ({:?})", self.name, id),
            Err(Error::AlreadyExists(_, _)) => {
                debug!("sample namespace {} already present", self.name)
            }
            Err(e) => {
                let _ = txn_mgr.abort(txn);
                return Err(e);
            }
        }
        txn_mgr.commit(txn)?;

        self.ready.store(true, Ordering::Release);
        Ok(())
    }
}
