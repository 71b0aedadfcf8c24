//! # Cinder Storage
//!
//! Catalog and row storage for Cinder providing:
//! - Database and table metadata with name-based lookup
//! - MVCC-aware in-memory heap storage with snapshot-visible scans

pub mod catalog;
pub mod heap;

pub use catalog::{Catalog, TableDescriptor};
pub use heap::{HeapIterator, HeapStore};

use cinder_common::prelude::*;

/// Iterator over rows
pub trait RowIterator: Send {
    fn next(&mut self) -> Option<Result<(RowId, Row)>>;
}
