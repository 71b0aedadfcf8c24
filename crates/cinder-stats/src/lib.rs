//! # Cinder Stats
//!
//! The statistics-sample store of the Cinder query optimizer. For every
//! user table it maintains a small materialized sample of that table's
//! rows, stored as an ordinary table inside a dedicated internal database.
//! Cardinality estimators read these samples instead of scanning full
//! tables.
//!
//! - [`SampleStore`] owns the sample-table lifecycle: create, atomic
//!   drop-then-create refresh, drop.
//! - [`SampleReader`] is the read path: all sampled rows as tiles, or a
//!   single column's values in scan order.
//! - [`ExecutionBridge`] adapts row insertion and sequential scans over the
//!   heap to the store's needs, under caller-supplied transactions.
//! - [`SamplingSource`] is the contract for row selection;
//!   [`ReservoirSampler`] is the default implementation.

pub mod bridge;
pub mod ident;
pub mod namespace;
pub mod reader;
pub mod sampler;
pub mod store;

pub use bridge::{ExecutionBridge, SeqScan, Tile, TILE_CAPACITY};
pub use ident::sample_table_name;
pub use namespace::SampleNamespace;
pub use reader::SampleReader;
pub use sampler::{ReservoirSampler, SamplingSource};
pub use store::{InsertReport, SampleDropResult, SampleStore, StatsMetrics};
