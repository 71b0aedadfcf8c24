//! Sample table naming.

use cinder_common::prelude::*;

/// Derive the name of the sample table for a source table.
///
/// Pure and deterministic: the decimal ids joined with `_`, under a fixed
/// prefix. `_` cannot appear inside a decimal rendering, so distinct
/// `(database, table)` id pairs never collide. Names are stable across
/// restarts; sample tables persist in the catalog under them.
pub fn sample_table_name(database_id: DatabaseId, table_id: TableId) -> String {
    format!("sample_{}_{}", database_id.0, table_id.0)
}
