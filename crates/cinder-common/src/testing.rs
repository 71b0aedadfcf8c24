//! Testing utilities and fixtures

/// Test fixtures for common scenarios
pub mod fixtures {
    use crate::types::*;

    /// Generate a sample schema
    pub fn sample_schema() -> Schema {
        Schema::new(vec![
            ColumnDef::new("id", DataType::Int64).not_null(),
            ColumnDef::new("name", DataType::String),
            ColumnDef::new("value", DataType::Float64),
            ColumnDef::new("active", DataType::Boolean),
        ])
    }

    /// Generate sample rows matching [`sample_schema`]
    pub fn sample_rows(count: usize) -> Vec<Row> {
        (0..count)
            .map(|i| {
                Row::new(vec![
                    Value::Int64(i as i64),
                    Value::String(format!("name_{}", i).into()),
                    Value::Float64(i as f64 * 1.5),
                    Value::Boolean(i % 2 == 0),
                ])
            })
            .collect()
    }

    /// The orders schema used by the end-to-end estimator scenario
    pub fn orders_schema() -> Schema {
        Schema::new(vec![
            ColumnDef::new("id", DataType::Int64).not_null(),
            ColumnDef::new(
                "amount",
                DataType::Decimal {
                    precision: 10,
                    scale: 2,
                },
            ),
        ])
    }
}
