//! Configuration types for Cinder

use serde::{Deserialize, Serialize};

/// Policy applied when some rows of a sample set fail to insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PartialInsertPolicy {
    /// Commit whatever subset inserted cleanly and report the failures.
    #[default]
    Tolerate,
    /// Abort the transaction and fail the whole refresh.
    Abort,
}

/// Statistics-sample store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Maximum number of rows sampled per source table
    #[serde(default = "default_samples_per_table")]
    pub samples_per_table: usize,

    /// Name of the internal database holding all sample tables.
    /// Persisted in the catalog; must stay stable across restarts.
    #[serde(default = "default_samples_database")]
    pub samples_database: String,

    /// What to do when individual rows fail to insert during a refresh
    #[serde(default)]
    pub on_partial_insert: PartialInsertPolicy,
}

fn default_samples_per_table() -> usize {
    100
}

fn default_samples_database() -> String {
    "samples_db".to_string()
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            samples_per_table: default_samples_per_table(),
            samples_database: default_samples_database(),
            on_partial_insert: PartialInsertPolicy::default(),
        }
    }
}

impl StatsConfig {
    /// Validate the configuration.
    /// Fatal errors are returned as `Err(Vec<String>)`.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.samples_per_table == 0 {
            errors.push("samples_per_table must be greater than zero".to_string());
        }

        if self.samples_database.is_empty() {
            errors.push("samples_database must not be empty".to_string());
        } else if !self
            .samples_database
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
            || !self
                .samples_database
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic())
        {
            errors.push(format!(
                "samples_database '{}' is not a valid identifier",
                self.samples_database
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
