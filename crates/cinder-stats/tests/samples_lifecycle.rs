//! End-to-end tests for the sample store: lifecycle, read paths, and the
//! documented refresh consistency window.

use cinder_common::prelude::*;
use cinder_common::testing::fixtures;
use cinder_stats::{
    sample_table_name, ReservoirSampler, SampleDropResult, SampleStore, Tile,
};
use cinder_storage::{Catalog, HeapStore, TableDescriptor};
use cinder_txn::TxnManager;
use std::sync::Arc;

struct Fixture {
    catalog: Arc<Catalog>,
    heap: Arc<HeapStore>,
    txn_mgr: Arc<TxnManager>,
    store: SampleStore,
}

impl Fixture {
    fn new() -> Self {
        Self::with_config(StatsConfig::default())
    }

    fn with_config(config: StatsConfig) -> Self {
        let catalog = Arc::new(Catalog::new());
        let heap = Arc::new(HeapStore::new());
        let txn_mgr = Arc::new(TxnManager::default());
        let sampler = Arc::new(ReservoirSampler::new(
            Arc::clone(&heap),
            Arc::clone(&txn_mgr),
        ));
        let store = SampleStore::new(
            Arc::clone(&catalog),
            Arc::clone(&heap),
            Arc::clone(&txn_mgr),
            sampler,
            config,
        )
        .unwrap();

        Self {
            catalog,
            heap,
            txn_mgr,
            store,
        }
    }

    fn create_source(&self, name: &str, schema: Schema, rows: Vec<Row>) -> TableDescriptor {
        let txn = self.txn_mgr.begin().unwrap();
        if !self.catalog.database_exists("app") {
            self.catalog.create_database("app", txn).unwrap();
        }
        let table = self
            .catalog
            .create_table("app", name, schema, txn, false)
            .unwrap();
        for row in rows {
            self.heap.insert(table.id, txn, row).unwrap();
        }
        self.txn_mgr.commit(txn).unwrap();
        table
    }

    fn append_source_rows(&self, table: &TableDescriptor, rows: Vec<Row>) {
        let txn = self.txn_mgr.begin().unwrap();
        for row in rows {
            self.heap.insert(table.id, txn, row).unwrap();
        }
        self.txn_mgr.commit(txn).unwrap();
    }
}

fn orders_rows() -> Vec<Row> {
    vec![
        Row::new(vec![Value::Int64(1), Value::Decimal(1000, 2)]), // 10.00
        Row::new(vec![Value::Int64(2), Value::Decimal(2050, 2)]), // 20.50
        Row::new(vec![Value::Int64(3), Value::Decimal(525, 2)]),  // 5.25
    ]
}

fn flatten(tiles: &[Tile]) -> Vec<Row> {
    tiles.iter().flat_map(|t| t.rows.iter().cloned()).collect()
}

#[test]
fn end_to_end_orders_scenario() {
    let fx = Fixture::new();
    let orders = fx.create_source("orders", fixtures::orders_schema(), orders_rows());
    let reader = fx.store.reader();

    fx.store.refresh(&orders).unwrap();

    let tiles = reader
        .get_all_samples(orders.database_id, orders.id)
        .unwrap()
        .expect("sample table must exist after refresh");
    let rows = flatten(&tiles);
    assert_eq!(rows.len(), 3);

    // Exactly the source rows, in an order consistent with one scan pass
    let amounts = reader
        .get_column_samples(orders.database_id, orders.id, ColumnId(1))
        .unwrap();
    assert_eq!(amounts.len(), 3);
    for (row, amount) in rows.iter().zip(&amounts) {
        assert_eq!(row.get(1), Some(amount));
    }

    let mut ids: Vec<i64> = rows.iter().map(|r| r.get_i64(0).unwrap()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn refresh_replaces_never_merges() {
    let fx = Fixture::new();
    let orders = fx.create_source("orders", fixtures::orders_schema(), orders_rows());
    let reader = fx.store.reader();

    fx.store.refresh(&orders).unwrap();
    fx.store.refresh(&orders).unwrap();

    // A second refresh over unchanged data yields the same three rows,
    // never a union of the two sample sets
    let tiles = reader
        .get_all_samples(orders.database_id, orders.id)
        .unwrap()
        .unwrap();
    assert_eq!(flatten(&tiles).len(), 3);
}

#[test]
fn resample_reflects_only_latest_source_data() {
    let fx = Fixture::new();
    let orders = fx.create_source("orders", fixtures::orders_schema(), orders_rows());
    let reader = fx.store.reader();

    fx.store.refresh(&orders).unwrap();

    fx.append_source_rows(
        &orders,
        vec![
            Row::new(vec![Value::Int64(4), Value::Decimal(100, 2)]),
            Row::new(vec![Value::Int64(5), Value::Decimal(9999, 2)]),
        ],
    );
    fx.store.refresh(&orders).unwrap();

    let tiles = reader
        .get_all_samples(orders.database_id, orders.id)
        .unwrap()
        .unwrap();
    let mut ids: Vec<i64> = flatten(&tiles)
        .iter()
        .map(|r| r.get_i64(0).unwrap())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

#[test]
fn empty_refresh_leaves_schema_only_sample_table() {
    let fx = Fixture::new();
    let empty = fx.create_source("empty", fixtures::orders_schema(), vec![]);
    let reader = fx.store.reader();

    let report = fx.store.refresh(&empty).unwrap();
    assert_eq!(report.attempted, 0);
    assert_eq!(report.inserted, 0);

    // The sample table exists with the source's schema and zero rows;
    // readers see "zero samples", not "no sample table"
    let name = sample_table_name(empty.database_id, empty.id);
    let txn = fx.txn_mgr.begin().unwrap();
    let sample_table = fx
        .catalog
        .get_table_by_name(fx.store.namespace().name(), &name, txn)
        .unwrap();
    fx.txn_mgr.commit(txn).unwrap();
    assert_eq!(sample_table.schema, empty.schema);

    let tiles = reader
        .get_all_samples(empty.database_id, empty.id)
        .unwrap()
        .expect("empty sample table must still resolve");
    assert!(flatten(&tiles).is_empty());
    assert!(reader
        .get_column_samples(empty.database_id, empty.id, ColumnId(0))
        .unwrap()
        .is_empty());
}

#[test]
fn drop_of_never_sampled_table_is_nonfatal() {
    let fx = Fixture::new();

    let outcome = fx
        .store
        .drop_sample_table(DatabaseId(1), TableId(999), None)
        .unwrap();
    assert_eq!(outcome, SampleDropResult::NotFound);
    assert_eq!(fx.txn_mgr.active_txn_count(), 0);
}

#[test]
fn column_projection_matches_full_rows() {
    let fx = Fixture::new();
    let items = fx.create_source("items", fixtures::sample_schema(), fixtures::sample_rows(7));
    let reader = fx.store.reader();

    fx.store.refresh(&items).unwrap();

    let tiles = reader
        .get_all_samples(items.database_id, items.id)
        .unwrap()
        .unwrap();
    let rows = flatten(&tiles);

    for column in 0..items.schema.len() {
        let values = reader
            .get_column_samples(items.database_id, items.id, ColumnId(column as u32))
            .unwrap();
        assert_eq!(values.len(), rows.len());
        for (row, value) in rows.iter().zip(&values) {
            assert_eq!(row.get(column), Some(value));
        }
    }
}

#[test]
fn reader_distinguishes_absence_from_emptiness() {
    let fx = Fixture::new();
    let reader = fx.store.reader();

    // Never sampled: absent for full reads, empty for column reads
    assert!(reader
        .get_all_samples(DatabaseId(1), TableId(42))
        .unwrap()
        .is_none());
    assert!(reader
        .get_column_samples(DatabaseId(1), TableId(42), ColumnId(0))
        .unwrap()
        .is_empty());
}

#[test]
fn reader_observes_absence_during_refresh_window() {
    // The documented consistency gap: between the drop and the create of a
    // refresh there is no sample table. A reader in that window sees
    // absence, never stale or partial data.
    let fx = Fixture::new();
    let orders = fx.create_source("orders", fixtures::orders_schema(), orders_rows());
    let reader = fx.store.reader();

    fx.store.refresh(&orders).unwrap();
    assert!(reader
        .get_all_samples(orders.database_id, orders.id)
        .unwrap()
        .is_some());

    // Step 2 of a refresh, frozen in time
    let outcome = fx
        .store
        .drop_sample_table(orders.database_id, orders.id, None)
        .unwrap();
    assert_eq!(outcome, SampleDropResult::Dropped);
    assert!(reader
        .get_all_samples(orders.database_id, orders.id)
        .unwrap()
        .is_none());

    // Step 3 closes the window
    fx.store
        .create_sample_table(&orders, orders_rows())
        .unwrap();
    let tiles = reader
        .get_all_samples(orders.database_id, orders.id)
        .unwrap()
        .unwrap();
    assert_eq!(flatten(&tiles).len(), 3);
}

#[test]
fn partial_insert_tolerated_by_default() {
    let fx = Fixture::new();
    let orders = fx.create_source("orders", fixtures::orders_schema(), vec![]);
    let reader = fx.store.reader();

    let rows = vec![
        Row::new(vec![Value::Int64(1), Value::Decimal(1000, 2)]),
        Row::new(vec![Value::Int64(2)]), // wrong arity
        Row::new(vec![Value::Int64(3), Value::Decimal(525, 2)]),
    ];
    let report = fx.store.create_sample_table(&orders, rows).unwrap();
    assert_eq!(report.attempted, 3);
    assert_eq!(report.inserted, 2);
    assert_eq!(report.failed, vec![1]);

    // The conforming subset committed
    let tiles = reader
        .get_all_samples(orders.database_id, orders.id)
        .unwrap()
        .unwrap();
    assert_eq!(flatten(&tiles).len(), 2);
    assert_eq!(fx.store.metrics().insert_failures.get(), 1);
}

#[test]
fn partial_insert_abort_policy_undoes_creation() {
    let fx = Fixture::with_config(StatsConfig {
        on_partial_insert: PartialInsertPolicy::Abort,
        ..Default::default()
    });
    let orders = fx.create_source("orders", fixtures::orders_schema(), vec![]);
    let reader = fx.store.reader();

    let rows = vec![
        Row::new(vec![Value::Int64(1), Value::Decimal(1000, 2)]),
        Row::new(vec![Value::Int64(2)]), // wrong arity
    ];
    let err = fx.store.create_sample_table(&orders, rows).unwrap_err();
    assert!(matches!(
        err,
        Error::Stats(cinder_common::error::StatsError::PartialInsert {
            inserted: 1,
            attempted: 2,
        })
    ));

    // Nothing of the failed creation survives
    assert!(reader
        .get_all_samples(orders.database_id, orders.id)
        .unwrap()
        .is_none());
    assert_eq!(fx.txn_mgr.active_txn_count(), 0);
}

#[test]
fn samples_survive_source_table_drop() {
    // The sample table holds an owned schema copy and owned rows; it
    // references its source by identity only
    let fx = Fixture::new();
    let orders = fx.create_source("orders", fixtures::orders_schema(), orders_rows());
    let reader = fx.store.reader();

    fx.store.refresh(&orders).unwrap();

    let txn = fx.txn_mgr.begin().unwrap();
    let dropped = fx.catalog.drop_table("app", "orders", txn).unwrap();
    fx.heap.drop_table(dropped.id);
    fx.txn_mgr.commit(txn).unwrap();

    let tiles = reader
        .get_all_samples(orders.database_id, orders.id)
        .unwrap()
        .unwrap();
    assert_eq!(flatten(&tiles).len(), 3);
}

#[test]
fn store_initialization_is_repeatable() {
    let fx = Fixture::new();
    assert!(fx.catalog.database_exists("samples_db"));
    let databases_before = fx.catalog.database_count();

    // A second store over the same catalog finds the namespace in place
    let sampler = Arc::new(ReservoirSampler::new(
        Arc::clone(&fx.heap),
        Arc::clone(&fx.txn_mgr),
    ));
    let second = SampleStore::new(
        Arc::clone(&fx.catalog),
        Arc::clone(&fx.heap),
        Arc::clone(&fx.txn_mgr),
        sampler,
        StatsConfig::default(),
    )
    .unwrap();
    assert_eq!(fx.catalog.database_count(), databases_before);
    assert_eq!(second.namespace().name(), "samples_db");
}

#[test]
fn collect_samples_validates_caller_transaction() {
    let fx = Fixture::new();
    let orders = fx.create_source("orders", fixtures::orders_schema(), orders_rows());
    let reader = fx.store.reader();

    let stale = fx.txn_mgr.begin().unwrap();
    fx.txn_mgr.commit(stale).unwrap();
    assert!(fx.store.collect_samples(&orders, stale).is_err());

    let txn = fx.txn_mgr.begin().unwrap();
    let report = fx.store.collect_samples(&orders, txn).unwrap();
    fx.txn_mgr.commit(txn).unwrap();
    assert_eq!(report.inserted, 3);
    assert!(reader
        .get_all_samples(orders.database_id, orders.id)
        .unwrap()
        .is_some());
}

#[test]
fn drop_inside_caller_transaction() {
    let fx = Fixture::new();
    let orders = fx.create_source("orders", fixtures::orders_schema(), orders_rows());

    fx.store.refresh(&orders).unwrap();

    let txn = fx.txn_mgr.begin().unwrap();
    let outcome = fx
        .store
        .drop_sample_table(orders.database_id, orders.id, Some(txn))
        .unwrap();
    assert_eq!(outcome, SampleDropResult::Dropped);

    // The store must not have committed the caller's transaction
    assert!(fx.txn_mgr.is_active(txn));
    fx.txn_mgr.commit(txn).unwrap();
}

#[test]
fn refresh_bounded_by_sample_budget() {
    let fx = Fixture::with_config(StatsConfig {
        samples_per_table: 8,
        ..Default::default()
    });
    let items = fx.create_source("items", fixtures::sample_schema(), fixtures::sample_rows(50));
    let reader = fx.store.reader();

    let report = fx.store.refresh(&items).unwrap();
    assert_eq!(report.inserted, 8);

    let tiles = reader
        .get_all_samples(items.database_id, items.id)
        .unwrap()
        .unwrap();
    assert_eq!(flatten(&tiles).len(), 8);
}

#[test]
fn refresh_updates_metrics() {
    let fx = Fixture::new();
    let orders = fx.create_source("orders", fixtures::orders_schema(), orders_rows());

    fx.store.refresh(&orders).unwrap();
    fx.store.refresh(&orders).unwrap();

    let metrics = fx.store.metrics();
    assert_eq!(metrics.refreshes.get(), 2);
    assert_eq!(metrics.rows_inserted.get(), 6);
    assert_eq!(metrics.drops.get(), 1); // first refresh found nothing to drop
    assert_eq!(metrics.sample_tables.get(), 1);
}
