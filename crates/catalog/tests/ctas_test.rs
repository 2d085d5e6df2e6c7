//! Create-table-as-select decision table, one test per row plus the
//! ordering guarantees around each write.

mod common;

use std::collections::BTreeMap;

use metacat_core::{TableIdentifier, WriteMode};
use metacat_catalog::{CatalogError, Command, CommandError, RowSource};
use serde_json::json;

use common::*;

#[test]
fn new_table_is_registered_with_the_realised_schema() {
    let mut h = Harness::new(UncacheBehaviour::Succeed);
    h.run(ctas("t", WriteMode::ErrorIfExists, int_a())).unwrap();

    let meta = h.store.lookup(&t("t")).unwrap();
    assert_eq!(meta.provider, "memory");
    // the provider relaxed nullability; the catalog records what it realised
    assert_eq!(meta.schema, Some(int_a().as_nullable()));
    assert_eq!(meta.options.get("path").map(String::as_str), Some("c1.d1.t"));
    assert_eq!(
        h.calls(),
        vec!["materialize memory error_if_exists registered=false"]
    );
}

#[test]
fn every_mode_creates_when_the_table_is_missing() {
    for (i, mode) in [
        WriteMode::ErrorIfExists,
        WriteMode::Ignore,
        WriteMode::Append,
        WriteMode::Overwrite,
    ]
    .into_iter()
    .enumerate()
    {
        let mut h = Harness::new(UncacheBehaviour::Succeed);
        let name = format!("t{}", i);
        h.run(ctas(&name, mode, int_a())).unwrap();
        assert!(h.store.exists(&t(&name)), "mode {} did not create", mode);
        assert_eq!(h.count("materialize"), 1);
        assert_eq!(h.count("uncache"), 0);
    }
}

#[test]
fn ignore_never_touches_an_existing_table() {
    let mut h = Harness::new(UncacheBehaviour::Succeed);
    h.run(ctas("t", WriteMode::ErrorIfExists, int_a())).unwrap();
    let before = h.store.lookup(&t("t")).unwrap();
    h.clear_calls();

    h.run(ctas("t", WriteMode::Ignore, int_a_string_b())).unwrap();

    assert_eq!(h.store.lookup(&t("t")), Some(before));
    assert!(h.calls().is_empty());
}

#[test]
fn error_if_exists_fails_before_any_side_effect() {
    let mut h = Harness::new(UncacheBehaviour::Succeed);
    h.run(ctas("t", WriteMode::ErrorIfExists, int_a())).unwrap();
    let before = h.store.lookup(&t("t")).unwrap();
    h.clear_calls();

    let err = h
        .run(ctas("t", WriteMode::ErrorIfExists, int_a_string_b()))
        .unwrap_err();

    assert!(matches!(err, CommandError::TableAlreadyExists(ref r) if *r == t("t")));
    assert_eq!(h.store.lookup(&t("t")), Some(before));
    assert!(h.calls().is_empty());
}

#[test]
fn append_keeps_the_existing_schema() {
    let mut h = Harness::new(UncacheBehaviour::Succeed);
    h.run(ctas("t", WriteMode::ErrorIfExists, int_a())).unwrap();
    h.clear_calls();

    let append = Command::CreateTableAsSelect {
        table: TableIdentifier::bare("t"),
        provider: "memory".to_string(),
        mode: WriteMode::Append,
        options: BTreeMap::new(),
        query: RowSource::new(int_a_string_b(), vec![vec![json!(1), json!("x")]]),
    };
    h.run(append).unwrap();

    let meta = h.store.lookup(&t("t")).unwrap();
    assert_eq!(meta.schema, Some(int_a().as_nullable()));
    assert_eq!(
        h.calls(),
        vec![
            "lookup memory",
            "lookup memory",
            "materialize memory append registered=true",
        ]
    );
}

#[test]
fn append_to_a_table_without_a_schema_keeps_every_column() {
    let mut h = Harness::new(UncacheBehaviour::Succeed);
    h.run(Command::CreateTable {
        table: TableIdentifier::bare("t"),
        provider: "memory".to_string(),
        schema: None,
        options: BTreeMap::new(),
        if_not_exists: false,
    })
    .unwrap();

    let append = Command::CreateTableAsSelect {
        table: TableIdentifier::bare("t"),
        provider: "memory".to_string(),
        mode: WriteMode::Append,
        options: BTreeMap::new(),
        query: RowSource::new(int_a_string_b(), vec![vec![json!(1), json!("x")]]),
    };
    h.run(append).unwrap();

    assert_eq!(
        h.resolver.rows("memory", "c1.d1.t"),
        Some(vec![vec![json!(1), json!("x")]])
    );
    // appending never rewrites catalog metadata
    assert_eq!(h.store.lookup(&t("t")).unwrap().schema, None);
}

#[test]
fn append_rejects_a_different_relation() {
    let mut h = Harness::new(UncacheBehaviour::Succeed);
    h.run(ctas("t", WriteMode::ErrorIfExists, int_a())).unwrap();
    let before = h.store.lookup(&t("t")).unwrap();
    h.clear_calls();

    let elsewhere = BTreeMap::from([("path".to_string(), "elsewhere".to_string())]);
    let err = h
        .run(ctas_with("t", WriteMode::Append, int_a(), elsewhere))
        .unwrap_err();

    match &err {
        CommandError::IncompatibleRelation {
            table,
            expected,
            actual,
        } => {
            assert_eq!(*table, t("t"));
            assert_eq!(expected, "memory(path=elsewhere)");
            assert_eq!(actual, "memory(path=c1.d1.t)");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    let message = err.to_string();
    assert!(message.contains("memory(path=elsewhere)"));
    assert!(message.contains("memory(path=c1.d1.t)"));

    assert_eq!(h.store.lookup(&t("t")), Some(before));
    assert_eq!(h.count("materialize"), 0);
}

#[test]
fn append_treats_tuning_options_as_part_of_the_relation() {
    let mut h = Harness::new(UncacheBehaviour::Succeed);
    h.run(ctas("t", WriteMode::ErrorIfExists, int_a())).unwrap();

    let tuned = BTreeMap::from([("batch_size".to_string(), "100".to_string())]);
    let err = h
        .run(ctas_with("t", WriteMode::Append, int_a(), tuned))
        .unwrap_err();
    assert!(matches!(err, CommandError::IncompatibleRelation { .. }));
}

#[test]
fn append_to_a_read_only_relation_is_unsupported() {
    let mut h = Harness::new(UncacheBehaviour::Succeed);
    h.run(Command::CreateTable {
        table: TableIdentifier::bare("v"),
        provider: "view".to_string(),
        schema: Some(int_a()),
        options: BTreeMap::new(),
        if_not_exists: false,
    })
    .unwrap();
    h.clear_calls();

    let err = h.run(ctas("v", WriteMode::Append, int_a())).unwrap_err();

    assert!(matches!(err, CommandError::UnsupportedRelationKind { .. }));
    assert!(err.to_string().contains("view(path=c1.d1.v) [read-only]"));
    assert_eq!(h.count("materialize"), 0);
}

#[test]
fn overwrite_drops_before_materializing() {
    let mut h = Harness::new(UncacheBehaviour::Succeed);
    h.run(ctas("t", WriteMode::ErrorIfExists, int_a())).unwrap();
    h.clear_calls();

    h.run(ctas("t", WriteMode::Overwrite, int_a_string_b())).unwrap();

    assert_eq!(
        h.calls(),
        vec![
            "uncache c1.d1.t",
            "materialize memory overwrite registered=false",
        ]
    );
    assert_eq!(h.store.list_tables("d1", "c1"), vec!["t"]);
    let meta = h.store.lookup(&t("t")).unwrap();
    assert_eq!(meta.schema, Some(int_a_string_b().as_nullable()));
}

#[test]
fn failed_overwrite_restores_the_previous_entry() {
    let mut h = Harness::new(UncacheBehaviour::Succeed);
    h.run(ctas("t", WriteMode::ErrorIfExists, int_a())).unwrap();
    let before = h.store.lookup(&t("t")).unwrap();
    h.clear_calls();

    let short_row = Command::CreateTableAsSelect {
        table: TableIdentifier::bare("t"),
        provider: "memory".to_string(),
        mode: WriteMode::Overwrite,
        options: BTreeMap::new(),
        query: RowSource::new(int_a_string_b(), vec![vec![json!(1)]]),
    };
    let err = h.run(short_row).unwrap_err();

    assert!(matches!(err, CommandError::Resolve { ref table, .. } if *table == t("t")));
    assert_eq!(
        h.calls(),
        vec![
            "uncache c1.d1.t",
            "materialize memory overwrite registered=false",
        ]
    );
    assert_eq!(h.store.lookup(&t("t")), Some(before));
    assert_eq!(h.store.list_tables("d1", "c1"), vec!["t"]);
}

#[test]
fn overwrite_proceeds_when_uncache_fails() {
    let mut h = Harness::new(UncacheBehaviour::Fail);
    h.run(ctas("t", WriteMode::ErrorIfExists, int_a())).unwrap();

    h.run(ctas("t", WriteMode::Overwrite, int_a_string_b())).unwrap();

    assert_eq!(h.count("uncache"), 1);
    let meta = h.store.lookup(&t("t")).unwrap();
    assert_eq!(meta.schema, Some(int_a_string_b().as_nullable()));
}

#[test]
fn missing_database_fails_before_materializing() {
    let mut h = Harness::new(UncacheBehaviour::Succeed);
    let cmd = Command::CreateTableAsSelect {
        table: TableIdentifier::new(["nope", "t"]).unwrap(),
        provider: "memory".to_string(),
        mode: WriteMode::Overwrite,
        options: BTreeMap::new(),
        query: RowSource::new(int_a(), Vec::new()),
    };

    let err = h.run(cmd).unwrap_err();
    assert!(matches!(
        err,
        CommandError::Catalog(CatalogError::DatabaseNotFound { .. })
    ));
    assert!(h.calls().is_empty());
}

#[test]
fn resolver_errors_leave_the_catalog_unchanged() {
    let mut h = Harness::new(UncacheBehaviour::Succeed);
    let ragged = Command::CreateTableAsSelect {
        table: TableIdentifier::bare("t"),
        provider: "memory".to_string(),
        mode: WriteMode::ErrorIfExists,
        options: BTreeMap::new(),
        query: RowSource::new(int_a_string_b(), vec![vec![json!(1)]]),
    };

    let err = h.run(ragged).unwrap_err();
    assert!(matches!(err, CommandError::Resolve { .. }));
    assert!(!h.store.exists(&t("t")));
}
