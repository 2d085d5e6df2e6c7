//! Recording collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use metacat_core::{DataType, Field, Schema, TableIdentifier, TableRef, WriteMode};
use metacat_catalog::{
    CacheInvalidator, CatalogStore, Command, CommandError, CommandExecutor, CommandOutput,
    MemoryResolver, RelationResolver, ResolveError, ResolvedRelation, Row, RowSource, Session,
    UncacheError,
};

/// Ordered record of every collaborator call.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Wraps a [`MemoryResolver`] and logs each call, noting whether the
/// target table was registered at the moment of a write.
pub struct RecordingResolver {
    inner: MemoryResolver,
    store: Arc<CatalogStore>,
    log: CallLog,
}

impl RecordingResolver {
    /// Rows the wrapped resolver holds at `path`.
    pub fn rows(&self, provider: &str, path: &str) -> Option<Vec<Row>> {
        self.inner.rows(provider, path)
    }
}

impl RelationResolver for RecordingResolver {
    fn lookup(
        &self,
        provider: &str,
        options: &BTreeMap<String, String>,
        schema: Option<&Schema>,
    ) -> Result<ResolvedRelation, ResolveError> {
        self.log.lock().unwrap().push(format!("lookup {}", provider));
        self.inner.lookup(provider, options, schema)
    }

    fn materialize(
        &self,
        provider: &str,
        mode: WriteMode,
        options: &BTreeMap<String, String>,
        rows: RowSource,
    ) -> Result<ResolvedRelation, ResolveError> {
        let registered = options
            .get("path")
            .map(|path| {
                self.store
                    .tables_in("c1", None)
                    .iter()
                    .any(|t| t.to_string() == *path)
            })
            .unwrap_or(false);
        self.log
            .lock()
            .unwrap()
            .push(format!("materialize {} {} registered={}", provider, mode, registered));
        self.inner.materialize(provider, mode, options, rows)
    }
}

/// How the recording cache answers `try_uncache`.
#[derive(Clone, Copy)]
pub enum UncacheBehaviour {
    Succeed,
    NotFound,
    Fail,
}

pub struct RecordingCache {
    behaviour: UncacheBehaviour,
    log: CallLog,
}

impl CacheInvalidator for RecordingCache {
    fn try_uncache(&self, table: &TableRef) -> Result<(), UncacheError> {
        self.log.lock().unwrap().push(format!("uncache {}", table));
        match self.behaviour {
            UncacheBehaviour::Succeed => Ok(()),
            UncacheBehaviour::NotFound => Err(UncacheError::NotFound(table.clone())),
            UncacheBehaviour::Fail => Err(UncacheError::Failed {
                table: table.clone(),
                reason: "engine unavailable".to_string(),
            }),
        }
    }
}

pub struct Harness {
    pub executor: CommandExecutor,
    pub store: Arc<CatalogStore>,
    pub resolver: Arc<RecordingResolver>,
    pub session: Session,
    pub log: CallLog,
}

impl Harness {
    /// Catalog with cluster `c1` holding databases `d1` and `d2`; the
    /// session points at `c1.d1`.
    pub fn new(behaviour: UncacheBehaviour) -> Self {
        Self::with_store(CatalogStore::in_memory(), behaviour)
    }

    pub fn with_store(store: CatalogStore, behaviour: UncacheBehaviour) -> Self {
        let store = Arc::new(store);
        if !store.cluster_exists("c1") {
            store.register_cluster("c1").unwrap();
            store.register_database("d1", "c1").unwrap();
            store.register_database("d2", "c1").unwrap();
        }
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let resolver = Arc::new(RecordingResolver {
            inner: MemoryResolver::new(),
            store: store.clone(),
            log: log.clone(),
        });
        let cache = RecordingCache {
            behaviour,
            log: log.clone(),
        };
        let executor = CommandExecutor::new(store.clone(), resolver.clone(), Arc::new(cache));
        Self {
            executor,
            store,
            resolver,
            session: Session::new("c1", "d1"),
            log,
        }
    }

    pub fn with_cascade_drops(self) -> Self {
        Self {
            executor: self.executor.with_cascade_drops(true),
            ..self
        }
    }

    pub fn run(&mut self, command: Command) -> Result<CommandOutput, CommandError> {
        self.executor.execute(&mut self.session, command)
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.log.lock().unwrap().clear();
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

pub fn t(name: &str) -> TableRef {
    TableRef::new("c1", "d1", name)
}

pub fn int_a() -> Schema {
    Schema::new(vec![Field::new("a", DataType::Int, false)])
}

pub fn int_a_string_b() -> Schema {
    Schema::new(vec![
        Field::new("a", DataType::Int, false),
        Field::new("b", DataType::String, false),
    ])
}

pub fn ctas(table: &str, mode: WriteMode, schema: Schema) -> Command {
    ctas_with(table, mode, schema, BTreeMap::new())
}

pub fn ctas_with(
    table: &str,
    mode: WriteMode,
    schema: Schema,
    options: BTreeMap<String, String>,
) -> Command {
    Command::CreateTableAsSelect {
        table: TableIdentifier::bare(table),
        provider: "memory".to_string(),
        mode,
        options,
        query: RowSource::new(schema, Vec::new()),
    }
}
