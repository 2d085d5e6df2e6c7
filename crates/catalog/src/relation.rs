use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use metacat_core::{Schema, WriteMode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// One row of query output, positionally aligned with its schema.
pub type Row = Vec<Value>;

/// Output of the query behind a create-table-as-select.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowSource {
    pub schema: Schema,
    #[serde(default)]
    pub rows: Vec<Row>,
}

impl RowSource {
    pub fn new(schema: Schema, rows: Vec<Row>) -> Self {
        Self { schema, rows }
    }

    /// Re-shape rows onto `target` by column name. Columns `target` lacks
    /// are dropped; columns the source lacks are filled with `null`.
    pub fn project(self, target: &Schema) -> RowSource {
        let positions: Vec<Option<usize>> = target
            .fields
            .iter()
            .map(|f| self.schema.fields.iter().position(|s| s.name == f.name))
            .collect();
        let rows = self
            .rows
            .into_iter()
            .map(|row| {
                positions
                    .iter()
                    .map(|pos| pos.and_then(|i| row.get(i).cloned()).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        RowSource {
            schema: target.clone(),
            rows,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Accepts appended rows.
    Insertable,
    /// Can be read but never written through the catalog.
    ReadOnly,
}

/// Provider-specific handle on a table's physical data.
///
/// Equality is relation identity: the same provider reached through the
/// same options. Every option counts, including ones that do not change
/// where the data lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub provider: String,
    pub options: BTreeMap<String, String>,
    pub kind: RelationKind,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.provider)?;
        for (i, (k, v)) in self.options.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        write!(f, ")")?;
        if self.kind == RelationKind::ReadOnly {
            write!(f, " [read-only]")?;
        }
        Ok(())
    }
}

/// A relation together with the schema the provider actually realised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRelation {
    pub relation: Relation,
    pub schema: Schema,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("provider {provider} is read-only")]
    ReadOnly { provider: String },
    #[error("data already exists at {location}")]
    AlreadyExists { location: String },
    #[error("row {row} has {found} values, schema expects {expected}")]
    RowShape {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("{0}")]
    Provider(String),
}

/// Turns a provider name plus options into a physical relation.
pub trait RelationResolver: Send + Sync {
    /// Resolve the relation without touching its data.
    fn lookup(
        &self,
        provider: &str,
        options: &BTreeMap<String, String>,
        schema: Option<&Schema>,
    ) -> Result<ResolvedRelation, ResolveError>;

    /// Write `rows` according to `mode` and return the realised relation.
    fn materialize(
        &self,
        provider: &str,
        mode: WriteMode,
        options: &BTreeMap<String, String>,
        rows: RowSource,
    ) -> Result<ResolvedRelation, ResolveError>;
}

// ── In-process provider ─────────────────────────────────────────

/// Option naming where a relation's data lives.
pub const PATH_OPTION: &str = "path";

#[derive(Debug, Clone)]
struct StoredData {
    schema: Schema,
    rows: Vec<Row>,
}

/// Keeps relation data in process memory, keyed by provider and `path`.
///
/// Materialised schemas are relaxed to all-nullable. Providers marked
/// read-only resolve but refuse writes.
pub struct MemoryResolver {
    providers: Option<BTreeSet<String>>,
    read_only: BTreeSet<String>,
    data: Mutex<HashMap<(String, String), StoredData>>,
    lookups: AtomicUsize,
    materializations: AtomicUsize,
}

impl Default for MemoryResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryResolver {
    /// Accepts any provider name; `view` is read-only.
    pub fn new() -> Self {
        Self {
            providers: None,
            read_only: BTreeSet::from(["view".to_string()]),
            data: Mutex::new(HashMap::new()),
            lookups: AtomicUsize::new(0),
            materializations: AtomicUsize::new(0),
        }
    }

    /// Restrict resolution to the given provider names.
    pub fn with_providers<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.providers = Some(providers.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_read_only(mut self, provider: impl Into<String>) -> Self {
        self.read_only.insert(provider.into());
        self
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn materialize_count(&self) -> usize {
        self.materializations.load(Ordering::SeqCst)
    }

    /// Rows currently stored for `provider` at `path`.
    pub fn rows(&self, provider: &str, path: &str) -> Option<Vec<Row>> {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(provider.to_string(), path.to_string()))
            .map(|d| d.rows.clone())
    }

    fn check_provider(&self, provider: &str) -> Result<(), ResolveError> {
        match &self.providers {
            Some(known) if !known.contains(provider) => {
                Err(ResolveError::UnknownProvider(provider.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn relation(&self, provider: &str, options: &BTreeMap<String, String>) -> Relation {
        let kind = if self.read_only.contains(provider) {
            RelationKind::ReadOnly
        } else {
            RelationKind::Insertable
        };
        Relation {
            provider: provider.to_string(),
            options: options.clone(),
            kind,
        }
    }

    fn key(provider: &str, options: &BTreeMap<String, String>) -> (String, String) {
        let path = options.get(PATH_OPTION).cloned().unwrap_or_default();
        (provider.to_string(), path)
    }
}

impl RelationResolver for MemoryResolver {
    fn lookup(
        &self,
        provider: &str,
        options: &BTreeMap<String, String>,
        schema: Option<&Schema>,
    ) -> Result<ResolvedRelation, ResolveError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.check_provider(provider)?;

        let stored = self
            .data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&Self::key(provider, options))
            .map(|d| d.schema.clone());
        let schema = schema.cloned().or(stored).unwrap_or_default();
        Ok(ResolvedRelation {
            relation: self.relation(provider, options),
            schema,
        })
    }

    fn materialize(
        &self,
        provider: &str,
        mode: WriteMode,
        options: &BTreeMap<String, String>,
        rows: RowSource,
    ) -> Result<ResolvedRelation, ResolveError> {
        self.materializations.fetch_add(1, Ordering::SeqCst);
        self.check_provider(provider)?;
        let relation = self.relation(provider, options);
        if relation.kind == RelationKind::ReadOnly {
            return Err(ResolveError::ReadOnly {
                provider: provider.to_string(),
            });
        }
        for (i, row) in rows.rows.iter().enumerate() {
            if row.len() != rows.schema.len() {
                return Err(ResolveError::RowShape {
                    row: i,
                    expected: rows.schema.len(),
                    found: row.len(),
                });
            }
        }

        let key = Self::key(provider, options);
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = data.get_mut(&key) {
            match mode {
                WriteMode::ErrorIfExists => {
                    return Err(ResolveError::AlreadyExists {
                        location: key.1.clone(),
                    });
                }
                WriteMode::Ignore => {
                    return Ok(ResolvedRelation {
                        relation,
                        schema: existing.schema.clone(),
                    });
                }
                WriteMode::Append => {
                    existing.rows.extend(rows.rows);
                    debug!("Appended to {} at '{}'", provider, key.1);
                    return Ok(ResolvedRelation {
                        relation,
                        schema: existing.schema.clone(),
                    });
                }
                WriteMode::Overwrite => {}
            }
        }

        let schema = rows.schema.as_nullable();
        data.insert(
            key.clone(),
            StoredData {
                schema: schema.clone(),
                rows: rows.rows,
            },
        );
        debug!("Materialized {} at '{}' ({})", provider, key.1, mode);
        Ok(ResolvedRelation { relation, schema })
    }
}
