mod error;
mod snapshot;

pub use error::CatalogError;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use metacat_core::{Schema, TableMetadata, TableRef};
use tracing::{debug, info};

/// Everything the catalog knows, guarded as one unit.
#[derive(Debug, Clone, Default)]
pub(crate) struct CatalogState {
    clusters: BTreeSet<String>,
    /// cluster -> databases registered in it
    databases: BTreeMap<String, BTreeSet<String>>,
    tables: BTreeMap<TableRef, TableMetadata>,
}

impl CatalogState {
    fn has_database(&self, cluster: &str, database: &str) -> bool {
        self.databases
            .get(cluster)
            .is_some_and(|dbs| dbs.contains(database))
    }

    fn check_scope(&self, table_ref: &TableRef) -> Result<(), CatalogError> {
        if !self.clusters.contains(&table_ref.cluster) {
            return Err(CatalogError::ClusterNotFound(table_ref.cluster.clone()));
        }
        if !self.has_database(&table_ref.cluster, &table_ref.database) {
            return Err(CatalogError::DatabaseNotFound {
                cluster: table_ref.cluster.clone(),
                database: table_ref.database.clone(),
            });
        }
        Ok(())
    }

    fn table_mut(&mut self, table_ref: &TableRef) -> Result<&mut TableMetadata, CatalogError> {
        self.tables
            .get_mut(table_ref)
            .ok_or_else(|| CatalogError::TableNotFound(table_ref.clone()))
    }

    fn remove_tables_where(&mut self, keep: impl Fn(&TableRef) -> bool) -> usize {
        let before = self.tables.len();
        self.tables.retain(|table_ref, _| keep(table_ref));
        before - self.tables.len()
    }
}

/// Persistent catalog of clusters, databases and table metadata.
///
/// All state lives behind a single lock and every mutation runs start to
/// finish under the write guard, so no caller can observe a half-applied
/// change. When opened on a directory the catalog is rewritten to
/// `catalog.json` after each mutation; if that write fails the in-memory
/// change is rolled back and the I/O error returned.
///
/// ```text
/// <data_dir>/
///   catalog.json      <- clusters, databases, tables
/// ```
pub struct CatalogStore {
    state: RwLock<CatalogState>,
    base_dir: Option<PathBuf>,
}

impl CatalogStore {
    /// A catalog that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(CatalogState::default()),
            base_dir: None,
        }
    }

    /// Open (or create) a catalog persisted under `base_dir`.
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        let state = snapshot::load(&base_dir)?.unwrap_or_default();
        info!(
            "Catalog opened at {}: {} clusters, {} tables",
            base_dir.display(),
            state.clusters.len(),
            state.tables.len()
        );
        Ok(Self {
            state: RwLock::new(state),
            base_dir: Some(base_dir),
        })
    }

    /// Directory backing this store, if any.
    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    fn read(&self) -> RwLockReadGuard<'_, CatalogState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CatalogState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `op` under the write guard and persist the result.
    ///
    /// `op` must validate before it modifies anything: an `Err` from `op`
    /// is returned as is, without rollback.
    fn mutate<T>(
        &self,
        op: impl FnOnce(&mut CatalogState) -> Result<T, CatalogError>,
    ) -> Result<T, CatalogError> {
        let mut state = self.write();
        let Some(dir) = &self.base_dir else {
            return op(&mut *state);
        };
        let before = state.clone();
        let out = op(&mut *state)?;
        if let Err(e) = snapshot::save(dir, &state) {
            *state = before;
            return Err(e);
        }
        Ok(out)
    }

    // ── Tables ──────────────────────────────────────────────────

    pub fn exists(&self, table_ref: &TableRef) -> bool {
        self.read().tables.contains_key(table_ref)
    }

    pub fn lookup(&self, table_ref: &TableRef) -> Option<TableMetadata> {
        self.read().tables.get(table_ref).cloned()
    }

    /// Register new table metadata.
    ///
    /// Fails with `DuplicateTable` if the reference is taken; callers that
    /// replace a table must unregister it first.
    pub fn register(
        &self,
        table_ref: &TableRef,
        provider: &str,
        schema: Option<Schema>,
        options: BTreeMap<String, String>,
    ) -> Result<(), CatalogError> {
        self.register_metadata(table_ref, TableMetadata::new(provider, schema, options))
    }

    pub fn register_metadata(
        &self,
        table_ref: &TableRef,
        metadata: TableMetadata,
    ) -> Result<(), CatalogError> {
        self.mutate(|state| {
            state.check_scope(table_ref)?;
            if state.tables.contains_key(table_ref) {
                return Err(CatalogError::DuplicateTable(table_ref.clone()));
            }
            state.tables.insert(table_ref.clone(), metadata);
            Ok(())
        })?;
        info!("Registered table {}", table_ref);
        Ok(())
    }

    /// Remove a table. Absent tables are not an error; the removed metadata
    /// is returned when there was some.
    pub fn unregister(&self, table_ref: &TableRef) -> Result<Option<TableMetadata>, CatalogError> {
        if !self.exists(table_ref) {
            debug!("Unregister of absent table {} ignored", table_ref);
            return Ok(None);
        }
        let removed = self.mutate(|state| Ok(state.tables.remove(table_ref)))?;
        if removed.is_some() {
            info!("Unregistered table {}", table_ref);
        }
        Ok(removed)
    }

    /// Move `from`'s metadata to `to` in one step.
    ///
    /// Returns `false` (and changes nothing) when `from` does not exist.
    pub fn rename(&self, from: &TableRef, to: &TableRef) -> Result<bool, CatalogError> {
        let moved = self.mutate(|state| {
            if !state.tables.contains_key(from) {
                return Ok(false);
            }
            state.check_scope(to)?;
            if state.tables.contains_key(to) {
                return Err(CatalogError::DuplicateTable(to.clone()));
            }
            if let Some(metadata) = state.tables.remove(from) {
                state.tables.insert(to.clone(), metadata);
            }
            Ok(true)
        })?;
        if moved {
            info!("Renamed table {} to {}", from, to);
        }
        Ok(moved)
    }

    pub fn set_schema(&self, table_ref: &TableRef, schema: Schema) -> Result<(), CatalogError> {
        self.mutate(|state| {
            state.table_mut(table_ref)?.schema = Some(schema);
            Ok(())
        })
    }

    pub fn remove_schema(&self, table_ref: &TableRef) -> Result<(), CatalogError> {
        self.mutate(|state| {
            state.table_mut(table_ref)?.schema = None;
            Ok(())
        })
    }

    pub fn set_option(
        &self,
        table_ref: &TableRef,
        key: &str,
        value: &str,
    ) -> Result<(), CatalogError> {
        self.mutate(|state| {
            state
                .table_mut(table_ref)?
                .options
                .insert(key.to_string(), value.to_string());
            Ok(())
        })
    }

    /// Drop one option. A missing key is not an error; a missing table is.
    pub fn remove_option(&self, table_ref: &TableRef, key: &str) -> Result<(), CatalogError> {
        self.mutate(|state| {
            state.table_mut(table_ref)?.options.remove(key);
            Ok(())
        })
    }

    /// Names of the tables registered under `cluster`.`database`.
    pub fn list_tables(&self, database: &str, cluster: &str) -> Vec<String> {
        self.read()
            .tables
            .keys()
            .filter(|table_ref| table_ref.is_in(cluster, database))
            .map(|table_ref| table_ref.table.clone())
            .collect()
    }

    // ── Databases ───────────────────────────────────────────────

    pub fn database_exists(&self, database: &str, cluster: &str) -> bool {
        self.read().has_database(cluster, database)
    }

    pub fn list_databases(&self, cluster: &str) -> Vec<String> {
        self.read()
            .databases
            .get(cluster)
            .map(|dbs| dbs.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn register_database(&self, database: &str, cluster: &str) -> Result<(), CatalogError> {
        self.mutate(|state| {
            if !state.clusters.contains(cluster) {
                return Err(CatalogError::ClusterNotFound(cluster.to_string()));
            }
            if state.has_database(cluster, database) {
                return Err(CatalogError::DatabaseAlreadyExists {
                    cluster: cluster.to_string(),
                    database: database.to_string(),
                });
            }
            state
                .databases
                .entry(cluster.to_string())
                .or_default()
                .insert(database.to_string());
            Ok(())
        })?;
        info!("Registered database {}.{}", cluster, database);
        Ok(())
    }

    /// Remove a database; absent databases are ignored.
    ///
    /// With `cascade` the database's tables are removed in the same step
    /// and their count returned. Without it they are left in place.
    pub fn unregister_database(
        &self,
        database: &str,
        cluster: &str,
        cascade: bool,
    ) -> Result<usize, CatalogError> {
        let removed_tables = self.mutate(|state| {
            let removed = state
                .databases
                .get_mut(cluster)
                .is_some_and(|dbs| dbs.remove(database));
            if !removed {
                return Ok(None);
            }
            let tables = if cascade {
                state.remove_tables_where(|t| !t.is_in(cluster, database))
            } else {
                0
            };
            Ok(Some(tables))
        })?;
        match removed_tables {
            Some(tables) => {
                info!(
                    "Unregistered database {}.{} ({} tables removed)",
                    cluster, database, tables
                );
                Ok(tables)
            }
            None => {
                debug!("Unregister of absent database {}.{} ignored", cluster, database);
                Ok(0)
            }
        }
    }

    // ── Clusters ────────────────────────────────────────────────

    pub fn cluster_exists(&self, cluster: &str) -> bool {
        self.read().clusters.contains(cluster)
    }

    pub fn list_clusters(&self) -> Vec<String> {
        self.read().clusters.iter().cloned().collect()
    }

    pub fn register_cluster(&self, cluster: &str) -> Result<(), CatalogError> {
        self.mutate(|state| {
            if !state.clusters.insert(cluster.to_string()) {
                return Err(CatalogError::ClusterAlreadyExists(cluster.to_string()));
            }
            Ok(())
        })?;
        info!("Registered cluster {}", cluster);
        Ok(())
    }

    /// Remove a cluster; absent clusters are ignored.
    ///
    /// With `cascade` its databases and tables go too (table count
    /// returned). Without it they stay behind until re-registered or
    /// dropped individually.
    pub fn unregister_cluster(&self, cluster: &str, cascade: bool) -> Result<usize, CatalogError> {
        let removed_tables = self.mutate(|state| {
            if !state.clusters.remove(cluster) {
                return Ok(None);
            }
            let tables = if cascade {
                state.databases.remove(cluster);
                state.remove_tables_where(|t| t.cluster != cluster)
            } else {
                0
            };
            Ok(Some(tables))
        })?;
        match removed_tables {
            Some(tables) => {
                info!("Unregistered cluster {} ({} tables removed)", cluster, tables);
                Ok(tables)
            }
            None => {
                debug!("Unregister of absent cluster {} ignored", cluster);
                Ok(0)
            }
        }
    }

    /// Every table registered under `cluster`, optionally narrowed to one
    /// database.
    pub fn tables_in(&self, cluster: &str, database: Option<&str>) -> Vec<TableRef> {
        self.read()
            .tables
            .keys()
            .filter(|t| t.cluster == cluster && database.map_or(true, |db| t.database == db))
            .cloned()
            .collect()
    }
}
