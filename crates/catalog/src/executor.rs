mod ctas;

use std::collections::BTreeMap;
use std::sync::Arc;

use metacat_core::TableRef;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{CacheInvalidator, UncacheError};
use crate::command::{Command, CommandOutput};
use crate::relation::{RelationResolver, ResolveError, PATH_OPTION};
use crate::session::Session;
use crate::store::{CatalogError, CatalogStore};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("table {0} already exists")]
    TableAlreadyExists(TableRef),
    #[error("cannot append to {table}: expected relation {expected}, found {actual}")]
    IncompatibleRelation {
        table: TableRef,
        expected: String,
        actual: String,
    },
    #[error("cannot append to {table}: {relation} is not a writable relation")]
    UnsupportedRelationKind { table: TableRef, relation: String },
    #[error("failed to resolve relation for {table}: {source}")]
    Resolve {
        table: TableRef,
        #[source]
        source: ResolveError,
    },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Runs [`Command`]s against a [`CatalogStore`].
///
/// Physical data goes through the [`RelationResolver`]; cached plans are
/// dropped through the [`CacheInvalidator`] before any destructive change.
pub struct CommandExecutor {
    store: Arc<CatalogStore>,
    resolver: Arc<dyn RelationResolver>,
    cache: Arc<dyn CacheInvalidator>,
    cascade_drops: bool,
}

impl CommandExecutor {
    pub fn new(
        store: Arc<CatalogStore>,
        resolver: Arc<dyn RelationResolver>,
        cache: Arc<dyn CacheInvalidator>,
    ) -> Self {
        Self {
            store,
            resolver,
            cache,
            cascade_drops: false,
        }
    }

    /// Make DropDatabase/DropCluster remove everything beneath them.
    pub fn with_cascade_drops(mut self, cascade: bool) -> Self {
        self.cascade_drops = cascade;
        self
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    /// Execute one command. Unqualified names resolve against `session`,
    /// which `Use*` commands update.
    pub fn execute(
        &self,
        session: &mut Session,
        command: Command,
    ) -> Result<CommandOutput, CommandError> {
        debug!(command = command.kind(), "executing");
        match command {
            Command::CreateTable {
                table,
                provider,
                schema,
                options,
                if_not_exists,
            } => {
                let table_ref = session.resolve_table(&table);
                if self.store.exists(&table_ref) {
                    if if_not_exists {
                        debug!("Table {} exists, skipping create", table_ref);
                        return Ok(CommandOutput::Done);
                    }
                    return Err(CommandError::TableAlreadyExists(table_ref));
                }
                let options = with_default_path(&table_ref, options);
                self.store
                    .register(&table_ref, &provider, schema, options)
                    .map_err(table_taken)?;
            }
            Command::CreateTableAsSelect {
                table,
                provider,
                mode,
                options,
                query,
            } => {
                let table_ref = session.resolve_table(&table);
                self.create_table_as_select(table_ref, &provider, mode, options, query)?;
            }
            Command::DropTable { table } => {
                let table_ref = session.resolve_table(&table);
                self.drop_table(&table_ref)?;
            }
            Command::RenameTable { from, to } => {
                let from = session.resolve_table(&from);
                let to = session.resolve_table(&to);
                self.rename_table(&from, &to)?;
            }
            Command::SetSchema { table, schema } => {
                self.store.set_schema(&session.resolve_table(&table), schema)?;
            }
            Command::RemoveSchema { table } => {
                self.store.remove_schema(&session.resolve_table(&table))?;
            }
            Command::SetOption { table, key, value } => {
                self.store
                    .set_option(&session.resolve_table(&table), &key, &value)?;
            }
            Command::RemoveOption { table, key } => {
                self.store
                    .remove_option(&session.resolve_table(&table), &key)?;
            }
            Command::UseCluster { cluster } => {
                if !self.store.cluster_exists(&cluster) {
                    return Err(CatalogError::ClusterNotFound(cluster).into());
                }
                info!("Session now using cluster {}", cluster);
                session.set_cluster(cluster);
            }
            Command::UseDatabase { database } => {
                let db = session.resolve_database(&database);
                if !self.store.database_exists(&db.database, &db.cluster) {
                    return Err(CatalogError::DatabaseNotFound {
                        cluster: db.cluster,
                        database: db.database,
                    }
                    .into());
                }
                info!("Session now using database {}.{}", db.cluster, db.database);
                session.set_database(db);
            }
            Command::ShowTables { database } => {
                let db = session.resolve_database(&database);
                return Ok(CommandOutput::Names(
                    self.store.list_tables(&db.database, &db.cluster),
                ));
            }
            Command::ShowDatabases { cluster } => {
                let cluster = session.resolve_cluster(&cluster);
                return Ok(CommandOutput::Names(self.store.list_databases(&cluster)));
            }
            Command::ShowClusters => {
                return Ok(CommandOutput::Names(self.store.list_clusters()));
            }
            Command::CreateDatabase {
                database,
                if_not_exists,
            } => {
                let db = session.resolve_database(&database);
                match self.store.register_database(&db.database, &db.cluster) {
                    Err(CatalogError::DatabaseAlreadyExists { .. }) if if_not_exists => {
                        debug!("Database {}.{} exists, skipping create", db.cluster, db.database);
                    }
                    other => other?,
                }
            }
            Command::CreateCluster {
                cluster,
                if_not_exists,
            } => match self.store.register_cluster(&cluster) {
                Err(CatalogError::ClusterAlreadyExists(_)) if if_not_exists => {
                    debug!("Cluster {} exists, skipping create", cluster);
                }
                other => other?,
            },
            Command::DropDatabase { database } => {
                let db = session.resolve_database(&database);
                if self.cascade_drops {
                    for table_ref in self.store.tables_in(&db.cluster, Some(&db.database)) {
                        self.try_uncache(&table_ref);
                    }
                }
                self.store
                    .unregister_database(&db.database, &db.cluster, self.cascade_drops)?;
            }
            Command::DropCluster { cluster } => {
                if self.cascade_drops {
                    for table_ref in self.store.tables_in(&cluster, None) {
                        self.try_uncache(&table_ref);
                    }
                }
                self.store.unregister_cluster(&cluster, self.cascade_drops)?;
            }
        }
        Ok(CommandOutput::Done)
    }

    /// Drop any cached plan over `table_ref`. Failures are logged and
    /// swallowed: the catalog change that follows must go ahead.
    fn try_uncache(&self, table_ref: &TableRef) {
        match self.cache.try_uncache(table_ref) {
            Ok(()) => {}
            Err(e @ UncacheError::NotFound(_)) => {
                warn!("Could not uncache {} (table may already be gone): {}", table_ref, e);
            }
            Err(e @ UncacheError::Failed { .. }) => {
                warn!("Uncache of {} failed, continuing: {}", table_ref, e);
            }
        }
    }

    fn drop_table(&self, table_ref: &TableRef) -> Result<(), CommandError> {
        self.try_uncache(table_ref);
        self.store.unregister(table_ref)?;
        Ok(())
    }

    /// No-op when `from` has no metadata.
    fn rename_table(&self, from: &TableRef, to: &TableRef) -> Result<(), CommandError> {
        self.try_uncache(from);
        if self.store.lookup(from).is_none() {
            debug!("Rename source {} not found, nothing to do", from);
            return Ok(());
        }
        self.store.rename(from, to).map_err(table_taken)?;
        Ok(())
    }
}

/// A taken table reference is a user-facing conflict, not a store fault.
fn table_taken(err: CatalogError) -> CommandError {
    match err {
        CatalogError::DuplicateTable(table_ref) => CommandError::TableAlreadyExists(table_ref),
        other => other.into(),
    }
}

/// Tables without an explicit location live under their own name.
fn with_default_path(
    table_ref: &TableRef,
    mut options: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    options
        .entry(PATH_OPTION.to_string())
        .or_insert_with(|| table_ref.to_string());
    options
}
