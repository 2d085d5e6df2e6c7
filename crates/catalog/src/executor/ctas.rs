use std::collections::BTreeMap;

use metacat_core::{TableMetadata, TableRef, WriteMode};
use tracing::{debug, info, warn};

use super::{table_taken, with_default_path, CommandError, CommandExecutor};
use crate::relation::{RelationKind, RowSource};
use crate::store::CatalogError;

impl CommandExecutor {
    /// Create-table-as-select.
    ///
    /// | exists | mode          | action                                          |
    /// |--------|---------------|-------------------------------------------------|
    /// | no     | any           | materialize, register with the realised schema  |
    /// | yes    | ErrorIfExists | fail, nothing touched                           |
    /// | yes    | Ignore        | nothing touched                                 |
    /// | yes    | Append        | compare relations, write with the pinned schema |
    /// | yes    | Overwrite     | uncache + drop, then materialize and register   |
    ///
    /// If the Overwrite write fails, the dropped entry is registered again
    /// before the error is returned. Overwrite is still not atomic across
    /// drop and register: if the process dies in between, the table is left
    /// unregistered. Nothing ever leaves two entries for the same reference.
    pub(crate) fn create_table_as_select(
        &self,
        table_ref: TableRef,
        provider: &str,
        mode: WriteMode,
        options: BTreeMap<String, String>,
        query: RowSource,
    ) -> Result<(), CommandError> {
        let existing = self.store.lookup(&table_ref);
        debug!(
            "CTAS {} mode={} exists={}",
            table_ref,
            mode,
            existing.is_some()
        );

        let options = with_default_path(&table_ref, options);

        match (existing, mode) {
            (None, _) => {
                self.check_scope(&table_ref)?;
                self.materialize_and_register(&table_ref, provider, mode, options, query)
            }
            (Some(_), WriteMode::ErrorIfExists) => Err(CommandError::TableAlreadyExists(table_ref)),
            (Some(_), WriteMode::Ignore) => {
                debug!("CTAS {} ignored, table exists", table_ref);
                Ok(())
            }
            (Some(current), WriteMode::Append) => {
                self.append(&table_ref, provider, &current, &options, query)
            }
            (Some(_), WriteMode::Overwrite) => {
                self.check_scope(&table_ref)?;
                self.try_uncache(&table_ref);
                let previous = self.store.unregister(&table_ref)?;
                let result =
                    self.materialize_and_register(&table_ref, provider, mode, options, query);
                if result.is_err() {
                    if let Some(metadata) = previous {
                        self.restore(&table_ref, metadata);
                    }
                }
                result
            }
        }
    }

    /// Fail before any side effect if the table could not be registered.
    fn check_scope(&self, table_ref: &TableRef) -> Result<(), CommandError> {
        if !self.store.cluster_exists(&table_ref.cluster) {
            return Err(CatalogError::ClusterNotFound(table_ref.cluster.clone()).into());
        }
        if !self
            .store
            .database_exists(&table_ref.database, &table_ref.cluster)
        {
            return Err(CatalogError::DatabaseNotFound {
                cluster: table_ref.cluster.clone(),
                database: table_ref.database.clone(),
            }
            .into());
        }
        Ok(())
    }

    fn materialize_and_register(
        &self,
        table_ref: &TableRef,
        provider: &str,
        mode: WriteMode,
        options: BTreeMap<String, String>,
        query: RowSource,
    ) -> Result<(), CommandError> {
        let resolved = self
            .resolver
            .materialize(provider, mode, &options, query)
            .map_err(|source| CommandError::Resolve {
                table: table_ref.clone(),
                source,
            })?;
        self.store
            .register(table_ref, provider, Some(resolved.schema), options)
            .map_err(table_taken)?;
        info!("CTAS created {} via {}", table_ref, resolved.relation);
        Ok(())
    }

    /// Put back the entry an Overwrite dropped.
    fn restore(&self, table_ref: &TableRef, metadata: TableMetadata) {
        match self.store.register_metadata(table_ref, metadata) {
            Ok(()) => info!("CTAS overwrite of {} failed, previous entry restored", table_ref),
            Err(e) => warn!("Could not restore {} after failed overwrite: {}", table_ref, e),
        }
    }

    /// Append to an existing table.
    ///
    /// The relation the table already points at and the one the new options
    /// describe must be identical. Both are resolved read-only, so a
    /// mismatch leaves data and catalog untouched. Rows are written with the
    /// table's existing schema; the query's schema is discarded. When the
    /// table has no known schema the query's rows are written as they are.
    fn append(
        &self,
        table_ref: &TableRef,
        provider: &str,
        current: &TableMetadata,
        options: &BTreeMap<String, String>,
        query: RowSource,
    ) -> Result<(), CommandError> {
        let resolve_err = |source| CommandError::Resolve {
            table: table_ref.clone(),
            source,
        };

        let actual = self
            .resolver
            .lookup(&current.provider, &current.options, current.schema.as_ref())
            .map_err(resolve_err)?;
        if actual.relation.kind != RelationKind::Insertable {
            return Err(CommandError::UnsupportedRelationKind {
                table: table_ref.clone(),
                relation: actual.relation.to_string(),
            });
        }

        let expected = self
            .resolver
            .lookup(provider, options, Some(&query.schema.as_nullable()))
            .map_err(resolve_err)?;
        if expected.relation != actual.relation {
            return Err(CommandError::IncompatibleRelation {
                table: table_ref.clone(),
                expected: expected.relation.to_string(),
                actual: actual.relation.to_string(),
            });
        }

        let rows = if actual.schema.is_empty() {
            debug!("{} has no known schema, appending query columns as is", table_ref);
            query
        } else {
            query.project(&actual.schema)
        };
        self.resolver
            .materialize(provider, WriteMode::Append, options, rows)
            .map_err(resolve_err)?;
        info!("CTAS appended to {}", table_ref);
        Ok(())
    }
}
