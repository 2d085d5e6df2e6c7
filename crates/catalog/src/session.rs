use metacat_core::config::SessionConfig;
use metacat_core::{ClusterIdentifier, DatabaseIdentifier, TableIdentifier, TableRef};

/// A database name scoped to its cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseRef {
    pub cluster: String,
    pub database: String,
}

/// Per-session "current cluster" and "current database" pointers.
///
/// Every partially qualified name is resolved against these, so two
/// sessions over the same catalog can point at different scopes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    current_cluster: String,
    current_database: String,
}

impl Session {
    pub fn new(cluster: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            current_cluster: cluster.into(),
            current_database: database.into(),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(&config.default_cluster, &config.default_database)
    }

    pub fn current_cluster(&self) -> &str {
        &self.current_cluster
    }

    pub fn current_database(&self) -> &str {
        &self.current_database
    }

    pub(crate) fn set_cluster(&mut self, cluster: String) {
        self.current_cluster = cluster;
    }

    pub(crate) fn set_database(&mut self, database: DatabaseRef) {
        self.current_cluster = database.cluster;
        self.current_database = database.database;
    }

    /// Last segment is the database, the one before it the cluster; each
    /// falls back to the current pointer when absent.
    pub fn resolve_database(&self, ident: &DatabaseIdentifier) -> DatabaseRef {
        DatabaseRef {
            cluster: ident
                .cluster()
                .unwrap_or(self.current_cluster.as_str())
                .to_string(),
            database: ident
                .database()
                .unwrap_or(self.current_database.as_str())
                .to_string(),
        }
    }

    pub fn resolve_cluster(&self, ident: &ClusterIdentifier) -> String {
        ident.cluster().unwrap_or(self.current_cluster.as_str()).to_string()
    }

    pub fn resolve_table(&self, ident: &TableIdentifier) -> TableRef {
        let scope = self.resolve_database(ident.scope());
        TableRef::new(scope.cluster, scope.database, ident.table())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}
