use std::collections::BTreeMap;

use metacat_core::{ClusterIdentifier, DatabaseIdentifier, Schema, TableIdentifier, WriteMode};
use serde::{Deserialize, Serialize};

use crate::relation::RowSource;

/// A parsed DDL/DML intent, executed once by
/// [`CommandExecutor`](crate::CommandExecutor).
///
/// Serialised internally tagged, e.g.
/// `{"type":"drop_table","table":["sales","orders"]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    CreateTable {
        table: TableIdentifier,
        provider: String,
        #[serde(default)]
        schema: Option<Schema>,
        #[serde(default)]
        options: BTreeMap<String, String>,
        #[serde(default)]
        if_not_exists: bool,
    },
    CreateTableAsSelect {
        table: TableIdentifier,
        provider: String,
        #[serde(default)]
        mode: WriteMode,
        #[serde(default)]
        options: BTreeMap<String, String>,
        query: RowSource,
    },
    DropTable {
        table: TableIdentifier,
    },
    RenameTable {
        from: TableIdentifier,
        to: TableIdentifier,
    },
    SetSchema {
        table: TableIdentifier,
        schema: Schema,
    },
    RemoveSchema {
        table: TableIdentifier,
    },
    SetOption {
        table: TableIdentifier,
        key: String,
        value: String,
    },
    RemoveOption {
        table: TableIdentifier,
        key: String,
    },
    UseCluster {
        cluster: String,
    },
    UseDatabase {
        database: DatabaseIdentifier,
    },
    ShowTables {
        #[serde(default)]
        database: DatabaseIdentifier,
    },
    ShowDatabases {
        #[serde(default)]
        cluster: ClusterIdentifier,
    },
    ShowClusters,
    CreateDatabase {
        database: DatabaseIdentifier,
        #[serde(default)]
        if_not_exists: bool,
    },
    CreateCluster {
        cluster: String,
        #[serde(default)]
        if_not_exists: bool,
    },
    DropDatabase {
        database: DatabaseIdentifier,
    },
    DropCluster {
        cluster: String,
    },
}

impl Command {
    /// Stable snake_case name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Command::CreateTable { .. } => "create_table",
            Command::CreateTableAsSelect { .. } => "create_table_as_select",
            Command::DropTable { .. } => "drop_table",
            Command::RenameTable { .. } => "rename_table",
            Command::SetSchema { .. } => "set_schema",
            Command::RemoveSchema { .. } => "remove_schema",
            Command::SetOption { .. } => "set_option",
            Command::RemoveOption { .. } => "remove_option",
            Command::UseCluster { .. } => "use_cluster",
            Command::UseDatabase { .. } => "use_database",
            Command::ShowTables { .. } => "show_tables",
            Command::ShowDatabases { .. } => "show_databases",
            Command::ShowClusters => "show_clusters",
            Command::CreateDatabase { .. } => "create_database",
            Command::CreateCluster { .. } => "create_cluster",
            Command::DropDatabase { .. } => "drop_database",
            Command::DropCluster { .. } => "drop_cluster",
        }
    }
}

/// What a command hands back. Only listings produce rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    Done,
    Names(Vec<String>),
}
