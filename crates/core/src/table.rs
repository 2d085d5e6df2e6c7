use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::Schema;

/// Catalog-side description of a table. The data itself is owned by the
/// provider; the catalog only remembers how to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl TableMetadata {
    pub fn new(
        provider: impl Into<String>,
        schema: Option<Schema>,
        options: BTreeMap<String, String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            schema,
            options,
        }
    }
}

/// What create-table-as-select does when the target already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    #[default]
    ErrorIfExists,
    Ignore,
    Append,
    Overwrite,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteMode::ErrorIfExists => write!(f, "error_if_exists"),
            WriteMode::Ignore => write!(f, "ignore"),
            WriteMode::Append => write!(f, "append"),
            WriteMode::Overwrite => write!(f, "overwrite"),
        }
    }
}
