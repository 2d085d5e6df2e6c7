use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::Utc;
use metacat_core::{TableMetadata, TableRef};
use serde::{Deserialize, Serialize};

use super::error::CatalogError;
use super::CatalogState;

pub(super) const CATALOG_FILE: &str = "catalog.json";
const SNAPSHOT_VERSION: u32 = 1;

/// On-disk form of the catalog.
///
/// `TableRef` cannot be a JSON object key, so tables are stored as a list
/// of entries and re-keyed on load.
#[derive(Debug, Serialize, Deserialize)]
struct CatalogSnapshot {
    version: u32,
    /// RFC 3339 timestamp of the write.
    saved_at: String,
    clusters: Vec<String>,
    #[serde(default)]
    databases: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    tables: Vec<TableEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TableEntry {
    table_ref: TableRef,
    metadata: TableMetadata,
}

impl CatalogSnapshot {
    fn capture(state: &CatalogState) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now().to_rfc3339(),
            clusters: state.clusters.iter().cloned().collect(),
            databases: state
                .databases
                .iter()
                .map(|(cluster, dbs)| (cluster.clone(), dbs.iter().cloned().collect()))
                .collect(),
            tables: state
                .tables
                .iter()
                .map(|(table_ref, metadata)| TableEntry {
                    table_ref: table_ref.clone(),
                    metadata: metadata.clone(),
                })
                .collect(),
        }
    }

    fn into_state(self) -> CatalogState {
        CatalogState {
            clusters: self.clusters.into_iter().collect(),
            databases: self
                .databases
                .into_iter()
                .map(|(cluster, dbs)| (cluster, dbs.into_iter().collect::<BTreeSet<_>>()))
                .collect(),
            tables: self
                .tables
                .into_iter()
                .map(|entry| (entry.table_ref, entry.metadata))
                .collect(),
        }
    }
}

/// Load `catalog.json` from `dir`, or `None` when it has never been written.
pub(super) fn load(dir: &Path) -> Result<Option<CatalogState>, CatalogError> {
    let path = dir.join(CATALOG_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let json = std::fs::read_to_string(path)?;
    let snapshot: CatalogSnapshot = serde_json::from_str(&json)?;
    Ok(Some(snapshot.into_state()))
}

/// Write `state` to `catalog.json` via a temp file + rename so readers
/// never see a partially written catalog.
pub(super) fn save(dir: &Path, state: &CatalogState) -> Result<(), CatalogError> {
    let json = serde_json::to_string_pretty(&CatalogSnapshot::capture(state))?;
    let tmp = dir.join(format!("{}.tmp", CATALOG_FILE));
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, dir.join(CATALOG_FILE))?;
    Ok(())
}
