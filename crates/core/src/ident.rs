use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::IdentifierError;

/// Fully-qualified table reference: the catalog's primary key.
///
/// Uniqueness is enforced over the whole triple, so `c1.db.t` and
/// `c2.db.t` are distinct tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRef {
    pub cluster: String,
    pub database: String,
    pub table: String,
}

impl TableRef {
    pub fn new(
        cluster: impl Into<String>,
        database: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            cluster: cluster.into(),
            database: database.into(),
            table: table.into(),
        }
    }

    /// True when this table lives in `cluster`.`database`.
    pub fn is_in(&self, cluster: &str, database: &str) -> bool {
        self.cluster == cluster && self.database == database
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.cluster, self.database, self.table)
    }
}

fn check_segments(
    kind: &'static str,
    segments: &[String],
    max: usize,
) -> Result<(), IdentifierError> {
    if segments.len() > max {
        return Err(IdentifierError::TooManySegments {
            kind,
            max,
            found: segments.len(),
            segments: segments.to_vec(),
        });
    }
    if segments.iter().any(|s| s.is_empty()) {
        return Err(IdentifierError::EmptySegment {
            kind,
            segments: segments.to_vec(),
        });
    }
    Ok(())
}

// ── Database identifier ───────────────────────────────────────

/// Zero to two name segments, outermost first: `[]`, `[database]` or
/// `[cluster, database]`. Missing segments fall back to the session's
/// current cluster/database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct DatabaseIdentifier(Vec<String>);

impl DatabaseIdentifier {
    pub fn new<S: Into<String>>(
        segments: impl IntoIterator<Item = S>,
    ) -> Result<Self, IdentifierError> {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        check_segments("database", &segments, 2)?;
        Ok(Self(segments))
    }

    /// The identifier with no segments: current cluster, current database.
    pub fn current() -> Self {
        Self(Vec::new())
    }

    pub fn database(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn cluster(&self) -> Option<&str> {
        if self.0.len() >= 2 {
            self.0.get(self.0.len() - 2).map(String::as_str)
        } else {
            None
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl TryFrom<Vec<String>> for DatabaseIdentifier {
    type Error = IdentifierError;

    fn try_from(segments: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(segments)
    }
}

impl From<DatabaseIdentifier> for Vec<String> {
    fn from(ident: DatabaseIdentifier) -> Self {
        ident.0
    }
}

// ── Cluster identifier ────────────────────────────────────────

/// Zero or one segment; absent means the session's current cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ClusterIdentifier(Option<String>);

impl ClusterIdentifier {
    pub fn new<S: Into<String>>(
        segments: impl IntoIterator<Item = S>,
    ) -> Result<Self, IdentifierError> {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        check_segments("cluster", &segments, 1)?;
        Ok(Self(segments.into_iter().next()))
    }

    pub fn named(cluster: impl Into<String>) -> Self {
        Self(Some(cluster.into()))
    }

    pub fn current() -> Self {
        Self(None)
    }

    pub fn cluster(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl TryFrom<Vec<String>> for ClusterIdentifier {
    type Error = IdentifierError;

    fn try_from(segments: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(segments)
    }
}

impl From<ClusterIdentifier> for Vec<String> {
    fn from(ident: ClusterIdentifier) -> Self {
        ident.0.into_iter().collect()
    }
}

// ── Table identifier ──────────────────────────────────────────

/// One to three segments: `[table]`, `[database, table]` or
/// `[cluster, database, table]`. The scope in front of the table name
/// defaults the same way a [`DatabaseIdentifier`] does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct TableIdentifier {
    scope: DatabaseIdentifier,
    table: String,
}

impl TableIdentifier {
    pub fn new<S: Into<String>>(
        segments: impl IntoIterator<Item = S>,
    ) -> Result<Self, IdentifierError> {
        let mut segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        check_segments("table", &segments, 3)?;
        let table = segments
            .pop()
            .ok_or(IdentifierError::Missing { kind: "table" })?;
        Ok(Self {
            scope: DatabaseIdentifier(segments),
            table,
        })
    }

    /// An unqualified table name.
    pub fn bare(table: impl Into<String>) -> Self {
        Self {
            scope: DatabaseIdentifier::current(),
            table: table.into(),
        }
    }

    pub fn scope(&self) -> &DatabaseIdentifier {
        &self.scope
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl From<&TableRef> for TableIdentifier {
    fn from(table_ref: &TableRef) -> Self {
        Self {
            scope: DatabaseIdentifier(vec![
                table_ref.cluster.clone(),
                table_ref.database.clone(),
            ]),
            table: table_ref.table.clone(),
        }
    }
}

impl TryFrom<Vec<String>> for TableIdentifier {
    type Error = IdentifierError;

    fn try_from(segments: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(segments)
    }
}

impl From<TableIdentifier> for Vec<String> {
    fn from(ident: TableIdentifier) -> Self {
        let mut segments = ident.scope.0;
        segments.push(ident.table);
        segments
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in self.scope.segments() {
            write!(f, "{}.", segment)?;
        }
        write!(f, "{}", self.table)
    }
}
