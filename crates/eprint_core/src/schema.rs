//! Catalog probing for one repository database.
//!
//! # Responsibility
//! - Discover the record tables present and their columns in declared order.
//!
//! # Invariants
//! - A probe either returns a complete map or an error, never a partial map.
//! - Probing is read-only and idempotent.
//!
//! # See also
//! - `router::RouteTable::for_schema` for capability evaluation.

use log::{error, info};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const TABLE_NAME_PATTERNS: &[&str] = &["eprint%", "document%", "file%"];

pub type SchemaResult<T> = Result<T, SchemaError>;

#[derive(Debug)]
pub enum SchemaError {
    Catalog {
        table: Option<String>,
        source: rusqlite::Error,
    },
    MissingMainTable,
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Catalog {
                table: Some(table),
                source,
            } => write!(f, "cannot list columns of `{table}`: {source}"),
            Self::Catalog {
                table: None,
                source,
            } => write!(f, "cannot list tables: {source}"),
            Self::MissingMainTable => write!(f, "database has no `eprint` table"),
        }
    }
}

impl Error for SchemaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Catalog { source, .. } => Some(source),
            Self::MissingMainTable => None,
        }
    }
}

/// Table name → column names in declared order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SchemaMap {
    tables: BTreeMap<String, Vec<String>>,
}

impl SchemaMap {
    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.tables
            .get(table)
            .is_some_and(|columns| columns.iter().any(|name| name == column))
    }

    pub fn columns(&self, table: &str) -> Option<&[String]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.tables
            .iter()
            .map(|(table, columns)| (table.as_str(), columns.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl FromIterator<(String, Vec<String>)> for SchemaMap {
    fn from_iter<T: IntoIterator<Item = (String, Vec<String>)>>(iter: T) -> Self {
        Self {
            tables: iter.into_iter().collect(),
        }
    }
}

/// Probes `conn` for every record table and its columns.
pub fn probe_schema(conn: &Connection) -> SchemaResult<SchemaMap> {
    let started_at = Instant::now();
    let result = probe_tables(conn);
    match &result {
        Ok(map) => info!(
            "event=schema_probe module=schema status=ok tables={} duration_ms={}",
            map.len(),
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=schema_probe module=schema status=error duration_ms={} error={}",
            started_at.elapsed().as_millis(),
            err
        ),
    }
    result
}

fn probe_tables(conn: &Connection) -> SchemaResult<SchemaMap> {
    let table_names = list_tables(conn).map_err(|source| SchemaError::Catalog {
        table: None,
        source,
    })?;
    if !table_names.iter().any(|name| name == "eprint") {
        return Err(SchemaError::MissingMainTable);
    }

    let mut tables = BTreeMap::new();
    for table in table_names {
        let columns = list_columns(conn, &table).map_err(|source| SchemaError::Catalog {
            table: Some(table.clone()),
            source,
        })?;
        tables.insert(table, columns);
    }
    Ok(SchemaMap { tables })
}

fn list_tables(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let filter = TABLE_NAME_PATTERNS
        .iter()
        .map(|_| "name LIKE ?")
        .collect::<Vec<_>>()
        .join(" OR ");
    let sql = format!(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND ({filter}) ORDER BY name"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(TABLE_NAME_PATTERNS.iter()), |row| {
        row.get::<_, String>(0)
    })?;
    rows.collect()
}

fn list_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
    let rows = stmt.query_map([table], |row| row.get::<_, String>(0))?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::{probe_schema, SchemaError};
    use crate::db::bootstrap::{install_schema, CORE_SCHEMA};
    use crate::db::open_db_in_memory;

    #[test]
    fn probe_lists_record_tables_with_declared_column_order() {
        let mut conn = open_db_in_memory().expect("in-memory db");
        install_schema(&mut conn, CORE_SCHEMA).expect("schema should install");
        conn.execute_batch("CREATE TABLE user (userid INTEGER);")
            .expect("unrelated table");

        let map = probe_schema(&conn).expect("probe should succeed");
        assert!(map.has_table("eprint"));
        assert!(map.has_table("document"));
        assert!(map.has_table("file"));
        assert!(!map.has_table("user"));
        assert_eq!(
            map.columns("eprint_creators_name").expect("creators table"),
            &[
                "eprintid",
                "pos",
                "creators_name_honourific",
                "creators_name_given",
                "creators_name_family",
                "creators_name_lineage",
            ]
        );
        assert!(map.has_column("eprint", "doi"));
        assert!(!map.has_column("eprint", "favourite_colour"));
    }

    #[test]
    fn probe_without_main_table_fails() {
        let conn = open_db_in_memory().expect("in-memory db");
        conn.execute_batch("CREATE TABLE document (docid INTEGER);")
            .expect("table");
        let err = probe_schema(&conn).expect_err("missing eprint must fail");
        assert!(matches!(err, SchemaError::MissingMainTable));
    }

    #[test]
    fn schema_map_serializes_as_table_object() {
        let conn = open_db_in_memory().expect("in-memory db");
        conn.execute_batch("CREATE TABLE eprint (eprintid INTEGER, title TEXT);")
            .expect("table");
        let map = probe_schema(&conn).expect("probe should succeed");
        let json = serde_json::to_string(&map).expect("map should serialize");
        assert_eq!(json, r#"{"eprint":["eprintid","title"]}"#);
    }
}
