//! Reference schema for new SQLite repositories.
//!
//! # Responsibility
//! - Register the reference DDL as ordered parts.
//! - Install pending parts atomically.
//!
//! # Invariants
//! - Parts only ever append; their order never changes.
//! - The number of installed parts is mirrored to `PRAGMA user_version`.
//! - Every part is idempotent (`IF NOT EXISTS`).

use crate::db::DbResult;
use log::info;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
pub struct SchemaPart {
    pub name: &'static str,
    pub sql: &'static str,
}

const EPRINT_PART: SchemaPart = SchemaPart {
    name: "eprint",
    sql: include_str!("0001_eprint.sql"),
};
const PEOPLE_PART: SchemaPart = SchemaPart {
    name: "people",
    sql: include_str!("0002_people.sql"),
};
const ATTRIBUTES_PART: SchemaPart = SchemaPart {
    name: "attributes",
    sql: include_str!("0003_attributes.sql"),
};
const DOCUMENTS_PART: SchemaPart = SchemaPart {
    name: "documents",
    sql: include_str!("0004_documents.sql"),
};
const EXTENSIONS_PART: SchemaPart = SchemaPart {
    name: "extensions",
    sql: include_str!("0005_extensions.sql"),
};

/// Tables every repository is expected to carry.
pub const CORE_SCHEMA: &[SchemaPart] = &[EPRINT_PART, PEOPLE_PART, ATTRIBUTES_PART, DOCUMENTS_PART];

/// Core tables plus the optional ORCID and patent extensions.
pub const REFERENCE_SCHEMA: &[SchemaPart] = &[
    EPRINT_PART,
    PEOPLE_PART,
    ATTRIBUTES_PART,
    DOCUMENTS_PART,
    EXTENSIONS_PART,
];

/// Applies every part of `parts` beyond the installed count.
pub fn install_schema(conn: &mut Connection, parts: &[SchemaPart]) -> DbResult<()> {
    let installed = installed_parts(conn)?;
    if installed >= parts.len() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (index, part) in parts.iter().enumerate().skip(installed) {
        tx.execute_batch(part.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", index + 1))?;
        info!(
            "event=schema_install module=db status=ok part={} version={}",
            part.name,
            index + 1
        );
    }
    tx.commit()?;
    Ok(())
}

/// Number of reference parts recorded in `PRAGMA user_version`.
pub fn installed_parts(conn: &Connection) -> DbResult<usize> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version as usize)
}
