//! Create or replace the full row set of one record.
//!
//! # Responsibility
//! - Allocate ids and storage directories for new records.
//! - Apply repository import defaults and write-time timestamps.
//! - Rewrite the main row, every auxiliary list table and the documents.
//!
//! # Invariants
//! - All statements for one record run in a single transaction.
//! - Auxiliary rows of the record are deleted before reinsertion, so stale
//!   entries never survive a replace.
//! - Auxiliary columns map by suffix; an unmappable column aborts the write.

use crate::assemble::{layout_for_table, ListLayout};
use crate::binder::{self, BindError};
use crate::config::ImportDefaults;
use crate::db::DbError;
use crate::model::{DateParts, Document, File, Item, Record};
use crate::schema::SchemaMap;
use chrono::{Local, NaiveDateTime};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Transaction};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const STORAGE_DISK: &str = "disk0";
const NAME_PARTS: &[&str] = &["honourific", "given", "family", "lineage"];
const TIMESTAMP_PARTS: &[&str] = &["year", "month", "day", "hour", "minute", "second"];

static TAG_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"<[^>]*>").ok());

pub type WriteResult<T> = Result<T, WriteError>;

#[derive(Debug)]
pub enum WriteError {
    UnmappedColumn { table: String, column: String },
    Bind(BindError),
    Db(DbError),
}

impl Display for WriteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnmappedColumn { table, column } => {
                write!(f, "cannot map column {table}.{column} to a record field")
            }
            Self::Bind(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for WriteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnmappedColumn { .. } => None,
            Self::Bind(err) => Some(err),
            Self::Db(err) => Some(err),
        }
    }
}

impl From<BindError> for WriteError {
    fn from(value: BindError) -> Self {
        Self::Bind(value)
    }
}

impl From<DbError> for WriteError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for WriteError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// `disk0/` followed by the two-digit pairtree of the zero-padded id.
pub fn storage_dir(eprintid: i64) -> String {
    let padded = format!("{eprintid:08}");
    let segments = padded
        .as_bytes()
        .chunks(2)
        .map(|pair| String::from_utf8_lossy(pair).into_owned())
        .collect::<Vec<_>>();
    format!("{STORAGE_DISK}/{}", segments.join("/"))
}

/// Removes markup tags, keeping the enclosed text.
pub fn strip_tags(src: &str) -> String {
    match TAG_PATTERN.as_ref() {
        Some(pattern) => pattern.replace_all(src, "").trim().to_string(),
        None => src.to_string(),
    }
}

/// Writes `record` and returns its id.
///
/// Id 0 creates a new record; any other id replaces that record's rows.
///
/// # Errors
/// - `Bind` when the main, document or file table has an unknown column.
/// - `UnmappedColumn` when an auxiliary table column has no item field.
/// - `Db` for any SQL failure; the transaction is rolled back.
pub fn write_record(
    conn: &mut Connection,
    schema: &SchemaMap,
    defaults: &ImportDefaults,
    mut record: Record,
) -> WriteResult<i64> {
    let started_at = Instant::now();
    let tx = conn.transaction()?;
    let mode = if record.eprintid == 0 { "create" } else { "replace" };

    if record.eprintid == 0 {
        record.eprintid = next_id(&tx, "eprint", "eprintid")?;
    }
    if record.dir.trim().is_empty() {
        record.dir = storage_dir(record.eprintid);
    }
    stamp_times(&mut record, Local::now().naive_local());
    apply_defaults(&mut record, defaults);
    record.derive_split_dates();

    write_main_row(&tx, schema, &record)?;
    for (table, columns) in schema.tables() {
        if table == "eprint" || table.starts_with("document") || table.starts_with("file") {
            continue;
        }
        match layout_for_table(table) {
            Some(layout) => write_list_table(&tx, table, columns, layout, &record)?,
            None => warn!(
                "event=record_write module=write status=skip table={} eprintid={}",
                table, record.eprintid
            ),
        }
    }
    write_documents(&tx, schema, &record)?;
    tx.commit()?;

    info!(
        "event=record_write module=write status=ok mode={} eprintid={} duration_ms={}",
        mode,
        record.eprintid,
        started_at.elapsed().as_millis()
    );
    Ok(record.eprintid)
}

fn next_id(tx: &Transaction<'_>, table: &str, column: &str) -> rusqlite::Result<i64> {
    tx.query_row(
        &format!("SELECT IFNULL(MAX({column}), 0) + 1 FROM {table}"),
        [],
        |row| row.get(0),
    )
}

fn stamp_times(record: &mut Record, now: NaiveDateTime) {
    let now_parts = DateParts::from_datetime(now);
    record.datestamp_parts = if record.datestamp.trim().is_empty() {
        now_parts
    } else {
        DateParts::from_timestamp(&record.datestamp).unwrap_or(now_parts)
    };
    record.lastmod_parts = now_parts;
    record.status_changed_parts = now_parts;
    record.datestamp = record.datestamp_parts.timestamp();
    record.lastmod = now_parts.timestamp();
    record.status_changed = now_parts.timestamp();
}

fn apply_defaults(record: &mut Record, defaults: &ImportDefaults) {
    let fill = |slot: &mut String, value: &str| {
        if slot.trim().is_empty() && !value.is_empty() {
            *slot = value.to_string();
        }
    };
    fill(&mut record.collection, &defaults.default_collection);
    fill(&mut record.official_url, &defaults.default_official_url);
    fill(&mut record.rights, &defaults.default_rights);
    fill(&mut record.eprint_status, &defaults.default_status);
    if record.kind == "article" {
        fill(&mut record.refereed, &defaults.default_refereed);
    }
    if defaults.strip_tags && !record.abstract_text.is_empty() {
        record.abstract_text = strip_tags(&record.abstract_text);
    }
}

fn insert_statement(verb: &str, table: &str, columns: &[&str]) -> String {
    let placeholders = (1..=columns.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{verb} INTO {table} ({}) VALUES ({placeholders})", columns.join(", "))
}

fn write_main_row(tx: &Transaction<'_>, schema: &SchemaMap, record: &Record) -> WriteResult<()> {
    let columns = schema.columns("eprint").unwrap_or_default();
    let bound = binder::EPRINT.bind(columns)?;
    let names = bound.iter().map(|column| column.name).collect::<Vec<_>>();
    tx.execute(
        &insert_statement("REPLACE", "eprint", &names),
        params_from_iter(binder::values_for(record, &bound)),
    )?;
    Ok(())
}

fn write_list_table(
    tx: &Transaction<'_>,
    table: &str,
    columns: &[String],
    layout: &ListLayout,
    record: &Record,
) -> WriteResult<()> {
    tx.execute(&format!("DELETE FROM {table} WHERE eprintid = ?1"), [record.eprintid])?;
    let Some(list) = record.item_list(layout.list) else {
        return Ok(());
    };
    if list.is_empty() {
        return Ok(());
    }

    let names = columns.iter().map(String::as_str).collect::<Vec<_>>();
    let sql = insert_statement("INSERT", table, &names);
    for (pos, item) in list.iter().enumerate() {
        let mut values = Vec::with_capacity(columns.len());
        let mut carries_value = false;
        for column in columns {
            let value = item_column_value(table, column, layout, record.eprintid, pos as i64, item)?;
            if !matches!(column.as_str(), "eprintid" | "pos") && value != Value::Null {
                carries_value = true;
            }
            values.push(value);
        }
        if carries_value {
            tx.execute(&sql, params_from_iter(values))?;
        }
    }
    Ok(())
}

fn text(value: &str) -> Value {
    let value = value.trim();
    if value.is_empty() {
        Value::Null
    } else {
        Value::Text(value.to_string())
    }
}

fn integer(value: i64) -> Value {
    if value == 0 {
        Value::Null
    } else {
        Value::Integer(value)
    }
}

/// Value of one auxiliary column, matched by its suffix after `<list>_`.
fn item_column_value(
    table: &str,
    column: &str,
    layout: &ListLayout,
    eprintid: i64,
    pos: i64,
    item: &Item,
) -> WriteResult<Value> {
    let unmapped = || WriteError::UnmappedColumn {
        table: table.to_string(),
        column: column.to_string(),
    };
    match column {
        "eprintid" => return Ok(Value::Integer(eprintid)),
        "pos" => return Ok(Value::Integer(pos)),
        _ => {}
    }
    if column == layout.list {
        return Ok(text(&item.value));
    }
    let suffix = column
        .strip_prefix(layout.list)
        .and_then(|rest| rest.strip_prefix('_'))
        .ok_or_else(unmapped)?;

    if let Some(part) = suffix.strip_prefix("name_") {
        if NAME_PARTS.contains(&part) {
            let name = item.name.as_ref();
            let value = match part {
                "honourific" => name.map_or("", |name| name.honourific.as_str()),
                "given" => name.map_or("", |name| name.given.as_str()),
                "family" => name.map_or("", |name| name.family.as_str()),
                _ => name.map_or("", |name| name.lineage.as_str()),
            };
            return Ok(text(value));
        }
    }
    if suffix == "name" {
        return Ok(text(item.name.as_ref().map_or("", |name| name.value.as_str())));
    }
    if let Some(part) = suffix.strip_prefix("timestamp_") {
        if TIMESTAMP_PARTS.contains(&part) {
            let parts = DateParts::from_timestamp(&item.timestamp).unwrap_or_default();
            let value = match part {
                "year" => parts.year,
                "month" => parts.month,
                "day" => parts.day,
                "hour" => parts.hour,
                "minute" => parts.minute,
                _ => parts.second,
            };
            return Ok(integer(value));
        }
    }
    item.attribute(suffix).map(text).ok_or_else(unmapped)
}

fn write_documents(tx: &Transaction<'_>, schema: &SchemaMap, record: &Record) -> WriteResult<()> {
    let Some(document_columns) = schema.columns("document") else {
        return Ok(());
    };
    let has_files = schema.has_table("file");
    let has_relations =
        schema.has_table("document_relation_type") && schema.has_table("document_relation_uri");

    let owned = "SELECT docid FROM document WHERE eprintid = ?1";
    if has_files {
        tx.execute(
            &format!("DELETE FROM file WHERE datasetid = 'document' AND objectid IN ({owned})"),
            [record.eprintid],
        )?;
    }
    if has_relations {
        for table in ["document_relation_type", "document_relation_uri"] {
            tx.execute(
                &format!("DELETE FROM {table} WHERE docid IN ({owned})"),
                [record.eprintid],
            )?;
        }
    }
    tx.execute("DELETE FROM document WHERE eprintid = ?1", [record.eprintid])?;

    let document_bound = binder::DOCUMENT.bind(document_columns)?;
    let document_names = document_bound.iter().map(|column| column.name).collect::<Vec<_>>();
    let document_sql = insert_statement("INSERT", "document", &document_names);
    let file_bound = match schema.columns("file") {
        Some(columns) => binder::FILE.bind(columns)?,
        None => Vec::new(),
    };
    let file_names = file_bound.iter().map(|column| column.name).collect::<Vec<_>>();
    let file_sql = insert_statement("INSERT", "file", &file_names);

    for (index, source) in record.documents.iter().enumerate() {
        let mut document: Document = source.clone();
        if document.docid == 0 {
            document.docid = next_id(tx, "document", "docid")?;
        }
        document.eprintid = record.eprintid;
        if document.pos == 0 {
            document.pos = index as i64 + 1;
        }
        if !document.date_embargo.is_empty() {
            document.date_embargo_parts = DateParts::from_approx(&document.date_embargo);
        }
        tx.execute(
            &document_sql,
            params_from_iter(binder::values_for(&document, &document_bound)),
        )?;

        if has_files {
            for source in &document.files {
                let mut file: File = source.clone();
                if file.fileid == 0 {
                    file.fileid = next_id(tx, "file", "fileid")?;
                }
                file.datasetid = "document".to_string();
                file.objectid = document.docid;
                if let Some(parts) = DateParts::from_timestamp(&file.mtime) {
                    file.mtime_parts = parts;
                }
                tx.execute(&file_sql, params_from_iter(binder::values_for(&file, &file_bound)))?;
            }
        }

        if has_relations {
            for (pos, relation) in document.relation.iter().enumerate() {
                tx.execute(
                    "INSERT INTO document_relation_type (docid, pos, relation_type) VALUES (?1, ?2, ?3)",
                    params![document.docid, pos as i64, relation.kind],
                )?;
                tx.execute(
                    "INSERT INTO document_relation_uri (docid, pos, relation_uri) VALUES (?1, ?2, ?3)",
                    params![document.docid, pos as i64, relation.uri],
                )?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{storage_dir, strip_tags, write_record, WriteError};
    use crate::assemble::read_record;
    use crate::config::ImportDefaults;
    use crate::db::bootstrap::{install_schema, REFERENCE_SCHEMA};
    use crate::db::open_db_in_memory;
    use crate::model::{Document, File, Item, Name, Record};
    use crate::schema::probe_schema;
    use rusqlite::Connection;

    const BASE: &str = "https://authors.example.edu";

    fn reference_db() -> Connection {
        let mut conn = open_db_in_memory().expect("in-memory db");
        install_schema(&mut conn, REFERENCE_SCHEMA).expect("schema should install");
        conn
    }

    fn creator(family: &str, given: &str, orcid: &str) -> Item {
        Item {
            name: Name::person("", given, family, ""),
            orcid: orcid.to_string(),
            ..Item::default()
        }
    }

    fn defaults() -> ImportDefaults {
        ImportDefaults {
            default_collection: "CaltechAUTHORS".to_string(),
            default_rights: "No commercial reproduction".to_string(),
            default_refereed: "TRUE".to_string(),
            default_status: "inbox".to_string(),
            strip_tags: true,
            ..ImportDefaults::default()
        }
    }

    #[test]
    fn storage_dir_is_a_pairtree_of_the_padded_id() {
        assert_eq!(storage_dir(123), "disk0/00/00/01/23");
        assert_eq!(storage_dir(98765432), "disk0/98/76/54/32");
    }

    #[test]
    fn strip_tags_keeps_text() {
        assert_eq!(strip_tags("<p>Hot <i>jets</i></p> "), "Hot jets");
    }

    #[test]
    fn create_allocates_id_and_applies_defaults() {
        let mut conn = reference_db();
        conn.execute_batch("INSERT INTO eprint (eprintid, title) VALUES (41, 'Existing');")
            .expect("existing row");
        let schema = probe_schema(&conn).expect("probe");

        let mut record = Record {
            kind: "article".to_string(),
            title: "Fresh".to_string(),
            abstract_text: "<p>Plain</p>".to_string(),
            date: "2020-02".to_string(),
            date_type: "published".to_string(),
            ..Record::default()
        };
        record.creators.push(creator("Lovelace", "Ada", "0000-0001"));
        record.creators.push(creator("Hopper", "Grace", ""));

        let id = write_record(&mut conn, &schema, &defaults(), record).expect("write");
        assert_eq!(id, 42);

        let stored = read_record(&conn, &schema, BASE, id).expect("read back");
        assert_eq!(stored.dir, "disk0/00/00/00/42");
        assert_eq!(stored.collection, "CaltechAUTHORS");
        assert_eq!(stored.eprint_status, "inbox");
        assert_eq!(stored.refereed, "TRUE");
        assert_eq!(stored.abstract_text, "Plain");
        assert_eq!(stored.date, "2020-02");
        assert!(!stored.datestamp.is_empty());
        assert_eq!(stored.lastmod, stored.status_changed);
        assert_eq!(stored.creators.len(), 2);
        assert_eq!(stored.creators.items[0].orcid, "0000-0001");
        assert_eq!(stored.creators.items[1].family_name(), "Hopper");

        let orcid_rows: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM eprint_creators_orcid WHERE eprintid = ?1",
                [id],
                |row| row.get(0),
            )
            .expect("count");
        assert_eq!(orcid_rows, 1);
    }

    #[test]
    fn replace_drops_stale_list_rows_and_keeps_supplied_datestamp() {
        let mut conn = reference_db();
        let schema = probe_schema(&conn).expect("probe");

        let mut first = Record {
            title: "Draft".to_string(),
            datestamp: "2019-01-02 03:04:05".to_string(),
            ..Record::default()
        };
        first.creators.push(creator("Lovelace", "Ada", ""));
        first.creators.push(creator("Babbage", "Charles", ""));
        first.local_group.push(Item::with_value("JPL"));
        let id = write_record(&mut conn, &schema, &ImportDefaults::default(), first)
            .expect("create");

        let mut second = read_record(&conn, &schema, BASE, id).expect("read");
        assert_eq!(second.datestamp, "2019-01-02 03:04:05");
        second.title = "Final".to_string();
        second.creators.items.truncate(1);
        second.local_group.items.clear();
        let replaced = write_record(&mut conn, &schema, &ImportDefaults::default(), second)
            .expect("replace");
        assert_eq!(replaced, id);

        let stored = read_record(&conn, &schema, BASE, id).expect("read back");
        assert_eq!(stored.title, "Final");
        assert_eq!(stored.datestamp, "2019-01-02 03:04:05");
        assert_eq!(stored.creators.len(), 1);
        assert!(stored.local_group.is_empty());
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM eprint", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 1);
    }

    #[test]
    fn writes_issues_organisations_and_documents() {
        let mut conn = reference_db();
        let schema = probe_schema(&conn).expect("probe");

        let mut record = Record::default();
        record.corp_creators.push(Item {
            name: Name::organisation("GALCIT"),
            ror: "https://ror.org/05dxps055".to_string(),
            ..Item::default()
        });
        record.item_issues.push(Item {
            timestamp: "2021-03-04 05:06:07".to_string(),
            kind: "duplicate".to_string(),
            comment: "checked".to_string(),
            resolved_by: "42".to_string(),
            ..Item::default()
        });
        record.documents.push(Document {
            format: "application/pdf".to_string(),
            main: "paper.pdf".to_string(),
            date_embargo: "2030-01".to_string(),
            files: vec![File {
                filename: "paper.pdf".to_string(),
                hash: "abc".to_string(),
                hash_type: "MD5".to_string(),
                filesize: 10,
                ..File::default()
            }],
            ..Document::default()
        });

        let id = write_record(&mut conn, &schema, &ImportDefaults::default(), record)
            .expect("write");
        let stored = read_record(&conn, &schema, BASE, id).expect("read back");

        let corp = &stored.corp_creators.items[0];
        assert_eq!(corp.name.as_ref().map(|name| name.value.as_str()), Some("GALCIT"));
        assert_eq!(corp.ror, "https://ror.org/05dxps055");
        let issue = &stored.item_issues.items[0];
        assert_eq!(issue.timestamp, "2021-03-04 05:06:07");
        assert_eq!(issue.comment, "checked");
        assert_eq!(issue.resolved_by, "42");

        assert_eq!(stored.documents.len(), 1);
        let document = &stored.documents[0];
        assert_eq!(document.pos, 1);
        assert_eq!(document.date_embargo, "2030-01");
        assert_eq!(document.files.len(), 1);
        assert_eq!(
            document.files[0].url,
            format!("{BASE}/{id}/1/paper.pdf")
        );
    }

    #[test]
    fn replaced_document_relations_keep_their_url() {
        let mut conn = reference_db();
        conn.execute_batch(
            "INSERT INTO eprint (eprintid, title) VALUES (7, 'Versions');
             INSERT INTO document (docid, eprintid, pos, main) VALUES (30, 7, 1, 'v2.pdf');
             INSERT INTO document_relation_type VALUES (30, 0, 'isVersionOf');
             INSERT INTO document_relation_uri VALUES (30, 0, '/id/document/29');",
        )
        .expect("fixture rows");
        let schema = probe_schema(&conn).expect("probe");
        let expected = format!("{BASE}/id/document/29");

        let before = read_record(&conn, &schema, BASE, 7).expect("read");
        assert_eq!(before.documents[0].relation.items[0].uri, expected);

        write_record(&mut conn, &schema, &ImportDefaults::default(), before).expect("replace");
        let after = read_record(&conn, &schema, BASE, 7).expect("read back");
        assert_eq!(after.documents[0].relation.items[0].kind, "isVersionOf");
        assert_eq!(after.documents[0].relation.items[0].uri, expected);

        let again = read_record(&conn, &schema, BASE, 7).expect("read again");
        write_record(&mut conn, &schema, &ImportDefaults::default(), again).expect("replace twice");
        let last = read_record(&conn, &schema, BASE, 7).expect("read last");
        assert_eq!(last.documents[0].relation.items[0].uri, expected);
    }

    #[test]
    fn unmapped_auxiliary_column_aborts_the_write() {
        let mut conn = reference_db();
        conn.execute_batch(
            "CREATE TABLE eprint_funders_colour (eprintid INTEGER, pos INTEGER, funders_colour TEXT);",
        )
        .expect("extra table");
        let schema = probe_schema(&conn).expect("probe");

        let mut record = Record::default();
        record.funders.push(Item {
            agency: "NSF".to_string(),
            ..Item::default()
        });
        let err = write_record(&mut conn, &schema, &ImportDefaults::default(), record)
            .expect_err("unmapped column must fail");
        assert!(matches!(err, WriteError::UnmappedColumn { ref column, .. } if column == "funders_colour"));

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM eprint", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 0);
    }
}
