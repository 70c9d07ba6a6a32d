//! Full record read: scalar row, ordered item lists and documents.
//!
//! # Responsibility
//! - Bind the main row through the `eprint` registry.
//! - Merge auxiliary attribute tables into item lists by position.
//! - Attach documents, their files and relations.
//!
//! # Invariants
//! - Entries are keyed by stored `pos`; gaps or missing rows in one table
//!   never shift entries read from another table.
//! - A failing auxiliary table is logged and skipped; the main row is not.
//!
//! # See also
//! - `binder` for the scalar column registries.

use crate::binder::{self, BindError};
use crate::db::DbError;
use crate::model::{DateParts, Document, File, Item, ItemList, Name, Record};
use crate::schema::SchemaMap;
use log::{error, warn};
use rusqlite::{Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type AssembleResult<T> = Result<T, AssembleError>;

#[derive(Debug)]
pub enum AssembleError {
    NotFound(i64),
    Bind(BindError),
    Db(DbError),
}

impl Display for AssembleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "eprint not found: {id}"),
            Self::Bind(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AssembleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotFound(_) => None,
            Self::Bind(err) => Some(err),
            Self::Db(err) => Some(err),
        }
    }
}

impl From<BindError> for AssembleError {
    fn from(value: BindError) -> Self {
        Self::Bind(value)
    }
}

impl From<DbError> for AssembleError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for AssembleError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// The leading table of an item list, if it has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListHead {
    /// `eprint_<list>_name` with honourific/given/family/lineage columns.
    PersonName,
    /// `eprint_<list>_name` with one organisation name column.
    OrganisationName,
    /// `eprint_<list>` with one value column named `<list>`.
    Value,
    /// `eprint_<list>_timestamp` split across six date part columns.
    Timestamp,
    /// Attribute tables only.
    Attributes,
}

/// Storage layout of one item list.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ListLayout {
    pub list: &'static str,
    pub head: ListHead,
    /// Attribute suffixes, each stored in `eprint_<list>_<suffix>`.
    pub suffixes: &'static [&'static str],
}

const PERSON_SUFFIXES: &[&str] = &[
    "id",
    "orcid",
    "uri",
    "url",
    "role",
    "email",
    "show_email",
    "type",
];
const ORGANISATION_SUFFIXES: &[&str] = &["id", "ror", "uri"];

const fn person(list: &'static str) -> ListLayout {
    ListLayout {
        list,
        head: ListHead::PersonName,
        suffixes: PERSON_SUFFIXES,
    }
}

const fn organisation(list: &'static str) -> ListLayout {
    ListLayout {
        list,
        head: ListHead::OrganisationName,
        suffixes: ORGANISATION_SUFFIXES,
    }
}

const fn values(list: &'static str) -> ListLayout {
    ListLayout {
        list,
        head: ListHead::Value,
        suffixes: &[],
    }
}

pub(crate) const ITEM_LISTS: &[ListLayout] = &[
    person("creators"),
    person("editors"),
    person("contributors"),
    person("thesis_advisor"),
    person("thesis_committee"),
    person("exhibitors"),
    person("producers"),
    person("conductors"),
    person("lyricists"),
    organisation("corp_creators"),
    organisation("corp_contributors"),
    organisation("conf_creators"),
    ListLayout {
        list: "funders",
        head: ListHead::Attributes,
        suffixes: &["agency", "grant_number", "ror"],
    },
    ListLayout {
        list: "related_url",
        head: ListHead::Attributes,
        suffixes: &["url", "type", "description"],
    },
    ListLayout {
        list: "other_numbering_system",
        head: ListHead::OrganisationName,
        suffixes: &["id"],
    },
    ListLayout {
        list: "item_issues",
        head: ListHead::Timestamp,
        suffixes: &[
            "type",
            "status",
            "description",
            "id",
            "resolved_by",
            "reported_by",
            "comment",
        ],
    },
    values("local_group"),
    values("referencetext"),
    values("projects"),
    values("subjects"),
    values("accompaniment"),
    values("skill_areas"),
    values("copyright_holders"),
    values("reference"),
    values("alt_title"),
    values("patent_assignee"),
    values("related_patents"),
    values("divisions"),
    values("option_major"),
    values("option_minor"),
];

/// Item list layout owning an auxiliary table, by longest list-name match.
pub(crate) fn layout_for_table(table: &str) -> Option<&'static ListLayout> {
    let rest = table.strip_prefix("eprint_")?;
    ITEM_LISTS
        .iter()
        .filter(|layout| {
            rest == layout.list
                || rest
                    .strip_prefix(layout.list)
                    .is_some_and(|tail| tail.starts_with('_'))
        })
        .max_by_key(|layout| layout.list.len())
}

/// Reads one complete record.
///
/// # Errors
/// - `NotFound` for id 0 or when no main row exists.
/// - `Bind` when the main table carries a column without a binding.
/// - `Db` when the main row query fails.
pub fn read_record(
    conn: &Connection,
    schema: &SchemaMap,
    base_url: &str,
    eprintid: i64,
) -> AssembleResult<Record> {
    if eprintid <= 0 {
        return Err(AssembleError::NotFound(eprintid));
    }
    let columns = schema
        .columns("eprint")
        .ok_or(AssembleError::NotFound(eprintid))?;
    let bound = binder::EPRINT.bind(columns)?;
    let sql = format!(
        "SELECT {} FROM eprint WHERE eprintid = ?1 LIMIT 1",
        binder::select_list(&bound)
    );

    let mut record = Record::default();
    let found = conn
        .query_row(&sql, [eprintid], |row| {
            binder::apply_row(&mut record, &bound, row)
        })
        .optional()?;
    if found.is_none() {
        return Err(AssembleError::NotFound(eprintid));
    }

    record.id = format!("{base_url}/id/eprint/{}", record.eprintid);
    record.derive_composite_dates();

    for layout in ITEM_LISTS {
        let list = read_item_list(conn, schema, eprintid, layout);
        if let Some(slot) = record.item_list_mut(layout.list) {
            *slot = list;
        }
    }
    record.documents = read_documents(conn, schema, base_url, eprintid);
    Ok(record)
}

fn read_item_list(
    conn: &Connection,
    schema: &SchemaMap,
    eprintid: i64,
    layout: &ListLayout,
) -> ItemList {
    let mut entries: BTreeMap<i64, Item> = BTreeMap::new();
    let list = layout.list;

    match layout.head {
        ListHead::PersonName => {
            let table = format!("eprint_{list}_name");
            let prefix = format!("{list}_name");
            let select = format!(
                "IFNULL({prefix}_honourific, ''), IFNULL({prefix}_given, ''), \
                 IFNULL({prefix}_family, ''), IFNULL({prefix}_lineage, '')"
            );
            merge_table(conn, schema, eprintid, &table, &select, &mut entries, |item, row| {
                let honourific: String = row.get(1)?;
                let given: String = row.get(2)?;
                let family: String = row.get(3)?;
                let lineage: String = row.get(4)?;
                item.name = Name::person(&honourific, &given, &family, &lineage);
                Ok(item.name.is_some())
            });
        }
        ListHead::OrganisationName => {
            let table = format!("eprint_{list}_name");
            let select = format!("IFNULL({list}_name, '')");
            merge_table(conn, schema, eprintid, &table, &select, &mut entries, |item, row| {
                let value: String = row.get(1)?;
                item.name = Name::organisation(&value);
                Ok(item.name.is_some())
            });
        }
        ListHead::Value => {
            let table = format!("eprint_{list}");
            let select = format!("IFNULL({list}, '')");
            merge_table(conn, schema, eprintid, &table, &select, &mut entries, |item, row| {
                let value: String = row.get(1)?;
                item.value = value.trim().to_string();
                Ok(!item.value.is_empty())
            });
        }
        ListHead::Timestamp => {
            let table = format!("eprint_{list}_timestamp");
            let prefix = format!("{list}_timestamp");
            let select = ["year", "month", "day", "hour", "minute", "second"]
                .iter()
                .map(|part| format!("IFNULL({prefix}_{part}, 0)"))
                .collect::<Vec<_>>()
                .join(", ");
            merge_table(conn, schema, eprintid, &table, &select, &mut entries, |item, row| {
                let parts = DateParts {
                    year: row.get(1)?,
                    month: row.get(2)?,
                    day: row.get(3)?,
                    hour: row.get(4)?,
                    minute: row.get(5)?,
                    second: row.get(6)?,
                };
                item.timestamp = parts.timestamp();
                Ok(!item.timestamp.is_empty())
            });
        }
        ListHead::Attributes => {}
    }

    for suffix in layout.suffixes {
        let table = format!("eprint_{list}_{suffix}");
        let select = format!("IFNULL({list}_{suffix}, '')");
        merge_table(conn, schema, eprintid, &table, &select, &mut entries, |item, row| {
            let value: String = row.get(1)?;
            if value.trim().is_empty() {
                return Ok(false);
            }
            Ok(item.set_attribute(suffix, &value))
        });
    }

    entries.into_values().collect()
}

/// Reads `pos` plus `select` from one auxiliary table and merges each row
/// into the entry at that position. `apply` reports whether the row
/// carried a value; empty rows never create entries.
fn merge_table(
    conn: &Connection,
    schema: &SchemaMap,
    eprintid: i64,
    table: &str,
    select: &str,
    entries: &mut BTreeMap<i64, Item>,
    apply: impl Fn(&mut Item, &Row<'_>) -> rusqlite::Result<bool>,
) {
    if !schema.has_table(table) {
        return;
    }
    let sql = format!("SELECT pos, {select} FROM {table} WHERE eprintid = ?1 ORDER BY eprintid, pos");
    let scanned = (|| -> rusqlite::Result<Vec<(i64, Item)>> {
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([eprintid])?;
        let mut scanned = Vec::new();
        while let Some(row) = rows.next()? {
            let pos: i64 = row.get(0)?;
            let mut item = entries.get(&pos).cloned().unwrap_or_default();
            if apply(&mut item, row)? {
                item.pos = pos;
                scanned.push((pos, item));
            }
        }
        Ok(scanned)
    })();

    match scanned {
        Ok(rows) => entries.extend(rows),
        Err(err) => error!(
            "event=sublist_read module=assemble status=error table={} eprintid={} error={}",
            table, eprintid, err
        ),
    }
}

fn read_documents(
    conn: &Connection,
    schema: &SchemaMap,
    base_url: &str,
    eprintid: i64,
) -> Vec<Document> {
    let Some(columns) = schema.columns("document") else {
        return Vec::new();
    };
    let result = (|| -> AssembleResult<Vec<Document>> {
        let bound = binder::DOCUMENT.bind(columns)?;
        let sql = format!(
            "SELECT {} FROM document WHERE eprintid = ?1 ORDER BY eprintid ASC, pos ASC, rev_number DESC",
            binder::select_list(&bound)
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([eprintid])?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            let mut document = Document::default();
            binder::apply_row(&mut document, &bound, row)?;
            documents.push(document);
        }
        Ok(documents)
    })();

    let mut documents = match result {
        Ok(documents) => documents,
        Err(err) => {
            error!(
                "event=sublist_read module=assemble status=error table=document eprintid={} error={}",
                eprintid, err
            );
            return Vec::new();
        }
    };

    for document in &mut documents {
        document.id = format!("{base_url}/id/document/{}", document.docid);
        document.date_embargo = document.date_embargo_parts.approx_date();
        document.files = read_files(conn, schema, base_url, eprintid, document);
        document.relation = read_relations(conn, schema, base_url, document.docid);
    }
    documents
}

fn read_files(
    conn: &Connection,
    schema: &SchemaMap,
    base_url: &str,
    eprintid: i64,
    document: &Document,
) -> Vec<File> {
    let Some(columns) = schema.columns("file") else {
        return Vec::new();
    };
    let result = (|| -> AssembleResult<Vec<File>> {
        let bound = binder::FILE.bind(columns)?;
        let sql = format!(
            "SELECT {} FROM file WHERE datasetid = 'document' AND objectid = ?1 ORDER BY fileid",
            binder::select_list(&bound)
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([document.docid])?;
        let mut files = Vec::new();
        while let Some(row) = rows.next()? {
            let mut file = File::default();
            binder::apply_row(&mut file, &bound, row)?;
            file.id = format!("{base_url}/id/file/{}", file.fileid);
            file.mtime = file.mtime_parts.timestamp();
            file.url = format!(
                "{base_url}/{eprintid}/{}/{}",
                document.pos, file.filename
            );
            files.push(file);
        }
        Ok(files)
    })();

    result.unwrap_or_else(|err| {
        error!(
            "event=sublist_read module=assemble status=error table=file eprintid={} docid={} error={}",
            eprintid, document.docid, err
        );
        Vec::new()
    })
}

/// Stored relation URIs are site-relative (`/id/document/29`) unless an
/// import wrote them back absolute.
fn relation_url(base_url: &str, relation_uri: &str) -> String {
    if relation_uri.starts_with('/') {
        format!("{base_url}{relation_uri}")
    } else {
        relation_uri.to_string()
    }
}

fn read_relations(
    conn: &Connection,
    schema: &SchemaMap,
    base_url: &str,
    docid: i64,
) -> ItemList {
    if !schema.has_table("document_relation_type") || !schema.has_table("document_relation_uri") {
        return ItemList::default();
    }
    let result = (|| -> rusqlite::Result<ItemList> {
        let mut stmt = conn.prepare(
            "SELECT t.pos, IFNULL(t.relation_type, ''), IFNULL(u.relation_uri, '')
             FROM document_relation_type t
             JOIN document_relation_uri u ON t.docid = u.docid AND t.pos = u.pos
             WHERE t.docid = ?1
             ORDER BY t.pos",
        )?;
        let rows = stmt.query_map([docid], |row| {
            let relation_uri: String = row.get(2)?;
            Ok(Item {
                pos: row.get(0)?,
                kind: row.get(1)?,
                uri: relation_url(base_url, &relation_uri),
                ..Item::default()
            })
        })?;
        rows.collect()
    })();

    result.unwrap_or_else(|err| {
        warn!(
            "event=sublist_read module=assemble status=error table=document_relation_type docid={} error={}",
            docid, err
        );
        ItemList::default()
    })
}
