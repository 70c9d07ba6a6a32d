//! Static column registries for the `eprint`, `document` and `file` tables.
//!
//! # Responsibility
//! - Map every legal column name to a typed accessor/setter pair.
//! - Build the scalar `SELECT` list and scan one row into a target value.
//! - Produce write-side values in probed column order.
//!
//! # Invariants
//! - Binding is total: a column without a registry entry is an error,
//!   never silently dropped.
//! - Registries are built once per process and are read-only afterwards.
//! - Zero integers and empty strings are written as SQL `NULL`.

use crate::model::{Document, File, Record};
use once_cell::sync::Lazy;
use rusqlite::types::Value;
use rusqlite::Row;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type BindResult<T> = Result<T, BindError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    UnknownColumn { table: String, column: String },
}

impl Display for BindError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownColumn { table, column } => {
                write!(f, "column {table}.{column} has no field binding")
            }
        }
    }
}

impl Error for BindError {}

/// Storage class of a bound column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Real,
}

impl ColumnKind {
    fn sql_type(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
        }
    }

    fn null_fallback(self) -> &'static str {
        match self {
            Self::Text => "''",
            Self::Integer => "0",
            Self::Real => "0.0",
        }
    }
}

/// Accessor/setter pair for one column of target type `T`.
pub struct ColumnBinding<T> {
    pub kind: ColumnKind,
    get: fn(&T) -> Value,
    set: fn(&mut T, Value),
}

/// A probed column resolved against its registry entry.
pub struct BoundColumn<T: 'static> {
    pub name: &'static str,
    binding: &'static ColumnBinding<T>,
}

impl<T> Clone for BoundColumn<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            binding: self.binding,
        }
    }
}

/// Column name → binding map for one table.
pub struct ColumnRegistry<T: 'static> {
    table: &'static str,
    bindings: HashMap<&'static str, ColumnBinding<T>>,
}

impl<T: 'static> ColumnRegistry<T> {
    fn new(table: &'static str, entries: Vec<(&'static str, ColumnBinding<T>)>) -> Self {
        Self {
            table,
            bindings: entries.into_iter().collect(),
        }
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn is_known(&self, column: &str) -> bool {
        self.bindings.contains_key(column)
    }

    pub fn kind_of(&self, column: &str) -> Option<ColumnKind> {
        self.bindings.get(column).map(|binding| binding.kind)
    }

    /// Resolves probed columns in their declared order.
    ///
    /// # Errors
    /// - `BindError::UnknownColumn` for the first column without a binding.
    pub fn bind(&'static self, columns: &[String]) -> BindResult<Vec<BoundColumn<T>>> {
        columns
            .iter()
            .map(|column| {
                self.bindings
                    .get_key_value(column.as_str())
                    .map(|(name, binding)| BoundColumn { name, binding })
                    .ok_or_else(|| BindError::UnknownColumn {
                        table: self.table.to_string(),
                        column: column.clone(),
                    })
            })
            .collect()
    }
}

/// `CAST(IFNULL(col, fallback) AS TYPE) AS col` for every bound column.
pub fn select_list<T>(bound: &[BoundColumn<T>]) -> String {
    bound
        .iter()
        .map(|column| {
            format!(
                "CAST(IFNULL({name}, {fallback}) AS {ty}) AS {name}",
                name = column.name,
                fallback = column.binding.kind.null_fallback(),
                ty = column.binding.kind.sql_type()
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Scans one row, selected with `select_list`, into `target`.
pub fn apply_row<T>(target: &mut T, bound: &[BoundColumn<T>], row: &Row<'_>) -> rusqlite::Result<()> {
    for (index, column) in bound.iter().enumerate() {
        let value: Value = row.get(index)?;
        (column.binding.set)(target, value);
    }
    Ok(())
}

/// Values of `source` in bound column order, ready for an `INSERT`.
pub fn values_for<T>(source: &T, bound: &[BoundColumn<T>]) -> Vec<Value> {
    bound
        .iter()
        .map(|column| (column.binding.get)(source))
        .collect()
}

/// Column kind lookup across all registries.
pub fn column_kind(table: &str, column: &str) -> Option<ColumnKind> {
    match table {
        "eprint" => EPRINT.kind_of(column),
        "document" => DOCUMENT.kind_of(column),
        "file" => FILE.kind_of(column),
        _ => None,
    }
}

fn text_value(value: &str) -> Value {
    if value.is_empty() {
        Value::Null
    } else {
        Value::Text(value.to_string())
    }
}

fn integer_value(value: i64) -> Value {
    if value == 0 {
        Value::Null
    } else {
        Value::Integer(value)
    }
}

fn real_value(value: f64) -> Value {
    if value == 0.0 {
        Value::Null
    } else {
        Value::Real(value)
    }
}

fn into_text(value: Value) -> String {
    match value {
        Value::Text(text) => text,
        Value::Integer(number) => number.to_string(),
        Value::Real(number) => number.to_string(),
        Value::Blob(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Value::Null => String::new(),
    }
}

fn into_integer(value: Value) -> i64 {
    match value {
        Value::Integer(number) => number,
        Value::Real(number) => number as i64,
        Value::Text(text) => text.trim().parse().unwrap_or(0),
        Value::Blob(_) | Value::Null => 0,
    }
}

fn into_real(value: Value) -> f64 {
    match value {
        Value::Real(number) => number,
        Value::Integer(number) => number as f64,
        Value::Text(text) => text.trim().parse().unwrap_or(0.0),
        Value::Blob(_) | Value::Null => 0.0,
    }
}

macro_rules! text {
    ($ty:ty, $($field:ident).+) => {
        ColumnBinding {
            kind: ColumnKind::Text,
            get: |target: &$ty| text_value(&target.$($field).+),
            set: |target: &mut $ty, value: Value| target.$($field).+ = into_text(value),
        }
    };
}

macro_rules! integer {
    ($ty:ty, $($field:ident).+) => {
        ColumnBinding {
            kind: ColumnKind::Integer,
            get: |target: &$ty| integer_value(target.$($field).+),
            set: |target: &mut $ty, value: Value| target.$($field).+ = into_integer(value),
        }
    };
}

macro_rules! real {
    ($ty:ty, $($field:ident).+) => {
        ColumnBinding {
            kind: ColumnKind::Real,
            get: |target: &$ty| real_value(target.$($field).+),
            set: |target: &mut $ty, value: Value| target.$($field).+ = into_real(value),
        }
    };
}

/// Registry for the main `eprint` table.
pub static EPRINT: Lazy<ColumnRegistry<Record>> = Lazy::new(|| {
    ColumnRegistry::new(
        "eprint",
        vec![
            ("eprintid", integer!(Record, eprintid)),
            ("rev_number", integer!(Record, rev_number)),
            ("eprint_status", text!(Record, eprint_status)),
            ("userid", integer!(Record, userid)),
            ("dir", text!(Record, dir)),
            ("datestamp_year", integer!(Record, datestamp_parts.year)),
            ("datestamp_month", integer!(Record, datestamp_parts.month)),
            ("datestamp_day", integer!(Record, datestamp_parts.day)),
            ("datestamp_hour", integer!(Record, datestamp_parts.hour)),
            ("datestamp_minute", integer!(Record, datestamp_parts.minute)),
            ("datestamp_second", integer!(Record, datestamp_parts.second)),
            ("lastmod_year", integer!(Record, lastmod_parts.year)),
            ("lastmod_month", integer!(Record, lastmod_parts.month)),
            ("lastmod_day", integer!(Record, lastmod_parts.day)),
            ("lastmod_hour", integer!(Record, lastmod_parts.hour)),
            ("lastmod_minute", integer!(Record, lastmod_parts.minute)),
            ("lastmod_second", integer!(Record, lastmod_parts.second)),
            ("status_changed_year", integer!(Record, status_changed_parts.year)),
            ("status_changed_month", integer!(Record, status_changed_parts.month)),
            ("status_changed_day", integer!(Record, status_changed_parts.day)),
            ("status_changed_hour", integer!(Record, status_changed_parts.hour)),
            ("status_changed_minute", integer!(Record, status_changed_parts.minute)),
            ("status_changed_second", integer!(Record, status_changed_parts.second)),
            ("type", text!(Record, kind)),
            ("metadata_visibility", text!(Record, metadata_visibility)),
            ("title", text!(Record, title)),
            ("ispublished", text!(Record, ispublished)),
            ("full_text_status", text!(Record, full_text_status)),
            ("keywords", text!(Record, keywords)),
            ("note", text!(Record, note)),
            ("abstract", text!(Record, abstract_text)),
            ("date_year", integer!(Record, date_parts.year)),
            ("date_month", integer!(Record, date_parts.month)),
            ("date_day", integer!(Record, date_parts.day)),
            ("date_type", text!(Record, date_type)),
            ("series", text!(Record, series)),
            ("volume", text!(Record, volume)),
            ("number", text!(Record, number)),
            ("publication", text!(Record, publication)),
            ("publisher", text!(Record, publisher)),
            ("place_of_pub", text!(Record, place_of_pub)),
            ("edition", text!(Record, edition)),
            ("pagerange", text!(Record, pagerange)),
            ("pages", integer!(Record, pages)),
            ("event_type", text!(Record, event_type)),
            ("event_title", text!(Record, event_title)),
            ("event_location", text!(Record, event_location)),
            ("event_dates", text!(Record, event_dates)),
            ("id_number", text!(Record, id_number)),
            ("refereed", text!(Record, refereed)),
            ("isbn", text!(Record, isbn)),
            ("issn", text!(Record, issn)),
            ("book_title", text!(Record, book_title)),
            ("official_url", text!(Record, official_url)),
            ("alt_url", text!(Record, alt_url)),
            ("rights", text!(Record, rights)),
            ("collection", text!(Record, collection)),
            ("reviewer", text!(Record, reviewer)),
            ("official_cit", text!(Record, official_cit)),
            ("monograph_type", text!(Record, monograph_type)),
            ("suggestions", text!(Record, suggestions)),
            ("pres_type", text!(Record, pres_type)),
            ("succeeds", integer!(Record, succeeds)),
            ("commentary", integer!(Record, commentary)),
            ("contact_email", text!(Record, contact_email)),
            ("fileinfo", text!(Record, fileinfo)),
            ("latitude", real!(Record, latitude)),
            ("longitude", real!(Record, longitude)),
            ("department", text!(Record, department)),
            ("output_media", text!(Record, output_media)),
            ("num_pieces", integer!(Record, num_pieces)),
            ("composition_type", text!(Record, composition_type)),
            ("data_type", text!(Record, data_type)),
            ("pedagogic_type", text!(Record, pedagogic_type)),
            ("learning_level", text!(Record, learning_level)),
            ("completion_time", text!(Record, completion_time)),
            ("task_purpose", text!(Record, task_purpose)),
            ("doi", text!(Record, doi)),
            ("pmc_id", text!(Record, pmc_id)),
            ("pmid", text!(Record, pmid)),
            ("parent_url", text!(Record, parent_url)),
            ("toc", text!(Record, toc)),
            ("interviewer", text!(Record, interviewer)),
            ("interviewdate", text!(Record, interviewdate)),
            ("nonsubj_keywords", text!(Record, nonsubj_keywords)),
            ("season", text!(Record, season)),
            ("classification_code", text!(Record, classification_code)),
            ("sword_depositor", integer!(Record, sword_depositor)),
            ("sword_depository", text!(Record, sword_depository)),
            ("sword_slug", text!(Record, sword_slug)),
            ("importid", integer!(Record, importid)),
            ("patent_applicant", text!(Record, patent_applicant)),
            ("patent_number", text!(Record, patent_number)),
            ("patent_classification", text!(Record, patent_classification)),
            ("institution", text!(Record, institution)),
            ("thesis_type", text!(Record, thesis_type)),
            ("thesis_degree", text!(Record, thesis_degree)),
            ("thesis_degree_grantor", text!(Record, thesis_degree_grantor)),
            ("thesis_degree_date_year", integer!(Record, thesis_degree_date_parts.year)),
            ("thesis_degree_date_month", integer!(Record, thesis_degree_date_parts.month)),
            ("thesis_degree_date_day", integer!(Record, thesis_degree_date_parts.day)),
            ("thesis_submitted_date_year", integer!(Record, thesis_submitted_date_parts.year)),
            ("thesis_submitted_date_month", integer!(Record, thesis_submitted_date_parts.month)),
            ("thesis_submitted_date_day", integer!(Record, thesis_submitted_date_parts.day)),
            ("thesis_defense_date", text!(Record, thesis_defense_date)),
            ("thesis_defense_date_year", integer!(Record, thesis_defense_date_parts.year)),
            ("thesis_defense_date_month", integer!(Record, thesis_defense_date_parts.month)),
            ("thesis_defense_date_day", integer!(Record, thesis_defense_date_parts.day)),
            ("thesis_approved_date_year", integer!(Record, thesis_approved_date_parts.year)),
            ("thesis_approved_date_month", integer!(Record, thesis_approved_date_parts.month)),
            ("thesis_approved_date_day", integer!(Record, thesis_approved_date_parts.day)),
            ("thesis_public_date_year", integer!(Record, thesis_public_date_parts.year)),
            ("thesis_public_date_month", integer!(Record, thesis_public_date_parts.month)),
            ("thesis_public_date_day", integer!(Record, thesis_public_date_parts.day)),
            ("thesis_author_email", text!(Record, thesis_author_email)),
            ("hide_thesis_author_email", text!(Record, hide_thesis_author_email)),
            ("gradofc_approval_date", text!(Record, gradofc_approval_date)),
            ("gradofc_approval_date_year", integer!(Record, gradofc_approval_date_parts.year)),
            ("gradofc_approval_date_month", integer!(Record, gradofc_approval_date_parts.month)),
            ("gradofc_approval_date_day", integer!(Record, gradofc_approval_date_parts.day)),
            ("thesis_awards", text!(Record, thesis_awards)),
            ("review_status", text!(Record, review_status)),
            ("copyright_statement", text!(Record, copyright_statement)),
            ("source", text!(Record, source)),
            ("replacedby", integer!(Record, replacedby)),
            ("item_issues_count", integer!(Record, item_issues_count)),
            ("errata", text!(Record, errata)),
            ("coverage_dates", text!(Record, coverage_dates)),
            ("edit_lock_user", integer!(Record, edit_lock_user)),
            ("edit_lock_since", integer!(Record, edit_lock_since)),
            ("edit_lock_until", integer!(Record, edit_lock_until)),
        ],
    )
});

/// Registry for the `document` table.
pub static DOCUMENT: Lazy<ColumnRegistry<Document>> = Lazy::new(|| {
    ColumnRegistry::new(
        "document",
        vec![
            ("docid", integer!(Document, docid)),
            ("eprintid", integer!(Document, eprintid)),
            ("pos", integer!(Document, pos)),
            ("rev_number", integer!(Document, rev_number)),
            ("format", text!(Document, format)),
            ("formatdesc", text!(Document, formatdesc)),
            ("language", text!(Document, language)),
            ("security", text!(Document, security)),
            ("license", text!(Document, license)),
            ("main", text!(Document, main)),
            ("date_embargo_year", integer!(Document, date_embargo_parts.year)),
            ("date_embargo_month", integer!(Document, date_embargo_parts.month)),
            ("date_embargo_day", integer!(Document, date_embargo_parts.day)),
            ("content", text!(Document, content)),
            ("placement", integer!(Document, placement)),
            ("mime_type", text!(Document, mime_type)),
            ("media_duration", text!(Document, media_duration)),
            ("media_audio_codec", text!(Document, media_audio_codec)),
            ("media_video_codec", text!(Document, media_video_codec)),
            ("media_width", integer!(Document, media_width)),
            ("media_height", integer!(Document, media_height)),
            ("media_aspect_ratio", text!(Document, media_aspect_ratio)),
            ("media_sample_start", text!(Document, media_sample_start)),
            ("media_sample_stop", text!(Document, media_sample_stop)),
        ],
    )
});

/// Registry for the `file` table.
pub static FILE: Lazy<ColumnRegistry<File>> = Lazy::new(|| {
    ColumnRegistry::new(
        "file",
        vec![
            ("fileid", integer!(File, fileid)),
            ("datasetid", text!(File, datasetid)),
            ("objectid", integer!(File, objectid)),
            ("filename", text!(File, filename)),
            ("mime_type", text!(File, mime_type)),
            ("hash", text!(File, hash)),
            ("hash_type", text!(File, hash_type)),
            ("filesize", integer!(File, filesize)),
            ("mtime_year", integer!(File, mtime_parts.year)),
            ("mtime_month", integer!(File, mtime_parts.month)),
            ("mtime_day", integer!(File, mtime_parts.day)),
            ("mtime_hour", integer!(File, mtime_parts.hour)),
            ("mtime_minute", integer!(File, mtime_parts.minute)),
            ("mtime_second", integer!(File, mtime_parts.second)),
        ],
    )
});

#[cfg(test)]
mod tests {
    use super::{apply_row, select_list, values_for, BindError, ColumnKind, EPRINT, FILE};
    use crate::model::Record;
    use rusqlite::types::Value;
    use rusqlite::Connection;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn unknown_column_is_rejected() {
        let err = EPRINT
            .bind(&columns(&["eprintid", "favourite_colour"]))
            .err()
            .expect("unknown column must fail");
        assert_eq!(
            err,
            BindError::UnknownColumn {
                table: "eprint".to_string(),
                column: "favourite_colour".to_string(),
            }
        );
    }

    #[test]
    fn select_list_casts_with_null_fallbacks() {
        let bound = EPRINT
            .bind(&columns(&["eprintid", "title", "latitude"]))
            .expect("known columns should bind");
        assert_eq!(
            select_list(&bound),
            "CAST(IFNULL(eprintid, 0) AS INTEGER) AS eprintid, \
             CAST(IFNULL(title, '') AS TEXT) AS title, \
             CAST(IFNULL(latitude, 0.0) AS REAL) AS latitude"
        );
    }

    #[test]
    fn apply_row_scans_into_nested_date_parts() {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let bound = EPRINT
            .bind(&columns(&["eprintid", "datestamp_year", "abstract", "pages"]))
            .expect("known columns should bind");
        let mut record = Record::default();
        conn.query_row(
            &format!(
                "SELECT {} FROM (SELECT 12 AS eprintid, 2021 AS datestamp_year, 'Text' AS abstract, NULL AS pages)",
                select_list(&bound)
            ),
            [],
            |row| apply_row(&mut record, &bound, row),
        )
        .expect("row should scan");

        assert_eq!(record.eprintid, 12);
        assert_eq!(record.datestamp_parts.year, 2021);
        assert_eq!(record.abstract_text, "Text");
        assert_eq!(record.pages, 0);
    }

    #[test]
    fn values_for_writes_absent_fields_as_null() {
        let bound = EPRINT
            .bind(&columns(&["eprintid", "title", "date_month"]))
            .expect("known columns should bind");
        let record = Record {
            eprintid: 3,
            ..Record::default()
        };
        assert_eq!(
            values_for(&record, &bound),
            vec![Value::Integer(3), Value::Null, Value::Null]
        );
    }

    #[test]
    fn registries_expose_column_kinds() {
        assert_eq!(EPRINT.kind_of("pages"), Some(ColumnKind::Integer));
        assert_eq!(EPRINT.kind_of("longitude"), Some(ColumnKind::Real));
        assert_eq!(FILE.kind_of("filename"), Some(ColumnKind::Text));
        assert!(!EPRINT.is_known("creators_name_family"));
    }
}
