//! Lookup queries over one repository database.
//!
//! # Responsibility
//! - Turn endpoint arguments (timestamps, approximate dates, names) into
//!   inclusive SQL bounds.
//! - Build the exact-match, listing and range statements.
//! - Execute lookups through `LookupRepository`.
//!
//! # Invariants
//! - Table and column names come from the static endpoint table, never
//!   from request input; request values are always bound parameters.
//! - Range bounds are inclusive at both ends.
//! - Listings never contain `NULL` or blank values and are sorted.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, ToSql};
use std::error::Error;
use std::fmt::{Display, Formatter};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const MINUTE_FORMAT: &str = "%Y-%m-%d %H:%M";
const DATE_FORMAT: &str = "%Y-%m-%d";
const NOW: &str = "now";

pub type QueryResult<T> = Result<T, QueryError>;

/// Which end of a range an argument describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Start,
    End,
}

impl Display for Bound {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "(start)"),
            Self::End => write!(f, "(end)"),
        }
    }
}

#[derive(Debug)]
pub enum QueryError {
    /// Range endpoints take one or two arguments.
    ArgumentCount(usize),
    InvalidBound { bound: Bound, value: String },
    Sqlite(rusqlite::Error),
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ArgumentCount(got) => write!(f, "expected 1 or 2 arguments, got {got}"),
            Self::InvalidBound { bound, value } => {
                write!(f, "{bound} {value:?} is not a valid date or timestamp")
            }
            Self::Sqlite(err) => write!(f, "{err}"),
        }
    }
}

impl Error for QueryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::ArgumentCount(_) | Self::InvalidBound { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for QueryError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Expands `YYYY`, `YYYY-MM`, `YYYY-MM-DD` or `now` to a concrete date.
///
/// The start bound takes the first day of the period, the end bound the
/// last (true month length, leap years included).
pub fn expand_approx_date(src: &str, bound: Bound, today: NaiveDate) -> QueryResult<String> {
    let src = src.trim();
    let invalid = || QueryError::InvalidBound {
        bound,
        value: src.to_string(),
    };
    if src == NOW {
        return Ok(today.format(DATE_FORMAT).to_string());
    }
    let date = match src.len() {
        4 => {
            let year: i32 = src.parse().map_err(|_| invalid())?;
            match bound {
                Bound::Start => NaiveDate::from_ymd_opt(year, 1, 1),
                Bound::End => NaiveDate::from_ymd_opt(year, 12, 31),
            }
        }
        7 => {
            let first = NaiveDate::parse_from_str(&format!("{src}-01"), DATE_FORMAT)
                .map_err(|_| invalid())?;
            match bound {
                Bound::Start => Some(first),
                Bound::End => last_day_of_month(first),
            }
        }
        10 => NaiveDate::parse_from_str(src, DATE_FORMAT).ok(),
        _ => None,
    };
    date.map(|date| date.format(DATE_FORMAT).to_string())
        .ok_or_else(invalid)
}

fn last_day_of_month(first: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).and_then(|next| next.pred_opt())
}

/// Normalizes a timestamp argument to `YYYY-MM-DD HH:MM:SS`.
///
/// Minute-resolution input is widened to the whole minute: `:00` for the
/// start bound, `:59` for the end bound.
pub fn parse_timestamp_bound(src: &str, bound: Bound, now: NaiveDateTime) -> QueryResult<String> {
    let src = src.trim();
    if src == NOW {
        return Ok(now.format(TIMESTAMP_FORMAT).to_string());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(src, TIMESTAMP_FORMAT) {
        return Ok(ts.format(TIMESTAMP_FORMAT).to_string());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(src, MINUTE_FORMAT) {
        let seconds = match bound {
            Bound::Start => "00",
            Bound::End => "59",
        };
        return Ok(format!("{}:{seconds}", ts.format(MINUTE_FORMAT)));
    }
    Err(QueryError::InvalidBound {
        bound,
        value: src.to_string(),
    })
}

/// `(start, end)` timestamps from one or two arguments; the end defaults to now.
pub fn timestamp_window(args: &[String], now: NaiveDateTime) -> QueryResult<(String, String)> {
    let (start, end) = window_args(args)?;
    Ok((
        parse_timestamp_bound(start, Bound::Start, now)?,
        parse_timestamp_bound(end, Bound::End, now)?,
    ))
}

/// `(start, end)` dates from one or two approximate dates; the end defaults to today.
pub fn date_window(args: &[String], today: NaiveDate) -> QueryResult<(String, String)> {
    let (start, end) = window_args(args)?;
    Ok((
        expand_approx_date(start, Bound::Start, today)?,
        expand_approx_date(end, Bound::End, today)?,
    ))
}

fn window_args(args: &[String]) -> QueryResult<(&str, &str)> {
    match args {
        [start] => Ok((start.as_str(), NOW)),
        [start, end] => Ok((start.as_str(), end.as_str())),
        _ => Err(QueryError::ArgumentCount(args.len())),
    }
}

/// Ids whose `column` equals the bound value.
pub fn exact_match(table: &str, column: &str) -> String {
    if table == "eprint" {
        format!("SELECT eprintid FROM eprint WHERE {column} = ?1 ORDER BY eprintid")
    } else {
        format!("SELECT DISTINCT eprintid FROM {table} WHERE {column} = ?1 ORDER BY eprintid")
    }
}

/// Distinct non-blank values of `column`, sorted.
pub fn listing(table: &str, column: &str) -> String {
    format!(
        "SELECT CAST({column} AS TEXT) FROM {table} \
         WHERE {column} IS NOT NULL AND TRIM({column}) <> '' \
         GROUP BY {column} ORDER BY {column}"
    )
}

fn composed(prefix: &str, parts: &[(&str, i64)], pattern: &str) -> String {
    let args = parts
        .iter()
        .map(|(part, fallback)| format!("IFNULL({prefix}_{part}, {fallback})"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("printf('{pattern}', {prefix}_year, {args})")
}

fn range_statement(prefix: &str, lower: String, upper: String, extra: Option<&str>) -> String {
    let extra = extra.map(|predicate| format!("({predicate}) AND ")).unwrap_or_default();
    format!(
        "SELECT eprintid FROM eprint WHERE {extra}{prefix}_year IS NOT NULL \
         AND {lower} >= ?1 AND {upper} <= ?2 ORDER BY eprintid"
    )
}

/// Inclusive range over `<prefix>_year .. <prefix>_second`.
///
/// Missing components take the widest value for each bound. A missing
/// day on the upper side is 28.
pub fn timestamp_range(prefix: &str, extra: Option<&str>) -> String {
    let pattern = "%04d-%02d-%02d %02d:%02d:%02d";
    let lower = composed(
        prefix,
        &[("month", 1), ("day", 1), ("hour", 0), ("minute", 0), ("second", 0)],
        pattern,
    );
    let upper = composed(
        prefix,
        &[("month", 12), ("day", 28), ("hour", 23), ("minute", 59), ("second", 59)],
        pattern,
    );
    range_statement(prefix, lower, upper, extra)
}

/// Inclusive range over `<prefix>_year .. <prefix>_day`.
pub fn approx_date_range(prefix: &str, extra: Option<&str>) -> String {
    let pattern = "%04d-%02d-%02d";
    let lower = composed(prefix, &[("month", 1), ("day", 1)], pattern);
    let upper = composed(prefix, &[("month", 12), ("day", 28)], pattern);
    range_statement(prefix, lower, upper, extra)
}

/// Ids of records naming a person in `eprint_<list>_name`, newest first.
pub fn person_name_lookup(list: &str, family_op: &str, given_op: &str) -> String {
    format!(
        "SELECT n.eprintid FROM eprint_{list}_name AS n \
         JOIN eprint AS e ON e.eprintid = n.eprintid \
         WHERE n.{list}_name_family {family_op} ?1 AND n.{list}_name_given {given_op} ?2 \
         GROUP BY n.eprintid \
         ORDER BY e.date_year DESC, e.date_month DESC, e.date_day DESC, n.eprintid DESC"
    )
}

/// Maps the `*` wildcard to SQL `%`; returns the operator to match with.
fn name_pattern(src: &str) -> (String, &'static str) {
    let pattern = src.trim().replace('*', "%");
    let op = if pattern.contains('%') { "LIKE" } else { "=" };
    (pattern, op)
}

const PUBLISHED: &str = "date_type = 'published'";

/// Range lookups served by the range endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeField {
    /// Deposit timestamp.
    Created,
    /// Last modification timestamp.
    Updated,
    /// Last modification of records in `deletion` status.
    Deleted,
    /// Approximate publication date.
    Published,
}

impl RangeField {
    pub fn sql(self) -> String {
        match self {
            Self::Created => timestamp_range("datestamp", None),
            Self::Updated => timestamp_range("lastmod", None),
            Self::Deleted => timestamp_range("lastmod", Some("eprint_status = 'deletion'")),
            Self::Published => approx_date_range("date", Some(PUBLISHED)),
        }
    }
}

/// Lookup contract used by endpoint handlers.
pub trait LookupRepository {
    /// Every record id, ascending.
    fn all_ids(&self) -> QueryResult<Vec<i64>>;
    /// Ids whose `table.column` equals `value`.
    fn ids_for(&self, table: &str, column: &str, value: &str) -> QueryResult<Vec<i64>>;
    /// Distinct values of `table.column`.
    fn values_for(&self, table: &str, column: &str) -> QueryResult<Vec<String>>;
    /// Ids inside the inclusive `[start, end]` window of `field`.
    fn ids_in_range(&self, field: RangeField, start: &str, end: &str) -> QueryResult<Vec<i64>>;
    /// Ids of records listing `family`/`given` in a person list.
    fn person_name_ids(&self, list: &str, family: &str, given: &str) -> QueryResult<Vec<i64>>;
    /// Years with published records, newest first.
    fn years(&self) -> QueryResult<Vec<i64>>;
    /// Published record ids for one year.
    fn ids_for_year(&self, year: i64) -> QueryResult<Vec<i64>>;
}

/// SQLite-backed lookup repository.
pub struct SqliteLookupRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLookupRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn collect<T: rusqlite::types::FromSql>(
        &self,
        sql: &str,
        params: &[&dyn ToSql],
    ) -> QueryResult<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| row.get::<_, T>(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<T>>>()?)
    }
}

impl LookupRepository for SqliteLookupRepository<'_> {
    fn all_ids(&self) -> QueryResult<Vec<i64>> {
        self.collect("SELECT eprintid FROM eprint ORDER BY eprintid", &[])
    }

    fn ids_for(&self, table: &str, column: &str, value: &str) -> QueryResult<Vec<i64>> {
        self.collect(&exact_match(table, column), params![value])
    }

    fn values_for(&self, table: &str, column: &str) -> QueryResult<Vec<String>> {
        self.collect(&listing(table, column), &[])
    }

    fn ids_in_range(&self, field: RangeField, start: &str, end: &str) -> QueryResult<Vec<i64>> {
        self.collect(&field.sql(), params![start, end])
    }

    fn person_name_ids(&self, list: &str, family: &str, given: &str) -> QueryResult<Vec<i64>> {
        let (family, family_op) = name_pattern(family);
        let (given, given_op) = name_pattern(given);
        self.collect(
            &person_name_lookup(list, family_op, given_op),
            params![family, given],
        )
    }

    fn years(&self) -> QueryResult<Vec<i64>> {
        self.collect(
            &format!(
                "SELECT date_year FROM eprint WHERE {PUBLISHED} AND date_year IS NOT NULL \
                 GROUP BY date_year ORDER BY date_year DESC"
            ),
            &[],
        )
    }

    fn ids_for_year(&self, year: i64) -> QueryResult<Vec<i64>> {
        self.collect(
            &format!(
                "SELECT eprintid FROM eprint WHERE {PUBLISHED} AND date_year = ?1 ORDER BY eprintid"
            ),
            params![year],
        )
    }
}
