//! Endpoint handlers.
//!
//! # Responsibility
//! - Validate endpoint arguments and run the matching lookup, read or
//!   write against one repository.
//!
//! # Invariants
//! - Argument count errors are `Request` errors, decided before any query.
//! - Calls without arguments reach a handler only for listing endpoints;
//!   `dispatch` answers the rest with the endpoint document.
//! - Only public records are served through `record`.

use crate::assemble::read_record;
use crate::crosswalk::{
    from_native_json, from_native_xml, is_public, to_native_json, to_native_xml, to_simplified,
    CodecError,
};
use crate::dispatch::{ApiError, ApiResult, Reply, Repository, Request, CONTENT_JSON, CONTENT_XML};
use crate::model::{EPrints, Record};
use crate::query::{
    date_window, timestamp_window, LookupRepository, QueryResult, RangeField,
    SqliteLookupRepository,
};
use crate::write::write_record;
use chrono::Local;
use log::info;

/// One routed invocation.
pub struct Call<'a> {
    pub repository: &'a Repository,
    pub request: &'a Request,
    pub args: &'a [String],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    Keys,
    Range(RangeField),
    Doi,
    /// 0 args lists values, 1 arg returns ids.
    Exact {
        table: &'static str,
        column: &'static str,
    },
    /// `family/given` in `eprint_<list>_name`.
    PersonName { list: &'static str },
    Year,
    Record,
    EPrint,
    Import,
}

impl Handler {
    pub fn handle(self, call: &Call<'_>) -> ApiResult<Reply> {
        match self {
            Self::Keys => keys(call),
            Self::Range(field) => range(call, field),
            Self::Doi => doi(call),
            Self::Exact { table, column } => exact(call, table, column),
            Self::PersonName { list } => person_name(call, list),
            Self::Year => year(call),
            Self::Record => record(call),
            Self::EPrint => eprint(call),
            Self::Import => import(call),
        }
    }
}

fn lookup<T>(
    call: &Call<'_>,
    run: impl FnOnce(&SqliteLookupRepository<'_>) -> QueryResult<T>,
) -> ApiResult<T> {
    let result = call
        .repository
        .pool
        .with_conn(|conn| run(&SqliteLookupRepository::new(conn)))?;
    Ok(result?)
}

fn keys(call: &Call<'_>) -> ApiResult<Reply> {
    if !call.args.is_empty() {
        return Err(ApiError::Request("keys takes no arguments".to_string()));
    }
    Reply::json(&lookup(call, |repo| repo.all_ids())?)
}

fn range(call: &Call<'_>, field: RangeField) -> ApiResult<Reply> {
    let now = Local::now().naive_local();
    let (start, end) = match field {
        RangeField::Published => date_window(call.args, now.date())?,
        _ => timestamp_window(call.args, now)?,
    };
    Reply::json(&lookup(call, |repo| repo.ids_in_range(field, &start, &end))?)
}

fn doi(call: &Call<'_>) -> ApiResult<Reply> {
    let doi = call.args.join("/");
    Reply::json(&lookup(call, |repo| repo.ids_for("eprint", "doi", &doi))?)
}

fn exact(call: &Call<'_>, table: &str, column: &str) -> ApiResult<Reply> {
    match call.args {
        [] => Reply::json(&lookup(call, |repo| repo.values_for(table, column))?),
        [value] => Reply::json(&lookup(call, |repo| repo.ids_for(table, column, value))?),
        _ => Err(ApiError::Request(format!(
            "expected at most 1 argument, got {}",
            call.args.len()
        ))),
    }
}

fn person_name(call: &Call<'_>, list: &str) -> ApiResult<Reply> {
    match call.args {
        [family, given] => Reply::json(&lookup(call, |repo| {
            repo.person_name_ids(list, family, given)
        })?),
        _ => Err(ApiError::Request(format!(
            "expected family and given name, got {} arguments",
            call.args.len()
        ))),
    }
}

fn year(call: &Call<'_>) -> ApiResult<Reply> {
    match call.args {
        [] => Reply::json(&lookup(call, |repo| repo.years())?),
        [value] => {
            let year = value
                .trim()
                .parse::<i64>()
                .map_err(|_| ApiError::Request(format!("year {value:?} is not a number")))?;
            Reply::json(&lookup(call, |repo| repo.ids_for_year(year))?)
        }
        _ => Err(ApiError::Request(format!(
            "expected at most 1 argument, got {}",
            call.args.len()
        ))),
    }
}

fn single_id(args: &[String]) -> ApiResult<i64> {
    match args {
        [value] => value
            .trim()
            .parse::<i64>()
            .map_err(|_| ApiError::Request(format!("eprint id {value:?} is not valid"))),
        _ => Err(ApiError::Request(format!(
            "expected one eprint id, got {} arguments",
            args.len()
        ))),
    }
}

fn load(call: &Call<'_>, eprintid: i64) -> ApiResult<Record> {
    let repository = call.repository;
    let record = repository.pool.with_conn(|conn| {
        read_record(conn, &repository.schema, &repository.base_url, eprintid)
    })??;
    Ok(record)
}

fn record(call: &Call<'_>) -> ApiResult<Reply> {
    let eprintid = single_id(call.args)?;
    let record = load(call, eprintid)?;
    if !is_public(&record) {
        return Err(ApiError::NotFound);
    }
    Reply::json(&to_simplified(&record))
}

fn eprint(call: &Call<'_>) -> ApiResult<Reply> {
    if call.request.method != "GET" {
        return Err(ApiError::Method);
    }
    let eprintid = single_id(call.args)?;
    let media = call.request.media_type();
    if !matches!(media.as_str(), CONTENT_JSON | CONTENT_XML | "") {
        return Err(ApiError::UnsupportedMedia(media));
    }
    let record = load(call, eprintid)?;
    let records = [record];
    if media == CONTENT_JSON {
        Ok(Reply::json_text(to_native_json(&records).map_err(encode_error)?))
    } else {
        Ok(Reply::xml(to_native_xml(&records).map_err(encode_error)?))
    }
}

fn encode_error(err: CodecError) -> ApiError {
    ApiError::Integration(format!("encode record: {err}"))
}

fn decode_body(request: &Request) -> ApiResult<EPrints> {
    let media = request.media_type();
    if media != CONTENT_JSON && media != CONTENT_XML {
        return Err(ApiError::UnsupportedMedia(media));
    }
    let src = std::str::from_utf8(&request.body)
        .map_err(|_| ApiError::Request("body is not valid UTF-8".to_string()))?;
    let eprints = if media == CONTENT_JSON {
        from_native_json(src)?
    } else {
        from_native_xml(src)?
    };
    Ok(eprints)
}

fn import(call: &Call<'_>) -> ApiResult<Reply> {
    let repository = call.repository;
    if call.request.method != "POST" || !repository.write {
        return Err(ApiError::Method);
    }
    let eprints = decode_body(call.request)?;

    let mut ids = Vec::with_capacity(eprints.records.len());
    for record in eprints.records {
        let id = repository.pool.with_conn(|conn| {
            write_record(conn, &repository.schema, &repository.defaults, record)
        })??;
        ids.push(id);
    }
    info!(
        "event=record_import module=router status=ok repository={} count={}",
        repository.id,
        ids.len()
    );
    Reply::json(&ids)
}
