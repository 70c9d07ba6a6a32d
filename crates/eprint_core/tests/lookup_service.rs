use eprint_core::db::bootstrap::{install_schema, SchemaPart, CORE_SCHEMA, REFERENCE_SCHEMA};
use eprint_core::db::open_db;
use eprint_core::{dispatch, to_native_json, Config, Record, Reply, Request, ServiceContext};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const RECORD_COLUMNS: &str = "eprintid, eprint_status, metadata_visibility, type, title, collection, doi, issn,
    datestamp_year, datestamp_month, datestamp_day, datestamp_hour, datestamp_minute, datestamp_second,
    lastmod_year, lastmod_month, lastmod_day, lastmod_hour, lastmod_minute, lastmod_second,
    date_year, date_month, date_type";

const RECORD_VALUES: &[&str] = &[
    "1, 'archive', 'show', 'article', 'Lemur habitats', 'CaltechAUTHORS', '10.1000/lemur', '1234-5678',
     2021, 3, 1, 0, 0, 0, 2021, 3, 2, 8, 0, 0, 2020, 7, 'published'",
    "2, 'archive', 'show', 'article', 'Lemur diets', 'CaltechAUTHORS', NULL, '1234-5678',
     2021, 3, 31, 23, 59, 59, 2021, 3, 31, 23, 59, 59, 2021, NULL, 'published'",
    "3, 'deletion', 'show', 'article', 'Withdrawn lemurs', 'CaltechAUTHORS', NULL, NULL,
     2021, 4, 1, 0, 0, 0, 2021, 4, 2, 9, 30, 0, 2019, 12, 'published'",
    "4, 'buffer', 'show', 'article', 'Lemur drafts', 'CaltechAUTHORS', NULL, NULL,
     2020, 12, 31, 23, 59, 59, 2021, 1, 1, 0, 0, 0, 2020, NULL, 'submitted'",
];

const PEOPLE_ROWS: &str = "
    INSERT INTO eprint_creators_name VALUES (1, 0, NULL, 'Ada', 'Lovelace', NULL);
    INSERT INTO eprint_creators_name VALUES (2, 0, NULL, 'Grace', 'Hopper', NULL);
    INSERT INTO eprint_creators_id VALUES (1, 0, 'Lovelace-A');";

const ORCID_ROWS: &str = "INSERT INTO eprint_creators_orcid VALUES (1, 0, '0000-0002-1825-0097');";

struct Fixture {
    _dir: TempDir,
    ctx: ServiceContext,
}

fn seed(path: &Path, parts: &[SchemaPart], extra_rows: &str) {
    let mut conn = open_db(path).expect("open fixture db");
    install_schema(&mut conn, parts).expect("install schema");
    for values in RECORD_VALUES {
        conn.execute_batch(&format!("INSERT INTO eprint ({RECORD_COLUMNS}) VALUES ({values});"))
            .expect("record row");
    }
    conn.execute_batch(PEOPLE_ROWS).expect("people rows");
    conn.execute_batch(extra_rows).expect("extra rows");
}

fn dsn(path: &Path) -> &str {
    path.to_str().expect("temp path should be UTF-8")
}

/// `authors` carries the reference schema, `thesis` only the core tables.
fn fixture(write: bool) -> Fixture {
    let dir = tempfile::tempdir().expect("temp dir");
    let authors: PathBuf = dir.path().join("authors.sqlite3");
    let thesis: PathBuf = dir.path().join("thesis.sqlite3");
    seed(&authors, REFERENCE_SCHEMA, ORCID_ROWS);
    seed(&thesis, CORE_SCHEMA, "");

    let settings = serde_json::json!({
        "hostname": "localhost:8484",
        "eprint_repositories": {
            "authors": {
                "dsn": dsn(&authors),
                "base_url": "https://authors.example.edu",
                "write": write,
                "pool_size": 2,
                "default_collection": "CaltechAUTHORS"
            },
            "thesis": {
                "dsn": dsn(&thesis),
                "base_url": "https://thesis.example.edu"
            }
        }
    });
    let config = Config::from_json_str(&settings.to_string()).expect("settings should parse");
    Fixture {
        ctx: ServiceContext::build(config),
        _dir: dir,
    }
}

fn get(ctx: &ServiceContext, path: &str) -> Reply {
    dispatch(ctx, &Request::get(path))
}

fn send(ctx: &ServiceContext, method: &str, path: &str, content_type: &str, body: &str) -> Reply {
    let request = Request {
        method: method.to_string(),
        path: path.to_string(),
        content_type: content_type.to_string(),
        body: body.as_bytes().to_vec(),
        remote_addr: "127.0.0.1:50000".to_string(),
    };
    dispatch(ctx, &request)
}

fn ids(reply: &Reply) -> Vec<i64> {
    assert_eq!(reply.status, 200, "unexpected reply: {}", reply.body_text());
    assert_eq!(reply.content_type, "application/json");
    serde_json::from_slice(&reply.body).expect("id array")
}

fn json(reply: &Reply) -> Value {
    assert_eq!(reply.status, 200, "unexpected reply: {}", reply.body_text());
    serde_json::from_slice(&reply.body).expect("json body")
}

#[test]
fn optional_endpoints_follow_the_probed_schema() {
    let fixture = fixture(false);
    let ctx = &fixture.ctx;

    assert_eq!(ids(&get(ctx, "/authors/creator-orcid/0000-0002-1825-0097")), vec![1]);
    assert_eq!(
        json(&get(ctx, "/authors/creator-orcid")),
        serde_json::json!(["0000-0002-1825-0097"])
    );

    let missing = get(ctx, "/thesis/creator-orcid/0000-0002-1825-0097");
    assert_eq!(missing.status, 404);
    assert_eq!(missing.body_text(), "ERROR: 404 Not Found");
    assert_eq!(get(ctx, "/thesis/creator-orcid/help").status, 404);

    assert_eq!(ids(&get(ctx, "/thesis/creator-id/Lovelace-A")), vec![1]);
    assert_eq!(ids(&get(ctx, "/thesis/keys")), vec![1, 2, 3, 4]);
}

#[test]
fn timestamp_windows_are_inclusive() {
    let fixture = fixture(false);
    let ctx = &fixture.ctx;

    assert_eq!(
        ids(&get(ctx, "/authors/created/2021-03-01%2000:00:00/2021-03-31%2023:59:59")),
        vec![1, 2]
    );
    assert_eq!(ids(&get(ctx, "/authors/created/2021-03-31%2023:59")), vec![2, 3]);
    assert_eq!(
        ids(&get(ctx, "/authors/updated/2021-03-02%2008:00/2021-03-31%2023:59")),
        vec![1, 2]
    );
    assert_eq!(ids(&get(ctx, "/authors/deleted/2021-01-01%2000:00")), vec![3]);
}

#[test]
fn bad_window_arguments_are_request_errors() {
    let fixture = fixture(false);
    let ctx = &fixture.ctx;

    let bad_end = get(ctx, "/authors/created/2021-03-01%2000:00:00/soon");
    assert_eq!(bad_end.status, 400);
    assert!(bad_end.body_text().starts_with("ERROR: 400 Bad Request"));
    assert!(bad_end.body_text().contains("(end)"));

    assert_eq!(get(ctx, "/authors/pubdate/2020-13").status, 400);
    assert_eq!(get(ctx, "/authors/keys/extra").status, 400);
}

#[test]
fn pubdate_expands_approximate_dates() {
    let fixture = fixture(false);
    let ctx = &fixture.ctx;

    assert_eq!(ids(&get(ctx, "/authors/pubdate/2020")), vec![1]);
    assert_eq!(ids(&get(ctx, "/authors/pubdate/2021/2021")), vec![2]);
    assert_eq!(ids(&get(ctx, "/authors/pubdate/2019-12/2021")), vec![1, 2, 3]);
    assert_eq!(ids(&get(ctx, "/authors/year")), vec![2021, 2020, 2019]);
    assert_eq!(ids(&get(ctx, "/authors/year/2020")), vec![1]);
}

#[test]
fn identifier_and_name_lookups() {
    let fixture = fixture(false);
    let ctx = &fixture.ctx;

    assert_eq!(ids(&get(ctx, "/authors/doi/10.1000/lemur")), vec![1]);
    assert_eq!(ids(&get(ctx, "/authors/doi/10.1000%2Flemur")), vec![1]);
    assert_eq!(ids(&get(ctx, "/authors/issn/1234-5678")), vec![1, 2]);
    assert_eq!(get(ctx, "/authors/issn/1234-5678/extra").status, 400);

    assert_eq!(ids(&get(ctx, "/authors/creator-name/Lovelace/Ada")), vec![1]);
    assert_eq!(ids(&get(ctx, "/authors/creator-name/Lo*/A*")), vec![1]);
    assert!(ids(&get(ctx, "/authors/creator-name/Lovelace/Grace")).is_empty());
    assert_eq!(get(ctx, "/authors/creator-name/Lovelace").status, 400);
}

#[test]
fn record_serves_only_public_records() {
    let fixture = fixture(false);
    let ctx = &fixture.ctx;

    let record = json(&get(ctx, "/authors/record/1"));
    assert_eq!(record["id"], "CaltechAUTHORS:1");
    assert_eq!(record["metadata"]["title"], "Lemur habitats");
    assert_eq!(record["access"]["record"], "public");

    assert_eq!(get(ctx, "/authors/record/4").status, 404);
    assert_eq!(get(ctx, "/authors/record/99").status, 404);
    assert_eq!(get(ctx, "/authors/record/lemur").status, 400);
}

#[test]
fn eprint_export_negotiates_on_content_type() {
    let fixture = fixture(false);
    let ctx = &fixture.ctx;

    let xml = get(ctx, "/authors/eprint/1");
    assert_eq!(xml.status, 200);
    assert_eq!(xml.content_type, "application/xml");
    let text = xml.body_text();
    assert!(text.starts_with("<?xml"));
    assert!(text.contains("<eprint id=\"https://authors.example.edu/id/eprint/1\">"));
    assert!(text.contains("<title>Lemur habitats</title>"));
    assert!(text.contains("<family>Lovelace</family>"));

    let native = json(&send(ctx, "GET", "/authors/eprint/1", "application/json", ""));
    assert_eq!(native["eprint"][0]["eprint_id"], 1);
    assert_eq!(native["eprint"][0]["creators"]["items"][0]["id"], "Lovelace-A");

    let csv = send(ctx, "GET", "/authors/eprint/1", "text/csv", "");
    assert_eq!(csv.status, 415);
    assert_eq!(csv.body_text(), "ERROR: 415 Unsupported Media Type, \"text/csv\"");
    assert_eq!(send(ctx, "POST", "/authors/eprint/1", "", "").status, 405);
    assert_eq!(get(ctx, "/authors/eprint/99").status, 404);
}

#[test]
fn import_requires_post_and_a_writable_repository() {
    let fixture = fixture(false);
    let ctx = &fixture.ctx;
    let body = to_native_json(&[Record {
        title: "Imported".to_string(),
        ..Record::default()
    }])
    .expect("encode");

    let reply = send(ctx, "POST", "/authors/eprint-import", "application/json", &body);
    assert_eq!(reply.status, 405);
    assert_eq!(reply.body_text(), "ERROR: 405 Method Not Allowed");
    assert_eq!(ids(&get(ctx, "/authors/keys")), vec![1, 2, 3, 4]);
}

#[test]
fn import_creates_then_replaces() {
    let fixture = fixture(true);
    let ctx = &fixture.ctx;

    let body = to_native_json(&[Record {
        title: "Imported".to_string(),
        ..Record::default()
    }])
    .expect("encode");
    let created = ids(&send(ctx, "POST", "/authors/eprint-import", "application/json", &body));
    assert_eq!(created, vec![5]);

    let body = to_native_json(&[Record {
        eprintid: 5,
        title: "Imported twice".to_string(),
        ..Record::default()
    }])
    .expect("encode");
    let replaced = ids(&send(ctx, "POST", "/authors/eprint-import", "application/json", &body));
    assert_eq!(replaced, vec![5]);
    assert_eq!(ids(&get(ctx, "/authors/keys")), vec![1, 2, 3, 4, 5]);

    let stored = json(&send(ctx, "GET", "/authors/eprint/5", "application/json", ""));
    assert_eq!(stored["eprint"][0]["title"], "Imported twice");
    assert_eq!(stored["eprint"][0]["collection"], "CaltechAUTHORS");

    assert_eq!(get(ctx, "/authors/eprint-import").content_type, "text/plain");
    assert_eq!(send(ctx, "POST", "/authors/eprint-import", "text/plain", "x").status, 415);
    assert_eq!(
        send(ctx, "POST", "/authors/eprint-import", "application/json", "{\"eprint\": [").status,
        400
    );
    assert_eq!(
        send(ctx, "POST", "/authors/eprint-import", "application/xml", "<records/>").status,
        400
    );
}

#[test]
fn unmapped_column_is_an_internal_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("odd.sqlite3");
    let conn = open_db(&path).expect("open db");
    conn.execute_batch(
        "CREATE TABLE eprint (eprintid INTEGER PRIMARY KEY, title TEXT, colour TEXT);
         INSERT INTO eprint VALUES (1, 'Odd', 'teal');",
    )
    .expect("odd schema");
    drop(conn);

    let settings = serde_json::json!({"eprint_repositories": {"odd": {"dsn": dsn(&path)}}});
    let config = Config::from_json_str(&settings.to_string()).expect("settings");
    let ctx = ServiceContext::build(config);

    assert_eq!(ids(&get(&ctx, "/odd/keys")), vec![1]);
    let reply = get(&ctx, "/odd/eprint/1");
    assert_eq!(reply.status, 500);
    assert_eq!(reply.body_text(), "ERROR: 500 Internal Server Error");
    assert!(!reply.body_text().contains("colour"));
}

#[test]
fn configuration_documents_and_help() {
    let fixture = fixture(false);
    let ctx = &fixture.ctx;

    let readme = get(ctx, "/");
    assert_eq!(readme.status, 200);
    assert_eq!(readme.content_type, "text/plain");
    assert!(readme.body_text().contains("/<REPO_ID>/keys"));

    let scoped = get(ctx, "/authors").body_text();
    assert!(scoped.contains("/authors/keys"));
    assert!(!scoped.contains("<REPO_ID>"));
    assert!(get(ctx, "/authors/help").body_text().contains("/authors/keys"));

    assert_eq!(
        json(&get(ctx, "/repositories")),
        serde_json::json!(["authors", "thesis"])
    );
    assert_eq!(get(ctx, "/repositories/help").content_type, "text/plain");

    let schema = json(&get(ctx, "/repository/thesis"));
    assert_eq!(schema["eprint"][0], "eprintid");
    assert!(schema.get("eprint_creators_orcid").is_none());
    assert_eq!(get(ctx, "/repository/nowhere").status, 404);

    let help = get(ctx, "/authors/keys/help");
    assert_eq!(help.status, 200);
    assert!(!help.body_text().contains("<REPO_ID>"));

    assert_eq!(get(ctx, "/nowhere/keys").status, 404);
    assert_eq!(get(ctx, "/authors/no-such-endpoint").status, 404);
    assert!(get(ctx, "/favicon.ico").body.is_empty());

    let put = send(ctx, "PUT", "/authors/keys", "", "");
    assert_eq!(put.status, 405);
    assert_eq!(put.body_text(), "ERROR: 405 Method Not Allowed");
}

fn document(reply: &Reply) -> String {
    assert_eq!(reply.status, 200, "unexpected reply: {}", reply.body_text());
    assert_eq!(reply.content_type, "text/plain");
    let text = reply.body_text();
    assert!(!text.contains("<REPO_ID>"), "placeholder left in {text}");
    text
}

#[test]
fn endpoints_without_arguments_return_their_document() {
    let fixture = fixture(false);
    let ctx = &fixture.ctx;

    for endpoint in ["created", "updated", "deleted", "pubdate"] {
        let text = document(&get(ctx, &format!("/authors/{endpoint}")));
        assert!(text.contains(&format!("/authors/{endpoint}/<START>")), "{endpoint}");
    }
    assert!(document(&get(ctx, "/authors/doi")).contains("/authors/doi/<DOI>"));
    assert!(document(&get(ctx, "/authors/record")).contains("/authors/record/<EPRINT_ID>"));
    assert!(document(&get(ctx, "/authors/eprint")).contains("/authors/eprint/<EPRINT_ID>"));
    assert!(document(&get(ctx, "/thesis/creator-name")).contains("<FAMILY>/<GIVEN>"));
    assert!(document(&get(ctx, "/authors/eprint-import")).contains("/authors/eprint-import"));

    assert_eq!(
        json(&get(ctx, "/authors/creator-id")),
        serde_json::json!(["Lovelace-A"])
    );
    assert_eq!(ids(&get(ctx, "/thesis/keys")), vec![1, 2, 3, 4]);
}

#[test]
fn trailing_help_returns_the_endpoint_document() {
    let fixture = fixture(false);
    let ctx = &fixture.ctx;

    let created = document(&get(ctx, "/authors/created/help"));
    assert!(created.contains("/authors/created/<START>[/<END>]"));
    let with_args = document(&get(ctx, "/thesis/created/2021-01-01%2000:00/help"));
    assert!(with_args.contains("/thesis/created/<START>"));
    assert!(document(&get(ctx, "/authors/creator-id/help")).contains("/authors/<END-POINT>"));
    assert!(document(&get(ctx, "/authors/record/1/help")).contains("/authors/record/"));
}

#[test]
fn closed_service_routes_nothing() {
    let fixture = fixture(false);
    let ctx = &fixture.ctx;
    assert_eq!(ids(&get(ctx, "/authors/keys")), vec![1, 2, 3, 4]);

    ctx.close();
    assert_eq!(get(ctx, "/authors/keys").status, 404);
    assert_eq!(
        json(&get(ctx, "/repositories")),
        serde_json::json!(["authors", "thesis"])
    );
}
