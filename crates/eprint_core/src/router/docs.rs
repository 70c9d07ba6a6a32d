//! Plain-text help documents.
//!
//! Every document may contain `<REPO_ID>`; `render` substitutes it.

pub const REPO_PLACEHOLDER: &str = "<REPO_ID>";

pub fn render(doc: &str, repository: &str) -> String {
    doc.replace(REPO_PLACEHOLDER, repository)
}

pub const README: &str = r#"
EPrints lookup service
======================

Read-oriented lookups over the relational store of one or more EPrints
repositories. Paths have the form `/<REPO_ID>/<END-POINT>/<ARGS>`.
Append `/help` to any end point for its document.

Configuration
-------------

- `/repositories` returns the configured repository ids.
- `/repository/<REPO_ID>` returns the tables and columns of a repository.

Unique id to EPrint id
----------------------

- `/<REPO_ID>/doi/<DOI>` ids with that DOI
- `/<REPO_ID>/issn[/<ISSN>]`, `/<REPO_ID>/isbn[/<ISBN>]`
- `/<REPO_ID>/pmid/<PMID>`, `/<REPO_ID>/pmcid/<PMCID>` when present
- `/<REPO_ID>/creator-id[/<ID>]`, `/<REPO_ID>/creator-orcid[/<ORCID>]`
- `/<REPO_ID>/editor-id[/<ID>]`, `/<REPO_ID>/contributor-id[/<ID>]`
- `/<REPO_ID>/advisor-id[/<ID>]`, `/<REPO_ID>/committee-id[/<ID>]`
- `/<REPO_ID>/creator-name/<FAMILY>/<GIVEN>` and the editor, contributor,
  advisor and committee variants
- `/<REPO_ID>/group-id[/<GROUP>]`, `/<REPO_ID>/funder-id[/<AGENCY>]`,
  `/<REPO_ID>/grant-number[/<GRANT>]`
- `/<REPO_ID>/patent-applicant/<VALUE>` and likewise `patent-number`,
  `patent-classification`, `patent-assignee` when present
- `/<REPO_ID>/year[/<YEAR>]`

Without an argument `keys`, `year`, `issn`, `isbn` and the `*-id`,
`group-id`, `funder-id` and `grant-number` end points list their known
values. Every other end point returns its document.

Change events
-------------

- `/<REPO_ID>/keys` every EPrint id
- `/<REPO_ID>/created/<TIMESTAMP>[/<TIMESTAMP>]`
- `/<REPO_ID>/updated/<TIMESTAMP>[/<TIMESTAMP>]`
- `/<REPO_ID>/deleted/<TIMESTAMP>[/<TIMESTAMP>]`
- `/<REPO_ID>/pubdate/<APPROX_DATE>[/<APPROX_DATE>]`

Records
-------

- `/<REPO_ID>/record/<EPRINT_ID>` simplified JSON of a public record
- `/<REPO_ID>/eprint/<EPRINT_ID>` native EPrints XML or JSON (GET)
- `/<REPO_ID>/eprint-import` native XML or JSON (POST, write enabled)
"#;

pub const REPOSITORIES: &str = r#"
Repositories
============

`/repositories` returns a JSON array of the repository ids this service
is configured for.
"#;

pub const REPOSITORY: &str = r#"
Repository
==========

`/repository/<REPO_ID>` returns a JSON object mapping each record table
of the repository to its column names in declared order.
"#;

pub const KEYS: &str = r#"
keys
====

`/<REPO_ID>/keys` returns a JSON array of every EPrint id in ascending
order.
"#;

pub const CREATED: &str = r#"
created
=======

`/<REPO_ID>/created/<START>[/<END>]` returns EPrint ids deposited between
two timestamps, inclusive. Timestamps are `YYYY-MM-DD HH:MM:SS`,
`YYYY-MM-DD HH:MM` or `now`. A missing end is `now`.
"#;

pub const UPDATED: &str = r#"
updated
=======

`/<REPO_ID>/updated/<START>[/<END>]` returns EPrint ids last modified
between two timestamps, inclusive. Timestamps are `YYYY-MM-DD HH:MM:SS`,
`YYYY-MM-DD HH:MM` or `now`. A missing end is `now`.
"#;

pub const DELETED: &str = r#"
deleted
=======

`/<REPO_ID>/deleted/<START>[/<END>]` returns ids of records in deletion
status last modified between two timestamps, inclusive.
"#;

pub const PUBDATE: &str = r#"
pubdate
=======

`/<REPO_ID>/pubdate/<START>[/<END>]` returns ids of records published
between two approximate dates, inclusive. `YYYY` spans the year,
`YYYY-MM` the month and `YYYY-MM-DD` one day. A missing end is today.
"#;

pub const DOI: &str = r#"
doi
===

`/<REPO_ID>/doi/<DOI>` returns the EPrint ids carrying the DOI. The DOI
may contain slashes.
"#;

pub const RECORD: &str = r#"
record
======

`/<REPO_ID>/record/<EPRINT_ID>` returns the simplified JSON record of a
public EPrint. Restricted or missing records are not found.
"#;

pub const EPRINT: &str = r#"
eprint
======

`/<REPO_ID>/eprint/<EPRINT_ID>` (GET) returns the native record. Send
`Content-Type: application/json` for JSON; `application/xml` or no
content type returns EPrints XML.
"#;

pub const EPRINT_IMPORT: &str = r#"
eprint-import
=============

`/<REPO_ID>/eprint-import` (POST) accepts an EPrints XML document
(`application/xml`) or its JSON form (`application/json`). Records with
id 0 are created, others replace the stored record. Returns a JSON array
of the written ids. The repository must have `"write": true`. A GET
returns this document.
"#;

pub const ISSN: &str = r#"
issn
====

`/<REPO_ID>/issn[/<ISSN>]` lists known ISSNs or returns the ids for one.
"#;

pub const ISBN: &str = r#"
isbn
====

`/<REPO_ID>/isbn[/<ISBN>]` lists known ISBNs or returns the ids for one.
"#;

pub const YEAR: &str = r#"
year
====

`/<REPO_ID>/year` lists years with published records, newest first.
`/<REPO_ID>/year/<YEAR>` returns the published record ids of a year.
"#;

pub const ID_LOOKUP: &str = r#"
id lookup
=========

`/<REPO_ID>/<END-POINT>` lists the known values.
`/<REPO_ID>/<END-POINT>/<VALUE>` returns the EPrint ids carrying the value.
"#;

pub const KEY_LOOKUP: &str = r#"
key lookup
==========

`/<REPO_ID>/<END-POINT>/<VALUE>` returns the EPrint ids carrying the value.
"#;

pub const NAME_LOOKUP: &str = r#"
name lookup
===========

`/<REPO_ID>/<END-POINT>/<FAMILY>/<GIVEN>` returns EPrint ids naming the
person, newest publication first. `*` matches any run of characters.
"#;

#[cfg(test)]
mod tests {
    use super::{render, README};

    #[test]
    fn render_substitutes_every_placeholder() {
        let text = render(README, "authors");
        assert!(!text.contains("<REPO_ID>"));
        assert!(text.contains("/authors/keys"));
    }
}
