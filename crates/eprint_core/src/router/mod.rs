//! Capability-gated endpoint routing.
//!
//! # Responsibility
//! - Declare every lookup endpoint with the schema capability it needs.
//! - Build one route table per repository from its probed schema.
//!
//! # Invariants
//! - An endpoint is routed iff its requirement holds for the schema.
//! - Route tables are built once at start and never change afterwards.
//!
//! # See also
//! - `schema::probe_schema` for capability discovery.
//! - `dispatch::dispatch` for request handling.

pub mod docs;
pub mod handlers;

pub use handlers::{Call, Handler};

use crate::query::RangeField;
use crate::schema::SchemaMap;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Schema capability an endpoint depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Always,
    Column(&'static str, &'static str),
    Table(&'static str),
}

impl Requirement {
    pub fn is_met(self, schema: &SchemaMap) -> bool {
        match self {
            Self::Always => true,
            Self::Column(table, column) => schema.has_column(table, column),
            Self::Table(table) => schema.has_table(table),
        }
    }
}

#[derive(Debug)]
pub struct EndpointSpec {
    pub name: &'static str,
    pub requires: Requirement,
    pub handler: Handler,
    /// Help document; may contain `<REPO_ID>`.
    pub doc: &'static str,
    /// A call without arguments lists values instead of serving `doc`.
    pub lists_values: bool,
}

impl EndpointSpec {
    /// True when the call is a request for the help document.
    pub fn serves_document(&self, method: &str, args: &[String]) -> bool {
        match self.handler {
            Handler::Import => method == "GET",
            _ => args.is_empty() && !self.lists_values,
        }
    }
}

const fn endpoint(
    name: &'static str,
    requires: Requirement,
    handler: Handler,
    doc: &'static str,
) -> EndpointSpec {
    EndpointSpec {
        name,
        requires,
        handler,
        doc,
        lists_values: false,
    }
}

const fn listing(
    name: &'static str,
    requires: Requirement,
    handler: Handler,
    doc: &'static str,
) -> EndpointSpec {
    EndpointSpec {
        lists_values: true,
        ..endpoint(name, requires, handler, doc)
    }
}

const fn id_lookup(name: &'static str, table: &'static str, column: &'static str) -> EndpointSpec {
    listing(
        name,
        Requirement::Column(table, column),
        Handler::Exact { table, column },
        docs::ID_LOOKUP,
    )
}

/// Key lookups on optional `eprint` columns; no listing form.
const fn key_lookup(name: &'static str, table: &'static str, column: &'static str) -> EndpointSpec {
    endpoint(
        name,
        Requirement::Column(table, column),
        Handler::Exact { table, column },
        docs::KEY_LOOKUP,
    )
}

const fn name_lookup(name: &'static str, table: &'static str, list: &'static str) -> EndpointSpec {
    endpoint(
        name,
        Requirement::Table(table),
        Handler::PersonName { list },
        docs::NAME_LOOKUP,
    )
}

pub static ENDPOINTS: &[EndpointSpec] = &[
    listing("keys", Requirement::Always, Handler::Keys, docs::KEYS),
    endpoint(
        "created",
        Requirement::Always,
        Handler::Range(RangeField::Created),
        docs::CREATED,
    ),
    endpoint(
        "updated",
        Requirement::Always,
        Handler::Range(RangeField::Updated),
        docs::UPDATED,
    ),
    endpoint(
        "deleted",
        Requirement::Always,
        Handler::Range(RangeField::Deleted),
        docs::DELETED,
    ),
    endpoint(
        "pubdate",
        Requirement::Always,
        Handler::Range(RangeField::Published),
        docs::PUBDATE,
    ),
    endpoint("doi", Requirement::Always, Handler::Doi, docs::DOI),
    endpoint("record", Requirement::Always, Handler::Record, docs::RECORD),
    endpoint("eprint", Requirement::Always, Handler::EPrint, docs::EPRINT),
    endpoint(
        "eprint-import",
        Requirement::Always,
        Handler::Import,
        docs::EPRINT_IMPORT,
    ),
    listing(
        "issn",
        Requirement::Always,
        Handler::Exact {
            table: "eprint",
            column: "issn",
        },
        docs::ISSN,
    ),
    listing(
        "isbn",
        Requirement::Always,
        Handler::Exact {
            table: "eprint",
            column: "isbn",
        },
        docs::ISBN,
    ),
    listing("year", Requirement::Always, Handler::Year, docs::YEAR),
    id_lookup("creator-id", "eprint_creators_id", "creators_id"),
    id_lookup("creator-orcid", "eprint_creators_orcid", "creators_orcid"),
    name_lookup("creator-name", "eprint_creators_name", "creators"),
    id_lookup("editor-id", "eprint_editors_id", "editors_id"),
    name_lookup("editor-name", "eprint_editors_name", "editors"),
    id_lookup("contributor-id", "eprint_contributors_id", "contributors_id"),
    name_lookup("contributor-name", "eprint_contributors_name", "contributors"),
    id_lookup("advisor-id", "eprint_thesis_advisor_id", "thesis_advisor_id"),
    name_lookup("advisor-name", "eprint_thesis_advisor_name", "thesis_advisor"),
    id_lookup("committee-id", "eprint_thesis_committee_id", "thesis_committee_id"),
    name_lookup(
        "committee-name",
        "eprint_thesis_committee_name",
        "thesis_committee",
    ),
    id_lookup("group-id", "eprint_local_group", "local_group"),
    id_lookup("funder-id", "eprint_funders_agency", "funders_agency"),
    id_lookup(
        "grant-number",
        "eprint_funders_grant_number",
        "funders_grant_number",
    ),
    key_lookup("pmid", "eprint", "pmid"),
    key_lookup("pmcid", "eprint", "pmc_id"),
    key_lookup("patent-applicant", "eprint", "patent_applicant"),
    key_lookup("patent-number", "eprint", "patent_number"),
    key_lookup("patent-classification", "eprint", "patent_classification"),
    key_lookup("patent-assignee", "eprint_patent_assignee", "patent_assignee"),
];

/// Looks an endpoint up in the full catalogue, routed or not.
pub fn endpoint_spec(name: &str) -> Option<&'static EndpointSpec> {
    ENDPOINTS.iter().find(|spec| spec.name == name)
}

/// Endpoints routed for one repository.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: BTreeMap<&'static str, &'static EndpointSpec>,
}

impl RouteTable {
    pub fn for_schema(schema: &SchemaMap) -> Self {
        let routes = ENDPOINTS
            .iter()
            .filter(|spec| spec.requires.is_met(schema))
            .map(|spec| (spec.name, spec))
            .collect();
        Self { routes }
    }

    pub fn get(&self, name: &str) -> Option<&'static EndpointSpec> {
        self.routes.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    /// Routed endpoint names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.routes.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    DuplicateRepository(String),
}

impl Display for RouteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateRepository(id) => write!(f, "repository already routed: {id}"),
        }
    }
}

impl Error for RouteError {}

/// Repository id → route table.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    tables: BTreeMap<String, RouteTable>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, repository: &str, table: RouteTable) -> Result<(), RouteError> {
        if self.tables.contains_key(repository) {
            return Err(RouteError::DuplicateRepository(repository.to_string()));
        }
        self.tables.insert(repository.to_string(), table);
        Ok(())
    }

    pub fn get(&self, repository: &str) -> Option<&RouteTable> {
        self.tables.get(repository)
    }

    pub fn repository_ids(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
