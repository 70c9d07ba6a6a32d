//! Simplified (Invenio-like) record.
//!
//! # Responsibility
//! - Map one assembled `Record` onto the simplified record layout used by
//!   downstream repository software.
//!
//! # Invariants
//! - Keyed collections are `BTreeMap`s so output bytes are stable.
//! - Files are always reported restricted; record visibility follows
//!   `is_public`.

use super::access::is_public;
use crate::model::record::STATUS_DELETION;
use crate::model::{Item, ItemList, Record};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;

pub const SIMPLE_RECORD_SCHEMA: &str = "local://records/record-v2.0.0.json";

const ACCESS_PUBLIC: &str = "public";
const ACCESS_RESTRICTED: &str = "restricted";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimpleRecord {
    #[serde(rename = "$schema")]
    pub schema: String,
    pub id: String,
    pub pids: Pids,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<Parent>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub external_pids: BTreeMap<String, ExternalPid>,
    pub access: Access,
    pub metadata: Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Files>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tombstone: Option<Tombstone>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pids {
    pub id: i64,
    pub pid: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parent {
    pub id: String,
    pub owned_by: Vec<User>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub user: i64,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalPid {
    pub identifier: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub provider: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Access {
    pub record: String,
    pub files: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embargo: Option<Embargo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embargo {
    pub active: bool,
    pub until: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata {
    pub resource_type: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub creators: Vec<Creator>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contributors: Vec<Creator>,
    pub title: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub additional_titles: Vec<TitleDetail>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub publication_date: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rights: Vec<Right>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<Subject>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dates: Vec<DateEntry>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub publisher: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub identifiers: Vec<Identifier>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub funding: Vec<Funding>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Creator {
    pub person_or_org: PersonOrOrg,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PersonOrOrg {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub family_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub given_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub identifiers: Vec<Identifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Role {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identifier {
    pub scheme: String,
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitleDetail {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Right {
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subject {
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateEntry {
    pub date: String,
    #[serde(rename = "type")]
    pub kind: DateKind,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateKind {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Funding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funder: Option<Funder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub award: Option<Award>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Funder {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Award {
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Files {
    pub enabled: bool,
    pub entries: BTreeMap<String, FileEntry>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub default_preview: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileEntry {
    pub file_id: String,
    pub size: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mimetype: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub checksum: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tombstone {
    pub removed_by: User,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reason: String,
}

/// Builds the simplified record for `record`.
pub fn to_simplified(record: &Record) -> SimpleRecord {
    let local_id = format!("{}:{}", record.collection, record.eprintid);
    let parent = (!record.reviewer.is_empty()).then(|| Parent {
        id: local_id.clone(),
        owned_by: vec![owner(record)],
    });
    let tombstone = (record.eprint_status == STATUS_DELETION).then(|| Tombstone {
        removed_by: owner(record),
        reason: record.suggestions.clone(),
    });

    SimpleRecord {
        schema: SIMPLE_RECORD_SCHEMA.to_string(),
        id: local_id,
        pids: Pids {
            id: record.eprintid,
            pid: BTreeMap::from([("eprint".to_string(), "eprintid".to_string())]),
        },
        parent,
        external_pids: external_pids(record),
        access: access(record),
        metadata: metadata(record),
        files: files(record),
        tombstone,
        created: iso_timestamp(&record.datestamp),
        updated: iso_timestamp(&record.lastmod),
    }
}

fn owner(record: &Record) -> User {
    User {
        user: record.userid,
        display_name: record.reviewer.clone(),
    }
}

fn external_pids(record: &Record) -> BTreeMap<String, ExternalPid> {
    let candidates = [
        ("doi", &record.doi, "datacite"),
        ("issn", &record.issn, ""),
        ("isbn", &record.isbn, ""),
    ];
    candidates
        .into_iter()
        .filter(|(_, value, _)| !value.is_empty())
        .map(|(key, value, provider)| {
            (
                key.to_string(),
                ExternalPid {
                    identifier: value.clone(),
                    provider: provider.to_string(),
                },
            )
        })
        .collect()
}

fn access(record: &Record) -> Access {
    let embargo = record
        .documents
        .iter()
        .find(|document| !document.date_embargo.is_empty())
        .map(|document| Embargo {
            active: document.security == "internal",
            until: document.date_embargo.clone(),
            reason: record.suggestions.clone(),
        });
    Access {
        record: if is_public(record) {
            ACCESS_PUBLIC
        } else {
            ACCESS_RESTRICTED
        }
        .to_string(),
        files: ACCESS_RESTRICTED.to_string(),
        embargo,
    }
}

fn files(record: &Record) -> Option<Files> {
    let mut entries = BTreeMap::new();
    let mut default_preview = String::new();
    for file in record.documents.iter().flat_map(|document| &document.files) {
        let checksum = if file.hash.is_empty() {
            String::new()
        } else {
            format!("{}:{}", file.hash_type.to_lowercase(), file.hash)
        };
        entries.insert(
            file.filename.clone(),
            FileEntry {
                file_id: file.url.clone(),
                size: file.filesize,
                mimetype: file.mime_type.clone(),
                checksum,
            },
        );
        if file.filename.starts_with("preview") {
            default_preview = file.filename.clone();
        }
    }
    if entries.is_empty() {
        return None;
    }
    Some(Files {
        enabled: true,
        entries,
        default_preview,
    })
}

fn resource_type(kind: &str) -> &str {
    match kind {
        "article" => "publication-article",
        other => other,
    }
}

fn metadata(record: &Record) -> Metadata {
    let mut creators = people(&record.creators, "creator_id");
    creators.extend(organisations(&record.corp_creators));

    let mut contributors = people(&record.contributors, "contributor_id");
    contributors.extend(organisations(&record.corp_contributors));
    contributors.extend(people(&record.editors, "editor_id"));
    contributors.extend(people(&record.thesis_advisor, "thesis_advisor_id"));
    contributors.extend(people(&record.thesis_committee, "thesis_committee_id"));

    Metadata {
        resource_type: BTreeMap::from([(
            "id".to_string(),
            resource_type(&record.kind).to_string(),
        )]),
        creators,
        contributors,
        title: record.title.clone(),
        additional_titles: record
            .alt_title
            .iter()
            .filter(|item| !item.value.trim().is_empty())
            .map(|item| TitleDetail {
                title: item.value.clone(),
            })
            .collect(),
        description: record.abstract_text.clone(),
        publication_date: record.pub_date().to_string(),
        rights: rights(record),
        subjects: record
            .subjects
            .iter()
            .map(|item| Subject {
                subject: item.value.clone(),
            })
            .collect(),
        dates: dates(record),
        version: if record.rev_number == 0 {
            String::new()
        } else {
            format!("v{}", record.rev_number)
        },
        publisher: publisher(record),
        identifiers: identifiers(record),
        funding: record.funders.iter().map(funding).collect(),
    }
}

/// Person entries; a local id scheme in `creator_id` etc. maps to `clpid`.
fn people(list: &ItemList, id_scheme: &str) -> Vec<Creator> {
    list.iter()
        .map(|item| {
            let mut identifiers = Vec::new();
            if !item.orcid.is_empty() {
                identifiers.push(identifier("orcid", &item.orcid));
            }
            if !item.id.is_empty() {
                let scheme = match id_scheme {
                    "creator_id" | "contributor_id" => "clpid",
                    other => other,
                };
                identifiers.push(identifier(scheme, &item.id));
            }
            Creator {
                person_or_org: PersonOrOrg {
                    kind: "personal".to_string(),
                    family_name: item.family_name().to_string(),
                    given_name: item.given_name().to_string(),
                    identifiers,
                    role: role(item),
                    ..PersonOrOrg::default()
                },
            }
        })
        .collect()
}

fn organisations(list: &ItemList) -> Vec<Creator> {
    list.iter()
        .map(|item| {
            let mut identifiers = Vec::new();
            if !item.ror.is_empty() {
                identifiers.push(identifier("ror", &item.ror));
            }
            if !item.id.is_empty() {
                identifiers.push(identifier("organization_id", &item.id));
            }
            Creator {
                person_or_org: PersonOrOrg {
                    kind: "organizational".to_string(),
                    name: item
                        .name
                        .as_ref()
                        .map(|name| name.value.clone())
                        .unwrap_or_default(),
                    identifiers,
                    role: role(item),
                    ..PersonOrOrg::default()
                },
            }
        })
        .collect()
}

fn role(item: &Item) -> Option<Role> {
    (!item.kind.is_empty()).then(|| Role {
        id: item.kind.clone(),
    })
}

fn identifier(scheme: &str, value: &str) -> Identifier {
    Identifier {
        scheme: scheme.to_lowercase(),
        identifier: value.to_string(),
    }
}

fn rights(record: &Record) -> Vec<Right> {
    let mut rights = Vec::new();
    let note = &record.note;
    let note_is_copyright =
        note.contains('©') || note.contains("copyright") || note.contains("(c)");
    if note_is_copyright {
        rights.push(Right {
            description: note.clone(),
        });
    } else if !record.rights.is_empty() {
        rights.push(Right {
            description: record.rights.clone(),
        });
    }
    if !record.copyright_statement.is_empty() {
        rights.push(Right {
            description: record.copyright_statement.clone(),
        });
    }
    rights
}

fn date_entry(kind: &str, value: &str, description: &str) -> DateEntry {
    DateEntry {
        date: value.chars().take(10).collect(),
        kind: DateKind {
            id: kind.to_string(),
            title: kind.to_string(),
        },
        description: description.to_string(),
    }
}

fn dates(record: &Record) -> Vec<DateEntry> {
    let mut dates = Vec::new();
    if record.date_type != "published" && !record.date.is_empty() {
        dates.push(date_entry("pub_date", &record.date, "Publication Date"));
    }
    if !record.datestamp.is_empty() {
        dates.push(date_entry(
            "created",
            &record.datestamp,
            "Created from EPrint's datestamp field",
        ));
    }
    if !record.lastmod.is_empty() {
        dates.push(date_entry(
            "updated",
            &record.lastmod,
            "Created from EPrint's last_modified field",
        ));
    }
    dates
}

/// Publisher, then publication, then (only without a DOI) institution.
fn publisher(record: &Record) -> String {
    if !record.publisher.is_empty() {
        record.publisher.clone()
    } else if !record.publication.is_empty() {
        record.publication.clone()
    } else if record.doi.is_empty() {
        record.institution.clone()
    } else {
        String::new()
    }
}

fn identifiers(record: &Record) -> Vec<Identifier> {
    [
        ("doi", &record.doi),
        ("isbn", &record.isbn),
        ("issn", &record.issn),
        ("pmcid", &record.pmc_id),
    ]
    .into_iter()
    .filter(|(_, value)| !value.is_empty())
    .map(|(scheme, value)| identifier(scheme, value))
    .collect()
}

fn funding(item: &Item) -> Funding {
    Funding {
        funder: (!item.agency.is_empty()).then(|| Funder {
            name: item.agency.clone(),
        }),
        award: (!item.grant_number.is_empty()).then(|| Award {
            number: item.grant_number.clone(),
        }),
    }
}

/// `YYYY-MM-DD[ HH:MM:SS]` → `YYYY-MM-DDTHH:MM:SSZ`; unparseable → `None`.
fn iso_timestamp(src: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }
    let parsed = if src.len() <= 10 {
        NaiveDateTime::parse_from_str(&format!("{src} 00:00:00"), "%Y-%m-%d %H:%M:%S")
    } else {
        NaiveDateTime::parse_from_str(src, "%Y-%m-%d %H:%M:%S")
    };
    parsed
        .ok()
        .map(|value| value.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

#[cfg(test)]
mod tests {
    use super::{to_simplified, SIMPLE_RECORD_SCHEMA};
    use crate::model::{Document, File, Item, Name, Record};

    fn sample() -> Record {
        let mut record = Record {
            eprintid: 1234,
            collection: "CaltechAUTHORS".to_string(),
            eprint_status: "archive".to_string(),
            metadata_visibility: "show".to_string(),
            kind: "article".to_string(),
            title: "Turbulent jets".to_string(),
            abstract_text: "We measure jets.".to_string(),
            date: "2019-06".to_string(),
            date_type: "published".to_string(),
            datestamp: "2019-07-01 10:11:12".to_string(),
            lastmod: "2020-01-02 03:04:05".to_string(),
            doi: "10.1000/jets".to_string(),
            issn: "1234-5678".to_string(),
            rev_number: 3,
            note: "(c) 2019 The Authors".to_string(),
            rights: "No commercial reproduction".to_string(),
            ..Record::default()
        };
        record.creators.push(Item {
            name: Name::person("", "Ada", "Lovelace", ""),
            id: "Lovelace-A".to_string(),
            orcid: "0000-0002-1825-0097".to_string(),
            ..Item::default()
        });
        record.corp_creators.push(Item {
            name: Name::organisation("GALCIT"),
            ..Item::default()
        });
        record.editors.push(Item {
            name: Name::person("", "Grace", "Hopper", ""),
            id: "Hopper-G".to_string(),
            ..Item::default()
        });
        record.funders.push(Item {
            agency: "NSF".to_string(),
            grant_number: "AST-1".to_string(),
            ..Item::default()
        });
        record.documents.push(Document {
            docid: 9,
            pos: 1,
            date_embargo: "2030-01-01".to_string(),
            security: "internal".to_string(),
            files: vec![
                File {
                    filename: "paper.pdf".to_string(),
                    url: "https://example.edu/1234/1/paper.pdf".to_string(),
                    filesize: 2048,
                    mime_type: "application/pdf".to_string(),
                    hash: "abc".to_string(),
                    hash_type: "MD5".to_string(),
                    ..File::default()
                },
                File {
                    filename: "preview.png".to_string(),
                    url: "https://example.edu/1234/1/preview.png".to_string(),
                    ..File::default()
                },
            ],
            ..Document::default()
        });
        record
    }

    #[test]
    fn serializing_twice_is_byte_identical() {
        let record = sample();
        let first = serde_json::to_string(&to_simplified(&record)).expect("json");
        let second = serde_json::to_string(&to_simplified(&record)).expect("json");
        assert_eq!(first, second);
    }

    #[test]
    fn maps_identity_access_and_metadata() {
        let simple = to_simplified(&sample());
        let value = serde_json::to_value(&simple).expect("json");

        assert_eq!(value["$schema"], SIMPLE_RECORD_SCHEMA);
        assert_eq!(value["id"], "CaltechAUTHORS:1234");
        assert_eq!(value["pids"]["id"], 1234);
        assert_eq!(value["pids"]["pid"]["eprint"], "eprintid");
        assert_eq!(value["external_pids"]["doi"]["provider"], "datacite");
        assert_eq!(value["external_pids"]["issn"]["identifier"], "1234-5678");
        assert!(value["external_pids"].get("isbn").is_none());

        assert_eq!(value["access"]["record"], "public");
        assert_eq!(value["access"]["files"], "restricted");
        assert_eq!(value["access"]["embargo"]["until"], "2030-01-01");
        assert_eq!(value["access"]["embargo"]["active"], true);

        let metadata = &value["metadata"];
        assert_eq!(metadata["resource_type"]["id"], "publication-article");
        assert_eq!(metadata["publication_date"], "2019-06");
        assert_eq!(metadata["version"], "v3");
        assert_eq!(metadata["creators"][0]["person_or_org"]["family_name"], "Lovelace");
        assert_eq!(
            metadata["creators"][0]["person_or_org"]["identifiers"][1]["scheme"],
            "clpid"
        );
        assert_eq!(metadata["creators"][1]["person_or_org"]["name"], "GALCIT");
        assert_eq!(
            metadata["contributors"][0]["person_or_org"]["identifiers"][0]["scheme"],
            "editor_id"
        );
        assert_eq!(metadata["rights"][0]["description"], "(c) 2019 The Authors");
        assert_eq!(metadata["funding"][0]["funder"]["name"], "NSF");
        assert_eq!(metadata["funding"][0]["award"]["number"], "AST-1");
        assert_eq!(metadata["dates"][0]["type"]["id"], "created");
        assert_eq!(metadata["dates"][0]["date"], "2019-07-01");
        assert!(metadata.get("publisher").is_none());

        assert_eq!(value["created"], "2019-07-01T10:11:12Z");
        assert_eq!(value["updated"], "2020-01-02T03:04:05Z");
    }

    #[test]
    fn files_are_keyed_by_name_with_checksum_and_preview() {
        let simple = to_simplified(&sample());
        let files = simple.files.expect("files");
        assert!(files.enabled);
        assert_eq!(files.entries["paper.pdf"].checksum, "md5:abc");
        assert_eq!(files.entries["paper.pdf"].size, 2048);
        assert_eq!(files.default_preview, "preview.png");
    }

    #[test]
    fn deleted_and_hidden_records_are_restricted_with_tombstone() {
        let mut record = sample();
        record.eprint_status = "deletion".to_string();
        record.reviewer = "archivist".to_string();
        record.suggestions = "duplicate".to_string();
        record.documents.clear();
        let simple = to_simplified(&record);
        assert_eq!(simple.access.record, "restricted");
        assert!(simple.access.embargo.is_none());
        assert!(simple.files.is_none());
        let tombstone = simple.tombstone.expect("tombstone");
        assert_eq!(tombstone.removed_by.display_name, "archivist");
        assert_eq!(tombstone.reason, "duplicate");
        assert!(simple.parent.is_some());
    }

    #[test]
    fn publisher_falls_back_without_doi() {
        let mut record = Record {
            institution: "Caltech".to_string(),
            ..Record::default()
        };
        assert_eq!(to_simplified(&record).metadata.publisher, "Caltech");
        record.publication = "J. Fluid Mech.".to_string();
        assert_eq!(to_simplified(&record).metadata.publisher, "J. Fluid Mech.");
    }
}
