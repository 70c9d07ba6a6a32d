//! Canonical in-memory bibliographic record.
//!
//! # Responsibility
//! - Hold every scalar field of the main `eprint` table, the ordered item
//!   lists of its auxiliary tables and the attached documents.
//! - Define the native document field order through serde.
//!
//! # Invariants
//! - Split date components are storage-only and never serialized; the
//!   composite strings (`datestamp`, `date`, ...) are their public form.
//! - Composite strings are derived by `derive_composite_dates`, never
//!   hand-maintained alongside the parts.

use super::dates::DateParts;
use super::document::Document;
use super::item::ItemList;
use serde::{Deserialize, Serialize};

fn is_zero(value: &i64) -> bool {
    *value == 0
}

fn is_zero_f64(value: &f64) -> bool {
    *value == 0.0
}

/// Record lifecycle status values stored in `eprint_status`.
pub const STATUS_INBOX: &str = "inbox";
pub const STATUS_BUFFER: &str = "buffer";
pub const STATUS_ARCHIVE: &str = "archive";
pub const STATUS_DELETION: &str = "deletion";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "eprint_id", skip_serializing_if = "is_zero")]
    pub eprintid: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub rev_number: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<Document>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub eprint_status: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub userid: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub dir: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub datestamp: String,
    #[serde(skip)]
    pub datestamp_parts: DateParts,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub lastmod: String,
    #[serde(skip)]
    pub lastmod_parts: DateParts,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub status_changed: String,
    #[serde(skip)]
    pub status_changed_parts: DateParts,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub metadata_visibility: String,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub creators: ItemList,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ispublished: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub full_text_status: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub keywords: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub note: String,
    #[serde(rename = "abstract", skip_serializing_if = "String::is_empty")]
    pub abstract_text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub date: String,
    #[serde(skip)]
    pub date_parts: DateParts,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub date_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub series: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub publication: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub volume: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub number: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub publisher: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub place_of_pub: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub edition: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pagerange: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub pages: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub event_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub event_title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub event_location: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub event_dates: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id_number: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub refereed: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub isbn: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub issn: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub book_title: String,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub editors: ItemList,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub official_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub alt_url: String,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub related_url: ItemList,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub referencetext: ItemList,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub projects: ItemList,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub rights: String,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub funders: ItemList,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub collection: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reviewer: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub official_cit: String,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub other_numbering_system: ItemList,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub local_group: ItemList,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub errata: String,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub contributors: ItemList,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub monograph_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub suggestions: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub coverage_dates: String,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub subjects: ItemList,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pres_type: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub succeeds: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub commentary: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub contact_email: String,
    #[serde(skip)]
    pub fileinfo: String,
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub latitude: f64,
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub longitude: f64,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub item_issues: ItemList,
    #[serde(skip_serializing_if = "is_zero")]
    pub item_issues_count: i64,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub corp_creators: ItemList,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub corp_contributors: ItemList,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub department: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub output_media: String,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub exhibitors: ItemList,
    #[serde(skip_serializing_if = "is_zero")]
    pub num_pieces: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub composition_type: String,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub producers: ItemList,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub conductors: ItemList,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub lyricists: ItemList,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub accompaniment: ItemList,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub data_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pedagogic_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub completion_time: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub task_purpose: String,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub skill_areas: ItemList,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub copyright_holders: ItemList,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub learning_level: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub doi: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pmc_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pmid: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub parent_url: String,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub reference: ItemList,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub conf_creators: ItemList,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub alt_title: ItemList,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub toc: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub interviewer: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub interviewdate: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub nonsubj_keywords: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub season: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub classification_code: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sword_depository: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub sword_depositor: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sword_slug: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub importid: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub patent_applicant: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub patent_number: String,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub patent_assignee: ItemList,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub patent_classification: String,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub related_patents: ItemList,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub divisions: ItemList,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub institution: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thesis_type: String,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub thesis_advisor: ItemList,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub thesis_committee: ItemList,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thesis_degree: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thesis_degree_grantor: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thesis_degree_date: String,
    #[serde(skip)]
    pub thesis_degree_date_parts: DateParts,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thesis_submitted_date: String,
    #[serde(skip)]
    pub thesis_submitted_date_parts: DateParts,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thesis_defense_date: String,
    #[serde(skip)]
    pub thesis_defense_date_parts: DateParts,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thesis_approved_date: String,
    #[serde(skip)]
    pub thesis_approved_date_parts: DateParts,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thesis_public_date: String,
    #[serde(skip)]
    pub thesis_public_date_parts: DateParts,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thesis_author_email: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hide_thesis_author_email: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub gradofc_approval_date: String,
    #[serde(skip)]
    pub gradofc_approval_date_parts: DateParts,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thesis_awards: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub review_status: String,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub option_major: ItemList,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub option_minor: ItemList,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub copyright_statement: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub source: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub replacedby: i64,
    #[serde(skip)]
    pub edit_lock_user: i64,
    #[serde(skip)]
    pub edit_lock_since: i64,
    #[serde(skip)]
    pub edit_lock_until: i64,
}

impl Record {
    /// Publication date when the date type says so, else empty.
    pub fn pub_date(&self) -> &str {
        if self.date_type == "published" {
            self.date.as_str()
        } else {
            ""
        }
    }

    /// Fills composite date strings from their split components.
    ///
    /// Thesis and grad-office dates keep a stored composite value when
    /// their parts are incomplete.
    pub fn derive_composite_dates(&mut self) {
        self.datestamp = self.datestamp_parts.timestamp();
        self.lastmod = self.lastmod_parts.timestamp();
        self.status_changed = self.status_changed_parts.timestamp();
        self.date = self.date_parts.approx_date();

        let derived = [
            (
                &mut self.thesis_degree_date,
                self.thesis_degree_date_parts.full_date(),
            ),
            (
                &mut self.thesis_submitted_date,
                self.thesis_submitted_date_parts.full_date(),
            ),
            (
                &mut self.thesis_defense_date,
                self.thesis_defense_date_parts.full_date(),
            ),
            (
                &mut self.thesis_approved_date,
                self.thesis_approved_date_parts.full_date(),
            ),
            (
                &mut self.thesis_public_date,
                self.thesis_public_date_parts.full_date(),
            ),
            (
                &mut self.gradofc_approval_date,
                self.gradofc_approval_date_parts.full_date(),
            ),
        ];
        for (slot, value) in derived {
            if !value.is_empty() {
                *slot = value;
            }
        }
    }

    /// Fills split components from composite date strings. Used on import.
    pub fn derive_split_dates(&mut self) {
        if !self.date.is_empty() {
            self.date_parts = DateParts::from_approx(&self.date);
        }
        let pairs = [
            (&self.thesis_degree_date, &mut self.thesis_degree_date_parts),
            (
                &self.thesis_submitted_date,
                &mut self.thesis_submitted_date_parts,
            ),
            (&self.thesis_defense_date, &mut self.thesis_defense_date_parts),
            (
                &self.thesis_approved_date,
                &mut self.thesis_approved_date_parts,
            ),
            (&self.thesis_public_date, &mut self.thesis_public_date_parts),
            (
                &self.gradofc_approval_date,
                &mut self.gradofc_approval_date_parts,
            ),
        ];
        for (composite, parts) in pairs {
            if !composite.is_empty() {
                *parts = DateParts::from_approx(composite);
            }
        }
    }

    /// Named item list by its attribute name (`creators`, `funders`, ...).
    pub fn item_list(&self, name: &str) -> Option<&ItemList> {
        let list = match name {
            "creators" => &self.creators,
            "editors" => &self.editors,
            "contributors" => &self.contributors,
            "corp_creators" => &self.corp_creators,
            "corp_contributors" => &self.corp_contributors,
            "conf_creators" => &self.conf_creators,
            "thesis_advisor" => &self.thesis_advisor,
            "thesis_committee" => &self.thesis_committee,
            "exhibitors" => &self.exhibitors,
            "producers" => &self.producers,
            "conductors" => &self.conductors,
            "lyricists" => &self.lyricists,
            "funders" => &self.funders,
            "local_group" => &self.local_group,
            "related_url" => &self.related_url,
            "referencetext" => &self.referencetext,
            "projects" => &self.projects,
            "other_numbering_system" => &self.other_numbering_system,
            "subjects" => &self.subjects,
            "item_issues" => &self.item_issues,
            "accompaniment" => &self.accompaniment,
            "skill_areas" => &self.skill_areas,
            "copyright_holders" => &self.copyright_holders,
            "reference" => &self.reference,
            "alt_title" => &self.alt_title,
            "patent_assignee" => &self.patent_assignee,
            "related_patents" => &self.related_patents,
            "divisions" => &self.divisions,
            "option_major" => &self.option_major,
            "option_minor" => &self.option_minor,
            _ => return None,
        };
        Some(list)
    }

    pub fn item_list_mut(&mut self, name: &str) -> Option<&mut ItemList> {
        let list = match name {
            "creators" => &mut self.creators,
            "editors" => &mut self.editors,
            "contributors" => &mut self.contributors,
            "corp_creators" => &mut self.corp_creators,
            "corp_contributors" => &mut self.corp_contributors,
            "conf_creators" => &mut self.conf_creators,
            "thesis_advisor" => &mut self.thesis_advisor,
            "thesis_committee" => &mut self.thesis_committee,
            "exhibitors" => &mut self.exhibitors,
            "producers" => &mut self.producers,
            "conductors" => &mut self.conductors,
            "lyricists" => &mut self.lyricists,
            "funders" => &mut self.funders,
            "local_group" => &mut self.local_group,
            "related_url" => &mut self.related_url,
            "referencetext" => &mut self.referencetext,
            "projects" => &mut self.projects,
            "other_numbering_system" => &mut self.other_numbering_system,
            "subjects" => &mut self.subjects,
            "item_issues" => &mut self.item_issues,
            "accompaniment" => &mut self.accompaniment,
            "skill_areas" => &mut self.skill_areas,
            "copyright_holders" => &mut self.copyright_holders,
            "reference" => &mut self.reference,
            "alt_title" => &mut self.alt_title,
            "patent_assignee" => &mut self.patent_assignee,
            "related_patents" => &mut self.related_patents,
            "divisions" => &mut self.divisions,
            "option_major" => &mut self.option_major,
            "option_minor" => &mut self.option_minor,
            _ => return None,
        };
        Some(list)
    }
}

/// Envelope of the native document: `{"eprint": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EPrints {
    #[serde(rename = "eprint")]
    pub records: Vec<Record>,
}
