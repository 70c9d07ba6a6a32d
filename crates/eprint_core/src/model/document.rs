//! Documents attached to a record and the files stored for each document.

use super::dates::DateParts;
use super::item::ItemList;
use serde::{Deserialize, Serialize};

fn is_zero(value: &i64) -> bool {
    *value == 0
}

/// One document (a rendition or attachment) of a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub docid: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub rev_number: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<File>,
    #[serde(skip_serializing_if = "is_zero")]
    pub eprintid: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub pos: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub placement: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mime_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub format: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub formatdesc: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub language: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub security: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub license: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub main: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub date_embargo: String,
    #[serde(skip)]
    pub date_embargo_parts: DateParts,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub media_duration: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub media_audio_codec: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub media_video_codec: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub media_width: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub media_height: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub media_aspect_ratio: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub media_sample_start: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub media_sample_stop: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(skip_serializing_if = "ItemList::is_empty")]
    pub relation: ItemList,
}

/// One stored file of a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct File {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub fileid: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub datasetid: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub objectid: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub filename: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mime_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hash: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hash_type: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub filesize: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mtime: String,
    #[serde(skip)]
    pub mtime_parts: DateParts,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
}
