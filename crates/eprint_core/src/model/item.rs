//! Composite entries of repeatable record attributes.
//!
//! # Invariants
//! - `Item::pos` is the storage position; it is never serialized.
//! - An `ItemList` is kept in ascending position order.

use serde::{Deserialize, Serialize};

/// Person or organisation name. Organisations only carry `value`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Name {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub family: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub given: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub honourific: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub lineage: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value: String,
}

impl Name {
    /// Builds a trimmed person name; returns `None` when every part is blank.
    pub fn person(honourific: &str, given: &str, family: &str, lineage: &str) -> Option<Self> {
        let name = Self {
            family: family.trim().to_string(),
            given: given.trim().to_string(),
            honourific: honourific.trim().to_string(),
            lineage: lineage.trim().to_string(),
            value: String::new(),
        };
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }

    pub fn organisation(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            Some(Self {
                value: value.to_string(),
                ..Self::default()
            })
        }
    }

    pub fn is_empty(&self) -> bool {
        self.family.is_empty()
            && self.given.is_empty()
            && self.honourific.is_empty()
            && self.lineage.is_empty()
            && self.value.is_empty()
    }
}

/// One entry of an item list (creator, funder, subject, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Name>,
    #[serde(skip)]
    pub pos: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub show_email: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub role: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub agency: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub grant_number: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uri: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub orcid: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ror: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub timestamp: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reported_by: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub resolved_by: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub comment: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value: String,
}

impl Item {
    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    /// Sets one string attribute by its storage suffix. Returns `false`
    /// for attributes an item does not carry.
    pub fn set_attribute(&mut self, attribute: &str, value: &str) -> bool {
        let value = value.trim().to_string();
        let slot = match attribute {
            "id" => &mut self.id,
            "email" => &mut self.email,
            "show_email" => &mut self.show_email,
            "role" => &mut self.role,
            "url" => &mut self.url,
            "type" => &mut self.kind,
            "description" => &mut self.description,
            "agency" => &mut self.agency,
            "grant_number" => &mut self.grant_number,
            "uri" => &mut self.uri,
            "orcid" => &mut self.orcid,
            "ror" => &mut self.ror,
            "timestamp" => &mut self.timestamp,
            "status" => &mut self.status,
            "reported_by" => &mut self.reported_by,
            "resolved_by" => &mut self.resolved_by,
            "comment" => &mut self.comment,
            "value" => &mut self.value,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// Reads one string attribute by its storage suffix.
    pub fn attribute(&self, attribute: &str) -> Option<&str> {
        let value = match attribute {
            "id" => &self.id,
            "email" => &self.email,
            "show_email" => &self.show_email,
            "role" => &self.role,
            "url" => &self.url,
            "type" => &self.kind,
            "description" => &self.description,
            "agency" => &self.agency,
            "grant_number" => &self.grant_number,
            "uri" => &self.uri,
            "orcid" => &self.orcid,
            "ror" => &self.ror,
            "timestamp" => &self.timestamp,
            "status" => &self.status,
            "reported_by" => &self.reported_by,
            "resolved_by" => &self.resolved_by,
            "comment" => &self.comment,
            "value" => &self.value,
            _ => return None,
        };
        Some(value.as_str())
    }

    pub fn family_name(&self) -> &str {
        self.name.as_ref().map_or("", |name| name.family.as_str())
    }

    pub fn given_name(&self) -> &str {
        self.name.as_ref().map_or("", |name| name.given.as_str())
    }
}

/// Ordered list of items; serializes as `{"items": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemList {
    pub items: Vec<Item>,
}

impl ItemList {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn push(&mut self, item: Item) {
        self.items.push(item);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }
}

impl FromIterator<Item> for ItemList {
    fn from_iter<T: IntoIterator<Item = Item>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
