//! Resource DTOs for the contacts and lists endpoints.
//!
//! # Design
//! These types mirror the vendor's JSON but are defined independently from
//! the mock-server crate; integration tests catch schema drift.
//!
//! The API only supports full-document replacement of a contact, so
//! `Contact` keeps the document exactly as the server sent it and writes it
//! back verbatim. A `Contact` is a snapshot: fields are private and the
//! membership operations hand out new snapshots rather than mutating one.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::reconcile::ListIds;

/// Visibility state of a contact list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListStatus {
    Hidden,
    Active,
    Removed,
}

/// A contact list as returned by `GET lists`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactList {
    pub id: String,
    pub name: String,
    pub status: ListStatus,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub modified_date: Option<String>,
    #[serde(default)]
    pub contact_count: Option<u64>,
}

/// Request payload for `POST lists`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewList {
    pub name: String,
    pub status: ListStatus,
}

impl NewList {
    pub fn new(name: impl Into<String>, status: ListStatus) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }
}

/// One entry of a contact's `lists` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListMembership {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ListMembership {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: None,
            extra: Map::new(),
        }
    }

    fn to_value(&self) -> Value {
        let mut entry = self.extra.clone();
        entry.insert("id".to_string(), Value::String(self.id.clone()));
        if let Some(status) = &self.status {
            entry.insert("status".to_string(), Value::String(status.clone()));
        }
        Value::Object(entry)
    }
}

/// One entry of a contact's `email_addresses` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailAddress {
    pub email_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opt_in_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Snapshot of a contact document.
///
/// The raw document is kept as received. The typed views are read from it,
/// and replacing memberships rewrites only the `"lists"` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Contact {
    id: String,
    email_addresses: Vec<EmailAddress>,
    lists: Vec<ListMembership>,
    raw: Map<String, Value>,
}

impl TryFrom<Map<String, Value>> for Contact {
    type Error = ApiError;

    fn try_from(raw: Map<String, Value>) -> Result<Self, ApiError> {
        let id = match raw.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            Some(other) => {
                return Err(ApiError::Deserialization(format!(
                    "contact id must be a string or number, got {other}"
                )))
            }
            None => return Err(ApiError::Deserialization("contact has no id".to_string())),
        };
        Ok(Self {
            id,
            email_addresses: decode_array(&raw, "email_addresses")?,
            lists: decode_array(&raw, "lists")?,
            raw,
        })
    }
}

impl From<Contact> for Map<String, Value> {
    fn from(contact: Contact) -> Self {
        contact.raw
    }
}

/// A missing or `null` array reads as empty.
fn decode_array<T: serde::de::DeserializeOwned>(
    raw: &Map<String, Value>,
    key: &str,
) -> Result<Vec<T>, ApiError> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| ApiError::Deserialization(format!("{key}: {e}"))),
    }
}

impl Contact {
    pub fn from_value(value: Value) -> Result<Self, ApiError> {
        match value {
            Value::Object(raw) => Self::try_from(raw),
            other => Err(ApiError::Deserialization(format!(
                "contact must be a JSON object, got {other}"
            ))),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Subscription status reported by the server, e.g. `ACTIVE` or `OPTOUT`.
    pub fn status(&self) -> Option<&str> {
        self.text("status")
    }

    pub fn first_name(&self) -> Option<&str> {
        self.text("first_name")
    }

    pub fn last_name(&self) -> Option<&str> {
        self.text("last_name")
    }

    /// The primary (first) email address.
    pub fn email(&self) -> Option<&str> {
        self.email_addresses
            .first()
            .map(|e| e.email_address.as_str())
    }

    pub fn email_addresses(&self) -> &[EmailAddress] {
        &self.email_addresses
    }

    pub fn lists(&self) -> &[ListMembership] {
        &self.lists
    }

    pub fn list_ids(&self) -> impl Iterator<Item = &str> {
        self.lists.iter().map(|l| l.id.as_str())
    }

    /// Any top-level field of the document.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.raw.get(name)
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.raw.get(name).and_then(Value::as_str)
    }

    pub fn is_member(&self, list: impl ListIds) -> bool {
        let wanted = list.into_list_ids();
        !wanted.is_empty() && wanted.iter().all(|id| self.list_ids().any(|own| own == id))
    }

    /// The full JSON document, as sent on replace.
    pub fn to_document(&self) -> Value {
        Value::Object(self.raw.clone())
    }

    /// A copy of this snapshot with its memberships replaced.
    ///
    /// Entries that were already in the document keep their raw JSON; new
    /// ones are written from their fields.
    pub(crate) fn with_lists(&self, lists: Vec<ListMembership>) -> Self {
        let previous: Vec<(&ListMembership, &Value)> = match self.raw.get("lists") {
            Some(Value::Array(entries)) => self.lists.iter().zip(entries).collect(),
            _ => Vec::new(),
        };
        let entries = lists
            .iter()
            .map(|membership| {
                previous
                    .iter()
                    .find(|(known, _)| *known == membership)
                    .map(|(_, raw)| (*raw).clone())
                    .unwrap_or_else(|| membership.to_value())
            })
            .collect();

        let mut raw = self.raw.clone();
        raw.insert("lists".to_string(), Value::Array(entries));
        Self {
            id: self.id.clone(),
            email_addresses: self.email_addresses.clone(),
            lists,
            raw,
        }
    }
}

/// Who is performing a create or update, sent as `action_by`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActionBy {
    /// The contact acted on their own behalf (sign-up form and similar).
    #[default]
    Visitor,
    /// The account owner acted on the contact's behalf.
    Owner,
}

impl ActionBy {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionBy::Visitor => "ACTION_BY_VISITOR",
            ActionBy::Owner => "ACTION_BY_OWNER",
        }
    }
}

/// Request payload for `POST contacts`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewContact {
    pub email: String,
    pub list_ids: Vec<String>,
    pub action_by: ActionBy,
    /// Extra top-level fields. Applied last, so they win over `email` and
    /// `list_ids` when the keys collide.
    pub fields: Map<String, Value>,
}

impl NewContact {
    pub fn new(email: impl Into<String>, lists: impl ListIds) -> Self {
        Self {
            email: email.into(),
            list_ids: lists.into_list_ids(),
            action_by: ActionBy::default(),
            fields: Map::new(),
        }
    }

    pub fn action_by(mut self, action_by: ActionBy) -> Self {
        self.action_by = action_by;
        self
    }

    pub fn first_name(self, name: impl Into<String>) -> Self {
        self.with_field("first_name", name.into())
    }

    pub fn last_name(self, name: impl Into<String>) -> Self {
        self.with_field("last_name", name.into())
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn to_document(&self) -> Value {
        let mut doc = Map::new();
        doc.insert(
            "email_addresses".to_string(),
            serde_json::json!([{ "email_address": self.email }]),
        );
        doc.insert(
            "lists".to_string(),
            Value::Array(
                self.list_ids
                    .iter()
                    .map(|id| serde_json::json!({ "id": id }))
                    .collect(),
            ),
        );
        for (key, value) in &self.fields {
            doc.insert(key.clone(), value.clone());
        }
        Value::Object(doc)
    }
}

/// Envelope of filtered collection endpoints such as `GET contacts?email=`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultSet<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}
