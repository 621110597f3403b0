//! Untyped backend documents.
//!
//! The backend stores schemaless key/value documents. A [`Record`] is what
//! the backend hands back; a [`NewRecord`] is what clients submit. Clients
//! never write the ordering key: the backend stamps [`fields::ORDER_KEY`]
//! at commit time.

use serde_json::{Map, Value};

use crate::{AuthorId, OrderKey, RecordId};

/// Wire names of the record fields.
pub mod fields {
    /// Author of the entry (string).
    pub const AUTHOR_ID: &str = "authorID";
    /// Message body (string).
    pub const CONTENT: &str = "content";
    /// Server-assigned ordering key (unsigned integer).
    pub const ORDER_KEY: &str = "orderKey";
}

/// A stored document as delivered by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Backend-assigned document id.
    pub id: RecordId,
    /// The document's fields, as stored.
    pub fields: Map<String, Value>,
}

impl Record {
    /// Create a record from an id and raw fields.
    pub fn new(id: RecordId, fields: Map<String, Value>) -> Self {
        Self { id, fields }
    }

    /// Look up a raw field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Whether the field holds exactly the given string.
    pub fn field_equals(&self, field: &str, expected: &str) -> bool {
        matches!(self.get(field), Some(Value::String(s)) if s == expected)
    }
}

/// A document submitted by a client. Carries no ordering key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    /// Author of the entry.
    pub author_id: AuthorId,
    /// Message body.
    pub content: String,
}

impl NewRecord {
    /// Create a new submission.
    pub fn new(author_id: AuthorId, content: impl Into<String>) -> Self {
        Self {
            author_id,
            content: content.into(),
        }
    }

    /// The sentinel welcome submission.
    pub fn welcome(message: impl Into<String>) -> Self {
        Self::new(AuthorId::welcome(), message)
    }

    /// Build the stored field map, stamping the server-assigned key.
    ///
    /// Only backends call this; it is the commit step.
    pub fn into_fields(self, order_key: OrderKey) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(
            fields::AUTHOR_ID.to_string(),
            Value::String(self.author_id.as_str().to_string()),
        );
        map.insert(fields::CONTENT.to_string(), Value::String(self.content));
        map.insert(
            fields::ORDER_KEY.to_string(),
            Value::from(order_key.value()),
        );
        map
    }
}
