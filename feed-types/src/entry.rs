//! Validated feed entries.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::fields;
use crate::{AuthorId, DecodeError, OrderKey, Record};

/// One row of the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    /// Who wrote the entry. Never empty.
    pub author_id: AuthorId,
    /// Message body. Never empty.
    pub content: String,
    /// Server-assigned ordering key.
    pub order_key: OrderKey,
}

impl FeedEntry {
    /// Create an entry directly (tests, fixtures).
    pub fn new(author_id: AuthorId, content: impl Into<String>, order_key: OrderKey) -> Self {
        Self {
            author_id,
            content: content.into(),
            order_key,
        }
    }

    /// Decode and validate an untyped record.
    ///
    /// All three fields are required. A record that is missing one, holds one
    /// with the wrong shape, or carries an empty string is rejected whole.
    pub fn decode(record: &Record) -> Result<Self, DecodeError> {
        let author = required_str(record, fields::AUTHOR_ID)?;
        let content = required_str(record, fields::CONTENT)?;
        let order_key = required_key(record, fields::ORDER_KEY)?;

        let author_id = AuthorId::new(author).ok_or(DecodeError::EmptyField {
            field: fields::AUTHOR_ID,
        })?;

        Ok(Self {
            author_id,
            content: content.to_string(),
            order_key,
        })
    }
}

fn required<'a>(record: &'a Record, field: &'static str) -> Result<&'a Value, DecodeError> {
    record.get(field).ok_or(DecodeError::MissingField { field })
}

fn required_str<'a>(record: &'a Record, field: &'static str) -> Result<&'a str, DecodeError> {
    let value = required(record, field)?
        .as_str()
        .ok_or(DecodeError::WrongType {
            field,
            expected: "string",
        })?;
    if value.is_empty() {
        return Err(DecodeError::EmptyField { field });
    }
    Ok(value)
}

fn required_key(record: &Record, field: &'static str) -> Result<OrderKey, DecodeError> {
    required(record, field)?
        .as_u64()
        .map(OrderKey::new)
        .ok_or(DecodeError::WrongType {
            field,
            expected: "unsigned integer",
        })
}
