//! Item values and write inputs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a stored item
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(String);

impl ItemId {
    pub(crate) fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A stored or computed field value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Text(String),
    Timestamp(DateTime<Utc>),
    Item(ItemId),
    Items(Vec<ItemId>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Text rendering used by list views
    pub fn display(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Text(s) => s.clone(),
            Value::Timestamp(t) => t.to_rfc3339(),
            Value::Item(id) => id.to_string(),
            Value::Items(ids) => ids.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", "),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Timestamp(t)
    }
}

/// Change to the links of one relationship field
#[derive(Debug, Clone, PartialEq)]
pub enum RelationInput {
    /// Add links (replaces the current one on a to-one side)
    Connect(Vec<ItemId>),
    /// Remove the given links
    Disconnect(Vec<ItemId>),
    /// Remove every link
    DisconnectAll,
    /// Replace all links
    Set(Vec<ItemId>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldInput {
    Value(Value),
    Relation(RelationInput),
}

/// Field values for a create or update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemInput {
    pub fields: BTreeMap<String, FieldInput>,
}

impl ItemInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(field.to_string(), FieldInput::Value(value.into()));
        self
    }

    pub fn null(mut self, field: &str) -> Self {
        self.fields.insert(field.to_string(), FieldInput::Value(Value::Null));
        self
    }

    pub fn connect(mut self, field: &str, id: &ItemId) -> Self {
        self.fields.insert(
            field.to_string(),
            FieldInput::Relation(RelationInput::Connect(vec![id.clone()])),
        );
        self
    }

    pub fn connect_many(mut self, field: &str, ids: &[ItemId]) -> Self {
        self.fields.insert(
            field.to_string(),
            FieldInput::Relation(RelationInput::Connect(ids.to_vec())),
        );
        self
    }

    pub fn disconnect(mut self, field: &str, ids: &[ItemId]) -> Self {
        self.fields.insert(
            field.to_string(),
            FieldInput::Relation(RelationInput::Disconnect(ids.to_vec())),
        );
        self
    }

    pub fn disconnect_all(mut self, field: &str) -> Self {
        self.fields.insert(
            field.to_string(),
            FieldInput::Relation(RelationInput::DisconnectAll),
        );
        self
    }

    pub fn set_relation(mut self, field: &str, ids: &[ItemId]) -> Self {
        self.fields.insert(
            field.to_string(),
            FieldInput::Relation(RelationInput::Set(ids.to_vec())),
        );
        self
    }
}
