//! Error types for schema loading and item operations

use thiserror::Error;

/// Result type for schema loading
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Errors raised while loading a list declaration into the registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("List '{0}' is declared more than once")]
    DuplicateList(String),

    #[error("Field '{list}.{field}' is declared more than once")]
    DuplicateField { list: String, field: String },

    #[error("Invalid list key '{0}': must start with a letter and contain only letters, digits or '_'")]
    InvalidListKey(String),

    #[error("Invalid field key '{list}.{field}'")]
    InvalidFieldKey { list: String, field: String },

    #[error("Field '{list}.id' is reserved for the item identifier")]
    ReservedField { list: String },

    #[error("Malformed relationship ref '{reference}' on '{list}.{field}': expected 'List' or 'List.field'")]
    MalformedRef {
        list: String,
        field: String,
        reference: String,
    },

    #[error("Relationship '{list}.{field}' references unknown list '{target}'")]
    UnknownList {
        list: String,
        field: String,
        target: String,
    },

    #[error("Relationship '{list}.{field}' references unknown field '{target}.{target_field}'")]
    UnknownInverse {
        list: String,
        field: String,
        target: String,
        target_field: String,
    },

    #[error("Relationship '{list}.{field}' points at '{target}.{target_field}', which is not a relationship")]
    InverseNotRelationship {
        list: String,
        field: String,
        target: String,
        target_field: String,
    },

    #[error("Relationship '{list}.{field}' -> '{target}.{target_field}' is not mirrored: the inverse refers to '{found}'")]
    InverseMismatch {
        list: String,
        field: String,
        target: String,
        target_field: String,
        found: String,
    },

    #[error("Label field '{field}' on list '{list}' does not exist")]
    UnknownLabelField { list: String, field: String },

    #[error("Initial column '{field}' on list '{list}' does not exist")]
    UnknownColumn { list: String, field: String },

    #[error("Select field '{list}.{field}' has no options")]
    EmptyOptions { list: String, field: String },

    #[error("Select field '{list}.{field}' declares option '{value}' twice")]
    DuplicateOption {
        list: String,
        field: String,
        value: String,
    },

    #[error("Default '{value}' of select field '{list}.{field}' is not one of its options")]
    InvalidDefault {
        list: String,
        field: String,
        value: String,
    },

    #[error("Relationship '{list}.{field}' names itself as its inverse")]
    SelfInverse { list: String, field: String },
}

/// Errors raised by item operations against a loaded schema
#[derive(Error, Debug)]
pub enum ItemError {
    #[error("Unknown list '{0}'")]
    UnknownList(String),

    #[error("Unknown field '{list}.{field}'")]
    UnknownField { list: String, field: String },

    #[error("Item '{id}' not found in list '{list}'")]
    NotFound { list: String, id: String },

    #[error("Field '{list}.{field}' is required")]
    Required { list: String, field: String },

    #[error("Value for '{list}.{field}' is already in use")]
    Duplicate { list: String, field: String },

    #[error("Value '{value}' is not a valid option for '{list}.{field}'")]
    InvalidOption {
        list: String,
        field: String,
        value: String,
    },

    #[error("Field '{list}.{field}' expected {expected}")]
    TypeMismatch {
        list: String,
        field: String,
        expected: &'static str,
    },

    #[error("Field '{list}.{field}' cannot be changed after creation")]
    Immutable { list: String, field: String },

    #[error("Field '{list}.{field}' is not filterable")]
    NotFilterable { list: String, field: String },

    #[error("Relationship '{list}.{field}' holds a single item")]
    SingleCardinality { list: String, field: String },

    #[error("Cannot delete '{list}' item '{id}': still referenced through '{field}'")]
    Restricted {
        list: String,
        id: String,
        field: String,
    },

    #[error("Password hashing failed: {0}")]
    Hash(String),
}
