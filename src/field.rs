//! Field declarations
//!
//! One config struct per field kind. Each kind has a constructor function
//! (`text()`, `password()`, ...) and chained setters, so a list declaration
//! reads as a flat enumeration:
//!
//! ```
//! use poll_schema::field::{relationship, text};
//!
//! let email = text().required().unique().filterable();
//! let district = relationship("District.users");
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::value::Value;

/// Index flag for fields that the storage layer should index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// Plain lookup index
    Index,
    /// Index that also rejects duplicate values
    Unique,
}

/// Declarative validation shared by the stored field kinds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    #[serde(default)]
    pub is_required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextField {
    #[serde(default)]
    pub validation: Validation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_indexed: Option<IndexKind>,
    #[serde(default = "default_true")]
    pub is_filterable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// Secret text, hashed before it reaches storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordField {
    #[serde(default)]
    pub validation: Validation,
}

/// Default value policy for timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimestampDefault {
    /// Creation time of the item
    Now,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampField {
    #[serde(default)]
    pub validation: Validation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<TimestampDefault>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_indexed: Option<IndexKind>,
    #[serde(default = "default_true")]
    pub is_filterable: bool,
    /// Reject writes after the item has been created
    #[serde(default)]
    pub is_immutable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

/// Widget hint for select fields in the admin UI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectDisplayMode {
    #[default]
    Select,
    SegmentedControl,
    Radio,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectField {
    pub options: Vec<SelectOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default)]
    pub validation: Validation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_indexed: Option<IndexKind>,
    #[serde(default = "default_true")]
    pub is_filterable: bool,
    #[serde(default)]
    pub display_mode: SelectDisplayMode,
}

impl SelectField {
    pub fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value == value)
    }
}

/// Computes a value from the stored fields of the same item
pub type VirtualResolver = fn(&BTreeMap<String, Value>) -> Value;

/// Computed, non-stored field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualField {
    #[serde(skip)]
    pub resolve: Option<VirtualResolver>,
}

/// How the admin UI shows the related items
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipDisplayMode {
    #[default]
    Select,
    Cards,
    Count,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipUi {
    #[serde(default)]
    pub display_mode: RelationshipDisplayMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub card_fields: Vec<String>,
    #[serde(default)]
    pub link_to_item: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipField {
    /// `List` for a one-sided relationship, `List.field` for a two-sided one
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub many: bool,
    #[serde(default)]
    pub ui: RelationshipUi,
}

impl RelationshipField {
    /// Split the ref into target list and optional inverse field
    pub fn target(&self) -> Option<(&str, Option<&str>)> {
        let mut parts = self.reference.split('.');
        let list = parts.next().filter(|s| !s.is_empty())?;
        let field = match parts.next() {
            Some("") => return None,
            other => other,
        };
        if parts.next().is_some() {
            return None;
        }
        Some((list, field))
    }
}

/// Any declarable field
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text(TextField),
    Password(PasswordField),
    Timestamp(TimestampField),
    Select(SelectField),
    Virtual(VirtualField),
    Relationship(RelationshipField),
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Text(_) => "text",
            FieldKind::Password(_) => "password",
            FieldKind::Timestamp(_) => "timestamp",
            FieldKind::Select(_) => "select",
            FieldKind::Virtual(_) => "virtual",
            FieldKind::Relationship(_) => "relationship",
        }
    }

    pub fn is_required(&self) -> bool {
        match self {
            FieldKind::Text(f) => f.validation.is_required,
            FieldKind::Password(f) => f.validation.is_required,
            FieldKind::Timestamp(f) => f.validation.is_required,
            FieldKind::Select(f) => f.validation.is_required,
            FieldKind::Virtual(_) | FieldKind::Relationship(_) => false,
        }
    }

    pub fn index(&self) -> Option<IndexKind> {
        match self {
            FieldKind::Text(f) => f.is_indexed,
            FieldKind::Timestamp(f) => f.is_indexed,
            FieldKind::Select(f) => f.is_indexed,
            _ => None,
        }
    }

    pub fn is_unique(&self) -> bool {
        self.index() == Some(IndexKind::Unique)
    }

    pub fn is_filterable(&self) -> bool {
        match self {
            FieldKind::Text(f) => f.is_filterable,
            FieldKind::Timestamp(f) => f.is_filterable,
            FieldKind::Select(f) => f.is_filterable,
            FieldKind::Password(_) | FieldKind::Virtual(_) | FieldKind::Relationship(_) => false,
        }
    }

    pub fn as_relationship(&self) -> Option<&RelationshipField> {
        match self {
            FieldKind::Relationship(r) => Some(r),
            _ => None,
        }
    }

    /// Whether values of this field are kept by the store
    pub fn is_stored(&self) -> bool {
        !matches!(self, FieldKind::Virtual(_) | FieldKind::Relationship(_))
    }
}

/// A named field on a list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDecl {
    pub key: String,
    #[serde(flatten)]
    pub kind: FieldKind,
}

fn default_true() -> bool {
    true
}

// Constructors

pub fn text() -> TextField {
    TextField {
        validation: Validation::default(),
        is_indexed: None,
        is_filterable: true,
        default_value: None,
    }
}

pub fn password() -> PasswordField {
    PasswordField {
        validation: Validation::default(),
    }
}

pub fn timestamp() -> TimestampField {
    TimestampField {
        validation: Validation::default(),
        default_value: None,
        is_indexed: None,
        is_filterable: true,
        is_immutable: false,
    }
}

/// Select over `(label, value)` pairs
pub fn select(options: &[(&str, &str)]) -> SelectField {
    SelectField {
        options: options
            .iter()
            .map(|(label, value)| SelectOption {
                label: label.to_string(),
                value: value.to_string(),
            })
            .collect(),
        default_value: None,
        validation: Validation::default(),
        is_indexed: None,
        is_filterable: true,
        display_mode: SelectDisplayMode::default(),
    }
}

pub fn virtual_field(resolve: VirtualResolver) -> VirtualField {
    VirtualField {
        resolve: Some(resolve),
    }
}

pub fn relationship(reference: &str) -> RelationshipField {
    RelationshipField {
        reference: reference.to_string(),
        many: false,
        ui: RelationshipUi::default(),
    }
}

impl TextField {
    pub fn required(mut self) -> Self {
        self.validation.is_required = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.is_indexed = Some(IndexKind::Index);
        self
    }

    pub fn unique(mut self) -> Self {
        self.is_indexed = Some(IndexKind::Unique);
        self
    }

    pub fn filterable(mut self) -> Self {
        self.is_filterable = true;
        self
    }

    pub fn default_value(mut self, value: &str) -> Self {
        self.default_value = Some(value.to_string());
        self
    }
}

impl PasswordField {
    pub fn required(mut self) -> Self {
        self.validation.is_required = true;
        self
    }
}

impl TimestampField {
    pub fn required(mut self) -> Self {
        self.validation.is_required = true;
        self
    }

    pub fn default_now(mut self) -> Self {
        self.default_value = Some(TimestampDefault::Now);
        self
    }

    pub fn immutable(mut self) -> Self {
        self.is_immutable = true;
        self
    }
}

impl SelectField {
    pub fn required(mut self) -> Self {
        self.validation.is_required = true;
        self
    }

    pub fn default_value(mut self, value: &str) -> Self {
        self.default_value = Some(value.to_string());
        self
    }

    pub fn display_mode(mut self, mode: SelectDisplayMode) -> Self {
        self.display_mode = mode;
        self
    }
}

impl RelationshipField {
    pub fn many(mut self) -> Self {
        self.many = true;
        self
    }

    /// Show related items as cards with the given fields
    pub fn cards(mut self, fields: &[&str]) -> Self {
        self.ui.display_mode = RelationshipDisplayMode::Cards;
        self.ui.card_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn link_to_item(mut self) -> Self {
        self.ui.link_to_item = true;
        self
    }
}

macro_rules! impl_into_kind {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for FieldKind {
                fn from(f: $ty) -> Self {
                    FieldKind::$variant(f)
                }
            }
        )*
    };
}

impl_into_kind! {
    TextField => Text,
    PasswordField => Password,
    TimestampField => Timestamp,
    SelectField => Select,
    VirtualField => Virtual,
    RelationshipField => Relationship,
}
