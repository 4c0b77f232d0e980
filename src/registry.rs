//! Schema Registry
//!
//! Loads list declarations into an arena indexed by [`ListId`] and
//! [`FieldId`], and resolves every two-sided relationship into one
//! [`Relation`] holding both directions. A declaration that is internally
//! inconsistent is rejected here, before anything consumes it.

use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;
use tracing::{debug, info};

use crate::checksum::Checksum;
use crate::error::{Result, SchemaError};
use crate::field::{FieldDecl, FieldKind};
use crate::list::ListDecl;

/// Index of a list in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ListId(pub(crate) usize);

/// Index of a field within a list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FieldId {
    pub list: ListId,
    pub(crate) index: usize,
}

/// Index of a resolved relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RelationId(pub(crate) usize);

/// Which end of a relation a field sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Side {
    /// The field encountered first in declaration order
    Left,
    /// Its inverse, or the bare target list of a one-sided relationship
    Right,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

/// One end of a relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RelationEnd {
    pub list: ListId,
    /// `None` on the far end of a one-sided relationship
    pub field: Option<FieldId>,
    pub many: bool,
}

/// A resolved relationship: two directional references checked against each other
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relation {
    pub id: RelationId,
    pub left: RelationEnd,
    pub right: RelationEnd,
}

impl Relation {
    pub fn end(&self, side: Side) -> &RelationEnd {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Cardinality read from the left end
    pub fn cardinality(&self) -> Cardinality {
        match (self.left.many, self.right.many) {
            (false, false) => Cardinality::OneToOne,
            (false, true) => Cardinality::ManyToOne,
            (true, false) => Cardinality::OneToMany,
            (true, true) => Cardinality::ManyToMany,
        }
    }

    pub fn is_one_sided(&self) -> bool {
        self.right.field.is_none()
    }
}

/// A loaded, validated schema
#[derive(Debug)]
pub struct SchemaRegistry {
    lists: Vec<ListDecl>,
    by_key: HashMap<String, ListId>,
    relations: Vec<Relation>,
    field_relations: HashMap<FieldId, (RelationId, Side)>,
    checksum: Checksum,
}

fn list_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("valid regex"))
}

fn field_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"))
}

impl SchemaRegistry {
    /// Load the polling backend's lists
    pub fn builtin() -> Result<Self> {
        Self::load(crate::lists::lists())
    }

    /// Validate and index a set of list declarations
    pub fn load(lists: Vec<ListDecl>) -> Result<Self> {
        let mut by_key = HashMap::with_capacity(lists.len());
        for (i, list) in lists.iter().enumerate() {
            if !list_key_re().is_match(&list.key) {
                return Err(SchemaError::InvalidListKey(list.key.clone()));
            }
            if by_key.insert(list.key.clone(), ListId(i)).is_some() {
                return Err(SchemaError::DuplicateList(list.key.clone()));
            }
        }

        for list in &lists {
            validate_fields(list)?;
            validate_ui(list)?;
        }

        let checksum = Checksum::of_lists(&lists);
        let mut registry = Self {
            lists,
            by_key,
            relations: Vec::new(),
            field_relations: HashMap::new(),
            checksum,
        };
        registry.resolve_relations()?;

        info!(
            lists = registry.lists.len(),
            relations = registry.relations.len(),
            checksum = registry.checksum.short(),
            "schema loaded"
        );
        Ok(registry)
    }

    fn resolve_relations(&mut self) -> Result<()> {
        for (li, list) in self.lists.iter().enumerate() {
            for (fi, field) in list.fields.iter().enumerate() {
                let FieldKind::Relationship(rel) = &field.kind else {
                    continue;
                };
                let here = FieldId { list: ListId(li), index: fi };
                if self.field_relations.contains_key(&here) {
                    continue;
                }

                let (target_key, target_field) =
                    rel.target().ok_or_else(|| SchemaError::MalformedRef {
                        list: list.key.clone(),
                        field: field.key.clone(),
                        reference: rel.reference.clone(),
                    })?;
                let target_id = *self.by_key.get(target_key).ok_or_else(|| SchemaError::UnknownList {
                    list: list.key.clone(),
                    field: field.key.clone(),
                    target: target_key.to_string(),
                })?;
                let target = &self.lists[target_id.0];

                let id = RelationId(self.relations.len());
                let left = RelationEnd {
                    list: ListId(li),
                    field: Some(here),
                    many: rel.many,
                };

                let right = match target_field {
                    None => RelationEnd {
                        list: target_id,
                        field: None,
                        many: true,
                    },
                    Some(inverse_key) => {
                        let inverse_index = target
                            .fields
                            .iter()
                            .position(|f| f.key == inverse_key)
                            .ok_or_else(|| SchemaError::UnknownInverse {
                                list: list.key.clone(),
                                field: field.key.clone(),
                                target: target.key.clone(),
                                target_field: inverse_key.to_string(),
                            })?;
                        let inverse_id = FieldId {
                            list: target_id,
                            index: inverse_index,
                        };
                        if inverse_id == here {
                            return Err(SchemaError::SelfInverse {
                                list: list.key.clone(),
                                field: field.key.clone(),
                            });
                        }
                        let inverse = target.fields[inverse_index]
                            .kind
                            .as_relationship()
                            .ok_or_else(|| SchemaError::InverseNotRelationship {
                                list: list.key.clone(),
                                field: field.key.clone(),
                                target: target.key.clone(),
                                target_field: inverse_key.to_string(),
                            })?;
                        let expected = format!("{}.{}", list.key, field.key);
                        if inverse.reference != expected {
                            return Err(SchemaError::InverseMismatch {
                                list: list.key.clone(),
                                field: field.key.clone(),
                                target: target.key.clone(),
                                target_field: inverse_key.to_string(),
                                found: inverse.reference.clone(),
                            });
                        }
                        RelationEnd {
                            list: target_id,
                            field: Some(inverse_id),
                            many: inverse.many,
                        }
                    }
                };

                debug!(
                    from = %expected_name(list, field),
                    to = %rel.reference,
                    "resolved relationship"
                );
                self.field_relations.insert(here, (id, Side::Left));
                if let Some(inverse_id) = right.field {
                    self.field_relations.insert(inverse_id, (id, Side::Right));
                }
                self.relations.push(Relation { id, left, right });
            }
        }
        Ok(())
    }

    // ========== Lookups ==========

    pub fn list_id(&self, key: &str) -> Option<ListId> {
        self.by_key.get(key).copied()
    }

    pub fn list(&self, id: ListId) -> &ListDecl {
        &self.lists[id.0]
    }

    pub fn lists(&self) -> impl Iterator<Item = (ListId, &ListDecl)> {
        self.lists.iter().enumerate().map(|(i, l)| (ListId(i), l))
    }

    pub fn list_count(&self) -> usize {
        self.lists.len()
    }

    pub fn field_id(&self, list: ListId, key: &str) -> Option<FieldId> {
        self.lists[list.0]
            .fields
            .iter()
            .position(|f| f.key == key)
            .map(|index| FieldId { list, index })
    }

    pub fn field(&self, id: FieldId) -> &FieldDecl {
        &self.lists[id.list.0].fields[id.index]
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn relation(&self, id: RelationId) -> &Relation {
        &self.relations[id.0]
    }

    /// The relation a relationship field belongs to, and the side it sits on
    pub fn relation_of(&self, field: FieldId) -> Option<(RelationId, Side)> {
        self.field_relations.get(&field).copied()
    }

    pub fn checksum(&self) -> &Checksum {
        &self.checksum
    }

    /// `List.field` name of a relation end, or just `List` for a bare target
    pub fn end_name(&self, end: &RelationEnd) -> String {
        let list = &self.lists[end.list.0];
        match end.field {
            Some(f) => format!("{}.{}", list.key, self.field(f).key),
            None => list.key.clone(),
        }
    }

    /// JSON description of the loaded schema
    pub fn describe(&self) -> serde_json::Value {
        let relations: Vec<_> = self
            .relations
            .iter()
            .map(|r| {
                serde_json::json!({
                    "left": self.end_name(&r.left),
                    "right": self.end_name(&r.right),
                    "cardinality": r.cardinality(),
                })
            })
            .collect();
        serde_json::json!({
            "checksum": self.checksum.as_str(),
            "lists": self.lists,
            "relations": relations,
        })
    }
}

fn expected_name(list: &ListDecl, field: &FieldDecl) -> String {
    format!("{}.{}", list.key, field.key)
}

fn validate_fields(list: &ListDecl) -> Result<()> {
    let mut seen = HashSet::new();
    for field in &list.fields {
        if field.key == "id" {
            return Err(SchemaError::ReservedField {
                list: list.key.clone(),
            });
        }
        if !field_key_re().is_match(&field.key) {
            return Err(SchemaError::InvalidFieldKey {
                list: list.key.clone(),
                field: field.key.clone(),
            });
        }
        if !seen.insert(field.key.as_str()) {
            return Err(SchemaError::DuplicateField {
                list: list.key.clone(),
                field: field.key.clone(),
            });
        }

        if let FieldKind::Select(select) = &field.kind {
            if select.options.is_empty() {
                return Err(SchemaError::EmptyOptions {
                    list: list.key.clone(),
                    field: field.key.clone(),
                });
            }
            let mut values = HashSet::new();
            for option in &select.options {
                if !values.insert(option.value.as_str()) {
                    return Err(SchemaError::DuplicateOption {
                        list: list.key.clone(),
                        field: field.key.clone(),
                        value: option.value.clone(),
                    });
                }
            }
            if let Some(default) = &select.default_value {
                if !select.has_option(default) {
                    return Err(SchemaError::InvalidDefault {
                        list: list.key.clone(),
                        field: field.key.clone(),
                        value: default.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn validate_ui(list: &ListDecl) -> Result<()> {
    let exists = |key: &str| key == "id" || list.get_field(key).is_some();

    if let Some(label) = &list.ui.label_field {
        if !exists(label) {
            return Err(SchemaError::UnknownLabelField {
                list: list.key.clone(),
                field: label.clone(),
            });
        }
    }
    for column in &list.ui.initial_columns {
        if !exists(column) {
            return Err(SchemaError::UnknownColumn {
                list: list.key.clone(),
                field: column.clone(),
            });
        }
    }
    Ok(())
}
