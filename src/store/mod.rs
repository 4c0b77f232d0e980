//! Item Store
//!
//! In-memory consumer of a loaded schema. It enforces what the declaration
//! states and nothing more: required fields, unique indexes, select options,
//! timestamp defaults, immutable fields, hashed passwords and relationship
//! cardinality. Links are kept once per relation, so writing either
//! relationship field is visible from the other.
//!
//! Every write is validated completely before anything is changed; a failed
//! create or update leaves the store as it was.

pub mod links;
mod password;

pub use password::{hash_password, verify_password};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::config::{DeletePolicy, StoreConfig};
use crate::error::ItemError;
use crate::field::{FieldKind, TimestampDefault};
use crate::registry::{FieldId, ListId, SchemaRegistry, Side};
use crate::value::{FieldInput, ItemId, ItemInput, RelationInput, Value};

use links::LinkSet;

type Result<T> = std::result::Result<T, ItemError>;

/// Label lookups through relationship label fields stop after this many hops
const MAX_LABEL_DEPTH: usize = 3;

/// An item as returned to callers. Password fields are never included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    pub id: ItemId,
    pub list: String,
    pub fields: BTreeMap<String, Value>,
}

impl Item {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_text)
    }
}

/// Rows of a list view, one cell per column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListView {
    pub list: String,
    pub columns: Vec<String>,
    pub rows: Vec<ListRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListRow {
    pub id: ItemId,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone)]
struct Record {
    seq: u64,
    values: BTreeMap<String, Value>,
}

#[derive(Debug, Default)]
struct Table {
    records: HashMap<ItemId, Record>,
    /// field key -> indexed value -> owning item
    unique: HashMap<String, HashMap<String, ItemId>>,
}

/// Validated, not yet applied, write
struct PreparedWrite {
    values: BTreeMap<String, Value>,
    relations: Vec<(FieldId, RelationInput)>,
}

pub struct ItemStore {
    schema: SchemaRegistry,
    on_delete: DeletePolicy,
    tables: Vec<Table>,
    links: Vec<LinkSet>,
    next_seq: u64,
}

impl ItemStore {
    pub fn new(schema: SchemaRegistry) -> Self {
        Self::with_config(schema, &StoreConfig::default())
    }

    pub fn with_config(schema: SchemaRegistry, config: &StoreConfig) -> Self {
        let tables = (0..schema.list_count()).map(|_| Table::default()).collect();
        let links = schema.relations().iter().map(|_| LinkSet::default()).collect();
        Self {
            schema,
            on_delete: config.on_delete,
            tables,
            links,
            next_seq: 0,
        }
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    pub fn count(&self, list: &str) -> Result<usize> {
        let list_id = self.resolve_list(list)?;
        Ok(self.tables[list_id.0].records.len())
    }

    // ========== Writes ==========

    pub fn create(&mut self, list: &str, input: ItemInput) -> Result<Item> {
        let list_id = self.resolve_list(list)?;
        let prepared = self.prepare(list_id, None, input)?;
        let now = Utc::now();

        let decl = self.schema.list(list_id);
        let mut values = BTreeMap::new();
        for field in decl.fields.iter().filter(|f| f.kind.is_stored()) {
            let value = match prepared.values.get(&field.key) {
                Some(v) => v.clone(),
                None => default_value(&field.kind, now),
            };
            if field.kind.is_required() && is_blank(&value) {
                return Err(ItemError::Required {
                    list: decl.key.clone(),
                    field: field.key.clone(),
                });
            }
            values.insert(field.key.clone(), value);
        }
        self.check_unique(list_id, None, &values)?;

        let id = ItemId::generate();
        let seq = self.next_seq;
        self.next_seq += 1;
        let unique_fields = self.unique_fields(list_id);
        let table = &mut self.tables[list_id.0];
        for key in unique_fields {
            if let Some(indexed) = values.get(&key).and_then(index_key) {
                table.unique.entry(key).or_default().insert(indexed, id.clone());
            }
        }
        table.records.insert(id.clone(), Record { seq, values });

        for (field, relation) in prepared.relations {
            self.apply_relation(field, &id, relation);
        }

        debug!(list, id = %id, "item created");
        self.get(list, &id)
    }

    /// Partial update: fields absent from `input` keep their values
    pub fn update(&mut self, list: &str, id: &ItemId, input: ItemInput) -> Result<Item> {
        let list_id = self.resolve_list(list)?;
        let current = self.record(list_id, id)?.values.clone();
        let prepared = self.prepare(list_id, Some(&current), input)?;

        let mut values = current.clone();
        values.extend(prepared.values);
        self.check_unique(list_id, Some(id), &values)?;

        let unique_fields = self.unique_fields(list_id);
        let table = &mut self.tables[list_id.0];
        for key in unique_fields {
            let index = table.unique.entry(key.clone()).or_default();
            if let Some(old) = current.get(&key).and_then(index_key) {
                index.remove(&old);
            }
            if let Some(new) = values.get(&key).and_then(index_key) {
                index.insert(new, id.clone());
            }
        }
        if let Some(record) = table.records.get_mut(id) {
            record.values = values;
        }

        for (field, relation) in prepared.relations {
            self.apply_relation(field, id, relation);
        }

        debug!(list, id = %id, "item updated");
        self.get(list, id)
    }

    /// Delete an item, handling its links per the configured [`DeletePolicy`]
    pub fn delete(&mut self, list: &str, id: &ItemId) -> Result<Item> {
        let list_id = self.resolve_list(list)?;
        let item = self.get(list, id)?;

        let mut touching = Vec::new();
        for relation in self.schema.relations() {
            for side in [Side::Left, Side::Right] {
                if relation.end(side).list == list_id {
                    touching.push((relation.id, side));
                }
            }
        }

        if self.on_delete == DeletePolicy::Restrict {
            for &(rel_id, side) in &touching {
                let far = self.schema.relation(rel_id).end(side.opposite());
                if !far.many && self.links[rel_id.0].has_links(side, id) {
                    let name = self.schema.end_name(far);
                    debug!(list, id = %id, via = %name, "delete restricted");
                    return Err(ItemError::Restricted {
                        list: list.to_string(),
                        id: id.to_string(),
                        field: name,
                    });
                }
            }
        }

        for (rel_id, side) in touching {
            self.links[rel_id.0].clear(side, id);
        }

        let table = &mut self.tables[list_id.0];
        if let Some(record) = table.records.remove(id) {
            for (key, index) in table.unique.iter_mut() {
                if let Some(indexed) = record.values.get(key).and_then(index_key) {
                    index.remove(&indexed);
                }
            }
        }

        debug!(list, id = %id, "item deleted");
        Ok(item)
    }

    // ========== Reads ==========

    pub fn get(&self, list: &str, id: &ItemId) -> Result<Item> {
        let list_id = self.resolve_list(list)?;
        let record = self.record(list_id, id)?;
        Ok(self.build_item(list_id, id, record))
    }

    /// Items whose fields equal every `(field, value)` pair, in creation order
    pub fn find_many(&self, list: &str, filters: &[(&str, Value)]) -> Result<Vec<Item>> {
        let list_id = self.resolve_list(list)?;
        let decl = self.schema.list(list_id);
        let mut wanted = Vec::with_capacity(filters.len());
        for (key, value) in filters {
            let field = decl.get_field(key).ok_or_else(|| ItemError::UnknownField {
                list: decl.key.clone(),
                field: key.to_string(),
            })?;
            if !field.kind.is_filterable() {
                return Err(ItemError::NotFilterable {
                    list: decl.key.clone(),
                    field: key.to_string(),
                });
            }
            // Filters take the same input forms as writes
            let value = self.coerce(&decl.key, key, &field.kind, value.clone())?;
            wanted.push((*key, value));
        }

        let items = self
            .ordered(list_id)
            .into_iter()
            .filter(|(_, record)| {
                wanted
                    .iter()
                    .all(|(key, value)| record.values.get(*key).unwrap_or(&Value::Null) == value)
            })
            .map(|(id, record)| self.build_item(list_id, id, record))
            .collect();
        Ok(items)
    }

    /// Items linked to `id` through one of its relationship fields
    pub fn related(&self, list: &str, id: &ItemId, field: &str) -> Result<Vec<Item>> {
        let list_id = self.resolve_list(list)?;
        self.record(list_id, id)?;
        let field_id = self.resolve_field(list_id, field)?;
        if self.schema.field(field_id).kind.as_relationship().is_none() {
            return Err(ItemError::TypeMismatch {
                list: list.to_string(),
                field: field.to_string(),
                expected: "a relationship field",
            });
        }
        let (far, ids) = self.linked(field_id, id);
        ids.iter()
            .map(|other| -> Result<Item> {
                let record = self.record(far, other)?;
                Ok(self.build_item(far, other, record))
            })
            .collect()
    }

    /// Render the list's initial columns for every item
    pub fn list_view(&self, list: &str) -> Result<ListView> {
        let list_id = self.resolve_list(list)?;
        let decl = self.schema.list(list_id);
        let columns = decl.effective_columns();
        let rows = self
            .ordered(list_id)
            .into_iter()
            .map(|(id, record)| ListRow {
                id: id.clone(),
                cells: columns
                    .iter()
                    .map(|column| self.cell(list_id, id, record, column, 0))
                    .collect(),
            })
            .collect();
        Ok(ListView {
            list: decl.key.clone(),
            columns,
            rows,
        })
    }

    /// Label of an item, as shown in relationship widgets
    pub fn label(&self, list: &str, id: &ItemId) -> Result<String> {
        let list_id = self.resolve_list(list)?;
        let record = self.record(list_id, id)?;
        Ok(self.label_of(list_id, id, record, 0))
    }

    /// Check a candidate password against the stored hash
    pub fn verify_password(&self, list: &str, id: &ItemId, field: &str, candidate: &str) -> Result<bool> {
        let list_id = self.resolve_list(list)?;
        let field_id = self.resolve_field(list_id, field)?;
        if !matches!(self.schema.field(field_id).kind, FieldKind::Password(_)) {
            return Err(ItemError::TypeMismatch {
                list: list.to_string(),
                field: field.to_string(),
                expected: "a password field",
            });
        }
        let record = self.record(list_id, id)?;
        Ok(match record.values.get(field) {
            Some(Value::Text(hash)) => verify_password(candidate, hash),
            _ => false,
        })
    }

    // ========== Internals ==========

    fn resolve_list(&self, key: &str) -> Result<ListId> {
        self.schema
            .list_id(key)
            .ok_or_else(|| ItemError::UnknownList(key.to_string()))
    }

    fn resolve_field(&self, list: ListId, key: &str) -> Result<FieldId> {
        self.schema
            .field_id(list, key)
            .ok_or_else(|| ItemError::UnknownField {
                list: self.schema.list(list).key.clone(),
                field: key.to_string(),
            })
    }

    fn record(&self, list: ListId, id: &ItemId) -> Result<&Record> {
        self.tables[list.0]
            .records
            .get(id)
            .ok_or_else(|| ItemError::NotFound {
                list: self.schema.list(list).key.clone(),
                id: id.to_string(),
            })
    }

    fn ordered(&self, list: ListId) -> Vec<(&ItemId, &Record)> {
        let mut records: Vec<_> = self.tables[list.0].records.iter().collect();
        records.sort_by_key(|(_, r)| r.seq);
        records
    }

    fn unique_fields(&self, list: ListId) -> Vec<String> {
        self.schema
            .list(list)
            .fields
            .iter()
            .filter(|f| f.kind.is_unique())
            .map(|f| f.key.clone())
            .collect()
    }

    /// Validate every field of `input`; `current` is the stored record on update
    fn prepare(
        &self,
        list: ListId,
        current: Option<&BTreeMap<String, Value>>,
        input: ItemInput,
    ) -> Result<PreparedWrite> {
        let list_key = &self.schema.list(list).key;
        let mut prepared = PreparedWrite {
            values: BTreeMap::new(),
            relations: Vec::new(),
        };

        for (key, field_input) in input.fields {
            let field_id = self.resolve_field(list, &key)?;
            let kind = &self.schema.field(field_id).kind;
            let mismatch = |expected| ItemError::TypeMismatch {
                list: list_key.clone(),
                field: key.clone(),
                expected,
            };

            match (kind, field_input) {
                (FieldKind::Relationship(_), FieldInput::Relation(relation)) => {
                    self.check_relation_input(field_id, &relation)?;
                    prepared.relations.push((field_id, relation));
                }
                (FieldKind::Relationship(_), FieldInput::Value(Value::Null)) => {
                    prepared.relations.push((field_id, RelationInput::DisconnectAll));
                }
                (FieldKind::Relationship(_), FieldInput::Value(_)) => {
                    return Err(mismatch("a relationship input"));
                }
                (FieldKind::Virtual(_), _) => {
                    return Err(mismatch("no input for a virtual field"));
                }
                (_, FieldInput::Relation(_)) => return Err(mismatch("a value")),
                (kind, FieldInput::Value(value)) => {
                    let value = self.coerce(list_key, &key, kind, value)?;
                    // Null on a field with a default means the default on create;
                    // a select with a default never goes back to null
                    if value.is_null() && has_default(kind) {
                        match (kind, current) {
                            (_, None) => continue,
                            (FieldKind::Select(_), Some(_)) => {
                                return Err(ItemError::InvalidOption {
                                    list: list_key.clone(),
                                    field: key,
                                    value: "null".to_string(),
                                });
                            }
                            _ => {}
                        }
                    }
                    if kind.is_required() && is_blank(&value) {
                        return Err(ItemError::Required {
                            list: list_key.clone(),
                            field: key,
                        });
                    }
                    if let (FieldKind::Timestamp(ts), Some(current)) = (kind, current) {
                        if ts.is_immutable && current.get(&key) != Some(&value) {
                            return Err(ItemError::Immutable {
                                list: list_key.clone(),
                                field: key,
                            });
                        }
                    }
                    prepared.values.insert(key, value);
                }
            }
        }
        Ok(prepared)
    }

    fn coerce(&self, list: &str, key: &str, kind: &FieldKind, value: Value) -> Result<Value> {
        let mismatch = |expected| ItemError::TypeMismatch {
            list: list.to_string(),
            field: key.to_string(),
            expected,
        };
        match (kind, value) {
            (_, Value::Null) => Ok(Value::Null),
            (FieldKind::Text(_), Value::Text(s)) => Ok(Value::Text(s)),
            (FieldKind::Text(_), _) => Err(mismatch("text")),
            (FieldKind::Password(_), Value::Text(s)) if s.is_empty() => Ok(Value::Null),
            (FieldKind::Password(_), Value::Text(s)) => Ok(Value::Text(hash_password(&s)?)),
            (FieldKind::Password(_), _) => Err(mismatch("text")),
            (FieldKind::Timestamp(_), Value::Timestamp(t)) => Ok(Value::Timestamp(t)),
            (FieldKind::Timestamp(_), Value::Text(s)) => DateTime::parse_from_rfc3339(&s)
                .map(|t| Value::Timestamp(t.with_timezone(&Utc)))
                .map_err(|_| mismatch("an RFC 3339 timestamp")),
            (FieldKind::Timestamp(_), _) => Err(mismatch("a timestamp")),
            (FieldKind::Select(select), Value::Text(s)) => {
                if select.has_option(&s) {
                    Ok(Value::Text(s))
                } else {
                    Err(ItemError::InvalidOption {
                        list: list.to_string(),
                        field: key.to_string(),
                        value: s,
                    })
                }
            }
            (FieldKind::Select(_), _) => Err(mismatch("an option value")),
            (FieldKind::Virtual(_) | FieldKind::Relationship(_), _) => Err(mismatch("a value")),
        }
    }

    fn check_relation_input(&self, field: FieldId, input: &RelationInput) -> Result<()> {
        let Some((rel_id, side)) = self.schema.relation_of(field) else {
            return Ok(());
        };
        let relation = self.schema.relation(rel_id);
        let far = relation.end(side.opposite()).list;
        let ids = match input {
            RelationInput::Connect(ids) | RelationInput::Set(ids) => {
                if !relation.end(side).many && ids.len() > 1 {
                    return Err(ItemError::SingleCardinality {
                        list: self.schema.list(field.list).key.clone(),
                        field: self.schema.field(field).key.clone(),
                    });
                }
                ids
            }
            RelationInput::Disconnect(_) | RelationInput::DisconnectAll => return Ok(()),
        };
        for id in ids {
            self.record(far, id)?;
        }
        Ok(())
    }

    fn apply_relation(&mut self, field: FieldId, item: &ItemId, input: RelationInput) {
        let Some((rel_id, side)) = self.schema.relation_of(field) else {
            return;
        };
        let relation = self.schema.relation(rel_id);
        let here_many = relation.end(side).many;
        let far_many = relation.end(side.opposite()).many;
        let links = &mut self.links[rel_id.0];

        let connect = |links: &mut LinkSet, ids: Vec<ItemId>| {
            for other in ids {
                if !here_many {
                    links.clear(side, item);
                }
                if !far_many {
                    links.clear(side.opposite(), &other);
                }
                links.insert(side, item, &other);
            }
        };

        match input {
            RelationInput::Connect(ids) => connect(links, ids),
            RelationInput::Disconnect(ids) => {
                for other in ids {
                    links.remove(side, item, &other);
                }
            }
            RelationInput::DisconnectAll => links.clear(side, item),
            RelationInput::Set(ids) => {
                links.clear(side, item);
                connect(links, ids);
            }
        }
    }

    fn check_unique(
        &self,
        list: ListId,
        owner: Option<&ItemId>,
        values: &BTreeMap<String, Value>,
    ) -> Result<()> {
        let table = &self.tables[list.0];
        for key in self.unique_fields(list) {
            let Some(indexed) = values.get(&key).and_then(index_key) else {
                continue;
            };
            let taken_by = table.unique.get(&key).and_then(|index| index.get(&indexed));
            if let Some(other) = taken_by {
                if Some(other) != owner {
                    return Err(ItemError::Duplicate {
                        list: self.schema.list(list).key.clone(),
                        field: key,
                    });
                }
            }
        }
        Ok(())
    }

    /// Far list and linked ids (in creation order) of a relationship field
    fn linked(&self, field: FieldId, id: &ItemId) -> (ListId, Vec<ItemId>) {
        let Some((rel_id, side)) = self.schema.relation_of(field) else {
            return (field.list, Vec::new());
        };
        let far = self.schema.relation(rel_id).end(side.opposite()).list;
        let mut ids = self.links[rel_id.0].linked(side, id);
        let records = &self.tables[far.0].records;
        ids.sort_by_key(|other| records.get(other).map(|r| r.seq));
        (far, ids)
    }

    fn build_item(&self, list: ListId, id: &ItemId, record: &Record) -> Item {
        let decl = self.schema.list(list);
        let mut fields = BTreeMap::new();
        for field in &decl.fields {
            match &field.kind {
                FieldKind::Password(_) | FieldKind::Virtual(_) => {}
                FieldKind::Relationship(rel) => {
                    let Some(field_id) = self.schema.field_id(list, &field.key) else {
                        continue;
                    };
                    let (_, ids) = self.linked(field_id, id);
                    let value = if rel.many {
                        Value::Items(ids)
                    } else {
                        ids.into_iter().next().map(Value::Item).unwrap_or(Value::Null)
                    };
                    fields.insert(field.key.clone(), value);
                }
                _ => {
                    let value = record.values.get(&field.key).cloned().unwrap_or(Value::Null);
                    fields.insert(field.key.clone(), value);
                }
            }
        }

        // Virtual fields see the same values callers do
        for field in &decl.fields {
            if let FieldKind::Virtual(v) = &field.kind {
                let value = v.resolve.map(|resolve| resolve(&fields)).unwrap_or(Value::Null);
                fields.insert(field.key.clone(), value);
            }
        }

        Item {
            id: id.clone(),
            list: decl.key.clone(),
            fields,
        }
    }

    fn cell(&self, list: ListId, id: &ItemId, record: &Record, column: &str, depth: usize) -> String {
        if column == "id" {
            return id.to_string();
        }
        let Some(field_id) = self.schema.field_id(list, column) else {
            return String::new();
        };
        match &self.schema.field(field_id).kind {
            FieldKind::Password(_) => String::new(),
            FieldKind::Relationship(_) => {
                let (far, ids) = self.linked(field_id, id);
                ids.iter()
                    .filter_map(|other| {
                        let record = self.tables[far.0].records.get(other)?;
                        Some(self.label_of(far, other, record, depth + 1))
                    })
                    .collect::<Vec<_>>()
                    .join(", ")
            }
            FieldKind::Virtual(_) => self
                .build_item(list, id, record)
                .get(column)
                .map(Value::display)
                .unwrap_or_default(),
            _ => record
                .values
                .get(column)
                .map(Value::display)
                .unwrap_or_default(),
        }
    }

    fn label_of(&self, list: ListId, id: &ItemId, record: &Record, depth: usize) -> String {
        if depth > MAX_LABEL_DEPTH {
            return id.to_string();
        }
        let label_field = self.schema.list(list).effective_label_field();
        let label = self.cell(list, id, record, label_field, depth);
        if label.is_empty() {
            id.to_string()
        } else {
            label
        }
    }
}

fn default_value(kind: &FieldKind, now: DateTime<Utc>) -> Value {
    match kind {
        FieldKind::Text(f) => f.default_value.clone().map(Value::Text).unwrap_or(Value::Null),
        FieldKind::Timestamp(f) => match f.default_value {
            Some(TimestampDefault::Now) => Value::Timestamp(now),
            None => Value::Null,
        },
        FieldKind::Select(f) => f.default_value.clone().map(Value::Text).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn has_default(kind: &FieldKind) -> bool {
    match kind {
        FieldKind::Text(f) => f.default_value.is_some(),
        FieldKind::Timestamp(f) => f.default_value.is_some(),
        FieldKind::Select(f) => f.default_value.is_some(),
        _ => false,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Text(s) => s.is_empty(),
        _ => false,
    }
}

/// Key under which a value is kept in a unique index; null is never indexed
fn index_key(value: &Value) -> Option<String> {
    if value.is_null() {
        None
    } else {
        Some(value.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::field::{text, virtual_field};
    use crate::list::ListDecl;

    fn store() -> ItemStore {
        ItemStore::new(SchemaRegistry::builtin().unwrap())
    }

    fn user(store: &mut ItemStore, email: &str) -> Item {
        store
            .create(
                "User",
                ItemInput::new()
                    .set("firstName", "Ana")
                    .set("lastName", "Lee")
                    .set("email", email)
                    .set("password", "secret1"),
            )
            .unwrap()
    }

    #[test]
    fn test_required_fields_rejected() {
        let mut store = store();
        let err = store
            .create("User", ItemInput::new().set("firstName", "Ana").set("lastName", "Lee"))
            .unwrap_err();
        assert!(matches!(err, ItemError::Required { field, .. } if field == "email"));

        let err = store.create("District", ItemInput::new().set("name", "")).unwrap_err();
        assert!(matches!(err, ItemError::Required { field, .. } if field == "name"));

        let err = store.create("Tag", ItemInput::new().null("name")).unwrap_err();
        assert!(matches!(err, ItemError::Required { .. }));

        assert_eq!(store.count("User").unwrap(), 0);
    }

    #[test]
    fn test_every_required_field_rejects_blank() {
        let lists: &[(&str, &[(&str, &str)])] = &[
            (
                "User",
                &[
                    ("firstName", "Ana"),
                    ("lastName", "Lee"),
                    ("email", "ana@example.com"),
                    ("password", "secret1"),
                ],
            ),
            ("District", &[("name", "North")]),
            ("AccountType", &[("name", "Voter")]),
            ("Poll", &[("question", "Best park?")]),
            ("Answer", &[("answer", "Yes")]),
            ("Tag", &[("name", "civic")]),
        ];

        for (list, fields) in lists {
            for (blank, _) in fields.iter() {
                let mut store = store();
                let build = |blank_value: Option<&str>| {
                    fields.iter().fold(ItemInput::new(), |input, (key, value)| {
                        if key == blank {
                            match blank_value {
                                Some(v) => input.set(key, v),
                                None => input,
                            }
                        } else {
                            input.set(key, *value)
                        }
                    })
                };

                for blank_value in [Some(""), None] {
                    let err = store.create(list, build(blank_value)).unwrap_err();
                    assert!(
                        matches!(&err, ItemError::Required { field, .. } if field == blank),
                        "{}.{}: {:?}",
                        list,
                        blank,
                        err
                    );
                }

                let item = store.create(list, build(Some("filled"))).unwrap();
                let err = store
                    .update(list, &item.id, ItemInput::new().set(blank, ""))
                    .unwrap_err();
                assert!(matches!(&err, ItemError::Required { field, .. } if field == blank));
                assert_eq!(store.count(list).unwrap(), 1);
            }
        }
    }

    #[test]
    fn test_required_on_update() {
        let mut store = store();
        let tag = store.create("Tag", ItemInput::new().set("name", "civic")).unwrap();
        let err = store.update("Tag", &tag.id, ItemInput::new().set("name", "")).unwrap_err();
        assert!(matches!(err, ItemError::Required { .. }));
        assert_eq!(store.get("Tag", &tag.id).unwrap().text("name"), Some("civic"));
    }

    #[test]
    fn test_password_hidden_and_verifiable() {
        let mut store = store();
        let ana = user(&mut store, "ana@example.com");
        assert!(ana.get("password").is_none());
        assert!(store.verify_password("User", &ana.id, "password", "secret1").unwrap());
        assert!(!store.verify_password("User", &ana.id, "password", "secret2").unwrap());
        assert!(matches!(
            store.verify_password("User", &ana.id, "email", "x"),
            Err(ItemError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_unique_email() {
        let mut store = store();
        let ana = user(&mut store, "ana@example.com");
        let err = store
            .create(
                "User",
                ItemInput::new()
                    .set("firstName", "Bo")
                    .set("lastName", "Kim")
                    .set("email", "ana@example.com")
                    .set("password", "secret2"),
            )
            .unwrap_err();
        assert!(matches!(err, ItemError::Duplicate { field, .. } if field == "email"));

        // Re-saving the same value on the owner is fine
        store
            .update("User", &ana.id, ItemInput::new().set("email", "ana@example.com"))
            .unwrap();

        // Freed values can be reused
        store
            .update("User", &ana.id, ItemInput::new().set("email", "ana@lee.dev"))
            .unwrap();
        user(&mut store, "ana@example.com");
    }

    #[test]
    fn test_select_options_and_default() {
        let mut store = store();
        let access = store.create("PollAccess", ItemInput::new()).unwrap();
        assert_eq!(access.text("level"), Some("draft"));

        let public = store
            .create("PollAccess", ItemInput::new().set("level", "public"))
            .unwrap();
        assert_eq!(public.text("level"), Some("public"));

        let err = store
            .create("PollAccess", ItemInput::new().set("level", "archived"))
            .unwrap_err();
        assert!(matches!(err, ItemError::InvalidOption { value, .. } if value == "archived"));
    }

    #[test]
    fn test_select_null_never_stored() {
        let mut store = store();
        let access = store
            .create("PollAccess", ItemInput::new().null("level"))
            .unwrap();
        assert_eq!(access.text("level"), Some("draft"));

        let err = store
            .update("PollAccess", &access.id, ItemInput::new().null("level"))
            .unwrap_err();
        assert!(matches!(err, ItemError::InvalidOption { value, .. } if value == "null"));
        assert_eq!(
            store.get("PollAccess", &access.id).unwrap().text("level"),
            Some("draft")
        );
    }

    #[test]
    fn test_created_at_null_means_now() {
        let mut store = store();
        let poll = store
            .create(
                "Poll",
                ItemInput::new().set("question", "Best park?").null("createdAt"),
            )
            .unwrap();
        let created_at = poll.get("createdAt").and_then(Value::as_timestamp);
        assert!(created_at.is_some());

        let err = store
            .update("Poll", &poll.id, ItemInput::new().null("createdAt"))
            .unwrap_err();
        assert!(matches!(err, ItemError::Immutable { .. }));
        assert_eq!(
            store.get("Poll", &poll.id).unwrap().get("createdAt").and_then(Value::as_timestamp),
            created_at
        );
    }

    #[test]
    fn test_created_at_default_and_immutable() {
        let mut store = store();
        let before = Utc::now();
        let poll = store
            .create("Poll", ItemInput::new().set("question", "Best park?"))
            .unwrap();
        let created_at = poll.get("createdAt").and_then(Value::as_timestamp).unwrap();
        assert!(created_at >= before && created_at <= Utc::now());

        let updated = store
            .update("Poll", &poll.id, ItemInput::new().set("question", "Best square?"))
            .unwrap();
        assert_eq!(updated.get("createdAt").and_then(Value::as_timestamp), Some(created_at));

        let err = store
            .update("Poll", &poll.id, ItemInput::new().set("createdAt", "2020-01-01T00:00:00Z"))
            .unwrap_err();
        assert!(matches!(err, ItemError::Immutable { .. }));

        // Writing back the stored value is not a change
        store
            .update("Poll", &poll.id, ItemInput::new().set("createdAt", created_at))
            .unwrap();
    }

    #[test]
    fn test_timestamp_parsing() {
        let mut store = store();
        let err = store
            .create(
                "User",
                ItemInput::new()
                    .set("firstName", "Ana")
                    .set("lastName", "Lee")
                    .set("email", "ana@example.com")
                    .set("password", "secret1")
                    .set("birthDate", "yesterday"),
            )
            .unwrap_err();
        assert!(matches!(err, ItemError::TypeMismatch { .. }));
    }

    #[test]
    fn test_both_sides_of_relation() {
        let mut store = store();
        let poll = store
            .create("Poll", ItemInput::new().set("question", "Best park?"))
            .unwrap();
        let yes = store
            .create("Answer", ItemInput::new().set("answer", "Yes").connect("poll", &poll.id))
            .unwrap();
        let no = store.create("Answer", ItemInput::new().set("answer", "No")).unwrap();
        store
            .update("Poll", &poll.id, ItemInput::new().connect("answers", &no.id))
            .unwrap();

        let poll = store.get("Poll", &poll.id).unwrap();
        assert_eq!(
            poll.get("answers"),
            Some(&Value::Items(vec![yes.id.clone(), no.id.clone()]))
        );
        let no = store.get("Answer", &no.id).unwrap();
        assert_eq!(no.get("poll"), Some(&Value::Item(poll.id.clone())));
    }

    #[test]
    fn test_to_one_connect_replaces() {
        let mut store = store();
        let north = store.create("District", ItemInput::new().set("name", "North")).unwrap();
        let south = store.create("District", ItemInput::new().set("name", "South")).unwrap();
        let ana = user(&mut store, "ana@example.com");

        store
            .update("User", &ana.id, ItemInput::new().connect("district", &north.id))
            .unwrap();
        store
            .update("User", &ana.id, ItemInput::new().connect("district", &south.id))
            .unwrap();

        assert!(store.related("District", &north.id, "users").unwrap().is_empty());
        assert_eq!(store.related("District", &south.id, "users").unwrap().len(), 1);

        let err = store
            .update(
                "User",
                &ana.id,
                ItemInput::new().connect_many("district", &[north.id.clone(), south.id.clone()]),
            )
            .unwrap_err();
        assert!(matches!(err, ItemError::SingleCardinality { .. }));

        store
            .update("User", &ana.id, ItemInput::new().null("district"))
            .unwrap();
        assert!(store.related("District", &south.id, "users").unwrap().is_empty());
    }

    #[test]
    fn test_many_to_many_tags() {
        let mut store = store();
        let civic = store.create("Tag", ItemInput::new().set("name", "civic")).unwrap();
        let parks = store.create("Tag", ItemInput::new().set("name", "parks")).unwrap();
        let a = store
            .create(
                "Poll",
                ItemInput::new()
                    .set("question", "A?")
                    .connect_many("tags", &[civic.id.clone(), parks.id.clone()]),
            )
            .unwrap();
        let b = store
            .create("Poll", ItemInput::new().set("question", "B?").connect("tags", &civic.id))
            .unwrap();

        let polls: Vec<_> = store
            .related("Tag", &civic.id, "polls")
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(polls, vec![a.id.clone(), b.id.clone()]);

        store
            .update("Poll", &a.id, ItemInput::new().set_relation("tags", &[parks.id.clone()]))
            .unwrap();
        assert_eq!(store.related("Tag", &civic.id, "polls").unwrap().len(), 1);

        store
            .update("Poll", &a.id, ItemInput::new().disconnect("tags", &[parks.id.clone()]))
            .unwrap();
        assert!(store.related("Tag", &parks.id, "polls").unwrap().is_empty());
    }

    #[test]
    fn test_connect_unknown_item() {
        let mut store = store();
        let err = store
            .create(
                "Poll",
                ItemInput::new()
                    .set("question", "A?")
                    .connect("access", &ItemId::from("missing")),
            )
            .unwrap_err();
        assert!(matches!(err, ItemError::NotFound { list, .. } if list == "PollAccess"));
        assert_eq!(store.count("Poll").unwrap(), 0);
    }

    #[test]
    fn test_delete_nullifies_links() {
        let mut store = store();
        let poll = store
            .create("Poll", ItemInput::new().set("question", "Best park?"))
            .unwrap();
        let answer = store
            .create("Answer", ItemInput::new().set("answer", "Yes").connect("poll", &poll.id))
            .unwrap();

        store.delete("Poll", &poll.id).unwrap();
        let answer = store.get("Answer", &answer.id).unwrap();
        assert_eq!(answer.get("poll"), Some(&Value::Null));
        assert!(matches!(
            store.get("Poll", &poll.id),
            Err(ItemError::NotFound { .. })
        ));
    }

    #[test]
    fn test_delete_restricted() {
        let config = StoreConfig {
            on_delete: DeletePolicy::Restrict,
        };
        let mut store = ItemStore::with_config(SchemaRegistry::builtin().unwrap(), &config);
        let poll = store
            .create("Poll", ItemInput::new().set("question", "Best park?"))
            .unwrap();
        let answer = store
            .create("Answer", ItemInput::new().set("answer", "Yes").connect("poll", &poll.id))
            .unwrap();

        let err = store.delete("Poll", &poll.id).unwrap_err();
        assert!(matches!(err, ItemError::Restricted { field, .. } if field == "Answer.poll"));

        store.delete("Answer", &answer.id).unwrap();
        store.delete("Poll", &poll.id).unwrap();
        assert_eq!(store.count("Poll").unwrap(), 0);
    }

    #[test]
    fn test_delete_frees_unique_value() {
        let mut store = store();
        let ana = user(&mut store, "ana@example.com");
        store.delete("User", &ana.id).unwrap();
        user(&mut store, "ana@example.com");
    }

    #[test]
    fn test_find_many() {
        let mut store = store();
        user(&mut store, "ana@example.com");
        user(&mut store, "bo@example.com");

        let found = store
            .find_many("User", &[("email", Value::from("bo@example.com"))])
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text("email"), Some("bo@example.com"));

        assert_eq!(store.find_many("User", &[]).unwrap().len(), 2);
        assert!(matches!(
            store.find_many("User", &[("password", Value::from("secret1"))]),
            Err(ItemError::NotFilterable { .. })
        ));
        assert!(matches!(
            store.find_many("User", &[("nickname", Value::Null)]),
            Err(ItemError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_find_many_coerces_filters() {
        let mut store = store();
        let ana = store
            .create(
                "User",
                ItemInput::new()
                    .set("firstName", "Ana")
                    .set("lastName", "Lee")
                    .set("email", "ana@example.com")
                    .set("password", "secret1")
                    .set("birthDate", "2000-01-01T00:00:00Z"),
            )
            .unwrap();
        user(&mut store, "bo@example.com");

        let found = store
            .find_many("User", &[("birthDate", Value::from("2000-01-01T00:00:00Z"))])
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, ana.id);

        assert!(matches!(
            store.find_many("User", &[("birthDate", Value::from("last year"))]),
            Err(ItemError::TypeMismatch { .. })
        ));

        store.create("PollAccess", ItemInput::new()).unwrap();
        assert_eq!(
            store
                .find_many("PollAccess", &[("level", Value::from("draft"))])
                .unwrap()
                .len(),
            1
        );
        assert!(matches!(
            store.find_many("PollAccess", &[("level", Value::from("archived"))]),
            Err(ItemError::InvalidOption { .. })
        ));
    }

    #[test]
    fn test_labels_follow_relationships() {
        let mut store = store();
        let answer = store.create("Answer", ItemInput::new().set("answer", "Yes")).unwrap();
        let response = store
            .create("Response", ItemInput::new().connect("answer", &answer.id))
            .unwrap();
        assert_eq!(store.label("Response", &response.id).unwrap(), "Yes");

        let orphan = store.create("Response", ItemInput::new()).unwrap();
        assert_eq!(store.label("Response", &orphan.id).unwrap(), orphan.id.to_string());
    }

    #[test]
    fn test_input_type_errors() {
        let mut store = store();
        assert!(matches!(
            store.create("Poll", ItemInput::new().set("answers", "Yes")),
            Err(ItemError::TypeMismatch { .. })
        ));
        assert!(matches!(
            store.create("Tag", ItemInput::new().connect("name", &ItemId::from("x"))),
            Err(ItemError::TypeMismatch { .. })
        ));
        assert!(matches!(
            store.create("Tag", ItemInput::new().set("slug", "x")),
            Err(ItemError::UnknownField { .. })
        ));
        assert!(matches!(
            store.create("Post", ItemInput::new()),
            Err(ItemError::UnknownList(_))
        ));
    }

    #[test]
    fn test_virtual_field() {
        fn full_name(values: &BTreeMap<String, Value>) -> Value {
            let first = values.get("first").map(Value::display).unwrap_or_default();
            let last = values.get("last").map(Value::display).unwrap_or_default();
            Value::Text(format!("{} {}", first, last))
        }

        let lists = vec![ListDecl::new("Person")
            .field("first", text())
            .field("last", text())
            .field("fullName", virtual_field(full_name))
            .label_field("fullName")];
        let mut store = ItemStore::new(SchemaRegistry::load(lists).unwrap());
        let person = store
            .create("Person", ItemInput::new().set("first", "Ana").set("last", "Lee"))
            .unwrap();
        assert_eq!(person.text("fullName"), Some("Ana Lee"));
        assert_eq!(store.list_view("Person").unwrap().rows[0].cells, vec!["Ana Lee"]);
        assert!(matches!(
            store.update("Person", &person.id, ItemInput::new().set("fullName", "x")),
            Err(ItemError::TypeMismatch { .. })
        ));
    }
}
