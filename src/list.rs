//! List declarations
//!
//! A list is a named record type: an ordered set of fields plus hints for the
//! admin UI.

use serde::{Deserialize, Serialize};

use crate::field::{FieldDecl, FieldKind};

/// Admin UI hints for a list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListUi {
    /// Field used to label items in relationship widgets and list views
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_field: Option<String>,
    /// Columns shown in the list view
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub initial_columns: Vec<String>,
    /// Hidden from admin navigation
    #[serde(default)]
    pub is_hidden: bool,
}

/// A single list declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDecl {
    /// List key (e.g., "User", "PollAccess")
    pub key: String,
    /// Fields in declaration order
    pub fields: Vec<FieldDecl>,
    #[serde(default)]
    pub ui: ListUi,
}

impl ListDecl {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            fields: Vec::new(),
            ui: ListUi::default(),
        }
    }

    /// Append a field
    pub fn field(mut self, key: impl Into<String>, kind: impl Into<FieldKind>) -> Self {
        self.fields.push(FieldDecl {
            key: key.into(),
            kind: kind.into(),
        });
        self
    }

    pub fn label_field(mut self, field: impl Into<String>) -> Self {
        self.ui.label_field = Some(field.into());
        self
    }

    pub fn initial_columns(mut self, columns: &[&str]) -> Self {
        self.ui.initial_columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.ui.is_hidden = true;
        self
    }

    pub fn get_field(&self, key: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Declared label field, else `name`, else `title`, else the item id
    pub fn effective_label_field(&self) -> &str {
        if let Some(label) = &self.ui.label_field {
            return label;
        }
        ["name", "title"]
            .into_iter()
            .find(|candidate| self.get_field(candidate).is_some())
            .unwrap_or("id")
    }

    /// Declared columns, else just the label field
    pub fn effective_columns(&self) -> Vec<String> {
        if self.ui.initial_columns.is_empty() {
            vec![self.effective_label_field().to_string()]
        } else {
            self.ui.initial_columns.clone()
        }
    }

    /// Iterate over relationship fields only
    pub fn relationships(&self) -> impl Iterator<Item = &FieldDecl> {
        self.fields
            .iter()
            .filter(|f| matches!(f.kind, FieldKind::Relationship(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{relationship, text};

    #[test]
    fn test_label_fallbacks() {
        let tag = ListDecl::new("Tag").field("name", text());
        assert_eq!(tag.effective_label_field(), "name");
        assert_eq!(tag.effective_columns(), vec!["name".to_string()]);

        let response = ListDecl::new("Response").field("user", relationship("User.responses"));
        assert_eq!(response.effective_label_field(), "id");

        let answer = ListDecl::new("Answer")
            .field("answer", text())
            .label_field("answer");
        assert_eq!(answer.effective_label_field(), "answer");
    }

    #[test]
    fn test_relationships_iter() {
        let list = ListDecl::new("Poll")
            .field("question", text())
            .field("tags", relationship("Tag.polls").many())
            .field("access", relationship("PollAccess.polls"));
        let keys: Vec<_> = list.relationships().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["tags", "access"]);
    }
}
