//! Schema Linting
//!
//! Checks that do not make a declaration unloadable but that the admin UI or
//! API consumers would trip over.
//!
//! ## Lints
//! 1. **Naming**: list keys PascalCase, field keys camelCase
//! 2. **Labels**: every list should have something better than the id to show
//! 3. **Cards**: card fields must exist on the related list
//! 4. **Reachability**: hidden lists must be reachable from a visible one

use regex::Regex;

use crate::field::FieldKind;
use crate::graph::RelationGraph;
use crate::registry::SchemaRegistry;

/// Result of linting one list
#[derive(Debug, Default)]
pub struct LintResult {
    pub list: String,
    pub errors: Vec<LintError>,
    pub warnings: Vec<LintWarning>,
}

impl LintResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[derive(Debug)]
pub struct LintError {
    pub code: &'static str,
    pub message: String,
    pub path: String,
}

#[derive(Debug)]
pub struct LintWarning {
    pub code: &'static str,
    pub message: String,
    pub path: String,
}

pub struct SchemaLinter {
    list_key: Regex,
    field_key: Regex,
}

impl Default for SchemaLinter {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaLinter {
    pub fn new() -> Self {
        Self {
            list_key: Regex::new(r"^[A-Z][a-zA-Z0-9]*$").unwrap(),
            field_key: Regex::new(r"^[a-z][a-zA-Z0-9]*$").unwrap(),
        }
    }

    /// Lint every list; only lists with findings are returned
    pub fn lint(&self, registry: &SchemaRegistry) -> Vec<LintResult> {
        let graph = RelationGraph::new(registry);
        let visible: Vec<_> = registry
            .lists()
            .filter(|(_, l)| !l.ui.is_hidden)
            .map(|(id, _)| id)
            .collect();
        let reachable = graph.reachable_from(&visible);

        let mut results = Vec::new();
        for (id, list) in registry.lists() {
            let mut result = LintResult {
                list: list.key.clone(),
                ..Default::default()
            };

            if !self.list_key.is_match(&list.key) {
                result.warnings.push(LintWarning {
                    code: "LIST_KEY_CASE",
                    message: format!("List key '{}' should be PascalCase", list.key),
                    path: list.key.clone(),
                });
            }

            if list.effective_label_field() == "id" {
                result.warnings.push(LintWarning {
                    code: "NO_LABEL_FIELD",
                    message: format!("List '{}' has no label field; items will be shown by id", list.key),
                    path: format!("{}.ui.labelField", list.key),
                });
            }

            if list.ui.is_hidden && !reachable.contains(&id) {
                result.warnings.push(LintWarning {
                    code: "HIDDEN_UNREACHABLE",
                    message: format!("Hidden list '{}' is not reachable from any visible list", list.key),
                    path: list.key.clone(),
                });
            }

            for field in &list.fields {
                let path = format!("{}.{}", list.key, field.key);
                if !self.field_key.is_match(&field.key) {
                    result.warnings.push(LintWarning {
                        code: "FIELD_KEY_CASE",
                        message: format!("Field key '{}' should be camelCase", field.key),
                        path: path.clone(),
                    });
                }

                if let FieldKind::Relationship(rel) = &field.kind {
                    let Some(target) = rel
                        .target()
                        .and_then(|(key, _)| registry.list_id(key))
                        .map(|t| registry.list(t))
                    else {
                        continue;
                    };
                    for card in &rel.ui.card_fields {
                        if card != "id" && target.get_field(card).is_none() {
                            result.errors.push(LintError {
                                code: "UNKNOWN_CARD_FIELD",
                                message: format!(
                                    "Card field '{}' does not exist on list '{}'",
                                    card, target.key
                                ),
                                path: format!("{}.ui.cardFields", path),
                            });
                        }
                    }
                }
            }

            if !result.is_clean() || result.has_warnings() {
                results.push(result);
            }
        }
        results
    }
}
