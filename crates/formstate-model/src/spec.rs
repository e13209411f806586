//! Declarative form configuration loaded from JSON.
//!
//! A [`ConfigSpec`] describes the shape of a form without any host code:
//! which keys are value fields, nested objects, row lists or passenger
//! fragments, plus the declarative rules and markers each one carries.
//! Hosts that need custom predicates or init hooks build their
//! configuration in code instead.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Special meaning a value field carries for its owning object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldRole {
    #[default]
    Plain,
    /// Entity identity used for row matching and partial updates.
    Id,
    /// Marks the row as deleted in incremental payloads.
    Delete,
    /// Operation discriminator (`include` / `delete`).
    #[serde(alias = "op")]
    Operation,
    /// Truthy value makes the owning object read-only.
    ReadOnlyFlag,
}

/// How a list reports its rows in the partial-update payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdateMode {
    /// Every row is emitted.
    #[default]
    Exhaustive,
    /// Only dirty or new rows are emitted.
    Incremental,
}

/// Declarative validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "camelCase")]
pub enum RuleSpec {
    Required,
    MaxLength { max: usize },
}

fn default_true() -> bool {
    true
}

/// One entry in an object's field table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FieldSpec {
    Value(ValueFieldSpec),
    Object(ObjectSpec),
    List(ListSpec),
    Fragment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueFieldSpec {
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
    #[serde(default)]
    pub role: FieldRole,
    #[serde(default)]
    pub computed: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default = "default_true")]
    pub strict_order: bool,
}

impl Default for ValueFieldSpec {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            role: FieldRole::Plain,
            computed: false,
            read_only: false,
            strict_order: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSpec {
    #[serde(default)]
    pub fields: IndexMap<String, FieldSpec>,
    /// Only the id is emitted in partial updates.
    #[serde(default)]
    pub reference: bool,
    #[serde(default)]
    pub read_only: bool,
}

impl ObjectSpec {
    /// Reject objects where the id or operation role is claimed twice,
    /// recursing into nested objects and list rows.
    pub fn validate(&self, name: &str) -> Result<()> {
        for role in [FieldRole::Id, FieldRole::Operation] {
            let claims = self
                .fields
                .values()
                .filter(|field| matches!(field, FieldSpec::Value(spec) if spec.role == role))
                .count();
            if claims > 1 {
                return Err(ModelError::DuplicateRole {
                    object: name.to_string(),
                    role,
                });
            }
        }
        for (key, field) in &self.fields {
            match field {
                FieldSpec::Object(object) => object.validate(&format!("{name}.{key}"))?,
                FieldSpec::List(list) => list.row.validate(&format!("{name}.{key}[]"))?,
                FieldSpec::Value(_) | FieldSpec::Fragment => {}
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSpec {
    pub row: ObjectSpec,
    #[serde(default = "default_true")]
    pub strict_order: bool,
    #[serde(default)]
    pub update: UpdateMode,
    #[serde(default)]
    pub min_rows: Option<usize>,
    #[serde(default)]
    pub read_only: bool,
}

/// Root of a JSON form configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSpec {
    /// Display name used in diagnostics.
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(flatten)]
    pub root: ObjectSpec,
}

fn default_name() -> String {
    "form".to_string()
}

impl ConfigSpec {
    pub fn from_json(text: &str) -> Result<Self> {
        let spec: ConfigSpec = serde_json::from_str(text)?;
        spec.root.validate(&spec.name)?;
        Ok(spec)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOKS: &str = r#"{
        "name": "author",
        "fields": {
            "id": { "kind": "value", "role": "id" },
            "firstName": { "kind": "value", "rules": [{ "rule": "required" }] },
            "books": {
                "kind": "list",
                "update": "incremental",
                "strictOrder": false,
                "row": {
                    "fields": {
                        "id": { "kind": "value", "role": "id" },
                        "title": { "kind": "value", "rules": [{ "rule": "maxLength", "max": 20 }] },
                        "op": { "kind": "value", "role": "op" }
                    }
                }
            },
            "extra": { "kind": "fragment" }
        }
    }"#;

    #[test]
    fn parses_nested_config() {
        let spec = ConfigSpec::from_json(BOOKS).expect("parse config");
        assert_eq!(spec.name, "author");
        let keys: Vec<_> = spec.root.fields.keys().cloned().collect();
        assert_eq!(keys, ["id", "firstName", "books", "extra"]);

        let FieldSpec::List(books) = &spec.root.fields["books"] else {
            panic!("books should be a list");
        };
        assert_eq!(books.update, UpdateMode::Incremental);
        assert!(!books.strict_order);
        let FieldSpec::Value(op) = &books.row.fields["op"] else {
            panic!("op should be a value field");
        };
        assert_eq!(op.role, FieldRole::Operation);
        let FieldSpec::Value(title) = &books.row.fields["title"] else {
            panic!("title should be a value field");
        };
        assert_eq!(title.rules, [RuleSpec::MaxLength { max: 20 }]);
        assert!(title.strict_order);
    }

    #[test]
    fn unknown_rule_is_rejected() {
        let err = ConfigSpec::from_json(
            r#"{ "fields": { "a": { "kind": "value", "rules": [{ "rule": "shout" }] } } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::Json(_)));
    }

    #[test]
    fn duplicate_id_role_is_rejected() {
        let err = ConfigSpec::from_json(
            r#"{ "fields": {
                "a": { "kind": "value", "role": "id" },
                "b": { "kind": "value", "role": "id" }
            } }"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ModelError::DuplicateRole { role: FieldRole::Id, .. }
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ConfigSpec::from_path(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
