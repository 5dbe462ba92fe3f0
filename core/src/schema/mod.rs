//! DAP schema handling
//!
//! This module provides the user-authored schema wrapper and typed
//! accessors, the platform system schema, the schema compiler that decides
//! whether a candidate schema may be registered, and the structural
//! validation seam backed by a JSON-Schema engine.

mod compile;
mod structural;
mod system;

pub use compile::{SchemaCompiler, SchemaDefinitionError};
pub use structural::{
    effective_subschema, validate_object, validate_system_record, DraftValidator, StructuralError,
    StructuralValidator,
};
pub use system::{system_definition_names, system_property_names, system_schema};

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Consensus parameters for schema handling
pub mod params {
    /// Meta-schema URI every DAP schema must declare
    pub const DAP_SCHEMA_META_URI: &str = "https://schemas.docchain.dev/dap";

    /// URI of the platform system schema
    pub const SYS_SCHEMA_URI: &str = "https://schemas.docchain.dev/sys";

    /// Canonical reference every subschema must inherit from
    pub const DAP_OBJECT_BASE_REF: &str =
        "https://schemas.docchain.dev/sys#/definitions/dapobjectbase";

    /// Canonical reference marking a property as a relation field
    pub const RELATION_REF: &str = "https://schemas.docchain.dev/sys#/definitions/relation";

    /// Keywords that can never be subschema names
    pub const RESERVED_KEYWORDS: &[&str] = &["type"];
}

/// Composite-primary-key declaration of a subschema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryKeySpec {
    /// Whether the key is composite (derived) at all
    #[serde(default)]
    pub composite: bool,

    /// Object fields folded into the key, in declaration order
    #[serde(default)]
    pub includes: Vec<String>,
}

/// A user-authored DAP schema document
///
/// The document is kept in its JSON form; this wrapper adds the typed
/// accessors the engine needs. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DapSchema(Value);

/// Base-object fields every DAP object carries
const BASE_OBJECT_FIELDS: [&str; 4] = ["objtype", "id", "rev", "act"];

impl DapSchema {
    /// Wrap a JSON document as a DAP schema (no validation)
    pub fn new(document: Value) -> Self {
        DapSchema(document)
    }

    /// The raw schema document
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// The declared meta-schema URI (`$schema`)
    pub fn meta_uri(&self) -> Option<&str> {
        self.0.get("$schema").and_then(Value::as_str)
    }

    /// The schema title, if it is a string
    pub fn title(&self) -> Option<&str> {
        self.0.get("title").and_then(Value::as_str)
    }

    /// Number of top-level keys, including `$schema` and `title`
    pub fn key_count(&self) -> usize {
        self.0.as_object().map(|map| map.len()).unwrap_or(0)
    }

    /// Names of the declared subschemas, in sorted order
    pub fn subschema_names(&self) -> Vec<&str> {
        match self.0.as_object() {
            Some(map) => map
                .keys()
                .map(String::as_str)
                .filter(|key| *key != "$schema" && *key != "title")
                .collect(),
            None => Vec::new(),
        }
    }

    /// The definition of one subschema
    pub fn subschema(&self, name: &str) -> Option<&Value> {
        if name == "$schema" || name == "title" {
            return None;
        }
        self.0.get(name).filter(|value| value.is_object())
    }

    /// The composite-primary-key declaration of a subschema, if present
    pub fn primary_key(&self, objtype: &str) -> Option<PrimaryKeySpec> {
        let spec = self.subschema(objtype)?.get("primaryKey")?;
        serde_json::from_value(spec.clone()).ok()
    }

    /// Names of the relation fields a subschema declares
    ///
    /// A property is a relation field when its definition references the
    /// platform relation definition.
    pub fn relation_fields(&self, objtype: &str) -> Vec<String> {
        let properties = match self
            .subschema(objtype)
            .and_then(|sub| sub.get("properties"))
            .and_then(Value::as_object)
        {
            Some(properties) => properties,
            None => return Vec::new(),
        };

        properties
            .iter()
            .filter(|(_, definition)| is_relation_definition(definition))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// All field names a subschema declares, including the base-object
    /// fields; `None` if the subschema does not exist
    pub fn declared_fields(&self, objtype: &str) -> Option<BTreeSet<String>> {
        let subschema = self.subschema(objtype)?;

        let mut fields: BTreeSet<String> =
            BASE_OBJECT_FIELDS.iter().map(|s| s.to_string()).collect();
        if let Some(properties) = subschema.get("properties").and_then(Value::as_object) {
            fields.extend(properties.keys().cloned());
        }
        Some(fields)
    }
}

fn is_relation_definition(definition: &Value) -> bool {
    if definition.get("$ref").and_then(Value::as_str) == Some(params::RELATION_REF) {
        return true;
    }
    definition
        .get("allOf")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .any(|entry| entry.get("$ref").and_then(Value::as_str) == Some(params::RELATION_REF))
        })
        .unwrap_or(false)
}
