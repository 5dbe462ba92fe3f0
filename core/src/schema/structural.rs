//! Structural (JSON-Schema) validation seam
//!
//! Consensus rules are implemented natively; structural conformance is
//! delegated to a JSON-Schema engine behind the [`StructuralValidator`]
//! trait. Subschemas are resolved to self-contained documents before
//! compilation: the system schema's definitions are inlined and
//! platform refs rewritten to local pointers, so the engine never needs to
//! resolve remote references.

use serde_json::{Map, Value};
use thiserror::Error;

use super::{params, system_schema, DapSchema};
use crate::codec::RecordKind;
use crate::models::DapObject;

/// Why a document or instance failed structural validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructuralError {
    /// The schema document itself does not compile
    #[error("schema document rejected: {message}")]
    Schema {
        /// Engine error message
        message: String,
    },

    /// An instance does not conform to its schema
    #[error("instance of '{objtype}' rejected at '{path}': {message}")]
    Instance {
        /// The record kind or object type being validated
        objtype: String,
        /// JSON path to the violation
        path: String,
        /// Engine error message
        message: String,
    },

    /// An object names a subschema the active schema does not declare
    #[error("unknown subschema type '{objtype}'")]
    UnknownSubschema {
        /// The undeclared type
        objtype: String,
    },

    /// A record violates a value-level invariant
    #[error("malformed record: {0}")]
    Malformed(String),
}

/// The structural validation capability the engine consumes
pub trait StructuralValidator {
    /// Check that a schema document compiles
    fn check_schema(&self, schema: &Value) -> Result<(), StructuralError>;

    /// Validate an instance against a schema document
    ///
    /// `objtype` labels the instance in error reports.
    fn check_instance(
        &self,
        schema: &Value,
        objtype: &str,
        instance: &Value,
    ) -> Result<(), StructuralError>;
}

/// Default structural validator backed by the `jsonschema` crate
#[derive(Debug, Default, Clone)]
pub struct DraftValidator;

impl StructuralValidator for DraftValidator {
    fn check_schema(&self, schema: &Value) -> Result<(), StructuralError> {
        jsonschema::validator_for(schema)
            .map(|_| ())
            .map_err(|error| StructuralError::Schema {
                message: error.to_string(),
            })
    }

    fn check_instance(
        &self,
        schema: &Value,
        objtype: &str,
        instance: &Value,
    ) -> Result<(), StructuralError> {
        let validator =
            jsonschema::validator_for(schema).map_err(|error| StructuralError::Schema {
                message: error.to_string(),
            })?;

        validator
            .validate(instance)
            .map_err(|error| StructuralError::Instance {
                objtype: objtype.to_string(),
                path: error.instance_path.to_string(),
                message: error.to_string(),
            })
    }
}

/// Resolve a subschema into a self-contained schema document
///
/// The system definitions are inlined under `definitions` and every
/// `<sys-uri>#/...` reference is rewritten to a local pointer.
pub fn effective_subschema(schema: &DapSchema, objtype: &str) -> Result<Value, StructuralError> {
    let subschema = schema
        .subschema(objtype)
        .ok_or_else(|| StructuralError::UnknownSubschema {
            objtype: objtype.to_string(),
        })?;

    let mut document = subschema.clone();
    localize_refs(&mut document);

    let definitions = system_schema()
        .get("definitions")
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));

    let map = document
        .as_object_mut()
        .ok_or_else(|| StructuralError::Malformed(format!("subschema '{}' is not a mapping", objtype)))?;
    map.insert("definitions".to_string(), definitions);
    map.entry("type".to_string())
        .or_insert_with(|| Value::String("object".to_string()));

    Ok(document)
}

/// Rewrite `<sys-uri>#/...` references to local `#/...` pointers
fn localize_refs(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, entry) in map.iter_mut() {
                if key == "$ref" {
                    if let Value::String(reference) = entry {
                        let remote_prefix = format!("{}#", params::SYS_SCHEMA_URI);
                        if let Some(pointer) = reference.strip_prefix(&remote_prefix) {
                            *reference = format!("#{}", pointer);
                        }
                    }
                } else {
                    localize_refs(entry);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                localize_refs(item);
            }
        }
        _ => {}
    }
}

/// Structurally validate a DAP object against its declared subschema
pub fn validate_object(
    schema: &DapSchema,
    object: &DapObject,
    validator: &dyn StructuralValidator,
) -> Result<(), StructuralError> {
    let document = effective_subschema(schema, &object.objtype)?;
    let instance = serde_json::to_value(object)
        .map_err(|e| StructuralError::Malformed(e.to_string()))?;
    validator.check_instance(&document, &object.objtype, &instance)
}

/// Structurally validate a system record against the system schema
pub fn validate_system_record(
    kind: RecordKind,
    record: &Value,
    validator: &dyn StructuralValidator,
) -> Result<(), StructuralError> {
    let key = kind
        .system_key()
        .ok_or_else(|| StructuralError::Malformed("not a system record kind".to_string()))?;

    let subschema = system_schema()
        .get("properties")
        .and_then(|properties| properties.get(key))
        .ok_or_else(|| StructuralError::Malformed(format!("no system schema for '{}'", key)))?;

    let mut document = subschema.clone();
    if let Some(map) = document.as_object_mut() {
        let definitions = system_schema()
            .get("definitions")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        map.insert("definitions".to_string(), definitions);
    }
    // Pointers into the system document (e.g. a packet's embedded contract)
    // are inlined rather than resolved remotely
    inline_property_refs(&mut document);

    validator.check_instance(&document, key, record)
}

/// Replace `#/properties/...` refs with the referenced system subschema
fn inline_property_refs(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let reference = map
                .get("$ref")
                .and_then(Value::as_str)
                .filter(|r| r.starts_with("#/properties/"))
                .map(str::to_string);
            if let Some(reference) = reference {
                if let Some(resolved) = system_schema().pointer(&reference[1..]) {
                    *value = resolved.clone();
                    inline_property_refs(value);
                    return;
                }
            }
            for entry in map.values_mut() {
                inline_property_refs(entry);
            }
        }
        Value::Array(items) => {
            for item in items {
                inline_property_refs(item);
            }
        }
        _ => {}
    }
}
