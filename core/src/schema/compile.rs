//! Compiling user-authored DAP schema definitions
//!
//! The compiler decides whether a candidate schema is well-formed enough to
//! be registered. Rules run in a fixed order and fail fast with the first
//! violated rule and the offending key. The compiler has no side effects.

use thiserror::Error;

use super::structural::{effective_subschema, StructuralValidator};
use super::{params, system_definition_names, system_property_names, DapSchema};
use crate::config::SchemaLimits;

/// The rule that rejected a candidate schema
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaDefinitionError {
    /// `$schema` is not the platform meta-URI, or the document does not
    /// compile as a structural schema
    #[error("invalid meta-schema: {detail}")]
    InvalidMetaschema {
        /// What failed
        detail: String,
    },

    /// The title is missing, not a string, or out of bounds
    #[error("schema title must be a string of {min} to {max} characters")]
    InvalidSchemaTitle {
        /// Minimum accepted length
        min: usize,
        /// Maximum accepted length
        max: usize,
    },

    /// Too few or too many subschemas
    #[error("schema must declare between 1 and {max} subschemas, found {count} top-level keys")]
    InvalidSubschemaCount {
        /// Observed top-level key count (including `$schema` and `title`)
        count: usize,
        /// Maximum accepted subschema count
        max: usize,
    },

    /// A subschema name violates the length or charset rule
    #[error("invalid subschema name '{name}': {reason}")]
    InvalidSubschemaName {
        /// The offending name
        name: String,
        /// Which naming rule failed
        reason: &'static str,
    },

    /// A subschema name collides with a reserved word
    #[error("subschema name '{name}' is reserved ({origin})")]
    ReservedSubschemaName {
        /// The offending name
        name: String,
        /// Where the reservation comes from
        origin: &'static str,
    },

    /// A subschema does not inherit the platform base object definition
    #[error("subschema '{name}' must inherit the base object definition")]
    InvalidSubschemaInheritance {
        /// The offending subschema
        name: String,
    },
}

/// Validates candidate DAP schemas against the platform rules
pub struct SchemaCompiler<'a> {
    limits: &'a SchemaLimits,
    structural: &'a dyn StructuralValidator,
}

impl<'a> SchemaCompiler<'a> {
    /// Create a compiler with the given limits and structural backend
    pub fn new(limits: &'a SchemaLimits, structural: &'a dyn StructuralValidator) -> Self {
        SchemaCompiler { limits, structural }
    }

    /// Validate a candidate schema, returning the first violated rule
    pub fn compile(&self, schema: &DapSchema) -> Result<(), SchemaDefinitionError> {
        self.check_meta_uri(schema)?;
        self.check_title(schema)?;
        self.check_count(schema)?;
        for name in schema.subschema_names() {
            self.check_name(name)?;
        }
        for name in schema.subschema_names() {
            self.check_inheritance(schema, name)?;
        }
        self.check_structure(schema)?;
        Ok(())
    }

    fn check_meta_uri(&self, schema: &DapSchema) -> Result<(), SchemaDefinitionError> {
        if schema.meta_uri() != Some(params::DAP_SCHEMA_META_URI) {
            return Err(SchemaDefinitionError::InvalidMetaschema {
                detail: "missing or unrecognized $schema tag".to_string(),
            });
        }
        Ok(())
    }

    fn check_title(&self, schema: &DapSchema) -> Result<(), SchemaDefinitionError> {
        let error = SchemaDefinitionError::InvalidSchemaTitle {
            min: self.limits.min_title_len,
            max: self.limits.max_title_len,
        };
        match schema.title() {
            Some(title)
                if (self.limits.min_title_len..=self.limits.max_title_len)
                    .contains(&title.len()) =>
            {
                Ok(())
            }
            _ => Err(error),
        }
    }

    fn check_count(&self, schema: &DapSchema) -> Result<(), SchemaDefinitionError> {
        // Top-level keys = subschemas plus $schema and title
        let count = schema.key_count();
        if count < 3 || count > self.limits.max_subschemas + 2 {
            return Err(SchemaDefinitionError::InvalidSubschemaCount {
                count,
                max: self.limits.max_subschemas,
            });
        }
        Ok(())
    }

    fn check_name(&self, name: &str) -> Result<(), SchemaDefinitionError> {
        if !(self.limits.min_name_len..=self.limits.max_name_len).contains(&name.len()) {
            return Err(SchemaDefinitionError::InvalidSubschemaName {
                name: name.to_string(),
                reason: "invalid name length",
            });
        }

        let valid_chars = name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !valid_chars {
            return Err(SchemaDefinitionError::InvalidSubschemaName {
                name: name.to_string(),
                reason: "disallowed name characters",
            });
        }

        if params::RESERVED_KEYWORDS.iter().any(|k| *k == name) {
            return Err(SchemaDefinitionError::ReservedSubschemaName {
                name: name.to_string(),
                origin: "reserved keyword",
            });
        }
        if system_property_names().iter().any(|k| *k == name) {
            return Err(SchemaDefinitionError::ReservedSubschemaName {
                name: name.to_string(),
                origin: "system schema property",
            });
        }
        if system_definition_names().iter().any(|k| *k == name) {
            return Err(SchemaDefinitionError::ReservedSubschemaName {
                name: name.to_string(),
                origin: "system schema definition",
            });
        }
        Ok(())
    }

    fn check_inheritance(
        &self,
        schema: &DapSchema,
        name: &str,
    ) -> Result<(), SchemaDefinitionError> {
        let error = SchemaDefinitionError::InvalidSubschemaInheritance {
            name: name.to_string(),
        };

        let subschema = schema.subschema(name).ok_or_else(|| error.clone())?;
        let inherits = subschema
            .get("allOf")
            .and_then(serde_json::Value::as_array)
            .and_then(|entries| entries.first())
            .and_then(|first| first.get("$ref"))
            .and_then(serde_json::Value::as_str);

        if inherits != Some(params::DAP_OBJECT_BASE_REF) {
            return Err(error);
        }
        Ok(())
    }

    fn check_structure(&self, schema: &DapSchema) -> Result<(), SchemaDefinitionError> {
        // The whole definition must also compile as a structural schema;
        // each subschema is resolved to its self-contained form first.
        for name in schema.subschema_names() {
            let document = effective_subschema(schema, name).map_err(|e| {
                SchemaDefinitionError::InvalidMetaschema {
                    detail: e.to_string(),
                }
            })?;
            self.structural.check_schema(&document).map_err(|e| {
                SchemaDefinitionError::InvalidMetaschema {
                    detail: e.to_string(),
                }
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DraftValidator;
    use rstest::rstest;
    use serde_json::{json, Value};

    fn compile(document: Value) -> Result<(), SchemaDefinitionError> {
        let limits = SchemaLimits::default();
        let structural = DraftValidator::default();
        let compiler = SchemaCompiler::new(&limits, &structural);
        compiler.compile(&DapSchema::new(document))
    }

    fn valid_schema_with(name: &str) -> Value {
        json!({
            "$schema": params::DAP_SCHEMA_META_URI,
            "title": "somedap",
            name: {
                "type": "object",
                "allOf": [{"$ref": params::DAP_OBJECT_BASE_REF}],
                "properties": {"note": {"type": "string"}}
            }
        })
    }

    #[test]
    fn test_valid_schema() {
        assert!(compile(valid_schema_with("thing")).is_ok());
    }

    #[test]
    fn test_wrong_meta_uri() {
        let mut document = valid_schema_with("thing");
        document["$schema"] = json!("https://example.org/other");
        assert!(matches!(
            compile(document),
            Err(SchemaDefinitionError::InvalidMetaschema { .. })
        ));
    }

    #[rstest]
    #[case("ab", false)]
    #[case("abc", true)]
    #[case("abcdefghijklmnopqrstuvwx", true)]
    #[case("abcdefghijklmnopqrstuvwxy", false)]
    fn test_title_length_boundaries(#[case] title: &str, #[case] accepted: bool) {
        let mut document = valid_schema_with("thing");
        document["title"] = json!(title);
        let result = compile(document);
        if accepted {
            assert!(result.is_ok());
        } else {
            assert!(matches!(
                result,
                Err(SchemaDefinitionError::InvalidSchemaTitle { .. })
            ));
        }
    }

    #[test]
    fn test_missing_title() {
        let mut document = valid_schema_with("thing");
        document.as_object_mut().unwrap().remove("title");
        // With title gone the key count also drops below the minimum, but
        // the title rule fires first
        assert!(matches!(
            compile(document),
            Err(SchemaDefinitionError::InvalidSchemaTitle { .. })
        ));
    }

    #[test]
    fn test_no_subschemas() {
        let document = json!({
            "$schema": params::DAP_SCHEMA_META_URI,
            "title": "somedap"
        });
        assert!(matches!(
            compile(document),
            Err(SchemaDefinitionError::InvalidSubschemaCount { .. })
        ));
    }

    #[rstest]
    #[case("ab", false)]
    #[case("abc", true)]
    #[case("abcdefghijklmnopqrstuvwx", true)]
    #[case("abcdefghijklmnopqrstuvwxy", false)]
    fn test_name_length_boundaries(#[case] name: &str, #[case] accepted: bool) {
        let result = compile(valid_schema_with(name));
        if accepted {
            assert!(result.is_ok());
        } else {
            assert!(matches!(
                result,
                Err(SchemaDefinitionError::InvalidSubschemaName { .. })
            ));
        }
    }

    #[rstest]
    #[case("camelCase")]
    #[case("with-dash")]
    #[case("with space")]
    fn test_name_charset(#[case] name: &str) {
        assert!(matches!(
            compile(valid_schema_with(name)),
            Err(SchemaDefinitionError::InvalidSubschemaName { .. })
        ));
    }

    #[rstest]
    #[case("type", "reserved keyword")]
    #[case("subtx", "system schema property")]
    #[case("dapobjectbase", "system schema definition")]
    fn test_reserved_names(#[case] name: &str, #[case] expected_source: &str) {
        match compile(valid_schema_with(name)) {
            Err(SchemaDefinitionError::ReservedSubschemaName { origin, .. }) => {
                assert_eq!(origin, expected_source);
            }
            other => panic!("expected reserved-name rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_inheritance() {
        let document = json!({
            "$schema": params::DAP_SCHEMA_META_URI,
            "title": "somedap",
            "thing": {
                "type": "object",
                "properties": {"note": {"type": "string"}}
            }
        });
        assert!(matches!(
            compile(document),
            Err(SchemaDefinitionError::InvalidSubschemaInheritance { .. })
        ));
    }

    #[test]
    fn test_wrong_inheritance_ref() {
        let document = json!({
            "$schema": params::DAP_SCHEMA_META_URI,
            "title": "somedap",
            "thing": {
                "type": "object",
                "allOf": [{"$ref": "https://example.org/sys#/definitions/other"}],
                "properties": {"note": {"type": "string"}}
            }
        });
        assert!(matches!(
            compile(document),
            Err(SchemaDefinitionError::InvalidSubschemaInheritance { .. })
        ));
    }

    #[test]
    fn test_structurally_broken_subschema() {
        let document = json!({
            "$schema": params::DAP_SCHEMA_META_URI,
            "title": "somedap",
            "thing": {
                "type": "object",
                "allOf": [{"$ref": params::DAP_OBJECT_BASE_REF}],
                // "type" must be a string or array of strings
                "properties": {"note": {"type": 42}}
            }
        });
        assert!(matches!(
            compile(document),
            Err(SchemaDefinitionError::InvalidMetaschema { .. })
        ));
    }

    #[test]
    fn test_name_rules_run_before_inheritance() {
        // "zzz" sorts after "bad name" but inheritance of "zzz" is missing;
        // the naming pass over all subschemas still fires first
        let document = json!({
            "$schema": params::DAP_SCHEMA_META_URI,
            "title": "somedap",
            "aaa": {
                "type": "object",
                "properties": {}
            },
            "ZZ": {
                "type": "object",
                "allOf": [{"$ref": params::DAP_OBJECT_BASE_REF}]
            }
        });
        assert!(matches!(
            compile(document),
            Err(SchemaDefinitionError::InvalidSubschemaName { .. })
        ));
    }
}
