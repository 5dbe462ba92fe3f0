//! The platform system schema
//!
//! The system schema declares the structure of every system record kind
//! (registration, identity, transition header, transition packet, DAP
//! contract) and the shared definitions DAP subschemas build on: the base
//! object definition and the relation definition.
//!
//! System records reject unknown properties; DAP subschemas allow them so
//! user schemas can extend the base object freely.

use std::sync::OnceLock;

use serde_json::{json, Value};

use super::params;

static SYSTEM: OnceLock<Value> = OnceLock::new();

/// The system schema document
pub fn system_schema() -> &'static Value {
    SYSTEM.get_or_init(build_system_schema)
}

/// Top-level property names of the system schema (the system record kinds)
pub fn system_property_names() -> Vec<&'static str> {
    system_schema()
        .get("properties")
        .and_then(Value::as_object)
        .map(|map| map.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

/// Definition names of the system schema
pub fn system_definition_names() -> Vec<&'static str> {
    system_schema()
        .get("definitions")
        .and_then(Value::as_object)
        .map(|map| map.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

fn build_system_schema() -> Value {
    json!({
        "$id": params::SYS_SCHEMA_URI,
        "title": "SystemSchema",
        "type": "object",
        "definitions": {
            "objectmeta": {
                "type": "object"
            },
            "relation": {
                "type": "object",
                "properties": {
                    "userId": {"type": "string"},
                    "type": {"type": "string"},
                    "id": {"type": "string"}
                },
                "required": ["userId"]
            },
            "dapobjectbase": {
                "type": "object",
                "properties": {
                    "objtype": {"type": "string"},
                    "id": {"type": "string"},
                    "rev": {"type": "integer", "minimum": 0},
                    "act": {"type": "integer", "enum": [1, 2, 3]}
                },
                "required": ["objtype", "id", "rev", "act"]
            }
        },
        "properties": {
            "subtx": {
                "type": "object",
                "properties": {
                    "pver": {"type": "integer"},
                    "action": {"type": "integer"},
                    "uname": {"type": "string"},
                    "pubkey": {"type": "string"},
                    "meta": {"$ref": "#/definitions/objectmeta"}
                },
                "required": ["pver", "action", "uname", "pubkey"],
                "additionalProperties": false
            },
            "blockchainuser": {
                "type": "object",
                "properties": {
                    "pver": {"type": "integer"},
                    "uname": {"type": "string"},
                    "uid": {"type": "string"},
                    "pubkey": {"type": "string"},
                    "credits": {"type": "integer", "minimum": 0},
                    "meta": {"$ref": "#/definitions/objectmeta"}
                },
                "required": ["pver", "uname", "uid", "pubkey", "credits"],
                "additionalProperties": false
            },
            "stheader": {
                "type": "object",
                "properties": {
                    "pver": {"type": "integer"},
                    "fee": {"type": "integer", "minimum": 0},
                    "uid": {"type": "string"},
                    "ptsid": {"type": "string"},
                    "pakid": {"type": "string"},
                    "usig": {"type": "string"},
                    "qsig": {"type": "string"},
                    "meta": {"$ref": "#/definitions/objectmeta"}
                },
                "required": ["pver", "uid", "pakid"],
                "additionalProperties": false
            },
            "stpacket": {
                "type": "object",
                "properties": {
                    "pver": {"type": "integer"},
                    "dapid": {"type": "string"},
                    "dapcontract": {"$ref": "#/properties/dapcontract"},
                    "dapobjects": {
                        "type": "array",
                        "minItems": 1,
                        "items": {"$ref": "#/definitions/dapobjectbase"}
                    },
                    "meta": {"$ref": "#/definitions/objectmeta"}
                },
                "required": ["pver", "dapid"],
                "oneOf": [
                    {"required": ["dapcontract"]},
                    {"required": ["dapobjects"]}
                ],
                "additionalProperties": false
            },
            "dapcontract": {
                "type": "object",
                "properties": {
                    "pver": {"type": "integer"},
                    "idx": {"type": "integer", "minimum": 0},
                    "dapid": {"type": "string"},
                    "dapname": {"type": "string"},
                    "dapver": {"type": "string"},
                    "dapschema": {"type": "object"},
                    "meta": {"$ref": "#/definitions/objectmeta"}
                },
                "required": ["pver", "dapname", "dapschema"],
                "additionalProperties": false
            }
        },
        "oneOf": [
            {"required": ["subtx"]},
            {"required": ["blockchainuser"]},
            {"required": ["stheader"]},
            {"required": ["stpacket"]},
            {"required": ["dapcontract"]}
        ],
        "additionalProperties": false
    })
}
