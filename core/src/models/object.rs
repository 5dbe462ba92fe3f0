//! DAP objects
//!
//! A DAP object is one structured record conforming to a subschema of the
//! active DAP schema. It is strictly owned by the identity that submitted
//! the transition that created it, and lives in that identity's DapSpace.

use std::fmt;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::Meta;
use crate::codec::{self, RecordKind};
use crate::schema::{DapSchema, StructuralError};

/// Mutation opcode carried by every DAP object
///
/// Serialized as the numeric opcode (1=create, 2=update, 3=delete).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Create a new object
    Create,
    /// Update an existing object owned by the submitter
    Update,
    /// Delete an existing object owned by the submitter
    Delete,
}

impl Action {
    /// Numeric opcode of the action
    pub fn code(self) -> u8 {
        match self {
            Action::Create => 1,
            Action::Update => 2,
            Action::Delete => 3,
        }
    }
}

impl TryFrom<u8> for Action {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Action::Create),
            2 => Ok(Action::Update),
            3 => Ok(Action::Delete),
            other => Err(format!("invalid object action code {}", other)),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        };
        write!(f, "{}", name)
    }
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u8::deserialize(deserializer)?;
        Action::try_from(code).map_err(D::Error::custom)
    }
}

/// One schema-conforming document record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DapObject {
    /// Subschema name in the active DAP schema
    pub objtype: String,

    /// Object id, unique within `(dapid, objtype)` in one DapSpace;
    /// either explicit or derived as a composite primary key
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Revision counter, starting at 0 and incremented on every update
    pub rev: u64,

    /// Mutation opcode
    pub act: Action,

    /// Schema-defined user fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,

    /// Engine-assigned metadata (annotations on derived views)
    #[serde(default, skip_serializing_if = "Meta::is_empty")]
    pub meta: Meta,
}

impl DapObject {
    /// Create a fresh object of the given type (rev 0, create opcode)
    pub fn new(objtype: &str) -> Self {
        DapObject {
            objtype: objtype.to_string(),
            id: String::new(),
            rev: 0,
            act: Action::Create,
            fields: Map::new(),
            meta: Meta::default(),
        }
    }

    /// Set a user field, consuming and returning the object
    pub fn with_field(mut self, name: &str, value: Value) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    /// Get a user field
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// The `(objtype, id)` pair that scopes uniqueness
    pub fn key(&self) -> (&str, &str) {
        (&self.objtype, &self.id)
    }

    /// Fill in the object id if it is not yet set
    ///
    /// When the subschema declares a composite primary key the id is
    /// derived from the owner id and the declared key fields; otherwise an
    /// explicit id must already be present.
    pub fn ensure_id(&mut self, schema: &DapSchema, owner_id: &str) -> crate::Result<()> {
        if !self.id.is_empty() {
            return Ok(());
        }
        match codec::compose_primary_key(self, schema, owner_id)? {
            Some(key) => {
                self.id = key;
                Ok(())
            }
            None => Err(StructuralError::Malformed(format!(
                "object of type '{}' has no id and no composite primary key",
                self.objtype
            ))
            .into()),
        }
    }

    /// Canonical value of this object for hashing: schema-declared fields
    /// only, metadata stripped
    pub fn canonical_value(&self, schema: &DapSchema) -> crate::Result<Value> {
        let declared = schema
            .declared_fields(&self.objtype)
            .ok_or_else(|| StructuralError::UnknownSubschema {
                objtype: self.objtype.clone(),
            })?;

        let value = serde_json::to_value(self)?;
        let map = match value {
            Value::Object(map) => map,
            _ => {
                return Err(crate::error::CoreError::Internal(
                    "object did not serialize to a mapping".to_string(),
                ))
            }
        };

        let mut filtered = Map::new();
        for (key, value) in map {
            if key == "meta" {
                continue;
            }
            if declared.contains(key.as_str()) {
                filtered.insert(key, value);
            }
        }
        Ok(Value::Object(filtered))
    }

    /// Canonical content hash of this object under the given schema
    pub fn hash(&self, schema: &DapSchema) -> crate::Result<String> {
        let value = self.canonical_value(schema)?;
        Ok(codec::hash_value(RecordKind::Object, &value))
    }
}

/// A DAP object together with its owning identity, as stored in the
/// document index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnedObject {
    /// Id of the owning identity
    #[serde(rename = "userId")]
    pub user_id: String,

    /// The object itself
    pub data: DapObject,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_serde() {
        let object = DapObject::new("contact");
        let value = serde_json::to_value(&object).unwrap();
        assert_eq!(value["act"], json!(1));
        assert_eq!(value["rev"], json!(0));

        let parsed: DapObject = serde_json::from_value(json!({
            "objtype": "contact",
            "id": "x",
            "rev": 3,
            "act": 3,
            "note": "bye"
        }))
        .unwrap();
        assert_eq!(parsed.act, Action::Delete);
        assert_eq!(parsed.field("note"), Some(&json!("bye")));
    }

    #[test]
    fn test_action_rejects_unknown_code() {
        let result: Result<DapObject, _> = serde_json::from_value(json!({
            "objtype": "contact",
            "id": "x",
            "rev": 0,
            "act": 4
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_fields_flatten_round_trip() {
        let object = DapObject::new("contact")
            .with_field("note", json!("hello"))
            .with_field("rank", json!(7));

        let json = serde_json::to_string(&object).unwrap();
        let back: DapObject = serde_json::from_str(&json).unwrap();
        assert_eq!(object, back);
    }
}
