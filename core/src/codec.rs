//! Object codec: canonical encoding, id assignment and key derivation
//!
//! Every record kind hashes its canonical JSON encoding under a
//! kind-specific domain. The encoding sorts object keys and strips `meta`
//! sections, so the same logical record hashes identically regardless of
//! construction order, and metadata never influences identity.
//!
//! The record kind is an explicit tag carried alongside the payload rather
//! than inferred from the payload's shape.

use serde::Serialize;
use serde_json::Value;

use crate::crypto;
use crate::models::domains;
use crate::models::DapObject;
use crate::schema::{DapSchema, StructuralError};

/// The kind of a record, selecting its hashing domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Identity registration (`subtx`)
    Registration,
    /// Derived identity (`blockchainuser`)
    Identity,
    /// Transition header (`stheader`)
    TransitionHeader,
    /// Transition packet (`stpacket`)
    TransitionPacket,
    /// DAP contract (`dapcontract`)
    Contract,
    /// DAP object (user-defined subschema)
    Object,
}

impl RecordKind {
    /// Hashing domain for this record kind
    pub fn domain(self) -> &'static str {
        match self {
            RecordKind::Registration => domains::REGISTRATION,
            RecordKind::Identity => domains::IDENTITY,
            RecordKind::TransitionHeader => domains::TRANSITION_HEADER,
            RecordKind::TransitionPacket => domains::TRANSITION_PACKET,
            RecordKind::Contract => domains::CONTRACT,
            RecordKind::Object => domains::OBJECT,
        }
    }

    /// System-schema property name for this kind, if it is a system record
    pub fn system_key(self) -> Option<&'static str> {
        match self {
            RecordKind::Registration => Some("subtx"),
            RecordKind::Identity => Some("blockchainuser"),
            RecordKind::TransitionHeader => Some("stheader"),
            RecordKind::TransitionPacket => Some("stpacket"),
            RecordKind::Contract => Some("dapcontract"),
            RecordKind::Object => None,
        }
    }
}

/// Canonical JSON encoding of a value: object keys sorted, `meta` keys
/// stripped at every level
///
/// The sort is explicit rather than relying on the map implementation, so
/// the encoding stays stable even if key order is preserved upstream.
pub fn canonical_string(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            out.push('{');
            let mut keys: Vec<&String> = map.keys().filter(|k| k.as_str() != "meta").collect();
            keys.sort();
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        leaf => out.push_str(&leaf.to_string()),
    }
}

/// Hash a JSON value under the given record kind's domain
pub fn hash_value(kind: RecordKind, value: &Value) -> String {
    let canonical = canonical_string(value);
    let digest = crypto::secure_hash(kind.domain(), canonical.as_bytes());
    hex::encode(digest)
}

/// Hash a serializable record under the given record kind's domain
pub fn hash_record<T: Serialize>(kind: RecordKind, record: &T) -> crate::Result<String> {
    let value = serde_json::to_value(record)?;
    Ok(hash_value(kind, &value))
}

/// Derive the composite primary key for an object, or `None` if its
/// subschema does not declare one
///
/// The key is `hash(ownerId ++ canonicalEncode(declaredKeyFields))`:
/// pure and deterministic, so the same owner and key-field values always
/// produce the same id, in any process.
pub fn compose_primary_key(
    object: &DapObject,
    schema: &DapSchema,
    owner_id: &str,
) -> crate::Result<Option<String>> {
    if schema.subschema(&object.objtype).is_none() {
        return Err(StructuralError::UnknownSubschema {
            objtype: object.objtype.clone(),
        }
        .into());
    }

    let spec = match schema.primary_key(&object.objtype) {
        Some(spec) if spec.composite => spec,
        _ => return Ok(None),
    };

    let key_fields: Vec<Value> = spec
        .includes
        .iter()
        .map(|name| object.field(name).cloned().unwrap_or(Value::Null))
        .collect();
    let encoded = canonical_string(&Value::Array(key_fields));

    let digest = crypto::secure_hash_multiple(
        domains::PRIMARY_KEY,
        &[owner_id.as_bytes(), encoded.as_bytes()],
    );
    Ok(Some(hex::encode(digest)))
}
