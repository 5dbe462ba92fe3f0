//! DAP contracts
//!
//! A contract wraps a compiled DAP schema with its registration metadata.
//! After its registration transition is confirmed, the contract is looked
//! up by `dapid` (the confirming transition header's id).

use serde::{Deserialize, Serialize};

use super::{Meta, PROTOCOL_VERSION};
use crate::codec::{self, RecordKind};
use crate::schema::{DapSchema, StructuralError};

/// A registered (or registration-pending) DAP schema with metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DapContract {
    /// Protocol version
    pub pver: u32,

    /// Revision index within the contract lineage
    pub idx: u32,

    /// Original contract id when revising an existing DAP, empty otherwise
    pub dapid: String,

    /// DAP name, taken from the schema title
    pub dapname: String,

    /// The schema itself
    pub dapschema: DapSchema,

    /// Contract version label
    pub dapver: String,

    /// Engine-assigned metadata
    #[serde(default, skip_serializing_if = "Meta::is_empty")]
    pub meta: Meta,
}

impl DapContract {
    /// Create a contract from a schema and assign its id
    ///
    /// The DAP name is the schema title.
    pub fn from_schema(schema: DapSchema) -> crate::Result<Self> {
        let dapname = schema.title().unwrap_or_default().to_string();
        let mut contract = DapContract {
            pver: PROTOCOL_VERSION,
            idx: 0,
            dapid: String::new(),
            dapname,
            dapschema: schema,
            dapver: String::new(),
            meta: Meta::default(),
        };
        contract.assign_id()?;
        Ok(contract)
    }

    /// Canonical content hash of this contract
    pub fn hash(&self) -> crate::Result<String> {
        codec::hash_record(RecordKind::Contract, self)
    }

    /// Compute and store the canonical id into the metadata
    pub fn assign_id(&mut self) -> crate::Result<()> {
        self.meta.id = Some(self.hash()?);
        Ok(())
    }

    /// Check the value-level invariants of the record
    pub fn validate(&self) -> Result<(), StructuralError> {
        if self.pver != PROTOCOL_VERSION {
            return Err(StructuralError::Malformed(format!(
                "unsupported protocol version {}",
                self.pver
            )));
        }
        if self.dapname.is_empty() {
            return Err(StructuralError::Malformed("empty dapname".to_string()));
        }
        if self.dapschema.title() != Some(self.dapname.as_str()) {
            return Err(StructuralError::Malformed(
                "dapname does not match schema title".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_schema() -> DapSchema {
        DapSchema::new(json!({
            "$schema": crate::schema::params::DAP_SCHEMA_META_URI,
            "title": "testdap",
            "thing": {
                "type": "object",
                "allOf": [{"$ref": crate::schema::params::DAP_OBJECT_BASE_REF}],
                "properties": {"note": {"type": "string"}}
            }
        }))
    }

    #[test]
    fn test_from_schema() {
        let contract = DapContract::from_schema(test_schema()).unwrap();
        assert_eq!(contract.dapname, "testdap");
        assert!(contract.meta.id.is_some());
        assert!(contract.validate().is_ok());
    }

    #[test]
    fn test_validate_name_mismatch() {
        let mut contract = DapContract::from_schema(test_schema()).unwrap();
        contract.dapname = "otherdap".to_string();
        assert!(contract.validate().is_err());
    }
}
