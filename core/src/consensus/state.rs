//! State-transition validation
//!
//! Fully validates a transition (header + packet) against the current
//! contents of the target DAP before it may be applied. The validator is a
//! pure predicate: it never mutates its inputs, and it short-circuits on
//! the first violated rule with a specific failure kind.

use thiserror::Error;

use crate::config::SchemaLimits;
use crate::models::{Action, OwnedObject, TransitionHeader, TransitionPacket};
use crate::schema::{validate_object, DapSchema, SchemaCompiler, StructuralValidator};
use crate::{codec, Result};

/// The consensus rule a transition violated
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConsensusError {
    /// A keyed object's id does not equal its recomputed composite key
    #[error("object id does not match its composite primary key ({objtype}/{id})")]
    InvalidObjectId {
        /// Subschema of the offending object
        objtype: String,
        /// The claimed id
        id: String,
    },

    /// Two create-type objects in one packet share an id
    #[error("duplicate object id within the packet ({objtype}/{id})")]
    DuplicateObjectIdInPacket {
        /// Subschema of the offending objects
        objtype: String,
        /// The duplicated id
        id: String,
    },

    /// A created object's id already exists in the DAP's data
    #[error("duplicate object id in the DAP space ({objtype}/{id})")]
    DuplicateObjectIdInSpace {
        /// Subschema of the offending object
        objtype: String,
        /// The duplicated id
        id: String,
    },

    /// An updated or deleted object does not exist in the DAP's data
    #[error("object not present in the DAP space ({objtype}/{id})")]
    ObjectNotFound {
        /// Subschema of the missing object
        objtype: String,
        /// The missing id
        id: String,
    },

    /// An updated or deleted object belongs to a different identity
    #[error("object belongs to another identity ({objtype}/{id})")]
    ObjectOwnedByAnotherUser {
        /// Subschema of the offending object
        objtype: String,
        /// The contested id
        id: String,
    },

    /// A relation field references the submitting identity itself
    #[error("object cannot relate to its own identity (field '{field}' of '{objtype}')")]
    SelfRelationForbidden {
        /// Subschema of the offending object
        objtype: String,
        /// The offending relation field
        field: String,
    },
}

/// Validates transitions against the current DAP state
pub struct TransitionValidator<'a> {
    limits: &'a SchemaLimits,
    structural: &'a dyn StructuralValidator,
}

impl<'a> TransitionValidator<'a> {
    /// Create a validator over the given limits and structural backend
    pub fn new(limits: &'a SchemaLimits, structural: &'a dyn StructuralValidator) -> Self {
        TransitionValidator { limits, structural }
    }

    /// Fully validate a transition against a DAP's current data
    ///
    /// `dap_data` is the complete set of owned objects for the target DAP
    /// (all identities). On success the caller may apply the mutation; this
    /// method applies nothing itself.
    pub fn validate(
        &self,
        header: &TransitionHeader,
        packet: &TransitionPacket,
        dap_data: &[OwnedObject],
        schema: &DapSchema,
    ) -> Result<()> {
        header.validate()?;
        packet.validate()?;

        match packet.objects() {
            Some(objects) => {
                self.check_packet_structure(objects, schema)?;
                self.check_existing_structure(dap_data, schema)?;
                self.check_ids(header, objects, schema)?;
                self.check_packet_uniqueness(objects)?;
                self.check_space_uniqueness(header, objects, dap_data)?;
                self.check_relations(header, objects, schema)?;
            }
            None => {
                // Contract registration: the embedded schema must itself
                // compile under the platform rules
                let contract = packet
                    .contract()
                    .expect("packet payload is either objects or a contract");
                contract.validate()?;
                SchemaCompiler::new(self.limits, self.structural).compile(&contract.dapschema)?;
            }
        }
        Ok(())
    }

    /// Rule 1: every packet object conforms to its declared subschema
    fn check_packet_structure(
        &self,
        objects: &[crate::models::DapObject],
        schema: &DapSchema,
    ) -> Result<()> {
        for object in objects {
            validate_object(schema, object, self.structural)?;
        }
        Ok(())
    }

    /// Rule 2: the existing DAP data still conforms to the schema
    /// (guards against contract drift)
    fn check_existing_structure(&self, dap_data: &[OwnedObject], schema: &DapSchema) -> Result<()> {
        for owned in dap_data {
            validate_object(schema, &owned.data, self.structural)?;
        }
        Ok(())
    }

    /// Rule 3: declared composite keys must match the recomputed key
    fn check_ids(
        &self,
        header: &TransitionHeader,
        objects: &[crate::models::DapObject],
        schema: &DapSchema,
    ) -> Result<()> {
        for object in objects {
            let key = codec::compose_primary_key(object, schema, &header.uid)?;
            if let Some(key) = key {
                if object.id != key {
                    return Err(ConsensusError::InvalidObjectId {
                        objtype: object.objtype.clone(),
                        id: object.id.clone(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Rule 4: no two create-type objects in the packet share an id
    fn check_packet_uniqueness(&self, objects: &[crate::models::DapObject]) -> Result<()> {
        for (i, object) in objects.iter().enumerate() {
            if object.act != Action::Create {
                continue;
            }
            let duplicated = objects
                .iter()
                .enumerate()
                .any(|(j, other)| j != i && other.act == Action::Create && other.key() == object.key());
            if duplicated {
                return Err(ConsensusError::DuplicateObjectIdInPacket {
                    objtype: object.objtype.clone(),
                    id: object.id.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Rule 5: cross-state uniqueness and ownership, per opcode
    fn check_space_uniqueness(
        &self,
        header: &TransitionHeader,
        objects: &[crate::models::DapObject],
        dap_data: &[OwnedObject],
    ) -> Result<()> {
        for object in objects {
            let existing = dap_data.iter().find(|owned| owned.data.key() == object.key());
            match object.act {
                Action::Create => {
                    if existing.is_some() {
                        return Err(ConsensusError::DuplicateObjectIdInSpace {
                            objtype: object.objtype.clone(),
                            id: object.id.clone(),
                        }
                        .into());
                    }
                }
                Action::Update | Action::Delete => match existing {
                    None => {
                        return Err(ConsensusError::ObjectNotFound {
                            objtype: object.objtype.clone(),
                            id: object.id.clone(),
                        }
                        .into())
                    }
                    Some(owned) if owned.user_id != header.uid => {
                        return Err(ConsensusError::ObjectOwnedByAnotherUser {
                            objtype: object.objtype.clone(),
                            id: object.id.clone(),
                        }
                        .into())
                    }
                    Some(_) => {}
                },
            }
        }
        Ok(())
    }

    /// Rule 6: no relation field may reference the submitter itself
    fn check_relations(
        &self,
        header: &TransitionHeader,
        objects: &[crate::models::DapObject],
        schema: &DapSchema,
    ) -> Result<()> {
        for object in objects {
            for field in schema.relation_fields(&object.objtype) {
                let related_uid = object
                    .field(&field)
                    .and_then(|relation| relation.get("userId"))
                    .and_then(serde_json::Value::as_str);
                if related_uid == Some(header.uid.as_str()) {
                    return Err(ConsensusError::SelfRelationForbidden {
                        objtype: object.objtype.clone(),
                        field,
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
}
