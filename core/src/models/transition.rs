//! State transition headers and packets
//!
//! A transition is carried as a pair: the signed header that goes into a
//! block (referencing the packet by hash), and the packet holding the
//! actual payload: either one DAP contract registration or a batch of DAP
//! object mutations sharing one `dapid`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{DapContract, DapObject, Meta, PROTOCOL_VERSION};
use crate::codec::{self, RecordKind};
use crate::schema::{DapSchema, StructuralError};

/// The signed envelope of a mutation, referencing its packet by hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionHeader {
    /// Protocol version
    pub pver: u32,

    /// Fee set for this transition (economics are a non-goal; stored only)
    pub fee: u64,

    /// Id of the submitting identity
    pub uid: String,

    /// Id of the identity's previous transition (chain of custody,
    /// informational, not verified against confirmed history)
    pub ptsid: String,

    /// Content hash of the associated packet
    pub pakid: String,

    /// Signature of the submitting identity (opaque)
    pub usig: String,

    /// Signature of the validating quorum (opaque)
    pub qsig: String,

    /// Engine-assigned metadata
    #[serde(default, skip_serializing_if = "Meta::is_empty")]
    pub meta: Meta,
}

impl TransitionHeader {
    /// Compose a header for a packet and assign its id
    pub fn compose(uid: &str, pakid: &str, ptsid: Option<&str>) -> crate::Result<Self> {
        let mut header = TransitionHeader {
            pver: PROTOCOL_VERSION,
            fee: 0,
            uid: uid.to_string(),
            ptsid: ptsid.unwrap_or_default().to_string(),
            pakid: pakid.to_string(),
            usig: String::new(),
            qsig: String::new(),
            meta: Meta::default(),
        };
        header.assign_id()?;
        Ok(header)
    }

    /// Canonical content hash of this header
    pub fn hash(&self) -> crate::Result<String> {
        codec::hash_record(RecordKind::TransitionHeader, self)
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
        if self.uid.is_empty() {
            return Err(StructuralError::Malformed("empty uid".to_string()));
        }
        if self.pakid.is_empty() {
            return Err(StructuralError::Malformed("empty pakid".to_string()));
        }
        Ok(())
    }
}

/// Payload of a transition packet
///
/// Carried as an explicit tagged union rather than inferred from the
/// payload's shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PacketPayload {
    /// Registration of a new DAP contract
    Contract {
        /// The contract being registered
        dapcontract: DapContract,
    },
    /// A non-empty batch of object mutations
    Objects {
        /// The objects, all targeting the packet's `dapid`
        dapobjects: Vec<DapObject>,
    },
}

/// The payload of a mutation batch, identified by its content hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionPacket {
    /// Protocol version
    pub pver: u32,

    /// Id of the DAP this packet addresses
    pub dapid: String,

    /// The payload
    #[serde(flatten)]
    pub payload: PacketPayload,

    /// Engine-assigned metadata
    #[serde(default, skip_serializing_if = "Meta::is_empty")]
    pub meta: Meta,
}

impl TransitionPacket {
    /// Compose a contract-registration packet and assign its id
    ///
    /// The packet's `dapid` is the contract's content hash; the
    /// authoritative DAP id after commit is the confirming header's id.
    pub fn for_contract(contract: DapContract) -> crate::Result<Self> {
        let dapid = contract.hash()?;
        let mut packet = TransitionPacket {
            pver: PROTOCOL_VERSION,
            dapid,
            payload: PacketPayload::Contract {
                dapcontract: contract,
            },
            meta: Meta::default(),
        };
        packet.assign_id(None)?;
        Ok(packet)
    }

    /// Compose an object-mutation packet and assign its id
    pub fn for_objects(
        dapid: &str,
        objects: Vec<DapObject>,
        schema: &DapSchema,
    ) -> crate::Result<Self> {
        let mut packet = TransitionPacket {
            pver: PROTOCOL_VERSION,
            dapid: dapid.to_string(),
            payload: PacketPayload::Objects {
                dapobjects: objects,
            },
            meta: Meta::default(),
        };
        packet.assign_id(Some(schema))?;
        Ok(packet)
    }

    /// The contained objects, if this is an object packet
    pub fn objects(&self) -> Option<&[DapObject]> {
        match &self.payload {
            PacketPayload::Objects { dapobjects } => Some(dapobjects),
            PacketPayload::Contract { .. } => None,
        }
    }

    /// The contained contract, if this is a contract packet
    pub fn contract(&self) -> Option<&DapContract> {
        match &self.payload {
            PacketPayload::Contract { dapcontract } => Some(dapcontract),
            PacketPayload::Objects { .. } => None,
        }
    }

    /// Canonical content hash of this packet
    ///
    /// Object packets require the target schema so that object fields can
    /// be reduced to their schema-declared canonical form.
    pub fn hash(&self, schema: Option<&DapSchema>) -> crate::Result<String> {
        match &self.payload {
            PacketPayload::Contract { .. } => codec::hash_record(RecordKind::TransitionPacket, self),
            PacketPayload::Objects { dapobjects } => {
                let schema = schema.ok_or_else(|| {
                    StructuralError::Malformed(
                        "schema required to hash an object packet".to_string(),
                    )
                })?;
                let mut canonical_objects = Vec::with_capacity(dapobjects.len());
                for object in dapobjects {
                    canonical_objects.push(object.canonical_value(schema)?);
                }
                let mut value = serde_json::to_value(self)?;
                value["dapobjects"] = Value::Array(canonical_objects);
                Ok(codec::hash_value(RecordKind::TransitionPacket, &value))
            }
        }
    }

    /// Compute and store the canonical id into the metadata
    pub fn assign_id(&mut self, schema: Option<&DapSchema>) -> crate::Result<()> {
        self.meta.id = Some(self.hash(schema)?);
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
        if self.dapid.is_empty() {
            return Err(StructuralError::Malformed("empty dapid".to_string()));
        }
        if let PacketPayload::Objects { dapobjects } = &self.payload {
            if dapobjects.is_empty() {
                return Err(StructuralError::Malformed(
                    "object packet carries no objects".to_string(),
                ));
            }
        }
        Ok(())
    }
}
