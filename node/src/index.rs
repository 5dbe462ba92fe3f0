//! Document index
//!
//! Simulates the distributed document store: packets are pinned while
//! unconfirmed, committed once their header lands in a block, and applied
//! to the owning identity's slot in the DAP's object collection. Derived
//! views (own space, relation index, context) only ever reflect confirmed
//! state.

use log::{debug, error, info};

use docchain_core::config::CoreConfig;
use docchain_core::schema::{DapSchema, DraftValidator};
use docchain_core::utils::short_hash;
use docchain_core::{
    Action, Block, BlockInfo, DapContract, DapObject, OwnedObject, TransitionHeader,
    TransitionPacket, TransitionValidator,
};
use serde::Serialize;

use crate::error::{NodeError, Result};
use crate::ledger::Ledger;
use crate::store::Collection;

/// One DAP's object collection across all identities
#[derive(Debug, Clone, PartialEq)]
struct DapDataSet {
    dap_id: String,
    objects: Vec<OwnedObject>,
}

/// A read-only derived view: an identity's own objects plus objects from
/// other identities' spaces that relate to it
#[derive(Debug, Clone, Serialize)]
pub struct DapContext {
    /// The DAP id
    pub dapid: String,

    /// The identity the context belongs to
    pub uid: String,

    /// The identity's own objects
    pub objects: Vec<DapObject>,

    /// Objects from other spaces whose relation field points here,
    /// annotated with the referencing identity's id and username
    pub related: Vec<DapObject>,
}

/// The simulated document store and relation index
pub struct DocumentIndex {
    config: CoreConfig,
    structural: DraftValidator,
    packets: Collection<TransitionPacket>,
    contracts: Collection<DapContract>,
    spaces: Collection<DapDataSet>,
    tip: BlockInfo,
}

impl DocumentIndex {
    /// Create an empty index
    pub fn new(config: &CoreConfig) -> Self {
        DocumentIndex {
            config: config.clone(),
            structural: DraftValidator,
            packets: Collection::new("drive.packets"),
            contracts: Collection::new("drive.index.dapcontracts"),
            spaces: Collection::new("drive.index.dapobjects"),
            tip: BlockInfo::default(),
        }
    }

    /// Pin a packet ahead of its confirmation
    ///
    /// The packet is validated structurally and, for object packets,
    /// semantically against the current DAP state. Pinning the identical
    /// packet twice is an idempotent success. Returns the packet id.
    pub fn pin_packet(
        &mut self,
        header: &TransitionHeader,
        packet: &TransitionPacket,
    ) -> Result<String> {
        header.validate()?;
        packet.validate()?;

        // Object packets hash and validate under the target DAP's schema
        let schema = match packet.objects() {
            Some(_) => Some(self.schema_for(&packet.dapid)?.clone()),
            None => None,
        };

        let validator = TransitionValidator::new(&self.config.schema, &self.structural);
        let dap_data = self.dap_data(&packet.dapid).to_vec();
        let empty = DapSchema::new(serde_json::json!({}));
        validator.validate(header, packet, &dap_data, schema.as_ref().unwrap_or(&empty))?;

        let mut pinned = packet.clone();
        pinned.assign_id(schema.as_ref())?;
        pinned.meta.tsid = header.meta.id.clone();
        pinned.meta.uid = Some(header.uid.clone());

        let id = pinned.meta.id.clone().expect("id assigned above");
        if header.pakid != id {
            return Err(docchain_core::schema::StructuralError::Malformed(format!(
                "header pakid '{}' does not reference the packet '{}'",
                short_hash(&header.pakid),
                short_hash(&id)
            ))
            .into());
        }

        // Multiple submissions can carry the same payload; only one copy
        // is stored and the second pin still reports success
        let already_pinned = self
            .packets
            .find(|existing| existing.meta.id.as_deref() == Some(id.as_str()))
            .is_some();
        if already_pinned {
            debug!("packet {} already pinned", short_hash(&id));
            return Ok(id);
        }

        self.packets.insert(pinned);
        info!("pinned packet {}", short_hash(&id));
        Ok(id)
    }

    /// Import confirmed mutations from a newly mined block
    ///
    /// Each packet is re-validated against the state current at commit
    /// time and applied atomically (validate-then-apply); a packet that no
    /// longer validates is skipped and stays unconfirmed. A missing pinned
    /// packet is a store inconsistency and aborts loudly.
    pub fn apply_block(&mut self, block: &Block) -> Result<()> {
        debug!("detected new block {:?}", block);

        for header in &block.stheaders {
            if header.pakid.is_empty() {
                continue;
            }
            match self.commit_packet(header, block) {
                Ok(()) => {}
                Err(e) if e.is_rejection() => {
                    // The state advanced between pin and commit; the packet
                    // stays unconfirmed
                    error!(
                        "packet {} failed commit-time validation: {}",
                        short_hash(&header.pakid),
                        e
                    );
                }
                Err(e) => return Err(e),
            }
        }

        self.tip = block.info();
        Ok(())
    }

    fn commit_packet(&mut self, header: &TransitionHeader, block: &Block) -> Result<()> {
        let pinned = self
            .packets
            .find(|packet| {
                packet.meta.id.as_deref() == Some(header.pakid.as_str())
                    && packet.meta.block.is_none()
            })
            .cloned();

        let packet = match pinned {
            Some(packet) => packet,
            None => {
                let confirmed = self.packets.find(|packet| {
                    packet.meta.id.as_deref() == Some(header.pakid.as_str())
                });
                if confirmed.is_some() {
                    // Same payload confirmed by an earlier header
                    debug!("packet {} already confirmed", short_hash(&header.pakid));
                    return Ok(());
                }
                return Err(NodeError::PacketNotPinned {
                    pakid: header.pakid.clone(),
                });
            }
        };

        match (packet.contract(), packet.objects()) {
            (Some(contract), _) => self.commit_contract(header, contract)?,
            (_, Some(objects)) => self.commit_objects(header, &packet.dapid, objects)?,
            _ => unreachable!("packet payload is either objects or a contract"),
        }

        // The block hash in the metadata marks the packet confirmed
        let mut confirmed = packet;
        confirmed.meta.block = Some(block.hash.clone());
        let id = confirmed.meta.id.clone();
        self.packets
            .update(|p| p.meta.id == id && p.meta.block.is_none(), confirmed);
        info!("confirmed packet {}", short_hash(&header.pakid));
        Ok(())
    }

    fn commit_contract(&mut self, header: &TransitionHeader, contract: &DapContract) -> Result<()> {
        // The confirming header's id becomes the authoritative DAP id;
        // clients fetch the full transition for verification
        let dapid = header
            .meta
            .id
            .clone()
            .ok_or_else(|| NodeError::Internal("confirmed header has no id".to_string()))?;

        let mut registered = contract.clone();
        registered.meta.dapid = Some(dapid.clone());
        self.contracts.insert(registered);

        self.spaces.insert(DapDataSet {
            dap_id: dapid.clone(),
            objects: Vec::new(),
        });
        info!("registered contract {}", short_hash(&dapid));
        Ok(())
    }

    fn commit_objects(
        &mut self,
        header: &TransitionHeader,
        dapid: &str,
        objects: &[DapObject],
    ) -> Result<()> {
        let schema = self.schema_for(dapid)?.clone();

        // Second deep validation; the first ran at pin time against a
        // possibly older state
        let validator = TransitionValidator::new(&self.config.schema, &self.structural);
        let dap_data = self.dap_data(dapid).to_vec();
        let pseudo_packet = TransitionPacket::for_objects(dapid, objects.to_vec(), &schema)?;
        validator.validate(header, &pseudo_packet, &dap_data, &schema)?;

        let space = self
            .spaces
            .find_mut(|space| space.dap_id == dapid)
            .ok_or_else(|| NodeError::Internal(format!("no object collection for DAP '{}'", dapid)))?;

        for object in objects {
            let wrapped = OwnedObject {
                user_id: header.uid.clone(),
                data: object.clone(),
            };
            match object.act {
                Action::Create => space.objects.push(wrapped),
                Action::Update => {
                    if let Some(existing) = space
                        .objects
                        .iter_mut()
                        .find(|owned| owned.data.key() == object.key())
                    {
                        *existing = wrapped;
                    }
                }
                Action::Delete => {
                    space.objects.retain(|owned| owned.data.key() != object.key());
                }
            }
        }
        Ok(())
    }

    /// The registered contract for a DAP id
    pub fn contract(&self, dapid: &str) -> Option<&DapContract> {
        self.contracts
            .find(|contract| contract.meta.dapid.as_deref() == Some(dapid))
    }

    /// Registered contracts whose name contains the pattern
    pub fn search_contracts(&self, pattern: &str) -> Vec<&DapContract> {
        self.contracts
            .search(|contract| contract.dapname.contains(pattern))
    }

    /// The schema of a registered DAP
    pub fn schema(&self, dapid: &str) -> Option<&DapSchema> {
        self.contract(dapid).map(|contract| &contract.dapschema)
    }

    fn schema_for(&self, dapid: &str) -> Result<&DapSchema> {
        self.schema(dapid).ok_or_else(|| NodeError::UnknownContract {
            dapid: dapid.to_string(),
        })
    }

    /// All owned objects of a DAP, across identities
    fn dap_data(&self, dapid: &str) -> &[OwnedObject] {
        self.spaces
            .find(|space| space.dap_id == dapid)
            .map(|space| space.objects.as_slice())
            .unwrap_or(&[])
    }

    /// An identity's own confirmed objects for a DAP
    pub fn get_dap_space(&self, dapid: &str, uid: &str) -> Vec<DapObject> {
        self.dap_data(dapid)
            .iter()
            .filter(|owned| owned.user_id == uid)
            .map(|owned| owned.data.clone())
            .collect()
    }

    /// Objects from other identities' spaces whose relation field points
    /// at `uid`, annotated with the referencing identity's id and username
    pub fn get_related_objects(&self, dapid: &str, uid: &str, ledger: &Ledger) -> Vec<DapObject> {
        let schema = match self.schema(dapid) {
            Some(schema) => schema,
            None => return Vec::new(),
        };

        let mut related = Vec::new();
        for owned in self.dap_data(dapid) {
            let relations = schema.relation_fields(&owned.data.objtype);
            let points_here = relations.iter().any(|field| {
                owned
                    .data
                    .field(field)
                    .and_then(|relation| relation.get("userId"))
                    .and_then(serde_json::Value::as_str)
                    == Some(uid)
            });
            if !points_here {
                continue;
            }

            // Annotate for caller-side verification
            let mut object = owned.data.clone();
            object.meta.uid = Some(owned.user_id.clone());
            object.meta.uname = ledger
                .identity_by_id(&owned.user_id)
                .map(|identity| identity.uname.clone());
            related.push(object);
        }
        related
    }

    /// An identity's full derived view of a DAP
    pub fn get_dap_context(&self, dapid: &str, uid: &str, ledger: &Ledger) -> DapContext {
        DapContext {
            dapid: dapid.to_string(),
            uid: uid.to_string(),
            objects: self.get_dap_space(dapid, uid),
            related: self.get_related_objects(dapid, uid, ledger),
        }
    }

    /// The chain tip this index has applied up to
    pub fn tip(&self) -> &BlockInfo {
        &self.tip
    }

    /// A pinned or confirmed packet by id
    pub fn packet(&self, pakid: &str) -> Option<&TransitionPacket> {
        self.packets
            .find(|packet| packet.meta.id.as_deref() == Some(pakid))
    }

    /// Number of stored packets (pinned and confirmed)
    pub fn packet_count(&self) -> usize {
        self.packets.len()
    }
}
