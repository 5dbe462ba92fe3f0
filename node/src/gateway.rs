//! Gateway facade
//!
//! One explicit, constructible registry owning the ledger and the document
//! index, exposed as a single request surface. Mining drives the document
//! index first, then an ordered list of subscriber closures, synchronously;
//! subscribers therefore observe strictly increasing heights with no gaps.

use log::debug;

use docchain_core::config::CoreConfig;
use docchain_core::schema::{DapSchema, DraftValidator, SchemaCompiler};
use docchain_core::{
    BlockInfo, DapContract, Identity, Registration, TransitionHeader, TransitionPacket,
};

use crate::error::Result;
use crate::index::{DapContext, DocumentIndex};
use crate::ledger::Ledger;

/// Callback invoked after every mined block
pub type BlockSubscriber = Box<dyn FnMut(&BlockInfo)>;

/// The single request surface over ledger and document index
pub struct Gateway {
    config: CoreConfig,
    ledger: Ledger,
    index: DocumentIndex,
    subscribers: Vec<BlockSubscriber>,
}

impl Gateway {
    /// Build a fresh stack and mine the genesis block
    ///
    /// Test isolation comes from constructing a fresh gateway; there is no
    /// hidden shared state.
    pub fn new(config: CoreConfig) -> Result<Self> {
        let mut gateway = Gateway {
            ledger: Ledger::new(&config),
            index: DocumentIndex::new(&config),
            subscribers: Vec::new(),
            config,
        };
        gateway.mine()?;
        Ok(gateway)
    }

    /// Mine pending work into a block, apply it to the index and notify
    /// subscribers in registration order
    fn mine(&mut self) -> Result<BlockInfo> {
        let block = self.ledger.mine_block()?;
        self.index.apply_block(&block)?;

        let info = block.info();
        for subscriber in &mut self.subscribers {
            subscriber(&info);
        }
        Ok(info)
    }

    /// Register an identity and mine its confirming block
    ///
    /// Returns the new identity's id.
    pub fn register_identity(&mut self, registration: Registration) -> Result<String> {
        let uid = self.ledger.submit_registration(registration)?;
        self.mine()?;
        Ok(uid)
    }

    /// Compile and register a DAP schema on behalf of an identity
    ///
    /// Returns the registered DAP id (the confirming transition's id).
    pub fn register_schema(&mut self, schema: DapSchema, creator_uid: &str) -> Result<String> {
        let structural = DraftValidator;
        SchemaCompiler::new(&self.config.schema, &structural).compile(&schema)?;

        let contract = DapContract::from_schema(schema)?;
        let packet = TransitionPacket::for_contract(contract)?;
        let pakid = packet
            .meta
            .id
            .clone()
            .expect("packet id assigned at composition");
        let header = TransitionHeader::compose(creator_uid, &pakid, None)?;

        self.submit_mutation(header, packet)
    }

    /// Validate, pin, broadcast and confirm a mutation
    ///
    /// Returns the transition id. Nothing is persisted on rejection.
    pub fn submit_mutation(
        &mut self,
        header: TransitionHeader,
        packet: TransitionPacket,
    ) -> Result<String> {
        self.index.pin_packet(&header, &packet)?;
        let tsid = self.ledger.submit_transition_header(header)?;
        self.mine()?;
        debug!("confirmed transition {}", tsid);
        Ok(tsid)
    }

    /// An identity's derived view of a DAP: own objects plus related ones
    pub fn get_context(&self, dapid: &str, uid: &str) -> DapContext {
        self.index.get_dap_context(dapid, uid, &self.ledger)
    }

    /// An identity's own object collection for a DAP
    pub fn get_dap_space(&self, dapid: &str, uid: &str) -> Vec<docchain_core::DapObject> {
        self.index.get_dap_space(dapid, uid)
    }

    /// Look up a confirmed identity by username
    pub fn find_identity(&self, uname: &str) -> Option<&Identity> {
        self.ledger.identity_by_name(uname)
    }

    /// Look up a confirmed identity by id
    pub fn get_identity(&self, uid: &str) -> Option<&Identity> {
        self.ledger.identity_by_id(uid)
    }

    /// Confirmed identities whose username contains the pattern
    pub fn search_identities(&self, pattern: &str) -> Vec<&Identity> {
        self.ledger.search_identities(pattern)
    }

    /// The registered contract for a DAP id
    pub fn find_contract(&self, dapid: &str) -> Option<&DapContract> {
        self.index.contract(dapid)
    }

    /// Registered contracts whose name contains the pattern
    pub fn search_contracts(&self, pattern: &str) -> Vec<&DapContract> {
        self.index.search_contracts(pattern)
    }

    /// Subscribe to new-block notifications
    ///
    /// Subscribers run synchronously after the index has applied the
    /// block, in the order they were registered.
    pub fn on_new_block(&mut self, subscriber: BlockSubscriber) {
        self.subscribers.push(subscriber);
    }

    /// The current chain tip
    pub fn tip(&self) -> &BlockInfo {
        self.ledger.tip()
    }

    /// Read access to the ledger
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Read access to the document index
    pub fn index(&self) -> &DocumentIndex {
        &self.index
    }
}
