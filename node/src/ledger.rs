//! Chain simulation
//!
//! The ledger keeps two mempools (pending registrations and pending
//! transition headers) and a hash-chained list of blocks. Mining drains the
//! mempools in FIFO order (registrations before transitions), derives and
//! persists one identity per accepted registration, and advances the tip.
//! Lookups only ever expose confirmed state.

use chrono::Utc;
use log::{info, warn};

use docchain_core::config::CoreConfig;
use docchain_core::models::GENESIS_PREV_HASH;
use docchain_core::schema::{validate_system_record, DraftValidator};
use docchain_core::utils::short_hash;
use docchain_core::{Block, BlockInfo, Identity, RecordKind, Registration, TransitionHeader};

use crate::error::{NodeError, Result};
use crate::store::Collection;

/// The simulated single-writer chain
pub struct Ledger {
    config: CoreConfig,
    structural: DraftValidator,
    mempool_subtx: Collection<Registration>,
    mempool_stheaders: Collection<TransitionHeader>,
    blocks: Collection<Block>,
    identities: Collection<Identity>,
    tip: BlockInfo,
}

impl Ledger {
    /// Create a ledger with an empty chain (height 0, pre-genesis)
    ///
    /// The first `mine_block` call creates the genesis block at height 1.
    pub fn new(config: &CoreConfig) -> Self {
        Ledger {
            config: config.clone(),
            structural: DraftValidator,
            mempool_subtx: Collection::new("core.mempool.subtx"),
            mempool_stheaders: Collection::new("core.mempool.stheaders"),
            blocks: Collection::new("core.blockchain"),
            identities: Collection::new("core.index.users"),
            tip: BlockInfo::default(),
        }
    }

    /// Enqueue an identity registration
    ///
    /// Rejected if the username is already bound to a confirmed identity.
    /// Returns the registration id as the acceptance token.
    pub fn submit_registration(&mut self, mut registration: Registration) -> Result<String> {
        registration.validate()?;
        if registration.meta.id.is_none() {
            registration.assign_id()?;
        }

        let record = serde_json::to_value(&registration).map_err(docchain_core::CoreError::from)?;
        validate_system_record(RecordKind::Registration, &record, &self.structural)?;

        if self.identity_by_name(&registration.uname).is_some() {
            return Err(NodeError::UsernameTaken {
                uname: registration.uname,
            });
        }

        let id = registration
            .meta
            .id
            .clone()
            .expect("id assigned above");
        self.mempool_subtx.insert(registration);
        Ok(id)
    }

    /// Enqueue a transition header
    ///
    /// Returns the header id. Packet-level consensus validation happens in
    /// the document index, not here.
    pub fn submit_transition_header(&mut self, mut header: TransitionHeader) -> Result<String> {
        header.validate()?;
        if header.meta.id.is_none() {
            header.assign_id()?;
        }

        let record = serde_json::to_value(&header).map_err(docchain_core::CoreError::from)?;
        validate_system_record(RecordKind::TransitionHeader, &record, &self.structural)?;

        let id = header.meta.id.clone().expect("id assigned above");
        self.mempool_stheaders.insert(header);
        Ok(id)
    }

    /// Mine everything pending into a new block and advance the tip
    ///
    /// A call with nothing pending still produces a valid empty block;
    /// this is how genesis is created at startup.
    pub fn mine_block(&mut self) -> Result<Block> {
        let height = self.tip.height + 1;

        // Registrations first, in enqueue order
        let mut subtx = Vec::new();
        for registration in self.mempool_subtx.drain() {
            let mut identity =
                Identity::derive(&registration, self.config.chain.initial_credits)
                    .map_err(NodeError::from)?;
            if !identity.verify(&registration).map_err(NodeError::from)? {
                return Err(NodeError::Internal(
                    "identity derivation does not match its registration".to_string(),
                ));
            }
            identity.meta.height = Some(height);
            self.identities.insert(identity);
            subtx.push(registration);
        }

        // Then transitions, re-validated structurally
        let mut stheaders = Vec::new();
        for header in self.mempool_stheaders.drain() {
            match header.validate() {
                Ok(()) => stheaders.push(header),
                Err(e) => {
                    warn!(
                        "dropping invalid transition header {}: {}",
                        header.meta.id.as_deref().unwrap_or("?"),
                        e
                    );
                }
            }
        }

        let prevhash = if self.tip.height == 0 {
            GENESIS_PREV_HASH.to_string()
        } else {
            self.tip.hash.clone()
        };

        let block = Block::seal(height, &prevhash, subtx, stheaders, Utc::now())
            .map_err(NodeError::from)?;
        self.blocks.insert(block.clone());
        self.tip = block.info();

        info!(
            "mined block height={} hash={} subtx={} stheaders={}",
            block.height,
            short_hash(&block.hash),
            block.subtx.len(),
            block.stheaders.len()
        );
        Ok(block)
    }

    /// Look up a confirmed identity by username
    pub fn identity_by_name(&self, uname: &str) -> Option<&Identity> {
        self.identities.find(|identity| identity.uname == uname)
    }

    /// Look up a confirmed identity by id
    pub fn identity_by_id(&self, uid: &str) -> Option<&Identity> {
        self.identities.find(|identity| identity.uid == uid)
    }

    /// Confirmed identities whose username contains the pattern
    pub fn search_identities(&self, pattern: &str) -> Vec<&Identity> {
        if pattern.is_empty() {
            return Vec::new();
        }
        self.identities
            .search(|identity| identity.uname.contains(pattern))
    }

    /// Look up a block by hash
    pub fn block_by_hash(&self, hash: &str) -> Option<&Block> {
        self.blocks.find(|block| block.hash == hash)
    }

    /// Look up a block by height
    pub fn block_at_height(&self, height: u64) -> Option<&Block> {
        self.blocks.find(|block| block.height == height)
    }

    /// Confirmed transition headers in blocks above the given hash,
    /// oldest block first
    ///
    /// An unknown (or empty) hash starts from the beginning of the chain.
    pub fn headers_since(&self, hash: &str) -> Vec<&TransitionHeader> {
        let from_height = self
            .block_by_hash(hash)
            .map(|block| block.height)
            .unwrap_or(0);

        let mut found = Vec::new();
        for height in (from_height + 1)..=self.tip.height {
            if let Some(block) = self.block_at_height(height) {
                found.extend(block.stheaders.iter());
            }
        }
        found
    }

    /// The current chain tip
    pub fn tip(&self) -> &BlockInfo {
        &self.tip
    }
}
