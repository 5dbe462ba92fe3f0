//! Block representation for the simulated chain
//!
//! Blocks package admitted registrations and transition headers, hash-chain
//! to the previous block and carry a strictly increasing height. Height 0
//! is pre-genesis; the first mined block has height 1.

use std::fmt::{Debug, Formatter, Result as FmtResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domains;
use super::{Registration, TransitionHeader};
use crate::codec;
use crate::crypto;
use crate::utils::short_hash;

/// Previous-hash value of the genesis block
pub const GENESIS_PREV_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// A mined block
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Block height, strictly increasing from 1
    pub height: u64,

    /// Hash of this block's contents plus the previous tip hash
    pub hash: String,

    /// Hash of the previous block (all zeros for genesis)
    pub prevhash: String,

    /// Mining timestamp (metadata; not part of the hash)
    pub time: DateTime<Utc>,

    /// Registrations confirmed by this block
    pub subtx: Vec<Registration>,

    /// Transition headers confirmed by this block
    pub stheaders: Vec<TransitionHeader>,
}

impl Debug for Block {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Block")
            .field("height", &self.height)
            .field("hash", &short_hash(&self.hash))
            .field("prevhash", &short_hash(&self.prevhash))
            .field("subtx", &self.subtx.len())
            .field("stheaders", &self.stheaders.len())
            .finish()
    }
}

impl Block {
    /// Assemble a block and compute its hash
    pub fn seal(
        height: u64,
        prevhash: &str,
        subtx: Vec<Registration>,
        stheaders: Vec<TransitionHeader>,
        time: DateTime<Utc>,
    ) -> crate::Result<Self> {
        let mut block = Block {
            height,
            hash: String::new(),
            prevhash: prevhash.to_string(),
            time,
            subtx,
            stheaders,
        };
        block.hash = block.calculate_hash()?;
        Ok(block)
    }

    /// Calculate the hash of the block contents chained to `prevhash`
    pub fn calculate_hash(&self) -> crate::Result<String> {
        let subtx = codec::canonical_string(&serde_json::to_value(&self.subtx)?);
        let stheaders = codec::canonical_string(&serde_json::to_value(&self.stheaders)?);

        let digest = crypto::secure_hash_multiple(
            domains::BLOCK,
            &[
                &self.height.to_be_bytes(),
                self.prevhash.as_bytes(),
                subtx.as_bytes(),
                stheaders.as_bytes(),
            ],
        );
        Ok(hex::encode(digest))
    }

    /// Verify the stored hash of the block
    pub fn verify_hash(&self) -> crate::Result<bool> {
        let expected = self.calculate_hash()?;
        Ok(crypto::verify_hex_digest(&expected, &self.hash))
    }

    /// True if this is the first block on the chain
    pub fn is_genesis(&self) -> bool {
        self.height == 1
    }

    /// Tip info for this block
    pub fn info(&self) -> BlockInfo {
        BlockInfo {
            height: self.height,
            hash: self.hash.clone(),
        }
    }
}

/// The chain tip as observed by a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockInfo {
    /// Height of the best block (0 = pre-genesis)
    pub height: u64,

    /// Hash of the best block
    pub hash: String,
}

impl Default for BlockInfo {
    fn default() -> Self {
        BlockInfo {
            height: 0,
            hash: GENESIS_PREV_HASH.to_string(),
        }
    }
}
