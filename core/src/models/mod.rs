//! Data models for the Docchain engine
//!
//! This module provides data structures for the records that live on the
//! simulated chain and in the document index: registrations, identities,
//! transition headers and packets, DAP contracts, DAP objects and blocks.

mod block;
mod contract;
mod identity;
mod meta;
mod object;
mod registration;
mod transition;

pub use block::{Block, BlockInfo, GENESIS_PREV_HASH};
pub use contract::DapContract;
pub use identity::Identity;
pub use meta::Meta;
pub use object::{Action, DapObject, OwnedObject};
pub use registration::{is_valid_username, Registration, ACTION_REGISTER};
pub use transition::{PacketPayload, TransitionHeader, TransitionPacket};

/// Protocol version stamped into every record
pub const PROTOCOL_VERSION: u32 = 1;

/// Domain constants for record hashing
pub mod domains {
    /// Domain for identity registrations
    pub const REGISTRATION: &str = "DOCCHAIN_SUBTX";

    /// Domain for derived identities
    pub const IDENTITY: &str = "DOCCHAIN_USER";

    /// Domain for transition headers
    pub const TRANSITION_HEADER: &str = "DOCCHAIN_STHEADER";

    /// Domain for transition packets
    pub const TRANSITION_PACKET: &str = "DOCCHAIN_STPACKET";

    /// Domain for DAP contracts
    pub const CONTRACT: &str = "DOCCHAIN_DAPCONTRACT";

    /// Domain for DAP objects
    pub const OBJECT: &str = "DOCCHAIN_DAPOBJECT";

    /// Domain for blocks
    pub const BLOCK: &str = "DOCCHAIN_BLOCK";

    /// Domain for composite primary keys
    pub const PRIMARY_KEY: &str = "DOCCHAIN_PRIMARYKEY";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto;

    #[test]
    fn test_domain_separation() {
        // Different domains produce different hashes for the same data
        let data = b"test data";

        let reg_hash = crypto::secure_hash(domains::REGISTRATION, data);
        let user_hash = crypto::secure_hash(domains::IDENTITY, data);
        let header_hash = crypto::secure_hash(domains::TRANSITION_HEADER, data);
        let packet_hash = crypto::secure_hash(domains::TRANSITION_PACKET, data);
        let contract_hash = crypto::secure_hash(domains::CONTRACT, data);
        let object_hash = crypto::secure_hash(domains::OBJECT, data);
        let block_hash = crypto::secure_hash(domains::BLOCK, data);
        let key_hash = crypto::secure_hash(domains::PRIMARY_KEY, data);

        let all = [
            reg_hash,
            user_hash,
            header_hash,
            packet_hash,
            contract_hash,
            object_hash,
            block_hash,
            key_hash,
        ];

        for (i, a) in all.iter().enumerate() {
            for (j, b) in all.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b);
                }
            }
        }
    }
}
