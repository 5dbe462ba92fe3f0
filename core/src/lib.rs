//! # Docchain Core
//!
//! Core data structures and consensus rules for the Docchain engine.
//! This crate provides the object codec (canonical hashing and id
//! derivation), the schema compiler for user-authored DAP schemas, the
//! structural validation seam, and the state-transition validator that
//! decides whether a mutation may be admitted into a document space.
//!
//! The simulated chain and document index live in `docchain-node`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod codec;
pub mod config;
pub mod consensus;
pub mod crypto;
pub mod error;
pub mod models;
pub mod schema;
pub mod utils;

/// Re-export common types for ease of use
pub use codec::RecordKind;
pub use consensus::{ConsensusError, TransitionValidator};
pub use error::{CoreError, Result};
pub use models::{
    Action, Block, BlockInfo, DapContract, DapObject, Identity, OwnedObject, Registration,
    TransitionHeader, TransitionPacket,
};
pub use schema::{DapSchema, SchemaCompiler, SchemaDefinitionError, StructuralError};

/// Version of the core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Create a domain-separated secure hash
///
/// # Arguments
///
/// * `domain` - Domain prefix (e.g., "DOCCHAIN_BLOCK")
/// * `data` - Data to hash
///
/// # Returns
///
/// A 32-byte secure hash with domain separation
pub fn secure_hash(domain: &str, data: &[u8]) -> [u8; 32] {
    crypto::secure_hash(domain, data)
}

/// Create a domain-separated secure hash of multiple inputs
///
/// # Arguments
///
/// * `domain` - Domain prefix (e.g., "DOCCHAIN_BLOCK")
/// * `data` - Vector of data to hash
///
/// # Returns
///
/// A 32-byte secure hash with domain separation
pub fn secure_hash_multiple(domain: &str, data: &[&[u8]]) -> [u8; 32] {
    crypto::secure_hash_multiple(domain, data)
}
