//! # Docchain Node
//!
//! The simulated single-writer stack around `docchain-core`: an in-memory
//! collection store, the ledger (mempools, mining, identity index), the
//! document index (packet pinning, commit, relation index) and the gateway
//! facade that sequences them behind one request surface.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod gateway;
pub mod index;
pub mod ledger;
pub mod store;

/// Re-export common types for ease of use
pub use error::{NodeError, Result};
pub use gateway::Gateway;
pub use index::{DapContext, DocumentIndex};
pub use ledger::Ledger;
pub use store::Collection;

/// Version of the node crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
