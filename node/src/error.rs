//! Error types for the node crate
//!
//! Wraps the core error taxonomy and adds the ledger/index failure kinds.
//! `Internal` marks store/index inconsistencies that must surface loudly.

use thiserror::Error;

use docchain_core::schema::StructuralError;
use docchain_core::{ConsensusError, CoreError, SchemaDefinitionError};

/// Node error type
#[derive(Error, Debug)]
pub enum NodeError {
    /// A core validation or consensus failure
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The requested username is already bound to a confirmed identity
    #[error("username '{uname}' is already taken")]
    UsernameTaken {
        /// The contested username
        uname: String,
    },

    /// No contract is registered under the given DAP id
    #[error("unknown DAP contract '{dapid}'")]
    UnknownContract {
        /// The unresolved DAP id
        dapid: String,
    },

    /// A confirmed header references a packet that was never pinned
    #[error("packet '{pakid}' is not pinned")]
    PacketNotPinned {
        /// The unresolved packet id
        pakid: String,
    },

    /// A store or index inconsistency; aborts the current mutation
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for the node crate
pub type Result<T> = std::result::Result<T, NodeError>;

impl From<StructuralError> for NodeError {
    fn from(error: StructuralError) -> Self {
        NodeError::Core(CoreError::Structural(error))
    }
}

impl From<ConsensusError> for NodeError {
    fn from(error: ConsensusError) -> Self {
        NodeError::Core(CoreError::Consensus(error))
    }
}

impl From<SchemaDefinitionError> for NodeError {
    fn from(error: SchemaDefinitionError) -> Self {
        NodeError::Core(CoreError::SchemaDefinition(error))
    }
}

impl NodeError {
    /// True if this rejection is recoverable by fixing the input
    /// (as opposed to an internal inconsistency)
    pub fn is_rejection(&self) -> bool {
        !matches!(self, NodeError::Internal(_))
    }
}
