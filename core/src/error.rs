//! Error types for the core crate
//!
//! This module provides a consolidated error type for the core crate,
//! wrapping the schema-definition, structural and consensus error kinds
//! so that callers can match on the specific rule that rejected an input.

use thiserror::Error;

use crate::consensus::ConsensusError;
use crate::schema::{SchemaDefinitionError, StructuralError};

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// A user-authored DAP schema failed compilation
    #[error("schema definition rejected: {0}")]
    SchemaDefinition(#[from] SchemaDefinitionError),

    /// An object or packet failed JSON-Schema-level structural checks
    #[error("structural validation failed: {0}")]
    Structural(#[from] StructuralError),

    /// A state transition violated a consensus rule
    #[error("consensus violation: {0}")]
    Consensus(#[from] ConsensusError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal invariant failure
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for the core crate
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// True if this error is a consensus-level rejection (as opposed to a
    /// malformed input or an internal failure)
    pub fn is_consensus(&self) -> bool {
        matches!(self, CoreError::Consensus(_))
    }
}
