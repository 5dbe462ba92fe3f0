//! Consensus-level transition validation
//!
//! Structural conformance is delegated to the schema module; the rules in
//! here are the bespoke consensus invariants: id correctness, uniqueness,
//! ownership and relation legality.

mod state;

pub use state::{ConsensusError, TransitionValidator};
