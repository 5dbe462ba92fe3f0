/// Docchain - a blockchain-anchored, schema-validated document platform
///
/// This is the root crate that provides workspace-level documentation.
/// Actual implementation is in the subcrates:
/// - `docchain-core`: object codec, schema compilation and consensus validation
/// - `docchain-node`: the simulated ledger, document index and gateway facade

/// Returns the version of the package.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
