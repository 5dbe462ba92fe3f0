//! Identities (blockchain users)
//!
//! An identity is derived from an admitted registration during block
//! mining and never mutated afterwards. Its `uid` is the content hash of
//! the founding registration.

use serde::{Deserialize, Serialize};

use super::{Meta, Registration, PROTOCOL_VERSION};
use crate::crypto;
use crate::schema::StructuralError;

/// A confirmed identity on the chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Protocol version
    pub pver: u32,

    /// Username, unique across the chain
    pub uname: String,

    /// Permanent id: hash of the founding registration
    pub uid: String,

    /// Public key bound to the identity (opaque)
    pub pubkey: String,

    /// Credit balance (granted at derivation; adjustment is a non-goal)
    pub credits: u64,

    /// Engine-assigned metadata
    #[serde(default, skip_serializing_if = "Meta::is_empty")]
    pub meta: Meta,
}

impl Identity {
    /// Derive an identity record from a registration
    pub fn derive(registration: &Registration, credits: u64) -> crate::Result<Self> {
        Ok(Identity {
            pver: registration.pver,
            uname: registration.uname.clone(),
            uid: registration.hash()?,
            pubkey: registration.pubkey.clone(),
            credits,
            meta: Meta::default(),
        })
    }

    /// Verify that this identity is a faithful derivation of the given
    /// registration
    pub fn verify(&self, registration: &Registration) -> crate::Result<bool> {
        let expected = registration.hash()?;
        Ok(crypto::verify_hex_digest(&expected, &self.uid)
            && self.uname == registration.uname
            && self.pubkey == registration.pubkey)
    }

    /// Check the value-level invariants of the record
    pub fn validate(&self) -> Result<(), StructuralError> {
        if self.pver != PROTOCOL_VERSION {
            return Err(StructuralError::Malformed(format!(
                "unsupported protocol version {}",
                self.pver
            )));
        }
        if self.uid.is_empty() {
            return Err(StructuralError::Malformed("empty uid".to_string()));
        }
        if !super::registration::is_valid_username(&self.uname) {
            return Err(StructuralError::Malformed(format!(
                "invalid username '{}'",
                self.uname
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive() {
        let registration = Registration::new("alice", "pubkey-a").unwrap();
        let identity = Identity::derive(&registration, 100_000).unwrap();

        assert_eq!(identity.uname, "alice");
        assert_eq!(identity.credits, 100_000);
        assert_eq!(identity.uid, registration.hash().unwrap());
        assert!(identity.verify(&registration).unwrap());
        assert!(identity.validate().is_ok());
    }

    #[test]
    fn test_verify_rejects_mismatch() {
        let registration = Registration::new("alice", "pubkey-a").unwrap();
        let other = Registration::new("bob", "pubkey-b").unwrap();

        let identity = Identity::derive(&registration, 100_000).unwrap();
        assert!(!identity.verify(&other).unwrap());
    }
}
