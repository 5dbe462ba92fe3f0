//! Identity registration records
//!
//! A registration (`subtx`) requests a username on the chain. Once mined,
//! an [`Identity`](super::Identity) is derived from it; the registration's
//! content hash becomes the identity's permanent `uid`.

use serde::{Deserialize, Serialize};

use super::{Meta, PROTOCOL_VERSION};
use crate::codec::{self, RecordKind};
use crate::schema::StructuralError;

/// Registration action opcode: register a new username
pub const ACTION_REGISTER: u32 = 1;

/// An identity registration awaiting (or confirmed in) a block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    /// Protocol version
    pub pver: u32,

    /// Action opcode; only `1` (register) is accepted
    pub action: u32,

    /// Requested username
    pub uname: String,

    /// Public key bound to the identity (opaque)
    pub pubkey: String,

    /// Engine-assigned metadata
    #[serde(default, skip_serializing_if = "Meta::is_empty")]
    pub meta: Meta,
}

impl Registration {
    /// Create a registration for a username and assign its id
    pub fn new(uname: &str, pubkey: &str) -> crate::Result<Self> {
        let mut registration = Registration {
            pver: PROTOCOL_VERSION,
            action: ACTION_REGISTER,
            uname: uname.to_string(),
            pubkey: pubkey.to_string(),
            meta: Meta::default(),
        };
        registration.assign_id()?;
        Ok(registration)
    }

    /// Canonical content hash of this registration
    pub fn hash(&self) -> crate::Result<String> {
        codec::hash_record(RecordKind::Registration, self)
    }

    /// Compute and store the canonical id into the metadata
    pub fn assign_id(&mut self) -> crate::Result<()> {
        self.meta.id = Some(self.hash()?);
        Ok(())
    }

    /// Check the value-level invariants of the record
    pub fn validate(&self) -> Result<(), StructuralError> {
        if self.pver != PROTOCOL_VERSION {
            return Err(StructuralError::Malformed(format!(
                "unsupported protocol version {}",
                self.pver
            )));
        }
        if self.action != ACTION_REGISTER {
            return Err(StructuralError::Malformed(format!(
                "unsupported registration action {}",
                self.action
            )));
        }
        if !is_valid_username(&self.uname) {
            return Err(StructuralError::Malformed(format!(
                "invalid username '{}'",
                self.uname
            )));
        }
        if self.pubkey.is_empty() {
            return Err(StructuralError::Malformed("empty pubkey".to_string()));
        }
        Ok(())
    }
}

/// Check a username against the platform naming rule:
/// 3 to 24 characters from `[a-z0-9_]`
pub fn is_valid_username(uname: &str) -> bool {
    (3..=24).contains(&uname.len())
        && uname
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_assigns_id() {
        let registration = Registration::new("alice", "pubkey-a").unwrap();
        assert!(registration.meta.id.is_some());
        assert_eq!(registration.meta.id.as_deref().unwrap().len(), 64);
    }

    #[test]
    fn test_id_is_content_hash() {
        let a = Registration::new("alice", "pubkey-a").unwrap();
        let mut b = a.clone();

        // Metadata does not contribute to the hash
        b.meta.sig = Some("sig".to_string());
        assert_eq!(a.hash().unwrap(), b.hash().unwrap());

        // Content does
        b.uname = "alicia".to_string();
        assert_ne!(a.hash().unwrap(), b.hash().unwrap());
    }

    #[test]
    fn test_validate() {
        let registration = Registration::new("alice", "pubkey-a").unwrap();
        assert!(registration.validate().is_ok());

        let mut bad_action = registration.clone();
        bad_action.action = 2;
        assert!(bad_action.validate().is_err());

        let mut bad_pubkey = registration.clone();
        bad_pubkey.pubkey = String::new();
        assert!(bad_pubkey.validate().is_err());
    }

    #[test]
    fn test_username_rule() {
        assert!(is_valid_username("bob"));
        assert!(is_valid_username("alice_2"));
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("a".repeat(25).as_str()));
        assert!(!is_valid_username("Alice"));
        assert!(!is_valid_username("al ice"));
    }
}
