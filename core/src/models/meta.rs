//! Record metadata
//!
//! Every record carries a `meta` section for engine-assigned values: the
//! canonical id, signatures, and indexing annotations stamped at pin or
//! commit time. Metadata never contributes to a record's hash.

use serde::{Deserialize, Serialize};

/// Engine-assigned metadata attached to a record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    /// Canonical id (content hash) of the record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Opaque signature over the id (stored, never verified here)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sig: Option<String>,

    /// Height of the confirming block (identities)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,

    /// Hash of the confirming block (packets)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,

    /// Id of the owning transition header (packets)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tsid: Option<String>,

    /// Id of the submitting identity (packets, related-object annotations)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    /// Username of the submitting identity (related-object annotations)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uname: Option<String>,

    /// Id of the registered DAP (contracts)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dapid: Option<String>,
}

impl Meta {
    /// True if no metadata has been assigned
    pub fn is_empty(&self) -> bool {
        self == &Meta::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_meta_is_skipped() {
        let meta = Meta::default();
        assert!(meta.is_empty());

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn test_assigned_meta_round_trip() {
        let meta = Meta {
            id: Some("abc".to_string()),
            block: Some("def".to_string()),
            ..Meta::default()
        };
        assert!(!meta.is_empty());

        let json = serde_json::to_string(&meta).unwrap();
        let back: Meta = serde_json::from_str(&json).unwrap();
        assert_eq!(meta, back);
    }
}
