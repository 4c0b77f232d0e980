//! Fingerprints of list declarations
//!
//! Two processes that load the same declaration compute the same fingerprint,
//! so a consumer can tell whether the schema it materialized is still current.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::list::ListDecl;

/// SHA256 checksum of a serialized declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(format!("{:x}", Sha256::digest(data)))
    }

    /// Checksum of the JSON form of the lists, in declaration order
    pub fn of_lists(lists: &[ListDecl]) -> Self {
        let mut hasher = Sha256::new();
        for list in lists {
            // ListDecl serialization cannot fail: all map keys are strings
            let json = serde_json::to_vec(list).unwrap_or_default();
            hasher.update(&json);
            hasher.update(b"\n");
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Checksum {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
