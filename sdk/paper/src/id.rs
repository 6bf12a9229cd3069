//! Identifiers
//!
//! ```text
//! PaperId   = SHA256( slug )
//! Principal = SHA256( "cipher-scribe/principal" || label )
//! ```
//!
//! Both are opaque 32-byte keys and serialize as plain hex. Only the caller derives
//! them; the registry just enforces uniqueness.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;
use wincode::{SchemaRead, SchemaWrite};

const PRINCIPAL_DOMAIN: &[u8] = b"cipher-scribe/principal";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaperError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid length: expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

fn parse_hex32(s: &str) -> Result<[u8; 32], PaperError> {
    let trimmed = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(trimmed).map_err(|e| PaperError::InvalidHex(e.to_string()))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| PaperError::InvalidLength(bytes.len()))
}

/// Unique paper identifier
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, SchemaRead, SchemaWrite, Serialize,
    Deserialize,
)]
pub struct PaperId(#[serde(with = "hex::serde")] pub [u8; 32]);

impl PaperId {
    /// Derive the id for a human-readable slug
    pub fn from_slug(slug: &str) -> Self {
        Self(Sha256::digest(slug.as_bytes()).into())
    }

    /// Parse a hex id (with or without `0x`)
    pub fn from_hex(s: &str) -> Result<Self, PaperError> {
        parse_hex32(s).map(Self)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl AsRef<[u8]> for PaperId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for PaperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

/// A caller identity: owner, reviewer or disclosure requester
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, SchemaRead, SchemaWrite, Serialize,
    Deserialize,
)]
pub struct Principal(#[serde(with = "hex::serde")] pub [u8; 32]);

impl Principal {
    /// Deterministic principal for a named participant ("alice", "deployer", ...)
    pub fn from_label(label: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(PRINCIPAL_DOMAIN);
        hasher.update(label.as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn from_hex(s: &str) -> Result<Self, PaperError> {
        parse_hex32(s).map(Self)
    }

    /// Accepts a 64-char hex principal, otherwise treats the input as a label.
    pub fn resolve(s: &str) -> Self {
        Self::from_hex(s).unwrap_or_else(|_| Self::from_label(s))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short form for logs: first 4 and last 2 bytes
    pub fn short(&self) -> String {
        let full = self.to_hex();
        format!("{}..{}", &full[..8], &full[60..])
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl AsRef<[u8]> for Principal {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_derivation_is_deterministic() {
        let a = PaperId::from_slug("paper-best");
        let b = PaperId::from_slug("paper-best");
        let c = PaperId::from_slug("paper-dup");
        assert_eq!(a, b);
        assert_ne!(a, c, "different slugs must give different ids");
    }

    #[test]
    fn test_paper_id_hex_parse() {
        let id = PaperId::from_slug("paper-zero");
        assert_eq!(PaperId::from_hex(&id.to_hex()).unwrap(), id);
        assert_eq!(PaperId::from_hex(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_paper_id_rejects_bad_input() {
        assert_eq!(PaperId::from_hex("abcd"), Err(PaperError::InvalidLength(2)));
        assert!(matches!(
            PaperId::from_hex("zz"),
            Err(PaperError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_principal_resolve() {
        let alice = Principal::from_label("alice");
        assert_eq!(Principal::resolve("alice"), alice);
        assert_eq!(Principal::resolve(&alice.to_hex()), alice);
        assert_ne!(Principal::from_label("bob"), alice);
    }

    #[test]
    fn test_principal_short() {
        let p = Principal([0xab; 32]);
        assert_eq!(p.short(), "abababab..abab");
    }
}
