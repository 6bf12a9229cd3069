use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FheError;
use scribe_paper::Principal;

fn decode_hex(s: &str) -> Result<Vec<u8>, FheError> {
    hex::decode(s.strip_prefix("0x").unwrap_or(s))
        .map_err(|e| FheError::InvalidEncoding(e.to_string()))
}

/// Opaque reference to an encrypted value held by the coprocessor.
///
/// Equality is the only meaningful operation on the bit pattern.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct CiphertextHandle(#[serde(with = "hex::serde")] pub [u8; 32]);

impl CiphertextHandle {
    pub fn from_hex(s: &str) -> Result<Self, FheError> {
        let bytes = decode_hex(s)?;
        let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            FheError::InvalidEncoding(format!("handle must be 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

/// Proof that a ciphertext was produced by its submitter
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct InputProof(#[serde(with = "hex::serde")] pub Vec<u8>);

impl InputProof {
    pub fn from_hex(s: &str) -> Result<Self, FheError> {
        decode_hex(s).map(Self)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

/// Output of a client-side encryption
#[derive(Clone, Debug)]
pub struct EncryptedInput {
    pub handle: CiphertextHandle,
    pub proof: InputProof,
}

/// Why a decryption right was granted
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisclosurePurpose {
    /// Sum released so the requester can compute the average
    FinalScore,
    /// Raw aggregate released as-is
    TotalShare,
}

impl DisclosurePurpose {
    pub fn tag(&self) -> u8 {
        match self {
            Self::FinalScore => 1,
            Self::TotalShare => 2,
        }
    }
}

impl fmt::Display for DisclosurePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FinalScore => write!(f, "final_score"),
            Self::TotalShare => write!(f, "total_share"),
        }
    }
}

/// Single-use right for `grantee` to decrypt `handle`
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct DecryptAuthorization {
    pub handle: CiphertextHandle,
    pub grantee: Principal,
    pub purpose: DisclosurePurpose,
    #[serde(with = "hex::serde")]
    pub token: [u8; 32],
}
