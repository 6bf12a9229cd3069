//! API Types
//!
//! Request/response types for the HTTP API. Identifiers travel as hex strings;
//! principals may also be given as labels.

use serde::{Deserialize, Serialize};

use crate::ledger::Disclosure;
use scribe_fhe::{CiphertextHandle, DecryptAuthorization, DisclosurePurpose};
use scribe_paper::{Paper, PaperId, Principal};

// ============================================================================
// Health & Status
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: String,
    pub protocol_id: u32,
    pub uptime_secs: u64,
    pub paper_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BoundsResponse {
    pub min_score: u32,
    pub max_score: u32,
    pub min_reviews: u64,
}

// ============================================================================
// Papers
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListPapersQuery {
    /// registered | newest | oldest | most-reviewed | least-reviewed
    pub sort: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GetPaperRequest {
    pub paper_id: String,
}

/// Paper record plus derived display fields
#[derive(Debug, Serialize)]
pub struct PaperResponse {
    #[serde(flatten)]
    pub paper: Paper,
    pub review_status: String,
}

impl From<Paper> for PaperResponse {
    fn from(paper: Paper) -> Self {
        let review_status =
            scribe_paper::review_status(paper.review_count, scribe_paper::DEFAULT_MIN_REVIEWS);
        Self {
            paper,
            review_status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PapersResponse {
    pub papers: Vec<PaperResponse>,
    pub count: usize,
}

/// Registration order, without metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct PaperIdsResponse {
    pub ids: Vec<PaperId>,
    pub count: usize,
}

/// Body for both register and update
#[derive(Debug, Deserialize)]
pub struct PaperMetadataRequest {
    pub caller: String,
    pub paper_id: String,
    pub title: String,
    pub track: String,
    #[serde(default)]
    pub author_hash: String,
}

// ============================================================================
// Scores
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SubmitScoreRequest {
    pub reviewer: String,
    pub paper_id: String,
    /// Ciphertext handle (hex)
    pub handle: String,
    /// Input proof (hex)
    pub proof: String,
}

#[derive(Debug, Deserialize)]
pub struct HasSubmittedRequest {
    pub reviewer: String,
    pub paper_id: String,
}

#[derive(Debug, Serialize)]
pub struct HasSubmittedResponse {
    pub paper_id: PaperId,
    pub reviewer: Principal,
    pub submitted: bool,
}

// ============================================================================
// Disclosure
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DisclosureRequest {
    pub requester: String,
    pub paper_id: String,
}

#[derive(Debug, Serialize)]
pub struct DisclosureResponse {
    pub paper_id: PaperId,
    pub purpose: DisclosurePurpose,
    pub handle: CiphertextHandle,
    pub authorization: DecryptAuthorization,
    pub review_count: u64,
}

impl From<Disclosure> for DisclosureResponse {
    fn from(d: Disclosure) -> Self {
        Self {
            paper_id: d.paper_id,
            purpose: d.authorization.purpose,
            handle: d.handle,
            authorization: d.authorization,
            review_count: d.review_count,
        }
    }
}

// ============================================================================
// Ownership
// ============================================================================

#[derive(Debug, Serialize)]
pub struct OwnerResponse {
    /// `None` once renounced
    pub owner: Option<Principal>,
}

#[derive(Debug, Deserialize)]
pub struct TransferOwnerRequest {
    pub caller: String,
    pub new_owner: String,
}

#[derive(Debug, Deserialize)]
pub struct RenounceOwnerRequest {
    pub caller: String,
}

// ============================================================================
// Relayer
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct EncryptRequest {
    pub value: u32,
    pub submitter: String,
}

#[derive(Debug, Serialize)]
pub struct EncryptResponse {
    pub handle: String,
    pub proof: String,
}

#[derive(Debug, Deserialize)]
pub struct DecryptRequest {
    pub requester: String,
    pub authorization: DecryptAuthorization,
}

#[derive(Debug, Serialize)]
pub struct DecryptResponse {
    pub value: u32,
}

// ============================================================================
// Dev
// ============================================================================

#[derive(Debug, Serialize)]
pub struct PlainSumResponse {
    pub paper_id: PaperId,
    pub sum: u32,
    pub review_count: u64,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(msg, "BAD_REQUEST")
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(msg, "INTERNAL_ERROR")
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(msg, "FORBIDDEN")
    }
}
