//! Cipher Scribe paper types
//!
//! Identifiers, paper records and the display helpers shared by the node and the CLI.

pub mod id;
pub mod paper;
pub mod review;

pub use id::{PaperError, PaperId, Principal};
pub use paper::{Paper, PaperMetadata};
pub use review::{
    DEFAULT_MIN_REVIEWS, MAX_SCORE, MIN_SCORE, SortOrder, average_score, format_review_count,
    has_sufficient_reviews, review_status, sort_papers,
};

/// Protocol identifier reported by nodes.
pub const PROTOCOL_ID: u32 = 10001;
