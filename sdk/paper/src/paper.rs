use serde::{Deserialize, Serialize};

use crate::id::PaperId;

/// Mutable metadata supplied on register and update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperMetadata {
    pub title: String,
    pub track: String,
    /// Opaque author identifier, may be empty
    #[serde(default)]
    pub author_hash: String,
}

impl PaperMetadata {
    pub fn new(
        title: impl Into<String>,
        track: impl Into<String>,
        author_hash: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            track: track.into(),
            author_hash: author_hash.into(),
        }
    }

    /// Title and track must both be non-empty
    pub fn is_complete(&self) -> bool {
        !self.title.is_empty() && !self.track.is_empty()
    }
}

/// A registered paper
///
/// Timestamps are unix milliseconds. `created_at <= updated_at` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    pub id: PaperId,
    pub title: String,
    pub track: String,
    pub author_hash: String,
    pub review_count: u64,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Paper {
    pub fn new(id: PaperId, metadata: PaperMetadata, now: u64) -> Self {
        Self {
            id,
            title: metadata.title,
            track: metadata.track,
            author_hash: metadata.author_hash,
            review_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn metadata(&self) -> PaperMetadata {
        PaperMetadata::new(&self.title, &self.track, &self.author_hash)
    }

    pub fn apply_metadata(&mut self, metadata: PaperMetadata) {
        self.title = metadata.title;
        self.track = metadata.track;
        self.author_hash = metadata.author_hash;
    }

    pub fn has_scores(&self) -> bool {
        self.review_count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_paper_starts_empty() {
        let id = PaperId::from_slug("paper-zero");
        let paper = Paper::new(
            id,
            PaperMetadata::new("Sparse Transformers", "NeurIPS", "hash:authors"),
            1_000,
        );
        assert_eq!(paper.review_count, 0);
        assert_eq!(paper.created_at, paper.updated_at);
        assert!(!paper.has_scores());
        assert_eq!(paper.metadata().track, "NeurIPS");
    }

    #[test]
    fn test_metadata_completeness() {
        assert!(PaperMetadata::new("T", "Track", "").is_complete());
        assert!(!PaperMetadata::new("", "Track", "a").is_complete());
        assert!(!PaperMetadata::new("T", "", "a").is_complete());
    }

    #[test]
    fn test_json_shape() {
        let paper = Paper::new(
            PaperId([1u8; 32]),
            PaperMetadata::new("Cipher Scribe", "FHE", "authors::123"),
            42,
        );
        let json = serde_json::to_string(&paper).unwrap();
        let back: Paper = serde_json::from_str(&json).unwrap();
        assert_eq!(back, paper);
    }
}
