//! Review helpers
//!
//! Score bounds and the off-ledger arithmetic done on decrypted aggregates.

use std::str::FromStr;

use crate::paper::Paper;

/// Lowest score a review can contribute after clamping
pub const MIN_SCORE: u32 = 0;
/// Highest score a review can contribute after clamping
pub const MAX_SCORE: u32 = 10;
/// Reviews needed before a paper counts as sufficiently reviewed
pub const DEFAULT_MIN_REVIEWS: u64 = 3;

/// Average of a decrypted sum, rounded to two decimals. Zero when there are no reviews.
pub fn average_score(sum: u64, review_count: u64) -> f64 {
    if review_count == 0 {
        return 0.0;
    }
    let avg = sum as f64 / review_count as f64;
    (avg * 100.0).round() / 100.0
}

pub fn format_review_count(count: u64) -> String {
    match count {
        0 => "No reviews".to_string(),
        1 => "1 review".to_string(),
        n => format!("{} reviews", n),
    }
}

pub fn has_sufficient_reviews(count: u64, min_reviews: u64) -> bool {
    count >= min_reviews
}

pub fn review_status(count: u64, min_reviews: u64) -> String {
    if count == 0 {
        return "Not reviewed".to_string();
    }
    if count < min_reviews {
        let missing = min_reviews - count;
        let plural = if missing > 1 { "s" } else { "" };
        return format!("Needs {} more review{}", missing, plural);
    }
    "Sufficiently reviewed".to_string()
}

/// Listing order for papers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Registration order
    #[default]
    Registered,
    Newest,
    Oldest,
    MostReviewed,
    LeastReviewed,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "registered" => Ok(Self::Registered),
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            "most-reviewed" => Ok(Self::MostReviewed),
            "least-reviewed" => Ok(Self::LeastReviewed),
            other => Err(format!("unknown sort order: {}", other)),
        }
    }
}

/// Stable sort, so ties keep registration order
pub fn sort_papers(papers: &mut [Paper], order: SortOrder) {
    match order {
        SortOrder::Registered => {}
        SortOrder::Newest => papers.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortOrder::Oldest => papers.sort_by_key(|p| p.created_at),
        SortOrder::MostReviewed => papers.sort_by(|a, b| b.review_count.cmp(&a.review_count)),
        SortOrder::LeastReviewed => papers.sort_by_key(|p| p.review_count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PaperId, PaperMetadata};

    fn paper(slug: &str, created_at: u64, reviews: u64) -> Paper {
        let mut p = Paper::new(
            PaperId::from_slug(slug),
            PaperMetadata::new(slug, "track", ""),
            created_at,
        );
        p.review_count = reviews;
        p
    }

    #[test]
    fn test_average_of_clamped_scenario() {
        // 12 clamped to 10, plus 8
        assert_eq!(average_score(18, 2), 9.0);
    }

    #[test]
    fn test_average_rounding_and_zero() {
        assert_eq!(average_score(0, 0), 0.0);
        assert_eq!(average_score(10, 3), 3.33);
        assert_eq!(average_score(20, 3), 6.67);
    }

    #[test]
    fn test_review_count_text() {
        assert_eq!(format_review_count(0), "No reviews");
        assert_eq!(format_review_count(1), "1 review");
        assert_eq!(format_review_count(5), "5 reviews");
    }

    #[test]
    fn test_review_status() {
        assert_eq!(review_status(0, DEFAULT_MIN_REVIEWS), "Not reviewed");
        assert_eq!(review_status(1, DEFAULT_MIN_REVIEWS), "Needs 2 more reviews");
        assert_eq!(review_status(2, DEFAULT_MIN_REVIEWS), "Needs 1 more review");
        assert_eq!(review_status(3, DEFAULT_MIN_REVIEWS), "Sufficiently reviewed");
        assert!(has_sufficient_reviews(3, DEFAULT_MIN_REVIEWS));
        assert!(!has_sufficient_reviews(2, DEFAULT_MIN_REVIEWS));
    }

    #[test]
    fn test_sort_orders() {
        let mut papers = vec![paper("a", 10, 1), paper("b", 30, 0), paper("c", 20, 4)];

        sort_papers(&mut papers, SortOrder::Newest);
        assert_eq!(papers[0].title, "b");

        sort_papers(&mut papers, SortOrder::Oldest);
        assert_eq!(papers[0].title, "a");

        sort_papers(&mut papers, SortOrder::MostReviewed);
        assert_eq!(papers[0].title, "c");

        sort_papers(&mut papers, SortOrder::LeastReviewed);
        assert_eq!(papers[0].title, "b");
    }

    #[test]
    fn test_sort_order_parse() {
        assert_eq!("most-reviewed".parse(), Ok(SortOrder::MostReviewed));
        assert_eq!("Newest".parse(), Ok(SortOrder::Newest));
        assert!("random".parse::<SortOrder>().is_err());
    }
}
