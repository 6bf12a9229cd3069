use scribe_fhe::FheError;
use scribe_paper::{PaperId, Principal};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("paper {0} not found")]
    NotFound(PaperId),

    #[error("paper {0} already registered")]
    AlreadyExists(PaperId),

    #[error("invalid metadata: {0}")]
    InvalidMetadata(&'static str),

    #[error("reviewer {reviewer} already submitted a score for paper {paper}")]
    AlreadySubmitted { paper: PaperId, reviewer: Principal },

    #[error("encrypted score failed verification: {0}")]
    InvalidProof(String),

    #[error("paper {0} has no scores yet")]
    NoScoresYet(PaperId),

    #[error("caller {0} is not the owner")]
    NotOwner(Principal),

    #[error("coprocessor error: {0}")]
    Fhe(#[from] FheError),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),

    #[error("ledger service unavailable: {0}")]
    Unavailable(String),
}

impl LedgerError {
    /// Stable code surfaced to API clients
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::AlreadyExists(_) => "ALREADY_EXISTS",
            Self::InvalidMetadata(_) => "INVALID_METADATA",
            Self::AlreadySubmitted { .. } => "ALREADY_SUBMITTED",
            Self::InvalidProof(_) => "INVALID_PROOF",
            Self::NoScoresYet(_) => "NO_SCORES_YET",
            Self::NotOwner(_) => "NOT_OWNER",
            Self::Unavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Fhe(_) | Self::Storage(_) => "INTERNAL_ERROR",
        }
    }

    /// Terminal rejection of the operation itself, as opposed to an infrastructure failure
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            Self::Fhe(_) | Self::Storage(_) | Self::Unavailable(_)
        )
    }
}
