//! Score Ledger
//!
//! Accepts at most one encrypted score per (paper, reviewer) and folds it into
//! the paper's encrypted total.
//!
//! ```text
//! submit(paper, handle, proof) by reviewer
//!   ├─ paper exists?                  no  → NotFound
//!   ├─ reviewer already submitted?    yes → AlreadySubmitted
//!   ├─ proof binds handle to reviewer? no → InvalidProof
//!   ├─ clamped = max(min(handle, MAX), MIN)
//!   ├─ total'  = total + clamped
//!   └─ commit { total', submission, review_count+1, updated_at }   (one batch)
//! ```
//!
//! Out-of-range plaintexts are clamped, never rejected: the ledger cannot see them.

use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;

use crate::ledger::clock::{Clock, next_timestamp};
use crate::ledger::error::LedgerError;
use crate::ledger::events::{EventBus, LedgerEvent};
use crate::storage::{LedgerBatch, LedgerStore, SubmissionRecord};
use scribe_fhe::{CiphertextHandle, EncryptedValueService, FheError, InputProof};
use scribe_paper::{MAX_SCORE, MIN_SCORE, PaperId, Principal};

/// Returned to the reviewer after an accepted submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub paper_id: PaperId,
    pub reviewer: Principal,
    pub review_count: u64,
    pub timestamp: u64,
    #[serde(with = "hex::serde")]
    pub receipt: [u8; 32],
}

fn receipt_hash(paper_id: &PaperId, reviewer: &Principal, review_count: u64) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(paper_id.as_bytes());
    hasher.update(reviewer.as_bytes());
    hasher.update(&review_count.to_le_bytes());
    *hasher.finalize().as_bytes()
}

pub struct ScoreLedger {
    store: Arc<dyn LedgerStore>,
    fhe: Arc<dyn EncryptedValueService>,
    clock: Arc<dyn Clock>,
    events: EventBus,
}

impl ScoreLedger {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        fhe: Arc<dyn EncryptedValueService>,
        clock: Arc<dyn Clock>,
        events: EventBus,
    ) -> Self {
        Self {
            store,
            fhe,
            clock,
            events,
        }
    }

    pub fn submit(
        &self,
        reviewer: &Principal,
        paper_id: PaperId,
        score: CiphertextHandle,
        proof: &InputProof,
    ) -> Result<SubmissionReceipt, LedgerError> {
        let mut paper = self
            .store
            .get_paper(&paper_id)?
            .ok_or(LedgerError::NotFound(paper_id))?;

        if self.store.get_submission(&paper_id, reviewer)?.is_some() {
            warn!(
                "Duplicate submission from {} for {}",
                reviewer.short(),
                paper_id
            );
            return Err(LedgerError::AlreadySubmitted {
                paper: paper_id,
                reviewer: *reviewer,
            });
        }

        self.fhe
            .verify_proof(&score, proof, reviewer)
            .map_err(|e| match e {
                FheError::InvalidProof(msg) | FheError::UnknownHandle(msg) => {
                    warn!("Invalid proof from {}: {}", reviewer.short(), msg);
                    LedgerError::InvalidProof(msg)
                }
                other => LedgerError::Fhe(other),
            })?;

        let clamped = self.fhe.clamp(&score, MIN_SCORE, MAX_SCORE)?;
        let total = match self.store.get_total(&paper_id)? {
            Some(total) => total,
            None => self.fhe.trivial_encrypt(0)?,
        };
        let new_total = self.fhe.add(&total, &clamped)?;

        paper.review_count += 1;
        paper.updated_at = next_timestamp(self.clock.as_ref(), paper.updated_at);

        let record = SubmissionRecord {
            paper_id,
            reviewer: *reviewer,
            submitted_at: paper.updated_at,
            review_index: paper.review_count,
        };

        self.store.apply_batch(LedgerBatch {
            paper_updates: vec![paper.clone()],
            totals: vec![(paper_id, new_total)],
            submissions: vec![record],
            ..Default::default()
        })?;

        info!(
            "Score accepted for {} from {} (reviews={})",
            paper_id,
            reviewer.short(),
            paper.review_count
        );
        self.events.emit(LedgerEvent::ScoreSubmitted {
            paper_id,
            reviewer: *reviewer,
            review_count: paper.review_count,
            timestamp: paper.updated_at,
        });

        Ok(SubmissionReceipt {
            paper_id,
            reviewer: *reviewer,
            review_count: paper.review_count,
            timestamp: paper.updated_at,
            receipt: receipt_hash(&paper_id, reviewer, paper.review_count),
        })
    }

    /// False for unknown papers as well
    pub fn has_submitted(
        &self,
        paper_id: &PaperId,
        reviewer: &Principal,
    ) -> Result<bool, LedgerError> {
        Ok(self.store.get_submission(paper_id, reviewer)?.is_some())
    }

    pub fn submission(
        &self,
        paper_id: &PaperId,
        reviewer: &Principal,
    ) -> Result<Option<SubmissionRecord>, LedgerError> {
        Ok(self.store.get_submission(paper_id, reviewer)?)
    }

    /// Handle of the paper's encrypted total
    pub fn total(&self, paper_id: &PaperId) -> Result<CiphertextHandle, LedgerError> {
        if self.store.get_paper(paper_id)?.is_none() {
            return Err(LedgerError::NotFound(*paper_id));
        }
        match self.store.get_total(paper_id)? {
            Some(total) => Ok(total),
            None => Ok(self.fhe.trivial_encrypt(0)?),
        }
    }

    /// Plaintext sum, for diagnostics only. Requires a service that supports reveal.
    pub fn plain_sum(&self, paper_id: &PaperId) -> Result<u32, LedgerError> {
        let total = self.total(paper_id)?;
        Ok(self.fhe.reveal(&total)?)
    }
}
