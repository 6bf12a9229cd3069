//! Disclosure Gate
//!
//! Decides who may decrypt a paper's aggregate. A paper moves from no-scores to
//! has-scores on its first accepted submission and never back; both disclosure
//! intents require has-scores. Every call issues a fresh single-use grant that
//! replaces any unredeemed one for the same requester and purpose.

use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;

use crate::ledger::error::LedgerError;
use crate::ledger::events::{EventBus, LedgerEvent};
use crate::storage::LedgerStore;
use scribe_config::AudienceToml;
use scribe_fhe::{CiphertextHandle, DecryptAuthorization, DisclosurePurpose, EncryptedValueService};
use scribe_paper::{PaperId, Principal};

/// Who may request a given disclosure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Audience {
    #[default]
    Anyone,
    Owner,
}

impl From<AudienceToml> for Audience {
    fn from(audience: AudienceToml) -> Self {
        match audience {
            AudienceToml::Anyone => Audience::Anyone,
            AudienceToml::Owner => Audience::Owner,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DisclosurePolicy {
    pub final_score: Audience,
    pub share_total: Audience,
}

impl DisclosurePolicy {
    fn audience(&self, purpose: DisclosurePurpose) -> Audience {
        match purpose {
            DisclosurePurpose::FinalScore => self.final_score,
            DisclosurePurpose::TotalShare => self.share_total,
        }
    }
}

/// Handle plus the grant needed to decrypt it
#[derive(Debug, Clone, Serialize)]
pub struct Disclosure {
    pub paper_id: PaperId,
    pub handle: CiphertextHandle,
    pub authorization: DecryptAuthorization,
    /// Divisor for the off-ledger average
    pub review_count: u64,
}

pub struct DisclosureGate {
    store: Arc<dyn LedgerStore>,
    fhe: Arc<dyn EncryptedValueService>,
    events: EventBus,
    policy: DisclosurePolicy,
}

impl DisclosureGate {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        fhe: Arc<dyn EncryptedValueService>,
        events: EventBus,
        policy: DisclosurePolicy,
    ) -> Self {
        Self {
            store,
            fhe,
            events,
            policy,
        }
    }

    pub fn policy(&self) -> DisclosurePolicy {
        self.policy
    }

    /// Release the encrypted sum so the requester can compute `sum / review_count`
    pub fn prepare_average(
        &self,
        requester: &Principal,
        paper_id: PaperId,
    ) -> Result<Disclosure, LedgerError> {
        let disclosure = self.disclose(requester, paper_id, DisclosurePurpose::FinalScore)?;
        self.events.emit(LedgerEvent::FinalScorePrepared {
            paper_id,
            requester: *requester,
        });
        Ok(disclosure)
    }

    /// Release the raw encrypted total
    pub fn share_total(
        &self,
        requester: &Principal,
        paper_id: PaperId,
    ) -> Result<Disclosure, LedgerError> {
        let disclosure = self.disclose(requester, paper_id, DisclosurePurpose::TotalShare)?;
        self.events.emit(LedgerEvent::TotalHandleShared {
            paper_id,
            requester: *requester,
        });
        Ok(disclosure)
    }

    fn disclose(
        &self,
        requester: &Principal,
        paper_id: PaperId,
        purpose: DisclosurePurpose,
    ) -> Result<Disclosure, LedgerError> {
        let paper = self
            .store
            .get_paper(&paper_id)?
            .ok_or(LedgerError::NotFound(paper_id))?;

        if self.policy.audience(purpose) == Audience::Owner {
            let owner = self.store.get_ownership()?.and_then(|o| o.owner());
            if owner != Some(*requester) {
                warn!(
                    "Rejected {} disclosure for {} by {}",
                    purpose,
                    paper_id,
                    requester.short()
                );
                return Err(LedgerError::NotOwner(*requester));
            }
        }

        if !paper.has_scores() {
            return Err(LedgerError::NoScoresYet(paper_id));
        }

        let handle = self
            .store
            .get_total(&paper_id)?
            .ok_or_else(|| anyhow::anyhow!("paper {} has scores but no total", paper_id))?;
        let authorization = self.fhe.grant_decrypt(&handle, requester, purpose)?;

        info!(
            "Disclosure {} for {} granted to {}",
            purpose,
            paper_id,
            requester.short()
        );

        Ok(Disclosure {
            paper_id,
            handle,
            authorization,
            review_count: paper.review_count,
        })
    }
}
