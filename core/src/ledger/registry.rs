//! Paper Registry
//!
//! Owns paper metadata and the single owner allowed to register or edit it.
//! Each registration also seeds the paper's encrypted total with an encryption
//! of zero, committed in the same batch as the record.

use std::sync::Arc;

use log::{info, warn};

use crate::ledger::clock::{Clock, next_timestamp};
use crate::ledger::error::LedgerError;
use crate::ledger::events::{EventBus, LedgerEvent};
use crate::storage::{LedgerBatch, LedgerStore, Ownership};
use scribe_fhe::EncryptedValueService;
use scribe_paper::{Paper, PaperId, PaperMetadata, Principal};

pub struct PaperRegistry {
    store: Arc<dyn LedgerStore>,
    fhe: Arc<dyn EncryptedValueService>,
    clock: Arc<dyn Clock>,
    events: EventBus,
}

fn validate(metadata: &PaperMetadata) -> Result<(), LedgerError> {
    if metadata.title.is_empty() {
        return Err(LedgerError::InvalidMetadata("title must not be empty"));
    }
    if metadata.track.is_empty() {
        return Err(LedgerError::InvalidMetadata("track must not be empty"));
    }
    Ok(())
}

impl PaperRegistry {
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

    // =========================================================================
    // Ownership
    // =========================================================================

    /// Current owner, `None` once renounced
    pub fn owner(&self) -> Result<Option<Principal>, LedgerError> {
        Ok(self.store.get_ownership()?.and_then(|o| o.owner()))
    }

    /// Record the initial owner. No-op if ownership was already recorded.
    pub fn init_owner(&self, owner: Principal) -> Result<bool, LedgerError> {
        if self.store.get_ownership()?.is_some() {
            return Ok(false);
        }

        self.store.apply_batch(LedgerBatch {
            ownership: Some(Ownership::Owned(owner)),
            ..Default::default()
        })?;

        info!("Ledger owner set to {}", owner.short());
        self.events.emit(LedgerEvent::OwnershipTransferred {
            previous: None,
            new: Some(owner),
        });
        Ok(true)
    }

    fn ensure_owner(&self, caller: &Principal) -> Result<(), LedgerError> {
        match self.owner()? {
            Some(owner) if owner == *caller => Ok(()),
            _ => {
                warn!("Rejected owner-only call from {}", caller.short());
                Err(LedgerError::NotOwner(*caller))
            }
        }
    }

    pub fn transfer_ownership(
        &self,
        caller: &Principal,
        new_owner: Principal,
    ) -> Result<(), LedgerError> {
        self.ensure_owner(caller)?;

        self.store.apply_batch(LedgerBatch {
            ownership: Some(Ownership::Owned(new_owner)),
            ..Default::default()
        })?;

        info!(
            "Ownership transferred {} -> {}",
            caller.short(),
            new_owner.short()
        );
        self.events.emit(LedgerEvent::OwnershipTransferred {
            previous: Some(*caller),
            new: Some(new_owner),
        });
        Ok(())
    }

    /// Give up ownership for good. Registration and updates become impossible.
    pub fn renounce_ownership(&self, caller: &Principal) -> Result<(), LedgerError> {
        self.ensure_owner(caller)?;

        self.store.apply_batch(LedgerBatch {
            ownership: Some(Ownership::Renounced),
            ..Default::default()
        })?;

        info!("Ownership renounced by {}", caller.short());
        self.events.emit(LedgerEvent::OwnershipTransferred {
            previous: Some(*caller),
            new: None,
        });
        Ok(())
    }

    // =========================================================================
    // Papers
    // =========================================================================

    pub fn register(
        &self,
        caller: &Principal,
        id: PaperId,
        metadata: PaperMetadata,
    ) -> Result<Paper, LedgerError> {
        self.ensure_owner(caller)?;

        if self.store.get_paper(&id)?.is_some() {
            return Err(LedgerError::AlreadyExists(id));
        }
        validate(&metadata)?;

        let zero = self.fhe.trivial_encrypt(0)?;
        let paper = Paper::new(id, metadata, self.clock.now_millis());

        self.store.apply_batch(LedgerBatch {
            new_papers: vec![paper.clone()],
            totals: vec![(id, zero)],
            ..Default::default()
        })?;

        info!("Paper registered: {} ({})", paper.title, id);
        self.events.emit(LedgerEvent::PaperRegistered {
            paper_id: id,
            title: paper.title.clone(),
            track: paper.track.clone(),
        });
        Ok(paper)
    }

    pub fn update(
        &self,
        caller: &Principal,
        id: PaperId,
        metadata: PaperMetadata,
    ) -> Result<Paper, LedgerError> {
        self.ensure_owner(caller)?;

        let mut paper = self.get(&id)?;
        validate(&metadata)?;

        paper.apply_metadata(metadata);
        paper.updated_at = next_timestamp(self.clock.as_ref(), paper.updated_at);

        self.store.apply_batch(LedgerBatch {
            paper_updates: vec![paper.clone()],
            ..Default::default()
        })?;

        info!("Paper updated: {} ({})", paper.title, id);
        self.events.emit(LedgerEvent::PaperUpdated {
            paper_id: id,
            title: paper.title.clone(),
            track: paper.track.clone(),
        });
        Ok(paper)
    }

    pub fn get(&self, id: &PaperId) -> Result<Paper, LedgerError> {
        self.store
            .get_paper(id)?
            .ok_or(LedgerError::NotFound(*id))
    }

    /// All papers in registration order
    pub fn list(&self) -> Result<Vec<Paper>, LedgerError> {
        Ok(self.store.list_papers()?)
    }

    /// Ids only, in registration order
    pub fn ids(&self) -> Result<Vec<PaperId>, LedgerError> {
        Ok(self.store.list_paper_ids()?)
    }

    pub fn count(&self) -> Result<u64, LedgerError> {
        Ok(self.store.paper_count()?)
    }
}
