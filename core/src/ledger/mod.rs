//! Ledger
//!
//! The three state machines of the review process, sharing one store, one
//! encrypted value service and one event bus:
//!
//! - [`PaperRegistry`]: paper records and ownership
//! - [`ScoreLedger`]: one encrypted score per reviewer, folded into a total
//! - [`DisclosureGate`]: decryption grants for a paper's aggregate
//!
//! Mutations are serialized through [`LedgerService`]; reads may go straight
//! to the [`Ledger`].

pub mod clock;
pub mod disclosure;
pub mod error;
pub mod events;
pub mod registry;
pub mod scores;
pub mod service;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use tokio::sync::broadcast;

pub use clock::{Clock, ManualClock, SystemClock};
pub use disclosure::{Audience, Disclosure, DisclosureGate, DisclosurePolicy};
pub use error::LedgerError;
pub use events::{EventBus, LedgerEvent};
pub use registry::PaperRegistry;
pub use scores::{ScoreLedger, SubmissionReceipt};
pub use service::LedgerService;

use crate::storage::LedgerStore;
use scribe_fhe::EncryptedValueService;
use scribe_paper::Principal;

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Owner recorded on first open; ignored once ownership exists
    pub owner: Principal,
    pub event_capacity: usize,
    pub disclosure: DisclosurePolicy,
}

impl LedgerConfig {
    pub fn new(owner: Principal) -> Self {
        Self {
            owner,
            event_capacity: 256,
            disclosure: DisclosurePolicy::default(),
        }
    }
}

pub struct Ledger {
    pub registry: PaperRegistry,
    pub scores: ScoreLedger,
    pub disclosure: DisclosureGate,
    events: EventBus,
}

impl Ledger {
    pub fn open(
        store: Arc<dyn LedgerStore>,
        fhe: Arc<dyn EncryptedValueService>,
        clock: Arc<dyn Clock>,
        config: LedgerConfig,
    ) -> Result<Self, LedgerError> {
        let events = EventBus::new(config.event_capacity);

        let registry = PaperRegistry::new(
            store.clone(),
            fhe.clone(),
            clock.clone(),
            events.clone(),
        );
        registry.init_owner(config.owner)?;

        let scores = ScoreLedger::new(store.clone(), fhe.clone(), clock, events.clone());
        let disclosure = DisclosureGate::new(store, fhe, events.clone(), config.disclosure);

        Ok(Self {
            registry,
            scores,
            disclosure,
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }
}
