//! Ledger notifications
//!
//! Emitted after a transition commits. Subscribers that fall behind lose the
//! oldest events, never the ledger state.

use log::debug;
use serde::Serialize;
use tokio::sync::broadcast;

use scribe_paper::{PaperId, Principal};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    PaperRegistered {
        paper_id: PaperId,
        title: String,
        track: String,
    },
    PaperUpdated {
        paper_id: PaperId,
        title: String,
        track: String,
    },
    ScoreSubmitted {
        paper_id: PaperId,
        reviewer: Principal,
        review_count: u64,
        timestamp: u64,
    },
    FinalScorePrepared {
        paper_id: PaperId,
        requester: Principal,
    },
    TotalHandleShared {
        paper_id: PaperId,
        requester: Principal,
    },
    OwnershipTransferred {
        previous: Option<Principal>,
        new: Option<Principal>,
    },
}

impl LedgerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PaperRegistered { .. } => "paper_registered",
            Self::PaperUpdated { .. } => "paper_updated",
            Self::ScoreSubmitted { .. } => "score_submitted",
            Self::FinalScorePrepared { .. } => "final_score_prepared",
            Self::TotalHandleShared { .. } => "total_handle_shared",
            Self::OwnershipTransferred { .. } => "ownership_transferred",
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LedgerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn emit(&self, event: LedgerEvent) {
        debug!("event {}", event.name());
        // No subscribers is fine
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.tx.subscribe()
    }
}
