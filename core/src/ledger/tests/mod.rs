mod db;
mod disclosure;
mod registry;
mod scores;

use std::sync::Arc;

use super::{Ledger, LedgerConfig, ManualClock};
use crate::storage::MemoryStore;
use scribe_fhe::{EncryptedValueService, MemoryTable, MockCoprocessor};
use scribe_paper::{Paper, PaperId, PaperMetadata, Principal};

const SEED: &str = "ledger-tests";
const START_MS: u64 = 1_700_000_000_000;

/// In-memory ledger with handles on its collaborators
pub(crate) struct Harness {
    pub ledger: Arc<Ledger>,
    pub fhe: Arc<MockCoprocessor<MemoryTable>>,
    pub clock: Arc<ManualClock>,
}

pub(crate) fn owner() -> Principal {
    Principal::from_label("deployer")
}

pub(crate) fn reviewer(name: &str) -> Principal {
    Principal::from_label(name)
}

pub(crate) fn metadata(title: &str) -> PaperMetadata {
    PaperMetadata::new(title, "Cryptography", "author-1")
}

pub(crate) fn harness() -> Harness {
    harness_with(LedgerConfig::new(owner()))
}

pub(crate) fn harness_with(config: LedgerConfig) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let fhe = Arc::new(MockCoprocessor::new(SEED, MemoryTable::new()));
    let clock = Arc::new(ManualClock::new(START_MS));
    let ledger = Ledger::open(store, fhe.clone(), clock.clone(), config).unwrap();
    Harness {
        ledger: Arc::new(ledger),
        fhe,
        clock,
    }
}

impl Harness {
    pub fn register(&self, slug: &str) -> Paper {
        self.ledger
            .registry
            .register(&owner(), PaperId::from_slug(slug), metadata(slug))
            .unwrap()
    }

    /// Encrypt `score` as `who` and submit it
    pub fn submit(&self, who: &Principal, paper: PaperId, score: u32) {
        let input = self.fhe.encrypt(score, who).unwrap();
        self.ledger
            .scores
            .submit(who, paper, input.handle, &input.proof)
            .unwrap();
    }

    pub fn decrypted_total(&self, paper: PaperId) -> u32 {
        let requester = reviewer("reader");
        let disclosure = self
            .ledger
            .disclosure
            .share_total(&requester, paper)
            .unwrap();
        self.fhe
            .decrypt(&disclosure.authorization, &requester)
            .unwrap()
    }
}
