use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{Result, anyhow};
use scribe_fhe::CiphertextHandle;
use scribe_paper::{Paper, PaperId, Principal};

use crate::storage::state::{LedgerBatch, LedgerStore, Ownership, SubmissionRecord};

#[derive(Default)]
struct MemoryState {
    papers: HashMap<PaperId, Paper>,
    order: Vec<PaperId>,
    totals: HashMap<PaperId, CiphertextHandle>,
    submissions: HashMap<(PaperId, Principal), SubmissionRecord>,
    ownership: Option<Ownership>,
}

/// Process-local ledger store. Batches are applied under a single write lock.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&MemoryState) -> T) -> Result<T> {
        let state = self.state.read().map_err(|_| anyhow!("memory store poisoned"))?;
        Ok(f(&state))
    }
}

impl LedgerStore for MemoryStore {
    fn get_paper(&self, id: &PaperId) -> Result<Option<Paper>> {
        self.read(|s| s.papers.get(id).cloned())
    }

    fn list_papers(&self) -> Result<Vec<Paper>> {
        self.read(|s| {
            s.order
                .iter()
                .filter_map(|id| s.papers.get(id).cloned())
                .collect()
        })
    }

    fn list_paper_ids(&self) -> Result<Vec<PaperId>> {
        self.read(|s| s.order.clone())
    }

    fn paper_count(&self) -> Result<u64> {
        self.read(|s| s.order.len() as u64)
    }

    fn get_total(&self, id: &PaperId) -> Result<Option<CiphertextHandle>> {
        self.read(|s| s.totals.get(id).copied())
    }

    fn get_submission(
        &self,
        id: &PaperId,
        reviewer: &Principal,
    ) -> Result<Option<SubmissionRecord>> {
        self.read(|s| s.submissions.get(&(*id, *reviewer)).copied())
    }

    fn get_ownership(&self) -> Result<Option<Ownership>> {
        self.read(|s| s.ownership)
    }

    fn apply_batch(&self, batch: LedgerBatch) -> Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|_| anyhow!("memory store poisoned"))?;

        for paper in batch.new_papers {
            state.order.push(paper.id);
            state.papers.insert(paper.id, paper);
        }
        for paper in batch.paper_updates {
            state.papers.insert(paper.id, paper);
        }
        for (id, handle) in batch.totals {
            state.totals.insert(id, handle);
        }
        for record in batch.submissions {
            state
                .submissions
                .insert((record.paper_id, record.reviewer), record);
        }
        if let Some(ownership) = batch.ownership {
            state.ownership = Some(ownership);
        }

        Ok(())
    }
}
