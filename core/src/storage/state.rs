use anyhow::Result;
use scribe_fhe::CiphertextHandle;
use scribe_paper::{Paper, PaperId, Principal};
use wincode::{SchemaRead, SchemaWrite};

/// Persisted marker for one accepted (paper, reviewer) submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, SchemaRead, SchemaWrite)]
pub struct SubmissionRecord {
    pub paper_id: PaperId,
    pub reviewer: Principal,
    pub submitted_at: u64,
    /// The paper's review count right after this submission
    pub review_index: u64,
}

/// Who controls registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Owned(Principal),
    Renounced,
}

impl Ownership {
    pub fn owner(&self) -> Option<Principal> {
        match self {
            Self::Owned(p) => Some(*p),
            Self::Renounced => None,
        }
    }
}

/// Writes produced by a single ledger transition, committed atomically
#[derive(Debug, Default)]
pub struct LedgerBatch {
    /// Appended to the registration order
    pub new_papers: Vec<Paper>,
    pub paper_updates: Vec<Paper>,
    pub totals: Vec<(PaperId, CiphertextHandle)>,
    pub submissions: Vec<SubmissionRecord>,
    pub ownership: Option<Ownership>,
}

/// Decouples ledger logic from the backing store
pub trait LedgerStore: Send + Sync {
    fn get_paper(&self, id: &PaperId) -> Result<Option<Paper>>;

    /// All papers in registration order
    fn list_papers(&self) -> Result<Vec<Paper>>;

    /// Ids only, same order as `list_papers`
    fn list_paper_ids(&self) -> Result<Vec<PaperId>>;

    fn paper_count(&self) -> Result<u64>;

    fn get_total(&self, id: &PaperId) -> Result<Option<CiphertextHandle>>;

    fn get_submission(
        &self,
        id: &PaperId,
        reviewer: &Principal,
    ) -> Result<Option<SubmissionRecord>>;

    /// `None` until an owner has been recorded
    fn get_ownership(&self) -> Result<Option<Ownership>>;

    /// Apply every write in `batch` or none of them
    fn apply_batch(&self, batch: LedgerBatch) -> Result<()>;
}
