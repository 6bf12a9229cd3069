use anyhow::{Context, Result};
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::storage::state::{LedgerBatch, LedgerStore, Ownership, SubmissionRecord};
use scribe_fhe::{CiphertextHandle, CiphertextTable, FheError};
use scribe_paper::{Paper, PaperId, Principal};

const CF_PAPERS: &str = "papers";
const CF_PAPER_ORDER: &str = "paper_order";
const CF_TOTALS: &str = "totals";
const CF_SUBMISSIONS: &str = "submissions";
const CF_META: &str = "meta";
const CF_CIPHERTEXTS: &str = "ciphertexts";

const META_PAPER_COUNT: &[u8] = b"paper_count";
const META_OWNER: &[u8] = b"owner";

/// A thread-safe wrapper around RocksDB.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    /// Serializes batch commits so registration indices stay dense
    commit_lock: Arc<Mutex<()>>,
}

fn submission_key(id: &PaperId, reviewer: &Principal) -> [u8; 64] {
    let mut key = [0u8; 64];
    key[..32].copy_from_slice(id.as_bytes());
    key[32..].copy_from_slice(reviewer.as_bytes());
    key
}

impl RocksDbStore {
    /// Opens the database at the specified path, creating it if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = vec![
            ColumnFamilyDescriptor::new(CF_PAPERS, Options::default()),
            ColumnFamilyDescriptor::new(CF_PAPER_ORDER, Options::default()),
            ColumnFamilyDescriptor::new(CF_TOTALS, Options::default()),
            ColumnFamilyDescriptor::new(CF_SUBMISSIONS, Options::default()),
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
            ColumnFamilyDescriptor::new(CF_CIPHERTEXTS, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, families)
            .map_err(|e| anyhow::anyhow!("Failed to open RocksDB: {}", e))?;

        Ok(Self {
            db: Arc::new(db),
            commit_lock: Arc::new(Mutex::new(())),
        })
    }

    fn stored_paper_count(&self) -> Result<u64> {
        let cf = self.db.cf_handle(CF_META).context("meta CF missing")?;

        match self.db.get_cf(cf, META_PAPER_COUNT)? {
            Some(bytes) => Ok(u64::from_be_bytes(
                bytes
                    .as_slice()
                    .try_into()
                    .context("invalid paper count length")?,
            )),
            None => Ok(0),
        }
    }

    // =========================================================================
    // Ciphertexts
    // =========================================================================

    fn put_ciphertext(&self, handle: &CiphertextHandle, value: u32) -> Result<()> {
        let cf = self
            .db
            .cf_handle(CF_CIPHERTEXTS)
            .context("ciphertexts CF missing")?;
        self.db.put_cf(cf, handle.0, value.to_le_bytes())?;
        Ok(())
    }

    fn get_ciphertext(&self, handle: &CiphertextHandle) -> Result<Option<u32>> {
        let cf = self
            .db
            .cf_handle(CF_CIPHERTEXTS)
            .context("ciphertexts CF missing")?;

        match self.db.get_cf(cf, handle.0)? {
            Some(bytes) => Ok(Some(u32::from_le_bytes(
                bytes
                    .as_slice()
                    .try_into()
                    .context("invalid ciphertext length")?,
            ))),
            None => Ok(None),
        }
    }
}

impl LedgerStore for RocksDbStore {
    fn get_paper(&self, id: &PaperId) -> Result<Option<Paper>> {
        let cf = self.db.cf_handle(CF_PAPERS).context("papers CF missing")?;

        // Paper carries strings, so it is stored as JSON rather than wincode
        match self.db.get_cf(cf, id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn list_papers(&self) -> Result<Vec<Paper>> {
        let cf = self
            .db
            .cf_handle(CF_PAPER_ORDER)
            .context("paper_order CF missing")?;

        let mut papers = Vec::new();
        // Big-endian keys iterate in registration order
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            let id = PaperId(
                value
                    .as_ref()
                    .try_into()
                    .context("invalid paper id length")?,
            );
            let paper = self
                .get_paper(&id)?
                .with_context(|| format!("paper {} indexed but missing", id))?;
            papers.push(paper);
        }

        Ok(papers)
    }

    fn list_paper_ids(&self) -> Result<Vec<PaperId>> {
        let cf = self
            .db
            .cf_handle(CF_PAPER_ORDER)
            .context("paper_order CF missing")?;

        let mut ids = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            ids.push(PaperId(
                value
                    .as_ref()
                    .try_into()
                    .context("invalid paper id length")?,
            ));
        }
        Ok(ids)
    }

    fn paper_count(&self) -> Result<u64> {
        self.stored_paper_count()
    }

    fn get_total(&self, id: &PaperId) -> Result<Option<CiphertextHandle>> {
        let cf = self.db.cf_handle(CF_TOTALS).context("totals CF missing")?;

        match self.db.get_cf(cf, id.as_bytes())? {
            Some(bytes) => Ok(Some(CiphertextHandle(
                bytes
                    .as_slice()
                    .try_into()
                    .context("invalid total handle length")?,
            ))),
            None => Ok(None),
        }
    }

    fn get_submission(
        &self,
        id: &PaperId,
        reviewer: &Principal,
    ) -> Result<Option<SubmissionRecord>> {
        let cf = self
            .db
            .cf_handle(CF_SUBMISSIONS)
            .context("submissions CF missing")?;

        match self.db.get_cf(cf, submission_key(id, reviewer))? {
            Some(bytes) => Ok(Some(wincode::deserialize::<SubmissionRecord>(&bytes)?)),
            None => Ok(None),
        }
    }

    fn get_ownership(&self) -> Result<Option<Ownership>> {
        let cf = self.db.cf_handle(CF_META).context("meta CF missing")?;

        // Empty value marks a renounced ledger
        match self.db.get_cf(cf, META_OWNER)? {
            Some(bytes) if bytes.is_empty() => Ok(Some(Ownership::Renounced)),
            Some(bytes) => Ok(Some(Ownership::Owned(Principal(
                bytes
                    .as_slice()
                    .try_into()
                    .context("invalid owner length")?,
            )))),
            None => Ok(None),
        }
    }

    fn apply_batch(&self, operations: LedgerBatch) -> Result<()> {
        let _guard = self
            .commit_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("commit lock poisoned"))?;

        let mut batch = WriteBatch::default();

        let cf_papers = self.db.cf_handle(CF_PAPERS).context("papers CF missing")?;
        let cf_order = self
            .db
            .cf_handle(CF_PAPER_ORDER)
            .context("paper_order CF missing")?;
        let cf_totals = self.db.cf_handle(CF_TOTALS).context("totals CF missing")?;
        let cf_submissions = self
            .db
            .cf_handle(CF_SUBMISSIONS)
            .context("submissions CF missing")?;
        let cf_meta = self.db.cf_handle(CF_META).context("meta CF missing")?;

        // New registrations
        if !operations.new_papers.is_empty() {
            let mut count = self.stored_paper_count()?;
            for paper in &operations.new_papers {
                batch.put_cf(cf_papers, paper.id.as_bytes(), serde_json::to_vec(paper)?);
                batch.put_cf(cf_order, count.to_be_bytes(), paper.id.as_bytes());
                count += 1;
            }
            batch.put_cf(cf_meta, META_PAPER_COUNT, count.to_be_bytes());
        }

        // Metadata and counter updates
        for paper in &operations.paper_updates {
            batch.put_cf(cf_papers, paper.id.as_bytes(), serde_json::to_vec(paper)?);
        }

        // Encrypted totals
        for (id, handle) in &operations.totals {
            batch.put_cf(cf_totals, id.as_bytes(), handle.0);
        }

        // Submission markers
        for record in &operations.submissions {
            let bytes = wincode::serialize(record)?;
            batch.put_cf(
                cf_submissions,
                submission_key(&record.paper_id, &record.reviewer),
                bytes,
            );
        }

        // Ownership
        match operations.ownership {
            Some(Ownership::Owned(owner)) => batch.put_cf(cf_meta, META_OWNER, owner.as_bytes()),
            Some(Ownership::Renounced) => batch.put_cf(cf_meta, META_OWNER, b""),
            None => {}
        }

        self.db.write(batch)?;
        Ok(())
    }
}

impl CiphertextTable for RocksDbStore {
    fn put(&self, handle: &CiphertextHandle, value: u32) -> Result<(), FheError> {
        self.put_ciphertext(handle, value)
            .map_err(|e| FheError::Storage(e.to_string()))
    }

    fn get(&self, handle: &CiphertextHandle) -> Result<Option<u32>, FheError> {
        self.get_ciphertext(handle)
            .map_err(|e| FheError::Storage(e.to_string()))
    }
}
