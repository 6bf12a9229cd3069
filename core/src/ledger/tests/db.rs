use std::sync::Arc;

use tempfile::TempDir;

use super::{START_MS, metadata, owner, reviewer};
use crate::ledger::{Ledger, LedgerConfig, LedgerError, ManualClock};
use crate::storage::{LedgerStore, RocksDbStore};
use scribe_fhe::{EncryptedValueService, MockCoprocessor};
use scribe_paper::PaperId;

const SEED: &str = "ledger-db-tests";

fn open(dir: &TempDir) -> (Ledger, Arc<MockCoprocessor<RocksDbStore>>) {
    let db = RocksDbStore::open(dir.path()).unwrap();
    let fhe = Arc::new(MockCoprocessor::new(SEED, db.clone()));
    let clock = Arc::new(ManualClock::new(START_MS));
    let ledger =
        Ledger::open(Arc::new(db), fhe.clone(), clock, LedgerConfig::new(owner())).unwrap();
    (ledger, fhe)
}

#[test]
fn state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let id = PaperId::from_slug("zk-rollups");
    let alice = reviewer("alice");

    {
        let (ledger, fhe) = open(&dir);
        ledger
            .registry
            .register(&owner(), id, metadata("zk-rollups"))
            .unwrap();
        ledger
            .registry
            .register(&owner(), PaperId::from_slug("fhe-voting"), metadata("fhe-voting"))
            .unwrap();

        let input = fhe.encrypt(12, &alice).unwrap();
        ledger
            .scores
            .submit(&alice, id, input.handle, &input.proof)
            .unwrap();
    }

    let (ledger, fhe) = open(&dir);
    let papers = ledger.registry.list().unwrap();
    assert_eq!(papers.len(), 2);
    assert_eq!(papers[0].id, id);
    assert_eq!(papers[0].review_count, 1);
    assert_eq!(
        ledger.registry.ids().unwrap(),
        vec![id, PaperId::from_slug("fhe-voting")]
    );
    assert!(ledger.scores.has_submitted(&id, &alice).unwrap());

    // Duplicate check holds across restarts
    let input = fhe.encrypt(3, &alice).unwrap();
    let err = ledger
        .scores
        .submit(&alice, id, input.handle, &input.proof)
        .unwrap_err();
    assert!(matches!(err, LedgerError::AlreadySubmitted { .. }));

    let bob = reviewer("bob");
    let input = fhe.encrypt(8, &bob).unwrap();
    ledger
        .scores
        .submit(&bob, id, input.handle, &input.proof)
        .unwrap();

    assert_eq!(ledger.scores.plain_sum(&id).unwrap(), 18);
}

#[test]
fn ownership_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let carol = reviewer("carol");

    {
        let (ledger, _) = open(&dir);
        ledger.registry.transfer_ownership(&owner(), carol).unwrap();
    }

    // Configured owner is ignored once ownership is recorded
    let (ledger, _) = open(&dir);
    assert_eq!(ledger.registry.owner().unwrap(), Some(carol));
}

#[test]
fn rocksdb_store_counts_papers() {
    let dir = TempDir::new().unwrap();
    let (ledger, _) = open(&dir);
    for slug in ["a", "b", "c"] {
        ledger
            .registry
            .register(&owner(), PaperId::from_slug(slug), metadata(slug))
            .unwrap();
    }
    assert_eq!(ledger.registry.count().unwrap(), 3);

    let empty = TempDir::new().unwrap();
    let db = RocksDbStore::open(empty.path()).unwrap();
    assert_eq!(db.paper_count().unwrap(), 0);
    assert!(db.list_papers().unwrap().is_empty());
}
