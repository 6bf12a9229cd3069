use super::*;
use crate::ledger::{LedgerError, LedgerEvent};

#[test]
fn register_appends_in_order() {
    let h = harness();
    h.register("zk-rollups");
    h.register("fhe-voting");
    h.register("mpc-auctions");

    let papers = h.ledger.registry.list().unwrap();
    let titles: Vec<_> = papers.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["zk-rollups", "fhe-voting", "mpc-auctions"]);
    assert_eq!(h.ledger.registry.count().unwrap(), 3);
}

#[test]
fn ids_follow_registration_order() {
    let h = harness();
    assert!(h.ledger.registry.ids().unwrap().is_empty());

    let a = h.register("zk-rollups");
    let b = h.register("fhe-voting");
    let c = h.register("mpc-auctions");

    // Metadata updates do not reorder
    h.ledger
        .registry
        .update(&owner(), a.id, metadata("zk-rollups v2"))
        .unwrap();

    assert_eq!(h.ledger.registry.ids().unwrap(), vec![a.id, b.id, c.id]);
}

#[test]
fn registered_paper_starts_empty() {
    let h = harness();
    let paper = h.register("zk-rollups");

    assert_eq!(paper.review_count, 0);
    assert_eq!(paper.created_at, START_MS);
    assert_eq!(paper.updated_at, START_MS);
    assert_eq!(h.ledger.scores.plain_sum(&paper.id).unwrap(), 0);
}

#[test]
fn register_rejects_missing_title_or_track() {
    let h = harness();
    let id = PaperId::from_slug("incomplete");

    let err = h
        .ledger
        .registry
        .register(&owner(), id, PaperMetadata::new("", "Systems", ""))
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidMetadata(_)));

    let err = h
        .ledger
        .registry
        .register(&owner(), id, PaperMetadata::new("Title", "", ""))
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidMetadata(_)));

    assert_eq!(h.ledger.registry.count().unwrap(), 0);
}

#[test]
fn register_rejects_duplicate_id() {
    let h = harness();
    h.register("zk-rollups");

    let err = h
        .ledger
        .registry
        .register(&owner(), PaperId::from_slug("zk-rollups"), metadata("again"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyExists(_)));
    assert_eq!(err.code(), "ALREADY_EXISTS");
    assert_eq!(h.ledger.registry.count().unwrap(), 1);
}

#[test]
fn register_requires_owner() {
    let h = harness();
    let err = h
        .ledger
        .registry
        .register(&reviewer("mallory"), PaperId::from_slug("x"), metadata("x"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotOwner(_)));
    assert!(h.ledger.registry.list().unwrap().is_empty());
}

#[test]
fn update_unknown_paper_fails() {
    let h = harness();
    let err = h
        .ledger
        .registry
        .update(&owner(), PaperId::from_slug("ghost"), metadata("ghost"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
}

#[test]
fn update_replaces_metadata_and_bumps_timestamp() {
    let h = harness();
    let paper = h.register("zk-rollups");

    // Clock has not moved; updated_at must still advance
    let updated = h
        .ledger
        .registry
        .update(
            &owner(),
            paper.id,
            PaperMetadata::new("ZK Rollups, revised", "Systems", "author-2"),
        )
        .unwrap();

    assert_eq!(updated.title, "ZK Rollups, revised");
    assert_eq!(updated.track, "Systems");
    assert_eq!(updated.author_hash, "author-2");
    assert_eq!(updated.created_at, paper.created_at);
    assert!(updated.updated_at > paper.updated_at);

    h.clock.advance(5_000);
    let again = h
        .ledger
        .registry
        .update(&owner(), paper.id, metadata("zk-rollups"))
        .unwrap();
    assert_eq!(again.updated_at, START_MS + 5_000);
    assert_eq!(h.ledger.registry.get(&paper.id).unwrap(), again);
}

#[test]
fn update_keeps_scores() {
    let h = harness();
    let paper = h.register("zk-rollups");
    h.submit(&reviewer("alice"), paper.id, 7);

    let updated = h
        .ledger
        .registry
        .update(&owner(), paper.id, metadata("renamed"))
        .unwrap();
    assert_eq!(updated.review_count, 1);
    assert_eq!(h.decrypted_total(paper.id), 7);
}

#[test]
fn ownership_transfer_moves_registration_rights() {
    let h = harness();
    let carol = reviewer("carol");

    h.ledger
        .registry
        .transfer_ownership(&owner(), carol)
        .unwrap();
    assert_eq!(h.ledger.registry.owner().unwrap(), Some(carol));

    let err = h
        .ledger
        .registry
        .register(&owner(), PaperId::from_slug("a"), metadata("a"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotOwner(_)));

    h.ledger
        .registry
        .register(&carol, PaperId::from_slug("a"), metadata("a"))
        .unwrap();
}

#[test]
fn renounce_disables_registration() {
    let h = harness();
    h.ledger.registry.renounce_ownership(&owner()).unwrap();
    assert_eq!(h.ledger.registry.owner().unwrap(), None);

    let err = h
        .ledger
        .registry
        .register(&owner(), PaperId::from_slug("a"), metadata("a"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotOwner(_)));

    // Re-opening with a configured owner must not resurrect ownership
    assert!(!h.ledger.registry.init_owner(owner()).unwrap());
    assert_eq!(h.ledger.registry.owner().unwrap(), None);
}

#[test]
fn registration_emits_event() {
    let h = harness();
    let mut rx = h.ledger.subscribe();
    let paper = h.register("zk-rollups");

    match rx.try_recv().unwrap() {
        LedgerEvent::PaperRegistered {
            paper_id, title, ..
        } => {
            assert_eq!(paper_id, paper.id);
            assert_eq!(title, "zk-rollups");
        }
        other => panic!("unexpected event {:?}", other),
    }
}
