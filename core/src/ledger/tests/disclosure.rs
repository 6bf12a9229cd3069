use super::*;
use crate::ledger::{Audience, DisclosurePolicy, LedgerError};
use scribe_fhe::DisclosurePurpose;

#[test]
fn disclosure_requires_scores() {
    let h = harness();
    let paper = h.register("zk-rollups");
    let carol = reviewer("carol");

    let err = h
        .ledger
        .disclosure
        .prepare_average(&carol, paper.id)
        .unwrap_err();
    assert!(matches!(err, LedgerError::NoScoresYet(_)));

    let err = h
        .ledger
        .disclosure
        .share_total(&carol, paper.id)
        .unwrap_err();
    assert!(matches!(err, LedgerError::NoScoresYet(_)));
}

#[test]
fn disclosure_of_unknown_paper_fails() {
    let h = harness();
    let err = h
        .ledger
        .disclosure
        .prepare_average(&reviewer("carol"), PaperId::from_slug("ghost"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
}

#[test]
fn prepare_average_grants_requester() {
    let h = harness();
    let paper = h.register("zk-rollups");
    h.submit(&reviewer("alice"), paper.id, 12);
    h.submit(&reviewer("bob"), paper.id, 8);

    let carol = reviewer("carol");
    let disclosure = h
        .ledger
        .disclosure
        .prepare_average(&carol, paper.id)
        .unwrap();
    assert_eq!(disclosure.review_count, 2);
    assert_eq!(disclosure.authorization.grantee, carol);
    assert_eq!(
        disclosure.authorization.purpose,
        DisclosurePurpose::FinalScore
    );

    // Someone else cannot use carol's grant
    assert!(
        h.fhe
            .decrypt(&disclosure.authorization, &reviewer("dave"))
            .is_err()
    );

    let sum = h.fhe.decrypt(&disclosure.authorization, &carol).unwrap();
    assert_eq!(sum, 18);

    // Single use
    assert!(h.fhe.decrypt(&disclosure.authorization, &carol).is_err());

    // A fresh request yields a fresh grant
    let again = h
        .ledger
        .disclosure
        .prepare_average(&carol, paper.id)
        .unwrap();
    assert_ne!(again.authorization.token, disclosure.authorization.token);
    assert_eq!(h.fhe.decrypt(&again.authorization, &carol).unwrap(), 18);
}

#[test]
fn disclosure_does_not_change_state() {
    let h = harness();
    let paper = h.register("zk-rollups");
    h.submit(&reviewer("alice"), paper.id, 6);
    let before = h.ledger.registry.get(&paper.id).unwrap();

    h.ledger
        .disclosure
        .share_total(&reviewer("carol"), paper.id)
        .unwrap();

    assert_eq!(h.ledger.registry.get(&paper.id).unwrap(), before);
}

#[test]
fn unredeemed_grants_stay_bounded() {
    let h = harness();
    let paper = h.register("zk-rollups");
    h.submit(&reviewer("alice"), paper.id, 11);

    let carol = reviewer("carol");
    let mut last = None;
    for _ in 0..1_000 {
        last = Some(h.ledger.disclosure.share_total(&carol, paper.id).unwrap());
    }
    assert_eq!(h.fhe.outstanding_grants(), 1);

    // A different purpose or requester holds its own grant
    h.ledger
        .disclosure
        .prepare_average(&carol, paper.id)
        .unwrap();
    h.ledger
        .disclosure
        .share_total(&reviewer("dave"), paper.id)
        .unwrap();
    assert_eq!(h.fhe.outstanding_grants(), 3);

    let last = last.unwrap();
    assert_eq!(h.fhe.decrypt(&last.authorization, &carol).unwrap(), 11);
    assert_eq!(h.fhe.outstanding_grants(), 2);
}

#[test]
fn owner_only_audience() {
    let mut config = LedgerConfig::new(owner());
    config.disclosure = DisclosurePolicy {
        final_score: Audience::Owner,
        share_total: Audience::Anyone,
    };
    let h = harness_with(config);
    let paper = h.register("zk-rollups");
    h.submit(&reviewer("alice"), paper.id, 4);

    let err = h
        .ledger
        .disclosure
        .prepare_average(&reviewer("carol"), paper.id)
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotOwner(_)));
    assert_eq!(err.code(), "NOT_OWNER");

    h.ledger
        .disclosure
        .prepare_average(&owner(), paper.id)
        .unwrap();
    h.ledger
        .disclosure
        .share_total(&reviewer("carol"), paper.id)
        .unwrap();
}
