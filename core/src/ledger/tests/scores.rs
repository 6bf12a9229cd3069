use super::*;
use crate::ledger::{LedgerError, LedgerEvent};
use scribe_fhe::InputProof;
use scribe_paper::average_score;

#[test]
fn scores_accumulate_into_total() {
    let h = harness();
    let paper = h.register("zk-rollups");

    h.submit(&reviewer("alice"), paper.id, 7);
    h.submit(&reviewer("bob"), paper.id, 9);

    let stored = h.ledger.registry.get(&paper.id).unwrap();
    assert_eq!(stored.review_count, 2);
    assert_eq!(h.decrypted_total(paper.id), 16);
}

#[test]
fn out_of_range_scores_are_clamped() {
    let h = harness();
    let paper = h.register("zk-rollups");

    h.submit(&reviewer("alice"), paper.id, 12);
    h.submit(&reviewer("bob"), paper.id, 8);

    let sum = h.decrypted_total(paper.id);
    assert_eq!(sum, 18);
    assert_eq!(average_score(sum as u64, 2), 9.0);
}

#[test]
fn second_submission_rejected_regardless_of_payload() {
    let h = harness();
    let paper = h.register("zk-rollups");
    let alice = reviewer("alice");
    h.submit(&alice, paper.id, 5);

    let input = h.fhe.encrypt(1, &alice).unwrap();
    let err = h
        .ledger
        .scores
        .submit(&alice, paper.id, input.handle, &input.proof)
        .unwrap_err();
    assert!(matches!(err, LedgerError::AlreadySubmitted { .. }));
    assert_eq!(err.code(), "ALREADY_SUBMITTED");

    assert_eq!(h.ledger.registry.get(&paper.id).unwrap().review_count, 1);
    assert_eq!(h.decrypted_total(paper.id), 5);
}

#[test]
fn submission_to_unknown_paper_fails() {
    let h = harness();
    let alice = reviewer("alice");
    let input = h.fhe.encrypt(5, &alice).unwrap();

    let err = h
        .ledger
        .scores
        .submit(&alice, PaperId::from_slug("ghost"), input.handle, &input.proof)
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
}

#[test]
fn invalid_proof_changes_nothing() {
    let h = harness();
    let paper = h.register("zk-rollups");
    let alice = reviewer("alice");
    let input = h.fhe.encrypt(5, &alice).unwrap();

    let err = h
        .ledger
        .scores
        .submit(&alice, paper.id, input.handle, &InputProof(vec![0u8; 32]))
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidProof(_)));

    let stored = h.ledger.registry.get(&paper.id).unwrap();
    assert_eq!(stored, paper);
    assert!(!h.ledger.scores.has_submitted(&paper.id, &alice).unwrap());

    // The reviewer can still submit properly afterwards
    h.submit(&alice, paper.id, 5);
    assert_eq!(h.decrypted_total(paper.id), 5);
}

#[test]
fn proof_from_another_reviewer_rejected() {
    let h = harness();
    let paper = h.register("zk-rollups");
    let input = h.fhe.encrypt(5, &reviewer("alice")).unwrap();

    let err = h
        .ledger
        .scores
        .submit(&reviewer("bob"), paper.id, input.handle, &input.proof)
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidProof(_)));
}

#[test]
fn has_submitted_tracks_reviewers() {
    let h = harness();
    let paper = h.register("zk-rollups");
    let alice = reviewer("alice");

    assert!(!h.ledger.scores.has_submitted(&paper.id, &alice).unwrap());
    h.submit(&alice, paper.id, 3);
    assert!(h.ledger.scores.has_submitted(&paper.id, &alice).unwrap());
    assert!(!h
        .ledger
        .scores
        .has_submitted(&paper.id, &reviewer("bob"))
        .unwrap());
    assert!(!h
        .ledger
        .scores
        .has_submitted(&PaperId::from_slug("ghost"), &alice)
        .unwrap());
}

#[test]
fn submission_bumps_updated_at() {
    let h = harness();
    let paper = h.register("zk-rollups");
    let alice = reviewer("alice");

    h.submit(&alice, paper.id, 3);
    let stored = h.ledger.registry.get(&paper.id).unwrap();
    assert!(stored.updated_at > paper.updated_at);

    let record = h.ledger.scores.submission(&paper.id, &alice).unwrap().unwrap();
    assert_eq!(record.submitted_at, stored.updated_at);
    assert_eq!(record.review_index, 1);
}

#[test]
fn receipt_reports_new_count() {
    let h = harness();
    let paper = h.register("zk-rollups");
    let alice = reviewer("alice");
    let input = h.fhe.encrypt(4, &alice).unwrap();
    let mut rx = h.ledger.subscribe();

    let receipt = h
        .ledger
        .scores
        .submit(&alice, paper.id, input.handle, &input.proof)
        .unwrap();
    assert_eq!(receipt.review_count, 1);
    assert_eq!(receipt.reviewer, alice);

    match rx.try_recv().unwrap() {
        LedgerEvent::ScoreSubmitted {
            review_count,
            reviewer,
            ..
        } => {
            assert_eq!(review_count, 1);
            assert_eq!(reviewer, alice);
        }
        other => panic!("unexpected event {:?}", other),
    }
}
