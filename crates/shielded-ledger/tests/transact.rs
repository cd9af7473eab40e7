//! Integration tests for batched transact
//!
//! Covers the all-or-nothing contract: every rejection leaves the tree,
//! the nullifier ledger, the event log and token balances untouched.

mod common;

use anyhow::Result;
use common::*;
use shielded_ledger::{
    Blake3Oracle, CommitmentTree, InMemoryTokens, LedgerConfig, LedgerError, NoteCommitment,
    Nullifier, Position, ShapeKeyedVerifier, ShieldedLedger, SpendingKey,
};

fn leaves(bytes: &[u8]) -> Vec<NoteCommitment> {
    bytes.iter().map(|b| NoteCommitment([*b; 32])).collect()
}

/// snapshot of everything a rejected batch must not touch
fn snapshot(ledger: &TestLedger) -> (shielded_ledger::MerkleRoot, u32, u64, usize, usize) {
    (
        ledger.current_root(),
        ledger.current_tree_number(),
        ledger.next_free_index(),
        ledger.nullifier_count(),
        ledger.events().len(),
    )
}

#[test]
fn test_single_request_root_matches_replay() -> Result<()> {
    let mut ledger = ledger(16, 0, 0);
    let mut tokens = InMemoryTokens::new();

    let request = raw_transfer(&ledger, &[1], &[10, 11]);
    let receipt = ledger.transact(ALICE, &[request], &mut tokens)?;

    let mut replay = CommitmentTree::new(Blake3Oracle, 16);
    replay.insert_leaves(&leaves(&[10, 11]));

    assert_eq!(receipt.root, replay.current_root());
    assert_eq!(ledger.current_root(), replay.current_root());
    assert_eq!(receipt.tree_number, 0);
    assert_eq!(receipt.start_position, Position(0));
    assert_eq!(receipt.commitments, 2);
    assert_eq!(receipt.nullifiers, 1);
    assert_eq!(receipt.treasury_fees, 0);
    Ok(())
}

#[test]
fn test_two_spends_commit_in_request_order() -> Result<()> {
    let mut ledger = ledger(16, 0, 0);
    let mut tokens = InMemoryTokens::new();

    let first = raw_transfer(&ledger, &[1], &[10]);
    let second = raw_transfer(&ledger, &[2], &[20, 21]);
    ledger.transact(ALICE, &[first, second], &mut tokens)?;

    assert_eq!(ledger.tree().leaves(0).unwrap(), leaves(&[10, 20, 21]).as_slice());
    assert!(ledger.is_nullified(&Nullifier([1; 32])));
    assert!(ledger.is_nullified(&Nullifier([2; 32])));
    assert_eq!(ledger.next_free_index(), 3);

    let mut replay = CommitmentTree::new(Blake3Oracle, 16);
    replay.insert_leaves(&leaves(&[10, 20, 21]));
    assert_eq!(ledger.current_root(), replay.current_root());
    Ok(())
}

#[test]
fn test_duplicate_nullifier_in_batch_mutates_nothing() {
    let mut ledger = ledger(16, 0, 0);
    let mut tokens = InMemoryTokens::new();
    let before = snapshot(&ledger);

    let first = raw_transfer(&ledger, &[1], &[10]);
    let second = raw_transfer(&ledger, &[1], &[20]);

    assert_eq!(
        ledger.transact(ALICE, &[first, second], &mut tokens),
        Err(LedgerError::NullifierConflict {
            index: 1,
            nullifier: Nullifier([1; 32])
        })
    );
    assert_eq!(snapshot(&ledger), before);
    assert!(!ledger.is_nullified(&Nullifier([1; 32])));

    // repeated inside a single request
    let repeated = raw_transfer(&ledger, &[3, 3], &[10]);
    assert_eq!(
        ledger.transact(ALICE, &[repeated], &mut tokens),
        Err(LedgerError::NullifierConflict {
            index: 0,
            nullifier: Nullifier([3; 32])
        })
    );
    assert_eq!(snapshot(&ledger), before);
}

#[test]
fn test_reused_nullifier_after_spend() -> Result<()> {
    let mut ledger = ledger(16, 0, 0);
    let mut tokens = InMemoryTokens::new();

    let spend = raw_transfer(&ledger, &[1], &[10]);
    ledger.transact(ALICE, &[spend], &mut tokens)?;
    let before = snapshot(&ledger);

    let respend = raw_transfer(&ledger, &[1], &[30]);
    assert_eq!(
        ledger.transact(ALICE, &[respend], &mut tokens),
        Err(LedgerError::NullifierConflict {
            index: 0,
            nullifier: Nullifier([1; 32])
        })
    );
    assert_eq!(snapshot(&ledger), before);
    Ok(())
}

#[test]
fn test_stale_root_rejected() -> Result<()> {
    let mut ledger = ledger(16, 0, 0);
    let mut tokens = InMemoryTokens::new();
    let genesis_root = ledger.current_root();

    let late = raw_transfer(&ledger, &[2], &[20]);
    ledger.transact(ALICE, &[raw_transfer(&ledger, &[1], &[10])], &mut tokens)?;

    assert_eq!(
        ledger.transact(ALICE, &[late], &mut tokens),
        Err(LedgerError::StaleRoot {
            index: 0,
            tree_number: 0,
            expected: ledger.current_root(),
            got: genesis_root,
        })
    );
    Ok(())
}

#[test]
fn test_stale_root_against_sealed_tree() -> Result<()> {
    let mut ledger = ledger(2, 0, 0);
    let mut tokens = InMemoryTokens::new();

    ledger.transact(ALICE, &[raw_transfer(&ledger, &[1], &[10])], &mut tokens)?;
    let early_root = ledger.current_root();
    ledger.transact(ALICE, &[raw_transfer(&ledger, &[2], &[11, 12])], &mut tokens)?;
    let sealed_root = ledger.current_root();
    ledger.transact(ALICE, &[raw_transfer(&ledger, &[3], &[20, 21])], &mut tokens)?;
    assert_eq!(ledger.current_tree_number(), 1);
    let before = snapshot(&ledger);

    // only the final root of a sealed tree is an anchor
    let mut old = raw_transfer(&ledger, &[4], &[30]);
    old.join.tree_number = 0;
    old.join.merkle_root = early_root;
    assert_eq!(
        ledger.transact(ALICE, &[signed(old)], &mut tokens),
        Err(LedgerError::StaleRoot {
            index: 0,
            tree_number: 0,
            expected: sealed_root,
            got: early_root,
        })
    );
    assert_eq!(snapshot(&ledger), before);
    assert!(!ledger.is_nullified(&Nullifier([4; 32])));
    Ok(())
}

#[test]
fn test_root_produced_mid_batch_rejected() {
    let mut ledger = ledger(16, 0, 0);
    let mut tokens = InMemoryTokens::new();
    let before = snapshot(&ledger);

    let first = raw_transfer(&ledger, &[1], &[10]);

    // anchor on the root the first request would produce
    let mut preview = ledger.tree().clone();
    preview.insert_leaves(&leaves(&[10]));
    let mut second = raw_transfer(&ledger, &[2], &[20]);
    second.join.merkle_root = preview.current_root();
    let second = signed(second);

    assert!(matches!(
        ledger.transact(ALICE, &[first, second], &mut tokens),
        Err(LedgerError::StaleRoot { index: 1, .. })
    ));
    assert_eq!(snapshot(&ledger), before);
}

#[test]
fn test_invalid_proof_rejects_whole_batch() {
    let mut ledger = ledger(16, 0, 0);
    let mut tokens = InMemoryTokens::new();
    let before = snapshot(&ledger);

    let good = raw_transfer(&ledger, &[1], &[10]);

    // public inputs changed after proving
    let mut tampered = raw_transfer(&ledger, &[2], &[20]);
    tampered.split.commitments_out[0] = NoteCommitment([21; 32]);

    assert_eq!(
        ledger.transact(ALICE, &[good.clone(), tampered], &mut tokens),
        Err(LedgerError::ProofInvalid { index: 1 })
    );

    let mut forged = good;
    forged.proof.c[0] = [1u8; 32];
    assert_eq!(
        ledger.transact(ALICE, &[forged], &mut tokens),
        Err(LedgerError::ProofInvalid { index: 0 })
    );

    assert_eq!(snapshot(&ledger), before);
}

#[test]
fn test_verifier_unavailable_aborts() {
    let mut offline =
        ShieldedLedger::new(config(16, 0, 0), Blake3Oracle, OfflineVerifier).expect("valid config");
    let reference = ledger(16, 0, 0);
    let mut tokens = InMemoryTokens::new();

    let request = raw_transfer(&reference, &[1], &[10]);
    assert!(matches!(
        offline.transact(ALICE, &[request], &mut tokens),
        Err(LedgerError::VerifierUnavailable { index: 0, .. })
    ));
    assert_eq!(offline.current_root(), reference.current_root());
    assert_eq!(offline.nullifier_count(), 0);
}

#[test]
fn test_missing_verification_key_aborts() -> Result<()> {
    let verifier = ShapeKeyedVerifier::new().with_key(1, 1, DigestVerifier);
    let mut keyed = ShieldedLedger::new(config(16, 0, 0), Blake3Oracle, verifier)?;
    let mut reference = ledger(16, 0, 0);
    let mut tokens = InMemoryTokens::new();

    // a shape with a key goes through
    let first = raw_transfer(&reference, &[1], &[10]);
    keyed.transact(ALICE, &[first.clone()], &mut tokens)?;
    reference.transact(ALICE, &[first], &mut tokens)?;
    assert_eq!(keyed.current_root(), reference.current_root());

    let two_outputs = raw_transfer(&reference, &[2], &[20, 21]);
    match keyed.transact(ALICE, &[two_outputs], &mut tokens) {
        Err(LedgerError::VerifierUnavailable { index: 0, reason }) => {
            assert!(reason.contains("1 inputs and 2 outputs"), "{}", reason);
        }
        other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(keyed.current_root(), reference.current_root());
    assert_eq!(keyed.nullifier_count(), 1);
    assert_eq!(keyed.next_free_index(), 1);
    Ok(())
}

#[test]
fn test_full_tree_opens_next_tree() -> Result<()> {
    let mut ledger = ledger(2, 0, 0);
    let mut tokens = InMemoryTokens::new();

    ledger.transact(ALICE, &[raw_transfer(&ledger, &[1], &[10, 11, 12])], &mut tokens)?;
    let sealed_root = ledger.current_root();

    // two outputs do not fit in the last free slot
    let receipt = ledger.transact(ALICE, &[raw_transfer(&ledger, &[2], &[20, 21])], &mut tokens)?;
    assert_eq!(receipt.tree_number, 1);
    assert_eq!(receipt.start_position, Position(0));
    assert_eq!(ledger.current_tree_number(), 1);
    assert_eq!(ledger.next_free_index(), 2);
    assert_eq!(ledger.tree().root_of(0), Some(sealed_root));

    // notes in the sealed tree stay spendable against its final root
    let mut old = raw_transfer(&ledger, &[3], &[30]);
    old.join.tree_number = 0;
    old.join.merkle_root = sealed_root;
    ledger.transact(ALICE, &[signed(old)], &mut tokens)?;
    assert_eq!(ledger.next_free_index(), 3);
    Ok(())
}

#[test]
fn test_root_history_accepts_recent_anchor() -> Result<()> {
    let config = LedgerConfig {
        root_history: 4,
        ..config(16, 0, 0)
    };
    let mut ledger = ShieldedLedger::new(config, Blake3Oracle, DigestVerifier)?;
    let mut tokens = InMemoryTokens::new();

    let early = raw_transfer(&ledger, &[2], &[20]);
    ledger.transact(ALICE, &[raw_transfer(&ledger, &[1], &[10])], &mut tokens)?;
    ledger.transact(ALICE, &[early], &mut tokens)?;
    assert_eq!(ledger.next_free_index(), 2);
    Ok(())
}

#[test]
fn test_failed_transfer_mutates_nothing() {
    let mut ledger = ledger(16, 25, 25);
    let mut tokens = InMemoryTokens::new();
    let sk = SpendingKey::from_phrase("alice", "");
    tokens.mint(token(), ALICE, 10);
    let before = snapshot(&ledger);

    let request = transfer(
        &ledger,
        &sk,
        &[Spend::at(note(&sk, 0, 9), 0, 0)],
        &[note(&sk, 10_000, 3)],
        deposit(10_000),
    );
    assert!(matches!(
        ledger.transact(ALICE, &[request], &mut tokens),
        Err(LedgerError::TokenTransferFailed { index: 0, .. })
    ));
    assert_eq!(snapshot(&ledger), before);
    assert_eq!(tokens.balance_of(&token(), ALICE), 10);
}

#[test]
fn test_failed_fee_payout_is_compensated() {
    let mut ledger = ledger(16, 25, 25);
    let mut tokens = InMemoryTokens::new();
    let sk = SpendingKey::from_phrase("alice", "");
    tokens.mint(token(), ALICE, 10_025);
    tokens.reject(TREASURY);
    let before = snapshot(&ledger);

    let request = transfer(
        &ledger,
        &sk,
        &[Spend::at(note(&sk, 0, 9), 0, 0)],
        &[note(&sk, 10_000, 3)],
        deposit(10_000),
    );
    assert!(matches!(
        ledger.transact(ALICE, &[request], &mut tokens),
        Err(LedgerError::TokenTransferFailed { index: 0, .. })
    ));

    assert_eq!(snapshot(&ledger), before);
    assert_eq!(tokens.balance_of(&token(), ALICE), 10_025);
    assert_eq!(tokens.pool_balance(&token()), 0);
}
