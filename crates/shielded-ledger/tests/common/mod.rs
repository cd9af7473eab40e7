//! shared fixtures for ledger integration tests
#![allow(dead_code)]

use shielded_ledger::{
    Address, Blake3Oracle, JoinFields, LedgerConfig, Note, NoteCommitment, Nullifier, Position,
    Proof, ProofVerifier, PublicInputs, SharedFields, ShieldedLedger, SpendingKey, SplitFields,
    TokenData, TransitionRequest, VerifierError,
};

pub const GOVERNOR: Address = Address([0xee; 20]);
pub const TREASURY: Address = Address([0x77; 20]);
pub const ALICE: Address = Address([0x01; 20]);
pub const BOB: Address = Address([0x02; 20]);

pub fn token() -> TokenData {
    TokenData::fungible(Address([0xaa; 20]))
}

/// test proof system: a proof is a digest of its public inputs
pub fn prove(inputs: &PublicInputs) -> Proof {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"shielded-ledger.test-proof");
    for word in inputs.to_words() {
        hasher.update(&word);
    }
    let digest = *hasher.finalize().as_bytes();
    Proof {
        a: [digest, digest],
        ..Default::default()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DigestVerifier;

impl ProofVerifier for DigestVerifier {
    fn verify(&self, proof: &Proof, inputs: &PublicInputs) -> Result<bool, VerifierError> {
        Ok(*proof == prove(inputs))
    }
}

/// verifier that is never reachable
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineVerifier;

impl ProofVerifier for OfflineVerifier {
    fn verify(&self, _: &Proof, _: &PublicInputs) -> Result<bool, VerifierError> {
        Err(VerifierError::Unavailable("offline".into()))
    }
}

pub type TestLedger = ShieldedLedger<Blake3Oracle, DigestVerifier>;

pub fn config(depth: u8, deposit_bps: u16, withdraw_bps: u16) -> LedgerConfig {
    let mut config = LedgerConfig {
        tree_depth: depth,
        governor: GOVERNOR,
        ..Default::default()
    };
    config.fees.deposit_fee_bps = deposit_bps;
    config.fees.withdraw_fee_bps = withdraw_bps;
    config.fees.treasury = TREASURY;
    config
}

pub fn ledger(depth: u8, deposit_bps: u16, withdraw_bps: u16) -> TestLedger {
    ShieldedLedger::new(config(depth, deposit_bps, withdraw_bps), Blake3Oracle, DigestVerifier)
        .expect("valid config")
}

/// attach a valid proof
pub fn signed(request: TransitionRequest) -> TransitionRequest {
    let inputs = PublicInputs::from_request(&Blake3Oracle, &request);
    let proof = prove(&inputs);
    request.with_proof(proof)
}

/// a note owned by `sk`
pub fn note(sk: &SpendingKey, amount: u128, random: u8) -> Note {
    Note::new(sk.owner_key(), amount, token(), [random; 32])
}

/// a note owned by `sk` with fresh blinding
pub fn random_note(sk: &SpendingKey, amount: u128) -> Note {
    Note::new(sk.owner_key(), amount, token(), rand::random::<[u8; 32]>())
}

/// a spent note and where it sits
#[derive(Clone, Copy, Debug)]
pub struct Spend {
    pub note: Note,
    pub tree_number: u32,
    pub position: Position,
}

impl Spend {
    pub fn at(note: Note, tree_number: u32, position: u64) -> Self {
        Self {
            note,
            tree_number,
            position: Position(position),
        }
    }

    pub fn nullifier(&self, sk: &SpendingKey) -> Nullifier {
        self.note
            .nullifier(&Blake3Oracle, sk, self.tree_number, self.position)
    }
}

/// signed join/split against the ledger's current anchor for the tree of
/// the first input
pub fn transfer(
    ledger: &TestLedger,
    sk: &SpendingKey,
    inputs: &[Spend],
    outputs: &[Note],
    shared: SharedFields,
) -> TransitionRequest {
    let tree_number = inputs.first().map(|s| s.tree_number).unwrap_or(0);
    let merkle_root = ledger
        .tree()
        .root_of(tree_number)
        .expect("tree exists");

    signed(TransitionRequest::new(
        Proof::default(),
        shared,
        JoinFields {
            tree_number,
            merkle_root,
            nullifiers: inputs.iter().map(|s| s.nullifier(sk)).collect(),
        },
        SplitFields {
            commitments_out: outputs.iter().map(|n| n.commit(&Blake3Oracle)).collect(),
        },
    ))
}

/// signed request with raw nullifier and commitment bytes
pub fn raw_transfer(ledger: &TestLedger, nullifiers: &[u8], outputs: &[u8]) -> TransitionRequest {
    signed(TransitionRequest::new(
        Proof::default(),
        SharedFields::default(),
        JoinFields {
            tree_number: ledger.current_tree_number(),
            merkle_root: ledger.current_root(),
            nullifiers: nullifiers.iter().map(|b| Nullifier([*b; 32])).collect(),
        },
        SplitFields {
            commitments_out: outputs.iter().map(|b| NoteCommitment([*b; 32])).collect(),
        },
    ))
}

pub fn withdraw(amount: u128, to: Address) -> SharedFields {
    SharedFields {
        withdraw_amount: amount,
        token: token(),
        output_address: to,
        ..Default::default()
    }
}

pub fn deposit(amount: u128) -> SharedFields {
    SharedFields {
        deposit_amount: amount,
        token: token(),
        ..Default::default()
    }
}
