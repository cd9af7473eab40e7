//! proofs and their public inputs
//!
//! the ledger never looks inside a proof. it assembles the public inputs of
//! a request in a fixed order and asks a [`ProofVerifier`] for a verdict.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::commitment::MerkleRoot;
use crate::hash::{encode_u128, encode_u64, Hash, HashOracle};
use crate::note::NoteCommitment;
use crate::nullifier::Nullifier;
use crate::transaction::TransitionRequest;
use crate::value::Address;

/// pairing-style proof: two g1 points and one g2 point
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub a: [Hash; 2],
    pub b: [[Hash; 2]; 2],
    pub c: [Hash; 2],
}

/// verifier failed to reach a verdict
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum VerifierError {
    #[error("no verification key for {nullifiers} inputs and {commitments} outputs")]
    MissingKey { nullifiers: usize, commitments: usize },
    #[error("verifier unavailable: {0}")]
    Unavailable(String),
}

/// public inputs of one transition
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicInputs {
    pub adaptor_contract: Address,
    pub adaptor_parameters: Hash,
    pub deposit_amount: u128,
    pub withdraw_amount: u128,
    pub output_token_field: Hash,
    pub output_address: Address,
    pub tree_number: u32,
    pub merkle_root: MerkleRoot,
    pub nullifiers: Vec<Nullifier>,
    pub commitments: Vec<NoteCommitment>,
}

impl PublicInputs {
    pub fn from_request<H: HashOracle>(hasher: &H, request: &TransitionRequest) -> Self {
        Self {
            adaptor_contract: request.shared.adaptor_contract,
            adaptor_parameters: request.shared.adaptor_parameters,
            deposit_amount: request.shared.deposit_amount,
            withdraw_amount: request.shared.withdraw_amount,
            output_token_field: request.shared.token_field(hasher),
            output_address: request.shared.output_address,
            tree_number: request.join.tree_number,
            merkle_root: request.join.merkle_root,
            nullifiers: request.join.nullifiers.clone(),
            commitments: request.split.commitments_out.clone(),
        }
    }

    /// flatten into words in circuit order
    pub fn to_words(&self) -> Vec<Hash> {
        let mut words = Vec::with_capacity(8 + self.nullifiers.len() + self.commitments.len());
        words.push(self.adaptor_contract.to_word());
        words.push(self.adaptor_parameters);
        words.push(encode_u128(self.deposit_amount));
        words.push(encode_u128(self.withdraw_amount));
        words.push(self.output_token_field);
        words.push(self.output_address.to_word());
        words.push(encode_u64(u64::from(self.tree_number)));
        words.push(self.merkle_root.0);
        words.extend(self.nullifiers.iter().map(|nf| nf.0));
        words.extend(self.commitments.iter().map(|cm| cm.0));
        words
    }
}

/// proof verification oracle
///
/// must be callable from several threads at once
pub trait ProofVerifier: Sync {
    fn verify(&self, proof: &Proof, inputs: &PublicInputs) -> Result<bool, VerifierError>;
}

impl<F> ProofVerifier for F
where
    F: Fn(&Proof, &PublicInputs) -> Result<bool, VerifierError> + Sync,
{
    fn verify(&self, proof: &Proof, inputs: &PublicInputs) -> Result<bool, VerifierError> {
        self(proof, inputs)
    }
}

/// one verifier per circuit shape
///
/// circuits are compiled for a fixed number of nullifiers and commitments,
/// a request whose shape has no key cannot be verified at all
#[derive(Clone, Debug, Default)]
pub struct ShapeKeyedVerifier<V> {
    keys: HashMap<(usize, usize), V>,
}

impl<V: ProofVerifier> ShapeKeyedVerifier<V> {
    pub fn new() -> Self {
        Self {
            keys: HashMap::new(),
        }
    }

    pub fn with_key(mut self, nullifiers: usize, commitments: usize, verifier: V) -> Self {
        self.insert(nullifiers, commitments, verifier);
        self
    }

    /// register or replace the verifier for a shape
    pub fn insert(&mut self, nullifiers: usize, commitments: usize, verifier: V) -> Option<V> {
        self.keys.insert((nullifiers, commitments), verifier)
    }

    pub fn has_key(&self, nullifiers: usize, commitments: usize) -> bool {
        self.keys.contains_key(&(nullifiers, commitments))
    }
}

impl<V: ProofVerifier> ProofVerifier for ShapeKeyedVerifier<V> {
    fn verify(&self, proof: &Proof, inputs: &PublicInputs) -> Result<bool, VerifierError> {
        let nullifiers = inputs.nullifiers.len();
        let commitments = inputs.commitments.len();
        match self.keys.get(&(nullifiers, commitments)) {
            Some(verifier) => verifier.verify(proof, inputs),
            None => Err(VerifierError::MissingKey {
                nullifiers,
                commitments,
            }),
        }
    }
}
