//! commitment tree
//!
//! fixed-depth incremental merkle tree of note commitments. appends go
//! through a frontier (the filled left subtree at each level) and absent
//! siblings use a per-level empty-subtree table computed once from the hash
//! oracle, so every root is defined even for a partially filled tree.
//!
//! when the active tree cannot take a batch, a new tree instance is opened;
//! earlier instances are sealed and keep their final root.

use core::fmt;
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::hash::{Hash, HashOracle};
use crate::note::NoteCommitment;
use crate::nullifier::Position;

/// deepest supported tree
pub const MAX_TREE_DEPTH: u8 = 32;

/// merkle root of one commitment tree
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MerkleRoot(pub Hash);

impl MerkleRoot {
    pub fn to_bytes(&self) -> Hash {
        self.0
    }

    pub fn from_bytes(bytes: Hash) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for MerkleRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// merkle inclusion proof
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleProof {
    /// sibling hashes from leaf to root
    pub siblings: Vec<Hash>,
    /// position of the leaf
    pub position: Position,
}

impl MerkleProof {
    /// verify that commitment is in tree with given root
    pub fn verify<H: HashOracle>(
        &self,
        hasher: &H,
        commitment: &NoteCommitment,
        root: &MerkleRoot,
    ) -> bool {
        let mut current = commitment.0;
        let mut pos = self.position.0;

        for sibling in &self.siblings {
            current = if pos & 1 == 0 {
                hasher.hash_pair(&current, sibling)
            } else {
                hasher.hash_pair(sibling, &current)
            };
            pos >>= 1;
        }

        pos == 0 && current == root.0
    }
}

/// where an insertion landed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Insertion {
    /// tree holding the first inserted leaf
    pub tree_number: u32,
    /// position of the first inserted leaf
    pub start_position: Position,
    /// number of leaves inserted
    pub count: usize,
    /// root of the active tree after the insertion
    pub root: MerkleRoot,
}

/// append-only commitment tree with tree-instance rollover
#[derive(Clone, Debug)]
pub struct CommitmentTree<H> {
    hasher: H,
    depth: u8,
    /// zeros[l] = root of an empty subtree of height l
    zeros: Vec<Hash>,
    /// filled left node per level of the active tree
    frontier: Vec<Hash>,
    tree_number: u32,
    next_index: u64,
    root: MerkleRoot,
    /// final roots of sealed trees, indexed by tree number
    sealed_roots: Vec<MerkleRoot>,
    /// witness cache: every leaf of every tree instance
    ///
    /// roots only need the frontier, this grows with the whole history and
    /// exists so [`CommitmentTree::witness`] can serve any note
    leaves: Vec<Vec<NoteCommitment>>,
    /// earlier roots of the active tree, newest last
    recent_roots: VecDeque<MerkleRoot>,
    root_history: usize,
}

impl<H: HashOracle> CommitmentTree<H> {
    /// create empty tree number 0 with given depth
    ///
    /// panics if depth is outside 1..=32; [`crate::LedgerConfig::validate`] checks this
    pub fn new(hasher: H, depth: u8) -> Self {
        assert!(
            depth > 0 && depth <= MAX_TREE_DEPTH,
            "tree depth must be in 1..={}",
            MAX_TREE_DEPTH
        );

        let mut zeros = Vec::with_capacity(usize::from(depth) + 1);
        zeros.push(hasher.empty_leaf());
        for level in 0..usize::from(depth) {
            let below = zeros[level];
            zeros.push(hasher.hash_pair(&below, &below));
        }

        let frontier = zeros[..usize::from(depth)].to_vec();
        let root = MerkleRoot(zeros[usize::from(depth)]);

        Self {
            hasher,
            depth,
            zeros,
            frontier,
            tree_number: 0,
            next_index: 0,
            root,
            sealed_roots: Vec::new(),
            leaves: vec![Vec::new()],
            recent_roots: VecDeque::new(),
            root_history: 0,
        }
    }

    /// keep the last `window` roots of the active tree acceptable as anchors
    pub fn with_root_history(mut self, window: usize) -> Self {
        self.root_history = window;
        self
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// leaves per tree instance
    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    /// root of an empty tree of this depth
    pub fn empty_root(&self) -> MerkleRoot {
        MerkleRoot(self.zeros[usize::from(self.depth)])
    }

    /// latest root of the active tree
    pub fn current_root(&self) -> MerkleRoot {
        self.root
    }

    pub fn current_tree_number(&self) -> u32 {
        self.tree_number
    }

    /// next free leaf index in the active tree
    pub fn next_free_index(&self) -> u64 {
        self.next_index
    }

    /// leaves left in the active tree
    pub fn remaining(&self) -> u64 {
        self.capacity() - self.next_index
    }

    /// latest root of `tree_number`: the live root for the active tree,
    /// the final root for a sealed one
    pub fn root_of(&self, tree_number: u32) -> Option<MerkleRoot> {
        if tree_number == self.tree_number {
            return Some(self.root);
        }
        self.sealed_roots.get(tree_number as usize).copied()
    }

    /// whether `root` is an acceptable anchor for `tree_number`
    pub fn is_known_root(&self, tree_number: u32, root: &MerkleRoot) -> bool {
        if self.root_of(tree_number) == Some(*root) {
            return true;
        }
        tree_number == self.tree_number && self.recent_roots.contains(root)
    }

    /// leaves of one tree instance, in insertion order
    pub fn leaves(&self, tree_number: u32) -> Option<&[NoteCommitment]> {
        self.leaves.get(tree_number as usize).map(Vec::as_slice)
    }

    /// append commitments in order and return where they landed
    ///
    /// a batch that does not fit in the active tree opens a new tree so the
    /// batch stays in one instance; a batch larger than a whole tree is
    /// split over fresh instances.
    pub fn insert_leaves(&mut self, commitments: &[NoteCommitment]) -> Insertion {
        if commitments.is_empty() {
            return Insertion {
                tree_number: self.tree_number,
                start_position: Position(self.next_index),
                count: 0,
                root: self.root,
            };
        }

        if commitments.len() as u64 > self.remaining() {
            self.open_new_tree();
        }

        let tree_number = self.tree_number;
        let start_position = Position(self.next_index);

        for commitment in commitments {
            if self.next_index == self.capacity() {
                self.open_new_tree();
            }
            self.append(*commitment);
        }

        Insertion {
            tree_number,
            start_position,
            count: commitments.len(),
            root: self.root,
        }
    }

    fn append(&mut self, commitment: NoteCommitment) {
        if self.root_history > 0 {
            if self.recent_roots.len() == self.root_history {
                self.recent_roots.pop_front();
            }
            self.recent_roots.push_back(self.root);
        }

        let mut index = self.next_index;
        let mut node = commitment.0;
        for level in 0..usize::from(self.depth) {
            node = if index & 1 == 0 {
                self.frontier[level] = node;
                self.hasher.hash_pair(&node, &self.zeros[level])
            } else {
                self.hasher.hash_pair(&self.frontier[level], &node)
            };
            index >>= 1;
        }

        self.root = MerkleRoot(node);
        self.next_index += 1;
        self.leaves[self.tree_number as usize].push(commitment);
    }

    fn open_new_tree(&mut self) {
        if self.next_index == 0 {
            return;
        }

        self.sealed_roots.push(self.root);
        self.tree_number += 1;
        self.next_index = 0;
        self.frontier = self.zeros[..usize::from(self.depth)].to_vec();
        self.root = self.empty_root();
        self.recent_roots.clear();
        self.leaves.push(Vec::new());

        info!(
            tree_number = self.tree_number,
            sealed_root = %self.sealed_roots[self.sealed_roots.len() - 1],
            "opened new commitment tree"
        );
    }

    /// inclusion proof for the leaf at `position` of `tree_number`,
    /// against that tree's latest root
    ///
    /// rebuilt from the cached leaves, so sealed trees are served too
    pub fn witness(&self, tree_number: u32, position: Position) -> Option<MerkleProof> {
        let leaves = self.leaves(tree_number)?;
        let pos = usize::try_from(position.0).ok()?;
        if pos >= leaves.len() {
            return None;
        }

        let mut siblings = Vec::with_capacity(usize::from(self.depth));
        let mut level: Vec<Hash> = leaves.iter().map(|c| c.0).collect();
        let mut current_pos = pos;

        for height in 0..usize::from(self.depth) {
            // pad to even length with the empty subtree of this height
            if level.len() % 2 == 1 {
                level.push(self.zeros[height]);
            }

            siblings.push(level[current_pos ^ 1]);

            level = level
                .chunks(2)
                .map(|pair| self.hasher.hash_pair(&pair[0], &pair[1]))
                .collect();
            current_pos /= 2;
        }

        Some(MerkleProof { siblings, position })
    }
}
