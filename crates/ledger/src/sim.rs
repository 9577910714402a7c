//! In-memory authoritative attestor.
//!
//! Plays the chain's role for tests and the demo server: it keeps its own
//! per-subject tree, verifies every submitted sibling path against its
//! committed root before applying an update, and serves the committed-root
//! oracle. A path computed against stale local state is rejected exactly
//! the way the on-chain contract would reject it.

use std::collections::HashMap;

use ark_bn254::Fr;
use ark_ff::PrimeField;

use attestor_smt::{PoseidonHasher, SiblingPath, SparseMerkleTree, TreeError};

use crate::boundary::{
    BoundaryError, ChainBoundary, SubjectId, TxReceipt, ADD_TO_BLACKLIST, GET_BLACKLIST_ROOT,
    REMOVE_FROM_BLACKLIST,
};
use crate::ledger::{ABSENT, PRESENT};

/// Authoritative per-subject blacklist state held in memory.
pub struct SimulatedAttestor {
    hasher: PoseidonHasher,
    /// Empty tree of the configured depth, cloned on first touch.
    template: SparseMerkleTree<PoseidonHasher>,
    trees: HashMap<SubjectId, SparseMerkleTree<PoseidonHasher>>,
}

impl SimulatedAttestor {
    /// Create an attestor whose trees all use the given depth.
    pub fn new(depth: usize) -> Result<Self, TreeError> {
        let hasher = PoseidonHasher::new();
        let template = SparseMerkleTree::new(depth, hasher.clone())?;
        Ok(Self {
            hasher,
            template,
            trees: HashMap::new(),
        })
    }

    /// Configured tree depth.
    pub fn depth(&self) -> usize {
        self.template.depth()
    }

    /// Write a leaf without path verification, modeling a writer the local
    /// mirror does not know about.
    pub fn set_leaf(
        &mut self,
        subject: &SubjectId,
        shield_id: u64,
        value: Fr,
    ) -> Result<(), TreeError> {
        self.tree_mut(subject).update_leaf(value, shield_id)
    }

    fn tree(&self, subject: &SubjectId) -> &SparseMerkleTree<PoseidonHasher> {
        self.trees.get(subject).unwrap_or(&self.template)
    }

    fn tree_mut(&mut self, subject: &SubjectId) -> &mut SparseMerkleTree<PoseidonHasher> {
        self.trees
            .entry(*subject)
            .or_insert_with(|| self.template.clone())
    }

    /// Verify a submitted `[shield_id, path...]` update against the current
    /// committed state, then apply it.
    fn apply_update(
        &mut self,
        subject: &SubjectId,
        method: &str,
        args: &[Fr],
    ) -> Result<TxReceipt, BoundaryError> {
        let reject = |reason: &str| BoundaryError::Rejected {
            method: method.to_owned(),
            reason: reason.to_owned(),
        };

        let (head, siblings) = args.split_first().ok_or_else(|| reject("missing shield id"))?;
        let shield_id = fr_to_index(*head).ok_or_else(|| reject("shield id exceeds index space"))?;
        if siblings.len() != self.depth() {
            return Err(reject("sibling path length mismatch"));
        }

        let path = SiblingPath::new(siblings.to_vec());
        let old_leaf = self
            .tree(subject)
            .leaf_value(shield_id)
            .map_err(|_| reject("shield id out of range"))?;
        let committed = self.tree(subject).root();
        if path.compute_root(old_leaf, shield_id, &self.hasher) != committed {
            return Err(reject("sibling path does not match committed root"));
        }

        let value = if method == ADD_TO_BLACKLIST {
            PRESENT
        } else {
            ABSENT
        };
        let tree = self.tree_mut(subject);
        tree.update_leaf(value, shield_id)
            .map_err(|_| reject("shield id out of range"))?;

        Ok(TxReceipt {
            new_root: tree.root(),
        })
    }
}

impl ChainBoundary for SimulatedAttestor {
    fn view_call(
        &self,
        subject: &SubjectId,
        method: &str,
        _args: &[Fr],
    ) -> Result<Fr, BoundaryError> {
        match method {
            GET_BLACKLIST_ROOT => Ok(self.tree(subject).root()),
            other => Err(BoundaryError::UnknownMethod(other.to_owned())),
        }
    }

    fn send_and_wait(
        &mut self,
        subject: &SubjectId,
        method: &str,
        args: &[Fr],
    ) -> Result<TxReceipt, BoundaryError> {
        match method {
            ADD_TO_BLACKLIST | REMOVE_FROM_BLACKLIST => self.apply_update(subject, method, args),
            other => Err(BoundaryError::UnknownMethod(other.to_owned())),
        }
    }
}

/// Decode a field element back into a leaf index. Fails if the value does
/// not fit in 64 bits.
fn fr_to_index(value: Fr) -> Option<u64> {
    let limbs = value.into_bigint().0;
    limbs[1..]
        .iter()
        .all(|limb| *limb == 0)
        .then_some(limbs[0])
}
