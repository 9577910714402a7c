//! Per-subject blacklist state and the consistency guard.

use std::collections::{HashMap, HashSet};

use ark_bn254::Fr;
use ark_ff::MontFp;
use thiserror::Error;
use tracing::{debug, warn};

use attestor_smt::{FieldHasher, PoseidonHasher, SiblingPath, SparseMerkleTree, TreeError};

use crate::boundary::{
    BoundaryError, ChainBoundary, SubjectId, ADD_TO_BLACKLIST, REMOVE_FROM_BLACKLIST,
};

/// Leaf value marking a shield id as not blacklisted.
pub const ABSENT: Fr = MontFp!("0");

/// Leaf value marking a shield id as blacklisted.
pub const PRESENT: Fr = MontFp!("1");

/// Errors surfaced by ledger operations.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The local tree no longer matches what the authority has committed.
    /// Never resolved automatically; the caller decides how to recover.
    #[error("root mismatch for subject {subject}: local {local}, committed {committed}")]
    RootMismatch {
        subject: SubjectId,
        local: Fr,
        committed: Fr,
    },
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Boundary(#[from] BoundaryError),
}

/// Membership set kept in lock-step with its tree: an id is in `members`
/// iff the tree leaf at that index is `PRESENT`.
struct SubjectState<H: FieldHasher> {
    members: HashSet<u64>,
    tree: SparseMerkleTree<H>,
}

/// Locally-computed mirror of per-subject on-chain blacklists.
///
/// Each subject owns a membership set plus a sparse Merkle tree; the pair is
/// created lazily on first touch and mutated only together. The local tree
/// is a cache of the authority's state, so every public operation first
/// re-validates the local root against the committed one and fails with
/// [`LedgerError::RootMismatch`] on divergence.
///
/// One logical owner per instance: mutating calls take `&mut self` and no
/// internal locking is provided. Within a single add/remove, the external
/// state-changing call completes before any local mutation, so local state
/// may lag the authority but never lead it.
pub struct BlacklistLedger<C: ChainBoundary, H: FieldHasher + Clone = PoseidonHasher> {
    chain: C,
    /// Empty tree of the configured depth, cloned on first touch of a
    /// subject. Constructing it up front also validates the depth.
    template: SparseMerkleTree<H>,
    subjects: HashMap<SubjectId, SubjectState<H>>,
}

impl<C: ChainBoundary> BlacklistLedger<C, PoseidonHasher> {
    /// Ledger with the default Poseidon hasher.
    ///
    /// The depth must match the authority's configured depth exactly; a
    /// mismatch surfaces as persistent root-mismatch failures.
    pub fn new(chain: C, depth: usize) -> Result<Self, LedgerError> {
        Self::with_hasher(chain, depth, PoseidonHasher::new())
    }
}

impl<C: ChainBoundary, H: FieldHasher + Clone> BlacklistLedger<C, H> {
    /// Ledger with a caller-supplied hasher.
    pub fn with_hasher(chain: C, depth: usize, hasher: H) -> Result<Self, LedgerError> {
        let template = SparseMerkleTree::new(depth, hasher)?;
        Ok(Self {
            chain,
            template,
            subjects: HashMap::new(),
        })
    }

    /// Configured tree depth.
    pub fn depth(&self) -> usize {
        self.template.depth()
    }

    /// Access the underlying chain boundary.
    pub fn chain(&self) -> &C {
        &self.chain
    }

    /// Mutable access to the underlying chain boundary.
    pub fn chain_mut(&mut self) -> &mut C {
        &mut self.chain
    }

    /// Blacklist a shield id for a subject.
    ///
    /// Submits the current sibling path to the authority first; only a
    /// durably completed call is mirrored into the local tree and set. Any
    /// boundary failure aborts with no local mutation.
    pub fn add_to_blacklist(
        &mut self,
        subject: &SubjectId,
        shield_id: u64,
    ) -> Result<(), LedgerError> {
        self.submit_update(subject, shield_id, PRESENT)
    }

    /// Remove a shield id from a subject's blacklist.
    pub fn remove_from_blacklist(
        &mut self,
        subject: &SubjectId,
        shield_id: u64,
    ) -> Result<(), LedgerError> {
        self.submit_update(subject, shield_id, ABSENT)
    }

    /// The currently blacklisted shield ids for a subject.
    pub fn blacklist(&mut self, subject: &SubjectId) -> Result<HashSet<u64>, LedgerError> {
        self.assert_consistent_root(subject)?;
        Ok(self.subject_state(subject).members.clone())
    }

    /// Whether a shield id is blacklisted for a subject.
    pub fn is_blacklisted(
        &mut self,
        subject: &SubjectId,
        shield_id: u64,
    ) -> Result<bool, LedgerError> {
        self.assert_consistent_root(subject)?;
        Ok(self.subject_state(subject).members.contains(&shield_id))
    }

    /// The local root for a subject, validated against the committed one.
    pub fn root(&mut self, subject: &SubjectId) -> Result<Fr, LedgerError> {
        self.assert_consistent_root(subject)?;
        Ok(self.subject_state(subject).tree.root())
    }

    /// Sibling path for a shield id, validated against the committed root.
    pub fn sibling_path(
        &mut self,
        subject: &SubjectId,
        shield_id: u64,
    ) -> Result<SiblingPath, LedgerError> {
        self.assert_consistent_root(subject)?;
        Ok(self.subject_state(subject).tree.sibling_path(shield_id)?)
    }

    /// Sibling paths for several shield ids, validating the root once.
    pub fn sibling_paths(
        &mut self,
        subject: &SubjectId,
        shield_ids: &[u64],
    ) -> Result<Vec<SiblingPath>, LedgerError> {
        self.assert_consistent_root(subject)?;
        let state = self.subject_state(subject);
        shield_ids
            .iter()
            .map(|id| state.tree.sibling_path(*id).map_err(LedgerError::from))
            .collect()
    }

    /// Shared write path for add and remove.
    fn submit_update(
        &mut self,
        subject: &SubjectId,
        shield_id: u64,
        value: Fr,
    ) -> Result<(), LedgerError> {
        self.assert_consistent_root(subject)?;

        let path = self.subject_state(subject).tree.sibling_path(shield_id)?;
        let method = if value == ABSENT {
            REMOVE_FROM_BLACKLIST
        } else {
            ADD_TO_BLACKLIST
        };

        let mut args = Vec::with_capacity(path.depth() + 1);
        args.push(Fr::from(shield_id));
        args.extend_from_slice(path.siblings());

        self.chain.send_and_wait(subject, method, &args)?;
        self.apply_local(subject, shield_id, value)?;
        debug!(%subject, shield_id, method, "mirrored blacklist update locally");

        self.assert_consistent_root(subject)
    }

    /// The only place the tree and the member set are mutated; keeping both
    /// writes here preserves the set-mirrors-tree invariant.
    fn apply_local(
        &mut self,
        subject: &SubjectId,
        shield_id: u64,
        value: Fr,
    ) -> Result<(), LedgerError> {
        let state = self.subject_state(subject);
        state.tree.update_leaf(value, shield_id)?;
        if value == ABSENT {
            state.members.remove(&shield_id);
        } else {
            state.members.insert(shield_id);
        }
        Ok(())
    }

    /// Re-fetch the committed root and fail hard if the local root
    /// disagrees. No retry, no reconciliation.
    fn assert_consistent_root(&mut self, subject: &SubjectId) -> Result<(), LedgerError> {
        let local = self.subject_state(subject).tree.root();
        let committed = self.chain.committed_root(subject)?;
        if local != committed {
            warn!(%subject, %local, %committed, "local root diverged from committed root");
            return Err(LedgerError::RootMismatch {
                subject: *subject,
                local,
                committed,
            });
        }
        Ok(())
    }

    /// Lazily create a subject's set + tree pair on first touch.
    fn subject_state(&mut self, subject: &SubjectId) -> &mut SubjectState<H> {
        self.subjects.entry(*subject).or_insert_with(|| SubjectState {
            members: HashSet::new(),
            tree: self.template.clone(),
        })
    }
}
