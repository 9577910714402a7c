//! Sparse Merkle Tree over a fixed-depth index space.
//!
//! Untouched subtrees are never materialized: a node absent from the cache
//! implicitly holds the precomputed zero hash for its level, so memory grows
//! with the number of updates rather than with `2^depth`.

use std::collections::HashMap;

use ark_bn254::Fr;
use ark_ff::Zero;
use thiserror::Error;

use crate::hasher::FieldHasher;
use crate::path::SiblingPath;

/// Default tree depth (32 levels = 2^32 addressable leaves).
pub const DEFAULT_DEPTH: usize = 32;

/// Largest supported depth; leaf indices are `u64`.
pub const MAX_DEPTH: usize = 63;

/// Errors raised by tree construction and access.
#[derive(Error, Debug)]
pub enum TreeError {
    #[error("invalid tree depth {0}: must be between 1 and {MAX_DEPTH}")]
    InvalidDepth(usize),
    #[error("leaf index {index} out of range for tree of depth {depth}")]
    IndexOutOfRange { index: u64, depth: usize },
}

/// Sparse Merkle Tree with an incremental root and lazy node storage.
///
/// Level 0 holds the root, level `depth` holds the leaves. The default
/// (never written) leaf value is `Fr::zero()`.
#[derive(Clone)]
pub struct SparseMerkleTree<H: FieldHasher> {
    /// Tree depth (number of levels between root and leaves)
    depth: usize,

    hasher: H,

    /// Sparse node storage: (level, index) -> hash
    nodes: HashMap<(usize, u64), Fr>,

    /// Precomputed hash of an all-default subtree rooted at each level.
    /// `zero_hashes[depth]` is the default leaf, `zero_hashes[0]` the
    /// root of an empty tree.
    zero_hashes: Vec<Fr>,

    /// Number of leaves currently holding a non-default value
    leaf_count: u64,
}

impl<H: FieldHasher> SparseMerkleTree<H> {
    /// Create an empty tree of the given depth.
    pub fn new(depth: usize, hasher: H) -> Result<Self, TreeError> {
        if depth < 1 || depth > MAX_DEPTH {
            return Err(TreeError::InvalidDepth(depth));
        }

        let mut zero_hashes = vec![Fr::zero(); depth + 1];
        for level in (0..depth).rev() {
            let child = zero_hashes[level + 1];
            zero_hashes[level] = hasher.hash_pair(child, child);
        }

        let mut nodes = HashMap::new();
        nodes.insert((0, 0), zero_hashes[0]);

        Ok(Self {
            depth,
            hasher,
            nodes,
            zero_hashes,
            leaf_count: 0,
        })
    }

    /// Get the tree depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of leaves whose value differs from the default leaf.
    pub fn leaf_count(&self) -> u64 {
        self.leaf_count
    }

    /// Get the current root hash.
    pub fn root(&self) -> Fr {
        self.node(0, 0)
    }

    /// Get a node hash, falling back to the zero hash for its level.
    fn node(&self, level: usize, index: u64) -> Fr {
        self.nodes
            .get(&(level, index))
            .copied()
            .unwrap_or(self.zero_hashes[level])
    }

    fn check_index(&self, index: u64) -> Result<(), TreeError> {
        if index >> self.depth != 0 {
            return Err(TreeError::IndexOutOfRange {
                index,
                depth: self.depth,
            });
        }
        Ok(())
    }

    /// Get the value stored at a leaf, or the default leaf value if the
    /// index was never written.
    pub fn leaf_value(&self, index: u64) -> Result<Fr, TreeError> {
        self.check_index(index)?;
        Ok(self.node(self.depth, index))
    }

    /// Extract the sibling path for a leaf: one sibling hash per level,
    /// leaf-to-root order, length exactly `depth`. Read-only.
    pub fn sibling_path(&self, index: u64) -> Result<SiblingPath, TreeError> {
        self.check_index(index)?;

        let mut siblings = Vec::with_capacity(self.depth);
        let mut idx = index;
        for level in (1..=self.depth).rev() {
            siblings.push(self.node(level, idx ^ 1));
            idx >>= 1;
        }

        Ok(SiblingPath::new(siblings))
    }

    /// Write a leaf and recompute every hash on its path to the root.
    ///
    /// Writing the default value over an already-default leaf is a no-op;
    /// otherwise the climb reads its own freshly written nodes, so a
    /// sibling updated earlier in the same call is observed.
    pub fn update_leaf(&mut self, value: Fr, index: u64) -> Result<(), TreeError> {
        self.check_index(index)?;

        let default_leaf = self.zero_hashes[self.depth];
        let inserting_default = value == default_leaf;
        let was_default = self.node(self.depth, index) == default_leaf;
        if inserting_default && was_default {
            return Ok(());
        }

        self.nodes.insert((self.depth, index), value);

        let mut current = value;
        let mut idx = index;
        for level in (1..=self.depth).rev() {
            let sibling = self.node(level, idx ^ 1);
            let (left, right) = if idx & 1 == 0 {
                (current, sibling)
            } else {
                (sibling, current)
            };
            current = self.hasher.hash_pair(left, right);
            idx >>= 1;
            self.nodes.insert((level - 1, idx), current);
        }

        if inserting_default {
            self.leaf_count -= 1;
        } else if was_default {
            self.leaf_count += 1;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tree_tests {
    use super::*;
    use crate::hasher::PoseidonHasher;

    fn tree(depth: usize) -> SparseMerkleTree<PoseidonHasher> {
        SparseMerkleTree::new(depth, PoseidonHasher::new()).unwrap()
    }

    #[test]
    fn test_empty_root_is_folded_zero_hash() {
        let hasher = PoseidonHasher::new();
        let t = tree(4);

        let mut expected = Fr::zero();
        for _ in 0..4 {
            expected = hasher.hash_pair(expected, expected);
        }
        assert_eq!(t.root(), expected);
        assert_eq!(t.leaf_count(), 0);
    }

    #[test]
    fn test_rejects_invalid_depth() {
        assert!(matches!(
            SparseMerkleTree::new(0, PoseidonHasher::new()),
            Err(TreeError::InvalidDepth(0))
        ));
        assert!(matches!(
            SparseMerkleTree::new(64, PoseidonHasher::new()),
            Err(TreeError::InvalidDepth(64))
        ));
    }

    #[test]
    fn test_zero_write_on_default_leaf_is_noop() {
        let mut t = tree(8);
        let root_before = t.root();

        t.update_leaf(Fr::zero(), 3).unwrap();

        assert_eq!(t.root(), root_before);
        assert_eq!(t.leaf_count(), 0);
        assert_eq!(t.leaf_value(3).unwrap(), Fr::zero());
    }

    #[test]
    fn test_round_trip_through_sibling_path() {
        let hasher = PoseidonHasher::new();
        let mut t = tree(8);
        let value = Fr::from(99u64);

        t.update_leaf(value, 7).unwrap();

        assert_eq!(t.leaf_value(7).unwrap(), value);
        let path = t.sibling_path(7).unwrap();
        assert_eq!(path.depth(), 8);
        assert_eq!(path.compute_root(value, 7, &hasher), t.root());
    }

    #[test]
    fn test_leaf_count_tracks_non_default_leaves() {
        let mut t = tree(8);

        t.update_leaf(Fr::from(5u64), 1).unwrap();
        t.update_leaf(Fr::from(6u64), 2).unwrap();
        assert_eq!(t.leaf_count(), 2);

        // Overwrite does not change the count
        t.update_leaf(Fr::from(7u64), 1).unwrap();
        assert_eq!(t.leaf_count(), 2);

        t.update_leaf(Fr::zero(), 1).unwrap();
        assert_eq!(t.leaf_count(), 1);

        t.update_leaf(Fr::zero(), 2).unwrap();
        assert_eq!(t.leaf_count(), 0);
    }

    #[test]
    fn test_leaf_count_matches_reference_after_random_updates() {
        use ark_std::rand::{rngs::StdRng, Rng, SeedableRng};
        use std::collections::HashMap;

        let mut rng = StdRng::seed_from_u64(7);
        let mut t = tree(6);
        let mut reference: HashMap<u64, Fr> = HashMap::new();

        for _ in 0..200 {
            let idx = rng.gen_range(0..64u64);
            let value = if rng.gen_bool(0.5) {
                Fr::zero()
            } else {
                Fr::from(rng.gen_range(1..100u64))
            };
            t.update_leaf(value, idx).unwrap();
            if value == Fr::zero() {
                reference.remove(&idx);
            } else {
                reference.insert(idx, value);
            }
        }

        assert_eq!(t.leaf_count(), reference.len() as u64);
        for (idx, value) in &reference {
            assert_eq!(t.leaf_value(*idx).unwrap(), *value);
        }
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        let mut t = tree(4);

        assert!(matches!(
            t.leaf_value(16),
            Err(TreeError::IndexOutOfRange { index: 16, depth: 4 })
        ));
        assert!(t.sibling_path(16).is_err());
        assert!(t.update_leaf(Fr::from(1u64), 16).is_err());
        // Last valid index is fine
        assert!(t.update_leaf(Fr::from(1u64), 15).is_ok());
    }

    #[test]
    fn test_adjacent_leaves_see_each_other_as_siblings() {
        let hasher = PoseidonHasher::new();
        let mut t = tree(4);

        t.update_leaf(Fr::from(10u64), 6).unwrap();
        t.update_leaf(Fr::from(11u64), 7).unwrap();

        let path = t.sibling_path(6).unwrap();
        assert_eq!(path.siblings()[0], Fr::from(11u64));
        assert_eq!(path.compute_root(Fr::from(10u64), 6, &hasher), t.root());
    }

    #[test]
    fn test_root_is_order_independent() {
        let mut t1 = tree(6);
        let mut t2 = tree(6);

        t1.update_leaf(Fr::from(1u64), 3).unwrap();
        t1.update_leaf(Fr::from(2u64), 40).unwrap();

        t2.update_leaf(Fr::from(2u64), 40).unwrap();
        t2.update_leaf(Fr::from(1u64), 3).unwrap();

        assert_eq!(t1.root(), t2.root());
    }

    #[test]
    fn test_depth_32_single_update() {
        let hasher = PoseidonHasher::new();
        let mut t = tree(DEFAULT_DEPTH);
        let empty_root = t.root();

        t.update_leaf(Fr::from(1u64), 5).unwrap();

        assert_ne!(t.root(), empty_root);
        let path = t.sibling_path(5).unwrap();
        assert_eq!(path.depth(), 32);
        assert_eq!(path.compute_root(Fr::from(1u64), 5, &hasher), t.root());
    }
}
