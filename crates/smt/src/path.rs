//! Sibling path extracted from a sparse Merkle tree.

use ark_bn254::Fr;

use crate::hasher::FieldHasher;

/// The ordered sibling hashes needed, together with a leaf value and its
/// index, to recompute a tree's root.
///
/// Siblings run leaf-to-root; the direction taken at each level is fully
/// determined by the leaf index (even index = left child, odd = right).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SiblingPath {
    siblings: Vec<Fr>,
}

impl SiblingPath {
    /// Create a path from leaf-to-root sibling hashes.
    pub fn new(siblings: Vec<Fr>) -> Self {
        Self { siblings }
    }

    /// Get the sibling hashes, leaf-to-root.
    pub fn siblings(&self) -> &[Fr] {
        &self.siblings
    }

    /// Number of levels the path covers.
    pub fn depth(&self) -> usize {
        self.siblings.len()
    }

    /// Recompute the root implied by this path for the given leaf value and
    /// index, by repeated compression from leaf to root.
    pub fn compute_root<H: FieldHasher>(&self, leaf: Fr, index: u64, hasher: &H) -> Fr {
        let mut current = leaf;
        let mut idx = index;

        for sibling in &self.siblings {
            current = if idx & 1 == 0 {
                hasher.hash_pair(current, *sibling)
            } else {
                hasher.hash_pair(*sibling, current)
            };
            idx >>= 1;
        }

        current
    }
}

#[cfg(test)]
mod path_tests {
    use super::*;
    use crate::hasher::PoseidonHasher;

    #[test]
    fn test_compute_root_follows_index_parity() {
        let hasher = PoseidonHasher::new();
        let leaf = Fr::from(5u64);
        let s0 = Fr::from(1u64);
        let s1 = Fr::from(2u64);

        let path = SiblingPath::new(vec![s0, s1]);

        // Index 2 is a left child at the leaf level (bit 0 = 0) and a right
        // child one level up (bit 1 = 1).
        let expected = hasher.hash_pair(s1, hasher.hash_pair(leaf, s0));
        assert_eq!(path.compute_root(leaf, 2, &hasher), expected);
    }

    #[test]
    fn test_empty_path_returns_leaf() {
        let hasher = PoseidonHasher::new();
        let path = SiblingPath::new(Vec::new());

        assert_eq!(path.depth(), 0);
        assert_eq!(path.compute_root(Fr::from(3u64), 0, &hasher), Fr::from(3u64));
    }
}
