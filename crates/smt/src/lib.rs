//! Sparse Merkle accumulator primitives.
//!
//! This crate provides:
//! - `FieldHasher`: a pluggable two-to-one compression function over BN254
//!   scalar field elements, with a Poseidon implementation
//! - `SparseMerkleTree`: a fixed-depth tree over a `2^depth` index space,
//!   materialized lazily through a node cache and precomputed zero hashes
//! - `SiblingPath`: the leaf-to-root sibling sequence needed to recompute
//!   the root from a single leaf

pub mod hasher;
pub mod path;
pub mod tree;

pub use ark_bn254::Fr;
pub use hasher::{FieldHasher, PoseidonHasher};
pub use path::SiblingPath;
pub use tree::{SparseMerkleTree, TreeError, DEFAULT_DEPTH};
