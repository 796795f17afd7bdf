mod impls;
mod merkleize;

pub use merkleize::{merkleize_padded, mix_in_length, zero_hash};

pub const BYTES_PER_CHUNK: usize = 32;
pub const HASHSIZE: usize = 32;

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum TreeHashType {
    Basic,
    Vector,
    List,
    Container,
}

pub trait TreeHash {
    fn tree_hash_type() -> TreeHashType;

    /// The serialized form of `self` used when packing several values into one
    /// chunk. Only meaningful for basic types.
    fn tree_hash_packed_encoding(&self) -> Vec<u8>;

    /// How many values of this type fit into a single 32-byte chunk. Only
    /// meaningful for basic types.
    fn tree_hash_packing_factor() -> usize;

    fn tree_hash_root(&self) -> Vec<u8>;
}

/// The root a signature-carrying container commits to when being signed: the
/// tree hash of the container with its trailing signature field elided.
pub trait SignedRoot: TreeHash {
    fn signed_root(&self) -> Vec<u8>;
}

/// Packs `values` into 32-byte chunks and merkleizes them, padding with zero
/// chunks up to `minimum_leaf_count`.
pub fn merkle_root_of_packed<T: TreeHash>(values: &[T], minimum_leaf_count: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * BYTES_PER_CHUNK);
    for value in values {
        bytes.append(&mut value.tree_hash_packed_encoding());
    }
    merkleize_padded(&bytes, minimum_leaf_count)
}

/// Merkleizes the roots of `values`, padding with zero chunks up to
/// `minimum_leaf_count`.
pub fn merkle_root_of_items<T: TreeHash>(values: &[T], minimum_leaf_count: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * BYTES_PER_CHUNK);
    for value in values {
        bytes.append(&mut value.tree_hash_root());
    }
    merkleize_padded(&bytes, minimum_leaf_count)
}
