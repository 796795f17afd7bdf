use hashing::{hash, hash_concat};

use crate::BYTES_PER_CHUNK;

/// Splits `bytes` into 32-byte chunks, pads the chunk count up to the next
/// power of two of `max(chunk_count, minimum_leaf_count, 1)` and hashes the
/// layers pairwise down to a single root.
///
/// Padding is virtual: a subtree consisting entirely of zero chunks is
/// replaced by a precomputable hash, so a vector bounded by 2^40 elements
/// does not allocate 2^40 leaves.
pub fn merkleize_padded(bytes: &[u8], minimum_leaf_count: usize) -> Vec<u8> {
    let mut layer = chunkify(bytes);
    let leaf_count = layer.len().max(minimum_leaf_count).max(1);
    let depth = depth_for(leaf_count);

    for level in 0..depth {
        if layer.len() % 2 == 1 {
            layer.push(zero_hash(level));
        }
        layer = layer
            .chunks(2)
            .map(|pair| hash_concat(&pair[0], &pair[1]))
            .collect();
    }

    layer.remove(0)
}

/// Hashes `root` together with `length` encoded as a little-endian 32-byte
/// chunk. Lists and bitlists commit to their length this way.
pub fn mix_in_length(root: &[u8], length: usize) -> Vec<u8> {
    let mut length_chunk = (length as u64).to_le_bytes().to_vec();
    length_chunk.resize(BYTES_PER_CHUNK, 0);
    hash_concat(root, &length_chunk)
}

/// The root of a subtree of the given depth that contains only zero chunks.
pub fn zero_hash(depth: usize) -> Vec<u8> {
    let mut node = vec![0; BYTES_PER_CHUNK];
    for _ in 0..depth {
        node = hash_concat(&node, &node);
    }
    node
}

/// The number of pairwise-hash levels needed for `leaf_count` leaves.
pub fn depth_for(leaf_count: usize) -> usize {
    leaf_count.next_power_of_two().trailing_zeros() as usize
}

fn chunkify(bytes: &[u8]) -> Vec<Vec<u8>> {
    if bytes.is_empty() {
        return vec![vec![0; BYTES_PER_CHUNK]];
    }

    bytes
        .chunks(BYTES_PER_CHUNK)
        .map(|chunk| {
            let mut padded = chunk.to_vec();
            padded.resize(BYTES_PER_CHUNK, 0);
            padded
        })
        .collect()
}
