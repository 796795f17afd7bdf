use std::sync::atomic::{AtomicU64, Ordering};

use ring::digest::{digest, SHA256};

// Used by the incremental hashing tests to assert how many digest invocations
// a recalculation performed. Relaxed ordering is enough for a counter.
static HASH_CALLS: AtomicU64 = AtomicU64::new(0);

pub fn hash(input: &[u8]) -> Vec<u8> {
    HASH_CALLS.fetch_add(1, Ordering::Relaxed);
    digest(&SHA256, input).as_ref().to_vec()
}

pub fn hash_concat(left: &[u8], right: &[u8]) -> Vec<u8> {
    let mut preimage = Vec::with_capacity(left.len() + right.len());
    preimage.extend_from_slice(left);
    preimage.extend_from_slice(right);
    hash(&preimage)
}

pub fn hash_count() -> u64 {
    HASH_CALLS.load(Ordering::Relaxed)
}
