//! Incremental Merkle root caches.
//!
//! A `TreeHashCache` remembers every layer of a Merkle tree bound to a leaf
//! limit. Recalculating after a mutation compares the new leaf layer against
//! the cached one and rehashes only the paths above changed leaves, so the
//! cost is proportional to the number of dirtied leaves rather than to the
//! tree size. Cloning a cache forks it: both sides keep the same root and
//! recalculate independently afterwards.

use ethereum_types::H256 as Hash256;
use hashing::hash_concat;

mod multi;

pub use multi::MultiTreeHashCache;

// The hash-call counter in `hashing` is process-global, so tests asserting
// on it must not interleave.
#[cfg(test)]
pub(crate) static COUNTER_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[derive(Debug, PartialEq, Clone)]
pub enum Error {
    TooManyLeaves { leaves: usize, capacity: usize },
    CannotShrink { leaves: usize, cached: usize },
}

#[derive(Debug, PartialEq, Clone)]
pub struct TreeHashCache {
    depth: usize,
    // layers[0] is the leaf layer; layers[depth] holds the root. Unstored
    // positions to the right of a layer are all-zero subtrees.
    layers: Vec<Vec<Hash256>>,
    zero_subtrees: Vec<Hash256>,
}

impl TreeHashCache {
    /// A cache for a tree of up to `leaf_limit` leaves. The limit is rounded
    /// up to the next power of two, exactly like `merkleize_padded` rounds
    /// its minimum leaf count.
    pub fn new(leaf_limit: usize) -> Self {
        let depth = leaf_limit.max(1).next_power_of_two().trailing_zeros() as usize;

        let mut zero_subtrees = Vec::with_capacity(depth + 1);
        let mut node = Hash256::zero();
        zero_subtrees.push(node);
        for _ in 0..depth {
            node = Hash256::from_slice(&hash_concat(node.as_bytes(), node.as_bytes()));
            zero_subtrees.push(node);
        }

        Self {
            depth,
            layers: vec![vec![]; depth + 1],
            zero_subtrees,
        }
    }

    pub fn capacity(&self) -> usize {
        1 << self.depth
    }

    /// The root as of the last `recalculate` call (the all-zero tree root
    /// before the first call).
    pub fn root(&self) -> Hash256 {
        self.node(self.depth, 0)
    }

    /// Diffs `leaves` against the cached leaf layer and rehashes the paths
    /// above every changed or appended leaf.
    ///
    /// Leaves may be appended but never removed; rings and registries only
    /// grow or mutate in place.
    pub fn recalculate(&mut self, leaves: &[Hash256]) -> Result<Hash256, Error> {
        if leaves.len() > self.capacity() {
            return Err(Error::TooManyLeaves {
                leaves: leaves.len(),
                capacity: self.capacity(),
            });
        }
        if leaves.len() < self.layers[0].len() {
            return Err(Error::CannotShrink {
                leaves: leaves.len(),
                cached: self.layers[0].len(),
            });
        }

        let mut dirty: Vec<usize> = leaves
            .iter()
            .enumerate()
            .filter(|(i, leaf)| self.layers[0].get(*i) != Some(*leaf))
            .map(|(i, _)| i)
            .collect();

        for &i in &dirty {
            self.set_node(0, i, leaves[i]);
        }

        for level in 0..self.depth {
            let mut parents: Vec<usize> = dirty.iter().map(|i| i / 2).collect();
            parents.dedup();

            for &parent in &parents {
                let left = self.node(level, 2 * parent);
                let right = self.node(level, 2 * parent + 1);
                let value = Hash256::from_slice(&hash_concat(left.as_bytes(), right.as_bytes()));
                self.set_node(level + 1, parent, value);
            }

            dirty = parents;
        }

        Ok(self.root())
    }

    fn node(&self, level: usize, index: usize) -> Hash256 {
        self.layers[level]
            .get(index)
            .copied()
            .unwrap_or(self.zero_subtrees[level])
    }

    fn set_node(&mut self, level: usize, index: usize, value: Hash256) {
        let zero = self.zero_subtrees[level];
        let layer = &mut self.layers[level];
        if layer.len() <= index {
            layer.resize(index + 1, zero);
        }
        layer[index] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_hash::merkleize_padded;

    fn leaf(byte: u8) -> Hash256 {
        Hash256::from([byte; 32])
    }

    fn reference_root(leaves: &[Hash256], limit: usize) -> Hash256 {
        let mut bytes = vec![];
        for leaf in leaves {
            bytes.extend_from_slice(leaf.as_bytes());
        }
        Hash256::from_slice(&merkleize_padded(&bytes, limit))
    }

    #[test]
    fn matches_the_simple_hasher_while_leaves_mutate_and_grow() {
        let mut cache = TreeHashCache::new(8);
        let mut leaves = vec![leaf(1), leaf(2), leaf(3)];

        assert_eq!(
            cache.recalculate(&leaves),
            Ok(reference_root(&leaves, 8))
        );

        leaves[1] = leaf(9);
        assert_eq!(
            cache.recalculate(&leaves),
            Ok(reference_root(&leaves, 8))
        );

        leaves.push(leaf(4));
        leaves.push(leaf(5));
        assert_eq!(
            cache.recalculate(&leaves),
            Ok(reference_root(&leaves, 8))
        );
    }

    #[test]
    fn no_mutation_issues_zero_hash_calls() {
        let _serial = crate::COUNTER_LOCK.lock().expect("counter lock");
        let mut cache = TreeHashCache::new(8);
        let leaves = vec![leaf(1), leaf(2), leaf(3)];
        let root = cache.recalculate(&leaves).expect("leaves fit");

        let before = hashing::hash_count();
        assert_eq!(cache.recalculate(&leaves), Ok(root));
        assert_eq!(hashing::hash_count(), before);
    }

    #[test]
    fn single_mutation_touches_one_path() {
        let _serial = crate::COUNTER_LOCK.lock().expect("counter lock");
        let mut cache = TreeHashCache::new(8);
        let mut leaves: Vec<Hash256> = (0..8).map(leaf).collect();
        cache.recalculate(&leaves).expect("leaves fit");

        leaves[5] = leaf(42);
        let before = hashing::hash_count();
        cache.recalculate(&leaves).expect("leaves fit");

        // One path from leaf to root: one hash per level.
        assert_eq!(hashing::hash_count() - before, 3);
    }

    #[test]
    fn forked_caches_diverge_independently() {
        let _serial = crate::COUNTER_LOCK.lock().expect("counter lock");
        let mut cache = TreeHashCache::new(4);
        let leaves = vec![leaf(1), leaf(2)];
        let root = cache.recalculate(&leaves).expect("leaves fit");

        let mut fork = cache.clone();
        assert_eq!(fork.root(), root);

        let forked_leaves = vec![leaf(1), leaf(7)];
        let forked_root = fork.recalculate(&forked_leaves).expect("leaves fit");
        assert_ne!(forked_root, root);

        // The original is unaffected and still clean.
        let before = hashing::hash_count();
        assert_eq!(cache.recalculate(&leaves), Ok(root));
        assert_eq!(hashing::hash_count(), before);
    }

    #[test]
    fn rejects_too_many_and_removed_leaves() {
        let mut cache = TreeHashCache::new(2);
        assert_eq!(
            cache.recalculate(&[leaf(1), leaf(2), leaf(3)]),
            Err(Error::TooManyLeaves {
                leaves: 3,
                capacity: 2
            })
        );

        cache.recalculate(&[leaf(1), leaf(2)]).expect("leaves fit");
        assert_eq!(
            cache.recalculate(&[leaf(1)]),
            Err(Error::CannotShrink {
                leaves: 1,
                cached: 2
            })
        );
    }

    #[test]
    fn empty_tree_root_is_the_zero_subtree() {
        let cache = TreeHashCache::new(4);
        assert_eq!(
            cache.root(),
            reference_root(&[], 4)
        );
    }
}
