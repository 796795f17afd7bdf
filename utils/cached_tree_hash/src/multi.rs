use ethereum_types::H256 as Hash256;

use crate::{Error, TreeHashCache};

/// A cache for a list of containers: one small cache per item plus a cache
/// over the item roots. Mutating one item rehashes that item's subtree and
/// a single path through the list tree.
#[derive(Debug, PartialEq, Clone)]
pub struct MultiTreeHashCache {
    list_cache: TreeHashCache,
    item_caches: Vec<TreeHashCache>,
    item_leaf_limit: usize,
}

impl MultiTreeHashCache {
    pub fn new(list_leaf_limit: usize, item_leaf_limit: usize) -> Self {
        Self {
            list_cache: TreeHashCache::new(list_leaf_limit),
            item_caches: vec![],
            item_leaf_limit,
        }
    }

    /// Recalculates the list root (without the length mix-in; callers of
    /// list-typed fields apply it) from per-item leaf extractors.
    pub fn recalculate<T, F>(&mut self, items: &[T], item_leaves: F) -> Result<Hash256, Error>
    where
        F: Fn(&T) -> Vec<Hash256>,
    {
        if items.len() < self.item_caches.len() {
            return Err(Error::CannotShrink {
                leaves: items.len(),
                cached: self.item_caches.len(),
            });
        }

        self.item_caches
            .resize(items.len(), TreeHashCache::new(self.item_leaf_limit));

        let mut roots = Vec::with_capacity(items.len());
        for (item, cache) in items.iter().zip(self.item_caches.iter_mut()) {
            roots.push(cache.recalculate(&item_leaves(item))?);
        }

        self.list_cache.recalculate(&roots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_hash::merkleize_padded;

    // A stand-in for a small container: its root covers four leaves.
    fn item_leaves(item: &[u8; 4]) -> Vec<Hash256> {
        item.iter().map(|byte| Hash256::from([*byte; 32])).collect()
    }

    fn item_root(item: &[u8; 4]) -> Hash256 {
        let mut bytes = vec![];
        for leaf in item_leaves(item) {
            bytes.extend_from_slice(leaf.as_bytes());
        }
        Hash256::from_slice(&merkleize_padded(&bytes, 4))
    }

    fn reference_root(items: &[[u8; 4]], limit: usize) -> Hash256 {
        let mut bytes = vec![];
        for item in items {
            bytes.extend_from_slice(item_root(item).as_bytes());
        }
        Hash256::from_slice(&merkleize_padded(&bytes, limit))
    }

    #[test]
    fn matches_the_simple_hasher() {
        let mut cache = MultiTreeHashCache::new(8, 4);
        let mut items = vec![[1, 2, 3, 4], [5, 6, 7, 8]];

        assert_eq!(
            cache.recalculate(&items, item_leaves),
            Ok(reference_root(&items, 8))
        );

        items[0][2] = 99;
        items.push([9, 9, 9, 9]);
        assert_eq!(
            cache.recalculate(&items, item_leaves),
            Ok(reference_root(&items, 8))
        );
    }

    #[test]
    fn untouched_items_are_not_rehashed() {
        let _serial = crate::COUNTER_LOCK.lock().expect("counter lock");
        let mut cache = MultiTreeHashCache::new(8, 4);
        let mut items: Vec<[u8; 4]> = (0..8).map(|i| [i, i, i, i]).collect();
        cache.recalculate(&items, item_leaves).expect("items fit");

        items[3][0] = 255;
        let before = hashing::hash_count();
        cache.recalculate(&items, item_leaves).expect("items fit");
        let incremental = hashing::hash_count() - before;

        let before = hashing::hash_count();
        reference_root(&items, 8);
        let simple = hashing::hash_count() - before;

        assert!(incremental < simple);
    }
}
