//! Chain storage over an opaque byte-to-byte store.
//!
//! The store promises nothing beyond writes being visible to later reads in
//! the same process. Three keyspaces overlay it: blocks by root, block-root
//! indices by slot, and the best justified checkpoint.

use core::marker::PhantomData;
use std::collections::BTreeMap;

use ssz_new::{SszDecode, SszEncode};
use thiserror::Error;
use types::config::Config;
use types::primitives::{Slot, H256};
use types::types::{BeaconBlock, Checkpoint};

#[derive(Debug, PartialEq, Clone, Error)]
pub enum StorageError {
    #[error("stored value under {key:?} cannot be decoded")]
    Corrupt { key: Vec<u8> },
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// An opaque byte-to-byte map.
pub trait Store {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;
    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StorageError>;
}

/// The in-process store used by tests and the bundled node.
#[derive(Default)]
pub struct MemoryStore(BTreeMap<Vec<u8>, Vec<u8>>);

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.0.get(key).cloned())
    }

    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StorageError> {
        self.0.insert(key, value);
        Ok(())
    }
}

const BLOCK_PREFIX: &[u8] = b"block";
const BLOCK_INDEX_PREFIX: &[u8] = b"block-index";
const CHECKPOINT_KEY: &[u8] = b"checkpoint";

pub struct ChainStorage<C, S> {
    store: S,
    _phantom: PhantomData<C>,
}

impl<C: Config, S: Store> ChainStorage<C, S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    pub fn put_block(&mut self, root: H256, block: &BeaconBlock<C>) -> Result<(), StorageError> {
        self.store.put(block_key(root), block.as_ssz_bytes())?;

        // Maintain the by-slot index.
        let mut roots = self.block_roots_at_slot(block.slot)?;
        if !roots.contains(&root) {
            roots.push(root);
            self.store
                .put(block_index_key(block.slot), roots.as_ssz_bytes())?;
        }

        Ok(())
    }

    pub fn block(&self, root: H256) -> Result<Option<BeaconBlock<C>>, StorageError> {
        let key = block_key(root);
        match self.store.get(&key)? {
            None => Ok(None),
            Some(bytes) => BeaconBlock::from_ssz_bytes(&bytes)
                .map(Some)
                .map_err(|_| StorageError::Corrupt { key }),
        }
    }

    pub fn block_roots_at_slot(&self, slot: Slot) -> Result<Vec<H256>, StorageError> {
        let key = block_index_key(slot);
        match self.store.get(&key)? {
            None => Ok(vec![]),
            Some(bytes) => {
                Vec::<H256>::from_ssz_bytes(&bytes).map_err(|_| StorageError::Corrupt { key })
            }
        }
    }

    pub fn set_checkpoint(&mut self, checkpoint: Checkpoint) -> Result<(), StorageError> {
        self.store
            .put(CHECKPOINT_KEY.to_vec(), checkpoint.as_ssz_bytes())
    }

    pub fn checkpoint(&self) -> Result<Option<Checkpoint>, StorageError> {
        match self.store.get(CHECKPOINT_KEY)? {
            None => Ok(None),
            Some(bytes) => Checkpoint::from_ssz_bytes(&bytes)
                .map(Some)
                .map_err(|_| StorageError::Corrupt {
                    key: CHECKPOINT_KEY.to_vec(),
                }),
        }
    }
}

fn block_key(root: H256) -> Vec<u8> {
    let mut key = BLOCK_PREFIX.to_vec();
    key.extend_from_slice(root.as_bytes());
    key
}

fn block_index_key(slot: Slot) -> Vec<u8> {
    let mut key = BLOCK_INDEX_PREFIX.to_vec();
    key.extend_from_slice(&slot.to_le_bytes());
    key
}
