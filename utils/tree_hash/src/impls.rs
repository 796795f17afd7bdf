use ethereum_types::{H256, U128, U256};

use crate::{merkleize_padded, mix_in_length, TreeHash, TreeHashType, BYTES_PER_CHUNK};

macro_rules! impl_for_uint {
    ($type: ty) => {
        impl TreeHash for $type {
            fn tree_hash_type() -> TreeHashType {
                TreeHashType::Basic
            }

            fn tree_hash_packed_encoding(&self) -> Vec<u8> {
                self.to_le_bytes().to_vec()
            }

            fn tree_hash_packing_factor() -> usize {
                BYTES_PER_CHUNK / std::mem::size_of::<$type>()
            }

            fn tree_hash_root(&self) -> Vec<u8> {
                let mut chunk = self.to_le_bytes().to_vec();
                chunk.resize(BYTES_PER_CHUNK, 0);
                chunk
            }
        }
    };
}

impl_for_uint!(u8);
impl_for_uint!(u16);
impl_for_uint!(u32);
impl_for_uint!(u64);
impl_for_uint!(usize);

impl TreeHash for bool {
    fn tree_hash_type() -> TreeHashType {
        TreeHashType::Basic
    }

    fn tree_hash_packed_encoding(&self) -> Vec<u8> {
        (*self as u8).tree_hash_packed_encoding()
    }

    fn tree_hash_packing_factor() -> usize {
        u8::tree_hash_packing_factor()
    }

    fn tree_hash_root(&self) -> Vec<u8> {
        (*self as u8).tree_hash_root()
    }
}

macro_rules! impl_for_u8_array {
    ($size: expr) => {
        impl TreeHash for [u8; $size] {
            fn tree_hash_type() -> TreeHashType {
                TreeHashType::Vector
            }

            fn tree_hash_packed_encoding(&self) -> Vec<u8> {
                unreachable!("bytes{} should never be packed", $size)
            }

            fn tree_hash_packing_factor() -> usize {
                unreachable!("bytes{} should never be packed", $size)
            }

            fn tree_hash_root(&self) -> Vec<u8> {
                merkleize_padded(&self[..], 0)
            }
        }
    };
}

impl_for_u8_array!(4);
impl_for_u8_array!(32);
impl_for_u8_array!(48);
impl_for_u8_array!(96);

// `Option` is the two-alternative union: the root of the active alternative
// (a zero chunk for the null alternative) with the selector mixed in. The
// mix-in has the same shape as a list's length mix-in.
impl<T: TreeHash> TreeHash for Option<T> {
    fn tree_hash_type() -> TreeHashType {
        TreeHashType::Container
    }

    fn tree_hash_packed_encoding(&self) -> Vec<u8> {
        unreachable!("unions should never be packed")
    }

    fn tree_hash_packing_factor() -> usize {
        unreachable!("unions should never be packed")
    }

    fn tree_hash_root(&self) -> Vec<u8> {
        match self {
            None => mix_in_length(&[0; BYTES_PER_CHUNK], 0),
            Some(value) => mix_in_length(&value.tree_hash_root(), 1),
        }
    }
}

impl TreeHash for H256 {
    fn tree_hash_type() -> TreeHashType {
        TreeHashType::Basic
    }

    fn tree_hash_packed_encoding(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    fn tree_hash_packing_factor() -> usize {
        1
    }

    fn tree_hash_root(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl TreeHash for U128 {
    fn tree_hash_type() -> TreeHashType {
        TreeHashType::Basic
    }

    fn tree_hash_packed_encoding(&self) -> Vec<u8> {
        let mut bytes = vec![0; 16];
        self.to_little_endian(&mut bytes);
        bytes
    }

    fn tree_hash_packing_factor() -> usize {
        2
    }

    fn tree_hash_root(&self) -> Vec<u8> {
        let mut chunk = self.tree_hash_packed_encoding();
        chunk.resize(BYTES_PER_CHUNK, 0);
        chunk
    }
}

impl TreeHash for U256 {
    fn tree_hash_type() -> TreeHashType {
        TreeHashType::Basic
    }

    fn tree_hash_packed_encoding(&self) -> Vec<u8> {
        let mut bytes = vec![0; 32];
        self.to_little_endian(&mut bytes);
        bytes
    }

    fn tree_hash_packing_factor() -> usize {
        1
    }

    fn tree_hash_root(&self) -> Vec<u8> {
        self.tree_hash_packed_encoding()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint_roots_are_padded_chunks() {
        let mut expected = vec![0; 32];
        expected[0] = 0x11;
        expected[1] = 0x11;
        assert_eq!(0x1111_u64.tree_hash_root(), expected);
        assert_eq!(0x1111_u16.tree_hash_root(), expected);
    }

    #[test]
    fn packing_factors() {
        assert_eq!(u8::tree_hash_packing_factor(), 32);
        assert_eq!(u16::tree_hash_packing_factor(), 16);
        assert_eq!(u32::tree_hash_packing_factor(), 8);
        assert_eq!(u64::tree_hash_packing_factor(), 4);
    }

    #[test]
    fn bool_packs_like_u8() {
        assert_eq!(true.tree_hash_packed_encoding(), vec![1]);
        assert_eq!(false.tree_hash_packed_encoding(), vec![0]);
    }

    #[test]
    fn h256_root_is_identity() {
        let value = H256::from([3; 32]);
        assert_eq!(value.tree_hash_root(), vec![3; 32]);
    }

    #[test]
    fn bytes48_root_spans_two_chunks() {
        let value = [5_u8; 48];
        assert_eq!(value.tree_hash_root(), merkleize_padded(&value, 0));
        assert_ne!(value.tree_hash_root(), vec![5; 32]);
    }

    #[test]
    fn union_roots_commit_to_the_selector() {
        let none: Option<u64> = None;
        let some: Option<u64> = Some(0);

        assert_eq!(none.tree_hash_root(), mix_in_length(&[0; 32], 0));
        assert_eq!(some.tree_hash_root(), mix_in_length(&0_u64.tree_hash_root(), 1));
        // A null union and a zero value disagree through the selector.
        assert_ne!(none.tree_hash_root(), some.tree_hash_root());
    }
}
