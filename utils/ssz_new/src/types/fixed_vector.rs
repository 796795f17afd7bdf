use core::marker::PhantomData;
use core::ops::{Deref, Index, IndexMut};
use core::slice::SliceIndex;

use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tree_hash::{TreeHash, TreeHashType};
use typenum::Unsigned;

use crate::utils::decode_variable_sized_items;
use crate::{SszDecode, SszDecodeError, SszEncode, BYTES_PER_LENGTH_OFFSET};

/// A vector of exactly `N` elements. Constructing one from a shorter `Vec`
/// pads with `T::default()`; a longer `Vec` is truncated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FixedVector<T, N> {
    vec: Vec<T>,
    _phantom: PhantomData<N>,
}

impl<T, N: Unsigned> FixedVector<T, N> {
    pub fn capacity() -> usize {
        N::to_usize()
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<T> {
        self.vec.iter()
    }

    pub fn iter_mut(&mut self) -> core::slice::IterMut<T> {
        self.vec.iter_mut()
    }

    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.vec.clone()
    }
}

impl<T: Default + Clone, N: Unsigned> From<Vec<T>> for FixedVector<T, N> {
    fn from(mut vec: Vec<T>) -> Self {
        vec.resize(N::to_usize(), T::default());
        Self {
            vec,
            _phantom: PhantomData,
        }
    }
}

impl<T: Default + Clone, N: Unsigned> Default for FixedVector<T, N> {
    fn default() -> Self {
        Self::from(vec![])
    }
}

impl<T, N: Unsigned, I: SliceIndex<[T]>> Index<I> for FixedVector<T, N> {
    type Output = I::Output;

    fn index(&self, index: I) -> &Self::Output {
        &self.vec[index]
    }
}

impl<T, N: Unsigned, I: SliceIndex<[T]>> IndexMut<I> for FixedVector<T, N> {
    fn index_mut(&mut self, index: I) -> &mut Self::Output {
        &mut self.vec[index]
    }
}

impl<T, N: Unsigned> Deref for FixedVector<T, N> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.vec[..]
    }
}

impl<T: SszEncode, N: Unsigned> SszEncode for FixedVector<T, N> {
    fn as_ssz_bytes(&self) -> Vec<u8> {
        self.vec.as_ssz_bytes()
    }

    fn is_ssz_fixed_len() -> bool {
        T::is_ssz_fixed_len()
    }
}

impl<T: SszDecode + Default + Clone, N: Unsigned> SszDecode for FixedVector<T, N> {
    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, SszDecodeError> {
        let expected_count = N::to_usize();

        let items = if T::is_ssz_fixed_len() {
            let expected = expected_count * T::ssz_fixed_len();
            if bytes.len() != expected {
                return Err(SszDecodeError::InvalidByteLength {
                    len: bytes.len(),
                    expected,
                });
            }
            bytes
                .chunks(T::ssz_fixed_len())
                .map(T::from_ssz_bytes)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            decode_variable_sized_items(bytes)?
        };

        if items.len() != expected_count {
            return Err(SszDecodeError::BytesInvalid(format!(
                "vector of {} decoded {} elements",
                expected_count,
                items.len()
            )));
        }

        Ok(Self {
            vec: items,
            _phantom: PhantomData,
        })
    }

    fn is_ssz_fixed_len() -> bool {
        T::is_ssz_fixed_len()
    }

    fn ssz_fixed_len() -> usize {
        if T::is_ssz_fixed_len() {
            N::to_usize() * T::ssz_fixed_len()
        } else {
            BYTES_PER_LENGTH_OFFSET
        }
    }
}

impl<T: TreeHash, N: Unsigned> TreeHash for FixedVector<T, N> {
    fn tree_hash_type() -> TreeHashType {
        TreeHashType::Vector
    }

    fn tree_hash_packed_encoding(&self) -> Vec<u8> {
        unreachable!("vectors should never be packed")
    }

    fn tree_hash_packing_factor() -> usize {
        unreachable!("vectors should never be packed")
    }

    fn tree_hash_root(&self) -> Vec<u8> {
        match T::tree_hash_type() {
            TreeHashType::Basic => {
                let chunk_count =
                    (N::to_usize() + T::tree_hash_packing_factor() - 1) / T::tree_hash_packing_factor();
                tree_hash::merkle_root_of_packed(&self.vec, chunk_count)
            }
            _ => tree_hash::merkle_root_of_items(&self.vec, N::to_usize()),
        }
    }
}

impl<T: Serialize, N> Serialize for FixedVector<T, N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.vec.len()))?;
        for element in &self.vec {
            seq.serialize_element(element)?;
        }
        seq.end()
    }
}

impl<'de, T, N> Deserialize<'de> for FixedVector<T, N>
where
    T: Deserialize<'de> + Default + Clone,
    N: Unsigned,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from(Vec::<T>::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typenum::{U3, U4};

    #[test]
    fn shorter_input_is_padded_with_defaults() {
        let vector: FixedVector<u64, U4> = FixedVector::from(vec![1, 2]);
        assert_eq!(&vector[..], &[1, 2, 0, 0]);
        assert_eq!(vector.len(), 4);
    }

    #[test]
    fn longer_input_is_truncated() {
        let vector: FixedVector<u64, U3> = FixedVector::from(vec![1, 2, 3, 4, 5]);
        assert_eq!(&vector[..], &[1, 2, 3]);
    }

    #[test]
    fn fixed_size_elements_serialize_inline() {
        let vector: FixedVector<u16, U3> = FixedVector::from(vec![1, 2, 3]);
        assert_eq!(vector.as_ssz_bytes(), vec![1, 0, 2, 0, 3, 0]);
        assert_eq!(
            <FixedVector<u16, U3>>::from_ssz_bytes(&[5, 0, 2, 0, 3, 0])
                .map(|v| v.to_vec()),
            Ok(vec![5, 2, 3])
        );
    }

    #[test]
    fn variable_size_elements_serialize_with_offsets() {
        let vector: FixedVector<Vec<u8>, U3> =
            FixedVector::from(vec![vec![1, 2], vec![], vec![3]]);
        assert_eq!(
            vector.as_ssz_bytes(),
            vec![12, 0, 0, 0, 14, 0, 0, 0, 14, 0, 0, 0, 1, 2, 3]
        );

        let decoded = <FixedVector<Vec<u8>, U3>>::from_ssz_bytes(&[
            12, 0, 0, 0, 14, 0, 0, 0, 14, 0, 0, 0, 1, 2, 3,
        ])
        .expect("three elements");
        assert_eq!(decoded.to_vec(), vec![vec![1, 2], vec![], vec![3]]);
    }

    #[test]
    fn decode_rejects_wrong_element_count() {
        assert!(<FixedVector<u16, U3>>::from_ssz_bytes(&[1, 0, 2, 0]).is_err());
        assert!(
            <FixedVector<Vec<u8>, U3>>::from_ssz_bytes(&[8, 0, 0, 0, 9, 0, 0, 0, 1]).is_err()
        );
    }

    #[test]
    fn tree_hash_packs_basic_elements() {
        let vector: FixedVector<u64, U4> = FixedVector::from(vec![1, 2, 3, 4]);
        let mut packed = vec![];
        for value in &[1_u64, 2, 3, 4] {
            packed.extend_from_slice(&value.to_le_bytes());
        }
        assert_eq!(vector.tree_hash_root(), tree_hash::merkleize_padded(&packed, 1));
    }
}
