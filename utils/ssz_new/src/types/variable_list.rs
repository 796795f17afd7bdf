use core::marker::PhantomData;
use core::ops::{Deref, Index, IndexMut};
use core::slice::SliceIndex;

use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tree_hash::{mix_in_length, TreeHash, TreeHashType};
use typenum::Unsigned;

use crate::types::Error;
use crate::utils::decode_variable_sized_items;
use crate::{SszDecode, SszDecodeError, SszEncode};

/// A list of at most `N` elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableList<T, N> {
    vec: Vec<T>,
    _phantom: PhantomData<N>,
}

impl<T, N: Unsigned> VariableList<T, N> {
    pub fn new(vec: Vec<T>) -> Result<Self, Error> {
        if vec.len() > N::to_usize() {
            return Err(Error::OutOfBounds {
                i: vec.len(),
                len: N::to_usize(),
            });
        }
        Ok(Self {
            vec,
            _phantom: PhantomData,
        })
    }

    pub fn max_len() -> usize {
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

    pub fn push(&mut self, value: T) -> Result<(), Error> {
        if self.vec.len() == N::to_usize() {
            return Err(Error::ListFull { max: N::to_usize() });
        }
        self.vec.push(value);
        Ok(())
    }

    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.vec.clone()
    }
}

/// Truncates input longer than the bound, mirroring the behaviour of the
/// fixed vector's constructor. Fallible construction goes through `new`.
impl<T, N: Unsigned> From<Vec<T>> for VariableList<T, N> {
    fn from(mut vec: Vec<T>) -> Self {
        vec.truncate(N::to_usize());
        Self {
            vec,
            _phantom: PhantomData,
        }
    }
}

impl<T, N: Unsigned> Default for VariableList<T, N> {
    fn default() -> Self {
        Self {
            vec: vec![],
            _phantom: PhantomData,
        }
    }
}

impl<T, N: Unsigned, I: SliceIndex<[T]>> Index<I> for VariableList<T, N> {
    type Output = I::Output;

    fn index(&self, index: I) -> &Self::Output {
        &self.vec[index]
    }
}

impl<T, N: Unsigned, I: SliceIndex<[T]>> IndexMut<I> for VariableList<T, N> {
    fn index_mut(&mut self, index: I) -> &mut Self::Output {
        &mut self.vec[index]
    }
}

impl<T, N: Unsigned> Deref for VariableList<T, N> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.vec[..]
    }
}

impl<'a, T, N: Unsigned> IntoIterator for &'a VariableList<T, N> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: SszEncode, N: Unsigned> SszEncode for VariableList<T, N> {
    fn as_ssz_bytes(&self) -> Vec<u8> {
        self.vec.as_ssz_bytes()
    }

    fn is_ssz_fixed_len() -> bool {
        false
    }
}

impl<T: SszDecode, N: Unsigned> SszDecode for VariableList<T, N> {
    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, SszDecodeError> {
        let items = if bytes.is_empty() {
            vec![]
        } else if T::is_ssz_fixed_len() {
            let fixed_len = T::ssz_fixed_len();
            if bytes.len() % fixed_len != 0 {
                return Err(SszDecodeError::InvalidByteLength {
                    len: bytes.len(),
                    expected: bytes.len() / fixed_len * fixed_len,
                });
            }
            bytes
                .chunks(fixed_len)
                .map(T::from_ssz_bytes)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            decode_variable_sized_items(bytes)?
        };

        if items.len() > N::to_usize() {
            return Err(SszDecodeError::ListTooLong {
                len: items.len(),
                max: N::to_usize(),
            });
        }

        Ok(Self {
            vec: items,
            _phantom: PhantomData,
        })
    }

    fn is_ssz_fixed_len() -> bool {
        false
    }
}

impl<T: TreeHash, N: Unsigned> TreeHash for VariableList<T, N> {
    fn tree_hash_type() -> TreeHashType {
        TreeHashType::List
    }

    fn tree_hash_packed_encoding(&self) -> Vec<u8> {
        unreachable!("lists should never be packed")
    }

    fn tree_hash_packing_factor() -> usize {
        unreachable!("lists should never be packed")
    }

    fn tree_hash_root(&self) -> Vec<u8> {
        let root = match T::tree_hash_type() {
            TreeHashType::Basic => {
                let chunk_count =
                    (N::to_usize() + T::tree_hash_packing_factor() - 1) / T::tree_hash_packing_factor();
                tree_hash::merkle_root_of_packed(&self.vec, chunk_count)
            }
            _ => tree_hash::merkle_root_of_items(&self.vec, N::to_usize()),
        };

        mix_in_length(&root, self.len())
    }
}

impl<T: Serialize, N> Serialize for VariableList<T, N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.vec.len()))?;
        for element in &self.vec {
            seq.serialize_element(element)?;
        }
        seq.end()
    }
}

impl<'de, T: Deserialize<'de>, N: Unsigned> Deserialize<'de> for VariableList<T, N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let vec = Vec::<T>::deserialize(deserializer)?;
        Self::new(vec).map_err(|_| {
            serde::de::Error::custom(format!("list exceeds the bound of {}", N::to_usize()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typenum::{U2, U4};

    #[test]
    fn construction_respects_the_bound() {
        assert!(VariableList::<u64, U2>::new(vec![1, 2]).is_ok());
        assert_eq!(
            VariableList::<u64, U2>::new(vec![1, 2, 3]),
            Err(Error::OutOfBounds { i: 3, len: 2 })
        );
    }

    #[test]
    fn push_stops_at_the_bound() {
        let mut list = VariableList::<u64, U2>::default();
        assert!(list.push(1).is_ok());
        assert!(list.push(2).is_ok());
        assert_eq!(list.push(3), Err(Error::ListFull { max: 2 }));
    }

    #[test]
    fn round_trip_fixed_size_elements() {
        let list = VariableList::<u64, U4>::new(vec![0x2222, 0x3333]).expect("within bound");
        let bytes = list.as_ssz_bytes();
        assert_eq!(bytes.len(), 16);
        assert_eq!(
            VariableList::<u64, U4>::from_ssz_bytes(&bytes),
            Ok(list)
        );
    }

    #[test]
    fn decode_enforces_the_bound() {
        let bytes = [0_u8; 40];
        assert_eq!(
            VariableList::<u64, U4>::from_ssz_bytes(&bytes),
            Err(SszDecodeError::ListTooLong { len: 5, max: 4 })
        );
    }

    #[test]
    fn empty_list_is_zero_bytes() {
        let list = VariableList::<u64, U4>::default();
        assert_eq!(list.as_ssz_bytes(), Vec::<u8>::new());
        assert_eq!(VariableList::<u64, U4>::from_ssz_bytes(&[]), Ok(list));
    }

    #[test]
    fn tree_hash_mixes_in_the_length() {
        let list = VariableList::<u64, U4>::new(vec![1, 2]).expect("within bound");

        let mut packed = vec![];
        for value in &[1_u64, 2] {
            packed.extend_from_slice(&value.to_le_bytes());
        }
        let root = tree_hash::merkleize_padded(&packed, 1);

        assert_eq!(list.tree_hash_root(), mix_in_length(&root, 2));
    }
}
