use core::marker::PhantomData;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tree_hash::{mix_in_length, TreeHash, TreeHashType};
use typenum::Unsigned;

use crate::types::Error;
use crate::{SszDecode, SszDecodeError, SszEncode};

/// Length markers distinguishing `BitList` from `BitVector`.
pub mod length {
    use core::marker::PhantomData;

    #[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
    pub struct Variable<N> {
        _phantom: PhantomData<N>,
    }

    #[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
    pub struct Fixed<N> {
        _phantom: PhantomData<N>,
    }
}

pub trait BitfieldBehaviour: Clone {}

impl<N: Unsigned + Clone> BitfieldBehaviour for length::Variable<N> {}
impl<N: Unsigned + Clone> BitfieldBehaviour for length::Fixed<N> {}

pub type BitList<N> = Bitfield<length::Variable<N>>;
pub type BitVector<N> = Bitfield<length::Fixed<N>>;

/// A packed bitfield. Bit `i` lives at `bytes[i / 8] >> (i % 8)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Bitfield<T> {
    bytes: Vec<u8>,
    len: usize,
    _phantom: PhantomData<T>,
}

fn bytes_for_bit_len(bit_len: usize) -> usize {
    core::cmp::max(1, (bit_len + 7) / 8)
}

impl<N: Unsigned + Clone> Bitfield<length::Variable<N>> {
    /// An all-zero bitlist of `len` bits.
    pub fn with_capacity(len: usize) -> Result<Self, Error> {
        if len > N::to_usize() {
            return Err(Error::OutOfBounds {
                i: len,
                len: N::to_usize(),
            });
        }

        Ok(Self {
            bytes: vec![0; bytes_for_bit_len(len)],
            len,
            _phantom: PhantomData,
        })
    }

    pub fn max_len() -> usize {
        N::to_usize()
    }

    /// The wire form: the payload bits followed by a single delimiter bit
    /// marking the length.
    pub fn into_bytes(self) -> Vec<u8> {
        let len = self.len;
        let mut bytes = self.bytes;
        bytes.resize(bytes_for_bit_len(len + 1), 0);
        bytes[len / 8] |= 1 << (len % 8);
        bytes
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, Error> {
        let last_byte = match bytes.last() {
            Some(0) | None => return Err(Error::MissingLengthInformation),
            Some(byte) => *byte,
        };

        // The delimiter is the highest set bit; it must land in the final
        // byte for the encoding to be canonical.
        let delimiter = (bytes.len() - 1) * 8 + (7 - last_byte.leading_zeros() as usize);
        let len = delimiter;

        if len > N::to_usize() {
            return Err(Error::OutOfBounds {
                i: len,
                len: N::to_usize(),
            });
        }
        if bytes.len() != bytes_for_bit_len(delimiter + 1) {
            return Err(Error::InvalidByteCount {
                given: bytes.len(),
                expected: bytes_for_bit_len(delimiter + 1),
            });
        }

        let mut payload = bytes;
        payload[delimiter / 8] &= !(1 << (delimiter % 8));
        payload.resize(bytes_for_bit_len(len), 0);

        Ok(Self {
            bytes: payload,
            len,
            _phantom: PhantomData,
        })
    }

    /// True when every set bit of `self` is also set in `other`.
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.len == other.len
            && self
                .bytes
                .iter()
                .zip(other.bytes.iter())
                .all(|(a, b)| a & !b == 0)
    }

    pub fn union(&self, other: &Self) -> Option<Self> {
        if self.len != other.len {
            return None;
        }
        let bytes = self
            .bytes
            .iter()
            .zip(other.bytes.iter())
            .map(|(a, b)| a | b)
            .collect();
        Some(Self {
            bytes,
            len: self.len,
            _phantom: PhantomData,
        })
    }
}

impl<N: Unsigned + Clone> Bitfield<length::Fixed<N>> {
    /// An all-zero bitvector of exactly `N` bits.
    pub fn new() -> Self {
        Self {
            bytes: vec![0; bytes_for_bit_len(N::to_usize())],
            len: N::to_usize(),
            _phantom: PhantomData,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, Error> {
        let len = N::to_usize();
        if bytes.len() != bytes_for_bit_len(len) {
            return Err(Error::InvalidByteCount {
                given: bytes.len(),
                expected: bytes_for_bit_len(len),
            });
        }

        // Bits past `N` in the final byte must be clear.
        if len % 8 != 0 && bytes[len / 8] >> (len % 8) != 0 {
            return Err(Error::ExcessBits);
        }

        Ok(Self {
            bytes,
            len,
            _phantom: PhantomData,
        })
    }
}

impl<N: Unsigned + Clone> Default for Bitfield<length::Fixed<N>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: BitfieldBehaviour> Bitfield<T> {
    pub fn set(&mut self, i: usize, value: bool) -> Result<(), Error> {
        if i >= self.len {
            return Err(Error::OutOfBounds { i, len: self.len });
        }

        if value {
            self.bytes[i / 8] |= 1 << (i % 8);
        } else {
            self.bytes[i / 8] &= !(1 << (i % 8));
        }
        Ok(())
    }

    pub fn get(&self, i: usize) -> Result<bool, Error> {
        if i >= self.len {
            return Err(Error::OutOfBounds { i, len: self.len });
        }
        Ok(self.bytes[i / 8] & (1 << (i % 8)) != 0)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_zero(&self) -> bool {
        self.bytes.iter().all(|byte| *byte == 0)
    }

    pub fn num_set_bits(&self) -> usize {
        self.bytes.iter().map(|byte| byte.count_ones() as usize).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| self.bytes[i / 8] & (1 << (i % 8)) != 0)
    }

    fn payload_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl<N: Unsigned + Clone> SszEncode for Bitfield<length::Variable<N>> {
    fn as_ssz_bytes(&self) -> Vec<u8> {
        self.clone().into_bytes()
    }

    fn is_ssz_fixed_len() -> bool {
        false
    }
}

impl<N: Unsigned + Clone> SszDecode for Bitfield<length::Variable<N>> {
    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, SszDecodeError> {
        Self::from_bytes(bytes.to_vec())
            .map_err(|error| SszDecodeError::BytesInvalid(format!("invalid bitlist: {:?}", error)))
    }

    fn is_ssz_fixed_len() -> bool {
        false
    }
}

impl<N: Unsigned + Clone> SszEncode for Bitfield<length::Fixed<N>> {
    fn as_ssz_bytes(&self) -> Vec<u8> {
        self.clone().into_bytes()
    }

    fn is_ssz_fixed_len() -> bool {
        true
    }
}

impl<N: Unsigned + Clone> SszDecode for Bitfield<length::Fixed<N>> {
    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, SszDecodeError> {
        Self::from_bytes(bytes.to_vec()).map_err(|error| {
            SszDecodeError::BytesInvalid(format!("invalid bitvector: {:?}", error))
        })
    }

    fn is_ssz_fixed_len() -> bool {
        true
    }

    fn ssz_fixed_len() -> usize {
        bytes_for_bit_len(N::to_usize())
    }
}

impl<N: Unsigned + Clone> TreeHash for Bitfield<length::Variable<N>> {
    fn tree_hash_type() -> TreeHashType {
        TreeHashType::List
    }

    fn tree_hash_packed_encoding(&self) -> Vec<u8> {
        unreachable!("bitlists should never be packed")
    }

    fn tree_hash_packing_factor() -> usize {
        unreachable!("bitlists should never be packed")
    }

    fn tree_hash_root(&self) -> Vec<u8> {
        let chunk_count = (N::to_usize() + 255) / 256;
        let root = tree_hash::merkleize_padded(self.payload_bytes(), chunk_count);
        mix_in_length(&root, self.len)
    }
}

impl<N: Unsigned + Clone> TreeHash for Bitfield<length::Fixed<N>> {
    fn tree_hash_type() -> TreeHashType {
        TreeHashType::Vector
    }

    fn tree_hash_packed_encoding(&self) -> Vec<u8> {
        unreachable!("bitvectors should never be packed")
    }

    fn tree_hash_packing_factor() -> usize {
        unreachable!("bitvectors should never be packed")
    }

    fn tree_hash_root(&self) -> Vec<u8> {
        let chunk_count = (N::to_usize() + 255) / 256;
        tree_hash::merkleize_padded(self.payload_bytes(), chunk_count)
    }
}

impl<T: BitfieldBehaviour> Serialize for Bitfield<T>
where
    Bitfield<T>: SszEncode,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(self.as_ssz_bytes())))
    }
}

impl<'de, T: BitfieldBehaviour> Deserialize<'de> for Bitfield<T>
where
    Bitfield<T>: SszDecode,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let string = String::deserialize(deserializer)?;
        let stripped = string.trim_start_matches("0x");
        let bytes = hex::decode(stripped).map_err(serde::de::Error::custom)?;
        Self::from_ssz_bytes(&bytes)
            .map_err(|error| serde::de::Error::custom(format!("{:?}", error)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typenum::{U0, U1, U16, U8};

    #[test]
    fn empty_bitlist_is_a_lone_delimiter() {
        assert_eq!(
            BitList::<U0>::with_capacity(0).expect("zero fits").as_ssz_bytes(),
            vec![0b0000_0001],
        );
        assert_eq!(
            BitList::<U1>::with_capacity(1).expect("one fits").as_ssz_bytes(),
            vec![0b0000_0010],
        );
    }

    #[test]
    fn capacity_beyond_the_bound_is_rejected() {
        assert!(BitList::<U1>::with_capacity(2).is_err());
    }

    #[test]
    fn eight_bit_list_spills_the_delimiter() {
        let mut list = BitList::<U8>::with_capacity(8).expect("eight fits");
        for i in 0..4 {
            list.set(i, true).expect("in range");
        }
        assert_eq!(list.as_ssz_bytes(), vec![0b0000_1111, 0b0000_0001]);

        let seven = BitList::<U8>::with_capacity(7).expect("seven fits");
        assert_eq!(seven.as_ssz_bytes(), vec![0b1000_0000]);
    }

    #[test]
    fn wire_round_trip_preserves_bits_and_length() {
        let mut list = BitList::<U16>::with_capacity(11).expect("eleven fits");
        list.set(0, true).expect("in range");
        list.set(10, true).expect("in range");

        let decoded =
            BitList::<U16>::from_ssz_bytes(&list.as_ssz_bytes()).expect("canonical bytes");
        assert_eq!(decoded, list);
        assert_eq!(decoded.len(), 11);
    }

    #[test]
    fn decode_rejects_oversized_and_empty_input() {
        // 17 bits of payload when the bound is 16.
        assert!(BitList::<U16>::from_ssz_bytes(&[0xff, 0xff, 0b0000_0010]).is_err());
        assert!(BitList::<U16>::from_ssz_bytes(&[]).is_err());
        // Trailing zero byte cannot hold the delimiter.
        assert!(BitList::<U16>::from_ssz_bytes(&[0b0000_0001, 0]).is_err());
    }

    #[test]
    fn set_and_get_respect_bounds() {
        let mut list = BitList::<U8>::with_capacity(3).expect("three fits");
        assert!(list.set(2, true).is_ok());
        assert_eq!(list.get(2), Ok(true));
        assert!(list.set(3, true).is_err());
        assert!(list.get(3).is_err());
        assert_eq!(list.num_set_bits(), 1);
    }

    #[test]
    fn subset_checks() {
        let mut small = BitList::<U8>::with_capacity(4).expect("four fits");
        let mut big = BitList::<U8>::with_capacity(4).expect("four fits");
        small.set(1, true).expect("in range");
        big.set(1, true).expect("in range");
        big.set(2, true).expect("in range");

        assert!(small.is_subset_of(&big));
        assert!(!big.is_subset_of(&small));
        assert!(small.is_subset_of(&small));
    }

    #[test]
    fn bitvector_has_fixed_width() {
        let vector = BitVector::<U8>::new();
        assert_eq!(vector.as_ssz_bytes(), vec![0]);
        assert_eq!(<BitVector<U8> as SszDecode>::ssz_fixed_len(), 1);

        let mut vector = BitVector::<U8>::new();
        vector.set(7, true).expect("in range");
        assert_eq!(vector.as_ssz_bytes(), vec![0b1000_0000]);
    }

    #[test]
    fn bitvector_rejects_excess_bits() {
        // Bit 4 set when N = 4.
        assert!(BitVector::<typenum::U4>::from_ssz_bytes(&[0b0001_0000]).is_err());
        assert!(BitVector::<typenum::U4>::from_ssz_bytes(&[0b0000_1111]).is_ok());
    }

    #[test]
    fn bitlist_tree_hash_mixes_in_length() {
        let mut list = BitList::<U8>::with_capacity(5).expect("five fits");
        list.set(1, true).expect("in range");

        let root = tree_hash::merkleize_padded(&[0b0000_0010], 1);
        assert_eq!(list.tree_hash_root(), mix_in_length(&root, 5));
    }
}
