use core::num::NonZeroUsize;

use ethereum_types::{H256, U128, U256};

use crate::utils::encode_items_from_parts;
use crate::SszEncode;

macro_rules! impl_encode_for_uint {
    ($type: ty) => {
        impl SszEncode for $type {
            fn as_ssz_bytes(&self) -> Vec<u8> {
                self.to_le_bytes().to_vec()
            }

            fn is_ssz_fixed_len() -> bool {
                true
            }
        }
    };
}

impl_encode_for_uint!(u8);
impl_encode_for_uint!(u16);
impl_encode_for_uint!(u32);
impl_encode_for_uint!(u64);
impl_encode_for_uint!(usize);

macro_rules! impl_encode_for_u8_array {
    ($size: expr) => {
        impl SszEncode for [u8; $size] {
            fn as_ssz_bytes(&self) -> Vec<u8> {
                self.to_vec()
            }

            fn is_ssz_fixed_len() -> bool {
                true
            }
        }
    };
}

impl_encode_for_u8_array!(4);
impl_encode_for_u8_array!(32);
impl_encode_for_u8_array!(48);
impl_encode_for_u8_array!(96);

impl SszEncode for bool {
    fn as_ssz_bytes(&self) -> Vec<u8> {
        vec![*self as u8]
    }

    fn is_ssz_fixed_len() -> bool {
        true
    }
}

impl SszEncode for NonZeroUsize {
    fn as_ssz_bytes(&self) -> Vec<u8> {
        self.get().as_ssz_bytes()
    }

    fn is_ssz_fixed_len() -> bool {
        <usize as SszEncode>::is_ssz_fixed_len()
    }
}

impl<T: SszEncode> SszEncode for Vec<T> {
    fn as_ssz_bytes(&self) -> Vec<u8> {
        if T::is_ssz_fixed_len() {
            let mut bytes = vec![];
            for element in self {
                bytes.append(&mut element.as_ssz_bytes());
            }
            bytes
        } else {
            let fixed_parts = vec![None; self.len()];
            let variable_parts = self
                .iter()
                .map(SszEncode::as_ssz_bytes)
                .collect::<Vec<_>>();
            encode_items_from_parts(&fixed_parts, &variable_parts)
        }
    }

    fn is_ssz_fixed_len() -> bool {
        false
    }
}

// `Option` is the two-alternative union: a one-byte selector, 0 for the null
// alternative, followed by the value when the selector is 1.
impl<T: SszEncode> SszEncode for Option<T> {
    fn as_ssz_bytes(&self) -> Vec<u8> {
        match self {
            None => vec![0],
            Some(value) => {
                let mut bytes = vec![1];
                bytes.append(&mut value.as_ssz_bytes());
                bytes
            }
        }
    }

    fn is_ssz_fixed_len() -> bool {
        false
    }
}

impl SszEncode for H256 {
    fn as_ssz_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    fn is_ssz_fixed_len() -> bool {
        true
    }
}

impl SszEncode for U256 {
    fn as_ssz_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0; 32];
        self.to_little_endian(&mut bytes);
        bytes
    }

    fn is_ssz_fixed_len() -> bool {
        true
    }
}

impl SszEncode for U128 {
    fn as_ssz_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0; 16];
        self.to_little_endian(&mut bytes);
        bytes
    }

    fn is_ssz_fixed_len() -> bool {
        true
    }
}
