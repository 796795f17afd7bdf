use core::num::NonZeroUsize;

use ethereum_types::{H256, U128, U256};

use crate::utils::decode_variable_sized_items;
use crate::{SszDecode, SszDecodeError, MAX_UNION_SELECTOR};

macro_rules! impl_decode_for_uint {
    ($type: ty) => {
        impl SszDecode for $type {
            fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, SszDecodeError> {
                let expected = <Self as SszDecode>::ssz_fixed_len();
                if bytes.len() != expected {
                    return Err(SszDecodeError::InvalidByteLength {
                        len: bytes.len(),
                        expected,
                    });
                }

                let mut array = [0; core::mem::size_of::<$type>()];
                array.copy_from_slice(bytes);
                Ok(<$type>::from_le_bytes(array))
            }

            fn is_ssz_fixed_len() -> bool {
                true
            }

            fn ssz_fixed_len() -> usize {
                core::mem::size_of::<$type>()
            }
        }
    };
}

impl_decode_for_uint!(u8);
impl_decode_for_uint!(u16);
impl_decode_for_uint!(u32);
impl_decode_for_uint!(u64);
impl_decode_for_uint!(usize);

macro_rules! impl_decode_for_u8_array {
    ($size: expr) => {
        impl SszDecode for [u8; $size] {
            fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, SszDecodeError> {
                if bytes.len() != $size {
                    return Err(SszDecodeError::InvalidByteLength {
                        len: bytes.len(),
                        expected: $size,
                    });
                }

                let mut array = [0; $size];
                array.copy_from_slice(bytes);
                Ok(array)
            }

            fn is_ssz_fixed_len() -> bool {
                true
            }

            fn ssz_fixed_len() -> usize {
                $size
            }
        }
    };
}

impl_decode_for_u8_array!(4);
impl_decode_for_u8_array!(32);
impl_decode_for_u8_array!(48);
impl_decode_for_u8_array!(96);

impl SszDecode for bool {
    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, SszDecodeError> {
        match bytes {
            [0] => Ok(false),
            [1] => Ok(true),
            [byte] => Err(SszDecodeError::BytesInvalid(format!(
                "{} is not a valid boolean",
                byte
            ))),
            _ => Err(SszDecodeError::InvalidByteLength {
                len: bytes.len(),
                expected: 1,
            }),
        }
    }

    fn is_ssz_fixed_len() -> bool {
        true
    }

    fn ssz_fixed_len() -> usize {
        1
    }
}

impl SszDecode for NonZeroUsize {
    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, SszDecodeError> {
        let value = usize::from_ssz_bytes(bytes)?;
        NonZeroUsize::new(value).ok_or_else(|| {
            SszDecodeError::BytesInvalid("NonZeroUsize cannot be zero".to_string())
        })
    }

    fn is_ssz_fixed_len() -> bool {
        <usize as SszDecode>::is_ssz_fixed_len()
    }

    fn ssz_fixed_len() -> usize {
        <usize as SszDecode>::ssz_fixed_len()
    }
}

impl<T: SszDecode> SszDecode for Vec<T> {
    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, SszDecodeError> {
        if bytes.is_empty() {
            return Ok(vec![]);
        }

        if !T::is_ssz_fixed_len() {
            return decode_variable_sized_items(bytes);
        }

        let fixed_len = T::ssz_fixed_len();
        if bytes.len() % fixed_len != 0 {
            return Err(SszDecodeError::InvalidByteLength {
                len: bytes.len(),
                expected: bytes.len() / fixed_len * fixed_len,
            });
        }

        bytes.chunks(fixed_len).map(T::from_ssz_bytes).collect()
    }

    fn is_ssz_fixed_len() -> bool {
        false
    }
}

impl<T: SszDecode> SszDecode for Option<T> {
    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, SszDecodeError> {
        let (selector, value_bytes) = bytes.split_first().ok_or_else(|| {
            SszDecodeError::InvalidByteLength {
                len: 0,
                expected: 1,
            }
        })?;

        match selector {
            0 if value_bytes.is_empty() => Ok(None),
            0 => Err(SszDecodeError::BytesInvalid(
                "null union alternative carries a payload".to_string(),
            )),
            1 => Ok(Some(T::from_ssz_bytes(value_bytes)?)),
            selector if *selector > MAX_UNION_SELECTOR => {
                Err(SszDecodeError::UnionSelectorInvalid(*selector))
            }
            selector => Err(SszDecodeError::BytesInvalid(format!(
                "union selector {} has no alternative",
                selector
            ))),
        }
    }

    fn is_ssz_fixed_len() -> bool {
        false
    }
}

impl SszDecode for H256 {
    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, SszDecodeError> {
        if bytes.len() != 32 {
            return Err(SszDecodeError::InvalidByteLength {
                len: bytes.len(),
                expected: 32,
            });
        }
        Ok(H256::from_slice(bytes))
    }

    fn is_ssz_fixed_len() -> bool {
        true
    }

    fn ssz_fixed_len() -> usize {
        32
    }
}

impl SszDecode for U256 {
    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, SszDecodeError> {
        if bytes.len() != 32 {
            return Err(SszDecodeError::InvalidByteLength {
                len: bytes.len(),
                expected: 32,
            });
        }
        Ok(U256::from_little_endian(bytes))
    }

    fn is_ssz_fixed_len() -> bool {
        true
    }

    fn ssz_fixed_len() -> usize {
        32
    }
}

impl SszDecode for U128 {
    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, SszDecodeError> {
        if bytes.len() != 16 {
            return Err(SszDecodeError::InvalidByteLength {
                len: bytes.len(),
                expected: 16,
            });
        }
        Ok(U128::from_little_endian(bytes))
    }

    fn is_ssz_fixed_len() -> bool {
        true
    }

    fn ssz_fixed_len() -> usize {
        16
    }
}
