use crate::{SszDecode, SszDecodeError, SszEncode, BYTES_PER_LENGTH_OFFSET};

pub fn ssz_encode<T: SszEncode>(value: &T) -> Vec<u8> {
    value.as_ssz_bytes()
}

pub fn encode_offset(offset: usize) -> Vec<u8> {
    (offset as u32).to_le_bytes().to_vec()
}

pub fn decode_offset(bytes: &[u8]) -> Result<usize, SszDecodeError> {
    if bytes.len() != BYTES_PER_LENGTH_OFFSET {
        return Err(SszDecodeError::InvalidByteLength {
            len: bytes.len(),
            expected: BYTES_PER_LENGTH_OFFSET,
        });
    }

    let mut array = [0; BYTES_PER_LENGTH_OFFSET];
    array.copy_from_slice(bytes);
    Ok(u32::from_le_bytes(array) as usize)
}

/// Assembles the serialization of a composite from the per-child parts.
///
/// `fixed_parts[i]` is `Some(bytes)` for fixed-size children and `None` for
/// variable-size ones; the matching entry of `variable_parts` holds the
/// variable child's payload (and is empty for fixed-size children). Offsets
/// are measured from the start of the composite.
pub fn encode_items_from_parts(
    fixed_parts: &[Option<Vec<u8>>],
    variable_parts: &[Vec<u8>],
) -> Vec<u8> {
    let fixed_region_len: usize = fixed_parts
        .iter()
        .map(|part| match part {
            Some(bytes) => bytes.len(),
            None => BYTES_PER_LENGTH_OFFSET,
        })
        .sum();

    let total_len = fixed_region_len + variable_parts.iter().map(Vec::len).sum::<usize>();
    let mut result = Vec::with_capacity(total_len);

    let mut next_offset = fixed_region_len;
    for (i, part) in fixed_parts.iter().enumerate() {
        match part {
            Some(bytes) => result.extend_from_slice(bytes),
            None => {
                result.extend_from_slice(&encode_offset(next_offset));
                next_offset += variable_parts[i].len();
            }
        }
    }

    for part in variable_parts {
        result.extend_from_slice(part);
    }

    result
}

/// Decodes a homogeneous sequence of variable-size items. The item count is
/// recovered from the first offset; offsets must be monotone and in bounds.
pub fn decode_variable_sized_items<T: SszDecode>(bytes: &[u8]) -> Result<Vec<T>, SszDecodeError> {
    let read_offset = |index: usize| -> Result<usize, SszDecodeError> {
        let start = index * BYTES_PER_LENGTH_OFFSET;
        let offset_bytes = bytes
            .get(start..start + BYTES_PER_LENGTH_OFFSET)
            .ok_or(SszDecodeError::InvalidByteLength {
                len: bytes.len(),
                expected: start + BYTES_PER_LENGTH_OFFSET,
            })?;
        decode_offset(offset_bytes)
    };

    let first_offset = read_offset(0)?;
    if first_offset % BYTES_PER_LENGTH_OFFSET != 0 || first_offset > bytes.len() {
        return Err(SszDecodeError::OutOfBoundsOffset {
            offset: first_offset,
        });
    }

    let item_count = first_offset / BYTES_PER_LENGTH_OFFSET;
    let mut items = Vec::with_capacity(item_count);

    let mut item_start = first_offset;
    for i in 1..=item_count {
        let item_end = if i == item_count {
            bytes.len()
        } else {
            read_offset(i)?
        };

        let item_bytes =
            bytes
                .get(item_start..item_end)
                .ok_or(SszDecodeError::OutOfBoundsOffset { offset: item_end })?;

        items.push(T::from_ssz_bytes(item_bytes)?);
        item_start = item_end;
    }

    Ok(items)
}

/// Field-by-field decoder driven by the derive macros. Register every field
/// type with `next_type` first, then read values in the same order with
/// `deserialize_next`.
pub struct Decoder<'a> {
    bytes: &'a [u8],
    registration_offset: usize,
    fixed_part_offset: usize,
    offsets: Vec<usize>,
    current_offset_index: usize,
}

impl<'a> Decoder<'a> {
    pub fn for_bytes(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            registration_offset: 0,
            fixed_part_offset: 0,
            offsets: vec![],
            current_offset_index: 0,
        }
    }

    pub fn next_type<T: SszDecode>(&mut self) -> Result<(), SszDecodeError> {
        if !T::is_ssz_fixed_len() {
            let offset_bytes = self
                .bytes
                .get(self.registration_offset..self.registration_offset + BYTES_PER_LENGTH_OFFSET)
                .ok_or(SszDecodeError::InvalidByteLength {
                    len: self.bytes.len(),
                    expected: self.registration_offset + BYTES_PER_LENGTH_OFFSET,
                })?;
            self.offsets.push(decode_offset(offset_bytes)?);
        }
        self.registration_offset += T::ssz_fixed_len();
        Ok(())
    }

    pub fn deserialize_next<T: SszDecode>(&mut self) -> Result<T, SszDecodeError> {
        let value = if T::is_ssz_fixed_len() {
            let value_bytes = self
                .bytes
                .get(self.fixed_part_offset..self.fixed_part_offset + T::ssz_fixed_len())
                .ok_or(SszDecodeError::InvalidByteLength {
                    len: self.bytes.len(),
                    expected: self.fixed_part_offset + T::ssz_fixed_len(),
                })?;
            T::from_ssz_bytes(value_bytes)?
        } else {
            let start = *self.offsets.get(self.current_offset_index).ok_or(
                SszDecodeError::InvalidByteLength {
                    len: self.bytes.len(),
                    expected: self.current_offset_index,
                },
            )?;
            let end = self
                .offsets
                .get(self.current_offset_index + 1)
                .copied()
                .unwrap_or_else(|| self.bytes.len());

            let value_bytes = self
                .bytes
                .get(start..end)
                .ok_or(SszDecodeError::OutOfBoundsOffset { offset: end })?;
            let value = T::from_ssz_bytes(value_bytes)?;
            self.current_offset_index += 1;
            value
        };

        self.fixed_part_offset += T::ssz_fixed_len();
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_round_trip() {
        assert_eq!(encode_offset(0), vec![0; 4]);
        assert_eq!(encode_offset(5), vec![5, 0, 0, 0]);
        assert_eq!(decode_offset(&[5, 0, 0, 0]), Ok(5));
        assert!(decode_offset(&[0; 5]).is_err());
    }

    #[test]
    fn parts_assembly_matches_spec_layout() {
        // {a: u32 = 0x01020304, b: list<u8, 4> = [0xaa, 0xbb]}
        let fixed_parts = vec![Some(vec![0x04, 0x03, 0x02, 0x01]), None];
        let variable_parts = vec![vec![], vec![0xaa, 0xbb]];

        assert_eq!(
            encode_items_from_parts(&fixed_parts, &variable_parts),
            vec![0x04, 0x03, 0x02, 0x01, 0x08, 0x00, 0x00, 0x00, 0xaa, 0xbb]
        );
    }

    #[test]
    fn variable_items_recover_from_offsets() {
        let items: Vec<Vec<u8>> = decode_variable_sized_items(&[
            12, 0, 0, 0, 16, 0, 0, 0, 22, 0, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10,
        ])
        .expect("offsets are consistent");

        assert_eq!(items, vec![vec![1, 2, 3, 4], vec![5, 6, 7, 8, 9, 10], vec![]]);
    }

    #[test]
    fn variable_items_reject_bad_offsets() {
        // First offset not a multiple of the offset size.
        assert!(decode_variable_sized_items::<Vec<u8>>(&[5, 0, 0, 0, 1]).is_err());
        // First offset beyond the input.
        assert!(decode_variable_sized_items::<Vec<u8>>(&[88, 0, 0, 0, 1, 2, 3]).is_err());
        // Second offset beyond the input.
        assert!(decode_variable_sized_items::<Vec<u8>>(&[8, 0, 0, 0, 100, 0, 0, 0, 1]).is_err());
        // Decreasing offsets.
        assert!(decode_variable_sized_items::<Vec<u8>>(&[8, 0, 0, 0, 4, 0, 0, 0, 1]).is_err());
    }

    #[test]
    fn decoder_handles_mixed_fields() {
        let mut decoder = Decoder::for_bytes(&[
            1, 13, 0, 0, 0, 255, 255, 255, 255, 16, 0, 0, 0, 3, 2, 3, 1, 0, 2, 0, 3, 0,
        ]);
        decoder.next_type::<bool>().expect("fixed");
        decoder.next_type::<Vec<u8>>().expect("variable");
        decoder.next_type::<u32>().expect("fixed");
        decoder.next_type::<Vec<u16>>().expect("variable");

        assert_eq!(decoder.deserialize_next::<bool>(), Ok(true));
        assert_eq!(decoder.deserialize_next::<Vec<u8>>(), Ok(vec![3, 2, 3]));
        assert_eq!(decoder.deserialize_next::<u32>(), Ok(u32::max_value()));
        assert_eq!(decoder.deserialize_next::<Vec<u16>>(), Ok(vec![1, 2, 3]));
    }

    #[test]
    fn decoder_rejects_truncated_input() {
        let mut decoder = Decoder::for_bytes(&[1]);
        assert!(decoder.deserialize_next::<u8>().is_ok());
        assert!(decoder.deserialize_next::<u8>().is_err());

        let mut decoder = Decoder::for_bytes(&[8, 0, 0, 0, 255, 0, 0, 0]);
        decoder.next_type::<Vec<u8>>().expect("first offset");
        decoder.next_type::<Vec<u8>>().expect("second offset");
        assert!(decoder.deserialize_next::<Vec<u8>>().is_err());
    }
}
