use ssz_new::{BitList, FixedVector, SszDecode, SszDecodeError, SszEncode, VariableList};
use ssz_new_derive::{SszDecode, SszEncode};
use tree_hash::TreeHash;
use tree_hash_derive::TreeHash;
use typenum::{U4, U8};

#[derive(Debug, PartialEq, Clone, Default, SszEncode, SszDecode, TreeHash)]
struct FixedOnly {
    a: u64,
    b: bool,
    c: [u8; 4],
}

#[derive(Debug, PartialEq, SszEncode, SszDecode, TreeHash)]
struct Mixed {
    a: u32,
    b: VariableList<u8, U4>,
}

#[derive(Debug, PartialEq, SszEncode, SszDecode, TreeHash)]
struct Nested {
    inner: Mixed,
    flag: bool,
    numbers: VariableList<u64, U8>,
    bits: BitList<U8>,
}

#[test]
fn fixed_size_containers_have_no_offsets() {
    let value = FixedOnly {
        a: 1,
        b: true,
        c: [9, 9, 9, 9],
    };

    let bytes = value.as_ssz_bytes();
    assert_eq!(bytes.len(), 13);
    assert_eq!(bytes[0], 1);
    assert_eq!(bytes[8], 1);
    assert_eq!(&bytes[9..], &[9, 9, 9, 9]);

    assert_eq!(FixedOnly::from_ssz_bytes(&bytes), Ok(value));
    assert!(<FixedOnly as SszEncode>::is_ssz_fixed_len());
    assert_eq!(<FixedOnly as SszDecode>::ssz_fixed_len(), 13);
}

#[test]
fn variable_size_fields_are_offset_encoded() {
    // {a: uint32 = 0x01020304, b: list<uint8, 4> = [0xaa, 0xbb]}
    let value = Mixed {
        a: 0x0102_0304,
        b: VariableList::new(vec![0xaa, 0xbb]).expect("within bound"),
    };

    assert_eq!(
        value.as_ssz_bytes(),
        vec![0x04, 0x03, 0x02, 0x01, 0x08, 0x00, 0x00, 0x00, 0xaa, 0xbb]
    );

    let decoded =
        Mixed::from_ssz_bytes(&[0x04, 0x03, 0x02, 0x01, 0x08, 0x00, 0x00, 0x00, 0xaa, 0xbb])
            .expect("the bytes are canonical");
    assert_eq!(decoded, value);

    assert!(!<Mixed as SszEncode>::is_ssz_fixed_len());
}

#[test]
fn nested_containers_round_trip() {
    let mut bits = BitList::<U8>::with_capacity(5).expect("within bound");
    bits.set(0, true).expect("in range");
    bits.set(4, true).expect("in range");

    let value = Nested {
        inner: Mixed {
            a: 7,
            b: VariableList::new(vec![1]).expect("within bound"),
        },
        flag: true,
        numbers: VariableList::new(vec![3, 4, 5]).expect("within bound"),
        bits,
    };

    let bytes = value.as_ssz_bytes();
    assert_eq!(Nested::from_ssz_bytes(&bytes), Ok(value));
}

#[test]
fn truncated_containers_are_rejected() {
    let value = Mixed {
        a: 1,
        b: VariableList::new(vec![1, 2, 3]).expect("within bound"),
    };

    let bytes = value.as_ssz_bytes();
    assert!(Mixed::from_ssz_bytes(&bytes[..bytes.len() - 4]).is_err());
    assert!(Mixed::from_ssz_bytes(&[]).is_err());
}

#[test]
fn list_bounds_are_enforced_through_containers() {
    // 5 bytes in a list bounded by 4.
    let bytes = vec![0x00, 0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 1, 2, 3, 4, 5];
    assert_eq!(
        Mixed::from_ssz_bytes(&bytes),
        Err(SszDecodeError::ListTooLong { len: 5, max: 4 })
    );
}

#[test]
fn fixed_vectors_of_containers_round_trip() {
    let vector: FixedVector<FixedOnly, typenum::U2> = FixedVector::from(vec![
        FixedOnly {
            a: 1,
            b: false,
            c: [0; 4],
        },
        FixedOnly {
            a: 2,
            b: true,
            c: [1; 4],
        },
    ]);

    let bytes = vector.as_ssz_bytes();
    assert_eq!(bytes.len(), 26);
    assert_eq!(
        <FixedVector<FixedOnly, typenum::U2>>::from_ssz_bytes(&bytes),
        Ok(vector)
    );
}

#[test]
fn container_tree_hash_is_the_merkleized_field_roots() {
    let value = FixedOnly {
        a: 1,
        b: false,
        c: [0; 4],
    };

    let mut leaves = vec![];
    leaves.extend_from_slice(&value.a.tree_hash_root());
    leaves.extend_from_slice(&value.b.tree_hash_root());
    leaves.extend_from_slice(&value.c.tree_hash_root());

    assert_eq!(
        value.tree_hash_root(),
        tree_hash::merkleize_padded(&leaves, 0)
    );
}
