use integer_sqrt::IntegerSquareRoot;

use crate::error::Error;

// endianness is not configurable
pub fn int_to_bytes(int: u64, length: usize) -> Vec<u8> {
    let mut vec = int.to_le_bytes().to_vec();
    vec.resize(length, 0);
    vec
}

pub fn bytes_to_int(bytes: [u8; 8]) -> u64 {
    u64::from_le_bytes(bytes)
}

pub fn integer_squareroot(n: u64) -> u64 {
    n.integer_sqrt()
}

pub fn xor(left: &[u8], right: &[u8]) -> Result<Vec<u8>, Error> {
    if left.len() != right.len() {
        return Err(Error::IndexOutOfRange);
    }
    Ok(left.iter().zip(right).map(|(a, b)| a ^ b).collect())
}
