use crate::utils::{big_uint_to_fp, fp_to_big_uint};
use halo2_proofs::halo2curves::bn256::Fr as Fp;
use num_bigint::BigUint;

/// Little endian bytes of `value`, resized to `n`.
///
/// Missing high bytes are zero, extra high bytes are dropped: `decompose_fp_to_bytes(0x1f2f3f, 2) == [0x3f, 0x2f]`.
pub fn decompose_fp_to_bytes(value: Fp, n: usize) -> Vec<u8> {
    let mut bytes = fp_to_big_uint(&value).to_bytes_le();
    bytes.resize(n, 0);
    bytes
}

/// Returns `value >> (8 * n)` computed over the integers
pub fn shift_right_bytes(value: &Fp, n: usize) -> Fp {
    big_uint_to_fp(&(fp_to_big_uint(value) >> (8 * n)))
}

pub fn pow_of_two(by: usize) -> Fp {
    big_uint_to_fp(&(BigUint::from(1u8) << by))
}
