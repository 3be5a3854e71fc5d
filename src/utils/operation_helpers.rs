use halo2_proofs::halo2curves::{bn256::Fr as Fp, group::ff::PrimeField};
use num_bigint::BigUint;

/// Converts a BigUint to a Field Element, reducing modulo the field order
pub fn big_uint_to_fp(big_uint: &BigUint) -> Fp {
    let two_pow_64 = Fp::from(u64::MAX) + Fp::from(1);
    big_uint
        .to_u64_digits()
        .iter()
        .rev()
        .fold(Fp::zero(), |acc, limb| acc * two_pow_64 + Fp::from(*limb))
}

/// Converts a Field Element to a BigUint
pub fn fp_to_big_uint(f: &Fp) -> BigUint {
    BigUint::from_bytes_le(f.to_repr().as_ref())
}

pub fn fp_from_u128(value: u128) -> Fp {
    let two_pow_64 = Fp::from(u64::MAX) + Fp::from(1);
    Fp::from((value >> 64) as u64) * two_pow_64 + Fp::from(value as u64)
}

/// Hex encoding of the little-endian representation, the same bytes the witness codec stores
pub fn fp_to_hex(f: &Fp) -> String {
    hex::encode(f.to_repr())
}

/// Parses a field element from its canonical little-endian representation
pub fn fp_from_bytes(bytes: [u8; 32]) -> Option<Fp> {
    Option::from(Fp::from_repr(bytes))
}
