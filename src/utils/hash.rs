use crate::chips::poseidon::spec::{PoseidonSpec, RATE, WIDTH};
use halo2_gadgets::poseidon::primitives::{self as poseidon, ConstantLength};
use halo2_proofs::halo2curves::bn256::Fr as Fp;

pub fn poseidon_hash<const L: usize>(inputs: [Fp; L]) -> Fp {
    poseidon::Hash::<Fp, PoseidonSpec, ConstantLength<L>, WIDTH, RATE>::init().hash(inputs)
}

pub fn poseidon_node(left: Fp, right: Fp) -> Fp {
    poseidon_hash([left, right])
}

/// Variable length hash: the sequence length seeds a chain of two-to-one hashes
pub fn poseidon_sequence(inputs: &[Fp]) -> Fp {
    inputs
        .iter()
        .fold(Fp::from(inputs.len() as u64), |acc, input| {
            poseidon_hash([acc, *input])
        })
}
