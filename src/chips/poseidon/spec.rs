//! Specification for width 3, rate 2 Poseidon using the BN256 curve.
//! Patterned after [halo2_gadgets::poseidon::primitives::P128Pow5T3]

use halo2_gadgets::poseidon::primitives::{generate_constants, Spec};
use halo2_proofs::arithmetic::Field;
use halo2_proofs::halo2curves::bn256::Fr as Fp;
use std::sync::OnceLock;

pub const WIDTH: usize = 3;
pub const RATE: usize = 2;

pub(crate) type Mds<Fp, const T: usize> = [[Fp; T]; T];

type Constants = (Vec<[Fp; WIDTH]>, Mds<Fp, WIDTH>, Mds<Fp, WIDTH>);

// Grain LFSR output, generated once per process
static CONSTANTS: OnceLock<Constants> = OnceLock::new();

#[derive(Debug, Clone, Copy)]
pub struct PoseidonSpec;

impl Spec<Fp, WIDTH, RATE> for PoseidonSpec {
    fn full_rounds() -> usize {
        8
    }

    // Pow5Chip requires an even number of partial rounds
    fn partial_rounds() -> usize {
        56
    }

    fn sbox(val: Fp) -> Fp {
        val.pow_vartime(&[5])
    }

    fn secure_mds() -> usize {
        0
    }

    fn constants() -> Constants {
        CONSTANTS
            .get_or_init(generate_constants::<Fp, Self, WIDTH, RATE>)
            .clone()
    }
}
