//! Poseidon over cells, wrapping the `halo2_gadgets` Pow5 chip.
use halo2_gadgets::poseidon::{primitives::*, Hash, Pow5Chip, Pow5Config};
use halo2_proofs::{
    circuit::{AssignedCell, Layouter},
    halo2curves::bn256::Fr as Fp,
    plonk::{Advice, Column, ConstraintSystem, Error, Fixed},
};
use std::marker::PhantomData;

#[derive(Debug, Clone)]
pub struct PoseidonConfig<const WIDTH: usize, const RATE: usize> {
    pow5_config: Pow5Config<Fp, WIDTH, RATE>,
}

/// Hashes assigned cells with the permutation described by `S`.
///
/// The input length is a parameter of [PoseidonChip::hash], so one configuration serves the merkle nodes, the leaves,
/// the batch commitment and the sequence hashes.
#[derive(Debug, Clone)]
pub struct PoseidonChip<S: Spec<Fp, WIDTH, RATE>, const WIDTH: usize, const RATE: usize> {
    config: PoseidonConfig<WIDTH, RATE>,
    _marker: PhantomData<S>,
}

impl<S: Spec<Fp, WIDTH, RATE>, const WIDTH: usize, const RATE: usize> PoseidonChip<S, WIDTH, RATE> {
    pub fn construct(config: PoseidonConfig<WIDTH, RATE>) -> Self {
        Self {
            config,
            _marker: PhantomData,
        }
    }

    /// `state` and `partial_sbox` columns get equality enabled by the Pow5 chip
    pub fn configure(
        meta: &mut ConstraintSystem<Fp>,
        state: [Column<Advice>; WIDTH],
        partial_sbox: Column<Advice>,
        rc_a: [Column<Fixed>; WIDTH],
        rc_b: [Column<Fixed>; WIDTH],
    ) -> PoseidonConfig<WIDTH, RATE> {
        let pow5_config = Pow5Chip::configure::<S>(meta, state, partial_sbox, rc_a, rc_b);

        PoseidonConfig { pow5_config }
    }

    /// `H(input_cells)` with a `ConstantLength<L>` domain
    pub fn hash<const L: usize>(
        &self,
        mut layouter: impl Layouter<Fp>,
        input_cells: [AssignedCell<Fp, Fp>; L],
    ) -> Result<AssignedCell<Fp, Fp>, Error> {
        let pow5_chip = Pow5Chip::construct(self.config.pow5_config.clone());

        let hasher = Hash::<_, _, S, ConstantLength<L>, WIDTH, RATE>::init(
            pow5_chip,
            layouter.namespace(|| "hasher"),
        )?;
        hasher.hash(layouter.namespace(|| "hash"), input_cells)
    }

    /// Hashes a variable length sequence of cells by chaining two-to-one hashes.
    ///
    /// `length` must hold the number of inputs, it seeds the chain:
    /// `acc_0 = length`, `acc_{i+1} = H(acc_i, input_i)`.
    /// Mirrors [crate::utils::hash::poseidon_sequence].
    pub fn hash_sequence(
        &self,
        mut layouter: impl Layouter<Fp>,
        length: AssignedCell<Fp, Fp>,
        inputs: &[AssignedCell<Fp, Fp>],
    ) -> Result<AssignedCell<Fp, Fp>, Error> {
        inputs
            .iter()
            .enumerate()
            .try_fold(length, |acc, (i, input)| {
                self.hash(
                    layouter.namespace(|| format!("absorb element {}", i)),
                    [acc, input.clone()],
                )
            })
    }
}
