use crate::chips::poseidon::hash::{PoseidonChip, PoseidonConfig};
use crate::chips::poseidon::spec::{PoseidonSpec, RATE, WIDTH};
use crate::params::TREE_DEPTH;
use crate::utils::fp_to_big_uint;
use halo2_proofs::circuit::{AssignedCell, Layouter, Value};
use halo2_proofs::halo2curves::bn256::Fr as Fp;
use halo2_proofs::plonk::{Advice, Column, ConstraintSystem, Error, Expression, Selector};
use halo2_proofs::poly::Rotation;

#[derive(Debug, Clone)]
pub struct MerkleConfig {
    pub advice: [Column<Advice>; 3],
    pub bool_selector: Selector,
    pub swap_selector: Selector,
    pub decompose_selector: Selector,
    pub poseidon_config: PoseidonConfig<WIDTH, RATE>,
}

/// Chip that recomputes the root of the account tree from a leaf, its siblings and the path bits.
///
/// Path bits are the little-endian expansion of the account index: bit `i` drives level `i`,
/// a zero bit places the current node on the left.
#[derive(Debug, Clone)]
pub struct MerkleChip {
    config: MerkleConfig,
}

impl MerkleChip {
    pub fn construct(config: MerkleConfig) -> Self {
        Self { config }
    }

    pub fn configure(
        meta: &mut ConstraintSystem<Fp>,
        advice: [Column<Advice>; 3],
        poseidon_config: PoseidonConfig<WIDTH, RATE>,
    ) -> MerkleConfig {
        let [col_a, col_b, col_c] = advice;

        // create selectors
        let bool_selector = meta.selector();
        let swap_selector = meta.selector();
        let decompose_selector = meta.selector();

        for col in advice.iter() {
            meta.enable_equality(*col);
        }

        // Enforces that swap_bit is either a 0 or 1 when the bool selector is enabled
        // s * swap_bit * (1 - swap_bit) = 0
        meta.create_gate("bool constraint", |meta| {
            let s = meta.query_selector(bool_selector);
            let swap_bit = meta.query_advice(col_c, Rotation::cur());
            vec![s * swap_bit.clone() * (Expression::Constant(Fp::from(1)) - swap_bit)]
        });

        // Enforces that the running sum of the index bits, most significant first, doubles and adds the current bit
        // s * (acc_prev * 2 + bit - acc_cur) = 0
        meta.create_gate("index decomposition", |meta| {
            let s = meta.query_selector(decompose_selector);
            let acc_prev = meta.query_advice(col_a, Rotation::prev());
            let acc_cur = meta.query_advice(col_a, Rotation::cur());
            let bit = meta.query_advice(col_c, Rotation::cur());
            vec![s * (acc_prev * Expression::Constant(Fp::from(2)) + bit - acc_cur)]
        });

        // Enforces that if the swap_bit is on, the columns will be swapped.
        // This applies only when the swap selector is enabled
        meta.create_gate("swap constraint", |meta| {
            let s = meta.query_selector(swap_selector);
            let swap_bit = meta.query_advice(col_c, Rotation::cur());
            let hash_l_cur = meta.query_advice(col_a, Rotation::cur());
            let hash_r_cur = meta.query_advice(col_b, Rotation::cur());
            let hash_l_next = meta.query_advice(col_a, Rotation::next());
            let hash_r_next = meta.query_advice(col_b, Rotation::next());

            vec![
                s.clone()
                    * (hash_l_next
                        - hash_l_cur.clone()
                        - swap_bit.clone() * (hash_r_cur.clone() - hash_l_cur.clone())),
                s * (hash_r_next - hash_r_cur.clone() - swap_bit * (hash_l_cur - hash_r_cur)),
            ]
        });

        MerkleConfig {
            advice,
            bool_selector,
            swap_selector,
            decompose_selector,
            poseidon_config,
        }
    }

    /// Decomposes `index` into `TREE_DEPTH` boolean cells, returned least significant first.
    /// The index is constrained to fit in `TREE_DEPTH` bits.
    pub fn decompose_index(
        &self,
        mut layouter: impl Layouter<Fp>,
        index: &AssignedCell<Fp, Fp>,
    ) -> Result<Vec<AssignedCell<Fp, Fp>>, Error> {
        layouter.assign_region(
            || "decompose account index",
            |mut region| {
                let mut acc = region.assign_advice_from_constant(
                    || "running sum starts at 0",
                    self.config.advice[0],
                    0,
                    Fp::zero(),
                )?;

                let index_bits: Value<u64> = index
                    .value()
                    .map(|v| fp_to_big_uint(v).iter_u64_digits().next().unwrap_or(0));

                let mut bits = Vec::with_capacity(TREE_DEPTH);
                for row in 1..=TREE_DEPTH {
                    let shift = TREE_DEPTH - row;
                    self.config.bool_selector.enable(&mut region, row)?;
                    self.config.decompose_selector.enable(&mut region, row)?;

                    let bit = region.assign_advice(
                        || format!("bit {}", shift),
                        self.config.advice[2],
                        row,
                        || index_bits.map(|i| Fp::from((i >> shift) & 1)),
                    )?;
                    acc = region.assign_advice(
                        || "running sum",
                        self.config.advice[0],
                        row,
                        || index_bits.map(|i| Fp::from(i >> shift)),
                    )?;
                    bits.push(bit);
                }

                region.constrain_equal(acc.cell(), index.cell())?;

                bits.reverse();
                Ok(bits)
            },
        )
    }

    /// Orders the current node and its sibling according to the path bit. Returns `(left, right)`.
    pub fn swap_hashes_per_level(
        &self,
        mut layouter: impl Layouter<Fp>,
        current: &AssignedCell<Fp, Fp>,
        sibling: &AssignedCell<Fp, Fp>,
        bit: &AssignedCell<Fp, Fp>,
    ) -> Result<(AssignedCell<Fp, Fp>, AssignedCell<Fp, Fp>), Error> {
        layouter.assign_region(
            || "swap hashes",
            |mut region| {
                // Row 0
                self.config.swap_selector.enable(&mut region, 0)?;
                let l1 = current.copy_advice(
                    || "copy hash cell from previous level",
                    &mut region,
                    self.config.advice[0],
                    0,
                )?;
                let r1 = sibling.copy_advice(|| "copy sibling", &mut region, self.config.advice[1], 0)?;
                let swap_bit = bit.copy_advice(|| "copy path bit", &mut region, self.config.advice[2], 0)?;

                // if swap_bit is 0 return (l1, r1) else return (r1, l1)
                let ordered = swap_bit
                    .value()
                    .zip(l1.value())
                    .zip(r1.value())
                    .map(|((bit, l), r)| if *bit == Fp::zero() { (*l, *r) } else { (*r, *l) });

                // Row 1
                let left = region.assign_advice(
                    || "assign left hash to be hashed",
                    self.config.advice[0],
                    1,
                    || ordered.map(|(l, _)| l),
                )?;
                let right = region.assign_advice(
                    || "assign right hash to be hashed",
                    self.config.advice[1],
                    1,
                    || ordered.map(|(_, r)| r),
                )?;

                Ok((left, right))
            },
        )
    }

    /// Hashes `leaf` up to the root along `siblings` (leaf level first) and `bits` (least significant first)
    pub fn compute_root(
        &self,
        mut layouter: impl Layouter<Fp>,
        leaf: &AssignedCell<Fp, Fp>,
        siblings: &[AssignedCell<Fp, Fp>],
        bits: &[AssignedCell<Fp, Fp>],
    ) -> Result<AssignedCell<Fp, Fp>, Error> {
        let poseidon_chip =
            PoseidonChip::<PoseidonSpec, WIDTH, RATE>::construct(self.config.poseidon_config.clone());

        let mut current = leaf.clone();
        for (level, (sibling, bit)) in siblings.iter().zip(bits.iter()).enumerate() {
            let (left, right) = self.swap_hashes_per_level(
                layouter.namespace(|| format!("swap level {}", level)),
                &current,
                sibling,
                bit,
            )?;
            current = poseidon_chip.hash(
                layouter.namespace(|| format!("level {}", level)),
                [left, right],
            )?;
        }

        Ok(current)
    }
}
