use halo2_proofs::{
    circuit::{AssignedCell, Layouter, Value},
    halo2curves::bn256::Fr as Fp,
    plonk::{Advice, Column, ConstraintSystem, Error, Expression, Fixed, Selector},
    poly::Rotation,
};

use crate::chips::range::{
    range_check::{RangeCheckChip, RangeCheckConfig},
    utils::pow_of_two,
};

/// Config for the CheckLt chip.
#[derive(Clone, Copy, Debug)]
pub struct CheckLtConfig {
    /// Denotes the lhs value.
    lhs_col: Column<Advice>,
    /// Denotes the rhs value.
    rhs_col: Column<Advice>,
    /// Denotes the diff value.
    diff_col: Column<Advice>,
    /// Denotes the offset added to the difference, `2^(8 * n_bytes)` for a strict comparison.
    offset_col: Column<Fixed>,
    /// Denotes the selector used to enforce the LT constraint between lhs and rhs.
    check_lt_selector: Selector,
    /// Configuration for the RangeCheck chip.
    range_check_config: RangeCheckConfig,
}

/// Right hand side of a comparison
#[derive(Clone, Copy, Debug)]
pub enum Operand<'a> {
    Cell(&'a AssignedCell<Fp, Fp>),
    Constant(Fp),
}

/// Constrains that 'lhs' is less than (or equal to) 'rhs'.
///
/// Assumes that `lhs` and `rhs` are known to have <= n_bytes bytes.
///
/// Note: This may fail silently if `lhs` or `rhs` have more than n_bytes
///
/// Patterned after [Axiom `check_less_than`](https://axiom-crypto.github.io/halo2-lib/src/halo2_base/gates/range.rs.html#213-219)
///
/// It performs the following constraint:
/// * `diff = lhs - rhs + offset`. When check_lt_selector is 1, this constraint is enforced.
/// * `diff ∈ n_bytes range for diff cell
///
/// With `offset = 2^(n_bytes*8)` this is `lhs < rhs`, with `offset = 2^(n_bytes*8) - 1` it is `lhs <= rhs`.
#[derive(Clone, Debug)]
pub struct CheckLtChip {
    config: CheckLtConfig,
}

impl CheckLtChip {
    /// Configures the CheckLtChip.
    pub fn configure(
        meta: &mut ConstraintSystem<Fp>,
        lhs_col: Column<Advice>,
        rhs_col: Column<Advice>,
        diff_col: Column<Advice>,
        offset_col: Column<Fixed>,
        check_lt_selector: Selector,
        range_check_config: RangeCheckConfig,
    ) -> CheckLtConfig {
        meta.enable_equality(lhs_col);
        meta.enable_equality(rhs_col);
        meta.enable_equality(diff_col);

        meta.create_gate("lt gate", |meta| {
            let lhs_expr = meta.query_advice(lhs_col, Rotation::cur());
            let rhs_expr = meta.query_advice(rhs_col, Rotation::cur());
            let diff_expr = meta.query_advice(diff_col, Rotation::cur());
            let offset_expr = meta.query_fixed(offset_col, Rotation::cur());
            let check_lt_selector: Expression<Fp> = meta.query_selector(check_lt_selector);

            vec![check_lt_selector * (lhs_expr - rhs_expr + offset_expr - diff_expr)]
        });

        CheckLtConfig {
            lhs_col,
            rhs_col,
            diff_col,
            offset_col,
            check_lt_selector,
            range_check_config,
        }
    }

    /// Constructs a CheckLtChip given a config.
    pub fn construct(config: CheckLtConfig) -> CheckLtChip {
        CheckLtChip { config }
    }

    /// Enforces `lhs < rhs`
    pub fn assert_lt(
        &self,
        layouter: impl Layouter<Fp>,
        lhs_cell: &AssignedCell<Fp, Fp>,
        rhs: Operand,
        n_bytes: usize,
    ) -> Result<(), Error> {
        let offset = pow_of_two(n_bytes * 8);
        self.assign(layouter, lhs_cell, rhs, offset, n_bytes)
    }

    /// Enforces `lhs <= rhs`
    pub fn assert_le(
        &self,
        layouter: impl Layouter<Fp>,
        lhs_cell: &AssignedCell<Fp, Fp>,
        rhs: Operand,
        n_bytes: usize,
    ) -> Result<(), Error> {
        let offset = pow_of_two(n_bytes * 8) - Fp::from(1);
        self.assign(layouter, lhs_cell, rhs, offset, n_bytes)
    }

    /// Assign `lhs`, `rhs` and `diff` to the region and range check `diff`.
    fn assign(
        &self,
        mut layouter: impl Layouter<Fp>,
        lhs_cell: &AssignedCell<Fp, Fp>,
        rhs: Operand,
        offset: Fp,
        n_bytes: usize,
    ) -> Result<(), Error> {
        let diff_cell = layouter.assign_region(
            || "assign lhs, rhs and diff to the region",
            |mut region| {
                // enable check_lt_selector at offset 0
                self.config.check_lt_selector.enable(&mut region, 0)?;

                // copy `lhs_cell` to `lhs_col` column at offset 0
                lhs_cell.copy_advice(|| "copy lhs", &mut region, self.config.lhs_col, 0)?;

                let rhs_cell = match rhs {
                    Operand::Cell(cell) => {
                        cell.copy_advice(|| "copy rhs", &mut region, self.config.rhs_col, 0)?
                    }
                    Operand::Constant(constant) => region.assign_advice_from_constant(
                        || "constant rhs",
                        self.config.rhs_col,
                        0,
                        constant,
                    )?,
                };

                region.assign_fixed(
                    || "assign offset",
                    self.config.offset_col,
                    0,
                    || Value::known(offset),
                )?;

                // Compute diff_val starting from lhs_cell and rhs_cell
                let diff_val = lhs_cell
                    .value()
                    .zip(rhs_cell.value())
                    .map(|(lhs, rhs)| *lhs - rhs + offset);

                region.assign_advice(
                    || "assign diff to the region",
                    self.config.diff_col,
                    0,
                    || diff_val,
                )
            },
        )?;

        // Instantiate the range check chip.
        let range_check_chip = RangeCheckChip::construct(self.config.range_check_config);

        // assign diff_cell to the range check chip to perform range check
        range_check_chip.assign(layouter.namespace(|| "range check diff"), &diff_cell, n_bytes)
    }
}
