use crate::chips::less_than_check::lt_check::{CheckLtChip, CheckLtConfig, Operand};
use crate::chips::range::range_check::{RangeCheckChip, RangeCheckConfig};
use crate::ladder::divide_by_percentage;
use crate::params::PERCENTAGE_MULTIPLIER;
use crate::utils::{big_uint_to_fp, fp_to_big_uint};
use halo2_proofs::circuit::{AssignedCell, Layouter};
use halo2_proofs::halo2curves::bn256::Fr as Fp;
use halo2_proofs::plonk::{Advice, Column, ConstraintSystem, Error, Expression, Selector};
use halo2_proofs::poly::Rotation;

/// Bytes of the quotient. Dividends never exceed `100 * 2^128`.
const QUOTIENT_BYTES: usize = 16;

#[derive(Debug, Clone, Copy)]
pub struct DivisionConfig {
    dividend: Column<Advice>,
    quotient: Column<Advice>,
    remainder: Column<Advice>,
    selector: Selector,
    range_check_config: RangeCheckConfig,
    lt_config: CheckLtConfig,
}

/// Floor division by `PERCENTAGE_MULTIPLIER`.
///
/// The quotient and remainder are produced by [crate::ladder::divide_by_percentage] and re-asserted here:
/// * `quotient * 100 + remainder - dividend = 0`
/// * `quotient` fits in 16 bytes
/// * `remainder` fits in 1 byte and `remainder < 100`
#[derive(Debug, Clone)]
pub struct DivisionChip {
    config: DivisionConfig,
}

impl DivisionChip {
    pub fn construct(config: DivisionConfig) -> Self {
        Self { config }
    }

    pub fn configure(
        meta: &mut ConstraintSystem<Fp>,
        dividend: Column<Advice>,
        quotient: Column<Advice>,
        remainder: Column<Advice>,
        range_check_config: RangeCheckConfig,
        lt_config: CheckLtConfig,
    ) -> DivisionConfig {
        meta.enable_equality(dividend);
        meta.enable_equality(quotient);
        meta.enable_equality(remainder);

        let selector = meta.selector();

        meta.create_gate("division by percentage", |meta| {
            let s = meta.query_selector(selector);
            let dividend = meta.query_advice(dividend, Rotation::cur());
            let quotient = meta.query_advice(quotient, Rotation::cur());
            let remainder = meta.query_advice(remainder, Rotation::cur());
            let multiplier = Expression::Constant(Fp::from(PERCENTAGE_MULTIPLIER));
            vec![s * (quotient * multiplier + remainder - dividend)]
        });

        DivisionConfig {
            dividend,
            quotient,
            remainder,
            selector,
            range_check_config,
            lt_config,
        }
    }

    /// Returns `floor(dividend / 100)`
    pub fn divide_by_percentage(
        &self,
        mut layouter: impl Layouter<Fp>,
        dividend: &AssignedCell<Fp, Fp>,
    ) -> Result<AssignedCell<Fp, Fp>, Error> {
        let (quotient, remainder) = layouter.assign_region(
            || "divide by percentage",
            |mut region| {
                self.config.selector.enable(&mut region, 0)?;
                dividend.copy_advice(|| "dividend", &mut region, self.config.dividend, 0)?;

                let division = dividend.value().map(|d| {
                    let (q, r) = divide_by_percentage(&fp_to_big_uint(d));
                    (big_uint_to_fp(&q), big_uint_to_fp(&r))
                });

                let quotient = region.assign_advice(
                    || "quotient",
                    self.config.quotient,
                    0,
                    || division.map(|(q, _)| q),
                )?;
                let remainder = region.assign_advice(
                    || "remainder",
                    self.config.remainder,
                    0,
                    || division.map(|(_, r)| r),
                )?;

                Ok((quotient, remainder))
            },
        )?;

        let range_check_chip = RangeCheckChip::construct(self.config.range_check_config);
        range_check_chip.assign(
            layouter.namespace(|| "range check quotient"),
            &quotient,
            QUOTIENT_BYTES,
        )?;
        range_check_chip.assign(layouter.namespace(|| "range check remainder"), &remainder, 1)?;

        let lt_chip = CheckLtChip::construct(self.config.lt_config);
        lt_chip.assert_lt(
            layouter.namespace(|| "remainder below percentage multiplier"),
            &remainder,
            Operand::Constant(Fp::from(PERCENTAGE_MULTIPLIER)),
            1,
        )?;

        Ok(quotient)
    }
}
