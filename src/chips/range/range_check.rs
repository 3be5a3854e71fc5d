use crate::chips::range::utils::shift_right_bytes;
use halo2_proofs::circuit::{AssignedCell, Layouter, Value};
use halo2_proofs::halo2curves::bn256::Fr as Fp;
use halo2_proofs::plonk::{Advice, Column, ConstraintSystem, Error, Expression, Fixed, Selector};
use halo2_proofs::poly::Rotation;
use std::fmt::Debug;

/// Configuration for the Range Check Chip
///
/// # Fields
///
/// * `z`: Advice column for the running sum of the decomposed value.
/// * `range`: Fixed column for the u8 range table.
/// * `lookup_enable_selector`: Selector to toggle the lookup check.
#[derive(Debug, Copy, Clone)]
pub struct RangeCheckConfig {
    pub z: Column<Advice>,
    pub range: Column<Fixed>,
    pub lookup_enable_selector: Selector,
}

/// Helper chip that verifies that the value witnessed in a given cell fits in `n_bytes` bytes.
///
/// The number of bytes is chosen per call, so a single configuration serves every width used by the batch circuit.
///
/// |     | z           | lookup_enable_selector |
/// |-----|-------------|------------------------|
/// |  0  | 0x1f2f3f4f  | 1                      |
/// |  1  | 0x1f2f3f    | 1                      |
/// |  2  | 0x1f2f      | 1                      |
/// |  3  | 0x1f        | 1                      |
/// |  4  | 0x00        | 0                      |
///
/// Row `i + 1` holds the value shifted right by `8 * (i + 1)` bits.
/// The constraints that are enforced are:
/// - z(cur) - z(next) * 2^8 ∈ u8_lookup_table (enabled by lookup_enable_selector)
/// - z(0) == value (copy constraint applied here)
/// - z(n_bytes) == 0 (constant constraint applied here)
#[derive(Debug, Clone)]
pub struct RangeCheckChip {
    config: RangeCheckConfig,
}

impl RangeCheckChip {
    pub fn construct(config: RangeCheckConfig) -> Self {
        Self { config }
    }

    /// Configures the Range Chip
    /// Note: the lookup table should be loaded with values from `0` to `2^8 - 1` otherwise the range check will fail.
    pub fn configure(
        meta: &mut ConstraintSystem<Fp>,
        z: Column<Advice>,
        range: Column<Fixed>,
        lookup_enable_selector: Selector,
    ) -> RangeCheckConfig {
        meta.annotate_lookup_any_column(range, || "LOOKUP_MAXBITS_RANGE");

        meta.lookup_any(
            "range u8 check for difference between each interstitial running sum output",
            |meta| {
                let z_cur = meta.query_advice(z, Rotation::cur());
                let z_next = meta.query_advice(z, Rotation::next());

                let enable_lookup = meta.query_selector(lookup_enable_selector);
                let range = meta.query_fixed(range, Rotation::cur());

                let diff = z_cur - z_next * Expression::Constant(Fp::from(1 << 8));

                vec![(enable_lookup * diff, range)]
            },
        );

        RangeCheckConfig {
            z,
            range,
            lookup_enable_selector,
        }
    }

    /// Assign the running sum of `value` to the chip. In particular, performs the following assignments
    /// - Copy value to be performed range check on to z(0) enforcing a copy constraint
    /// - Assign the shifted values to z(1..n_bytes)
    /// - Constrain z(n_bytes) to be zero
    pub fn assign(
        &self,
        mut layouter: impl Layouter<Fp>,
        value: &AssignedCell<Fp, Fp>,
        n_bytes: usize,
    ) -> Result<(), Error> {
        layouter.assign_region(
            || format!("range check {} bytes", n_bytes),
            |mut region| {
                let mut z = value.copy_advice(
                    || "copy value to initialize running sum",
                    &mut region,
                    self.config.z,
                    0,
                )?;

                for i in 0..n_bytes {
                    self.config.lookup_enable_selector.enable(&mut region, i)?;

                    let z_next: Value<Fp> =
                        value.value().map(|v| shift_right_bytes(v, i + 1));

                    z = region.assign_advice(
                        || format!("running sum z_{}", i + 1),
                        self.config.z,
                        i + 1,
                        || z_next,
                    )?;
                }

                // the value fits in n_bytes only if nothing is left after the last shift
                region.constrain_constant(z.cell(), Fp::zero())?;

                Ok(())
            },
        )
    }
}
