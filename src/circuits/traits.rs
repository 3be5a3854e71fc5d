use halo2_proofs::circuit::{AssignedCell, Layouter, Value};
use halo2_proofs::halo2curves::bn256::Fr as Fp;
use halo2_proofs::plonk::{Advice, Column, Error, Fixed, Instance};

/// Number of rows of the byte table backing every range check
pub const BYTE_TABLE_ROWS: usize = 1 << 8;

/// Region helpers shared by the batch circuit and the chip test circuits
pub trait CircuitBase {
    /// Binds `cell` to row `row` of the public `instance` column
    fn expose_public(
        &self,
        mut layouter: impl Layouter<Fp>,
        cell: &AssignedCell<Fp, Fp>,
        row: usize,
        instance: Column<Instance>,
    ) -> Result<(), Error> {
        layouter.constrain_instance(cell.cell(), instance, row)
    }

    /// Witnesses a single private value in its own region. `label` names the region in layout prints and MockProver failures.
    fn assign_private_input(
        &self,
        mut layouter: impl Layouter<Fp>,
        value: Value<Fp>,
        label: &'static str,
        column: Column<Advice>,
    ) -> Result<AssignedCell<Fp, Fp>, Error> {
        layouter.assign_region(
            || format!("private input {}", label),
            |mut region| region.assign_advice(|| label, column, 0, || value),
        )
    }

    /// Fills `column` with every byte value, `0..=255`
    fn load_byte_table(
        &self,
        layouter: &mut impl Layouter<Fp>,
        column: Column<Fixed>,
    ) -> Result<(), Error> {
        layouter.assign_region(
            || "byte table",
            |mut region| {
                (0..BYTE_TABLE_ROWS).try_for_each(|byte| {
                    region
                        .assign_fixed(
                            || format!("byte {}", byte),
                            column,
                            byte,
                            || Value::known(Fp::from(byte as u64)),
                        )
                        .map(|_| ())
                })
            },
        )
    }
}
