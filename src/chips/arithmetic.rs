use halo2_proofs::arithmetic::Field;
use halo2_proofs::circuit::{AssignedCell, Layouter, Value};
use halo2_proofs::halo2curves::bn256::Fr as Fp;
use halo2_proofs::plonk::{Advice, Column, ConstraintSystem, Error, Expression, Fixed, Selector};
use halo2_proofs::poly::Rotation;

/// Configuration for the Arithmetic Chip
///
/// Every operation takes a single row over the columns `[a, b, c, d]`, plus the fixed column `k`
/// for the operations that carry a constant.
///
/// | gate         | constraint                        |
/// |--------------|-----------------------------------|
/// | add          | a + b - c = 0                     |
/// | mul          | a * b - c = 0                     |
/// | mul add      | a * b + c - d = 0                 |
/// | add constant | a + k - c = 0                     |
/// | scale add    | a * k + b - c = 0                 |
/// | select       | c * (a - b) + b - d = 0           |
/// | bool         | a * (1 - a) = 0                   |
/// | is zero      | a * b - 1 + c = 0, a * c = 0      |
#[derive(Debug, Clone, Copy)]
pub struct ArithmeticConfig {
    pub advice: [Column<Advice>; 4],
    pub k: Column<Fixed>,
    q_add: Selector,
    q_mul: Selector,
    q_mul_add: Selector,
    q_add_constant: Selector,
    q_scale_add: Selector,
    q_select: Selector,
    q_bool: Selector,
    q_is_zero: Selector,
}

/// Chip exposing the field operations the batch circuit is built from.
#[derive(Debug, Clone)]
pub struct ArithmeticChip {
    config: ArithmeticConfig,
}

impl ArithmeticChip {
    pub fn construct(config: ArithmeticConfig) -> Self {
        Self { config }
    }

    pub fn configure(
        meta: &mut ConstraintSystem<Fp>,
        advice: [Column<Advice>; 4],
        k: Column<Fixed>,
    ) -> ArithmeticConfig {
        for col in advice.iter() {
            meta.enable_equality(*col);
        }

        let [col_a, col_b, col_c, col_d] = advice;

        let q_add = meta.selector();
        let q_mul = meta.selector();
        let q_mul_add = meta.selector();
        let q_add_constant = meta.selector();
        let q_scale_add = meta.selector();
        let q_select = meta.selector();
        let q_bool = meta.selector();
        let q_is_zero = meta.selector();

        meta.create_gate("add", |meta| {
            let s = meta.query_selector(q_add);
            let a = meta.query_advice(col_a, Rotation::cur());
            let b = meta.query_advice(col_b, Rotation::cur());
            let c = meta.query_advice(col_c, Rotation::cur());
            vec![s * (a + b - c)]
        });

        meta.create_gate("mul", |meta| {
            let s = meta.query_selector(q_mul);
            let a = meta.query_advice(col_a, Rotation::cur());
            let b = meta.query_advice(col_b, Rotation::cur());
            let c = meta.query_advice(col_c, Rotation::cur());
            vec![s * (a * b - c)]
        });

        meta.create_gate("mul add", |meta| {
            let s = meta.query_selector(q_mul_add);
            let a = meta.query_advice(col_a, Rotation::cur());
            let b = meta.query_advice(col_b, Rotation::cur());
            let c = meta.query_advice(col_c, Rotation::cur());
            let d = meta.query_advice(col_d, Rotation::cur());
            vec![s * (a * b + c - d)]
        });

        meta.create_gate("add constant", |meta| {
            let s = meta.query_selector(q_add_constant);
            let a = meta.query_advice(col_a, Rotation::cur());
            let k = meta.query_fixed(k, Rotation::cur());
            let c = meta.query_advice(col_c, Rotation::cur());
            vec![s * (a + k - c)]
        });

        meta.create_gate("scale add", |meta| {
            let s = meta.query_selector(q_scale_add);
            let a = meta.query_advice(col_a, Rotation::cur());
            let k = meta.query_fixed(k, Rotation::cur());
            let b = meta.query_advice(col_b, Rotation::cur());
            let c = meta.query_advice(col_c, Rotation::cur());
            vec![s * (a * k + b - c)]
        });

        meta.create_gate("select", |meta| {
            let s = meta.query_selector(q_select);
            let a = meta.query_advice(col_a, Rotation::cur());
            let b = meta.query_advice(col_b, Rotation::cur());
            let flag = meta.query_advice(col_c, Rotation::cur());
            let d = meta.query_advice(col_d, Rotation::cur());
            vec![s * (flag * (a - b.clone()) + b - d)]
        });

        // s * a * (1 - a) = 0
        meta.create_gate("bool constraint", |meta| {
            let s = meta.query_selector(q_bool);
            let a = meta.query_advice(col_a, Rotation::cur());
            vec![s * a.clone() * (Expression::Constant(Fp::from(1)) - a)]
        });

        // c = 1 when a = 0, c = 0 otherwise. b holds the inverse of a when it exists
        meta.create_gate("is zero", |meta| {
            let s = meta.query_selector(q_is_zero);
            let a = meta.query_advice(col_a, Rotation::cur());
            let a_inv = meta.query_advice(col_b, Rotation::cur());
            let is_zero = meta.query_advice(col_c, Rotation::cur());
            vec![
                s.clone()
                    * (a.clone() * a_inv - Expression::Constant(Fp::from(1)) + is_zero.clone()),
                s * a * is_zero,
            ]
        });

        ArithmeticConfig {
            advice,
            k,
            q_add,
            q_mul,
            q_mul_add,
            q_add_constant,
            q_scale_add,
            q_select,
            q_bool,
            q_is_zero,
        }
    }

    /// Assigns a free witness value
    pub fn witness(
        &self,
        mut layouter: impl Layouter<Fp>,
        value: Value<Fp>,
    ) -> Result<AssignedCell<Fp, Fp>, Error> {
        layouter.assign_region(
            || "assign witness",
            |mut region| region.assign_advice(|| "witness", self.config.advice[0], 0, || value),
        )
    }

    /// Assigns a cell fixed to `constant`
    pub fn constant(
        &self,
        mut layouter: impl Layouter<Fp>,
        constant: Fp,
    ) -> Result<AssignedCell<Fp, Fp>, Error> {
        layouter.assign_region(
            || "assign constant",
            |mut region| {
                region.assign_advice_from_constant(
                    || "constant",
                    self.config.advice[0],
                    0,
                    constant,
                )
            },
        )
    }

    pub fn add(
        &self,
        mut layouter: impl Layouter<Fp>,
        lhs: &AssignedCell<Fp, Fp>,
        rhs: &AssignedCell<Fp, Fp>,
    ) -> Result<AssignedCell<Fp, Fp>, Error> {
        layouter.assign_region(
            || "add",
            |mut region| {
                self.config.q_add.enable(&mut region, 0)?;
                lhs.copy_advice(|| "lhs", &mut region, self.config.advice[0], 0)?;
                rhs.copy_advice(|| "rhs", &mut region, self.config.advice[1], 0)?;
                region.assign_advice(
                    || "lhs + rhs",
                    self.config.advice[2],
                    0,
                    || lhs.value().copied() + rhs.value(),
                )
            },
        )
    }

    /// Returns `lhs - rhs`, laid out as `rhs + diff = lhs` on the add gate
    pub fn sub(
        &self,
        mut layouter: impl Layouter<Fp>,
        lhs: &AssignedCell<Fp, Fp>,
        rhs: &AssignedCell<Fp, Fp>,
    ) -> Result<AssignedCell<Fp, Fp>, Error> {
        layouter.assign_region(
            || "sub",
            |mut region| {
                self.config.q_add.enable(&mut region, 0)?;
                rhs.copy_advice(|| "rhs", &mut region, self.config.advice[0], 0)?;
                let diff = region.assign_advice(
                    || "lhs - rhs",
                    self.config.advice[1],
                    0,
                    || lhs.value().copied() - rhs.value(),
                )?;
                lhs.copy_advice(|| "lhs", &mut region, self.config.advice[2], 0)?;
                Ok(diff)
            },
        )
    }

    pub fn mul(
        &self,
        mut layouter: impl Layouter<Fp>,
        lhs: &AssignedCell<Fp, Fp>,
        rhs: &AssignedCell<Fp, Fp>,
    ) -> Result<AssignedCell<Fp, Fp>, Error> {
        layouter.assign_region(
            || "mul",
            |mut region| {
                self.config.q_mul.enable(&mut region, 0)?;
                lhs.copy_advice(|| "lhs", &mut region, self.config.advice[0], 0)?;
                rhs.copy_advice(|| "rhs", &mut region, self.config.advice[1], 0)?;
                region.assign_advice(
                    || "lhs * rhs",
                    self.config.advice[2],
                    0,
                    || lhs.value().copied() * rhs.value(),
                )
            },
        )
    }

    /// Returns `lhs * rhs + addend`
    pub fn mul_add(
        &self,
        mut layouter: impl Layouter<Fp>,
        lhs: &AssignedCell<Fp, Fp>,
        rhs: &AssignedCell<Fp, Fp>,
        addend: &AssignedCell<Fp, Fp>,
    ) -> Result<AssignedCell<Fp, Fp>, Error> {
        layouter.assign_region(
            || "mul add",
            |mut region| {
                self.config.q_mul_add.enable(&mut region, 0)?;
                lhs.copy_advice(|| "lhs", &mut region, self.config.advice[0], 0)?;
                rhs.copy_advice(|| "rhs", &mut region, self.config.advice[1], 0)?;
                addend.copy_advice(|| "addend", &mut region, self.config.advice[2], 0)?;
                region.assign_advice(
                    || "lhs * rhs + addend",
                    self.config.advice[3],
                    0,
                    || lhs.value().copied() * rhs.value() + addend.value(),
                )
            },
        )
    }

    pub fn add_constant(
        &self,
        mut layouter: impl Layouter<Fp>,
        value: &AssignedCell<Fp, Fp>,
        constant: Fp,
    ) -> Result<AssignedCell<Fp, Fp>, Error> {
        layouter.assign_region(
            || "add constant",
            |mut region| {
                self.config.q_add_constant.enable(&mut region, 0)?;
                value.copy_advice(|| "value", &mut region, self.config.advice[0], 0)?;
                region.assign_fixed(|| "constant", self.config.k, 0, || Value::known(constant))?;
                region.assign_advice(
                    || "value + constant",
                    self.config.advice[2],
                    0,
                    || value.value().map(|v| *v + constant),
                )
            },
        )
    }

    /// Returns `Σ cell_i * coefficient_i`, one row per term
    pub fn weighted_sum(
        &self,
        mut layouter: impl Layouter<Fp>,
        terms: &[(&AssignedCell<Fp, Fp>, Fp)],
    ) -> Result<AssignedCell<Fp, Fp>, Error> {
        layouter.assign_region(
            || "weighted sum",
            |mut region| {
                let mut acc = region.assign_advice_from_constant(
                    || "initial accumulator",
                    self.config.advice[1],
                    0,
                    Fp::zero(),
                )?;

                for (i, (cell, coefficient)) in terms.iter().enumerate() {
                    self.config.q_scale_add.enable(&mut region, i)?;
                    cell.copy_advice(|| "term", &mut region, self.config.advice[0], i)?;
                    region.assign_fixed(
                        || "coefficient",
                        self.config.k,
                        i,
                        || Value::known(*coefficient),
                    )?;
                    if i > 0 {
                        acc.copy_advice(|| "accumulator", &mut region, self.config.advice[1], i)?;
                    }
                    let next = cell.value().map(|v| *v * coefficient) + acc.value();
                    acc = region.assign_advice(
                        || "updated accumulator",
                        self.config.advice[2],
                        i,
                        || next,
                    )?;
                }

                Ok(acc)
            },
        )
    }

    /// Returns `when_true` if `flag` is 1 and `when_false` if `flag` is 0. `flag` must already be boolean.
    pub fn select(
        &self,
        mut layouter: impl Layouter<Fp>,
        flag: &AssignedCell<Fp, Fp>,
        when_true: &AssignedCell<Fp, Fp>,
        when_false: &AssignedCell<Fp, Fp>,
    ) -> Result<AssignedCell<Fp, Fp>, Error> {
        layouter.assign_region(
            || "select",
            |mut region| {
                self.config.q_select.enable(&mut region, 0)?;
                when_true.copy_advice(|| "when true", &mut region, self.config.advice[0], 0)?;
                when_false.copy_advice(|| "when false", &mut region, self.config.advice[1], 0)?;
                flag.copy_advice(|| "flag", &mut region, self.config.advice[2], 0)?;

                let selected = flag
                    .value()
                    .zip(when_true.value())
                    .zip(when_false.value())
                    .map(|((flag, t), f)| if *flag == Fp::zero() { *f } else { *t });

                region.assign_advice(|| "selected", self.config.advice[3], 0, || selected)
            },
        )
    }

    pub fn assert_bool(
        &self,
        mut layouter: impl Layouter<Fp>,
        value: &AssignedCell<Fp, Fp>,
    ) -> Result<(), Error> {
        layouter.assign_region(
            || "assert bool",
            |mut region| {
                self.config.q_bool.enable(&mut region, 0)?;
                value.copy_advice(|| "value", &mut region, self.config.advice[0], 0)?;
                Ok(())
            },
        )
    }

    /// Returns a cell holding 1 if `value` is zero and 0 otherwise
    pub fn is_zero(
        &self,
        mut layouter: impl Layouter<Fp>,
        value: &AssignedCell<Fp, Fp>,
    ) -> Result<AssignedCell<Fp, Fp>, Error> {
        layouter.assign_region(
            || "is zero",
            |mut region| {
                self.config.q_is_zero.enable(&mut region, 0)?;
                value.copy_advice(|| "value", &mut region, self.config.advice[0], 0)?;

                let inverse = value.value().map(|v| v.invert().unwrap_or(Fp::zero()));
                region.assign_advice(|| "inverse", self.config.advice[1], 0, || inverse)?;

                let is_zero = value.value().map(|v| {
                    if *v == Fp::zero() {
                        Fp::from(1)
                    } else {
                        Fp::zero()
                    }
                });
                region.assign_advice(|| "is zero", self.config.advice[2], 0, || is_zero)
            },
        )
    }

    pub fn assert_equal(
        &self,
        mut layouter: impl Layouter<Fp>,
        lhs: &AssignedCell<Fp, Fp>,
        rhs: &AssignedCell<Fp, Fp>,
    ) -> Result<(), Error> {
        layouter.assign_region(
            || "assert equal",
            |mut region| region.constrain_equal(lhs.cell(), rhs.cell()),
        )
    }

    pub fn assert_constant(
        &self,
        mut layouter: impl Layouter<Fp>,
        value: &AssignedCell<Fp, Fp>,
        constant: Fp,
    ) -> Result<(), Error> {
        layouter.assign_region(
            || "assert constant",
            |mut region| region.constrain_constant(value.cell(), constant),
        )
    }
}
