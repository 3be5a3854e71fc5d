#[cfg(test)]
mod test {
    use crate::chips::range::range_check::{RangeCheckChip, RangeCheckConfig};
    use crate::circuits::traits::CircuitBase;
    use crate::utils::big_uint_to_fp;
    use halo2_proofs::{
        circuit::{Layouter, SimpleFloorPlanner, Value},
        dev::MockProver,
        halo2curves::bn256::Fr as Fp,
        plonk::{Advice, Circuit, Column, ConstraintSystem, Error, Fixed},
    };
    use num_bigint::BigUint;

    #[derive(Debug, Clone)]
    pub struct TestConfig {
        pub value: Column<Advice>,
        pub range_check_config: RangeCheckConfig,
        pub range: Column<Fixed>,
    }

    // The test circuit witnesses `value` and checks that it fits in `n_bytes` bytes.
    #[derive(Default, Clone, Debug)]
    struct TestCircuit {
        pub value: Fp,
        pub n_bytes: usize,
    }

    impl CircuitBase for TestCircuit {}

    impl Circuit<Fp> for TestCircuit {
        type Config = TestConfig;
        type FloorPlanner = SimpleFloorPlanner;

        fn without_witnesses(&self) -> Self {
            Self {
                value: Fp::zero(),
                n_bytes: self.n_bytes,
            }
        }

        fn configure(meta: &mut ConstraintSystem<Fp>) -> Self::Config {
            let value = meta.advice_column();
            meta.enable_equality(value);

            let z = meta.advice_column();
            meta.enable_equality(z);

            let range = meta.fixed_column();

            let constants = meta.fixed_column();
            meta.enable_constant(constants);

            let enable_lookup_selector = meta.complex_selector();

            let range_check_config =
                RangeCheckChip::configure(meta, z, range, enable_lookup_selector);

            TestConfig {
                value,
                range_check_config,
                range,
            }
        }

        fn synthesize(
            &self,
            config: Self::Config,
            mut layouter: impl Layouter<Fp>,
        ) -> Result<(), Error> {
            self.load_byte_table(&mut layouter, config.range)?;

            let value = self.assign_private_input(
                layouter.namespace(|| "value"),
                Value::known(self.value),
                "value",
                config.value,
            )?;

            let range_chip = RangeCheckChip::construct(config.range_check_config);
            range_chip.assign(layouter.namespace(|| "range check"), &value, self.n_bytes)
        }
    }

    const K: u32 = 9;

    #[test]
    fn test_value_within_4_bytes() {
        let circuit = TestCircuit {
            value: Fp::from(0x1f2f3f4f),
            n_bytes: 4,
        };
        let prover = MockProver::run(K, &circuit, vec![]).unwrap();
        prover.assert_satisfied();
    }

    #[test]
    fn test_value_overflows_4_bytes() {
        let circuit = TestCircuit {
            value: Fp::from(1_u64 << 32),
            n_bytes: 4,
        };
        let invalid_prover = MockProver::run(K, &circuit, vec![]).unwrap();
        assert!(invalid_prover.verify().is_err());
    }

    // 2^64 - 1 is the largest amount
    #[test]
    fn test_largest_u64() {
        let circuit = TestCircuit {
            value: Fp::from(u64::MAX),
            n_bytes: 8,
        };
        let prover = MockProver::run(K, &circuit, vec![]).unwrap();
        prover.assert_satisfied();
    }

    #[test]
    fn test_value_overflows_8_bytes() {
        let value = BigUint::from(1_u64) << 64;
        let circuit = TestCircuit {
            value: big_uint_to_fp(&value),
            n_bytes: 8,
        };
        let invalid_prover = MockProver::run(K, &circuit, vec![]).unwrap();
        assert!(invalid_prover.verify().is_err());
    }

    // a field element close to the modulus must not pass as a small value
    #[test]
    fn test_negative_value() {
        let circuit = TestCircuit {
            value: -Fp::from(1),
            n_bytes: 16,
        };
        let invalid_prover = MockProver::run(K, &circuit, vec![]).unwrap();
        assert!(invalid_prover.verify().is_err());
    }

    #[test]
    fn test_zero_bytes() {
        let circuit = TestCircuit {
            value: Fp::zero(),
            n_bytes: 0,
        };
        let prover = MockProver::run(K, &circuit, vec![]).unwrap();
        prover.assert_satisfied();

        let circuit = TestCircuit {
            value: Fp::from(1),
            n_bytes: 0,
        };
        let invalid_prover = MockProver::run(K, &circuit, vec![]).unwrap();
        assert!(invalid_prover.verify().is_err());
    }
}
