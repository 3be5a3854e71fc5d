use crate::ladder::{RateLadder, TierRatio};
use crate::ledger::CollateralKind;
use crate::params::{COLLATERAL_KINDS, TIER_COUNT};
use crate::utils::fp_from_u128;
use halo2_proofs::circuit::{AssignedCell, Layouter, Value};
use halo2_proofs::halo2curves::bn256::Fr as Fp;
use halo2_proofs::plonk::{Advice, Column, ConstraintSystem, Error, Expression, Fixed, Selector};
use halo2_proofs::poly::Rotation;

/// Row addressing of the ladder table.
///
/// Ladders are stored by asset, then by collateral kind. Each ladder takes `TIER_COUNT + 1` rows:
/// a zero row followed by its tiers. Addresses start at 1, address 0 is the all-zero row matched by disabled queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LadderLayout {
    n_assets: usize,
}

impl LadderLayout {
    pub fn new(n_assets: usize) -> Self {
        LadderLayout { n_assets }
    }

    /// Rows taken by the ladders, the null row excluded
    pub fn rows(&self) -> usize {
        self.n_assets * COLLATERAL_KINDS * (TIER_COUNT + 1)
    }

    /// Address of the zero row heading the ladder of `kind` for `asset_index`
    pub fn base(&self, asset_index: usize, kind: CollateralKind) -> u64 {
        ((asset_index * COLLATERAL_KINDS + kind.index()) * (TIER_COUNT + 1) + 1) as u64
    }

    /// Address of the row right below tier `tier_hint`. The tier itself sits at the next address.
    pub fn row_address(&self, asset_index: usize, kind: CollateralKind, tier_hint: usize) -> u64 {
        self.base(asset_index, kind) + tier_hint as u64
    }
}

/// Tiers stored at `row_address(.., index)` and the next address
pub fn adjacent_tiers(ladder: &RateLadder, index: usize) -> (TierRatio, TierRatio) {
    let tiers = ladder.tiers();
    let lower = if index == 0 {
        TierRatio::default()
    } else {
        tiers[index - 1]
    };
    (lower, tiers[index])
}

/// Cells of one tier, as derived in the circuit or as returned by a query
#[derive(Debug, Clone)]
pub struct LadderRow {
    pub boundary: AssignedCell<Fp, Fp>,
    pub rate: AssignedCell<Fp, Fp>,
    pub precomputed: AssignedCell<Fp, Fp>,
}

#[derive(Debug, Clone, Copy)]
pub struct LadderTableConfig {
    /// Query side: address, boundary, rate, precomputed
    query: [Column<Advice>; 4],
    address: Column<Fixed>,
    boundary: Column<Advice>,
    rate: Column<Advice>,
    precomputed: Column<Advice>,
    q_lookup: Selector,
    q_step: Selector,
}

/// Lookup table holding the tiers of every ladder of the ledger.
///
/// The table columns are advice columns filled with copies of the tiers derived in the circuit,
/// the address column is fixed so that two ladders can never share a row.
///
/// A query reads two consecutive rows:
/// * `q_lookup * (address, boundary, rate, precomputed) ∈ table` on both rows
/// * `q_step * (address_next - address_cur - 1) = 0`
#[derive(Debug, Clone)]
pub struct LadderTableChip {
    config: LadderTableConfig,
}

impl LadderTableChip {
    pub fn construct(config: LadderTableConfig) -> Self {
        Self { config }
    }

    pub fn configure(
        meta: &mut ConstraintSystem<Fp>,
        query: [Column<Advice>; 4],
        table: [Column<Advice>; 3],
        address: Column<Fixed>,
    ) -> LadderTableConfig {
        let [boundary, rate, precomputed] = table;
        for col in query.iter().chain(table.iter()) {
            meta.enable_equality(*col);
        }

        let q_lookup = meta.complex_selector();
        let q_step = meta.selector();

        meta.create_gate("consecutive ladder rows", |meta| {
            let s = meta.query_selector(q_step);
            let prev = meta.query_advice(query[0], Rotation::prev());
            let cur = meta.query_advice(query[0], Rotation::cur());
            vec![s * (cur - prev - Expression::Constant(Fp::from(1)))]
        });

        meta.lookup_any("ladder row lookup", |meta| {
            let s = meta.query_selector(q_lookup);
            let table_address = meta.query_fixed(address, Rotation::cur());
            let table_columns = [
                meta.query_advice(boundary, Rotation::cur()),
                meta.query_advice(rate, Rotation::cur()),
                meta.query_advice(precomputed, Rotation::cur()),
            ];

            let mut lookups = vec![(
                s.clone() * meta.query_advice(query[0], Rotation::cur()),
                table_address,
            )];
            for (col, table_expr) in query[1..].iter().zip(table_columns) {
                lookups.push((s.clone() * meta.query_advice(*col, Rotation::cur()), table_expr));
            }
            lookups
        });

        LadderTableConfig {
            query,
            address,
            boundary,
            rate,
            precomputed,
            q_lookup,
            q_step,
        }
    }

    /// Assigns the all-zero row at address 0
    pub fn load_null_row(&self, mut layouter: impl Layouter<Fp>) -> Result<(), Error> {
        layouter.assign_region(
            || "ladder table null row",
            |mut region| {
                region.assign_fixed(|| "address", self.config.address, 0, || Value::known(Fp::zero()))?;
                for col in [self.config.boundary, self.config.rate, self.config.precomputed] {
                    region.assign_advice_from_constant(|| "zero", col, 0, Fp::zero())?;
                }
                Ok(())
            },
        )
    }

    /// Copies the `TIER_COUNT` tiers of a ladder into the table, behind a zero row
    pub fn insert_ladder(
        &self,
        mut layouter: impl Layouter<Fp>,
        layout: &LadderLayout,
        asset_index: usize,
        kind: CollateralKind,
        tiers: &[LadderRow],
    ) -> Result<(), Error> {
        if tiers.len() != TIER_COUNT {
            return Err(Error::Synthesis);
        }
        let base = layout.base(asset_index, kind);

        layouter.assign_region(
            || format!("insert ladder {:?} of asset {}", kind, asset_index),
            |mut region| {
                region.assign_fixed(
                    || "zero row address",
                    self.config.address,
                    0,
                    || Value::known(Fp::from(base)),
                )?;
                for col in [self.config.boundary, self.config.rate, self.config.precomputed] {
                    region.assign_advice_from_constant(|| "zero row", col, 0, Fp::zero())?;
                }

                for (i, tier) in tiers.iter().enumerate() {
                    let row = i + 1;
                    region.assign_fixed(
                        || format!("tier {} address", i),
                        self.config.address,
                        row,
                        || Value::known(Fp::from(base + row as u64)),
                    )?;
                    tier.boundary
                        .copy_advice(|| "boundary", &mut region, self.config.boundary, row)?;
                    tier.rate
                        .copy_advice(|| "rate", &mut region, self.config.rate, row)?;
                    tier.precomputed.copy_advice(
                        || "precomputed",
                        &mut region,
                        self.config.precomputed,
                        row,
                    )?;
                }

                Ok(())
            },
        )
    }

    /// Reads the rows at `address` and `address + 1`. `rows` holds the witness values of both rows.
    pub fn query(
        &self,
        mut layouter: impl Layouter<Fp>,
        address: &AssignedCell<Fp, Fp>,
        rows: Value<(TierRatio, TierRatio)>,
    ) -> Result<(LadderRow, LadderRow), Error> {
        layouter.assign_region(
            || "ladder query",
            |mut region| {
                let [address_col, boundary_col, rate_col, precomputed_col] = self.config.query;

                self.config.q_lookup.enable(&mut region, 0)?;
                self.config.q_lookup.enable(&mut region, 1)?;
                self.config.q_step.enable(&mut region, 1)?;

                address.copy_advice(|| "lower address", &mut region, address_col, 0)?;
                region.assign_advice(
                    || "upper address",
                    address_col,
                    1,
                    || address.value().map(|a| *a + Fp::from(1)),
                )?;

                let mut assign_row = |row: usize, tier: Value<TierRatio>| -> Result<LadderRow, Error> {
                    Ok(LadderRow {
                        boundary: region.assign_advice(
                            || "boundary",
                            boundary_col,
                            row,
                            || tier.map(|t| fp_from_u128(t.boundary)),
                        )?,
                        rate: region.assign_advice(
                            || "rate",
                            rate_col,
                            row,
                            || tier.map(|t| Fp::from(t.ratio as u64)),
                        )?,
                        precomputed: region.assign_advice(
                            || "precomputed",
                            precomputed_col,
                            row,
                            || tier.map(|t| fp_from_u128(t.precomputed)),
                        )?,
                    })
                };

                let lower = assign_row(0, rows.map(|(lower, _)| lower))?;
                let upper = assign_row(1, rows.map(|(_, upper)| upper))?;

                Ok((lower, upper))
            },
        )
    }
}
