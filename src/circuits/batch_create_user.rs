use crate::account_tree::{empty_leaf_hash, AccountProof};
use crate::chips::arithmetic::{ArithmeticChip, ArithmeticConfig};
use crate::chips::division::{DivisionChip, DivisionConfig};
use crate::chips::ladder_table::{
    adjacent_tiers, LadderLayout, LadderRow, LadderTableChip, LadderTableConfig,
};
use crate::chips::less_than_check::lt_check::{CheckLtChip, CheckLtConfig, Operand};
use crate::chips::merkle::{MerkleChip, MerkleConfig};
use crate::chips::poseidon::hash::{PoseidonChip, PoseidonConfig};
use crate::chips::poseidon::spec::{PoseidonSpec, RATE, WIDTH};
use crate::chips::range::range_check::{RangeCheckChip, RangeCheckConfig};
use crate::chips::range::utils::pow_of_two;
use crate::circuits::traits::CircuitBase;
use crate::ladder::{RateLadder, TierHint};
use crate::ledger::{densify, AssetLedgerEntry, CollateralKind};
use crate::params::{ACCOUNT_ASSET_FIELDS, PERCENTAGE_MULTIPLIER, TIER_COUNT};
use crate::utils::{fp_from_u128, fp_to_big_uint};
use crate::witness::{BatchOperation, BatchWitness, WitnessError};
use halo2_proofs::circuit::{AssignedCell, Layouter, SimpleFloorPlanner, Value};
use halo2_proofs::halo2curves::bn256::Fr as Fp;
use halo2_proofs::plonk::{
    Advice, Circuit, Column, ConstraintSystem, Error, Fixed, Instance,
};
use snark_verifier_sdk::CircuitExt;

/// Bytes of a ledger or account amount
const AMOUNT_BYTES: usize = 8;
/// Bytes of a collateral value, a tier boundary or an account total
const VALUE_BYTES: usize = 16;

/// Circuit proving the creation of a batch of accounts.
///
/// Every operation fills an empty slot of the account tree with a solvent account, and adds its holdings to the ledger.
/// The single public input commits to the roots and ledger commitments before and after the batch:
/// `H(before_root, after_root, before_ledger_commitment, after_ledger_commitment)`.
///
/// # Type Parameters
///
/// * `N_ASSETS`: The number of assets of the ledger universe
/// * `N_OPS`: The number of account creations in a batch
#[derive(Clone, Debug)]
pub struct BatchCreateUserCircuit<const N_ASSETS: usize, const N_OPS: usize> {
    pub batch_commitment: Fp,
    pub before_ledger_commitment: Fp,
    pub after_ledger_commitment: Fp,
    pub before_account_tree_root: Fp,
    pub after_account_tree_root: Fp,
    /// `N_ASSETS` entries
    pub before_ledger: Vec<AssetLedgerEntry>,
    /// `N_OPS` operations, holdings expanded to the `N_ASSETS` universe
    pub operations: Vec<BatchOperation>,
}

impl<const N_ASSETS: usize, const N_OPS: usize> CircuitExt<Fp>
    for BatchCreateUserCircuit<N_ASSETS, N_OPS>
{
    /// A single public input: the batch commitment
    fn num_instance(&self) -> Vec<usize> {
        vec![1]
    }

    fn instances(&self) -> Vec<Vec<Fp>> {
        vec![vec![self.batch_commitment]]
    }
}

impl<const N_ASSETS: usize, const N_OPS: usize> CircuitBase
    for BatchCreateUserCircuit<N_ASSETS, N_OPS>
{
}

impl<const N_ASSETS: usize, const N_OPS: usize> BatchCreateUserCircuit<N_ASSETS, N_OPS> {
    /// Circuit with placeholder values, used to generate the keys
    pub fn init_empty() -> Self {
        let operations = (0..N_OPS)
            .map(|_| BatchOperation {
                before_root: Fp::zero(),
                after_root: Fp::zero(),
                account_index: 0,
                account_id_hash: Fp::zero(),
                assets: densify(&[], N_ASSETS),
                account_proof: AccountProof::default(),
            })
            .collect();

        Self {
            batch_commitment: Fp::zero(),
            before_ledger_commitment: Fp::zero(),
            after_ledger_commitment: Fp::zero(),
            before_account_tree_root: Fp::zero(),
            after_account_tree_root: Fp::zero(),
            before_ledger: vec![AssetLedgerEntry::empty(); N_ASSETS],
            operations,
        }
    }

    /// Initializes the circuit from a batch witness. The batch must hold exactly `N_OPS` operations over at most `N_ASSETS` assets.
    pub fn init(witness: BatchWitness) -> Result<Self, WitnessError> {
        if witness.operations.len() != N_OPS {
            return Err(WitnessError::Shape(format!(
                "batch holds {} operations, the circuit proves {}",
                witness.operations.len(),
                N_OPS
            )));
        }
        if witness.before_ledger.len() > N_ASSETS {
            return Err(WitnessError::Shape(format!(
                "ledger lists {} assets, the circuit supports {}",
                witness.before_ledger.len(),
                N_ASSETS
            )));
        }
        for op in &witness.operations {
            if let Some(asset) = op.assets.iter().find(|a| a.index as usize >= N_ASSETS) {
                return Err(WitnessError::AssetIndexOutOfRange {
                    account_index: op.account_index,
                    asset_index: asset.index,
                    n_assets: N_ASSETS,
                });
            }
        }

        let dense_assets = witness.dense_assets(N_ASSETS);
        let operations = witness
            .operations
            .into_iter()
            .zip(dense_assets)
            .map(|(op, assets)| BatchOperation { assets, ..op })
            .collect();

        let mut before_ledger = witness.before_ledger;
        before_ledger.resize_with(N_ASSETS, AssetLedgerEntry::empty);

        Ok(Self {
            batch_commitment: witness.batch_commitment,
            before_ledger_commitment: witness.before_ledger_commitment,
            after_ledger_commitment: witness.after_ledger_commitment,
            before_account_tree_root: witness.before_account_tree_root,
            after_account_tree_root: witness.after_account_tree_root,
            before_ledger,
            operations,
        })
    }
}

/// Configuration for the batch circuit
///
/// # Fields
///
/// * `arithmetic_config`: Field operations over the advice columns `[a, b, c, d]`, shared with most other chips
/// * `range_check_config`: Byte decomposition over its own advice column
/// * `lt_config`: Comparisons laid out on `[a, b, c]`
/// * `division_config`: Division by 100 laid out on `[a, b, c]`
/// * `merkle_config`: Path bits and node ordering on `[a, b, c]`
/// * `poseidon_config`: Width 3 Poseidon over `[a, b, c]` with `d` as partial sbox
/// * `ladder_table_config`: Ladder lookup table, queried from `[a, b, c, d]`
/// * `range`: Fixed column holding the u8 table
/// * `instance`: Instance column holding the batch commitment
#[derive(Debug, Clone)]
pub struct BatchCreateUserConfig {
    arithmetic_config: ArithmeticConfig,
    range_check_config: RangeCheckConfig,
    lt_config: CheckLtConfig,
    division_config: DivisionConfig,
    merkle_config: MerkleConfig,
    poseidon_config: PoseidonConfig<WIDTH, RATE>,
    ladder_table_config: LadderTableConfig,
    pub(crate) range: Column<Fixed>,
    pub(crate) instance: Column<Instance>,
    advices: [Column<Advice>; 4],
}

impl BatchCreateUserConfig {
    pub fn configure(meta: &mut ConstraintSystem<Fp>) -> Self {
        let advices: [Column<Advice>; 4] = std::array::from_fn(|_| meta.advice_column());
        let [col_a, col_b, col_c, col_d] = advices;

        // running sum of the range check chip
        let z = meta.advice_column();
        meta.enable_equality(z);

        // boundary, rate and precomputed columns of the ladder table
        let table: [Column<Advice>; 3] = std::array::from_fn(|_| meta.advice_column());

        // coefficients of the arithmetic chip, also used as offsets by the lt chip
        let k = meta.fixed_column();
        let range = meta.fixed_column();
        let ladder_address = meta.fixed_column();
        let rc_a: [Column<Fixed>; WIDTH] = std::array::from_fn(|_| meta.fixed_column());
        let rc_b: [Column<Fixed>; WIDTH] = std::array::from_fn(|_| meta.fixed_column());

        let constants = meta.fixed_column();
        meta.enable_constant(constants);

        let arithmetic_config = ArithmeticChip::configure(meta, advices, k);

        // we need 1 complex selector for the lookup check in the range check chip
        let enable_lookup_selector = meta.complex_selector();
        let range_check_config =
            RangeCheckChip::configure(meta, z, range, enable_lookup_selector);

        let check_lt_selector = meta.selector();
        let lt_config = CheckLtChip::configure(
            meta,
            col_a,
            col_b,
            col_c,
            k,
            check_lt_selector,
            range_check_config,
        );

        let division_config =
            DivisionChip::configure(meta, col_a, col_b, col_c, range_check_config, lt_config);

        let poseidon_config = PoseidonChip::<PoseidonSpec, WIDTH, RATE>::configure(
            meta,
            [col_a, col_b, col_c],
            col_d,
            rc_a,
            rc_b,
        );

        let merkle_config =
            MerkleChip::configure(meta, [col_a, col_b, col_c], poseidon_config.clone());

        let ladder_table_config =
            LadderTableChip::configure(meta, advices, table, ladder_address);

        let instance = meta.instance_column();
        meta.enable_equality(instance);

        Self {
            arithmetic_config,
            range_check_config,
            lt_config,
            division_config,
            merkle_config,
            poseidon_config,
            ladder_table_config,
            range,
            instance,
            advices,
        }
    }
}

impl<const N_ASSETS: usize, const N_OPS: usize> Circuit<Fp>
    for BatchCreateUserCircuit<N_ASSETS, N_OPS>
{
    type Config = BatchCreateUserConfig;
    type FloorPlanner = SimpleFloorPlanner;

    fn without_witnesses(&self) -> Self {
        Self::init_empty()
    }

    fn configure(meta: &mut ConstraintSystem<Fp>) -> Self::Config {
        BatchCreateUserConfig::configure(meta)
    }

    fn synthesize(
        &self,
        config: Self::Config,
        mut layouter: impl Layouter<Fp>,
    ) -> Result<(), Error> {
        if self.before_ledger.len() != N_ASSETS || self.operations.len() != N_OPS {
            return Err(Error::Synthesis);
        }

        let chips = BatchChips::construct(&config);
        let layout = LadderLayout::new(N_ASSETS);

        self.load_byte_table(&mut layouter, config.range)?;

        // 1. batch commitment
        let mut assign_private = |value: Fp, label: &'static str| {
            self.assign_private_input(
                layouter.namespace(|| label),
                Value::known(value),
                label,
                config.advices[0],
            )
        };
        let before_root = assign_private(self.before_account_tree_root, "before account tree root")?;
        let after_root = assign_private(self.after_account_tree_root, "after account tree root")?;
        let before_ledger_commitment =
            assign_private(self.before_ledger_commitment, "before ledger commitment")?;
        let after_ledger_commitment =
            assign_private(self.after_ledger_commitment, "after ledger commitment")?;

        let batch_commitment = chips.poseidon.hash(
            layouter.namespace(|| "batch commitment"),
            [
                before_root.clone(),
                after_root.clone(),
                before_ledger_commitment.clone(),
                after_ledger_commitment.clone(),
            ],
        )?;
        self.expose_public(
            layouter.namespace(|| "public batch commitment"),
            &batch_commitment,
            0,
            config.instance,
        )?;

        // 2. before ledger
        let mut prices = Vec::with_capacity(N_ASSETS);
        let mut ladders = Vec::with_capacity(N_ASSETS);
        let mut totals = Vec::with_capacity(N_ASSETS);
        for (asset_index, entry) in self.before_ledger.iter().enumerate() {
            let mut layouter = layouter.namespace(|| format!("ledger asset {}", asset_index));

            let fields = [
                entry.total_equity,
                entry.total_debt,
                entry.vip_loan_collateral,
                entry.margin_collateral,
                entry.portfolio_margin_collateral,
            ];
            let mut cells = Vec::with_capacity(ACCOUNT_ASSET_FIELDS);
            for (i, field) in fields.iter().enumerate() {
                cells.push(chips.amount(layouter.namespace(|| format!("field {}", i)), *field)?);
            }
            totals.push(AssetTotals {
                fields: vec_to_array(cells)?,
            });

            prices.push(chips.amount(layouter.namespace(|| "base price"), entry.base_price)?);

            let mut asset_ladders = Vec::with_capacity(CollateralKind::ALL.len());
            for kind in CollateralKind::ALL {
                asset_ladders.push(chips.derive_ladder(
                    layouter.namespace(|| format!("derive {:?} ladder", kind)),
                    entry.ladder(kind),
                )?);
            }
            ladders.push(asset_ladders);
        }

        let computed_before_commitment = chips.ledger_commitment(
            layouter.namespace(|| "before ledger commitment"),
            &totals,
            &prices,
            &ladders,
        )?;
        chips.arithmetic.assert_equal(
            layouter.namespace(|| "before ledger commitment matches"),
            &computed_before_commitment,
            &before_ledger_commitment,
        )?;

        // 3. operation roots
        let mut operation_roots = Vec::with_capacity(N_OPS);
        for (i, op) in self.operations.iter().enumerate() {
            let before = chips
                .arithmetic
                .witness(layouter.namespace(|| format!("op {} before root", i)), Value::known(op.before_root))?;
            let after = chips
                .arithmetic
                .witness(layouter.namespace(|| format!("op {} after root", i)), Value::known(op.after_root))?;
            operation_roots.push((before, after));
        }
        if let (Some((first, _)), Some((_, last))) = (operation_roots.first(), operation_roots.last()) {
            chips.arithmetic.assert_equal(
                layouter.namespace(|| "batch starts from the before root"),
                &before_root,
                first,
            )?;
            chips.arithmetic.assert_equal(
                layouter.namespace(|| "batch ends at the after root"),
                &after_root,
                last,
            )?;
        }

        // 4. ladder table
        chips
            .ladder_table
            .load_null_row(layouter.namespace(|| "ladder table null row"))?;
        for (asset_index, asset_ladders) in ladders.iter().enumerate() {
            for (kind, rows) in CollateralKind::ALL.iter().zip(asset_ladders) {
                chips.ladder_table.insert_ladder(
                    layouter.namespace(|| format!("table {:?} ladder of asset {}", kind, asset_index)),
                    &layout,
                    asset_index,
                    *kind,
                    rows,
                )?;
            }
        }

        // 5. operations, threading the running ledger
        let empty_leaf = empty_leaf_hash(N_ASSETS);
        for (i, (op, (op_before_root, op_after_root))) in
            self.operations.iter().zip(&operation_roots).enumerate()
        {
            totals = chips.create_account(
                layouter.namespace(|| format!("op {}", i)),
                &layout,
                &self.before_ledger,
                op,
                empty_leaf,
                op_before_root,
                op_after_root,
                &prices,
                totals,
            )?;
        }

        // 6. after ledger
        for (asset_index, asset_totals) in totals.iter().enumerate() {
            for (i, field) in asset_totals.fields.iter().enumerate() {
                chips.range_check.assign(
                    layouter.namespace(|| format!("after ledger asset {} field {}", asset_index, i)),
                    field,
                    AMOUNT_BYTES,
                )?;
            }
        }
        let computed_after_commitment = chips.ledger_commitment(
            layouter.namespace(|| "after ledger commitment"),
            &totals,
            &prices,
            &ladders,
        )?;
        chips.arithmetic.assert_equal(
            layouter.namespace(|| "after ledger commitment matches"),
            &computed_after_commitment,
            &after_ledger_commitment,
        )?;

        // 7. root chaining
        for (i, pair) in operation_roots.windows(2).enumerate() {
            chips.arithmetic.assert_equal(
                layouter.namespace(|| format!("op {} chains into op {}", i, i + 1)),
                &pair[0].1,
                &pair[1].0,
            )?;
        }

        Ok(())
    }
}

/// Running totals of one ledger asset, in [crate::ledger::AccountAsset::fields] order
#[derive(Debug, Clone)]
struct AssetTotals {
    fields: [AssignedCell<Fp, Fp>; ACCOUNT_ASSET_FIELDS],
}

fn vec_to_array<const L: usize>(
    cells: Vec<AssignedCell<Fp, Fp>>,
) -> Result<[AssignedCell<Fp, Fp>; L], Error> {
    cells.try_into().map_err(|_| Error::Synthesis)
}

/// Every chip of the batch circuit, built once per synthesis
pub(crate) struct BatchChips {
    pub(crate) arithmetic: ArithmeticChip,
    range_check: RangeCheckChip,
    lt: CheckLtChip,
    division: DivisionChip,
    merkle: MerkleChip,
    poseidon: PoseidonChip<PoseidonSpec, WIDTH, RATE>,
    pub(crate) ladder_table: LadderTableChip,
}

impl BatchChips {
    pub(crate) fn construct(config: &BatchCreateUserConfig) -> Self {
        Self {
            arithmetic: ArithmeticChip::construct(config.arithmetic_config),
            range_check: RangeCheckChip::construct(config.range_check_config),
            lt: CheckLtChip::construct(config.lt_config),
            division: DivisionChip::construct(config.division_config),
            merkle: MerkleChip::construct(config.merkle_config.clone()),
            poseidon: PoseidonChip::construct(config.poseidon_config.clone()),
            ladder_table: LadderTableChip::construct(config.ladder_table_config),
        }
    }

    /// Witnesses a u64 amount and range checks it
    fn amount(
        &self,
        mut layouter: impl Layouter<Fp>,
        value: u64,
    ) -> Result<AssignedCell<Fp, Fp>, Error> {
        let cell = self
            .arithmetic
            .witness(layouter.namespace(|| "witness"), Value::known(Fp::from(value)))?;
        self.range_check
            .assign(layouter.namespace(|| "range check"), &cell, AMOUNT_BYTES)?;
        Ok(cell)
    }

    /// Witnesses the boundaries and rates of a ladder and derives its precomputed values
    pub(crate) fn derive_ladder(
        &self,
        mut layouter: impl Layouter<Fp>,
        ladder: &RateLadder,
    ) -> Result<Vec<LadderRow>, Error> {
        let mut rows: Vec<LadderRow> = Vec::with_capacity(TIER_COUNT);

        for (i, tier) in ladder.tiers().iter().enumerate() {
            let mut layouter = layouter.namespace(|| format!("tier {}", i));

            let boundary = self.arithmetic.witness(
                layouter.namespace(|| "boundary"),
                Value::known(fp_from_u128(tier.boundary)),
            )?;
            self.range_check
                .assign(layouter.namespace(|| "boundary range"), &boundary, VALUE_BYTES)?;

            let rate = self.arithmetic.witness(
                layouter.namespace(|| "rate"),
                Value::known(Fp::from(tier.ratio as u64)),
            )?;
            self.range_check
                .assign(layouter.namespace(|| "rate range"), &rate, 1)?;
            self.lt.assert_lt(
                layouter.namespace(|| "rate at most 100"),
                &rate,
                Operand::Constant(Fp::from(PERCENTAGE_MULTIPLIER + 1)),
                1,
            )?;

            let precomputed = match rows.last() {
                None => {
                    let product = self.arithmetic.mul(
                        layouter.namespace(|| "boundary * rate"),
                        &boundary,
                        &rate,
                    )?;
                    self.division
                        .divide_by_percentage(layouter.namespace(|| "first segment"), &product)?
                }
                Some(previous) => {
                    self.lt.assert_le(
                        layouter.namespace(|| "ascending boundaries"),
                        &previous.boundary,
                        Operand::Cell(&boundary),
                        VALUE_BYTES,
                    )?;
                    let segment = self.arithmetic.sub(
                        layouter.namespace(|| "segment"),
                        &boundary,
                        &previous.boundary,
                    )?;
                    let product = self.arithmetic.mul(
                        layouter.namespace(|| "segment * rate"),
                        &segment,
                        &rate,
                    )?;
                    let quotient = self
                        .division
                        .divide_by_percentage(layouter.namespace(|| "segment value"), &product)?;
                    self.arithmetic.add(
                        layouter.namespace(|| "accumulate precomputed"),
                        &previous.precomputed,
                        &quotient,
                    )?
                }
            };
            self.range_check.assign(
                layouter.namespace(|| "precomputed range"),
                &precomputed,
                VALUE_BYTES,
            )?;

            rows.push(LadderRow {
                boundary,
                rate,
                precomputed,
            });
        }

        Ok(rows)
    }

    /// Realized value of `value` through the ladder of `kind` for `asset_index`, hinted by [RateLadder::locate]
    fn query_ladder(
        &self,
        layouter: impl Layouter<Fp>,
        layout: &LadderLayout,
        asset_index: usize,
        kind: CollateralKind,
        ladder: &RateLadder,
        value: &AssignedCell<Fp, Fp>,
    ) -> Result<AssignedCell<Fp, Fp>, Error> {
        let hint = value.value().map(|v| ladder.locate(&fp_to_big_uint(v)));
        self.query_ladder_with_hint(layouter, layout, asset_index, kind, ladder, value, hint)
    }

    /// Realized value of `value` through the ladder of `kind` for `asset_index`.
    ///
    /// The tier hint is witnessed as is and every claim it makes is re-asserted:
    /// * `index` is a byte below `TIER_COUNT`, `flag` is boolean and only set on the last tier
    /// * `lower.boundary + 1 - is_zero(value) <= value`
    /// * `value <= upper.boundary` when `flag = 0`, `upper.boundary + 1 <= value` when `flag = 1`
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn query_ladder_with_hint(
        &self,
        mut layouter: impl Layouter<Fp>,
        layout: &LadderLayout,
        asset_index: usize,
        kind: CollateralKind,
        ladder: &RateLadder,
        value: &AssignedCell<Fp, Fp>,
        hint: Value<TierHint>,
    ) -> Result<AssignedCell<Fp, Fp>, Error> {
        let index = self.arithmetic.witness(
            layouter.namespace(|| "hint index"),
            hint.map(|h| Fp::from(h.index as u64)),
        )?;
        let flag = self.arithmetic.witness(
            layouter.namespace(|| "hint flag"),
            hint.map(|h| Fp::from(h.exceeds_all as u64)),
        )?;

        self.range_check
            .assign(layouter.namespace(|| "index range"), &index, 1)?;
        self.lt.assert_lt(
            layouter.namespace(|| "index below tier count"),
            &index,
            Operand::Constant(Fp::from(TIER_COUNT as u64)),
            1,
        )?;
        self.arithmetic
            .assert_bool(layouter.namespace(|| "flag is boolean"), &flag)?;
        let last_tier_offset = self.arithmetic.add_constant(
            layouter.namespace(|| "index - last tier"),
            &index,
            -Fp::from(TIER_COUNT as u64 - 1),
        )?;
        let flagged_offset = self.arithmetic.mul(
            layouter.namespace(|| "flag * (index - last tier)"),
            &flag,
            &last_tier_offset,
        )?;
        self.arithmetic.assert_constant(
            layouter.namespace(|| "flag only on the last tier"),
            &flagged_offset,
            Fp::zero(),
        )?;

        let address = self.arithmetic.add_constant(
            layouter.namespace(|| "row address"),
            &index,
            Fp::from(layout.base(asset_index, kind)),
        )?;
        let (lower, upper) = self.ladder_table.query(
            layouter.namespace(|| "ladder rows"),
            &address,
            hint.map(|h| adjacent_tiers(ladder, h.index)),
        )?;

        // lower bound
        let is_zero = self
            .arithmetic
            .is_zero(layouter.namespace(|| "value is zero"), value)?;
        let lower_next = self.arithmetic.add_constant(
            layouter.namespace(|| "lower boundary + 1"),
            &lower.boundary,
            Fp::from(1),
        )?;
        let lower_bound = self.arithmetic.sub(
            layouter.namespace(|| "lower bound"),
            &lower_next,
            &is_zero,
        )?;
        self.lt.assert_le(
            layouter.namespace(|| "value above lower boundary"),
            &lower_bound,
            Operand::Cell(value),
            VALUE_BYTES,
        )?;

        // upper bound
        let upper_next = self.arithmetic.add_constant(
            layouter.namespace(|| "upper boundary + 1"),
            &upper.boundary,
            Fp::from(1),
        )?;
        let lhs = self.arithmetic.select(
            layouter.namespace(|| "upper comparison lhs"),
            &flag,
            &upper_next,
            value,
        )?;
        let rhs = self.arithmetic.select(
            layouter.namespace(|| "upper comparison rhs"),
            &flag,
            value,
            &upper.boundary,
        )?;
        self.lt.assert_le(
            layouter.namespace(|| "upper comparison"),
            &lhs,
            Operand::Cell(&rhs),
            VALUE_BYTES,
        )?;

        // lower.precomputed + (value - lower.boundary) * upper.rate / 100
        let segment = self.arithmetic.sub(
            layouter.namespace(|| "segment"),
            value,
            &lower.boundary,
        )?;
        let product = self.arithmetic.mul(
            layouter.namespace(|| "segment * rate"),
            &segment,
            &upper.rate,
        )?;
        let quotient = self
            .division
            .divide_by_percentage(layouter.namespace(|| "segment value"), &product)?;
        let interpolated = self.arithmetic.add(
            layouter.namespace(|| "interpolated value"),
            &lower.precomputed,
            &quotient,
        )?;

        self.arithmetic.select(
            layouter.namespace(|| "realized value"),
            &flag,
            &upper.precomputed,
            &interpolated,
        )
    }

    /// Packs the ledger into field elements and hashes them
    fn ledger_commitment(
        &self,
        mut layouter: impl Layouter<Fp>,
        totals: &[AssetTotals],
        prices: &[AssignedCell<Fp, Fp>],
        ladders: &[Vec<Vec<LadderRow>>],
    ) -> Result<AssignedCell<Fp, Fp>, Error> {
        let mut elements = vec![];

        for (asset_index, ((asset_totals, price), asset_ladders)) in
            totals.iter().zip(prices).zip(ladders).enumerate()
        {
            let mut layouter = layouter.namespace(|| format!("pack asset {}", asset_index));
            let [equity, debt, vip_loan, margin, portfolio_margin] = &asset_totals.fields;

            elements.push(self.pack_triple(
                layouter.namespace(|| "totals"),
                [equity, debt, price],
            )?);
            elements.push(self.pack_triple(
                layouter.namespace(|| "collaterals"),
                [vip_loan, margin, portfolio_margin],
            )?);

            for (kind, rows) in CollateralKind::ALL.iter().zip(asset_ladders) {
                for (pair, tiers) in rows.chunks(2).enumerate() {
                    let (lo, hi) = match tiers {
                        [lo, hi] => (lo, hi),
                        _ => return Err(Error::Synthesis),
                    };
                    elements.push(self.arithmetic.weighted_sum(
                        layouter.namespace(|| format!("{:?} tier pair {}", kind, pair)),
                        &[
                            (&lo.rate, Fp::from(1)),
                            (&lo.boundary, pow_of_two(8)),
                            (&hi.rate, pow_of_two(126)),
                            (&hi.boundary, pow_of_two(134)),
                        ],
                    )?);
                }
            }
        }

        self.hash_sequence(layouter.namespace(|| "hash ledger"), &elements)
    }

    /// `a * 2^128 + b * 2^64 + c`
    fn pack_triple(
        &self,
        layouter: impl Layouter<Fp>,
        [a, b, c]: [&AssignedCell<Fp, Fp>; 3],
    ) -> Result<AssignedCell<Fp, Fp>, Error> {
        self.arithmetic.weighted_sum(
            layouter,
            &[(a, pow_of_two(128)), (b, pow_of_two(64)), (c, Fp::from(1))],
        )
    }

    fn hash_sequence(
        &self,
        mut layouter: impl Layouter<Fp>,
        elements: &[AssignedCell<Fp, Fp>],
    ) -> Result<AssignedCell<Fp, Fp>, Error> {
        let length = self.arithmetic.constant(
            layouter.namespace(|| "sequence length"),
            Fp::from(elements.len() as u64),
        )?;
        self.poseidon
            .hash_sequence(layouter.namespace(|| "sequence hash"), length, elements)
    }

    /// Proves one account creation and returns the updated running ledger
    #[allow(clippy::too_many_arguments)]
    fn create_account(
        &self,
        mut layouter: impl Layouter<Fp>,
        layout: &LadderLayout,
        ledger: &[AssetLedgerEntry],
        op: &BatchOperation,
        empty_leaf: Fp,
        before_root: &AssignedCell<Fp, Fp>,
        after_root: &AssignedCell<Fp, Fp>,
        prices: &[AssignedCell<Fp, Fp>],
        totals: Vec<AssetTotals>,
    ) -> Result<Vec<AssetTotals>, Error> {
        // a. the slot is empty in the before tree
        let index = self.arithmetic.witness(
            layouter.namespace(|| "account index"),
            Value::known(Fp::from(op.account_index as u64)),
        )?;
        let bits = self
            .merkle
            .decompose_index(layouter.namespace(|| "path bits"), &index)?;

        let mut siblings = Vec::with_capacity(op.account_proof.siblings().len());
        for (level, sibling) in op.account_proof.siblings().iter().enumerate() {
            siblings.push(self.arithmetic.witness(
                layouter.namespace(|| format!("sibling {}", level)),
                Value::known(*sibling),
            )?);
        }

        let empty_leaf = self
            .arithmetic
            .constant(layouter.namespace(|| "empty leaf"), empty_leaf)?;
        let computed_before_root = self.merkle.compute_root(
            layouter.namespace(|| "root with empty slot"),
            &empty_leaf,
            &siblings,
            &bits,
        )?;
        self.arithmetic.assert_equal(
            layouter.namespace(|| "empty slot in before root"),
            &computed_before_root,
            before_root,
        )?;

        // b. holdings
        let zero = self
            .arithmetic
            .constant(layouter.namespace(|| "zero"), Fp::zero())?;
        let mut total_equity = zero.clone();
        let mut total_debt = zero.clone();
        let mut total_collateral = zero.clone();
        let mut asset_cells: Vec<AssignedCell<Fp, Fp>> =
            Vec::with_capacity(ACCOUNT_ASSET_FIELDS * op.assets.len());
        let mut next_totals = Vec::with_capacity(totals.len());

        for (asset_index, (((asset, entry), price), asset_totals)) in op
            .assets
            .iter()
            .zip(ledger)
            .zip(prices)
            .zip(totals)
            .enumerate()
        {
            let mut layouter = layouter.namespace(|| format!("asset {}", asset_index));

            let mut fields = Vec::with_capacity(ACCOUNT_ASSET_FIELDS);
            for (i, value) in asset.fields().iter().enumerate() {
                fields.push(self.amount(layouter.namespace(|| format!("field {}", i)), *value)?);
            }
            let fields: [AssignedCell<Fp, Fp>; ACCOUNT_ASSET_FIELDS] = vec_to_array(fields)?;
            let [equity, debt, vip_loan, margin, portfolio_margin] = &fields;

            let pledged = self.arithmetic.weighted_sum(
                layouter.namespace(|| "pledged collateral"),
                &[
                    (vip_loan, Fp::from(1)),
                    (margin, Fp::from(1)),
                    (portfolio_margin, Fp::from(1)),
                ],
            )?;
            self.range_check.assign(
                layouter.namespace(|| "pledged collateral range"),
                &pledged,
                AMOUNT_BYTES,
            )?;
            self.lt.assert_le(
                layouter.namespace(|| "pledged collateral within equity"),
                &pledged,
                Operand::Cell(equity),
                AMOUNT_BYTES,
            )?;

            for (kind, amount) in CollateralKind::ALL.iter().zip([vip_loan, margin, portfolio_margin]) {
                let value = self.arithmetic.mul(
                    layouter.namespace(|| format!("{:?} value", kind)),
                    amount,
                    price,
                )?;
                let realized = self.query_ladder(
                    layouter.namespace(|| format!("{:?} realized value", kind)),
                    layout,
                    asset_index,
                    *kind,
                    entry.ladder(*kind),
                    &value,
                )?;
                total_collateral = self.arithmetic.add(
                    layouter.namespace(|| format!("accumulate {:?} collateral", kind)),
                    &total_collateral,
                    &realized,
                )?;
            }

            total_equity = self.arithmetic.mul_add(
                layouter.namespace(|| "accumulate equity"),
                equity,
                price,
                &total_equity,
            )?;
            total_debt = self.arithmetic.mul_add(
                layouter.namespace(|| "accumulate debt"),
                debt,
                price,
                &total_debt,
            )?;

            let mut updated = Vec::with_capacity(ACCOUNT_ASSET_FIELDS);
            for (i, (running, field)) in asset_totals.fields.iter().zip(&fields).enumerate() {
                updated.push(self.arithmetic.add(
                    layouter.namespace(|| format!("ledger field {}", i)),
                    running,
                    field,
                )?);
            }
            next_totals.push(AssetTotals {
                fields: vec_to_array(updated)?,
            });

            asset_cells.extend(fields);
        }

        // b'. solvency
        self.range_check.assign(
            layouter.namespace(|| "total debt range"),
            &total_debt,
            VALUE_BYTES,
        )?;
        self.range_check.assign(
            layouter.namespace(|| "total collateral range"),
            &total_collateral,
            VALUE_BYTES,
        )?;
        self.lt.assert_le(
            layouter.namespace(|| "debt covered by collateral"),
            &total_debt,
            Operand::Cell(&total_collateral),
            VALUE_BYTES,
        )?;

        // c. the new leaf in the after tree
        while asset_cells.len() % 3 != 0 {
            asset_cells.push(zero.clone());
        }
        let mut elements = Vec::with_capacity(asset_cells.len() / 3);
        for (i, triple) in asset_cells.chunks(3).enumerate() {
            elements.push(self.pack_triple(
                layouter.namespace(|| format!("assets element {}", i)),
                [&triple[0], &triple[1], &triple[2]],
            )?);
        }
        let assets_commitment =
            self.hash_sequence(layouter.namespace(|| "assets commitment"), &elements)?;

        let account_id_hash = self.arithmetic.witness(
            layouter.namespace(|| "account id hash"),
            Value::known(op.account_id_hash),
        )?;
        let leaf = self.poseidon.hash(
            layouter.namespace(|| "account leaf"),
            [account_id_hash, total_equity, total_debt, assets_commitment],
        )?;
        let computed_after_root = self.merkle.compute_root(
            layouter.namespace(|| "root with new account"),
            &leaf,
            &siblings,
            &bits,
        )?;
        self.arithmetic.assert_equal(
            layouter.namespace(|| "new account in after root"),
            &computed_after_root,
            after_root,
        )?;

        Ok(next_totals)
    }
}
