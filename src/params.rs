// Depth of the account merkle tree. Account indices must fit in TREE_DEPTH bits
pub const TREE_DEPTH: usize = 28;
// Number of tiers in each rate ladder. Must be even, tiers are committed two per field element
pub const TIER_COUNT: usize = 10;
// Rates are expressed as percentages
pub const PERCENTAGE_MULTIPLIER: u64 = 100;
// Boundary used to pad ladders, 2^128 - 1
pub const MAX_TIER_BOUNDARY: u128 = u128::MAX;
// Multiplier applied to the integer bounds of a tier string
pub const TIER_VALUE_MULTIPLIER: u128 = 10_000_000_000_000_000;
// Number of collateral kinds, each with its own ladder
pub const COLLATERAL_KINDS: usize = 3;
// Number of field elements committing to one ledger entry
pub const LEDGER_ELEMENTS_PER_ASSET: usize = 2 + COLLATERAL_KINDS * TIER_COUNT / 2;
// Number of fields of an account asset packed into the assets commitment
pub const ACCOUNT_ASSET_FIELDS: usize = 5;

// Production dimensions of the batch circuit
pub const ASSET_COUNTS: usize = 350;
pub const BATCH_CREATE_USER_OPS_COUNTS: usize = 864;

/// Number of field elements in the assets commitment of an account over `n_assets` assets
pub const fn account_assets_elements(n_assets: usize) -> usize {
    (n_assets * ACCOUNT_ASSET_FIELDS + 2) / 3
}

// Decimal places kept when reading base prices from a ledger snapshot
pub const PRICE_DECIMALS: usize = 8;
