//! Field element layout of the ledger and account commitments.
//!
//! Every function here has an in-circuit twin in the batch circuit, both must agree bit for bit.
use crate::chips::range::utils::pow_of_two;
use crate::ladder::TierRatio;
use crate::ledger::{densify, AccountAsset, AssetLedgerEntry, CollateralKind};
use crate::params::{LEDGER_ELEMENTS_PER_ASSET, TIER_COUNT};
use crate::utils::hash::poseidon_sequence;
use crate::utils::{fp_from_u128, fp_to_big_uint};
use halo2_proofs::halo2curves::bn256::Fr as Fp;
use num_bigint::BigUint;

/// Bits between the two tiers of a packed pair
const TIER_PAIR_SHIFT: usize = 126;
/// Boundaries below `2^118` keep the two tiers of a pair apart
pub const UNPACKABLE_BOUNDARY_BITS: usize = TIER_PAIR_SHIFT - 8;

/// `a * 2^128 + b * 2^64 + c`
pub fn pack_triple(a: u64, b: u64, c: u64) -> Fp {
    Fp::from(a) * pow_of_two(128) + Fp::from(b) * pow_of_two(64) + Fp::from(c)
}

/// Inverse of [pack_triple]
pub fn unpack_triple(value: &Fp) -> Option<(u64, u64, u64)> {
    let value = fp_to_big_uint(value);
    if value.bits() > 192 {
        return None;
    }
    let mut limbs = value.iter_u64_digits();
    let c = limbs.next().unwrap_or(0);
    let b = limbs.next().unwrap_or(0);
    let a = limbs.next().unwrap_or(0);
    Some((a, b, c))
}

/// `ratio_lo + boundary_lo * 2^8 + ratio_hi * 2^126 + boundary_hi * 2^134`, evaluated in the field
pub fn pack_tier_pair(lo: &TierRatio, hi: &TierRatio) -> Fp {
    Fp::from(lo.ratio as u64)
        + fp_from_u128(lo.boundary) * pow_of_two(8)
        + Fp::from(hi.ratio as u64) * pow_of_two(TIER_PAIR_SHIFT)
        + fp_from_u128(hi.boundary) * pow_of_two(TIER_PAIR_SHIFT + 8)
}

/// Inverse of [pack_tier_pair], returns `((boundary_lo, ratio_lo), (boundary_hi, ratio_hi))`.
///
/// Only defined when both boundaries are below `2^118`, above that the packing overlaps.
pub fn unpack_tier_pair(value: &Fp) -> Option<((u128, u8), (u128, u8))> {
    let value = fp_to_big_uint(value);
    let byte_mask = BigUint::from(0xffu8);
    let boundary_mask = (BigUint::from(1u8) << UNPACKABLE_BOUNDARY_BITS) - 1u8;

    let hi_boundary = &value >> (TIER_PAIR_SHIFT + 8);
    if hi_boundary.bits() > UNPACKABLE_BOUNDARY_BITS as u64 {
        return None;
    }

    let lo_ratio = &value & &byte_mask;
    let lo_boundary = (&value >> 8) & &boundary_mask;
    let hi_ratio = (&value >> TIER_PAIR_SHIFT) & &byte_mask;

    let to_u128 = |v: &BigUint| -> u128 {
        v.iter_u64_digits()
            .enumerate()
            .fold(0u128, |acc, (i, limb)| acc | ((limb as u128) << (64 * i)))
    };
    let to_u8 = |v: &BigUint| -> u8 { v.iter_u64_digits().next().unwrap_or(0) as u8 };

    Some((
        (to_u128(&lo_boundary), to_u8(&lo_ratio)),
        (to_u128(&hi_boundary), to_u8(&hi_ratio)),
    ))
}

/// The `LEDGER_ELEMENTS_PER_ASSET` field elements committing to one ledger entry
pub fn ledger_elements(entry: &AssetLedgerEntry) -> Vec<Fp> {
    let mut elements = Vec::with_capacity(LEDGER_ELEMENTS_PER_ASSET);
    elements.push(pack_triple(
        entry.total_equity,
        entry.total_debt,
        entry.base_price,
    ));
    elements.push(pack_triple(
        entry.vip_loan_collateral,
        entry.margin_collateral,
        entry.portfolio_margin_collateral,
    ));
    for kind in CollateralKind::ALL {
        let tiers = entry.ladder(kind).tiers();
        for pair in (0..TIER_COUNT).step_by(2) {
            elements.push(pack_tier_pair(&tiers[pair], &tiers[pair + 1]));
        }
    }
    elements
}

/// Commitment to the ledger over a universe of `n_assets` slots, trailing slots zero-filled
pub fn ledger_commitment(ledger: &[AssetLedgerEntry], n_assets: usize) -> Fp {
    let empty = AssetLedgerEntry::empty();
    let elements: Vec<Fp> = (0..n_assets)
        .flat_map(|i| ledger_elements(ledger.get(i).unwrap_or(&empty)))
        .collect();
    poseidon_sequence(&elements)
}

/// Field elements committing to the holdings of an account over a universe of `n_assets` slots.
/// The five fields of each asset are flattened, zero-padded to a multiple of three and packed as triples.
pub fn account_assets_elements(assets: &[AccountAsset], n_assets: usize) -> Vec<Fp> {
    let mut flat: Vec<u64> = densify(assets, n_assets)
        .iter()
        .flat_map(|asset| asset.fields())
        .collect();
    while flat.len() % 3 != 0 {
        flat.push(0);
    }
    flat.chunks(3)
        .map(|chunk| pack_triple(chunk[0], chunk[1], chunk[2]))
        .collect()
}

pub fn account_assets_commitment(assets: &[AccountAsset], n_assets: usize) -> Fp {
    poseidon_sequence(&account_assets_elements(assets, n_assets))
}

/// Sum of `amount * base_price` over the holdings, used for the account totals of the leaf
pub fn priced_total(
    assets: &[AccountAsset],
    ledger: &[AssetLedgerEntry],
    amount: impl Fn(&AccountAsset) -> u64,
) -> BigUint {
    assets
        .iter()
        .map(|asset| {
            let price = ledger
                .get(asset.index as usize)
                .map(|entry| entry.base_price)
                .unwrap_or(0);
            BigUint::from(amount(asset)) * BigUint::from(price)
        })
        .sum()
}

