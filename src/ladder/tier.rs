use crate::params::{MAX_TIER_BOUNDARY, PERCENTAGE_MULTIPLIER, TIER_COUNT, TIER_VALUE_MULTIPLIER};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LadderError {
    #[error("ladder has {0} tiers, the maximum is {max}", max = TIER_COUNT)]
    TooManyTiers(usize),
    #[error("boundary of tier {index} is not above the previous boundary")]
    NotAscending { index: usize },
    #[error("ratio {ratio} of tier {index} exceeds 100")]
    RatioTooLarge { index: usize, ratio: u64 },
    #[error("boundary of tier {index} does not fit in 128 bits")]
    BoundaryTooLarge { index: usize },
    #[error("tier {index} does not start where the previous tier ends")]
    Gap { index: usize },
    #[error("malformed tier segment `{0}`")]
    Parse(String),
}

/// One step of a rate ladder.
///
/// `precomputed` is the realized value of a collateral worth exactly `boundary`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRatio {
    pub boundary: u128,
    pub ratio: u8,
    pub precomputed: u128,
}

/// Oracle answer for [RateLadder::locate].
///
/// `index` is the first tier whose boundary is not below the value. When every boundary is below the value,
/// `index` is the last tier and `exceeds_all` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierHint {
    pub index: usize,
    pub exceeds_all: bool,
}

/// Piecewise linear haircut curve applied to a collateral value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLadder {
    tiers: [TierRatio; TIER_COUNT],
}

/// Returns `floor(amount * ratio / 100)` without leaving u128
fn apply_ratio(amount: u128, ratio: u8) -> u128 {
    let multiplier = PERCENTAGE_MULTIPLIER as u128;
    let ratio = ratio as u128;
    (amount / multiplier) * ratio + (amount % multiplier) * ratio / multiplier
}

/// Division oracle: returns `(dividend / 100, dividend % 100)`
pub fn divide_by_percentage(dividend: &BigUint) -> (BigUint, BigUint) {
    let multiplier = BigUint::from(PERCENTAGE_MULTIPLIER);
    (dividend / &multiplier, dividend % &multiplier)
}

impl RateLadder {
    /// Builds a ladder from up to `TIER_COUNT` `(boundary, ratio)` pairs.
    /// Missing tiers are padded with the `MAX_TIER_BOUNDARY` sentinel at ratio 0.
    pub fn new(tiers: &[(u128, u64)]) -> Result<Self, LadderError> {
        if tiers.len() > TIER_COUNT {
            return Err(LadderError::TooManyTiers(tiers.len()));
        }

        let mut ladder = [TierRatio::default(); TIER_COUNT];
        let mut previous: Option<TierRatio> = None;

        for (index, &(boundary, ratio)) in tiers.iter().enumerate() {
            if ratio > PERCENTAGE_MULTIPLIER {
                return Err(LadderError::RatioTooLarge { index, ratio });
            }
            let ratio = ratio as u8;

            let precomputed = match previous {
                None => apply_ratio(boundary, ratio),
                Some(prev) => {
                    if boundary <= prev.boundary {
                        return Err(LadderError::NotAscending { index });
                    }
                    prev.precomputed + apply_ratio(boundary - prev.boundary, ratio)
                }
            };

            let tier = TierRatio {
                boundary,
                ratio,
                precomputed,
            };
            ladder[index] = tier;
            previous = Some(tier);
        }

        let last_precomputed = previous.map(|tier| tier.precomputed).unwrap_or(0);
        for tier in ladder.iter_mut().skip(tiers.len()) {
            *tier = TierRatio {
                boundary: MAX_TIER_BOUNDARY,
                ratio: 0,
                precomputed: last_precomputed,
            };
        }

        Ok(Self { tiers: ladder })
    }

    /// The all-zero ladder of an unused asset slot
    pub fn inactive() -> Self {
        Self {
            tiers: [TierRatio::default(); TIER_COUNT],
        }
    }

    /// Parses a tier string such as `0-100:100,100-1000:50`.
    ///
    /// Bounds are integers scaled by `TIER_VALUE_MULTIPLIER`, decimal fractions are truncated.
    /// Segments must be contiguous and start at 0. An empty string gives a ladder made of sentinels only.
    pub fn parse(encoded: &str) -> Result<Self, LadderError> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Self::new(&[]);
        }

        let mut tiers = Vec::with_capacity(TIER_COUNT);
        let mut previous_high: u128 = 0;

        for (index, segment) in encoded.split(',').enumerate() {
            let (range, ratio) = segment
                .split_once(':')
                .ok_or_else(|| LadderError::Parse(segment.to_string()))?;
            let (low, high) = range
                .split_once('-')
                .ok_or_else(|| LadderError::Parse(segment.to_string()))?;

            let low = parse_truncated(low).ok_or_else(|| LadderError::Parse(segment.to_string()))?;
            let high =
                parse_truncated(high).ok_or_else(|| LadderError::Parse(segment.to_string()))?;
            let ratio =
                parse_truncated(ratio).ok_or_else(|| LadderError::Parse(segment.to_string()))?;

            if low != previous_high {
                return Err(LadderError::Gap { index });
            }
            previous_high = high;

            let boundary = high
                .checked_mul(TIER_VALUE_MULTIPLIER)
                .ok_or(LadderError::BoundaryTooLarge { index })?;
            let ratio = u64::try_from(ratio).unwrap_or(u64::MAX);

            tiers.push((boundary, ratio));
        }

        Self::new(&tiers)
    }

    pub fn tiers(&self) -> &[TierRatio; TIER_COUNT] {
        &self.tiers
    }

    /// Oracle locating the tier a collateral value falls in. The boundary is inclusive.
    pub fn locate(&self, value: &BigUint) -> TierHint {
        self.tiers
            .iter()
            .position(|tier| BigUint::from(tier.boundary) >= *value)
            .map(|index| TierHint {
                index,
                exceeds_all: false,
            })
            .unwrap_or(TierHint {
                index: TIER_COUNT - 1,
                exceeds_all: true,
            })
    }

    /// Realized value of a collateral worth `value`
    pub fn evaluate(&self, value: &BigUint) -> BigUint {
        let hint = self.locate(value);
        let upper = &self.tiers[hint.index];

        if hint.exceeds_all {
            return BigUint::from(upper.precomputed);
        }

        if hint.index == 0 {
            let (quotient, _) = divide_by_percentage(&(value * BigUint::from(upper.ratio)));
            return quotient;
        }

        let lower = &self.tiers[hint.index - 1];
        let segment = value - BigUint::from(lower.boundary);
        let (quotient, _) = divide_by_percentage(&(segment * BigUint::from(upper.ratio)));
        BigUint::from(lower.precomputed) + quotient
    }
}

/// Parses the integer part of a decimal string
fn parse_truncated(value: &str) -> Option<u128> {
    let value = value.trim();
    let integer = value.split('.').next().unwrap_or_default();
    if integer.is_empty() {
        return if value.starts_with('.') { Some(0) } else { None };
    }
    integer.parse::<u128>().ok()
}
