mod tier;

pub use tier::{divide_by_percentage, LadderError, RateLadder, TierHint, TierRatio};
