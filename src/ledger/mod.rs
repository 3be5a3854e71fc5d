mod csv_parser;
pub mod packing;
mod tests;

pub use csv_parser::parse_csv_to_ledger;

use crate::ladder::RateLadder;
use serde::{Deserialize, Serialize};

/// The three kinds of collateral an account can pledge, each valued through its own ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollateralKind {
    VipLoan,
    Margin,
    PortfolioMargin,
}

impl CollateralKind {
    /// Ledger order of the kinds. Commitments and the ladder table follow it.
    pub const ALL: [CollateralKind; 3] = [
        CollateralKind::VipLoan,
        CollateralKind::Margin,
        CollateralKind::PortfolioMargin,
    ];

    pub fn index(self) -> usize {
        match self {
            CollateralKind::VipLoan => 0,
            CollateralKind::Margin => 1,
            CollateralKind::PortfolioMargin => 2,
        }
    }
}

/// Totals of one asset across every account, plus its pricing and ladders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetLedgerEntry {
    pub symbol: String,
    pub total_equity: u64,
    pub total_debt: u64,
    pub base_price: u64,
    pub vip_loan_collateral: u64,
    pub margin_collateral: u64,
    pub portfolio_margin_collateral: u64,
    pub vip_loan_ladder: RateLadder,
    pub margin_ladder: RateLadder,
    pub portfolio_margin_ladder: RateLadder,
}

impl AssetLedgerEntry {
    /// Entry of a listed asset before any account holds it
    pub fn new(symbol: impl Into<String>, base_price: u64, ladders: [RateLadder; 3]) -> Self {
        let [vip_loan_ladder, margin_ladder, portfolio_margin_ladder] = ladders;
        Self {
            symbol: symbol.into(),
            total_equity: 0,
            total_debt: 0,
            base_price,
            vip_loan_collateral: 0,
            margin_collateral: 0,
            portfolio_margin_collateral: 0,
            vip_loan_ladder,
            margin_ladder,
            portfolio_margin_ladder,
        }
    }

    /// Zero-filled slot of the fixed asset universe
    pub fn empty() -> Self {
        Self::new(
            "",
            0,
            [
                RateLadder::inactive(),
                RateLadder::inactive(),
                RateLadder::inactive(),
            ],
        )
    }

    pub fn ladder(&self, kind: CollateralKind) -> &RateLadder {
        match kind {
            CollateralKind::VipLoan => &self.vip_loan_ladder,
            CollateralKind::Margin => &self.margin_ladder,
            CollateralKind::PortfolioMargin => &self.portfolio_margin_ladder,
        }
    }

    pub fn collateral(&self, kind: CollateralKind) -> u64 {
        match kind {
            CollateralKind::VipLoan => self.vip_loan_collateral,
            CollateralKind::Margin => self.margin_collateral,
            CollateralKind::PortfolioMargin => self.portfolio_margin_collateral,
        }
    }

    /// Adds the holding of one account to the totals. Returns `None` on overflow.
    pub fn checked_accumulate(&self, asset: &AccountAsset) -> Option<Self> {
        Some(Self {
            total_equity: self.total_equity.checked_add(asset.equity)?,
            total_debt: self.total_debt.checked_add(asset.debt)?,
            vip_loan_collateral: self.vip_loan_collateral.checked_add(asset.vip_loan)?,
            margin_collateral: self.margin_collateral.checked_add(asset.margin)?,
            portfolio_margin_collateral: self
                .portfolio_margin_collateral
                .checked_add(asset.portfolio_margin)?,
            ..self.clone()
        })
    }
}

/// Holding of one asset by one account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountAsset {
    pub index: u16,
    pub equity: u64,
    pub debt: u64,
    pub vip_loan: u64,
    pub margin: u64,
    pub portfolio_margin: u64,
}

impl AccountAsset {
    pub fn zero(index: u16) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    pub fn collateral(&self, kind: CollateralKind) -> u64 {
        match kind {
            CollateralKind::VipLoan => self.vip_loan,
            CollateralKind::Margin => self.margin,
            CollateralKind::PortfolioMargin => self.portfolio_margin,
        }
    }

    pub fn collateral_sum(&self) -> u128 {
        self.vip_loan as u128 + self.margin as u128 + self.portfolio_margin as u128
    }

    /// Fields in commitment order
    pub fn fields(&self) -> [u64; 5] {
        [
            self.equity,
            self.debt,
            self.vip_loan,
            self.margin,
            self.portfolio_margin,
        ]
    }
}

/// Expands a sparse list of holdings, sorted by asset index, to the full universe of `n_assets` slots
pub fn densify(assets: &[AccountAsset], n_assets: usize) -> Vec<AccountAsset> {
    let mut dense: Vec<AccountAsset> = (0..n_assets).map(|i| AccountAsset::zero(i as u16)).collect();
    for asset in assets {
        if let Some(slot) = dense.get_mut(asset.index as usize) {
            *slot = *asset;
        }
    }
    dense
}
