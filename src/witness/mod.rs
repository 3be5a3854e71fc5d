mod builder;
mod codec;
mod recover;

pub use builder::{AccountInput, WitnessBuilder};
pub(crate) use builder::validate_account;
pub use recover::recover_after_ledger;

use crate::account_tree::AccountProof;
use crate::ledger::{densify, AccountAsset, AssetLedgerEntry};
use crate::utils::fp_serde;
use halo2_proofs::halo2curves::bn256::Fr as Fp;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum WitnessError {
    #[error("account {account_index}: asset index {asset_index} is outside of the {n_assets} assets universe")]
    AssetIndexOutOfRange {
        account_index: u32,
        asset_index: u16,
        n_assets: usize,
    },
    #[error("account {account_index}: assets are not sorted by unique index")]
    AssetsNotSorted { account_index: u32 },
    #[error("account {account_index}: collateral of asset {asset_index} exceeds its equity")]
    CollateralExceedsEquity { account_index: u32, asset_index: u16 },
    #[error("account slot {0} is not empty")]
    SlotOccupied(u32),
    #[error("account index {0} does not fit in the account tree")]
    AccountIndexOutOfRange(u32),
    #[error("ledger totals of asset {asset_index} overflow")]
    Overflow { asset_index: u16 },
    #[error("account {account_index}: totals do not fit in 128 bits")]
    TotalsTooLarge { account_index: u32 },
    #[error("account {account_index} is insolvent: debt {debt} exceeds collateral {collateral}")]
    Insolvent {
        account_index: u32,
        debt: BigUint,
        collateral: BigUint,
    },
    #[error("after ledger does not match its commitment")]
    CommitmentMismatch,
    #[error("before ledger does not match its commitment")]
    BeforeCommitmentMismatch,
    #[error("batch commitment does not bind the roots and ledger commitments")]
    BatchCommitmentMismatch,
    #[error("account {account_index}: tree roots do not chain")]
    BrokenRootChain { account_index: u32 },
    #[error("unable to encode witness: {0}")]
    Encode(String),
    #[error("unable to decode witness: {0}")]
    Decode(String),
    #[error("malformed witness: {0}")]
    Shape(String),
}

/// Creation of one account, as seen by the batch circuit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOperation {
    #[serde(with = "fp_serde::fp")]
    pub before_root: Fp,
    #[serde(with = "fp_serde::fp")]
    pub after_root: Fp,
    pub account_index: u32,
    #[serde(with = "fp_serde::fp")]
    pub account_id_hash: Fp,
    /// Sparse holdings, sorted by asset index
    pub assets: Vec<AccountAsset>,
    pub account_proof: AccountProof,
}

/// Everything the batch circuit needs to prove a batch of account creations
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchWitness {
    #[serde(with = "fp_serde::fp")]
    pub batch_commitment: Fp,
    #[serde(with = "fp_serde::fp")]
    pub before_ledger_commitment: Fp,
    #[serde(with = "fp_serde::fp")]
    pub after_ledger_commitment: Fp,
    #[serde(with = "fp_serde::fp")]
    pub before_account_tree_root: Fp,
    #[serde(with = "fp_serde::fp")]
    pub after_account_tree_root: Fp,
    pub before_ledger: Vec<AssetLedgerEntry>,
    pub operations: Vec<BatchOperation>,
}

impl BatchWitness {
    /// Holdings of every operation expanded to the full universe of `n_assets` slots
    pub fn dense_assets(&self, n_assets: usize) -> Vec<Vec<AccountAsset>> {
        self.operations
            .iter()
            .map(|op| densify(&op.assets, n_assets))
            .collect()
    }
}
