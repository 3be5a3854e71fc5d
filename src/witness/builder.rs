use crate::account_tree::{AccountRecord, AccountTree};
use crate::ledger::packing::ledger_commitment;
use crate::ledger::{AccountAsset, AssetLedgerEntry, CollateralKind};
use crate::utils::hash::poseidon_hash;
use crate::witness::{BatchOperation, BatchWitness, WitnessError};
use ark_std::{end_timer, start_timer};
use halo2_proofs::halo2curves::bn256::Fr as Fp;
use num_bigint::BigUint;
use std::thread;
use tracing::{debug, info, warn};

/// Account to be created by a batch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountInput {
    pub account_index: u32,
    pub account_id_hash: Fp,
    /// Sparse holdings, sorted by asset index
    pub assets: Vec<AccountAsset>,
}

/// Builds batch witnesses on top of a ledger snapshot and an account tree.
///
/// Every successful batch advances the builder: its after ledger and tree become the starting point of the next batch.
pub struct WitnessBuilder<const N_ASSETS: usize> {
    ledger: Vec<AssetLedgerEntry>,
    tree: AccountTree,
}

impl<const N_ASSETS: usize> WitnessBuilder<N_ASSETS> {
    /// Starts from an empty account tree
    pub fn new(ledger: Vec<AssetLedgerEntry>) -> Result<Self, WitnessError> {
        Self::from_parts(ledger, AccountTree::new(N_ASSETS))
    }

    pub fn from_parts(
        mut ledger: Vec<AssetLedgerEntry>,
        tree: AccountTree,
    ) -> Result<Self, WitnessError> {
        if ledger.len() > N_ASSETS {
            return Err(WitnessError::Shape(format!(
                "ledger lists {} assets, the universe holds {}",
                ledger.len(),
                N_ASSETS
            )));
        }
        ledger.resize_with(N_ASSETS, AssetLedgerEntry::empty);

        Ok(WitnessBuilder { ledger, tree })
    }

    pub fn ledger(&self) -> &[AssetLedgerEntry] {
        &self.ledger
    }

    pub fn tree(&self) -> &AccountTree {
        &self.tree
    }

    pub fn ledger_commitment(&self) -> Fp {
        ledger_commitment(&self.ledger, N_ASSETS)
    }

    /// Checks the holdings of an account and its solvency against the current ledger
    pub fn validate(&self, account: &AccountInput) -> Result<(), WitnessError> {
        validate_account(
            &self.ledger,
            account.account_index,
            &account.assets,
            N_ASSETS,
        )
    }

    /// Creates `accounts` in order and returns the witness of the whole batch.
    ///
    /// Nothing is changed when an account is rejected.
    pub fn build_batch(&mut self, accounts: &[AccountInput]) -> Result<BatchWitness, WitnessError> {
        if accounts.is_empty() {
            return Err(WitnessError::Shape("a batch creates at least one account".into()));
        }

        for account in accounts {
            self.validate(account).map_err(log_rejection)?;
        }

        let leaves_timer = start_timer!(|| "compute account leaves");
        let leaves = compute_leaves::<N_ASSETS>(accounts, &self.ledger);
        end_timer!(leaves_timer);

        let tree_timer = start_timer!(|| "insert accounts");
        let mut tree = self.tree.clone();
        let mut after_ledger = self.ledger.clone();
        let mut operations = Vec::with_capacity(accounts.len());
        for (account, leaf) in accounts.iter().zip(leaves) {
            let before_root = tree.root();
            let account_proof = tree
                .generate_proof(account.account_index)
                .map_err(log_rejection)?;
            tree.insert(account.account_index, leaf)
                .map_err(log_rejection)?;
            let after_root = tree.root();
            debug!(
                account_index = account.account_index,
                "account inserted, root moves from {:?} to {:?}", before_root, after_root
            );

            for asset in &account.assets {
                let slot = &mut after_ledger[asset.index as usize];
                *slot = slot
                    .checked_accumulate(asset)
                    .ok_or(WitnessError::Overflow {
                        asset_index: asset.index,
                    })
                    .map_err(log_rejection)?;
            }

            operations.push(BatchOperation {
                before_root,
                after_root,
                account_index: account.account_index,
                account_id_hash: account.account_id_hash,
                assets: account.assets.clone(),
                account_proof,
            });
        }
        end_timer!(tree_timer);

        let before_ledger_commitment = ledger_commitment(&self.ledger, N_ASSETS);
        let after_ledger_commitment = ledger_commitment(&after_ledger, N_ASSETS);
        let before_account_tree_root = self.tree.root();
        let after_account_tree_root = tree.root();
        let batch_commitment = poseidon_hash([
            before_account_tree_root,
            after_account_tree_root,
            before_ledger_commitment,
            after_ledger_commitment,
        ]);

        let witness = BatchWitness {
            batch_commitment,
            before_ledger_commitment,
            after_ledger_commitment,
            before_account_tree_root,
            after_account_tree_root,
            before_ledger: std::mem::replace(&mut self.ledger, after_ledger),
            operations,
        };
        self.tree = tree;

        info!(
            accounts = accounts.len(),
            "batch witness built, commitment {:?}", batch_commitment
        );

        Ok(witness)
    }
}

fn log_rejection(err: WitnessError) -> WitnessError {
    match &err {
        WitnessError::AssetIndexOutOfRange {
            account_index,
            asset_index,
            ..
        }
        | WitnessError::CollateralExceedsEquity {
            account_index,
            asset_index,
        } => warn!(account_index, asset_index, "account rejected: {}", err),
        WitnessError::AssetsNotSorted { account_index }
        | WitnessError::TotalsTooLarge { account_index }
        | WitnessError::Insolvent { account_index, .. } => {
            warn!(account_index, "account rejected: {}", err)
        }
        WitnessError::SlotOccupied(account_index)
        | WitnessError::AccountIndexOutOfRange(account_index) => {
            warn!(account_index, "account rejected: {}", err)
        }
        WitnessError::Overflow { asset_index } => warn!(asset_index, "account rejected: {}", err),
        _ => warn!("account rejected: {}", err),
    }
    err
}

/// Leaf hashes of the new accounts, computed in parallel
fn compute_leaves<const N_ASSETS: usize>(
    accounts: &[AccountInput],
    ledger: &[AssetLedgerEntry],
) -> Vec<Fp> {
    let chunk_size = (accounts.len() + num_cpus::get() - 1) / num_cpus::get();
    thread::scope(|scope| {
        let handles: Vec<_> = accounts
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|account| {
                            AccountRecord::new(
                                account.account_id_hash,
                                account.assets.clone(),
                                ledger,
                            )
                            .leaf_hash(N_ASSETS)
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| match handle.join() {
                Ok(leaves) => leaves,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}

/// Checks the sparse holdings of one account against a ledger padded to `n_assets` entries, solvency included
pub(crate) fn validate_account(
    ledger: &[AssetLedgerEntry],
    account_index: u32,
    assets: &[AccountAsset],
    n_assets: usize,
) -> Result<(), WitnessError> {
    let mut previous: Option<u16> = None;
    for asset in assets {
        if asset.index as usize >= n_assets || asset.index as usize >= ledger.len() {
            return Err(WitnessError::AssetIndexOutOfRange {
                account_index,
                asset_index: asset.index,
                n_assets,
            });
        }
        if previous.map_or(false, |index| index >= asset.index) {
            return Err(WitnessError::AssetsNotSorted { account_index });
        }
        if asset.collateral_sum() > asset.equity as u128 {
            return Err(WitnessError::CollateralExceedsEquity {
                account_index,
                asset_index: asset.index,
            });
        }
        previous = Some(asset.index);
    }

    let mut debt = BigUint::from(0u8);
    let mut collateral = BigUint::from(0u8);
    for asset in assets {
        let entry = &ledger[asset.index as usize];
        let price = BigUint::from(entry.base_price);
        debt += BigUint::from(asset.debt) * &price;
        for kind in CollateralKind::ALL {
            let value = BigUint::from(asset.collateral(kind)) * &price;
            collateral += entry.ladder(kind).evaluate(&value);
        }
    }

    if debt.bits() > 128 || collateral.bits() > 128 {
        return Err(WitnessError::TotalsTooLarge { account_index });
    }
    if debt > collateral {
        return Err(WitnessError::Insolvent {
            account_index,
            debt,
            collateral,
        });
    }

    Ok(())
}
