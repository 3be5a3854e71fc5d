use crate::ledger::packing::ledger_commitment;
use crate::ledger::AssetLedgerEntry;
use crate::utils::hash::poseidon_hash;
use crate::witness::{validate_account, BatchWitness, WitnessError};

/// Folds the holdings of every operation into the before ledger and checks the result against the after commitment
pub fn recover_after_ledger(
    witness: &BatchWitness,
    n_assets: usize,
) -> Result<Vec<AssetLedgerEntry>, WitnessError> {
    if witness.before_ledger.len() > n_assets {
        return Err(WitnessError::Shape(format!(
            "ledger lists {} assets, the universe holds {}",
            witness.before_ledger.len(),
            n_assets
        )));
    }

    let mut ledger = witness.before_ledger.clone();
    ledger.resize_with(n_assets, AssetLedgerEntry::empty);

    for op in &witness.operations {
        for asset in &op.assets {
            let slot = ledger.get_mut(asset.index as usize).ok_or(
                WitnessError::AssetIndexOutOfRange {
                    account_index: op.account_index,
                    asset_index: asset.index,
                    n_assets,
                },
            )?;
            *slot = slot.checked_accumulate(asset).ok_or(WitnessError::Overflow {
                asset_index: asset.index,
            })?;
        }
    }

    if ledger_commitment(&ledger, n_assets) != witness.after_ledger_commitment {
        return Err(WitnessError::CommitmentMismatch);
    }

    Ok(ledger)
}

impl BatchWitness {
    /// Replays off-circuit every check the batch circuit enforces on the values, except the tree paths.
    ///
    /// Returns the recovered after ledger.
    pub fn validate(&self, n_assets: usize) -> Result<Vec<AssetLedgerEntry>, WitnessError> {
        if self.operations.is_empty() {
            return Err(WitnessError::Shape("a batch creates at least one account".into()));
        }
        if self.before_ledger.len() > n_assets {
            return Err(WitnessError::Shape(format!(
                "ledger lists {} assets, the universe holds {}",
                self.before_ledger.len(),
                n_assets
            )));
        }

        let mut before_ledger = self.before_ledger.clone();
        before_ledger.resize_with(n_assets, AssetLedgerEntry::empty);
        if ledger_commitment(&before_ledger, n_assets) != self.before_ledger_commitment {
            return Err(WitnessError::BeforeCommitmentMismatch);
        }

        // prices and ladders do not move within a batch
        let mut root = self.before_account_tree_root;
        for op in &self.operations {
            validate_account(&before_ledger, op.account_index, &op.assets, n_assets)?;
            if op.before_root != root {
                return Err(WitnessError::BrokenRootChain {
                    account_index: op.account_index,
                });
            }
            root = op.after_root;
        }
        if root != self.after_account_tree_root {
            return Err(WitnessError::BrokenRootChain {
                account_index: self.operations.last().map_or(0, |op| op.account_index),
            });
        }

        let after_ledger = recover_after_ledger(self, n_assets)?;

        let batch_commitment = poseidon_hash([
            self.before_account_tree_root,
            self.after_account_tree_root,
            self.before_ledger_commitment,
            self.after_ledger_commitment,
        ]);
        if batch_commitment != self.batch_commitment {
            return Err(WitnessError::BatchCommitmentMismatch);
        }

        Ok(after_ledger)
    }
}
