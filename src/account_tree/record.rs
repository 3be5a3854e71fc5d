use crate::ledger::packing::{account_assets_commitment, priced_total};
use crate::ledger::{AccountAsset, AssetLedgerEntry};
use crate::utils::big_uint_to_fp;
use crate::utils::hash::{poseidon_hash, poseidon_sequence};
use halo2_proofs::halo2curves::bn256::Fr as Fp;
use num_bigint::BigUint;

/// Bytes of the account id packed into one field element
const ID_CHUNK_BYTES: usize = 31;

/// An account as stored in a leaf of the account tree
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountRecord {
    account_id_hash: Fp,
    total_equity: BigUint,
    total_debt: BigUint,
    assets: Vec<AccountAsset>,
}

impl AccountRecord {
    /// Creates a record, pricing every holding with the base price of the ledger
    pub fn new(account_id_hash: Fp, assets: Vec<AccountAsset>, ledger: &[AssetLedgerEntry]) -> Self {
        let total_equity = priced_total(&assets, ledger, |asset| asset.equity);
        let total_debt = priced_total(&assets, ledger, |asset| asset.debt);
        AccountRecord {
            account_id_hash,
            total_equity,
            total_debt,
            assets,
        }
    }

    /// The record every slot holds before an account is created in it
    pub fn empty() -> Self {
        AccountRecord {
            account_id_hash: Fp::zero(),
            total_equity: BigUint::from(0u8),
            total_debt: BigUint::from(0u8),
            assets: vec![],
        }
    }

    pub fn account_id_hash(&self) -> &Fp {
        &self.account_id_hash
    }

    pub fn total_equity(&self) -> &BigUint {
        &self.total_equity
    }

    pub fn total_debt(&self) -> &BigUint {
        &self.total_debt
    }

    pub fn assets(&self) -> &[AccountAsset] {
        &self.assets
    }

    /// `H(account_id_hash, total_equity, total_debt, assets_commitment)` over a universe of `n_assets` assets
    pub fn leaf_hash(&self, n_assets: usize) -> Fp {
        poseidon_hash([
            self.account_id_hash,
            big_uint_to_fp(&self.total_equity),
            big_uint_to_fp(&self.total_debt),
            account_assets_commitment(&self.assets, n_assets),
        ])
    }
}

/// Leaf hash of an empty slot
pub fn empty_leaf_hash(n_assets: usize) -> Fp {
    AccountRecord::empty().leaf_hash(n_assets)
}

/// Hashes an account id: the UTF-8 bytes are split into 31 byte little-endian chunks and sequence hashed
pub fn account_id_to_hash(account_id: &str) -> Fp {
    let chunks: Vec<Fp> = account_id
        .as_bytes()
        .chunks(ID_CHUNK_BYTES)
        .map(|chunk| big_uint_to_fp(&BigUint::from_bytes_le(chunk)))
        .collect();
    poseidon_sequence(&chunks)
}
