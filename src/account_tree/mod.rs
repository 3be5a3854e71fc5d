mod record;
mod tests;
mod tree;

use crate::params::TREE_DEPTH;
use crate::utils::fp_serde::fp_vec;
use halo2_proofs::halo2curves::bn256::Fr as Fp;
use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

/// Siblings of a leaf, from the leaf level up to the level below the root
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountProof([Fp; TREE_DEPTH]);

impl AccountProof {
    pub fn new(siblings: [Fp; TREE_DEPTH]) -> Self {
        AccountProof(siblings)
    }

    pub fn siblings(&self) -> &[Fp; TREE_DEPTH] {
        &self.0
    }
}

impl Default for AccountProof {
    fn default() -> Self {
        AccountProof([Fp::zero(); TREE_DEPTH])
    }
}

impl Serialize for AccountProof {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        fp_vec::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for AccountProof {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let siblings = fp_vec::deserialize(deserializer)?;
        let len = siblings.len();
        let siblings: [Fp; TREE_DEPTH] = siblings.try_into().map_err(|_| {
            D::Error::custom(format!(
                "account proof has {} siblings, expected {}",
                len, TREE_DEPTH
            ))
        })?;
        Ok(AccountProof(siblings))
    }
}

pub use record::{account_id_to_hash, empty_leaf_hash, AccountRecord};
pub use tree::{compute_root, AccountTree};
