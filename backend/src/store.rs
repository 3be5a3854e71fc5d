use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::RwLock};
use thiserror::Error;
use zkpor_batch::{utils::fp_to_hex, witness::BatchWitness};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BatchStatus {
    /// Written by the witness service, waiting for a prover
    Published,
    /// Claimed by a prover
    Received,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub height: u64,
    /// Encoded [BatchWitness]
    pub witness_data: String,
    pub status: BatchStatus,
}

/// Stored proof of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRecord {
    pub height: u64,
    /// base64 proof transcript
    pub proof_info: String,
    /// hex encoded public inputs
    pub public_inputs: Vec<String>,
    /// JSON `[before, after]` ledger commitments
    pub ledger_commitments: String,
    /// JSON `[before, after]` account tree roots
    pub account_tree_roots: String,
    pub batch_commitment: String,
}

impl ProofRecord {
    pub fn new(
        height: u64,
        witness: &BatchWitness,
        proof: &[u8],
        public_inputs: &[String],
    ) -> Result<Self, serde_json::Error> {
        let ledger_commitments = serde_json::to_string(&[
            fp_to_hex(&witness.before_ledger_commitment),
            fp_to_hex(&witness.after_ledger_commitment),
        ])?;
        let account_tree_roots = serde_json::to_string(&[
            fp_to_hex(&witness.before_account_tree_root),
            fp_to_hex(&witness.after_account_tree_root),
        ])?;

        Ok(Self {
            height,
            proof_info: base64::encode(proof),
            public_inputs: public_inputs.to_vec(),
            ledger_commitments,
            account_tree_roots,
            batch_commitment: fp_to_hex(&witness.batch_commitment),
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("no batch at height {0}")]
    UnknownBatch(u64),
    #[error("a proof of batch {0} is already stored")]
    DuplicateProof(u64),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Queue of batch witnesses and their proofs
pub trait BatchStore: Send + Sync {
    /// Lowest batch in the given state
    fn fetch_next_batch(&self, status: BatchStatus) -> Result<Option<BatchRecord>, StoreError>;

    fn update_status(&self, height: u64, status: BatchStatus) -> Result<(), StoreError>;

    fn persist_proof(&self, record: ProofRecord) -> Result<(), StoreError>;

    fn proof_exists(&self, height: u64) -> Result<bool, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryBatchStore {
    batches: RwLock<BTreeMap<u64, BatchRecord>>,
    proofs: RwLock<BTreeMap<u64, ProofRecord>>,
}

fn unavailable<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

impl InMemoryBatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a batch, replacing any batch at the same height
    pub fn insert_batch(&self, record: BatchRecord) -> Result<(), StoreError> {
        self.batches
            .write()
            .map_err(unavailable)?
            .insert(record.height, record);
        Ok(())
    }

    pub fn publish(&self, height: u64, witness_data: String) -> Result<(), StoreError> {
        self.insert_batch(BatchRecord {
            height,
            witness_data,
            status: BatchStatus::Published,
        })
    }

    pub fn batch(&self, height: u64) -> Result<Option<BatchRecord>, StoreError> {
        Ok(self.batches.read().map_err(unavailable)?.get(&height).cloned())
    }

    pub fn proof(&self, height: u64) -> Result<Option<ProofRecord>, StoreError> {
        Ok(self.proofs.read().map_err(unavailable)?.get(&height).cloned())
    }

    pub fn proofs(&self) -> Result<Vec<ProofRecord>, StoreError> {
        Ok(self.proofs.read().map_err(unavailable)?.values().cloned().collect())
    }
}

impl BatchStore for InMemoryBatchStore {
    fn fetch_next_batch(&self, status: BatchStatus) -> Result<Option<BatchRecord>, StoreError> {
        Ok(self
            .batches
            .read()
            .map_err(unavailable)?
            .values()
            .find(|batch| batch.status == status)
            .cloned())
    }

    fn update_status(&self, height: u64, status: BatchStatus) -> Result<(), StoreError> {
        let mut batches = self.batches.write().map_err(unavailable)?;
        let batch = batches
            .get_mut(&height)
            .ok_or(StoreError::UnknownBatch(height))?;
        batch.status = status;
        Ok(())
    }

    fn persist_proof(&self, record: ProofRecord) -> Result<(), StoreError> {
        let mut proofs = self.proofs.write().map_err(unavailable)?;
        if proofs.contains_key(&record.height) {
            return Err(StoreError::DuplicateProof(record.height));
        }
        proofs.insert(record.height, record);
        Ok(())
    }

    fn proof_exists(&self, height: u64) -> Result<bool, StoreError> {
        Ok(self.proofs.read().map_err(unavailable)?.contains_key(&height))
    }
}
