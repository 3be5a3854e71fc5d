use ark_std::{end_timer, start_timer};
use halo2_proofs::{
    halo2curves::bn256::{Bn256, Fr as Fp, G1Affine},
    plonk::{ProvingKey, VerifyingKey},
    poly::kzg::commitment::ParamsKZG,
};
use snark_verifier_sdk::CircuitExt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use zkpor_batch::{
    circuits::{
        batch_create_user::BatchCreateUserCircuit,
        utils::{full_prover, full_verifier, generate_setup_artifacts},
    },
    utils::fp_to_hex,
    witness::BatchWitness,
};

use crate::{
    config::ProverConfig,
    errors::PipelineError,
    lock::BatchLock,
    store::{BatchRecord, BatchStatus, BatchStore, ProofRecord},
};

pub(crate) type SetupArtifacts = (
    ParamsKZG<Bn256>,
    ProvingKey<G1Affine>,
    VerifyingKey<G1Affine>,
);

/// Proves and verifies batch witnesses. Calls are blocking.
pub trait ProofSystem: Send + Sync + 'static {
    /// Returns the proof and the public inputs it was created for
    fn prove(&self, witness: BatchWitness) -> Result<(Vec<u8>, Vec<Fp>), PipelineError>;

    fn verify(&self, proof: &[u8], public_inputs: &[Fp]) -> bool;

    /// Size of the asset universe the circuit is built for
    fn n_assets(&self) -> usize;
}

/// KZG proof system over the batch circuit of `N_OPS` operations on `N_ASSETS` assets
pub struct KzgProofSystem<const N_ASSETS: usize, const N_OPS: usize> {
    trusted_setup: SetupArtifacts,
}

impl<const N_ASSETS: usize, const N_OPS: usize> KzgProofSystem<N_ASSETS, N_OPS> {
    /// Loads the params and generates the keys, once per process
    pub fn new(config: &ProverConfig) -> Result<Self, PipelineError> {
        let circuit = BatchCreateUserCircuit::<N_ASSETS, N_OPS>::init_empty();
        let trusted_setup =
            generate_setup_artifacts(config.k, config.params_path.as_deref(), &circuit)?;
        info!(k = config.k, n_assets = N_ASSETS, n_ops = N_OPS, "setup artifacts ready");
        Ok(Self { trusted_setup })
    }
}

impl<const N_ASSETS: usize, const N_OPS: usize> ProofSystem for KzgProofSystem<N_ASSETS, N_OPS> {
    fn prove(&self, witness: BatchWitness) -> Result<(Vec<u8>, Vec<Fp>), PipelineError> {
        let circuit = BatchCreateUserCircuit::<N_ASSETS, N_OPS>::init(witness)?;
        let instances = circuit.instances();
        let (params, pk, _) = &self.trusted_setup;

        let proof = full_prover(params, pk, circuit, instances.clone())
            .map_err(|e| PipelineError::Proving(format!("{:?}", e)))?;
        Ok((proof, instances.concat()))
    }

    fn verify(&self, proof: &[u8], public_inputs: &[Fp]) -> bool {
        let (params, _, vk) = &self.trusted_setup;
        full_verifier(params, vk, proof, vec![public_inputs.to_vec()])
    }

    fn n_assets(&self) -> usize {
        N_ASSETS
    }
}

/// What happened to a claimed batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Proved,
    /// A proof was already stored, the batch is only marked as finished
    AlreadyProved,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub proved: usize,
    pub already_proved: usize,
    /// Batches left in the `Received` state because their witness cannot be proven
    pub rejected: usize,
}

enum Claim {
    Busy,
    Empty,
    Claimed(BatchRecord),
}

pub struct Prover<S, L, P> {
    store: Arc<S>,
    lock: Arc<L>,
    proof_system: Arc<P>,
    config: ProverConfig,
}

impl<S: BatchStore, L: BatchLock, P: ProofSystem> Prover<S, L, P> {
    pub fn new(store: Arc<S>, lock: Arc<L>, proof_system: Arc<P>, config: ProverConfig) -> Self {
        Self {
            store,
            lock,
            proof_system,
            config,
        }
    }

    /// Proves batches until the queue is empty.
    ///
    /// Normal mode claims `Published` batches under the lock. Rerun mode proves the batches left `Received`,
    /// without the lock, and stops at the first batch that cannot be proven.
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        let mut summary = RunSummary::default();
        info!(rerun = self.config.rerun, "prover run started");

        loop {
            let batch = if self.config.rerun {
                self.store.fetch_next_batch(BatchStatus::Received)?
            } else {
                match self.claim_next_batch()? {
                    Claim::Busy => {
                        debug!(key = %self.config.lock_key, "lock busy, retrying");
                        tokio::time::sleep(self.config.poll_interval()).await;
                        continue;
                    }
                    Claim::Empty => None,
                    Claim::Claimed(batch) => Some(batch),
                }
            };

            let Some(batch) = batch else {
                info!(?summary, "no batch left to prove, run finished");
                return Ok(summary);
            };

            let height = batch.height;
            match self.prove_batch(batch).await {
                Ok(BatchOutcome::Proved) => summary.proved += 1,
                Ok(BatchOutcome::AlreadyProved) => summary.already_proved += 1,
                Err(e) if e.is_input_error() && !self.config.rerun => {
                    warn!(height, error = %e, "batch rejected");
                    summary.rejected += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Moves the lowest `Published` batch to `Received` while holding the lock
    fn claim_next_batch(&self) -> Result<Claim, PipelineError> {
        let Some(_guard) = self
            .lock
            .try_acquire(&self.config.lock_key, self.config.lock_ttl())?
        else {
            return Ok(Claim::Busy);
        };

        match self.store.fetch_next_batch(BatchStatus::Published)? {
            Some(mut batch) => {
                self.store.update_status(batch.height, BatchStatus::Received)?;
                batch.status = BatchStatus::Received;
                info!(height = batch.height, "batch claimed");
                Ok(Claim::Claimed(batch))
            }
            None => Ok(Claim::Empty),
        }
    }

    /// Proves a claimed batch, verifies the proof and stores it
    pub async fn prove_batch(&self, batch: BatchRecord) -> Result<BatchOutcome, PipelineError> {
        let height = batch.height;

        if self.store.proof_exists(height)? {
            info!(height, "proof already stored");
            self.store.update_status(height, BatchStatus::Finished)?;
            return Ok(BatchOutcome::AlreadyProved);
        }

        let witness = BatchWitness::decode(&batch.witness_data)?;
        // a witness the circuit cannot satisfy is rejected before proving
        witness.validate(self.proof_system.n_assets())?;
        let commitments = witness.clone();

        let proof_system = Arc::clone(&self.proof_system);
        let (proof, public_inputs) = tokio::task::spawn_blocking(move || {
            let timer = start_timer!(|| format!("prove batch {}", height));
            let (proof, public_inputs) = proof_system.prove(witness)?;
            end_timer!(timer);

            if !proof_system.verify(&proof, &public_inputs) {
                return Err(PipelineError::VerificationFailed { height });
            }
            Ok((proof, public_inputs))
        })
        .await
        .map_err(|e| PipelineError::Proving(e.to_string()))??;

        let public_inputs: Vec<String> = public_inputs.iter().map(fp_to_hex).collect();
        let record = ProofRecord::new(height, &commitments, &proof, &public_inputs)
            .map_err(|e| PipelineError::Io(e.into()))?;

        self.store.persist_proof(record)?;
        self.store.update_status(height, BatchStatus::Finished)?;
        info!(height, proof_bytes = proof.len(), "batch proved");

        Ok(BatchOutcome::Proved)
    }
}
