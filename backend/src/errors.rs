use thiserror::Error;
use zkpor_batch::circuits::utils::SetupError;
use zkpor_batch::witness::WitnessError;

use crate::lock::LockError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("lock failure: {0}")]
    Lock(#[from] LockError),
    #[error("batch store failure: {0}")]
    Store(#[from] StoreError),
    #[error("setup failure: {0}")]
    Setup(#[from] SetupError),
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("proof of batch {height} does not verify")]
    VerificationFailed { height: u64 },
    #[error("proving failed: {0}")]
    Proving(String),
    #[error("invalid batch witness: {0}")]
    Witness(#[from] WitnessError),
}

impl PipelineError {
    /// Errors caused by the content of a batch rather than by the infrastructure
    pub fn is_input_error(&self) -> bool {
        matches!(self, PipelineError::Witness(_))
    }
}
