use serde::{Deserialize, Serialize};
use std::{io, path::Path, time::Duration};

use crate::{load_from_file, save_to_file};

pub const DEFAULT_LOCK_KEY: &str = "prover_mutex_key";

/// Settings of a prover process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProverConfig {
    /// The circuit has 2^k rows
    pub k: u32,
    /// Params produced by a trusted setup ceremony. Without them an unsafe setup is run.
    pub params_path: Option<String>,
    pub poll_interval_ms: u64,
    pub lock_key: String,
    pub lock_ttl_secs: u64,
    /// Re-prove the batches left in the `Received` state by a crashed prover
    pub rerun: bool,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            k: 16,
            params_path: None,
            poll_interval_ms: 1000,
            lock_key: DEFAULT_LOCK_KEY.to_string(),
            lock_ttl_secs: 10,
            rerun: false,
        }
    }
}

impl ProverConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        load_from_file(path)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        save_to_file(path, self)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }
}
