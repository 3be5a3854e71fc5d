pub mod config;
pub mod errors;
pub mod lock;
pub mod prover;
pub mod store;
mod tests;

use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{self, Read, Write},
    path::Path,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

pub fn save_to_file<P: AsRef<Path>, T: Serialize>(path: P, data: &T) -> io::Result<()> {
    let serialized_data = serde_json::to_string_pretty(data)?;
    let mut file = File::create(path)?;
    file.write_all(serialized_data.as_bytes())?;
    Ok(())
}

pub fn load_from_file<P: AsRef<Path>, T: for<'de> Deserialize<'de>>(path: P) -> io::Result<T> {
    let mut file = File::open(path)?;
    let mut data = String::new();
    file.read_to_string(&mut data)?;
    let deserialized_data = serde_json::from_str(&data)?;
    Ok(deserialized_data)
}

/// Installs the log subscriber, filtered by `RUST_LOG` and defaulting to `info`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(e) = tracing_subscriber::fmt().with_env_filter(filter).try_init() {
        debug!(error = %e, "log subscriber already installed");
    }
}
