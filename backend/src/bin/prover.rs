use std::{error::Error, path::PathBuf, sync::Arc};

use clap::Parser;
use tracing::info;
use zkpor_batch::params::{ASSET_COUNTS, BATCH_CREATE_USER_OPS_COUNTS};
use zkpor_batch_backend::{
    config::ProverConfig,
    init_tracing,
    lock::InMemoryBatchLock,
    prover::{KzgProofSystem, Prover},
    save_to_file,
    store::InMemoryBatchStore,
};

#[derive(Parser, Debug)]
#[command(name = "prover")]
#[command(about = "Proves batches of account creations", long_about = None)]
struct Cli {
    /// File holding one encoded batch witness per line, published at heights 0, 1, ...
    batches: PathBuf,

    /// Where the stored proofs are written
    output: PathBuf,

    /// Prover config, the defaults apply when the file is missing
    #[arg(short, long, default_value = "prover_config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing();

    let config = if cli.config.exists() {
        ProverConfig::load_from_file(&cli.config)?
    } else {
        info!(path = %cli.config.display(), "no config file, using defaults");
        ProverConfig::default()
    };

    let store = Arc::new(InMemoryBatchStore::new());
    let batches = std::fs::read_to_string(&cli.batches)?;
    for (height, line) in batches.lines().filter(|l| !l.trim().is_empty()).enumerate() {
        store.publish(height as u64, line.trim().to_string())?;
    }

    let proof_system = Arc::new(KzgProofSystem::<ASSET_COUNTS, BATCH_CREATE_USER_OPS_COUNTS>::new(
        &config,
    )?);
    let prover = Prover::new(
        Arc::clone(&store),
        Arc::new(InMemoryBatchLock::new()),
        proof_system,
        config,
    );

    let summary = prover.run().await?;
    save_to_file(&cli.output, &store.proofs()?)?;
    info!(?summary, output = %cli.output.display(), "proofs written");

    Ok(())
}
