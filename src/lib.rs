//! This crate contains the cryptographic primitives for proving batches of account creations against a proof of solvency ledger.
//! The tooling being used to generate the zkSNARKs is [Halo2 PSE Fork](https://github.com/privacy-scaling-explorations/halo2).

/// Sparse Poseidon merkle tree of account records. No zk proof in here.
pub mod account_tree;
/// Zk circuit subcomponents aka chips.
pub mod chips;
/// Zk circuits with a full prover and verifier. A circuit can be viewed as an assembly of chips.
pub mod circuits;
/// Piecewise-linear collateral rate ladders and their reference evaluator.
pub mod ladder;
/// Exchange asset ledger entries and their commitment codec.
pub mod ledger;
/// Protocol constants shared by the circuit and the witness builder.
pub mod params;
/// Field helpers and off-circuit Poseidon hashing.
pub mod utils;
/// Batch witness builder, codec and after-ledger recovery.
pub mod witness;
