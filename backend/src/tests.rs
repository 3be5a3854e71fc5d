#[cfg(test)]
mod test {
    use halo2_proofs::{dev::MockProver, halo2curves::bn256::Fr as Fp};
    use snark_verifier_sdk::CircuitExt;
    use std::{sync::Arc, time::Duration};
    use zkpor_batch::{
        account_tree::{account_id_to_hash, AccountRecord, AccountTree},
        circuits::batch_create_user::BatchCreateUserCircuit,
        ladder::RateLadder,
        ledger::{packing::ledger_commitment, AccountAsset, AssetLedgerEntry},
        utils::{fp_serde::fp_to_bytes, fp_to_hex, hash::poseidon_hash},
        witness::{AccountInput, BatchOperation, BatchWitness, WitnessBuilder, WitnessError},
    };

    use crate::{
        config::{ProverConfig, DEFAULT_LOCK_KEY},
        errors::PipelineError,
        lock::{BatchLock, InMemoryBatchLock},
        prover::{ProofSystem, Prover, RunSummary},
        store::{BatchRecord, BatchStatus, BatchStore, InMemoryBatchStore, ProofRecord},
    };

    const K: u32 = 16;
    const N_ASSETS: usize = 2;
    const N_OPS: usize = 1;

    /// Checks the constraints with MockProver, the "proof" is the batch commitment
    struct MockProofSystem {
        accept: bool,
    }

    impl ProofSystem for MockProofSystem {
        fn prove(&self, witness: BatchWitness) -> Result<(Vec<u8>, Vec<Fp>), PipelineError> {
            let circuit = BatchCreateUserCircuit::<N_ASSETS, N_OPS>::init(witness)?;
            let instances = circuit.instances();
            let prover = MockProver::run(K, &circuit, instances.clone())
                .map_err(|e| PipelineError::Proving(format!("{:?}", e)))?;
            prover
                .verify()
                .map_err(|failures| PipelineError::Proving(format!("{:?}", failures)))?;

            let public_inputs = instances.concat();
            Ok((fp_to_bytes(&public_inputs[0]).to_vec(), public_inputs))
        }

        fn verify(&self, proof: &[u8], public_inputs: &[Fp]) -> bool {
            self.accept && proof == fp_to_bytes(&public_inputs[0]).as_slice()
        }

        fn n_assets(&self) -> usize {
            N_ASSETS
        }
    }

    fn sample_ledger() -> Vec<AssetLedgerEntry> {
        vec![AssetLedgerEntry::new(
            "btc",
            1,
            [
                RateLadder::new(&[(100, 100), (1000, 50)]).unwrap(),
                RateLadder::inactive(),
                RateLadder::inactive(),
            ],
        )]
    }

    fn account(index: u32) -> AccountInput {
        AccountInput {
            account_index: index,
            account_id_hash: account_id_to_hash(&format!("user-{}", index)),
            assets: vec![AccountAsset {
                index: 0,
                equity: 1000,
                debt: 100,
                vip_loan: 200,
                ..AccountAsset::default()
            }],
        }
    }

    /// Encoded witnesses of consecutive single account batches
    fn encoded_batches(n: u32) -> Vec<String> {
        let mut builder = WitnessBuilder::<N_ASSETS>::new(sample_ledger()).unwrap();
        (0..n)
            .map(|i| {
                builder
                    .build_batch(&[account(i)])
                    .unwrap()
                    .encode()
                    .unwrap()
            })
            .collect()
    }

    /// Single account batch with consistent roots and commitments, whose account owes more than its realized collateral
    fn insolvent_batch() -> String {
        let ledger = sample_ledger();
        let insolvent = AccountInput {
            account_index: 0,
            account_id_hash: account_id_to_hash("insolvent"),
            assets: vec![AccountAsset {
                index: 0,
                equity: 1000,
                debt: 200,
                vip_loan: 200,
                ..AccountAsset::default()
            }],
        };

        let mut tree = AccountTree::new(N_ASSETS);
        let before_root = tree.root();
        let account_proof = tree.generate_proof(0).unwrap();
        let leaf = AccountRecord::new(insolvent.account_id_hash, insolvent.assets.clone(), &ledger)
            .leaf_hash(N_ASSETS);
        tree.insert(0, leaf).unwrap();
        let after_root = tree.root();

        let mut after_ledger = ledger.clone();
        after_ledger[0] = after_ledger[0]
            .checked_accumulate(&insolvent.assets[0])
            .unwrap();
        let before_ledger_commitment = ledger_commitment(&ledger, N_ASSETS);
        let after_ledger_commitment = ledger_commitment(&after_ledger, N_ASSETS);

        BatchWitness {
            batch_commitment: poseidon_hash([
                before_root,
                after_root,
                before_ledger_commitment,
                after_ledger_commitment,
            ]),
            before_ledger_commitment,
            after_ledger_commitment,
            before_account_tree_root: before_root,
            after_account_tree_root: after_root,
            before_ledger: ledger,
            operations: vec![BatchOperation {
                before_root,
                after_root,
                account_index: 0,
                account_id_hash: insolvent.account_id_hash,
                assets: insolvent.assets,
                account_proof,
            }],
        }
        .encode()
        .unwrap()
    }

    fn test_config() -> ProverConfig {
        ProverConfig {
            k: K,
            poll_interval_ms: 10,
            ..ProverConfig::default()
        }
    }

    fn prover(
        store: &Arc<InMemoryBatchStore>,
        lock: &Arc<InMemoryBatchLock>,
        accept: bool,
        config: ProverConfig,
    ) -> Prover<InMemoryBatchStore, InMemoryBatchLock, MockProofSystem> {
        Prover::new(
            Arc::clone(store),
            Arc::clone(lock),
            Arc::new(MockProofSystem { accept }),
            config,
        )
    }

    #[tokio::test]
    async fn test_run_proves_published_batches() {
        let store = Arc::new(InMemoryBatchStore::new());
        let lock = Arc::new(InMemoryBatchLock::new());
        let batches = encoded_batches(2);
        for (height, batch) in batches.iter().enumerate() {
            store.publish(height as u64, batch.clone()).unwrap();
        }

        let summary = prover(&store, &lock, true, test_config())
            .run()
            .await
            .unwrap();
        assert_eq!(
            summary,
            RunSummary {
                proved: 2,
                already_proved: 0,
                rejected: 0
            }
        );

        for (height, batch) in batches.iter().enumerate() {
            let height = height as u64;
            assert_eq!(
                store.batch(height).unwrap().unwrap().status,
                BatchStatus::Finished
            );

            let witness = BatchWitness::decode(batch).unwrap();
            let record = store.proof(height).unwrap().unwrap();
            assert_eq!(record.batch_commitment, fp_to_hex(&witness.batch_commitment));
            assert_eq!(record.public_inputs, vec![fp_to_hex(&witness.batch_commitment)]);
            assert_eq!(
                record.account_tree_roots,
                serde_json::to_string(&[
                    fp_to_hex(&witness.before_account_tree_root),
                    fp_to_hex(&witness.after_account_tree_root),
                ])
                .unwrap()
            );
        }

        // the lock is not kept once the run is over
        assert!(!lock.is_held(DEFAULT_LOCK_KEY));
    }

    #[tokio::test]
    async fn test_existing_proof_only_finishes_the_batch() {
        let store = Arc::new(InMemoryBatchStore::new());
        let lock = Arc::new(InMemoryBatchLock::new());
        let batch = encoded_batches(1).remove(0);
        store.publish(0, batch.clone()).unwrap();

        let witness = BatchWitness::decode(&batch).unwrap();
        let existing = ProofRecord::new(0, &witness, b"earlier proof", &[]).unwrap();
        store.persist_proof(existing.clone()).unwrap();

        let summary = prover(&store, &lock, true, test_config())
            .run()
            .await
            .unwrap();
        assert_eq!(summary.already_proved, 1);
        assert_eq!(summary.proved, 0);
        assert_eq!(store.proof(0).unwrap(), Some(existing));
        assert_eq!(store.batch(0).unwrap().unwrap().status, BatchStatus::Finished);
    }

    #[tokio::test]
    async fn test_unverified_proof_is_not_stored() {
        let store = Arc::new(InMemoryBatchStore::new());
        let lock = Arc::new(InMemoryBatchLock::new());
        store.publish(0, encoded_batches(1).remove(0)).unwrap();

        let result = prover(&store, &lock, false, test_config()).run().await;
        assert!(matches!(
            result,
            Err(PipelineError::VerificationFailed { height: 0 })
        ));
        assert!(!store.proof_exists(0).unwrap());
        assert_eq!(store.batch(0).unwrap().unwrap().status, BatchStatus::Received);
    }

    #[tokio::test]
    async fn test_malformed_batch_is_rejected() {
        let store = Arc::new(InMemoryBatchStore::new());
        let lock = Arc::new(InMemoryBatchLock::new());
        store.publish(0, "not a witness".to_string()).unwrap();
        store.publish(1, encoded_batches(1).remove(0)).unwrap();

        let summary = prover(&store, &lock, true, test_config())
            .run()
            .await
            .unwrap();
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.proved, 1);
        assert_eq!(store.batch(0).unwrap().unwrap().status, BatchStatus::Received);
        assert_eq!(store.batch(1).unwrap().unwrap().status, BatchStatus::Finished);

        // a rerun stops on the batch it cannot prove
        let config = ProverConfig {
            rerun: true,
            ..test_config()
        };
        let result = prover(&store, &lock, true, config).run().await;
        assert!(matches!(result, Err(e) if e.is_input_error()));
    }

    // realized collateral is 100 + (200 - 100) * 50 / 100 = 150 against a debt of 200
    #[tokio::test]
    async fn test_insolvent_batch_is_rejected_before_proving() {
        let store = Arc::new(InMemoryBatchStore::new());
        let lock = Arc::new(InMemoryBatchLock::new());
        store.publish(0, insolvent_batch()).unwrap();
        store.publish(1, encoded_batches(1).remove(0)).unwrap();

        let summary = prover(&store, &lock, true, test_config())
            .run()
            .await
            .unwrap();
        assert_eq!(
            summary,
            RunSummary {
                proved: 1,
                already_proved: 0,
                rejected: 1
            }
        );
        assert!(!store.proof_exists(0).unwrap());
        assert_eq!(store.batch(0).unwrap().unwrap().status, BatchStatus::Received);
        assert_eq!(store.batch(1).unwrap().unwrap().status, BatchStatus::Finished);

        let config = ProverConfig {
            rerun: true,
            ..test_config()
        };
        let result = prover(&store, &lock, true, config).run().await;
        assert!(matches!(
            result,
            Err(PipelineError::Witness(WitnessError::Insolvent {
                account_index: 0,
                ..
            }))
        ));
    }

    #[tokio::test]
    async fn test_mismatched_after_commitment_is_rejected() {
        let store = Arc::new(InMemoryBatchStore::new());
        let lock = Arc::new(InMemoryBatchLock::new());

        let mut witness = BatchWitness::decode(&encoded_batches(1).remove(0)).unwrap();
        witness.operations[0].assets[0].debt += 1;
        store.publish(0, witness.encode().unwrap()).unwrap();

        let batch_prover = prover(&store, &lock, true, test_config());
        let batch = store.batch(0).unwrap().unwrap();
        assert!(matches!(
            batch_prover.prove_batch(batch).await,
            Err(PipelineError::Witness(WitnessError::CommitmentMismatch))
        ));
        assert!(!store.proof_exists(0).unwrap());
    }

    #[tokio::test]
    async fn test_busy_lock_is_retried() {
        let store = Arc::new(InMemoryBatchStore::new());
        let lock = Arc::new(InMemoryBatchLock::new());
        store.publish(0, encoded_batches(1).remove(0)).unwrap();

        let guard = lock
            .try_acquire(DEFAULT_LOCK_KEY, Duration::from_secs(60))
            .unwrap()
            .unwrap();
        let release = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            drop(guard);
        });

        let summary = prover(&store, &lock, true, test_config())
            .run()
            .await
            .unwrap();
        release.await.unwrap();
        assert_eq!(summary.proved, 1);
    }

    #[tokio::test]
    async fn test_rerun_proves_received_batches() {
        let store = Arc::new(InMemoryBatchStore::new());
        let lock = Arc::new(InMemoryBatchLock::new());
        store
            .insert_batch(BatchRecord {
                height: 7,
                witness_data: encoded_batches(1).remove(0),
                status: BatchStatus::Received,
            })
            .unwrap();
        store.publish(8, encoded_batches(1).remove(0)).unwrap();

        // rerun mode never takes the lock
        let _guard = lock
            .try_acquire(DEFAULT_LOCK_KEY, Duration::from_secs(60))
            .unwrap()
            .unwrap();

        let config = ProverConfig {
            rerun: true,
            ..test_config()
        };
        let summary = prover(&store, &lock, true, config).run().await.unwrap();
        assert_eq!(summary.proved, 1);
        assert_eq!(store.batch(7).unwrap().unwrap().status, BatchStatus::Finished);
        assert_eq!(store.batch(8).unwrap().unwrap().status, BatchStatus::Published);
    }

    #[test]
    fn test_init_tracing_twice() {
        crate::init_tracing();
        crate::init_tracing();
    }

    #[test]
    fn test_lock_guard_releases_on_drop() {
        let lock = InMemoryBatchLock::new();
        let ttl = Duration::from_secs(60);

        let guard = lock.try_acquire("key", ttl).unwrap().unwrap();
        assert_eq!(guard.key(), "key");
        assert!(lock.try_acquire("key", ttl).unwrap().is_none());
        assert!(lock.try_acquire("other key", ttl).unwrap().is_some());

        drop(guard);
        assert!(lock.try_acquire("key", ttl).unwrap().is_some());
    }

    #[test]
    fn test_expired_lock_is_taken_over() {
        let lock = InMemoryBatchLock::new();

        let stale = lock.try_acquire("key", Duration::ZERO).unwrap().unwrap();
        let current = lock
            .try_acquire("key", Duration::from_secs(60))
            .unwrap()
            .unwrap();

        // the stale guard leaves the new holder alone
        drop(stale);
        assert!(lock.is_held("key"));

        drop(current);
        assert!(!lock.is_held("key"));
    }

    #[test]
    fn test_store_status_updates() {
        let store = InMemoryBatchStore::new();
        store.publish(3, "a".to_string()).unwrap();
        store.publish(1, "b".to_string()).unwrap();

        let next = store.fetch_next_batch(BatchStatus::Published).unwrap().unwrap();
        assert_eq!(next.height, 1);

        store.update_status(1, BatchStatus::Received).unwrap();
        let next = store.fetch_next_batch(BatchStatus::Published).unwrap().unwrap();
        assert_eq!(next.height, 3);
        assert!(store
            .fetch_next_batch(BatchStatus::Finished)
            .unwrap()
            .is_none());

        assert!(store.update_status(2, BatchStatus::Finished).is_err());
    }

    #[test]
    fn test_config_file_round_trip() {
        let path = std::env::temp_dir().join("zkpor_batch_prover_config.json");
        let config = ProverConfig {
            k: 20,
            params_path: Some("params/hermez-raw-20".to_string()),
            rerun: true,
            ..ProverConfig::default()
        };

        config.save_to_file(&path).unwrap();
        let loaded = ProverConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded, config);
        assert_eq!(loaded.lock_key, "prover_mutex_key");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ProverConfig = serde_json::from_str(r#"{ "k": 18 }"#).unwrap();
        assert_eq!(config.k, 18);
        assert_eq!(config.lock_key, DEFAULT_LOCK_KEY);
        assert!(!config.rerun);
    }
}
