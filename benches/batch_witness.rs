use criterion::{criterion_group, criterion_main, Criterion};
use halo2_proofs::plonk::{keygen_pk, keygen_vk};
use snark_verifier_sdk::CircuitExt;
use zkpor_batch::{
    account_tree::account_id_to_hash,
    circuits::{
        batch_create_user::BatchCreateUserCircuit,
        utils::{full_prover, full_verifier, generate_setup_artifacts},
    },
    ladder::RateLadder,
    ledger::{AccountAsset, AssetLedgerEntry},
    witness::{AccountInput, WitnessBuilder},
};

const SAMPLE_SIZE: usize = 10;
const K: u32 = 16;
const N_ASSETS: usize = 2;
const N_OPS: usize = 2;
const WITNESS_BATCH_SIZES: [usize; 3] = [1, 16, 64];

fn sample_ledger() -> Vec<AssetLedgerEntry> {
    vec![
        AssetLedgerEntry::new(
            "btc",
            1,
            [
                RateLadder::new(&[(100, 100), (1000, 50)]).unwrap(),
                RateLadder::inactive(),
                RateLadder::inactive(),
            ],
        ),
        AssetLedgerEntry::new(
            "eth",
            5,
            [
                RateLadder::new(&[(1000, 80)]).unwrap(),
                RateLadder::new(&[(500, 90), (5000, 60)]).unwrap(),
                RateLadder::inactive(),
            ],
        ),
    ]
}

fn accounts(first_index: u32, n: usize) -> Vec<AccountInput> {
    (first_index..first_index + n as u32)
        .map(|index| AccountInput {
            account_index: index,
            account_id_hash: account_id_to_hash(&format!("bench-user-{}", index)),
            assets: vec![
                AccountAsset {
                    index: 0,
                    equity: 1000,
                    debt: 100,
                    vip_loan: 200,
                    ..AccountAsset::default()
                },
                AccountAsset {
                    index: 1,
                    equity: 40,
                    debt: 10,
                    margin: 10,
                    ..AccountAsset::default()
                },
            ],
        })
        .collect()
}

fn build_batch_witness(_c: &mut Criterion) {
    let mut criterion = Criterion::default().sample_size(SAMPLE_SIZE);

    for batch_size in WITNESS_BATCH_SIZES {
        let batch = accounts(0, batch_size);

        let bench_name = format!(
            "build batch witness for {} accounts with {} assets",
            batch_size, N_ASSETS
        );
        criterion.bench_function(&bench_name, |b| {
            b.iter(|| {
                // every iteration starts from an empty tree, so the slots are free
                let mut builder = WitnessBuilder::<N_ASSETS>::new(sample_ledger()).unwrap();
                builder.build_batch(&batch).unwrap();
            })
        });
    }
}

fn verification_key_gen_batch_create_user_circuit(_c: &mut Criterion) {
    let mut criterion = Criterion::default().sample_size(SAMPLE_SIZE);

    let empty_circuit = BatchCreateUserCircuit::<N_ASSETS, N_OPS>::init_empty();

    let (params, _, _) = generate_setup_artifacts(K, None, &empty_circuit).unwrap();

    let bench_name = format!(
        "gen verification key for {} operations with {} assets batch create user circuit",
        N_OPS, N_ASSETS
    );
    criterion.bench_function(&bench_name, |b| {
        b.iter(|| {
            keygen_vk(&params, &empty_circuit).unwrap();
        })
    });
}

fn proving_key_gen_batch_create_user_circuit(_c: &mut Criterion) {
    let mut criterion = Criterion::default().sample_size(SAMPLE_SIZE);

    let empty_circuit = BatchCreateUserCircuit::<N_ASSETS, N_OPS>::init_empty();

    let (params, _, vk) = generate_setup_artifacts(K, None, &empty_circuit).unwrap();

    let bench_name = format!(
        "gen proving key for {} operations with {} assets batch create user circuit",
        N_OPS, N_ASSETS
    );
    criterion.bench_function(&bench_name, |b| {
        b.iter(|| {
            keygen_pk(&params, vk.clone(), &empty_circuit).unwrap();
        })
    });
}

fn generate_and_verify_zk_proof_batch_create_user_circuit(_c: &mut Criterion) {
    let mut criterion = Criterion::default().sample_size(SAMPLE_SIZE);

    let empty_circuit = BatchCreateUserCircuit::<N_ASSETS, N_OPS>::init_empty();

    let (params, pk, vk) = generate_setup_artifacts(K, None, &empty_circuit).unwrap();

    let mut builder = WitnessBuilder::<N_ASSETS>::new(sample_ledger()).unwrap();
    let witness = builder.build_batch(&accounts(0, N_OPS)).unwrap();

    // Only now we can instantiate the circuit with the actual inputs
    let circuit = BatchCreateUserCircuit::<N_ASSETS, N_OPS>::init(witness).unwrap();

    let bench_name = format!(
        "generate zk proof - {} operations with {} assets batch create user circuit",
        N_OPS, N_ASSETS
    );
    criterion.bench_function(&bench_name, |b| {
        b.iter(|| {
            full_prover(&params, &pk, circuit.clone(), circuit.instances()).unwrap();
        })
    });

    let proof = full_prover(&params, &pk, circuit.clone(), circuit.instances()).unwrap();

    println!("proof size in bytes: {}", proof.len());

    let bench_name = format!(
        "verify zk proof - {} operations with {} assets batch create user circuit",
        N_OPS, N_ASSETS
    );
    criterion.bench_function(&bench_name, |b| {
        b.iter(|| {
            full_verifier(&params, &vk, &proof, circuit.instances());
        })
    });
}

criterion_group!(
    benches,
    build_batch_witness,
    verification_key_gen_batch_create_user_circuit,
    proving_key_gen_batch_create_user_circuit,
    generate_and_verify_zk_proof_batch_create_user_circuit,
);
criterion_main!(benches);
