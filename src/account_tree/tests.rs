#[cfg(test)]
mod test {

    use crate::account_tree::{
        account_id_to_hash, compute_root, empty_leaf_hash, AccountProof, AccountRecord,
        AccountTree,
    };
    use crate::ladder::RateLadder;
    use crate::ledger::packing::account_assets_commitment;
    use crate::ledger::{AccountAsset, AssetLedgerEntry};
    use crate::params::TREE_DEPTH;
    use crate::utils::big_uint_to_fp;
    use crate::utils::hash::{poseidon_hash, poseidon_node, poseidon_sequence};
    use crate::witness::WitnessError;
    use halo2_proofs::halo2curves::bn256::Fr as Fp;
    use num_bigint::BigUint;

    const N_ASSETS: usize = 2;

    #[test]
    fn test_empty_tree() {
        let tree = AccountTree::new(N_ASSETS);
        let mut node = empty_leaf_hash(N_ASSETS);
        assert_eq!(tree.empty_leaf(), node);
        for _ in 0..TREE_DEPTH {
            node = poseidon_node(node, node);
        }
        assert_eq!(tree.root(), node);

        // the empty leaf depends on the asset universe
        assert_ne!(empty_leaf_hash(1), empty_leaf_hash(2));
    }

    #[test]
    fn test_insert_and_prove() {
        let mut tree = AccountTree::new(N_ASSETS);
        let empty_root = tree.root();

        let proof = tree.generate_proof(5).unwrap();
        assert!(AccountTree::verify_proof(
            &empty_root,
            &tree.empty_leaf(),
            5,
            &proof
        ));

        let leaf = Fp::from(42);
        tree.insert(5, leaf).unwrap();
        assert_eq!(tree.leaf(5).unwrap(), leaf);
        assert_eq!(compute_root(&leaf, 5, &proof), tree.root());

        // the sibling path of a leaf does not depend on the leaf itself
        assert_eq!(tree.generate_proof(5).unwrap(), proof);

        // index 4 is the left neighbour of index 5
        let neighbour_proof = tree.generate_proof(4).unwrap();
        assert_eq!(neighbour_proof.siblings()[0], leaf);
        assert!(AccountTree::verify_proof(
            &tree.root(),
            &tree.empty_leaf(),
            4,
            &neighbour_proof
        ));
        assert!(!AccountTree::verify_proof(
            &tree.root(),
            &tree.empty_leaf(),
            5,
            &neighbour_proof
        ));
    }

    #[test]
    fn test_path_bits_are_little_endian() {
        let siblings: [Fp; TREE_DEPTH] = core::array::from_fn(|i| Fp::from(i as u64 + 100));
        let proof = AccountProof::new(siblings);
        let leaf = Fp::from(7);

        // index 0b10: left at level 0, right at level 1
        let level_0 = poseidon_node(leaf, siblings[0]);
        let level_1 = poseidon_node(siblings[1], level_0);
        let root = siblings
            .iter()
            .skip(2)
            .fold(level_1, |node, sibling| poseidon_node(node, *sibling));
        assert_eq!(compute_root(&leaf, 2, &proof), root);
    }

    #[test]
    fn test_reject_insert_into_occupied_slot() {
        let mut tree = AccountTree::new(N_ASSETS);
        tree.insert(3, Fp::from(1)).unwrap();
        assert_eq!(
            tree.insert(3, Fp::from(2)),
            Err(WitnessError::SlotOccupied(3))
        );
        assert_eq!(tree.leaf(3).unwrap(), Fp::from(1));
    }

    #[test]
    fn test_reject_index_out_of_range() {
        let mut tree = AccountTree::new(N_ASSETS);
        let index = 1u32 << TREE_DEPTH;
        assert_eq!(
            tree.generate_proof(index),
            Err(WitnessError::AccountIndexOutOfRange(index))
        );
        assert_eq!(
            tree.insert(index, Fp::from(1)),
            Err(WitnessError::AccountIndexOutOfRange(index))
        );
        assert!(!AccountTree::verify_proof(
            &tree.root(),
            &tree.empty_leaf(),
            index,
            &AccountProof::default()
        ));
    }

    #[test]
    fn test_account_record_leaf() {
        let ladder = RateLadder::new(&[(100, 100)]).unwrap();
        let ledger = vec![
            AssetLedgerEntry::new("btc", 3, [ladder.clone(), ladder.clone(), ladder.clone()]),
            AssetLedgerEntry::new("eth", 5, [ladder.clone(), ladder.clone(), ladder]),
        ];
        let assets = vec![
            AccountAsset {
                index: 0,
                equity: 10,
                debt: 1,
                ..AccountAsset::default()
            },
            AccountAsset {
                index: 1,
                equity: 4,
                debt: 2,
                ..AccountAsset::default()
            },
        ];
        let id_hash = account_id_to_hash("alice");
        let record = AccountRecord::new(id_hash, assets.clone(), &ledger);

        assert_eq!(record.total_equity(), &BigUint::from(10u64 * 3 + 4 * 5));
        assert_eq!(record.total_debt(), &BigUint::from(3u64 + 2 * 5));
        assert_eq!(
            record.leaf_hash(N_ASSETS),
            poseidon_hash([
                id_hash,
                Fp::from(50),
                Fp::from(13),
                account_assets_commitment(&assets, N_ASSETS),
            ])
        );
        assert_eq!(
            AccountRecord::empty().leaf_hash(N_ASSETS),
            empty_leaf_hash(N_ASSETS)
        );
    }

    #[test]
    fn test_account_id_to_hash() {
        // 31 byte chunks, little-endian
        let id = "a".repeat(40);
        let first = big_uint_to_fp(&BigUint::from_bytes_le(&id.as_bytes()[..31]));
        let second = big_uint_to_fp(&BigUint::from_bytes_le(&id.as_bytes()[31..]));
        assert_eq!(account_id_to_hash(&id), poseidon_sequence(&[first, second]));
        assert_ne!(account_id_to_hash("alice"), account_id_to_hash("bob"));
    }

    #[test]
    fn test_account_proof_serde() {
        let proof = AccountProof::new(core::array::from_fn(|i| Fp::from(i as u64)));
        let bytes = bincode::serialize(&proof).unwrap();
        assert_eq!(bincode::deserialize::<AccountProof>(&bytes).unwrap(), proof);

        // a proof with a missing level
        let short: Vec<[u8; 32]> = vec![[0u8; 32]; TREE_DEPTH - 1];
        let bytes = bincode::serialize(&short).unwrap();
        assert!(bincode::deserialize::<AccountProof>(&bytes).is_err());
    }
}
