use crate::account_tree::{empty_leaf_hash, AccountProof};
use crate::params::TREE_DEPTH;
use crate::utils::hash::poseidon_node;
use crate::witness::WitnessError;
use halo2_proofs::halo2curves::bn256::Fr as Fp;
use std::collections::HashMap;

/// Sparse binary Poseidon tree of depth `TREE_DEPTH`.
///
/// Only nodes that differ from the empty subtree of their level are stored.
#[derive(Clone, Debug)]
pub struct AccountTree {
    empty_nodes: Vec<Fp>,
    nodes: HashMap<(usize, u64), Fp>,
}

/// Recomputes the root from a leaf, its index and its siblings. Bit `i` of the index selects the side at level `i`.
pub fn compute_root(leaf: &Fp, index: u32, proof: &AccountProof) -> Fp {
    proof
        .siblings()
        .iter()
        .enumerate()
        .fold(*leaf, |node, (level, sibling)| {
            if (index >> level) & 1 == 0 {
                poseidon_node(node, *sibling)
            } else {
                poseidon_node(*sibling, node)
            }
        })
}

fn check_index(index: u32) -> Result<u64, WitnessError> {
    let position = index as u64;
    if position >> TREE_DEPTH != 0 {
        return Err(WitnessError::AccountIndexOutOfRange(index));
    }
    Ok(position)
}

impl AccountTree {
    /// An empty tree whose leaves commit to a universe of `n_assets` assets
    pub fn new(n_assets: usize) -> Self {
        let mut empty_nodes = Vec::with_capacity(TREE_DEPTH + 1);
        empty_nodes.push(empty_leaf_hash(n_assets));
        for level in 0..TREE_DEPTH {
            let child = empty_nodes[level];
            empty_nodes.push(poseidon_node(child, child));
        }

        AccountTree {
            empty_nodes,
            nodes: HashMap::new(),
        }
    }

    fn node(&self, level: usize, index: u64) -> Fp {
        self.nodes
            .get(&(level, index))
            .copied()
            .unwrap_or(self.empty_nodes[level])
    }

    pub fn root(&self) -> Fp {
        self.node(TREE_DEPTH, 0)
    }

    pub fn empty_leaf(&self) -> Fp {
        self.empty_nodes[0]
    }

    pub fn leaf(&self, index: u32) -> Result<Fp, WitnessError> {
        Ok(self.node(0, check_index(index)?))
    }

    pub fn generate_proof(&self, index: u32) -> Result<AccountProof, WitnessError> {
        let mut position = check_index(index)?;
        let mut siblings = [Fp::zero(); TREE_DEPTH];
        for (level, sibling) in siblings.iter_mut().enumerate() {
            *sibling = self.node(level, position ^ 1);
            position >>= 1;
        }
        Ok(AccountProof::new(siblings))
    }

    /// Writes `leaf` into an empty slot and updates the path to the root
    pub fn insert(&mut self, index: u32, leaf: Fp) -> Result<(), WitnessError> {
        let mut position = check_index(index)?;
        if self.nodes.contains_key(&(0, position)) {
            return Err(WitnessError::SlotOccupied(index));
        }

        let mut node = leaf;
        for level in 0..TREE_DEPTH {
            self.nodes.insert((level, position), node);
            let sibling = self.node(level, position ^ 1);
            node = if position & 1 == 0 {
                poseidon_node(node, sibling)
            } else {
                poseidon_node(sibling, node)
            };
            position >>= 1;
        }
        self.nodes.insert((TREE_DEPTH, 0), node);

        Ok(())
    }

    pub fn verify_proof(root: &Fp, leaf: &Fp, index: u32, proof: &AccountProof) -> bool {
        check_index(index).is_ok() && compute_root(leaf, index, proof) == *root
    }
}
