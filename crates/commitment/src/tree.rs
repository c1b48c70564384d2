//! Merkle commitment over tapscript leaves: tree construction, control
//! blocks, and the weight-optimized constructor.

use std::{
    cmp::Reverse,
    collections::{BTreeMap, BinaryHeap},
};

use tracing::{debug, trace};

use tapforge_curve::{
    tagged::{tagged_hash, Tag},
    PublicKey, Scalar,
};

use crate::{
    errors::CommitmentError,
    leaf::TapLeaf,
    script::ser_string,
    tweak::{tap_tweak, OutputKey},
};

/// The commitment hash of two child hashes, concatenated in
/// lexicographic order. Sorting makes the committed tree independent of
/// left/right placement, so a verifier needs no ordering hints.
pub fn branch_hash(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut data = Vec::with_capacity(64);
    if left <= right {
        data.extend_from_slice(left);
        data.extend_from_slice(right);
    } else {
        data.extend_from_slice(right);
        data.extend_from_slice(left);
    }
    tagged_hash(Tag::TapBranch, &data)
}

fn leaf_hash_raw(version: u8, script: &[u8]) -> [u8; 32] {
    let mut data = Vec::with_capacity(script.len() + 2);
    data.push(version);
    data.extend_from_slice(&ser_string(script));
    tagged_hash(Tag::TapLeaf, &data)
}

/// A node of the script tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A terminal spending condition.
    Leaf(TapLeaf),
    /// An interior pair of subtrees.
    Branch(Box<Node>, Box<Node>),
}

impl Node {
    /// Joins two subtrees.
    pub fn branch(left: Node, right: Node) -> Self {
        Self::Branch(Box::new(left), Box::new(right))
    }

    /// The node's commitment hash.
    pub fn hash(&self) -> [u8; 32] {
        match self {
            Node::Leaf(leaf) => leaf.leaf_hash(),
            Node::Branch(left, right) => branch_hash(&left.hash(), &right.hash()),
        }
    }

    /// The descriptor fragment for this subtree.
    pub(crate) fn descriptor(&self) -> String {
        match self {
            Node::Leaf(leaf) => leaf.descriptor().to_owned(),
            Node::Branch(left, right) => {
                format!("[{},{}]", left.descriptor(), right.descriptor())
            }
        }
    }
}

/// The per-leaf proof revealed when spending through a script path:
/// leaf version and output parity, the internal key, and the sibling
/// hashes from the leaf up to the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlBlock {
    leaf_version: u8,
    output_parity: u8,
    internal_key: [u8; 32],
    branch: Vec<[u8; 32]>,
}

impl ControlBlock {
    /// Assembles a control block from its parts. `branch` is ordered
    /// leaf to root.
    pub fn new(
        leaf_version: u8,
        output_parity: u8,
        internal_key: [u8; 32],
        branch: Vec<[u8; 32]>,
    ) -> Self {
        Self {
            leaf_version,
            output_parity,
            internal_key,
            branch,
        }
    }

    /// The committed leaf version.
    pub fn leaf_version(&self) -> u8 {
        self.leaf_version
    }

    /// The output key's parity bit.
    pub fn output_parity(&self) -> u8 {
        self.output_parity
    }

    /// The internal key's x-only encoding.
    pub fn internal_key(&self) -> &[u8; 32] {
        &self.internal_key
    }

    /// The sibling hashes, leaf to root.
    pub fn branch(&self) -> &[[u8; 32]] {
        &self.branch
    }

    /// The wire encoding: `[version | parity][internal key][siblings]`,
    /// `33 + 32 * depth` bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(33 + 32 * self.branch.len());
        out.push(self.leaf_version | self.output_parity);
        out.extend_from_slice(&self.internal_key);
        for sibling in &self.branch {
            out.extend_from_slice(sibling);
        }
        out
    }

    /// Parses the wire encoding, enforcing the length law.
    pub fn parse(bytes: &[u8]) -> Result<Self, CommitmentError> {
        if bytes.len() < 33 || (bytes.len() - 33) % 32 != 0 {
            return Err(CommitmentError::ControlBlockLength(bytes.len()));
        }
        let leaf_version = bytes[0] & 0xfe;
        let output_parity = bytes[0] & 0x01;
        let internal_key: [u8; 32] = bytes[1..33].try_into().expect("slice is 32 bytes");
        let branch = bytes[33..]
            .chunks_exact(32)
            .map(|chunk| chunk.try_into().expect("chunk is 32 bytes"))
            .collect();
        Ok(Self {
            leaf_version,
            output_parity,
            internal_key,
            branch,
        })
    }

    /// Folds a leaf hash up the recorded path to the merkle root.
    pub fn merkle_root(&self, leaf_hash: &[u8; 32]) -> [u8; 32] {
        let mut acc = *leaf_hash;
        for sibling in &self.branch {
            acc = branch_hash(&acc, sibling);
        }
        acc
    }

    /// Checks that this block commits to `script` under the output key
    /// with x-only encoding `output_x`.
    ///
    /// Recomputes the leaf hash, folds it to a root, re-derives the
    /// tweaked key from the internal key, and compares both the x-only
    /// encoding and the parity bit.
    pub fn verify(&self, script: &[u8], output_x: &[u8; 32]) -> Result<(), CommitmentError> {
        let root = self.merkle_root(&leaf_hash_raw(self.leaf_version, script));
        let internal = PublicKey::from_x_only(&self.internal_key)?;
        let tweak = tap_tweak(&self.internal_key, Some(&root));
        let output = OutputKey::from_internal(&internal, &tweak)?;
        if output.x_only() != *output_x || output.parity() != self.output_parity {
            return Err(CommitmentError::ControlBlockMismatch);
        }
        Ok(())
    }
}

/// Everything needed to spend an output: the output key and script, the
/// tweak, and one control block per committed leaf script.
#[derive(Debug, Clone)]
pub struct SpendInfo {
    output_key: OutputKey,
    tweak: Scalar,
    control_blocks: BTreeMap<Vec<u8>, ControlBlock>,
}

impl SpendInfo {
    /// The tweaked output key.
    pub fn output_key(&self) -> &OutputKey {
        &self.output_key
    }

    /// The segwit v1 output script.
    pub fn output_script(&self) -> Vec<u8> {
        self.output_key.output_script()
    }

    /// The aggregate tweak scalar. Key-path signers add this to the
    /// internal secret.
    pub fn tweak(&self) -> &Scalar {
        &self.tweak
    }

    /// The control block for a committed leaf script.
    pub fn control_block(&self, script: &[u8]) -> Option<&ControlBlock> {
        self.control_blocks.get(script)
    }

    /// All control blocks, keyed by leaf script bytes.
    pub fn control_blocks(&self) -> &BTreeMap<Vec<u8>, ControlBlock> {
        &self.control_blocks
    }
}

/// An internal key with an optional script tree committed to it.
#[derive(Debug, Clone)]
pub struct TapTree {
    internal_key: PublicKey,
    root: Option<Node>,
}

impl TapTree {
    /// A tree with script paths rooted at `root`.
    pub fn new(internal_key: PublicKey, root: Node) -> Self {
        Self {
            internal_key,
            root: Some(root),
        }
    }

    /// An output with no script paths. The output key is still tweaked,
    /// with the hash covering the internal key alone.
    pub fn key_path_only(internal_key: PublicKey) -> Self {
        Self {
            internal_key,
            root: None,
        }
    }

    /// Builds the tree shape that minimizes expected witness size:
    /// repeatedly merges the two lightest subtrees, so leaves with
    /// higher spend probability end up with shorter paths.
    ///
    /// Equal weights are ordered by node hash, which pins the resulting
    /// shape for any input order.
    pub fn from_weighted_leaves(
        internal_key: PublicKey,
        weighted: Vec<(u32, TapLeaf)>,
    ) -> Result<Self, CommitmentError> {
        if weighted.is_empty() {
            return Err(CommitmentError::EmptyLeafSet);
        }

        let mut heap: BinaryHeap<Reverse<WeightedNode>> = weighted
            .into_iter()
            .map(|(weight, leaf)| {
                Reverse(WeightedNode {
                    weight: u64::from(weight),
                    hash: leaf.leaf_hash(),
                    node: Node::Leaf(leaf),
                })
            })
            .collect();

        while heap.len() > 1 {
            let Reverse(first) = heap.pop().expect("heap has two entries");
            let Reverse(second) = heap.pop().expect("heap has two entries");
            trace!(
                first = %hex::encode(first.hash),
                second = %hex::encode(second.hash),
                weight = first.weight + second.weight,
                "merging lightest subtrees"
            );
            let hash = branch_hash(&first.hash, &second.hash);
            heap.push(Reverse(WeightedNode {
                weight: first.weight + second.weight,
                hash,
                node: Node::branch(first.node, second.node),
            }));
        }

        let Reverse(root) = heap.pop().expect("heap has one entry");
        Ok(Self {
            internal_key,
            root: Some(root.node),
        })
    }

    /// The internal key.
    pub fn internal_key(&self) -> &PublicKey {
        &self.internal_key
    }

    /// The root node, absent for a key-path-only tree.
    pub fn root(&self) -> Option<&Node> {
        self.root.as_ref()
    }

    /// The canonical `tp(..)` descriptor.
    pub fn descriptor(&self) -> String {
        let key = hex::encode(self.internal_key.x_only());
        match &self.root {
            None => format!("tp({key})"),
            Some(root) => format!("tp({key},{})", root.descriptor()),
        }
    }

    /// Commits the tree: derives the tweak and output key and collects
    /// one control block per leaf in a single traversal.
    ///
    /// Fails with [`CommitmentError::DuplicateLeaf`] when two leaves
    /// hash identically, since their merkle paths would be
    /// interchangeable.
    pub fn construct(&self) -> Result<SpendInfo, CommitmentError> {
        let internal_x = self.internal_key.x_only();

        let (merkle_root, paths) = match &self.root {
            None => (None, Vec::new()),
            Some(root) => {
                let mut paths = Vec::new();
                let root_hash = collect_paths(root, &mut paths);
                (Some(root_hash), paths)
            }
        };

        let tweak = tap_tweak(&internal_x, merkle_root.as_ref());
        let output_key = OutputKey::from_internal(&self.internal_key, &tweak)?;

        let mut seen = BTreeMap::new();
        let mut control_blocks = BTreeMap::new();
        for (leaf, branch) in paths {
            let leaf_hash = leaf.leaf_hash();
            if seen.insert(leaf_hash, ()).is_some() {
                return Err(CommitmentError::DuplicateLeaf(hex::encode(leaf_hash)));
            }
            control_blocks.insert(
                leaf.script().to_vec(),
                ControlBlock::new(leaf.version(), output_key.parity(), internal_x, branch),
            );
        }

        debug!(
            output = %hex::encode(output_key.x_only()),
            leaves = control_blocks.len(),
            key_path_only = merkle_root.is_none(),
            "constructed output commitment"
        );

        Ok(SpendInfo {
            output_key,
            tweak,
            control_blocks,
        })
    }
}

/// Computes a subtree's hash while accumulating each leaf's sibling
/// path (leaf to root, extended as the recursion unwinds).
fn collect_paths<'t>(
    node: &'t Node,
    paths: &mut Vec<(&'t TapLeaf, Vec<[u8; 32]>)>,
) -> [u8; 32] {
    match node {
        Node::Leaf(leaf) => {
            paths.push((leaf, Vec::new()));
            leaf.leaf_hash()
        }
        Node::Branch(left, right) => {
            let start = paths.len();
            let left_hash = collect_paths(left, paths);
            let split = paths.len();
            let right_hash = collect_paths(right, paths);
            for (_, path) in &mut paths[start..split] {
                path.push(right_hash);
            }
            for (_, path) in &mut paths[split..] {
                path.push(left_hash);
            }
            branch_hash(&left_hash, &right_hash)
        }
    }
}

/// Heap entry for the weight-optimized constructor; ordered by weight
/// with the node hash as tie break.
#[derive(Debug)]
struct WeightedNode {
    weight: u64,
    hash: [u8; 32],
    node: Node,
}

impl PartialEq for WeightedNode {
    fn eq(&self, other: &Self) -> bool {
        self.weight == other.weight && self.hash == other.hash
    }
}

impl Eq for WeightedNode {}

impl PartialOrd for WeightedNode {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WeightedNode {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.weight, self.hash).cmp(&(other.weight, other.hash))
    }
}

#[cfg(test)]
mod tests {
    use tapforge_curve::KeyPair;

    use super::*;

    fn keypair(byte: u8) -> KeyPair {
        let secret = tapforge_curve::PrivateKey::from_bytes(&[byte; 32]).unwrap();
        KeyPair::new(secret).normalized().0
    }

    fn pk_leaf(byte: u8) -> TapLeaf {
        TapLeaf::pay_to_pubkey(keypair(byte).public_key())
    }

    #[test]
    fn branch_hash_is_symmetric() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        assert_eq!(branch_hash(&a, &b), branch_hash(&b, &a));
        assert_ne!(branch_hash(&a, &b), branch_hash(&a, &a));
    }

    #[test]
    fn control_blocks_verify_against_output() {
        let internal = keypair(40);
        let leaves: Vec<TapLeaf> = (1..=3).map(pk_leaf).collect();
        let root = Node::branch(
            Node::branch(Node::Leaf(leaves[0].clone()), Node::Leaf(leaves[1].clone())),
            Node::Leaf(leaves[2].clone()),
        );
        let tree = TapTree::new(internal.public_key().clone(), root);
        let info = tree.construct().unwrap();
        let output_x = info.output_key().x_only();

        for leaf in &leaves {
            let block = info.control_block(leaf.script()).expect("leaf committed");
            block.verify(leaf.script(), &output_x).unwrap();
        }

        // Depths: two leaves at depth 2, one at depth 1.
        assert_eq!(
            info.control_block(leaves[0].script()).unwrap().branch().len(),
            2
        );
        assert_eq!(
            info.control_block(leaves[2].script()).unwrap().branch().len(),
            1
        );
    }

    #[test]
    fn verify_rejects_foreign_script() {
        let internal = keypair(41);
        let leaf = pk_leaf(4);
        let other = pk_leaf(5);
        let tree = TapTree::new(internal.public_key().clone(), Node::Leaf(leaf.clone()));
        let info = tree.construct().unwrap();
        let block = info.control_block(leaf.script()).unwrap();
        assert_eq!(
            block.verify(other.script(), &info.output_key().x_only()),
            Err(CommitmentError::ControlBlockMismatch)
        );
    }

    #[test]
    fn duplicate_leaves_are_rejected() {
        let internal = keypair(42);
        let leaf = pk_leaf(6);
        let tree = TapTree::new(
            internal.public_key().clone(),
            Node::branch(Node::Leaf(leaf.clone()), Node::Leaf(leaf)),
        );
        assert!(matches!(
            tree.construct(),
            Err(CommitmentError::DuplicateLeaf(_))
        ));
    }

    #[test]
    fn key_path_only_still_tweaks() {
        let internal = keypair(43);
        let tree = TapTree::key_path_only(internal.public_key().clone());
        let info = tree.construct().unwrap();
        assert!(info.control_blocks().is_empty());
        assert_ne!(info.output_key().x_only(), internal.public_key().x_only());
    }

    #[test]
    fn huffman_gives_heavy_leaves_short_paths() {
        let internal = keypair(44);
        let weighted = vec![
            (1, pk_leaf(7)),
            (1, pk_leaf(8)),
            (2, pk_leaf(9)),
            (4, pk_leaf(10)),
        ];
        let scripts: Vec<Vec<u8>> = weighted
            .iter()
            .map(|(_, leaf)| leaf.script().to_vec())
            .collect();

        let tree =
            TapTree::from_weighted_leaves(internal.public_key().clone(), weighted).unwrap();
        let info = tree.construct().unwrap();

        let depth =
            |script: &[u8]| info.control_block(script).unwrap().branch().len();
        // Weights 1,1,2,4: the two lightest sit deepest, the heaviest
        // at depth 1.
        assert_eq!(depth(&scripts[0]), 3);
        assert_eq!(depth(&scripts[1]), 3);
        assert_eq!(depth(&scripts[2]), 2);
        assert_eq!(depth(&scripts[3]), 1);
    }

    #[test]
    fn huffman_shape_is_input_order_independent() {
        let internal = keypair(45);
        let weighted: Vec<(u32, TapLeaf)> =
            (11..=14).map(|byte| (1, pk_leaf(byte))).collect();
        let mut reversed = weighted.clone();
        reversed.reverse();

        let a = TapTree::from_weighted_leaves(internal.public_key().clone(), weighted)
            .unwrap()
            .construct()
            .unwrap();
        let b = TapTree::from_weighted_leaves(internal.public_key().clone(), reversed)
            .unwrap()
            .construct()
            .unwrap();
        assert_eq!(a.output_key().x_only(), b.output_key().x_only());
    }

    #[test]
    fn empty_weighted_set_is_rejected() {
        let internal = keypair(46);
        assert_eq!(
            TapTree::from_weighted_leaves(internal.public_key().clone(), vec![])
                .err(),
            Some(CommitmentError::EmptyLeafSet)
        );
    }

    #[test]
    fn control_block_round_trips_and_checks_length() {
        let block = ControlBlock::new(0xc0, 1, [7u8; 32], vec![[8u8; 32], [9u8; 32]]);
        let bytes = block.serialize();
        assert_eq!(bytes.len(), 33 + 64);
        assert_eq!(bytes[0], 0xc1);
        assert_eq!(ControlBlock::parse(&bytes).unwrap(), block);

        assert_eq!(
            ControlBlock::parse(&bytes[..40]).err(),
            Some(CommitmentError::ControlBlockLength(40))
        );
        assert_eq!(
            ControlBlock::parse(&[]).err(),
            Some(CommitmentError::ControlBlockLength(0))
        );
    }
}
