//! Tapscript leaves: spending-condition scripts plus the metadata a
//! spender and a descriptor need.
//!
//! Two script families are supported, each optionally combined with a
//! hashlock and/or a relative delay:
//!
//! - pay-to-pubkey: one signature.
//! - cumulative multisig (`csa`): one witness slot per key, a running
//!   signature counter that must reach `k`.
//!
//! The assembled script always reads delay check, then key check(s),
//! then hashlock, so the satisfying witness is
//! `[preimage][sig for last key]..[sig for first key]` with `Empty`
//! standing in for keys that do not sign.

use tapforge_curve::{
    tagged::{tagged_hash, Tag},
    PublicKey,
};

use crate::{
    errors::CommitmentError,
    script::{
        ser_string, ScriptBuilder, OP_CHECKSEQUENCEVERIFY, OP_CHECKSIG, OP_CHECKSIGADD,
        OP_CHECKSIGVERIFY, OP_DROP, OP_EQUAL, OP_EQUALVERIFY, OP_HASH160, OP_NUMEQUAL,
        OP_NUMEQUALVERIFY, OP_SIZE,
    },
};

/// The leaf version for the current tapscript generation.
pub const TAPSCRIPT_LEAF_VERSION: u8 = 0xc0;

/// One element a spender must place on the witness stack, in stack
/// order (bottom first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WitnessElement {
    /// A signature by the x-only key recorded here. In a `k`-of-`n`
    /// cumulative leaf, `n - k` of these are replaced by
    /// [`WitnessElement::Empty`] at spend time.
    Signature([u8; 32]),
    /// A 32-byte preimage whose `hash160` must equal the recorded
    /// digest.
    Preimage([u8; 20]),
    /// An empty element for an unused key slot.
    Empty,
}

/// An immutable spending condition: script bytes, leaf version,
/// descriptor string and witness template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapLeaf {
    version: u8,
    script: Vec<u8>,
    descriptor: String,
    witness_template: Vec<WitnessElement>,
    delay: Option<u32>,
}

impl TapLeaf {
    /// Single-key leaf, `ts(pk(..))`.
    pub fn pay_to_pubkey(key: &PublicKey) -> Self {
        Self::build_pk(key, None, None)
    }

    /// Single key plus hashlock, `ts(pk_hashlock(..))`.
    pub fn pay_to_pubkey_hashlock(key: &PublicKey, digest: [u8; 20]) -> Self {
        Self::build_pk(key, Some(digest), None)
    }

    /// Single key plus relative delay, `ts(pk_delay(..))`.
    pub fn pay_to_pubkey_delay(key: &PublicKey, delay: u32) -> Result<Self, CommitmentError> {
        check_delay(delay)?;
        Ok(Self::build_pk(key, None, Some(delay)))
    }

    /// Single key plus hashlock plus delay, `ts(pk_hashlock_delay(..))`.
    pub fn pay_to_pubkey_hashlock_delay(
        key: &PublicKey,
        digest: [u8; 20],
        delay: u32,
    ) -> Result<Self, CommitmentError> {
        check_delay(delay)?;
        Ok(Self::build_pk(key, Some(digest), Some(delay)))
    }

    /// `k`-of-`n` cumulative multisig, `ts(csa(..))`.
    pub fn checksig_add(k: usize, keys: &[PublicKey]) -> Result<Self, CommitmentError> {
        Self::build_csa(k, keys, None, None)
    }

    /// Cumulative multisig plus hashlock, `ts(csa_hashlock(..))`.
    pub fn checksig_add_hashlock(
        k: usize,
        keys: &[PublicKey],
        digest: [u8; 20],
    ) -> Result<Self, CommitmentError> {
        Self::build_csa(k, keys, Some(digest), None)
    }

    /// Cumulative multisig plus delay, `ts(csa_delay(..))`.
    pub fn checksig_add_delay(
        k: usize,
        keys: &[PublicKey],
        delay: u32,
    ) -> Result<Self, CommitmentError> {
        check_delay(delay)?;
        Self::build_csa(k, keys, None, Some(delay))
    }

    /// Cumulative multisig plus hashlock plus delay,
    /// `ts(csa_hashlock_delay(..))`.
    pub fn checksig_add_hashlock_delay(
        k: usize,
        keys: &[PublicKey],
        digest: [u8; 20],
        delay: u32,
    ) -> Result<Self, CommitmentError> {
        check_delay(delay)?;
        Self::build_csa(k, keys, Some(digest), Some(delay))
    }

    /// Decomposes `k`-of-`n` into one `k`-of-`k` cumulative leaf per
    /// key combination, in lexicographic combination order.
    ///
    /// Spenders reveal only the leaf they use, so unused keys stay
    /// hidden, at the cost of `C(n, k)` leaves in the tree.
    pub fn threshold(k: usize, keys: &[PublicKey]) -> Result<Vec<Self>, CommitmentError> {
        if k == 0 || k > keys.len() {
            return Err(CommitmentError::Leaf("threshold k must be in 1..=n"));
        }
        let mut leaves = Vec::new();
        for combo in combinations(keys.len(), k) {
            let subset: Vec<PublicKey> = combo.iter().map(|&i| keys[i].clone()).collect();
            leaves.push(Self::build_csa(k, &subset, None, None)?);
        }
        Ok(leaves)
    }

    fn build_pk(key: &PublicKey, hashlock: Option<[u8; 20]>, delay: Option<u32>) -> Self {
        let mut builder = delay_prefix(delay);
        builder = builder.push_slice(&key.x_only()).push_opcode(if hashlock.is_some() {
            OP_CHECKSIGVERIFY
        } else {
            OP_CHECKSIG
        });

        let mut witness_template = Vec::new();
        if let Some(digest) = hashlock {
            builder = hashlock_suffix(builder, &digest);
            witness_template.push(WitnessElement::Preimage(digest));
        }
        witness_template.push(WitnessElement::Signature(key.x_only()));

        let name = family_name("pk", hashlock.is_some(), delay.is_some());
        let mut args = hex::encode(key.x_only());
        push_suffix_args(&mut args, hashlock, delay);

        Self {
            version: TAPSCRIPT_LEAF_VERSION,
            script: builder.into_bytes(),
            descriptor: format!("ts({name}({args}))"),
            witness_template,
            delay,
        }
    }

    fn build_csa(
        k: usize,
        keys: &[PublicKey],
        hashlock: Option<[u8; 20]>,
        delay: Option<u32>,
    ) -> Result<Self, CommitmentError> {
        if keys.is_empty() {
            return Err(CommitmentError::Leaf("multisig needs at least one key"));
        }
        if k == 0 || k > keys.len() {
            return Err(CommitmentError::Leaf("multisig k must be in 1..=n"));
        }

        let mut builder = delay_prefix(delay);
        for (index, key) in keys.iter().enumerate() {
            builder = builder.push_slice(&key.x_only()).push_opcode(if index == 0 {
                OP_CHECKSIG
            } else {
                OP_CHECKSIGADD
            });
        }
        builder = builder.push_int(k as i64).push_opcode(if hashlock.is_some() {
            OP_NUMEQUALVERIFY
        } else {
            OP_NUMEQUAL
        });

        let mut witness_template = Vec::new();
        if let Some(digest) = hashlock {
            builder = hashlock_suffix(builder, &digest);
            witness_template.push(WitnessElement::Preimage(digest));
        }
        for key in keys.iter().rev() {
            witness_template.push(WitnessElement::Signature(key.x_only()));
        }

        let name = family_name("csa", hashlock.is_some(), delay.is_some());
        let mut args = k.to_string();
        for key in keys {
            args.push(',');
            args.push_str(&hex::encode(key.x_only()));
        }
        push_suffix_args(&mut args, hashlock, delay);

        Ok(Self {
            version: TAPSCRIPT_LEAF_VERSION,
            script: builder.into_bytes(),
            descriptor: format!("ts({name}({args}))"),
            witness_template,
            delay,
        })
    }

    /// The leaf version byte.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// The assembled script bytes.
    pub fn script(&self) -> &[u8] {
        &self.script
    }

    /// The canonical `ts(..)` descriptor.
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// The witness elements a spender must supply, in stack order.
    pub fn witness_template(&self) -> &[WitnessElement] {
        &self.witness_template
    }

    /// The relative delay, when the leaf carries one.
    pub fn delay(&self) -> Option<u32> {
        self.delay
    }

    /// The tagged leaf hash, `H_TapLeaf(version || ser_string(script))`.
    /// This is the leaf's identity for tree ordering and control blocks.
    pub fn leaf_hash(&self) -> [u8; 32] {
        let mut data = Vec::with_capacity(self.script.len() + 2);
        data.push(self.version);
        data.extend_from_slice(&ser_string(&self.script));
        tagged_hash(Tag::TapLeaf, &data)
    }
}

fn check_delay(delay: u32) -> Result<(), CommitmentError> {
    if delay == 0 || delay > u32::from(u16::MAX) {
        return Err(CommitmentError::Leaf(
            "delay must be in the 16-bit relative-timelock range",
        ));
    }
    Ok(())
}

fn delay_prefix(delay: Option<u32>) -> ScriptBuilder {
    match delay {
        None => ScriptBuilder::new(),
        Some(delay) => ScriptBuilder::new()
            .push_int(i64::from(delay))
            .push_opcode(OP_CHECKSEQUENCEVERIFY)
            .push_opcode(OP_DROP),
    }
}

fn hashlock_suffix(builder: ScriptBuilder, digest: &[u8; 20]) -> ScriptBuilder {
    builder
        .push_opcode(OP_SIZE)
        .push_int(32)
        .push_opcode(OP_EQUALVERIFY)
        .push_opcode(OP_HASH160)
        .push_slice(digest)
        .push_opcode(OP_EQUAL)
}

fn family_name(base: &str, hashlock: bool, delay: bool) -> String {
    let mut name = base.to_owned();
    if hashlock {
        name.push_str("_hashlock");
    }
    if delay {
        name.push_str("_delay");
    }
    name
}

fn push_suffix_args(args: &mut String, hashlock: Option<[u8; 20]>, delay: Option<u32>) {
    if let Some(digest) = hashlock {
        args.push(',');
        args.push_str(&hex::encode(digest));
    }
    if let Some(delay) = delay {
        args.push(',');
        args.push_str(&delay.to_string());
    }
}

/// All `k`-element index subsets of `0..n`, lexicographically.
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    let mut indices: Vec<usize> = (0..k).collect();
    loop {
        out.push(indices.clone());
        // Advance the rightmost index that still has room.
        let mut i = k;
        loop {
            if i == 0 {
                return out;
            }
            i -= 1;
            if indices[i] != i + n - k {
                break;
            }
        }
        indices[i] += 1;
        for j in i + 1..k {
            indices[j] = indices[j - 1] + 1;
        }
    }
}
