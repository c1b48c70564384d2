//! Transaction signature hashes for taproot spends, over a minimal
//! transaction model carrying only the committed fields.

use tapforge_curve::tagged::{sha256, tagged_hash, Tag};

use crate::{errors::CommitmentError, script::ser_string};

/// Reference to the output being spent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutPoint {
    /// The funding transaction id.
    pub txid: [u8; 32],
    /// The output index within it.
    pub vout: u32,
}

/// A transaction input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxIn {
    /// The spent output.
    pub prevout: OutPoint,
    /// The sequence field; encodes the relative timelock.
    pub sequence: u32,
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOut {
    /// Amount in the smallest unit.
    pub value: u64,
    /// The locking script.
    pub script_pubkey: Vec<u8>,
}

/// The fields of a transaction that the signature hash commits to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Transaction version; must be at least 2 for relative timelocks.
    pub version: u32,
    /// Absolute locktime.
    pub lock_time: u32,
    /// Inputs.
    pub inputs: Vec<TxIn>,
    /// Outputs.
    pub outputs: Vec<TxOut>,
}

/// A validated sighash flag.
///
/// `DEFAULT` (0x00) hashes like `ALL` but is encoded implicitly: a
/// 64-byte signature. Non-default flags are appended as a 65th
/// signature byte by the witness layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SighashType(u8);

impl SighashType {
    /// Commit to everything, implicit encoding.
    pub const DEFAULT: Self = Self(0x00);
    /// Commit to everything.
    pub const ALL: Self = Self(0x01);
    /// Commit to no outputs.
    pub const NONE: Self = Self(0x02);
    /// Commit to the output at the input's own index.
    pub const SINGLE: Self = Self(0x03);

    /// Validates a flag byte. Accepts 0x00..=0x03 and the
    /// anyone-can-pay forms 0x81..=0x83.
    pub fn from_byte(byte: u8) -> Result<Self, CommitmentError> {
        match byte {
            0x00..=0x03 | 0x81..=0x83 => Ok(Self(byte)),
            other => Err(CommitmentError::UnsupportedSighash(other)),
        }
    }

    /// Adds the anyone-can-pay modifier. Not representable for
    /// `DEFAULT`, which has no explicit encoding to carry it.
    pub fn anyone_can_pay(self) -> Result<Self, CommitmentError> {
        if self.0 == 0x00 {
            return Err(CommitmentError::UnsupportedSighash(0x80));
        }
        Ok(Self(self.0 | 0x80))
    }

    /// The flag byte.
    pub fn to_byte(self) -> u8 {
        self.0
    }

    /// Whether this is the implicit default.
    pub fn is_default(self) -> bool {
        self.0 == 0x00
    }

    fn is_anyone_can_pay(self) -> bool {
        self.0 & 0x80 != 0
    }

    fn base(self) -> u8 {
        self.0 & 0x03
    }
}

fn serialize_outputs(outputs: &[TxOut]) -> Vec<u8> {
    let mut out = Vec::new();
    for output in outputs {
        out.extend_from_slice(&output.value.to_le_bytes());
        out.extend_from_slice(&ser_string(&output.script_pubkey));
    }
    out
}

/// The BIP341-style signature hash for one input.
///
/// `prevouts` must list the spent output for every input, in input
/// order. `leaf_hash` switches the digest to script-path form,
/// committing to the executed leaf.
pub fn taproot_signature_hash(
    tx: &Transaction,
    prevouts: &[TxOut],
    input_index: usize,
    sighash: SighashType,
    leaf_hash: Option<&[u8; 32]>,
) -> Result<[u8; 32], CommitmentError> {
    if prevouts.len() != tx.inputs.len() {
        return Err(CommitmentError::PrevoutCount {
            prevouts: prevouts.len(),
            inputs: tx.inputs.len(),
        });
    }
    if input_index >= tx.inputs.len() {
        return Err(CommitmentError::InputIndex {
            index: input_index,
            inputs: tx.inputs.len(),
        });
    }

    let mut msg = Vec::with_capacity(256);
    msg.push(sighash.to_byte());
    msg.extend_from_slice(&tx.version.to_le_bytes());
    msg.extend_from_slice(&tx.lock_time.to_le_bytes());

    if !sighash.is_anyone_can_pay() {
        let mut outpoints = Vec::new();
        let mut amounts = Vec::new();
        let mut script_pubkeys = Vec::new();
        let mut sequences = Vec::new();
        for (input, prevout) in tx.inputs.iter().zip(prevouts) {
            outpoints.extend_from_slice(&input.prevout.txid);
            outpoints.extend_from_slice(&input.prevout.vout.to_le_bytes());
            amounts.extend_from_slice(&prevout.value.to_le_bytes());
            script_pubkeys.extend_from_slice(&ser_string(&prevout.script_pubkey));
            sequences.extend_from_slice(&input.sequence.to_le_bytes());
        }
        msg.extend_from_slice(&sha256(&outpoints));
        msg.extend_from_slice(&sha256(&amounts));
        msg.extend_from_slice(&sha256(&script_pubkeys));
        msg.extend_from_slice(&sha256(&sequences));
    }

    if sighash.base() != SighashType::NONE.0 && sighash.base() != SighashType::SINGLE.0 {
        msg.extend_from_slice(&sha256(&serialize_outputs(&tx.outputs)));
    }

    let ext_flag: u8 = if leaf_hash.is_some() { 1 } else { 0 };
    msg.push(ext_flag * 2); // no annex

    if sighash.is_anyone_can_pay() {
        let input = &tx.inputs[input_index];
        let prevout = &prevouts[input_index];
        msg.extend_from_slice(&input.prevout.txid);
        msg.extend_from_slice(&input.prevout.vout.to_le_bytes());
        msg.extend_from_slice(&prevout.value.to_le_bytes());
        msg.extend_from_slice(&ser_string(&prevout.script_pubkey));
        msg.extend_from_slice(&input.sequence.to_le_bytes());
    } else {
        msg.extend_from_slice(&(input_index as u32).to_le_bytes());
    }

    if sighash.base() == SighashType::SINGLE.0 {
        let output = tx
            .outputs
            .get(input_index)
            .ok_or(CommitmentError::SingleWithoutOutput(input_index))?;
        msg.extend_from_slice(&sha256(&serialize_outputs(std::slice::from_ref(output))));
    }

    if let Some(leaf_hash) = leaf_hash {
        msg.extend_from_slice(leaf_hash);
        msg.push(0x00); // key version
        msg.extend_from_slice(&0xffff_ffffu32.to_le_bytes()); // code separator position
    }

    // Epoch prefix.
    let mut data = Vec::with_capacity(msg.len() + 1);
    data.push(0x00);
    data.extend_from_slice(&msg);
    Ok(tagged_hash(Tag::TapSighash, &data))
}
