//! Witness-stack assembly for key-path and script-path spends.

use tapforge_curve::Signature;

use crate::{
    errors::CommitmentError,
    leaf::{TapLeaf, WitnessElement},
    sighash::SighashType,
    tree::ControlBlock,
};

// BIP68: bit 31 disables the relative timelock, the low 16 bits carry
// the value.
const SEQUENCE_DISABLE_FLAG: u32 = 1 << 31;
const SEQUENCE_VALUE_MASK: u32 = 0xffff;

/// The witness stack for a key-path spend: the signature alone, with
/// the sighash flag appended only when it is not the implicit default.
pub fn key_path_witness(signature: &Signature, sighash: SighashType) -> Vec<Vec<u8>> {
    vec![encode_signature(signature, sighash)]
}

/// A signature element, 64 bytes for the default sighash and 65
/// otherwise.
pub fn encode_signature(signature: &Signature, sighash: SighashType) -> Vec<u8> {
    let mut element = signature.to_bytes().to_vec();
    if !sighash.is_default() {
        element.push(sighash.to_byte());
    }
    element
}

/// Assembles the witness stack for a script-path spend:
/// `[satisfaction elements][leaf script][control block]`.
///
/// `satisfaction` must line up with the leaf's witness template, one
/// element per slot; an unused key slot takes an empty element. For a
/// delay leaf the spending input's `tx_version` and `sequence` are
/// checked here, so an unspendable stack is an error instead of a
/// silently invalid transaction.
pub fn script_path_witness(
    leaf: &TapLeaf,
    satisfaction: Vec<Vec<u8>>,
    control_block: &ControlBlock,
    tx_version: u32,
    sequence: u32,
) -> Result<Vec<Vec<u8>>, CommitmentError> {
    if let Some(delay) = leaf.delay() {
        if tx_version < 2 {
            return Err(CommitmentError::TxVersion(tx_version));
        }
        if sequence & SEQUENCE_DISABLE_FLAG != 0 || sequence & SEQUENCE_VALUE_MASK < delay {
            return Err(CommitmentError::TimelockNotSatisfied {
                required: delay,
                actual: sequence,
            });
        }
    }

    let template = leaf.witness_template();
    if satisfaction.len() != template.len() {
        return Err(CommitmentError::Leaf(
            "satisfaction element count does not match the leaf template",
        ));
    }
    for (slot, element) in template.iter().zip(&satisfaction) {
        match slot {
            WitnessElement::Preimage(_) if element.len() != 32 => {
                return Err(CommitmentError::Leaf("preimage must be exactly 32 bytes"));
            }
            WitnessElement::Signature(_)
                if !element.is_empty() && element.len() != 64 && element.len() != 65 =>
            {
                return Err(CommitmentError::Leaf(
                    "signature element must be 64 or 65 bytes, or empty",
                ));
            }
            _ => {}
        }
    }

    let mut stack = satisfaction;
    stack.push(leaf.script().to_vec());
    stack.push(control_block.serialize());
    Ok(stack)
}
