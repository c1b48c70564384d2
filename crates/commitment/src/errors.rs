//! Errors for tree construction, descriptors, sighash and spending.

use thiserror::Error;

use tapforge_curve::CurveError;

/// Errors surfaced by the commitment layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitmentError {
    /// Leaf or threshold parameters that cannot produce a valid script.
    #[error("invalid leaf parameters: {0}")]
    Leaf(&'static str),

    /// Two leaves in one tree hash identically, which would make their
    /// control blocks ambiguous.
    #[error("duplicate leaf: two leaves hash to {0}")]
    DuplicateLeaf(String),

    /// A tree constructor was handed nothing to commit to.
    #[error("cannot build a tree from an empty leaf set")]
    EmptyLeafSet,

    /// Descriptor string rejected; `position` is the byte offset of the
    /// offending input.
    #[error("descriptor parse error at byte {position}: {reason}")]
    Descriptor {
        /// Byte offset into the descriptor string.
        position: usize,
        /// What the parser expected or found.
        reason: &'static str,
    },

    /// A control block whose length is not `33 + 32 * depth`.
    #[error("control block length {0} violates the 33 + 32*depth law")]
    ControlBlockLength(usize),

    /// The control block's merkle path and internal key do not commit to
    /// the claimed script under the claimed output key.
    #[error("control block does not commit to the claimed script")]
    ControlBlockMismatch,

    /// A delay leaf spent by an input whose relative-timelock field is
    /// too small.
    #[error("relative timelock not satisfied: leaf requires {required}, input encodes {actual}")]
    TimelockNotSatisfied {
        /// The delay committed in the leaf script.
        required: u32,
        /// The sequence value the spending input carries.
        actual: u32,
    },

    /// A delay leaf spent by a transaction version without
    /// relative-timelock semantics.
    #[error("transaction version {0} does not support relative timelocks")]
    TxVersion(u32),

    /// A sighash flag outside the supported set.
    #[error("unsupported sighash flag {0:#04x}")]
    UnsupportedSighash(u8),

    /// A sighash request for an input the transaction does not have.
    #[error("input index {index} out of range for {inputs} inputs")]
    InputIndex {
        /// The requested input index.
        index: usize,
        /// How many inputs the transaction has.
        inputs: usize,
    },

    /// The prevout list handed to the sighash does not line up with the
    /// transaction inputs.
    #[error("prevout count {prevouts} does not match input count {inputs}")]
    PrevoutCount {
        /// Supplied prevouts.
        prevouts: usize,
        /// Transaction inputs.
        inputs: usize,
    },

    /// `SIGHASH_SINGLE` for an input with no output at the same index.
    #[error("SIGHASH_SINGLE input {0} has no matching output")]
    SingleWithoutOutput(usize),

    /// A witness program outside the segwit length or version limits.
    #[error("invalid witness program: {0}")]
    WitnessProgram(&'static str),

    /// Bech32 encoding failed.
    #[error("address encoding failed: {0}")]
    Address(#[from] bech32::Error),

    /// An underlying curve operation failed.
    #[error(transparent)]
    Curve(#[from] CurveError),
}
