//! Taproot-style output commitments on top of [`tapforge_curve`].
//!
//! The crate covers the path from spending conditions to a spendable
//! output and back:
//!
//! - [`script`] / [`leaf`]: tapscript construction for the pay-to-pubkey
//!   and cumulative-multisig families, with optional hashlocks and
//!   relative delays.
//! - [`tree`]: merkle commitment over a set of leaves, manual or
//!   weight-optimized, yielding the output script and per-leaf control
//!   blocks.
//! - [`descriptor`]: the human-readable `tp(...)`/`ts(...)` template
//!   grammar with exact round-tripping.
//! - [`tweak`] / [`address`]: output-key derivation and bech32m
//!   addresses.
//! - [`sighash`] / [`witness`]: transaction digests and witness-stack
//!   assembly for key-path and script-path spends.

pub mod address;
pub mod descriptor;
pub mod errors;
pub mod leaf;
pub mod script;
pub mod sighash;
pub mod tree;
pub mod tweak;
pub mod witness;

pub use errors::CommitmentError;
pub use leaf::{TapLeaf, WitnessElement};
pub use tree::{ControlBlock, Node, SpendInfo, TapTree};
pub use tweak::OutputKey;

pub mod prelude {
    //! Single-import surface for the common flow: build leaves, commit,
    //! address, spend.

    pub use crate::{
        address::Network,
        errors::CommitmentError,
        leaf::{TapLeaf, WitnessElement},
        sighash::{SighashType, Transaction, TxIn, TxOut},
        tree::{ControlBlock, Node, SpendInfo, TapTree},
        tweak::OutputKey,
    };
}
