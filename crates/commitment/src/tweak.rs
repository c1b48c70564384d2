//! Output-key derivation: folding a tree commitment (or contract) into
//! an internal key.

use tapforge_curve::{
    tagged::{tagged_hash, Tag},
    CurveError, KeyPair, PublicKey, Scalar,
};

use crate::errors::CommitmentError;

/// The commitment tweak for an internal key and optional merkle root,
/// `H_TapTweak(xonly(P) || root)`.
///
/// With no root the hash covers the key alone, committing to "no script
/// paths exist": even a key-path-only output is tweaked so a spender
/// cannot later claim a hidden script path.
pub fn tap_tweak(internal_x: &[u8; 32], merkle_root: Option<&[u8; 32]>) -> Scalar {
    let mut data = Vec::with_capacity(64);
    data.extend_from_slice(internal_x);
    if let Some(root) = merkle_root {
        data.extend_from_slice(root);
    }
    Scalar::from_bytes(&tagged_hash(Tag::TapTweak, &data))
}

/// A pay-to-contract tweak, `H_TapTweak(xonly(P) || contract)`.
///
/// Committing to the public key alongside the contract bytes is what
/// stops a counterparty from shifting the commitment to a different
/// document after the fact.
pub fn pay_to_contract_tweak(key: &PublicKey, contract: &[u8]) -> Scalar {
    let mut data = Vec::with_capacity(32 + contract.len());
    data.extend_from_slice(&key.x_only());
    data.extend_from_slice(contract);
    Scalar::from_bytes(&tagged_hash(Tag::TapTweak, &data))
}

/// The tweaked output key `Q = P + t*G` with its parity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputKey(PublicKey);

impl OutputKey {
    /// Applies `tweak` to `internal`.
    pub fn from_internal(internal: &PublicKey, tweak: &Scalar) -> Result<Self, CommitmentError> {
        Ok(Self(internal.add_tweak(tweak)?))
    }

    /// The output key as a full point.
    pub fn key(&self) -> &PublicKey {
        &self.0
    }

    /// The x-only encoding placed in the witness program.
    pub fn x_only(&self) -> [u8; 32] {
        self.0.x_only()
    }

    /// `0` for even y, `1` for odd. Recorded in control blocks so a
    /// verifier can reconstruct the full output point.
    pub fn parity(&self) -> u8 {
        self.0.parity()
    }

    /// The segwit v1 output script, `OP_1 <32-byte x-only key>`.
    pub fn output_script(&self) -> Vec<u8> {
        let mut script = Vec::with_capacity(34);
        script.push(0x51);
        script.push(0x20);
        script.extend_from_slice(&self.x_only());
        script
    }
}

/// The keypair that signs key-path spends of `P + t*G`.
///
/// Requires a parity-normalized internal pair (the tweak hash covers the
/// even-y point). The result is normalized again, since the tweaked
/// point's parity is independent of the internal one's.
pub fn tweaked_keypair(internal: &KeyPair, tweak: &Scalar) -> Result<KeyPair, CommitmentError> {
    if !internal.is_normalized() {
        return Err(CurveError::NegationRequired(
            "tweaking requires a parity-normalized internal keypair",
        )
        .into());
    }
    let secret = internal.secret_key().add_tweak(tweak)?;
    Ok(KeyPair::new(secret).normalized().0)
}
