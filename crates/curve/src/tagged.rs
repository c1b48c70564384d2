//! Domain-separated ("tagged") hashing.
//!
//! `tagged_hash(tag, data) = SHA256(SHA256(tag) || SHA256(tag) || data)`.
//! Every hashing purpose has its own tag; using the wrong one is a
//! correctness bug (it is what prevents cross-domain collisions), so the
//! tags form a closed enumeration instead of free-form strings.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// The hashing purposes used across signing and tree commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// Auxiliary-randomness mixing during nonce derivation.
    Bip340Aux,
    /// Deterministic nonce derivation.
    Bip340Nonce,
    /// Schnorr challenge computation.
    Bip340Challenge,
    /// Script leaf hashing.
    TapLeaf,
    /// Internal tree node hashing.
    TapBranch,
    /// Output key tweak computation.
    TapTweak,
    /// Transaction signature hash computation.
    TapSighash,
}

impl Tag {
    /// The literal tag string committed into the hash.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Bip340Aux => "BIP0340/aux",
            Tag::Bip340Nonce => "BIP0340/nonce",
            Tag::Bip340Challenge => "BIP0340/challenge",
            Tag::TapLeaf => "TapLeaf",
            Tag::TapBranch => "TapBranch",
            Tag::TapTweak => "TapTweak",
            Tag::TapSighash => "TapSighash",
        }
    }
}

/// Computes the tagged hash of `data` under `tag`.
pub fn tagged_hash(tag: Tag, data: &[u8]) -> [u8; 32] {
    tagged_hash_raw(tag.as_str(), data)
}

fn tagged_hash_raw(tag: &str, data: &[u8]) -> [u8; 32] {
    let tag_digest = Sha256::digest(tag.as_bytes());
    let mut hasher = Sha256::new();
    hasher.update(tag_digest);
    hasher.update(tag_digest);
    hasher.update(data);
    hasher.finalize().into()
}

/// Plain SHA256.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// `RIPEMD160(SHA256(data))`, the 20-byte hashlock digest.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(Sha256::digest(data)).into()
}
