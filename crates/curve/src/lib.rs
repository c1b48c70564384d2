//! Elliptic-curve building blocks for taproot-style commitments.
//!
//! This crate implements the secp256k1 arithmetic, BIP340 tagged hashing and
//! Schnorr signing, and the MuSig n-of-n aggregation protocol that the
//! commitment layer ([`tapforge-commitment`](../tapforge_commitment/index.html))
//! builds on. It sits at the bottom of the crate hierarchy in this workspace
//! and depends on no other workspace crate.
//!
//! # Security
//!
//! Scalar and point arithmetic is carried out on heap-allocated big integers
//! and does **not** execute in constant time with respect to secret values.
//! Do not expose signing operations from this crate to adversaries that can
//! take fine-grained timing measurements.

pub mod errors;
pub mod keys;
pub mod musig;
pub mod point;
pub mod scalar;
pub mod schnorr;
pub mod tagged;

pub use errors::CurveError;
pub use keys::{KeyPair, PrivateKey, PublicKey};
pub use point::Point;
pub use scalar::Scalar;
pub use schnorr::Signature;
