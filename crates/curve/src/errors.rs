//! Errors that can occur in curve arithmetic, signing and aggregation.

use thiserror::Error;

/// Errors surfaced by scalar/point arithmetic and the signing protocols.
///
/// Every variant carries a message naming the invariant that was violated so
/// that callers never have to guess which precondition failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CurveError {
    /// A scalar was zero or out of range where a group element was required.
    #[error("invalid scalar: {0}")]
    InvalidScalar(&'static str),

    /// An x-coordinate has no valid y on the curve, or a point operation
    /// produced the identity where a proper point was required.
    #[error("invalid point: {0}")]
    InvalidPoint(&'static str),

    /// The caller supplied key material with an odd y-coordinate to an
    /// operation that assumes prior parity normalization. Surfaced instead of
    /// silently auto-corrected; the caller must negate and retry.
    #[error("parity normalization required: {0}")]
    NegationRequired(&'static str),

    /// Signature verification failed. Always recoverable for the caller.
    #[error("invalid signature: {0}")]
    InvalidSignature(&'static str),
}
