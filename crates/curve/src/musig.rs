//! n-of-n key aggregation and multi-party signing.
//!
//! Aggregation binds every participant key with a per-key challenge
//! coefficient so that no cosigner can grind a key that cancels the
//! others. The aggregate key verifies under plain BIP340
//! [`verify`](crate::schnorr::verify); a verifier cannot tell it apart
//! from a single-party key.

use tracing::{debug, trace};

use crate::{
    errors::CurveError,
    keys::{PrivateKey, PublicKey},
    point::Point,
    scalar::Scalar,
    schnorr::{challenge_scalar, Signature},
    tagged::sha256,
};

/// The aggregation state for a fixed set of participant keys.
///
/// Construction sorts the keys, derives one coefficient per key, and
/// normalizes the aggregate to an even y-coordinate. When normalization
/// negates the aggregate, every coefficient is negated with it so that
/// `sum(c_i * P_i)` still equals the stored key.
#[derive(Debug, Clone)]
pub struct KeyAggContext {
    keys: Vec<PublicKey>,
    coefficients: Vec<Scalar>,
    aggregate: PublicKey,
    negated: bool,
    tweak: Option<Scalar>,
}

impl KeyAggContext {
    /// Aggregates a set of participant keys.
    ///
    /// Rejects an empty set and duplicate keys (compared by x-only
    /// encoding). Key order does not matter; the x-only encodings are
    /// sorted before hashing so every participant derives the same
    /// context.
    pub fn new(keys: Vec<PublicKey>) -> Result<Self, CurveError> {
        if keys.is_empty() {
            return Err(CurveError::InvalidPoint("cannot aggregate an empty key set"));
        }

        let mut keys = keys;
        keys.sort_by_key(PublicKey::x_only);
        for pair in keys.windows(2) {
            if pair[0].x_only() == pair[1].x_only() {
                return Err(CurveError::InvalidPoint("duplicate key in aggregation"));
            }
        }

        // L commits to the full sorted set; each coefficient then binds
        // one key to that set.
        let mut concatenated = Vec::with_capacity(32 * keys.len());
        for key in &keys {
            concatenated.extend_from_slice(&key.x_only());
        }
        let key_set_digest = sha256(&concatenated);

        let mut coefficients = Vec::with_capacity(keys.len());
        let mut sum = Point::infinity();
        for key in &keys {
            let mut data = Vec::with_capacity(64);
            data.extend_from_slice(&key_set_digest);
            data.extend_from_slice(&key.x_only());
            let coefficient = Scalar::from_bytes(&sha256(&data));
            sum = sum.add(&key.point().mul(&coefficient));
            coefficients.push(coefficient);
        }

        let aggregate = PublicKey::from_point(sum)?;
        let negated = !aggregate.has_even_y();
        let (aggregate, coefficients) = if negated {
            (
                aggregate.negate(),
                coefficients.iter().map(Scalar::negate).collect(),
            )
        } else {
            (aggregate, coefficients)
        };

        debug!(
            participants = keys.len(),
            aggregate = %hex::encode(aggregate.x_only()),
            negated,
            "aggregated participant keys"
        );

        Ok(Self {
            keys,
            coefficients,
            aggregate,
            negated,
            tweak: None,
        })
    }

    /// The aggregate public key (even y-coordinate).
    pub fn aggregated_pubkey(&self) -> &PublicKey {
        &self.aggregate
    }

    /// Whether construction (or tweaking) negated the coefficients.
    pub fn negated(&self) -> bool {
        self.negated
    }

    /// The tweak folded into the aggregate, adjusted for parity.
    pub fn tweak(&self) -> Option<&Scalar> {
        self.tweak.as_ref()
    }

    /// The challenge coefficient bound to `key`.
    ///
    /// Fails when `key` was not part of the aggregation.
    pub fn key_coefficient(&self, key: &PublicKey) -> Result<&Scalar, CurveError> {
        let target = key.x_only();
        self.keys
            .iter()
            .position(|candidate| candidate.x_only() == target)
            .map(|index| &self.coefficients[index])
            .ok_or(CurveError::InvalidPoint("key is not part of this aggregation"))
    }

    /// Folds an additive tweak into the aggregate key, producing the
    /// context for `Q = P + t*G`.
    ///
    /// When `Q` has an odd y-coordinate the coefficients and the tweak
    /// are negated together with it, so partial signatures and the
    /// final tweak term stay consistent. A context accepts one tweak;
    /// tweaking twice is an error.
    pub fn with_tweak(&self, tweak: Scalar) -> Result<Self, CurveError> {
        if self.tweak.is_some() {
            return Err(CurveError::InvalidScalar("context is already tweaked"));
        }
        if tweak.is_zero() {
            return Err(CurveError::InvalidScalar("tweak cannot be zero"));
        }

        let tweaked = self.aggregate.add_tweak(&tweak)?;
        let (tweaked, coefficients, tweak, negated) = if tweaked.has_even_y() {
            (tweaked, self.coefficients.clone(), tweak, false)
        } else {
            (
                tweaked.negate(),
                self.coefficients.iter().map(Scalar::negate).collect(),
                tweak.negate(),
                true,
            )
        };

        debug!(
            tweaked = %hex::encode(tweaked.x_only()),
            negated,
            "tweaked aggregate key"
        );

        Ok(Self {
            keys: self.keys.clone(),
            coefficients,
            aggregate: tweaked,
            negated,
            tweak: Some(tweak),
        })
    }

    /// The challenge scalar for a signing session over this aggregate.
    pub fn challenge(&self, nonce_x: &[u8; 32], msg: &[u8; 32]) -> Scalar {
        challenge_scalar(nonce_x, &self.aggregate.x_only(), msg)
    }

    /// One participant's additive share, `k + e * c * d`.
    ///
    /// `nonce` is the participant's secret nonce and `nonce_negated` the
    /// flag reported by [`aggregate_nonces`]; when set, the nonce is
    /// negated so the shares sum against the normalized nonce point.
    pub fn partial_sign(
        &self,
        secret: &PrivateKey,
        nonce: &Scalar,
        nonce_negated: bool,
        challenge: &Scalar,
    ) -> Result<Scalar, CurveError> {
        let coefficient = self.key_coefficient(&secret.public_key())?;
        let k = if nonce_negated { nonce.negate() } else { nonce.clone() };
        Ok(&k + &(&(challenge * coefficient) * secret.scalar()))
    }

    /// The aggregation-time term `e * t` covering the tweak, to be added
    /// once by the aggregator. `None` when the context is untweaked.
    pub fn tweak_term(&self, challenge: &Scalar) -> Option<Scalar> {
        self.tweak.as_ref().map(|t| challenge * t)
    }
}

/// Sums the participants' public nonce points and normalizes the sum to
/// an even y-coordinate.
///
/// The returned flag reports whether normalization negated the point;
/// every participant must then negate their secret nonce in
/// [`KeyAggContext::partial_sign`]. Fails when the points sum to the
/// identity.
pub fn aggregate_nonces(nonces: &[PublicKey]) -> Result<(PublicKey, bool), CurveError> {
    if nonces.is_empty() {
        return Err(CurveError::InvalidPoint("cannot aggregate an empty nonce set"));
    }
    let mut sum = Point::infinity();
    for nonce in nonces {
        sum = sum.add(nonce.point());
    }
    let aggregate = PublicKey::from_point(sum)
        .map_err(|_| CurveError::InvalidPoint("nonce points sum to the identity"))?;
    let negated = !aggregate.has_even_y();
    trace!(
        participants = nonces.len(),
        negated,
        "aggregated session nonces"
    );
    if negated {
        Ok((aggregate.negate(), true))
    } else {
        Ok((aggregate, false))
    }
}

/// Combines the participants' shares into the final signature,
/// `s = sum(s_i) + e*t` with the tweak term supplied by
/// [`KeyAggContext::tweak_term`].
pub fn aggregate_partials(
    partials: &[Scalar],
    nonce_x: [u8; 32],
    tweak_term: Option<&Scalar>,
) -> Signature {
    let mut s = Scalar::zero();
    for partial in partials {
        s = &s + partial;
    }
    if let Some(term) = tweak_term {
        s = &s + term;
    }
    Signature::new(nonce_x, s)
}
