//! Private/public key wrappers and explicit parity normalization.

use rand::RngCore;

use crate::{
    errors::CurveError,
    point::{Point, GENERATOR},
    scalar::Scalar,
};

/// A secp256k1 private key: a non-zero scalar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateKey(Scalar);

impl PrivateKey {
    /// Wraps a scalar, rejecting zero.
    pub fn from_scalar(scalar: Scalar) -> Result<Self, CurveError> {
        if scalar.is_zero() {
            return Err(CurveError::InvalidScalar("private key cannot be zero"));
        }
        Ok(Self(scalar))
    }

    /// Parses a 32-byte big-endian secret, rejecting zero and values at or
    /// above the group order.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CurveError> {
        Ok(Self(Scalar::from_bytes_strict(bytes)?))
    }

    /// Generates a fresh random key.
    pub fn generate(rng: &mut impl RngCore) -> Self {
        Self(Scalar::random(rng))
    }

    /// The secret scalar.
    pub fn scalar(&self) -> &Scalar {
        &self.0
    }

    /// The 32-byte big-endian secret encoding.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Derives the public key, `d * G`.
    pub fn public_key(&self) -> PublicKey {
        // The scalar is non-zero and below the group order, so the product
        // can never be the identity.
        PublicKey(GENERATOR.mul(&self.0))
    }

    /// The key for `n - d`. Its public point is the negation of this key's.
    pub fn negate(&self) -> Self {
        Self(self.0.negate())
    }

    /// Adds a tweak scalar, `d + t mod n`.
    pub fn add_tweak(&self, tweak: &Scalar) -> Result<Self, CurveError> {
        Self::from_scalar(&self.0 + tweak)
    }

    /// Multiplies by a scalar, `d * c mod n`. Used for MuSig coefficients.
    pub fn mul_tweak(&self, factor: &Scalar) -> Result<Self, CurveError> {
        Self::from_scalar(&self.0 * factor)
    }
}

/// A secp256k1 public key: a curve point that is never the identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey(Point);

impl PublicKey {
    /// Wraps a point, rejecting the identity.
    pub fn from_point(point: Point) -> Result<Self, CurveError> {
        if point.is_infinity() {
            return Err(CurveError::InvalidPoint(
                "public key cannot be the point at infinity",
            ));
        }
        Ok(Self(point))
    }

    /// Reconstructs the even-y key for a 32-byte x-only encoding.
    pub fn from_x_only(x_bytes: &[u8; 32]) -> Result<Self, CurveError> {
        Ok(Self(Point::lift_x(x_bytes)?))
    }

    /// The underlying curve point.
    pub fn point(&self) -> &Point {
        &self.0
    }

    /// The 32-byte x-only (BIP340) encoding. The y-coordinate is discarded;
    /// a reconstructing party will assume it is even.
    pub fn x_only(&self) -> [u8; 32] {
        self.0.x_bytes().expect("public key is never the identity")
    }

    /// Whether the y-coordinate is even.
    pub fn has_even_y(&self) -> bool {
        self.0.has_even_y()
    }

    /// `0` for an even y-coordinate, `1` for odd. Encoded into control
    /// blocks.
    pub fn parity(&self) -> u8 {
        u8::from(!self.has_even_y())
    }

    /// Point addition of two keys. Fails when the result is the identity
    /// (the keys were negations of each other).
    pub fn add(&self, other: &PublicKey) -> Result<Self, CurveError> {
        Self::from_point(self.0.add(&other.0))
    }

    /// Point subtraction of two keys.
    pub fn sub(&self, other: &PublicKey) -> Result<Self, CurveError> {
        Self::from_point(self.0.sub(&other.0))
    }

    /// Scalar multiplication. Fails on a zero factor.
    pub fn mul(&self, factor: &Scalar) -> Result<Self, CurveError> {
        if factor.is_zero() {
            return Err(CurveError::InvalidScalar(
                "cannot multiply a public key by zero",
            ));
        }
        Self::from_point(self.0.mul(factor))
    }

    /// Scalar division, the inverse of [`PublicKey::mul`]. Fails on a zero
    /// divisor.
    pub fn div(&self, divisor: &Scalar) -> Result<Self, CurveError> {
        Self::from_point(self.0.div(divisor)?)
    }

    /// Adds `t * G`, the public half of [`PrivateKey::add_tweak`].
    pub fn add_tweak(&self, tweak: &Scalar) -> Result<Self, CurveError> {
        Self::from_point(self.0.add(&GENERATOR.mul(tweak)))
    }

    /// Reflection over the x-axis. The x-only encoding is unchanged.
    pub fn negate(&self) -> Self {
        Self(self.0.negate())
    }
}

/// A private key together with its derived public key.
///
/// Parity normalization is an explicit transform ([`KeyPair::normalized`]),
/// never applied implicitly; the returned flag tells the caller whether
/// dependent values (tweaks, partial signatures) must be negated as well.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    secret: PrivateKey,
    public: PublicKey,
}

impl KeyPair {
    /// Derives the pair for a private key.
    pub fn new(secret: PrivateKey) -> Self {
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Generates a random pair. Not parity-normalized.
    pub fn generate(rng: &mut impl RngCore) -> Self {
        Self::new(PrivateKey::generate(rng))
    }

    /// Generates a random pair whose public key has an even y-coordinate,
    /// ready for x-only use.
    pub fn generate_bip340(rng: &mut impl RngCore) -> Self {
        Self::generate(rng).normalized().0
    }

    /// The secret half.
    pub fn secret_key(&self) -> &PrivateKey {
        &self.secret
    }

    /// The public half.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Whether the public key already has an even y-coordinate.
    pub fn is_normalized(&self) -> bool {
        self.public.has_even_y()
    }

    /// Returns a pair whose public key has an even y-coordinate, negating
    /// both halves together when required, plus a flag reporting whether
    /// negation happened.
    pub fn normalized(self) -> (Self, bool) {
        if self.is_normalized() {
            (self, false)
        } else {
            (
                Self {
                    secret: self.secret.negate(),
                    public: self.public.negate(),
                },
                true,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::thread_rng;

    use super::*;
    use crate::point::FIELD_SIZE;

    #[test]
    fn negating_the_secret_negates_the_point() {
        let key = PrivateKey::generate(&mut thread_rng());
        let negated = key.negate();
        assert_eq!(negated.public_key(), key.public_key().negate());

        let p = key.public_key();
        let q = negated.public_key();
        assert_eq!(p.x_only(), q.x_only());
        let y_sum = (p.point().y().unwrap() + q.point().y().unwrap()) % &*FIELD_SIZE;
        assert_eq!(y_sum, 0u8.into());
    }

    #[test]
    fn normalization_reports_flag_and_is_idempotent() {
        let mut rng = thread_rng();
        let pair = KeyPair::generate(&mut rng);
        let expected_flag = !pair.is_normalized();
        let (normalized, negated) = pair.normalized();
        assert_eq!(negated, expected_flag);
        assert!(normalized.is_normalized());
        let (again, negated_again) = normalized.clone().normalized();
        assert!(!negated_again);
        assert_eq!(again, normalized);
    }

    #[test]
    fn x_only_round_trips_for_even_keys() {
        let pair = KeyPair::generate_bip340(&mut thread_rng());
        let restored = PublicKey::from_x_only(&pair.public_key().x_only()).expect("valid x");
        assert_eq!(&restored, pair.public_key());
    }

    #[test]
    fn zero_secret_is_rejected() {
        assert!(PrivateKey::from_bytes(&[0u8; 32]).is_err());
    }

    #[test]
    fn division_undoes_multiplication() {
        let mut rng = thread_rng();
        let pair = KeyPair::generate_bip340(&mut rng);
        let factor = Scalar::random(&mut rng);
        let scaled = pair.public_key().mul(&factor).expect("non-zero factor");
        assert_eq!(&scaled.div(&factor).expect("non-zero divisor"), pair.public_key());

        let zero = Scalar::from_bytes(&[0u8; 32]);
        assert!(pair.public_key().div(&zero).is_err());
    }

    #[test]
    fn tweaked_key_matches_tweaked_point() {
        let mut rng = thread_rng();
        let pair = KeyPair::generate_bip340(&mut rng);
        let tweak = Scalar::random(&mut rng);
        let tweaked_secret = pair.secret_key().add_tweak(&tweak).expect("non-zero");
        let tweaked_public = pair.public_key().add_tweak(&tweak).expect("non-identity");
        assert_eq!(tweaked_secret.public_key(), tweaked_public);
    }
}
