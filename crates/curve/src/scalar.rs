//! Scalar arithmetic modulo the secp256k1 group order.

use std::{
    ops::{Add, Mul, Sub},
    sync::LazyLock,
};

use num_bigint::BigUint;
use num_traits::Zero;
use rand::RngCore;

use crate::errors::CurveError;

/// The order `n` of the secp256k1 group.
pub static CURVE_ORDER: LazyLock<BigUint> = LazyLock::new(|| {
    BigUint::parse_bytes(
        b"FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141",
        16,
    )
    .expect("valid hex constant")
});

/// `n - 2`, the exponent for Fermat inversion.
static ORDER_MINUS_TWO: LazyLock<BigUint> =
    LazyLock::new(|| &*CURVE_ORDER - BigUint::from(2u8));

/// An integer in `[0, n)` where `n` is the secp256k1 group order.
///
/// All arithmetic is modulo `n`. Values are immutable; every operation
/// returns a new scalar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scalar(BigUint);

impl Scalar {
    /// Creates a scalar from an arbitrary big integer, reducing it mod `n`.
    pub fn new(value: BigUint) -> Self {
        Self(value % &*CURVE_ORDER)
    }

    /// The zero scalar.
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    /// The scalar one.
    pub fn one() -> Self {
        Self(BigUint::from(1u8))
    }

    /// Interprets 32 big-endian bytes as an integer and reduces it mod `n`.
    ///
    /// Used for hash outputs, where reduction is the defined behavior.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self::new(BigUint::from_bytes_be(bytes))
    }

    /// Parses 32 big-endian bytes, rejecting zero and out-of-range values.
    pub fn from_bytes_strict(bytes: &[u8; 32]) -> Result<Self, CurveError> {
        let value = BigUint::from_bytes_be(bytes);
        if value.is_zero() {
            return Err(CurveError::InvalidScalar("value is zero"));
        }
        if value >= *CURVE_ORDER {
            return Err(CurveError::InvalidScalar("value exceeds the group order"));
        }
        Ok(Self(value))
    }

    /// Samples a uniformly random non-zero scalar.
    pub fn random(rng: &mut impl RngCore) -> Self {
        loop {
            let mut bytes = [0u8; 32];
            rng.fill_bytes(&mut bytes);
            if let Ok(scalar) = Self::from_bytes_strict(&bytes) {
                return scalar;
            }
        }
    }

    /// Returns the 32-byte big-endian encoding.
    pub fn to_bytes(&self) -> [u8; 32] {
        let raw = self.0.to_bytes_be();
        let mut out = [0u8; 32];
        out[32 - raw.len()..].copy_from_slice(&raw);
        out
    }

    /// Whether this is the zero scalar.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Additive inverse, `n - x` (zero maps to zero).
    pub fn negate(&self) -> Self {
        if self.is_zero() {
            Self::zero()
        } else {
            Self(&*CURVE_ORDER - &self.0)
        }
    }

    /// Multiplicative inverse via Fermat's little theorem,
    /// `x^(n-2) mod n`.
    pub fn invert(&self) -> Result<Self, CurveError> {
        if self.is_zero() {
            return Err(CurveError::InvalidScalar("zero has no inverse"));
        }
        Ok(Self(self.0.modpow(&ORDER_MINUS_TWO, &CURVE_ORDER)))
    }

    /// Modular division, `self * other^-1 mod n`.
    pub fn div(&self, other: &Scalar) -> Result<Self, CurveError> {
        Ok(self * &other.invert()?)
    }

    pub(crate) fn inner(&self) -> &BigUint {
        &self.0
    }
}

impl Add for &Scalar {
    type Output = Scalar;

    fn add(self, rhs: &Scalar) -> Scalar {
        Scalar((&self.0 + &rhs.0) % &*CURVE_ORDER)
    }
}

impl Sub for &Scalar {
    type Output = Scalar;

    fn sub(self, rhs: &Scalar) -> Scalar {
        Scalar((&*CURVE_ORDER + &self.0 - &rhs.0) % &*CURVE_ORDER)
    }
}

impl Mul for &Scalar {
    type Output = Scalar;

    fn mul(self, rhs: &Scalar) -> Scalar {
        Scalar((&self.0 * &rhs.0) % &*CURVE_ORDER)
    }
}

impl Add for Scalar {
    type Output = Scalar;

    fn add(self, rhs: Scalar) -> Scalar {
        &self + &rhs
    }
}

impl Sub for Scalar {
    type Output = Scalar;

    fn sub(self, rhs: Scalar) -> Scalar {
        &self - &rhs
    }
}

impl Mul for Scalar {
    type Output = Scalar;

    fn mul(self, rhs: Scalar) -> Scalar {
        &self * &rhs
    }
}
