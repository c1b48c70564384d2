//! Affine point arithmetic on the secp256k1 curve `y^2 = x^3 + 7`.

use std::sync::LazyLock;

use num_bigint::BigUint;
use num_traits::Zero;

use crate::{errors::CurveError, scalar::Scalar};

/// The prime field size `p` of secp256k1.
pub static FIELD_SIZE: LazyLock<BigUint> = LazyLock::new(|| {
    BigUint::parse_bytes(
        b"FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEFFFFFC2F",
        16,
    )
    .expect("valid hex constant")
});

/// `(p + 1) / 4`, the exponent used to compute square roots mod `p`.
static SQRT_EXPONENT: LazyLock<BigUint> =
    LazyLock::new(|| (&*FIELD_SIZE + BigUint::from(1u8)) >> 2);

/// `p - 2`, the exponent for Fermat inversion in the coordinate field.
static FIELD_MINUS_TWO: LazyLock<BigUint> =
    LazyLock::new(|| &*FIELD_SIZE - BigUint::from(2u8));

/// The standard generator point `G`.
pub static GENERATOR: LazyLock<Point> = LazyLock::new(|| {
    let x = BigUint::parse_bytes(
        b"79BE667EF9DCBBAC55A06295CE870B07029BFCDB2DCE28D959F2815B16F81798",
        16,
    )
    .expect("valid hex constant");
    let y = BigUint::parse_bytes(
        b"483ADA7726A3C4655DA4FBFC0E1108A8FD17B448A68554199C47D08FFB10D4B8",
        16,
    )
    .expect("valid hex constant");
    Point::from_coords(x, y).expect("generator lies on the curve")
});

/// A point on the curve, or the identity (point at infinity).
///
/// Coordinates are held modulo [`FIELD_SIZE`]. Points are immutable value
/// types; transforms such as [`Point::negate`] return new points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Point(Option<(BigUint, BigUint)>);

fn field_sub(a: &BigUint, b: &BigUint) -> BigUint {
    ((&*FIELD_SIZE + a) - b) % &*FIELD_SIZE
}

fn field_inv(a: &BigUint) -> BigUint {
    a.modpow(&FIELD_MINUS_TWO, &FIELD_SIZE)
}

impl Point {
    /// The identity element.
    pub fn infinity() -> Self {
        Self(None)
    }

    /// Builds a point from affine coordinates, checking the curve equation.
    pub fn from_coords(x: BigUint, y: BigUint) -> Result<Self, CurveError> {
        if x >= *FIELD_SIZE || y >= *FIELD_SIZE {
            return Err(CurveError::InvalidPoint("coordinate exceeds the field size"));
        }
        let lhs = y.modpow(&BigUint::from(2u8), &FIELD_SIZE);
        let rhs = (x.modpow(&BigUint::from(3u8), &FIELD_SIZE) + BigUint::from(7u8)) % &*FIELD_SIZE;
        if lhs != rhs {
            return Err(CurveError::InvalidPoint("coordinates are not on the curve"));
        }
        Ok(Self(Some((x, y))))
    }

    /// Reconstructs the even-y point for a 32-byte x-only encoding.
    ///
    /// Fails with [`CurveError::InvalidPoint`] when `x` exceeds the field
    /// size or has no square root for `x^3 + 7`.
    pub fn lift_x(x_bytes: &[u8; 32]) -> Result<Self, CurveError> {
        let x = BigUint::from_bytes_be(x_bytes);
        if x >= *FIELD_SIZE {
            return Err(CurveError::InvalidPoint("x exceeds the field size"));
        }
        let y_squared =
            (x.modpow(&BigUint::from(3u8), &FIELD_SIZE) + BigUint::from(7u8)) % &*FIELD_SIZE;
        let y = y_squared.modpow(&SQRT_EXPONENT, &FIELD_SIZE);
        if y.modpow(&BigUint::from(2u8), &FIELD_SIZE) != y_squared {
            return Err(CurveError::InvalidPoint("x has no valid y on the curve"));
        }
        let even_y = if y.bit(0) { field_sub(&BigUint::zero(), &y) } else { y };
        Ok(Self(Some((x, even_y))))
    }

    /// Whether this is the identity element.
    pub fn is_infinity(&self) -> bool {
        self.0.is_none()
    }

    /// Whether the y-coordinate is even. The identity has no parity and
    /// reports `false`.
    pub fn has_even_y(&self) -> bool {
        match &self.0 {
            Some((_, y)) => !y.bit(0),
            None => false,
        }
    }

    /// The 32-byte big-endian x-coordinate (the BIP340 x-only encoding).
    pub fn x_bytes(&self) -> Result<[u8; 32], CurveError> {
        let (x, _) = self
            .0
            .as_ref()
            .ok_or(CurveError::InvalidPoint("the identity has no x-coordinate"))?;
        let raw = x.to_bytes_be();
        let mut out = [0u8; 32];
        out[32 - raw.len()..].copy_from_slice(&raw);
        Ok(out)
    }

    /// The y-coordinate, if this is not the identity.
    pub fn y(&self) -> Option<&BigUint> {
        self.0.as_ref().map(|(_, y)| y)
    }

    /// Reflection over the x-axis, `y -> p - y`.
    pub fn negate(&self) -> Self {
        match &self.0 {
            None => Self(None),
            Some((x, y)) => {
                if y.is_zero() {
                    Self(Some((x.clone(), y.clone())))
                } else {
                    Self(Some((x.clone(), &*FIELD_SIZE - y)))
                }
            }
        }
    }

    /// Point addition, defined for every combination including the identity.
    /// Adding a point to its negation yields the identity.
    pub fn add(&self, other: &Point) -> Point {
        let (x1, y1) = match &self.0 {
            None => return other.clone(),
            Some(coords) => coords,
        };
        let (x2, y2) = match &other.0 {
            None => return self.clone(),
            Some(coords) => coords,
        };

        let lambda = if x1 == x2 {
            if (y1 + y2) % &*FIELD_SIZE == BigUint::zero() {
                return Point::infinity();
            }
            // Doubling: lambda = 3*x1^2 / (2*y1). y1 cannot be zero here
            // since the curve has odd order (no point of order two).
            let numerator = (BigUint::from(3u8) * x1 * x1) % &*FIELD_SIZE;
            let denominator = (BigUint::from(2u8) * y1) % &*FIELD_SIZE;
            (numerator * field_inv(&denominator)) % &*FIELD_SIZE
        } else {
            let numerator = field_sub(y2, y1);
            let denominator = field_sub(x2, x1);
            (numerator * field_inv(&denominator)) % &*FIELD_SIZE
        };

        let x3 = field_sub(&((&lambda * &lambda) % &*FIELD_SIZE), &((x1 + x2) % &*FIELD_SIZE));
        let y3 = field_sub(&((&lambda * field_sub(x1, &x3)) % &*FIELD_SIZE), y1);
        Point(Some((x3, y3)))
    }

    /// Point subtraction, `self + (-other)`.
    pub fn sub(&self, other: &Point) -> Point {
        self.add(&other.negate())
    }

    /// Scalar division, multiplication by the modular inverse. Fails on a
    /// zero divisor.
    pub fn div(&self, scalar: &Scalar) -> Result<Point, CurveError> {
        Ok(self.mul(&scalar.invert()?))
    }

    /// Scalar multiplication by double-and-add.
    pub fn mul(&self, scalar: &Scalar) -> Point {
        let mut result = Point::infinity();
        let mut addend = self.clone();
        let k = scalar.inner();
        for bit in 0..k.bits() {
            if k.bit(bit) {
                result = result.add(&addend);
            }
            addend = addend.add(&addend);
        }
        result
    }
}
