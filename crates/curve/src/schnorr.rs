//! BIP340 Schnorr signing and verification.

use rand::RngCore;

use crate::{
    errors::CurveError,
    keys::{KeyPair, PublicKey},
    point::{Point, GENERATOR},
    scalar::Scalar,
    tagged::{tagged_hash, Tag},
};

/// A BIP340 signature: the x-only nonce point `R` and the scalar `s`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    r_x: [u8; 32],
    s: Scalar,
}

impl Signature {
    /// Builds a signature from its parts.
    pub fn new(r_x: [u8; 32], s: Scalar) -> Self {
        Self { r_x, s }
    }

    /// The x-only encoding of the nonce point.
    pub fn r_x(&self) -> &[u8; 32] {
        &self.r_x
    }

    /// The scalar half.
    pub fn s(&self) -> &Scalar {
        &self.s
    }

    /// The 64-byte wire encoding, `R.x || s`.
    pub fn to_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.r_x);
        out[32..].copy_from_slice(&self.s.to_bytes());
        out
    }

    /// Parses the 64-byte wire encoding, rejecting `s >= n`.
    pub fn from_bytes(bytes: &[u8; 64]) -> Result<Self, CurveError> {
        let r_x: [u8; 32] = bytes[..32].try_into().expect("slice is 32 bytes");
        let s_bytes: [u8; 32] = bytes[32..].try_into().expect("slice is 32 bytes");
        let reduced = Scalar::from_bytes(&s_bytes);
        if reduced.to_bytes() != s_bytes {
            return Err(CurveError::InvalidSignature("s exceeds the group order"));
        }
        Ok(Self { r_x, s: reduced })
    }
}

/// The challenge scalar `e = int(H_challenge(R.x || P.x || m)) mod n`.
pub(crate) fn challenge_scalar(r_x: &[u8; 32], p_x: &[u8; 32], msg: &[u8; 32]) -> Scalar {
    let mut data = Vec::with_capacity(96);
    data.extend_from_slice(r_x);
    data.extend_from_slice(p_x);
    data.extend_from_slice(msg);
    Scalar::from_bytes(&tagged_hash(Tag::Bip340Challenge, &data))
}

fn nonce_scalar(keypair: &KeyPair, msg: &[u8; 32], aux: &[u8; 32]) -> Result<Scalar, CurveError> {
    let aux_digest = tagged_hash(Tag::Bip340Aux, aux);
    let secret = keypair.secret_key().secret_bytes();
    let mut masked = [0u8; 32];
    for (out, (a, b)) in masked.iter_mut().zip(secret.iter().zip(aux_digest.iter())) {
        *out = a ^ b;
    }

    let mut data = Vec::with_capacity(96);
    data.extend_from_slice(&masked);
    data.extend_from_slice(&keypair.public_key().x_only());
    data.extend_from_slice(msg);
    let nonce = Scalar::from_bytes(&tagged_hash(Tag::Bip340Nonce, &data));
    if nonce.is_zero() {
        return Err(CurveError::InvalidScalar("derived nonce is zero"));
    }
    Ok(nonce)
}

/// Signs `msg` with the BIP340 deterministic nonce scheme.
///
/// `aux` is the optional 32-byte auxiliary randomness; `None` uses all
/// zeroes, which keeps the signature deterministic.
///
/// Fails with [`CurveError::NegationRequired`] when the keypair is not
/// parity-normalized; the caller must apply [`KeyPair::normalized`] first.
pub fn sign(keypair: &KeyPair, msg: &[u8; 32], aux: Option<&[u8; 32]>) -> Result<Signature, CurveError> {
    let nonce = nonce_scalar(keypair, msg, aux.unwrap_or(&[0u8; 32]))?;
    sign_with_nonce(keypair, &nonce, msg)
}

/// Signs with a uniformly random nonce drawn from `rng`.
pub fn sign_with_rng(
    keypair: &KeyPair,
    msg: &[u8; 32],
    rng: &mut impl RngCore,
) -> Result<Signature, CurveError> {
    let nonce = Scalar::random(rng);
    sign_with_nonce(keypair, &nonce, msg)
}

/// Signs with a caller-supplied nonce scalar.
///
/// The nonce is negated internally when its point has an odd y-coordinate;
/// the point itself needs no negation since only its x-coordinate is used.
pub fn sign_with_nonce(
    keypair: &KeyPair,
    nonce: &Scalar,
    msg: &[u8; 32],
) -> Result<Signature, CurveError> {
    if !keypair.is_normalized() {
        return Err(CurveError::NegationRequired(
            "signing requires a public key with an even y-coordinate",
        ));
    }
    if nonce.is_zero() {
        return Err(CurveError::InvalidScalar("nonce cannot be zero"));
    }

    let nonce_point = GENERATOR.mul(nonce);
    let k = if nonce_point.has_even_y() {
        nonce.clone()
    } else {
        nonce.negate()
    };

    let r_x = nonce_point
        .x_bytes()
        .expect("non-zero nonce never yields the identity");
    let p_x = keypair.public_key().x_only();
    let e = challenge_scalar(&r_x, &p_x, msg);
    let s = &k + &(&e * keypair.secret_key().scalar());
    Ok(Signature::new(r_x, s))
}

/// Verifies a signature against an x-only public key.
///
/// Accepts iff `s*G == R + e*P` with `R` reconstructed from its
/// x-coordinate assuming an even y. An all-zero signature always fails.
pub fn verify(sig: &Signature, public_key_x: &[u8; 32], msg: &[u8; 32]) -> Result<(), CurveError> {
    if sig.r_x == [0u8; 32] && sig.s.is_zero() {
        return Err(CurveError::InvalidSignature("all-zero signature"));
    }

    let p = PublicKey::from_x_only(public_key_x)?;
    let r = Point::lift_x(&sig.r_x)
        .map_err(|_| CurveError::InvalidSignature("nonce x-coordinate is not on the curve"))?;

    let e = challenge_scalar(&sig.r_x, public_key_x, msg);
    let lhs = GENERATOR.mul(&sig.s);
    let rhs = r.add(&p.point().mul(&e));
    if lhs != rhs {
        return Err(CurveError::InvalidSignature(
            "s*G does not equal R + e*P",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::thread_rng;

    use super::*;
    use crate::keys::PrivateKey;

    fn fixed_keypair(byte: u8) -> KeyPair {
        KeyPair::new(PrivateKey::from_bytes(&[byte; 32]).unwrap())
            .normalized()
            .0
    }

    #[test]
    fn bip340_vector_zero() {
        // Test vector 0 from the BIP340 reference data: secret key 3,
        // all-zero aux and message.
        let mut secret = [0u8; 32];
        secret[31] = 3;
        let keypair = KeyPair::new(PrivateKey::from_bytes(&secret).unwrap());
        assert!(keypair.is_normalized());
        assert_eq!(
            hex::encode(keypair.public_key().x_only()),
            "f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9"
        );

        let sig = sign(&keypair, &[0u8; 32], Some(&[0u8; 32])).unwrap();
        assert_eq!(
            hex::encode(sig.to_bytes()),
            "e907831f80848d1069a5371b402410364bdf1c5f8307b0084c55f1ce2dca8215\
             25f66a4a85ea8b71e482a74f382d2ce5ebeee8fdb2172f477df4900d310536c0"
        );
        verify(&sig, &keypair.public_key().x_only(), &[0u8; 32]).unwrap();
    }

    #[test]
    fn sign_verify_round_trip() {
        let keypair = fixed_keypair(0x17);
        let msg = crate::tagged::sha256(b"message");
        let sig = sign(&keypair, &msg, None).unwrap();
        verify(&sig, &keypair.public_key().x_only(), &msg).unwrap();
    }

    #[test]
    fn random_nonce_signatures_verify() {
        let keypair = KeyPair::generate_bip340(&mut thread_rng());
        let msg = crate::tagged::sha256(b"message");
        let sig = sign_with_rng(&keypair, &msg, &mut thread_rng()).unwrap();
        verify(&sig, &keypair.public_key().x_only(), &msg).unwrap();
    }

    #[test]
    fn bit_flips_break_verification() {
        let keypair = fixed_keypair(0x23);
        let msg = crate::tagged::sha256(b"message");
        let sig = sign(&keypair, &msg, None).unwrap();

        let mut tampered = sig.to_bytes();
        tampered[40] ^= 0x01;
        if let Ok(parsed) = Signature::from_bytes(&tampered) {
            assert!(verify(&parsed, &keypair.public_key().x_only(), &msg).is_err());
        }

        let mut other_msg = msg;
        other_msg[0] ^= 0x80;
        assert!(verify(&sig, &keypair.public_key().x_only(), &other_msg).is_err());
    }

    #[test]
    fn all_zero_signature_fails() {
        let keypair = fixed_keypair(0x31);
        let msg = [0u8; 32];
        let sig = Signature::new([0u8; 32], Scalar::zero());
        assert_eq!(
            verify(&sig, &keypair.public_key().x_only(), &msg),
            Err(CurveError::InvalidSignature("all-zero signature"))
        );
    }

    #[test]
    fn odd_y_keypair_is_rejected() {
        let mut rng = thread_rng();
        let pair = loop {
            let candidate = KeyPair::generate(&mut rng);
            if !candidate.is_normalized() {
                break candidate;
            }
        };
        let msg = [7u8; 32];
        assert!(matches!(
            sign(&pair, &msg, None),
            Err(CurveError::NegationRequired(_))
        ));
    }
}
