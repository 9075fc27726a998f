//! Value signatures
//!
//! Producers sign the big-endian 4-byte encoding of each value with
//! RSASSA-PKCS1-v1_5 over SHA-256. Only the value is covered, never any
//! framing around it.

use rsa::Pkcs1v15Sign;
use sha2::{Digest, Sha256};

use super::keys::{PrivateKey, PublicKey};
use crate::error::AuthError;

/// Signature length for a 2048-bit modulus.
pub const SIGNATURE_LEN: usize = 256;

/// A fixed-size PKCS#1 v1.5 signature.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature([u8; SIGNATURE_LEN]);

impl Signature {
    /// Wraps raw signature bytes, rejecting any length other than [`SIGNATURE_LEN`].
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AuthError> {
        let array: [u8; SIGNATURE_LEN] =
            bytes
                .try_into()
                .map_err(|_| AuthError::MalformedSignature {
                    expected: SIGNATURE_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }
}

impl From<[u8; SIGNATURE_LEN]> for Signature {
    fn from(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

fn digest(value: i32) -> [u8; 32] {
    Sha256::digest(value.to_be_bytes()).into()
}

/// Signs the value with the producer's private key.
pub fn sign(value: i32, key: &PrivateKey) -> Result<Signature, AuthError> {
    let raw = key
        .0
        .sign(Pkcs1v15Sign::new::<Sha256>(), &digest(value))
        .map_err(|e| AuthError::InvalidKey(e.to_string()))?;

    Signature::from_slice(&raw).map_err(|e| AuthError::InvalidKey(e.to_string()))
}

/// Checks a signature against a value and public key.
///
/// Every failure mode, including a signature that is not valid for this
/// key size, reports `false`.
pub fn verify(value: i32, signature: &Signature, key: &PublicKey) -> bool {
    key.0
        .verify(
            Pkcs1v15Sign::new::<Sha256>(),
            &digest(value),
            signature.as_bytes(),
        )
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::keys::tests::TEST_KEYS;

    #[test]
    fn signature_verifies_for_signed_value() {
        let keys = &TEST_KEYS[0];
        let sig = sign(42, &keys.private_key).unwrap();
        assert!(verify(42, &sig, &keys.public_key));
    }

    #[test]
    fn signature_is_bound_to_value() {
        let keys = &TEST_KEYS[0];
        let sig = sign(5, &keys.private_key).unwrap();
        assert!(!verify(4, &sig, &keys.public_key));
        assert!(!verify(-5, &sig, &keys.public_key));
        assert!(!verify(i32::MAX, &sig, &keys.public_key));
    }

    #[test]
    fn signature_is_bound_to_key() {
        let sig = sign(7, &TEST_KEYS[0].private_key).unwrap();
        assert!(!verify(7, &sig, &TEST_KEYS[1].public_key));
    }

    #[test]
    fn signing_is_deterministic() {
        let keys = &TEST_KEYS[1];
        assert_eq!(
            sign(11, &keys.private_key).unwrap(),
            sign(11, &keys.private_key).unwrap()
        );
    }

    #[test]
    fn garbage_signature_does_not_verify() {
        let sig = Signature::from([0xff; SIGNATURE_LEN]);
        assert!(!verify(42, &sig, &TEST_KEYS[0].public_key));

        let zeros = Signature::from([0u8; SIGNATURE_LEN]);
        assert!(!verify(42, &zeros, &TEST_KEYS[0].public_key));
    }

    #[test]
    fn wrong_length_signature_is_rejected() {
        match Signature::from_slice(&[1u8; 255]) {
            Err(AuthError::MalformedSignature { expected, actual }) => {
                assert_eq!(expected, SIGNATURE_LEN);
                assert_eq!(actual, 255);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(Signature::from_slice(&[]).is_err());
        assert!(Signature::from_slice(&[0u8; 512]).is_err());
    }
}
