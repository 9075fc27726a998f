//! Key material
//!
//! RSA key pair generation and the PEM container used to ship a producer's
//! public key to the collector.

use rsa::pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::error::AuthError;

/// Modulus size of every key pair the protocol uses.
pub const KEY_BITS: usize = 2048;

/// A producer's signing key.
#[derive(Clone)]
pub struct PrivateKey(pub(crate) RsaPrivateKey);

/// A producer's verification key, as bound to its identity by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey(pub(crate) RsaPublicKey);

/// Holds the RSA key pair for a producer
#[derive(Clone)]
pub struct KeyPair {
    pub private_key: PrivateKey,
    pub public_key: PublicKey,
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

impl PublicKey {
    /// Size of the modulus in bytes, which is also the signature length.
    pub fn size(&self) -> usize {
        self.0.size()
    }
}

/// Creates a new RSA key pair of [`KEY_BITS`] bits.
pub fn generate_key_pair() -> Result<KeyPair, AuthError> {
    let mut rng = rand::thread_rng();
    let private = RsaPrivateKey::new(&mut rng, KEY_BITS)
        .map_err(|e| AuthError::KeyGeneration(e.to_string()))?;
    let public = RsaPublicKey::from(&private);

    Ok(KeyPair {
        private_key: PrivateKey(private),
        public_key: PublicKey(public),
    })
}

/// Serializes a public key to a PEM `PUBLIC KEY` (SPKI) block.
pub fn encode_public_key(key: &PublicKey) -> Result<Vec<u8>, AuthError> {
    key.0
        .to_public_key_pem(LineEnding::LF)
        .map(String::into_bytes)
        .map_err(|e| AuthError::InvalidKey(e.to_string()))
}

/// Parses a PEM `PUBLIC KEY` block back into a public key.
///
/// Anything that is not UTF-8 PEM wrapping an RSA SPKI structure is rejected,
/// as is any key other than [`KEY_BITS`] bits: its signatures would not fit
/// the fixed signature frame.
pub fn decode_public_key(bytes: &[u8]) -> Result<PublicKey, AuthError> {
    let pem = std::str::from_utf8(bytes)
        .map_err(|_| AuthError::MalformedKey("key is not valid UTF-8".into()))?;

    if pem.trim().is_empty() {
        return Err(AuthError::MalformedKey("empty key".into()));
    }

    let key = RsaPublicKey::from_public_key_pem(pem.trim())
        .map_err(|e| AuthError::MalformedKey(e.to_string()))?;

    if key.size() * 8 != KEY_BITS {
        return Err(AuthError::MalformedKey(format!(
            "expected a {}-bit key, got {} bits",
            KEY_BITS,
            key.size() * 8
        )));
    }
    Ok(PublicKey(key))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::LazyLock;

    /// Key pairs shared across the crate's unit tests.
    pub(crate) static TEST_KEYS: LazyLock<[KeyPair; 2]> = LazyLock::new(|| {
        [
            generate_key_pair().expect("key generation"),
            generate_key_pair().expect("key generation"),
        ]
    });

    #[test]
    fn generated_key_has_protocol_strength() {
        let keys = &TEST_KEYS[0];
        assert_eq!(keys.public_key.size() * 8, KEY_BITS);
        assert_eq!(RsaPublicKey::from(&keys.private_key.0), keys.public_key.0);
    }

    #[test]
    fn public_key_survives_pem_encoding() {
        let keys = &TEST_KEYS[0];
        let pem = encode_public_key(&keys.public_key).unwrap();
        assert!(pem.starts_with(b"-----BEGIN PUBLIC KEY-----"));

        let parsed = decode_public_key(&pem).unwrap();
        assert_eq!(parsed, keys.public_key);
    }

    #[test]
    fn decoding_garbage_fails() {
        assert!(matches!(
            decode_public_key(b""),
            Err(AuthError::MalformedKey(_))
        ));
        assert!(matches!(
            decode_public_key(b"invalid"),
            Err(AuthError::MalformedKey(_))
        ));
        assert!(matches!(
            decode_public_key(&[0xff, 0xfe, 0x00, 0x80]),
            Err(AuthError::MalformedKey(_))
        ));
    }

    #[test]
    fn decoding_truncated_pem_fails() {
        let pem = encode_public_key(&TEST_KEYS[0].public_key).unwrap();
        let truncated = &pem[..pem.len() / 2];
        assert!(decode_public_key(truncated).is_err());
    }

    #[test]
    fn decoding_private_key_pem_fails() {
        use rsa::pkcs8::EncodePrivateKey;

        let pem = TEST_KEYS[0]
            .private_key
            .0
            .to_pkcs8_pem(LineEnding::LF)
            .unwrap();
        assert!(decode_public_key(pem.as_bytes()).is_err());
    }

    #[test]
    fn decoding_key_of_wrong_size_fails() {
        let weak = RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
        let pem = RsaPublicKey::from(&weak)
            .to_public_key_pem(LineEnding::LF)
            .unwrap();

        assert!(matches!(
            decode_public_key(pem.as_bytes()),
            Err(AuthError::MalformedKey(msg)) if msg.contains("1024")
        ));
    }
}
