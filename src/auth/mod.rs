//! Signature service
//!
//! Handles key generation, public key encoding, and value signing/verification.

pub mod keys;
pub mod signing;

pub use keys::{KeyPair, PrivateKey, PublicKey, decode_public_key, encode_public_key, generate_key_pair};
pub use signing::{SIGNATURE_LEN, Signature, sign, verify};
