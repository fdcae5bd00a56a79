//! Cryptographic primitives at the ledger boundary: fixed-size key and
//! digest types, the signature verifier seam, and the release digest.

pub mod keys;
pub mod signatures;

pub use keys::{
    AuthKeypair, AuthPublicKey, AuthSignature, CodeHash, KeyError, KeyScheme, MessageDigest,
};
pub use signatures::{release_digest, Ed25519Verifier, SignatureVerifier};
