//! # Key Material
//!
//! Fixed-size byte types that cross the ledger boundary:
//!
//! | Type              | Size | Purpose                                       |
//! |-------------------|------|-----------------------------------------------|
//! | [`AuthPublicKey`] | 33 B | registered alternate-auth key                 |
//! | [`AuthSignature`] | 64 B | signature presented for a passkey release     |
//! | [`MessageDigest`] | 32 B | caller-supplied digest the signature covers   |
//! | [`CodeHash`]      | 32 B | expected code identity of a trusted contract  |
//!
//! A 33-byte auth key is `scheme byte || 32 bytes`. The scheme byte is either
//! a SEC1 compressed-point parity prefix (`0x02` / `0x03`) or
//! [`ED25519_KEY_TAG`] for an Ed25519 key. The registry never validates more
//! than the length; whether the bytes are a usable key is the verifier's call.
//!
//! [`AuthKeypair`] is the signing side for the Ed25519 scheme. It exists for
//! clients and tests; the ledger itself never holds a private key.

use std::fmt;

use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{
    AUTH_KEY_LENGTH, CODE_HASH_LENGTH, ED25519_KEY_TAG, MESSAGE_DIGEST_LENGTH, SIGNATURE_LENGTH,
};

/// Errors from parsing key material.
#[derive(Debug, Error, PartialEq)]
pub enum KeyError {
    #[error("invalid length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], KeyError> {
    let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))?;
    fixed_from_slice(&bytes)
}

fn fixed_from_slice<const N: usize>(slice: &[u8]) -> Result<[u8; N], KeyError> {
    slice.try_into().map_err(|_| KeyError::InvalidLength {
        expected: N,
        got: slice.len(),
    })
}

// ---------------------------------------------------------------------------
// AuthPublicKey
// ---------------------------------------------------------------------------

/// How the 32 bytes after the scheme byte should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScheme {
    /// Ed25519 verifying key, tagged with [`ED25519_KEY_TAG`].
    Ed25519,
    /// SEC1 compressed elliptic-curve point (parity byte `0x02` or `0x03`).
    CompressedPoint,
    /// Anything else. Storable, never verifiable by the bundled verifier.
    Unknown(u8),
}

/// A registered alternate-auth public key. Always exactly 33 bytes.
///
/// Serialized as a byte sequence; deserialization re-checks the length so a
/// corrupted store can't smuggle in a short key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct AuthPublicKey {
    bytes: [u8; AUTH_KEY_LENGTH],
}

impl AuthPublicKey {
    pub fn from_bytes(bytes: [u8; AUTH_KEY_LENGTH]) -> Self {
        Self { bytes }
    }

    /// Length-checked construction from a slice. No curve validation.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        Ok(Self {
            bytes: fixed_from_slice(slice)?,
        })
    }

    /// Tag a raw Ed25519 verifying key into the 33-byte layout.
    pub fn from_ed25519(key: [u8; 32]) -> Self {
        let mut bytes = [0u8; AUTH_KEY_LENGTH];
        bytes[0] = ED25519_KEY_TAG;
        bytes[1..].copy_from_slice(&key);
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; AUTH_KEY_LENGTH] {
        &self.bytes
    }

    pub fn scheme(&self) -> KeyScheme {
        match self.bytes[0] {
            ED25519_KEY_TAG => KeyScheme::Ed25519,
            0x02 | 0x03 => KeyScheme::CompressedPoint,
            other => KeyScheme::Unknown(other),
        }
    }

    /// The raw Ed25519 key, if this key carries the Ed25519 tag.
    pub fn ed25519_bytes(&self) -> Option<[u8; 32]> {
        if self.scheme() != KeyScheme::Ed25519 {
            return None;
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&self.bytes[1..]);
        Some(key)
    }

    /// Hex-encoded representation. 66 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Parse a hex string (an optional `0x` prefix is accepted).
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        Ok(Self {
            bytes: decode_fixed(s)?,
        })
    }
}

impl TryFrom<Vec<u8>> for AuthPublicKey {
    type Error = KeyError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Self::try_from_slice(&value)
    }
}

impl From<AuthPublicKey> for Vec<u8> {
    fn from(key: AuthPublicKey) -> Self {
        key.bytes.to_vec()
    }
}

impl fmt::Display for AuthPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for AuthPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthPublicKey({})", &self.to_hex()[..18])
    }
}

// ---------------------------------------------------------------------------
// AuthSignature
// ---------------------------------------------------------------------------

/// A 64-byte signature over a [`MessageDigest`].
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct AuthSignature {
    bytes: [u8; SIGNATURE_LENGTH],
}

impl AuthSignature {
    pub fn from_bytes(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self { bytes }
    }

    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        Ok(Self {
            bytes: fixed_from_slice(slice)?,
        })
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        Ok(Self {
            bytes: decode_fixed(s)?,
        })
    }
}

impl TryFrom<Vec<u8>> for AuthSignature {
    type Error = KeyError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Self::try_from_slice(&value)
    }
}

impl From<AuthSignature> for Vec<u8> {
    fn from(sig: AuthSignature) -> Self {
        sig.bytes.to_vec()
    }
}

impl fmt::Display for AuthSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for AuthSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        write!(f, "AuthSignature({}...{})", &hex_str[..8], &hex_str[120..])
    }
}

// ---------------------------------------------------------------------------
// 32-byte digests
// ---------------------------------------------------------------------------

/// The digest a passkey signature is computed over. Supplied by the caller;
/// see [`super::signatures::release_digest`] for the canonical construction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageDigest([u8; MESSAGE_DIGEST_LENGTH]);

impl MessageDigest {
    pub fn from_bytes(bytes: [u8; MESSAGE_DIGEST_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; MESSAGE_DIGEST_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        Ok(Self(decode_fixed(s)?))
    }
}

impl fmt::Debug for MessageDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageDigest({})", self.to_hex())
    }
}

/// Expected code identity of an allow-listed callback contract.
///
/// The ledger stores what the administrator asserts. Nothing recomputes it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodeHash([u8; CODE_HASH_LENGTH]);

impl CodeHash {
    pub fn from_bytes(bytes: [u8; CODE_HASH_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; CODE_HASH_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        Ok(Self(decode_fixed(s)?))
    }
}

impl fmt::Display for CodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CodeHash({})", self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// AuthKeypair
// ---------------------------------------------------------------------------

/// Ed25519 signing key for the alternate-auth path.
///
/// Not `Serialize`. Export the secret with
/// [`secret_key_bytes`](Self::secret_key_bytes) when you mean to.
pub struct AuthKeypair {
    signing_key: SigningKey,
}

impl AuthKeypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Deterministic keypair from a 32-byte seed. Handy in tests.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let seed: [u8; 32] = decode_fixed(s)?;
        Ok(Self::from_seed(&seed))
    }

    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// The tagged 33-byte public key to register with the ledger.
    pub fn public_key(&self) -> AuthPublicKey {
        AuthPublicKey::from_ed25519(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a digest. Ed25519 is deterministic, so the same digest always
    /// yields the same signature.
    pub fn sign(&self, digest: &MessageDigest) -> AuthSignature {
        AuthSignature::from_bytes(self.signing_key.sign(digest.as_bytes()).to_bytes())
    }
}

impl Clone for AuthKeypair {
    fn clone(&self) -> Self {
        Self::from_seed(&self.secret_key_bytes())
    }
}

impl fmt::Debug for AuthKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthKeypair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}
