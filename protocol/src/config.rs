//! # Protocol Configuration & Constants
//!
//! Every policy number in Lockbox lives here. The vault ledger reads its
//! defaults from these constants; hosts that need different values override
//! them through `LedgerConfig` in the contracts crate, never by hardcoding
//! a literal somewhere else.

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The full version string of the ledger state machine.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Domain separator mixed into every release digest so that a signature
/// produced for Lockbox can never be replayed against another protocol.
pub const RELEASE_DIGEST_DOMAIN: &[u8] = b"lockbox:release:v1";

// ---------------------------------------------------------------------------
// Vault Timing
// ---------------------------------------------------------------------------

/// Shortest lock a vault may be created with: one day, in seconds.
pub const MIN_LOCK_DURATION_SECS: u64 = 86_400;

/// How long after `unlock_time` the owner keeps exclusive release rights
/// before a designated beneficiary may claim. Thirty days, in seconds.
pub const BENEFICIARY_GRACE_PERIOD_SECS: u64 = 2_592_000;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum number of vault ids accepted by a single batch release.
pub const MAX_BATCH_SIZE: usize = 10;

/// Maximum vault metadata length, counted in characters (not bytes).
pub const MAX_METADATA_LENGTH: usize = 100;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Registered alternate-auth public keys are 33 bytes: one scheme/parity
/// byte followed by 32 bytes of key material.
pub const AUTH_KEY_LENGTH: usize = 33;

/// Message digests handed to the signature verifier are 32 bytes.
pub const MESSAGE_DIGEST_LENGTH: usize = 32;

/// Alternate-auth signatures are 64 bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// Expected code hashes of trusted callback contracts are 32 bytes.
pub const CODE_HASH_LENGTH: usize = 32;

/// Leading byte of a 33-byte auth key that carries an Ed25519 key.
///
/// SEC1 compressed points start with `0x02` or `0x03`, so `0xED` can never
/// collide with a compressed secp256r1/secp256k1 key.
pub const ED25519_KEY_TAG: u8 = 0xED;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grace_period_is_thirty_days() {
        assert_eq!(BENEFICIARY_GRACE_PERIOD_SECS, 30 * MIN_LOCK_DURATION_SECS);
    }

    #[test]
    fn test_crypto_parameter_sizes() {
        assert_eq!(AUTH_KEY_LENGTH, 33);
        assert_eq!(MESSAGE_DIGEST_LENGTH, 32);
        assert_eq!(SIGNATURE_LENGTH, 64);
        assert_eq!(CODE_HASH_LENGTH, 32);
    }

    #[test]
    fn test_key_tag_is_not_a_sec1_prefix() {
        assert_ne!(ED25519_KEY_TAG, 0x02);
        assert_ne!(ED25519_KEY_TAG, 0x03);
        assert_ne!(ED25519_KEY_TAG, 0x04);
    }
}
