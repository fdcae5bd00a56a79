//! # Signature Verification
//!
//! The ledger treats signature verification as an external primitive: given
//! a digest, a signature and a registered key, say yes or no. That boundary
//! is the [`SignatureVerifier`] trait.
//!
//! [`Ed25519Verifier`] is the implementation bundled with Lockbox. It
//! understands keys tagged with `ED25519_KEY_TAG` and answers `false` for
//! every other scheme; hosts that need secp256r1 passkeys plug in their own
//! verifier. Any `Fn(&MessageDigest, &AuthSignature, &AuthPublicKey) -> bool`
//! also works, which keeps test doubles one-liners.
//!
//! We don't distinguish "bad signature" from "unsupported key" from
//! "malformed point". They are all just `false`.

use ed25519_dalek::{Signature as DalekSignature, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};
use tracing::trace;

use super::keys::{AuthPublicKey, AuthSignature, MessageDigest};
use crate::config::RELEASE_DIGEST_DOMAIN;
use crate::identity::Principal;

/// Boolean signature check over a 32-byte digest.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, digest: &MessageDigest, signature: &AuthSignature, key: &AuthPublicKey)
        -> bool;
}

impl<F> SignatureVerifier for F
where
    F: Fn(&MessageDigest, &AuthSignature, &AuthPublicKey) -> bool + Send + Sync,
{
    fn verify(
        &self,
        digest: &MessageDigest,
        signature: &AuthSignature,
        key: &AuthPublicKey,
    ) -> bool {
        self(digest, signature, key)
    }
}

/// Strict Ed25519 verification via `ed25519-dalek`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(
        &self,
        digest: &MessageDigest,
        signature: &AuthSignature,
        key: &AuthPublicKey,
    ) -> bool {
        let Some(raw_key) = key.ed25519_bytes() else {
            trace!(scheme = ?key.scheme(), "key scheme not supported by ed25519 verifier");
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(&raw_key) else {
            trace!("ed25519 key is not a valid curve point");
            return false;
        };
        let sig = DalekSignature::from_bytes(signature.as_bytes());
        verifying_key.verify(digest.as_bytes(), &sig).is_ok()
    }
}

/// Canonical digest a client signs to authorize a passkey release:
///
/// ```text
/// SHA-256( RELEASE_DIGEST_DOMAIN || vault_id (8B BE) || caller (UTF-8) )
/// ```
///
/// The ledger accepts whatever digest the caller presents; binding the
/// signature to a specific vault is the client's choice. This helper is the
/// binding Lockbox's own tooling uses.
pub fn release_digest(vault_id: u64, caller: &Principal) -> MessageDigest {
    let mut hasher = Sha256::new();
    hasher.update(RELEASE_DIGEST_DOMAIN);
    hasher.update(vault_id.to_be_bytes());
    hasher.update(caller.as_bytes());
    MessageDigest::from_bytes(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::AuthKeypair;

    #[test]
    fn valid_signature_verifies() {
        let kp = AuthKeypair::from_seed(&[11u8; 32]);
        let digest = release_digest(1, &Principal::new("alice"));
        let sig = kp.sign(&digest);
        assert!(Ed25519Verifier.verify(&digest, &sig, &kp.public_key()));
    }

    #[test]
    fn wrong_key_fails() {
        let signer = AuthKeypair::from_seed(&[1u8; 32]);
        let other = AuthKeypair::from_seed(&[2u8; 32]);
        let digest = MessageDigest::from_bytes([0x42; 32]);
        let sig = signer.sign(&digest);
        assert!(!Ed25519Verifier.verify(&digest, &sig, &other.public_key()));
    }

    #[test]
    fn wrong_digest_fails() {
        let kp = AuthKeypair::from_seed(&[1u8; 32]);
        let sig = kp.sign(&MessageDigest::from_bytes([1u8; 32]));
        assert!(!Ed25519Verifier.verify(
            &MessageDigest::from_bytes([2u8; 32]),
            &sig,
            &kp.public_key()
        ));
    }

    #[test]
    fn untagged_key_never_verifies() {
        let kp = AuthKeypair::from_seed(&[1u8; 32]);
        let digest = MessageDigest::from_bytes([1u8; 32]);
        let sig = kp.sign(&digest);

        let mut raw = *kp.public_key().as_bytes();
        raw[0] = 0x02;
        assert!(!Ed25519Verifier.verify(&digest, &sig, &AuthPublicKey::from_bytes(raw)));
    }

    #[test]
    fn release_digest_binds_vault_and_caller() {
        let alice = Principal::new("alice");
        let bob = Principal::new("bob");
        assert_eq!(release_digest(1, &alice), release_digest(1, &alice));
        assert_ne!(release_digest(1, &alice), release_digest(2, &alice));
        assert_ne!(release_digest(1, &alice), release_digest(1, &bob));
    }

    #[test]
    fn closures_are_verifiers() {
        let always = |_: &MessageDigest, _: &AuthSignature, _: &AuthPublicKey| true;
        let kp = AuthKeypair::from_seed(&[1u8; 32]);
        assert!(always.verify(
            &MessageDigest::from_bytes([0u8; 32]),
            &AuthSignature::from_bytes([0u8; 64]),
            &kp.public_key()
        ));
    }
}
