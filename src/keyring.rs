//! # Ephemeral Keyring
//!
//! [`Signer`] and [`Verifier`] implementations for Ed25519 keys that are
//! generated and used in-memory and disappear when dropped.
//!
//! The keyring holds the current signing key and pre-generates the next one
//! so a key rotation can be committed to in advance (pre-rotation) before the
//! new key is ever used.

use anyhow::{anyhow, Result};
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand::rngs::OsRng;

use crate::provider::{Signer, Verifier};
use crate::{multikey, webvh};

/// In-memory Ed25519 signing keys with support for pre-rotation.
#[derive(Clone)]
pub struct EphemeralKeyring {
    signing_key: SigningKey,
    next_signing_key: SigningKey,
}

impl EphemeralKeyring {
    /// Generate a keyring with a fresh signing key and next key.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
            next_signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// The current public key in Multikey format.
    #[must_use]
    pub fn multikey(&self) -> String {
        multikey::encode(self.signing_key.verifying_key().as_bytes())
    }

    /// The next public key in Multikey format.
    ///
    /// Commit to this key by including its hash in a log entry's next key
    /// hashes, then call [`Self::rotate`] to make it current.
    #[must_use]
    pub fn next_multikey(&self) -> String {
        multikey::encode(self.next_signing_key.verifying_key().as_bytes())
    }

    /// The pre-rotation commitment for the next key.
    #[must_use]
    pub fn next_key_hash(&self) -> String {
        webvh::next_key_hash(&self.next_multikey())
    }

    /// Rotate: the next key becomes current and a fresh next key is
    /// generated. The original keyring is left usable for signing the entry
    /// that announces the rotation.
    #[must_use]
    pub fn rotate(&self) -> Self {
        Self {
            signing_key: self.next_signing_key.clone(),
            next_signing_key: SigningKey::generate(&mut OsRng),
        }
    }
}

impl Signer for EphemeralKeyring {
    async fn try_sign(&self, msg: &[u8]) -> Result<Vec<u8>> {
        Ok(self.signing_key.sign(msg).to_bytes().to_vec())
    }

    async fn verification_method(&self) -> Result<String> {
        Ok(multikey::did_key(&self.multikey()))
    }
}

/// Stock Ed25519 signature verifier.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ed25519Verifier;

impl Verifier for Ed25519Verifier {
    fn verify(&self, signature: &[u8], message: &[u8], public_key: &[u8]) -> Result<bool> {
        let key_bytes: &[u8; 32] =
            public_key.try_into().map_err(|_| anyhow!("invalid public key length"))?;
        let verifying_key = VerifyingKey::from_bytes(key_bytes)
            .map_err(|e| anyhow!("invalid public key: {e}"))?;
        let signature =
            Signature::from_slice(signature).map_err(|e| anyhow!("invalid signature: {e}"))?;
        Ok(verifying_key.verify(message, &signature).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_then_verify() {
        let keyring = EphemeralKeyring::generate();
        let msg = b"hello world";
        let signature = keyring.try_sign(msg).await.expect("should sign");

        let key = multikey::decode(&keyring.multikey()).expect("should decode");
        let verified = Ed25519Verifier.verify(&signature, msg, &key).expect("should verify");
        assert!(verified);

        let tampered = Ed25519Verifier.verify(&signature, b"bye world", &key).expect("well-formed");
        assert!(!tampered);
    }

    #[test]
    fn rotation_promotes_next_key() {
        let keyring = EphemeralKeyring::generate();
        let next = keyring.next_multikey();
        let rotated = keyring.rotate();
        assert_eq!(rotated.multikey(), next);
        assert_ne!(rotated.next_multikey(), next);
        assert_eq!(keyring.next_key_hash(), webvh::next_key_hash(&rotated.multikey()));
    }
}
