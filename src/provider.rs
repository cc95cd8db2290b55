//! # Capability Traits
//!
//! The log protocol consumes signing, signature verification, and retrieval
//! of logs and witness proofs through the traits defined here. The core never
//! implements these capabilities itself: callers supply them, which keeps key
//! material, cryptographic primitives, and I/O outside the verification
//! logic.

use std::future::Future;

use anyhow::Result;

use crate::webvh::{DidLog, WitnessEntry};

/// A signing capability used to author data integrity proofs.
///
/// Supplied by the caller when creating or extending a log. Implementers
/// typically wrap a key store or HSM; an in-memory implementation is provided
/// by [`crate::EphemeralKeyring`].
pub trait Signer: Send + Sync {
    /// Sign the message bytes and return the raw signature.
    ///
    /// Async and fallible because the implementer may need to access a remote
    /// key service.
    fn try_sign(&self, msg: &[u8]) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// The verification method a verifier should use to verify the signer's
    /// signature. A `did:key` URL identifying the signing key.
    fn verification_method(&self) -> impl Future<Output = Result<String>> + Send;
}

/// A signature verification capability.
///
/// Supplied by the caller when resolving a log. Verification is synchronous
/// and CPU-bound: the verifier is handed raw bytes and a public key and has
/// no reason to perform I/O. [`crate::Ed25519Verifier`] is the stock
/// implementation.
pub trait Verifier: Send + Sync {
    /// Verify the signature over the message against the public key.
    ///
    /// Returns `Ok(true)` when the signature is valid, `Ok(false)` when it is
    /// not, and an error only when the inputs are malformed (wrong key or
    /// signature length).
    ///
    /// # Errors
    ///
    /// Returns an error if the signature or public key cannot be parsed.
    fn verify(&self, signature: &[u8], message: &[u8], public_key: &[u8]) -> Result<bool>;
}

/// Retrieval of DID logs and witness proof files.
///
/// Implementers need only return the log for the specified DID. This may be
/// by reading a local `did.jsonl` file, fetching over HTTP, or looking up a
/// cache - the fetch mechanism is of no concern to the verification logic.
pub trait LogResolver: Send + Sync {
    /// Fetch the log for the given DID. `None` means not found.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval fails for a reason other than the log
    /// not existing.
    fn resolve_log(&self, did: &str) -> impl Future<Output = Result<Option<DidLog>>> + Send;

    /// Fetch the witness proofs published alongside the log, e.g. from a
    /// `did-witness.json` file. An empty result means no proofs are
    /// available.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval fails.
    fn resolve_witness_proofs(
        &self, did: &str,
    ) -> impl Future<Output = Result<Vec<WitnessEntry>>> + Send;
}
