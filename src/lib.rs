//! # DID Web with Verifiable History
//!
//! The `did:webvh` method extends `did:web` with a verifiable history: the DID
//! document is not fetched fresh each time but reconstructed by replaying an
//! append-only, hash-chained log of versioned document states. Every log entry
//! is bound to its content and to all prior entries by a content hash, and is
//! authorized by a data integrity proof from a key the previous version
//! declared.
//!
//! This crate implements the log protocol: constructing a new identifier and
//! its genesis entry ([`webvh::CreateBuilder`]), extending the log with
//! authorized updates ([`webvh::UpdateBuilder`], [`webvh::DeactivateBuilder`]),
//! and replaying an arbitrary log to deterministically reconstruct the current
//! or any historical document state ([`webvh::resolve_log`]).
//!
//! Signing, signature verification, and retrieval of logs and witness proofs
//! are supplied by the caller through the [`Signer`], [`Verifier`], and
//! [`LogResolver`] capabilities. An in-memory Ed25519 implementation suitable
//! for testing and ephemeral use is provided by [`EphemeralKeyring`].
//!
//! See: <https://identity.foundation/didwebvh/>

pub mod multikey;
pub mod webvh;

mod core;
mod document;
mod error;
mod keyring;
mod proof;
mod provider;

pub use self::core::{Kind, OneMany};
pub use self::document::{
    Document, DocumentBuilder, DocumentMetadata, KeyPurpose, Service, ServiceBuilder,
    VerificationMethod, VerificationMethodBuilder, BASE_CONTEXT,
};
pub use self::error::{Error, Result};
pub use self::keyring::{Ed25519Verifier, EphemeralKeyring};
pub use self::proof::Proof;
pub use self::provider::{LogResolver, Signer, Verifier};
