//! Deactivate (revoke) operation for the `did:webvh` method.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::resolve::{resolve_log, ResolvedMetadata};
use super::{split_version_id, DidLog, LogEntry, Parameters, WitnessEntry};
use crate::document::Document;
use crate::provider::{Signer, Verifier};
use crate::{Error, Result};

/// Builder for deactivating a DID document and associated log entry.
///
/// Use this to construct a [`DeactivateResult`].
pub struct DeactivateBuilder<S> {
    log: DidLog,
    meta: ResolvedMetadata,
    signer: S,
}

/// Builder does not have a signer (can't build).
pub struct NoSigner;

/// Builder has a signer (can build).
pub struct WithSigner<'a, S: Signer>(pub &'a S);

impl DeactivateBuilder<NoSigner> {
    /// Create a new `DeactivateBuilder` populated with the current log
    /// entries.
    ///
    /// The log is first resolved so every existing entry is re-verified.
    /// (To skip witness verification, pass `None` for `witness_proofs`.)
    ///
    /// # Errors
    ///
    /// Returns an error if the log does not verify.
    pub fn from(
        log: &[LogEntry], witness_proofs: Option<&[WitnessEntry]>, verifier: &impl Verifier,
    ) -> Result<Self> {
        let resolved = resolve_log(log, witness_proofs, None, verifier)?;
        Ok(Self {
            log: log.to_vec(),
            meta: resolved.metadata,
            signer: NoSigner,
        })
    }

    /// Provide a signer to sign the log entry.
    ///
    /// The signer must hold a key from the current update keys: the
    /// deactivating entry is authorized by the previous version, like any
    /// other entry.
    #[must_use]
    pub fn signer<S: Signer>(self, signer: &S) -> DeactivateBuilder<WithSigner<'_, S>> {
        DeactivateBuilder {
            log: self.log,
            meta: self.meta,
            signer: WithSigner(signer),
        }
    }
}

impl<S: Signer> DeactivateBuilder<WithSigner<'_, S>> {
    /// Build the deactivating log entry.
    ///
    /// The new entry empties the update keys, explicitly clears any
    /// outstanding pre-rotation commitments, sets `deactivated`, and carries
    /// a document stripped of all verification material. With the update keys
    /// emptied no subsequent entry can be authorized, so the log is closed.
    /// Any witness parameter remains in force: a witnessed deactivation still
    /// requires witness approval of the new tip.
    ///
    /// # Errors
    ///
    /// Will fail if the entry cannot be hashed, if the signer fails, or if
    /// the extended log does not verify.
    pub async fn build(&self, verifier: &impl Verifier) -> Result<DeactivateResult> {
        let Some(last_entry) = self.log.last() else {
            return Err(Error::NotFound);
        };

        let mut document = last_entry.state.clone();
        document.strip_verification_material();

        let parameters = Parameters {
            method: None,
            scid: None,
            update_keys: Some(vec![]),
            next_key_hashes: if self.meta.prerotation { Some(vec![]) } else { None },
            portable: None,
            witness: None,
            deactivated: Some(true),
            ttl: None,
        };

        let (version_number, _) = split_version_id(&self.meta.version_id)?;
        let mut entry = LogEntry {
            version_id: self.meta.version_id.clone(),
            version_time: Utc::now(),
            parameters,
            state: document,
            proof: vec![],
        };
        let entry_hash = entry.hash()?;
        entry.version_id = format!("{}-{entry_hash}", version_number + 1);
        entry.sign(self.signer.0).await?;

        let mut log = self.log.clone();
        log.push(entry);

        // verify our own output before returning it
        let resolved = resolve_log(&log, None, None, verifier)?;
        let Some(last_entry) = log.last() else {
            return Err(Error::NotFound);
        };

        Ok(DeactivateResult {
            did: resolved.did,
            document: last_entry.state.clone(),
            metadata: resolved.metadata,
            log,
        })
    }
}

/// Output of a `deactivate` operation.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct DeactivateResult {
    /// The `did:webvh` DID.
    pub did: String,

    /// The `did:webvh` document, stripped of verification material.
    pub document: Document,

    /// Resolution metadata for the deactivated version.
    pub metadata: ResolvedMetadata,

    /// Version history log consisting of the original log appended with the
    /// entry describing the deactivate operation.
    pub log: DidLog,
}
