//! Update operation for the `did:webvh` method.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::resolve::{resolve_log, ResolvedMetadata};
use super::verify::{keys_match_commitments, next_key_hash, validate_witness};
use super::url::split_did;
use super::{split_version_id, DidLog, LogEntry, Parameters, Witness, WitnessEntry};
use crate::document::Document;
use crate::provider::{Signer, Verifier};
use crate::{Error, Result};

/// Builder to update a DID document and associated log entry.
///
/// Use this to construct an [`UpdateResult`].
#[derive(Debug)]
pub struct UpdateBuilder<D, S> {
    log: DidLog,
    meta: ResolvedMetadata,

    update_keys: Option<Vec<String>>,
    next_key_hashes: Option<Vec<String>>,
    portable: Option<bool>,
    witness: Option<Witness>,
    clear_witness: bool,
    ttl: Option<u64>,

    doc: D,
    signer: S,
}

/// Builder does not have a document (can't build).
#[derive(Debug)]
pub struct NoDocument;

/// Builder has a document (can build).
#[derive(Debug)]
pub struct WithDocument(Document);

/// Builder does not have a signer (can't build).
#[derive(Debug)]
pub struct NoSigner;

/// Builder has a signer (can build).
#[derive(Debug)]
pub struct WithSigner<'a, S: Signer>(pub &'a S);

impl UpdateBuilder<NoDocument, NoSigner> {
    /// Create a new `UpdateBuilder` populated with the current log entries.
    ///
    /// The log is first resolved so every existing entry is re-verified,
    /// including the witness proofs if provided. (To skip witness
    /// verification, pass `None` for `witness_proofs`.)
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

            update_keys: None,
            next_key_hashes: None,
            portable: None,
            witness: None,
            clear_witness: false,
            ttl: None,

            doc: NoDocument,
            signer: NoSigner,
        })
    }

    /// Add the new DID document to the builder.
    ///
    /// # Errors
    ///
    /// Checks the SCID hasn't changed and the document location hasn't
    /// changed unless the current parameters allow portability.
    pub fn document(self, document: &Document) -> Result<UpdateBuilder<WithDocument, NoSigner>> {
        let (scid, host) = split_did(&document.id)?;
        if scid != self.meta.scid {
            return Err(Error::ScidMismatch {
                scid: self.meta.scid.clone(),
                derived: scid,
            });
        }
        let Some(last_entry) = self.log.last() else {
            return Err(Error::NotFound);
        };
        let (_, current_host) = split_did(&last_entry.state.id)?;
        if host != current_host && !self.meta.portable {
            return Err(Error::PortabilityViolation {
                previous: current_host,
                requested: host,
            });
        }
        Ok(UpdateBuilder {
            log: self.log,
            meta: self.meta,

            update_keys: self.update_keys,
            next_key_hashes: self.next_key_hashes,
            portable: self.portable,
            witness: self.witness,
            clear_witness: self.clear_witness,
            ttl: self.ttl,

            doc: WithDocument(document.clone()),
            signer: NoSigner,
        })
    }
}

impl UpdateBuilder<WithDocument, NoSigner> {
    /// Rotate the update keys.
    ///
    /// If pre-rotation is active, the new update keys provided, when hashed,
    /// must match the current next key hashes.
    ///
    /// The `new_update_keys` parameter is a list of multibase-encoded public
    /// keys whose private key counterparts are authorized to sign subsequent
    /// DID log entries.
    ///
    /// The `new_next_keys` parameter is a list of multibase-encoded public
    /// keys whose private key counterparts will be authorized to sign update
    /// operations on the following key rotation (this function will calculate
    /// their hashes). Pass an empty list to explicitly disable pre-rotation
    /// for future updates.
    ///
    /// # Note
    /// The new update keys must not be used to sign the new log entry. Only
    /// the current update keys should be used to sign the new log entry.
    ///
    /// # Errors
    ///
    /// If pre-rotation is active and a hashed new update key does not match
    /// any of the current next key hashes an error is returned.
    pub fn rotate_keys(
        mut self, new_update_keys: Vec<String>, new_next_keys: &[String],
    ) -> Result<Self> {
        if self.meta.prerotation {
            keys_match_commitments(&new_update_keys, &self.meta.next_key_hashes)?;
        }
        self.update_keys = Some(new_update_keys);
        self.next_key_hashes =
            Some(new_next_keys.iter().map(|key| next_key_hash(key)).collect());
        Ok(self)
    }

    /// Set the DID to be portable or not. (Will inherit the current setting
    /// unless overridden here.)
    #[must_use]
    pub const fn portable(mut self, portable: bool) -> Self {
        self.portable = Some(portable);
        self
    }

    /// Add a set of witnesses expected to provide proofs for this and
    /// subsequent versions.
    ///
    /// If this function is not called, the witness information from the
    /// current parameters continues to apply. To remove witnesses, call
    /// [`Self::remove_witness`].
    ///
    /// # Errors
    ///
    /// Will fail if the witness threshold is zero, the witness list is empty,
    /// the contribution (weight) of a witness is zero, or the sum of
    /// contributions would never reach the threshold.
    pub fn witness(mut self, witness: &Witness) -> Result<Self> {
        validate_witness(witness)?;
        self.witness = Some(witness.clone());
        self.clear_witness = false;
        Ok(self)
    }

    /// Remove witnesses from this version onwards.
    #[must_use]
    pub const fn remove_witness(mut self) -> Self {
        self.clear_witness = true;
        self
    }

    /// Set the permissible cache time in seconds for the DID. Will stay the
    /// same as the current parameters if not overridden here.
    #[must_use]
    pub const fn ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Add a signer to the builder.
    #[must_use]
    pub fn signer<S: Signer>(self, signer: &S) -> UpdateBuilder<WithDocument, WithSigner<'_, S>> {
        UpdateBuilder {
            log: self.log,
            meta: self.meta,

            update_keys: self.update_keys,
            next_key_hashes: self.next_key_hashes,
            portable: self.portable,
            witness: self.witness,
            clear_witness: self.clear_witness,
            ttl: self.ttl,

            doc: self.doc,
            signer: WithSigner(signer),
        }
    }
}

impl<S: Signer> UpdateBuilder<WithDocument, WithSigner<'_, S>> {
    /// Build the new log entry.
    ///
    /// The new entry carries only the parameters changed through this builder
    /// (a sparse patch); unspecified parameters persist from the last version
    /// that set them. The entry is appended to a cloned copy of the log - the
    /// input log is never mutated - and the extended log is verified before
    /// being returned.
    ///
    /// # Errors
    ///
    /// Will fail if pre-rotation is active and no new next key hashes were
    /// supplied, if the entry cannot be hashed, if the signer fails, or if
    /// the extended log does not verify.
    pub async fn build(&self, verifier: &impl Verifier) -> Result<UpdateResult> {
        // while pre-rotation is active every new version must recommit (or
        // explicitly clear) the next key hashes
        if self.meta.prerotation && self.next_key_hashes.is_none() {
            return Err(Error::MissingNextKeyHashes);
        }

        let parameters = Parameters {
            method: None,
            scid: None,
            update_keys: self.update_keys.clone(),
            next_key_hashes: self.next_key_hashes.clone(),
            portable: self.portable,
            witness: if self.clear_witness {
                Some(Witness::default())
            } else {
                self.witness.clone()
            },
            deactivated: None,
            ttl: self.ttl,
        };

        let document = self.doc.0.clone();
        let version_time = document
            .did_document_metadata
            .as_ref()
            .map_or_else(Utc::now, |m| m.updated.unwrap_or_else(Utc::now));

        // the entry hash is computed with the version id set to the previous
        // version id, chaining the new entry to the log
        let (version_number, _) = split_version_id(&self.meta.version_id)?;
        let mut entry = LogEntry {
            version_id: self.meta.version_id.clone(),
            version_time,
            parameters,
            state: document,
            proof: vec![],
        };
        let entry_hash = entry.hash()?;
        entry.version_id = format!("{}-{entry_hash}", version_number + 1);
        entry.sign(self.signer.0).await?;

        // append to a cloned copy: the caller retains the prior log unmodified
        let mut log = self.log.clone();
        log.push(entry);

        // verify our own output before returning it
        let resolved = resolve_log(&log, None, None, verifier)?;
        let Some(last_entry) = log.last() else {
            return Err(Error::NotFound);
        };

        Ok(UpdateResult {
            did: resolved.did,
            document: last_entry.state.clone(),
            metadata: resolved.metadata,
            log,
        })
    }
}

/// Output of an `update` operation.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateResult {
    /// The `did:webvh` DID.
    pub did: String,

    /// The `did:webvh` document.
    pub document: Document,

    /// Resolution metadata for the updated version.
    pub metadata: ResolvedMetadata,

    /// Version history log consisting of the original log appended with the
    /// entry describing the update operation.
    pub log: DidLog,
}
