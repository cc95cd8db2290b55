//! Create operation for the `did:webvh` method.

use anyhow::anyhow;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::resolve::{resolve_log, ResolvedMetadata};
use super::verify::{next_key_hash, validate_witness};
use super::{protocol, DidLog, LogEntry, Parameters, Witness, METHOD, SCID_PLACEHOLDER};
use crate::document::Document;
use crate::provider::{Signer, Verifier};
use crate::{Error, Result};

/// Builder to create a new `did:webvh` document and associated DID and log.
///
/// Use this to construct a [`CreateResult`].
#[derive(Debug)]
pub struct CreateBuilder<D, K, S> {
    portable: bool,
    next_key_hashes: Option<Vec<String>>,
    witness: Option<Witness>,
    ttl: Option<u64>,

    document: D,
    update_keys: K,
    signer: S,
}

/// Builder does not have a document (can't build).
#[derive(Debug)]
pub struct NoDocument;

/// Builder has a document (can build).
#[derive(Debug)]
pub struct WithDocument(Document);

/// Builder does not have update keys (can't build).
#[derive(Debug)]
pub struct NoUpdateKeys;

/// Builder has update keys (can build).
#[derive(Debug)]
pub struct WithUpdateKeys(Vec<String>);

/// Builder does not have a signer (can't build).
#[derive(Debug)]
pub struct NoSigner;

/// Builder has a signer (can build).
#[derive(Debug)]
pub struct WithSigner<'a, S: Signer>(pub &'a S);

impl CreateBuilder<NoDocument, NoUpdateKeys, NoSigner> {
    /// Create a new `CreateBuilder`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            portable: false,
            next_key_hashes: None,
            witness: None,
            ttl: None,

            document: NoDocument,
            update_keys: NoUpdateKeys,
            signer: NoSigner,
        }
    }

    /// Add the preliminary DID document.
    ///
    /// The document's identifier must be a placeholder DID as constructed by
    /// [`super::default_did`]: the placeholder is replaced with the generated
    /// SCID during the build.
    ///
    /// # Errors
    ///
    /// Will fail if the document identifier is not a placeholder `did:webvh`
    /// DID.
    pub fn document(
        self, document: Document,
    ) -> Result<CreateBuilder<WithDocument, NoUpdateKeys, NoSigner>> {
        let prefix = format!("did:{METHOD}:{SCID_PLACEHOLDER}:");
        if !document.id.starts_with(&prefix) {
            return Err(Error::Other(anyhow!(
                "document id '{}' does not start with '{prefix}'",
                document.id
            )));
        }
        Ok(CreateBuilder {
            portable: self.portable,
            next_key_hashes: self.next_key_hashes,
            witness: self.witness,
            ttl: self.ttl,

            document: WithDocument(document),
            update_keys: NoUpdateKeys,
            signer: NoSigner,
        })
    }
}

impl Default for CreateBuilder<NoDocument, NoUpdateKeys, NoSigner> {
    fn default() -> Self {
        Self::new()
    }
}

impl CreateBuilder<WithDocument, NoUpdateKeys, NoSigner> {
    /// Add the public keys associated with private keys authorized to sign
    /// log entries for this DID. Multikey format.
    ///
    /// # Errors
    ///
    /// Will fail if the update keys are empty.
    pub fn update_keys(
        self, update_keys: Vec<String>,
    ) -> Result<CreateBuilder<WithDocument, WithUpdateKeys, NoSigner>> {
        if update_keys.is_empty() {
            return Err(Error::MissingUpdateKeys);
        }
        Ok(CreateBuilder {
            portable: self.portable,
            next_key_hashes: self.next_key_hashes,
            witness: self.witness,
            ttl: self.ttl,

            document: self.document,
            update_keys: WithUpdateKeys(update_keys),
            signer: NoSigner,
        })
    }
}

impl CreateBuilder<WithDocument, WithUpdateKeys, NoSigner> {
    /// Add a signer to the builder.
    #[must_use]
    pub fn signer<S: Signer>(
        self, signer: &S,
    ) -> CreateBuilder<WithDocument, WithUpdateKeys, WithSigner<'_, S>> {
        CreateBuilder {
            portable: self.portable,
            next_key_hashes: self.next_key_hashes,
            witness: self.witness,
            ttl: self.ttl,

            document: self.document,
            update_keys: self.update_keys,
            signer: WithSigner(signer),
        }
    }
}

impl<D, K, S> CreateBuilder<D, K, S> {
    /// Set the DID to be portable or not (defaults to not portable).
    #[must_use]
    pub const fn portable(mut self, portable: bool) -> Self {
        self.portable = portable;
        self
    }

    /// Commit to a key for a future rotation.
    ///
    /// Pass the multibase-encoded public key to be used as the next key and
    /// this function will carry out the hashing before adding the commitment
    /// to the list of next key hashes. Chain to commit to multiple keys.
    #[must_use]
    pub fn next_key(mut self, next_key_multi: &str) -> Self {
        self.next_key_hashes.get_or_insert(vec![]).push(next_key_hash(next_key_multi));
        self
    }

    /// Add a set of witnesses to the create operation.
    ///
    /// # Errors
    ///
    /// Will fail if the witness threshold is zero, the witness list is empty,
    /// the contribution (weight) of a witness is zero, or the sum of
    /// contributions would never reach the threshold.
    pub fn witness(mut self, witness: &Witness) -> Result<Self> {
        validate_witness(witness)?;
        self.witness = Some(witness.clone());
        Ok(self)
    }

    /// Set the permissible cache time in seconds for the DID.
    #[must_use]
    pub const fn ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

impl<S: Signer> CreateBuilder<WithDocument, WithUpdateKeys, WithSigner<'_, S>> {
    /// Build the genesis log entry.
    ///
    /// The SCID is derived from the hash of the entry while it still carries
    /// the `{SCID}` placeholder, the placeholder is then replaced throughout
    /// the entry, and the entry hash is computed over the substituted entry.
    /// The signed result is verified with the supplied verifier before being
    /// returned (witness verification is skipped - witnessing happens after
    /// publication, not at creation).
    ///
    /// # Errors
    ///
    /// Will fail if the entry cannot be hashed or serialized, if the signer
    /// fails, or if the signed entry does not verify.
    pub async fn build(self, verifier: &impl Verifier) -> Result<CreateResult> {
        let document = self.document.0;

        // initial log entry uses the `{SCID}` placeholder for the SCID value
        let version_time =
            document.did_document_metadata.as_ref().map_or_else(Utc::now, |m| m.created);
        let initial_entry = LogEntry {
            version_id: SCID_PLACEHOLDER.to_string(),
            version_time,
            parameters: Parameters {
                method: Some(protocol()),
                scid: Some(SCID_PLACEHOLDER.to_string()),
                update_keys: Some(self.update_keys.0),
                next_key_hashes: self.next_key_hashes,
                portable: Some(self.portable),
                witness: self.witness,
                deactivated: Some(false),
                ttl: self.ttl,
            },
            state: document,
            proof: vec![],
        };

        // create the SCID from the hash of the log entry with the placeholder,
        // then replace the placeholder with the SCID throughout
        let scid = initial_entry.hash()?;
        let initial_json = serde_json::to_string(&initial_entry)
            .map_err(|e| Error::Other(anyhow!("failed to serialize log entry: {e}")))?;
        let self_certified = initial_json.replace(SCID_PLACEHOLDER, &scid);
        let mut entry: LogEntry = serde_json::from_str(&self_certified)
            .map_err(|e| Error::Other(anyhow!("failed to deserialize log entry: {e}")))?;

        // the entry hash is computed over the substituted entry
        let entry_hash = entry.hash()?;
        entry.version_id = format!("1-{entry_hash}");

        // sign (adds a proof to the log entry)
        entry.sign(self.signer.0).await?;

        // verify our own output before returning it
        let log: DidLog = vec![entry];
        let resolved = resolve_log(&log, None, None, verifier)?;

        Ok(CreateResult {
            did: resolved.did,
            document: log[0].state.clone(),
            metadata: resolved.metadata,
            log,
        })
    }
}

/// Output of a `create` operation.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CreateResult {
    /// The `did:webvh` DID.
    pub did: String,

    /// The `did:webvh` document.
    pub document: Document,

    /// Resolution metadata for the created version.
    pub metadata: ResolvedMetadata,

    /// Version history log with the single created entry suitable for
    /// writing to a `did.jsonl` log file.
    pub log: DidLog,
}
