//! Resolution of a `did:webvh` log into a DID document.
//!
//! Resolution replays the log entry-by-entry, threading an immutable
//! accumulator of resolved parameters through a fold: each entry is verified
//! against the state accumulated from all prior entries (hash chain,
//! authorized key set, pre-rotation commitments) before its parameter changes
//! are folded in. Entries therefore cannot be verified out of order, but
//! independent logs share no state and may be resolved concurrently.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::url::{base_url, split_did};
use super::verify::{
    keys_match_commitments, validate_witness, verify_proofs, verify_witness_proofs,
};
use super::{protocol, split_version_id, LogEntry, Witness, WitnessEntry, SCID_PLACEHOLDER};
use crate::document::{Document, DocumentMetadata, ServiceBuilder};
use crate::provider::{LogResolver, Verifier};
use crate::{Error, Result};

/// Options to control which version of the document a resolution returns.
///
/// With no options set, resolution runs to the end of the log and returns the
/// current version. A verification method filter cannot be combined with a
/// version filter.
#[derive(Clone, Debug, Default)]
pub struct ResolutionOptions {
    /// Stop at the version with this sequence number.
    pub version_number: Option<u64>,

    /// Stop at the version with this version id.
    pub version_id: Option<String>,

    /// Stop at the latest version whose timestamp is not after this time.
    pub version_time: Option<DateTime<Utc>>,

    /// Stop at the first version whose document contains this verification
    /// method id.
    pub verification_method: Option<String>,
}

/// Metadata accumulated while resolving a log.
///
/// Rebuilt from scratch on every resolution by folding the log; never
/// persisted.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMetadata {
    /// Version id (`"<n>-<entryHash>"`) of the resolved version.
    pub version_id: String,

    /// Timestamp of the first log entry.
    pub created: DateTime<Utc>,

    /// Timestamp of the resolved log entry.
    pub updated: DateTime<Utc>,

    /// Hash part of the previous entry's version id. `None` for the first
    /// version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_log_entry_hash: Option<String>,

    /// The self-certifying identifier proven from the first log entry.
    pub scid: String,

    /// Public keys authorized to sign the next log entry.
    pub update_keys: Vec<String>,

    /// Outstanding pre-rotation commitments.
    pub next_key_hashes: Vec<String>,

    /// Whether pre-rotation is active at the resolved version.
    pub prerotation: bool,

    /// Whether the DID may move to a different host.
    pub portable: bool,

    /// The witness parameter in force at the resolved version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub witness: Option<Witness>,

    /// Whether a deactivation has been observed. Once observed, deactivation
    /// is latched: no later entry can clear it.
    pub deactivated: bool,
}

/// Output of a resolution.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Resolved {
    /// The resolved DID.
    pub did: String,

    /// The resolved DID document, including the implicit `#files` and
    /// `#whois` services.
    pub document: Document,

    /// Metadata describing the resolved version.
    pub metadata: ResolvedMetadata,
}

/// Resolution accumulator: the protocol parameters and document in force
/// after some prefix of the log.
#[derive(Clone, Debug)]
struct LogState {
    version_number: u64,
    version_id: String,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
    previous_entry_hash: Option<String>,
    scid: String,
    host: String,
    update_keys: Vec<String>,
    next_key_hashes: Vec<String>,
    prerotation: bool,
    portable: bool,
    witness: Option<Witness>,
    deactivated: bool,
    document: Document,
}

impl LogState {
    /// Verify the first log entry and seed the accumulator from it.
    ///
    /// The genesis version is self-authorizing: its proof is checked against
    /// the update keys it supplies itself, and its SCID must be re-derivable
    /// from its own content.
    fn genesis(entry: &LogEntry, verifier: &impl Verifier) -> Result<Self> {
        let params = &entry.parameters;

        let method = params.method.clone().unwrap_or_default();
        if method != protocol() {
            return Err(Error::ProtocolMismatch(method));
        }

        let scid = params.scid.clone().unwrap_or_default();
        if scid.is_empty() || scid == SCID_PLACEHOLDER {
            return Err(Error::ScidMismatch { scid, derived: String::new() });
        }

        // restore the placeholder throughout the entry and re-derive the SCID
        let mut preliminary = entry.clone();
        preliminary.proof = Vec::new();
        preliminary.version_id = SCID_PLACEHOLDER.to_string();
        let json = serde_json::to_string(&preliminary)
            .map_err(|e| Error::Other(anyhow!("failed to serialize log entry: {e}")))?;
        let restored = json.replace(&scid, SCID_PLACEHOLDER);
        let preliminary: LogEntry = serde_json::from_str(&restored)
            .map_err(|e| Error::Other(anyhow!("failed to deserialize log entry: {e}")))?;
        let derived = preliminary.hash()?;
        if derived != scid {
            return Err(Error::ScidMismatch { scid, derived });
        }

        // the genesis entry hash chains from the SCID
        entry.verify_hash(&scid)?;

        let update_keys = params.update_keys.clone().unwrap_or_default();
        if update_keys.is_empty() {
            return Err(Error::MissingUpdateKeys);
        }
        verify_proofs(entry, &update_keys, verifier)?;

        let witness = match &params.witness {
            Some(w) if w.witnesses.is_empty() => None,
            Some(w) => {
                validate_witness(w)?;
                Some(w.clone())
            }
            None => None,
        };

        let (did_scid, host) = split_did(&entry.state.id)?;
        if did_scid != scid {
            return Err(Error::ScidMismatch { scid, derived: did_scid });
        }

        let next_key_hashes = params.next_key_hashes.clone().unwrap_or_default();
        Ok(Self {
            version_number: 1,
            version_id: entry.version_id.clone(),
            created: entry.version_time,
            updated: entry.version_time,
            previous_entry_hash: None,
            scid,
            host,
            update_keys,
            prerotation: !next_key_hashes.is_empty(),
            next_key_hashes,
            portable: params.portable.unwrap_or_default(),
            witness,
            deactivated: params.deactivated == Some(true),
            document: entry.state.clone(),
        })
    }

    /// Verify a subsequent log entry against the accumulated state and fold
    /// its parameter changes into a new accumulator.
    fn apply(&self, entry: &LogEntry, verifier: &impl Verifier) -> Result<Self> {
        let (sequence, _) = split_version_id(&entry.version_id)?;

        // the document may only move hosts if the DID is portable, and the
        // SCID may never change
        let (did_scid, host) = split_did(&entry.state.id)?;
        if did_scid != self.scid {
            return Err(Error::ScidMismatch { scid: self.scid.clone(), derived: did_scid });
        }
        if host != self.host && !self.portable {
            return Err(Error::PortabilityViolation {
                previous: self.host.clone(),
                requested: host,
            });
        }

        // authorized by the previous version's resolved key set
        verify_proofs(entry, &self.update_keys, verifier)?;

        // each entry's hash commits to its content and, through the previous
        // version id, to all prior entries
        entry.verify_hash(&self.version_id)?;

        let params = &entry.parameters;
        if let Some(method) = &params.method {
            if *method != protocol() {
                return Err(Error::ProtocolMismatch(method.clone()));
            }
        }
        if let Some(scid) = &params.scid {
            if *scid != self.scid {
                return Err(Error::ScidMismatch {
                    scid: self.scid.clone(),
                    derived: scid.clone(),
                });
            }
        }

        let mut update_keys = self.update_keys.clone();
        if let Some(new_keys) = &params.update_keys {
            if self.prerotation {
                if self.next_key_hashes.is_empty() {
                    return Err(Error::MissingNextKeyHashes);
                }
                keys_match_commitments(new_keys, &self.next_key_hashes)?;
            }
            update_keys.clone_from(new_keys);
        }

        // while pre-rotation is active an entry must recommit, or explicitly
        // clear, its next key hashes: omission would silently disable the
        // protection
        let (next_key_hashes, prerotation) = match &params.next_key_hashes {
            Some(hashes) => (hashes.clone(), !hashes.is_empty()),
            None if self.prerotation => return Err(Error::MissingNextKeyHashes),
            None => (Vec::new(), false),
        };

        let witness = match &params.witness {
            Some(w) if w.witnesses.is_empty() => None,
            Some(w) => {
                validate_witness(w)?;
                Some(w.clone())
            }
            None => self.witness.clone(),
        };

        // TODO: sanity-check that version_time is not before the previous
        // entry's once didwebvh settles on enforcement.
        let (_, previous_hash) = split_version_id(&self.version_id)?;
        Ok(Self {
            version_number: sequence,
            version_id: entry.version_id.clone(),
            created: self.created,
            updated: entry.version_time,
            previous_entry_hash: Some(previous_hash),
            scid: self.scid.clone(),
            host,
            update_keys,
            next_key_hashes,
            prerotation,
            portable: params.portable.unwrap_or(self.portable),
            witness,
            // deactivation latches: a later entry cannot clear it
            deactivated: self.deactivated || params.deactivated == Some(true),
            document: entry.state.clone(),
        })
    }

    fn metadata(&self) -> ResolvedMetadata {
        ResolvedMetadata {
            version_id: self.version_id.clone(),
            created: self.created,
            updated: self.updated,
            previous_log_entry_hash: self.previous_entry_hash.clone(),
            scid: self.scid.clone(),
            update_keys: self.update_keys.clone(),
            next_key_hashes: self.next_key_hashes.clone(),
            prerotation: self.prerotation,
            portable: self.portable,
            witness: self.witness.clone(),
            deactivated: self.deactivated,
        }
    }

    fn resolved(&self) -> Result<Resolved> {
        let mut document = self.document.clone();
        synthesize_services(&mut document)?;
        document.did_document_metadata = Some(DocumentMetadata {
            created: self.created,
            updated: Some(self.updated),
            deactivated: self.deactivated.then_some(true),
            version_id: Some(self.version_id.clone()),
        });
        Ok(Resolved {
            did: document.id.clone(),
            document,
            metadata: self.metadata(),
        })
    }
}

/// Resolve a log into a DID document and resolution metadata.
///
/// The log is replayed from its first entry; any entry that violates the
/// protocol's integrity, authorization, portability, or witness-threshold
/// rules fails the whole resolution. When `options` request a particular
/// version, resolution stops at the matching entry and returns the document
/// as of that point in history.
///
/// Witness proofs apply to the log's final entry only and are verified when a
/// witness parameter is in force and the resolution runs to the end of the
/// log. Pass `None` for `witness_proofs` to skip witness verification, e.g.
/// when validating a log ahead of extending it.
///
/// # Errors
///
/// Will fail with the typed error describing the first protocol violation
/// encountered, with [`Error::InvalidOptions`] for conflicting filters, or
/// with [`Error::NotFound`] for an empty log or a filter that never matched.
pub fn resolve_log(
    log: &[LogEntry], witness_proofs: Option<&[WitnessEntry]>,
    options: Option<ResolutionOptions>, verifier: &impl Verifier,
) -> Result<Resolved> {
    let options = options.unwrap_or_default();
    let version_filter = options.version_number.is_some()
        || options.version_id.is_some()
        || options.version_time.is_some();
    if options.verification_method.is_some() && version_filter {
        return Err(Error::InvalidOptions(
            "a verification method filter cannot be combined with a version filter".into(),
        ));
    }
    if options.version_number.is_some() && options.version_id.is_some() {
        return Err(Error::InvalidOptions(
            "specify only one of version number or version id".into(),
        ));
    }
    if log.is_empty() {
        return Err(Error::NotFound);
    }

    let mut state: Option<LogState> = None;
    for (position, entry) in log.iter().enumerate() {
        let expected = position as u64 + 1;
        let (found, _) = split_version_id(&entry.version_id)?;
        if found != expected {
            return Err(Error::VersionSequence { expected, found });
        }

        let next = match &state {
            None => LogState::genesis(entry, verifier)?,
            Some(current) => current.apply(entry, verifier)?,
        };
        debug!(version_id = %next.version_id, "verified log entry");

        // stop conditions: an early match resolves to a historical version
        // without witness verification (witnessing targets the tip)
        if let Some(number) = options.version_number {
            if next.version_number == number {
                return next.resolved();
            }
        }
        if let Some(id) = &options.version_id {
            if &next.version_id == id {
                return next.resolved();
            }
        }
        if let Some(time) = options.version_time {
            let is_last = position + 1 == log.len();
            if next.updated <= time && (is_last || log[position + 1].version_time > time) {
                return next.resolved();
            }
        }
        if let Some(vm) = &options.verification_method {
            if next.document.has_verification_method(vm) {
                return next.resolved();
            }
        }

        state = Some(next);
    }

    // a requested filter that never matched is a failed resolution
    if version_filter || options.verification_method.is_some() {
        return Err(Error::NotFound);
    }
    let Some(state) = state else {
        return Err(Error::NotFound);
    };

    // the tip of a witnessed log is only authoritative once the threshold of
    // witness approvals is met
    if let (Some(witness), Some(proofs)) = (&state.witness, witness_proofs) {
        let Some(last) = log.last() else {
            return Err(Error::NotFound);
        };
        verify_witness_proofs(last, proofs, witness, verifier)?;
    }

    state.resolved()
}

/// Resolve a DID by fetching its log and witness proofs through the
/// [`LogResolver`] capability and replaying the log.
///
/// # Errors
///
/// Will fail if the resolver cannot fetch the log, the log does not belong to
/// the requested DID, or the log fails verification.
pub async fn resolve_did(
    did: &str, resolver: &impl LogResolver, options: Option<ResolutionOptions>,
    verifier: &impl Verifier,
) -> Result<Resolved> {
    let log = resolver.resolve_log(did).await.map_err(Error::Other)?.ok_or(Error::NotFound)?;
    let witness_proofs = resolver.resolve_witness_proofs(did).await.map_err(Error::Other)?;

    let resolved = resolve_log(&log, Some(&witness_proofs), options, verifier)?;

    // the fetched log must prove the identifier it was fetched for
    let (scid, _) = split_did(did)?;
    if resolved.metadata.scid != scid {
        return Err(Error::NotFound);
    }
    Ok(resolved)
}

/// Synthesize the implicit `#files` and `#whois` services on a resolved
/// document if absent. These are resolution-time conveniences and are never
/// part of the signed state.
fn synthesize_services(document: &mut Document) -> Result<()> {
    let base = base_url(&document.id)?;
    let did = document.id.clone();

    let files_id = format!("{did}#files");
    if document.service(&files_id).is_none() {
        let service =
            ServiceBuilder::new(files_id).service_type("relativeRef").endpoint(base.clone()).build();
        document.service.get_or_insert(vec![]).push(service);
    }

    let whois_id = format!("{did}#whois");
    if document.service(&whois_id).is_none() {
        let service = ServiceBuilder::new(whois_id)
            .service_type("LinkedVerifiablePresentation")
            .endpoint(format!("{base}/whois.vp"))
            .build();
        document.service.get_or_insert(vec![]).push(service);
    }
    Ok(())
}
