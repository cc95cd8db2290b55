//! # DID Web with Verifiable History
//!
//! The `did:webvh` method is an enhanced version of the `did:web` method that
//! includes the ability to resolve a full history of the DID document through
//! a chain of updates.
//!
//! See: <https://identity.foundation/didwebvh/>

mod create;
mod deactivate;
mod resolve;
mod update;
mod url;
mod verify;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use multibase::Base;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::document::Document;
use crate::proof::Proof;
use crate::provider::Signer;
use crate::{Error, Result};

pub use self::create::{CreateBuilder, CreateResult};
pub use self::deactivate::{DeactivateBuilder, DeactivateResult};
pub use self::resolve::{
    resolve_did, resolve_log, Resolved, ResolvedMetadata, ResolutionOptions,
};
pub use self::update::{UpdateBuilder, UpdateResult};
pub use self::url::{default_did, http_url, parse_url};
pub use self::verify::{
    keys_match_commitments, next_key_hash, validate_witness, verify_proofs,
    verify_witness_proofs,
};

/// Placeholder for the self-certifying identifier (SCID) in a DID URL.
///
/// Gets replaced by the generated SCID when constructing a DID document and
/// log entry.
pub const SCID_PLACEHOLDER: &str = "{SCID}";

pub(crate) const METHOD: &str = "webvh";
pub(crate) const VERSION: &str = "0.5";

/// The method tag declared by a log's genesis entry,
/// e.g. `did:webvh:0.5`.
pub(crate) fn protocol() -> String {
    format!("did:{METHOD}:{VERSION}")
}

/// A `DidLog` is an ordered, append-only set of log entries for a DID
/// document. It is only ever extended by appending validated entries: the
/// construction and extension operations return new log values and never
/// mutate their input.
pub type DidLog = Vec<LogEntry>;

/// `LogEntry` is an entry in the `did.jsonl` log file denoting one version of
/// a DID document together with the protocol parameters that changed at that
/// version and the proof authorizing it.
///
/// <https://identity.foundation/didwebvh/#the-did-log-file>
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// DID version number starting at 1 and incrementing by one per DID
    /// version, a literal dash `-`, and the entry hash.
    pub version_id: String,

    /// A UTC timestamp in ISO 8601 format.
    pub version_time: DateTime<Utc>,

    /// Log entry parameters that changed at this version. Parameters not set
    /// here persist from the last version that set them.
    pub parameters: Parameters,

    /// The full DID document for this version (not a diff).
    pub state: Document,

    /// Signed data integrity proof.
    ///
    /// Note that in the final construction of a log entry the `proof` is
    /// required. However, it is not part of the content the entry hash
    /// commits to, so is made skippable here to support the build and
    /// verification algorithms.
    #[serde(skip_serializing_if = "Vec::is_empty", default = "Vec::new")]
    pub proof: Vec<Proof>,
}

impl LogEntry {
    /// Generate a log entry hash: the multibase-encoded SHA-256 digest of the
    /// entry's canonical (JCS) form.
    ///
    /// # Errors
    ///
    /// Will return an error if the entry fails serialization.
    pub fn hash(&self) -> Result<String> {
        let entry = jcs(self)?;
        let digest = Sha256::digest(entry.as_bytes());
        Ok(multibase::encode(Base::Base58Btc, digest.as_slice()))
    }

    /// Verify the hash embedded in the entry's `version_id`.
    ///
    /// The hash commits to the entry's content with the `proof` removed and
    /// the `version_id` set to the predecessor's version id (the SCID for the
    /// first entry), chaining each entry to the full content of all prior
    /// entries.
    ///
    /// # Errors
    ///
    /// Will return an error if the version id has an unexpected format or the
    /// recomputed hash does not match the embedded one.
    pub fn verify_hash(&self, previous_version_id: &str) -> Result<()> {
        let (_, claimed) = split_version_id(&self.version_id)?;
        let mut unsigned = self.clone();
        unsigned.proof = Vec::new();
        unsigned.version_id = previous_version_id.to_string();
        let computed = unsigned.hash()?;
        if computed != claimed {
            return Err(Error::HashChainBroken {
                version_id: self.version_id.clone(),
                computed,
            });
        }
        Ok(())
    }

    /// Construct a controller's data integrity proof and add it to the log
    /// entry.
    ///
    /// # Errors
    ///
    /// Will return an error if the signer fails or the proof structure cannot
    /// be serialized.
    pub async fn sign(&mut self, signer: &impl Signer) -> Result<()> {
        let proof = self.proof(signer).await?;
        self.proof.push(proof);
        Ok(())
    }

    /// Construct a controller's data integrity proof for the log entry
    /// without attaching it.
    ///
    /// The proof is an `eddsa-jcs-2022` signature over the canonical form of
    /// the entry with any existing proofs removed. For convenience, the
    /// [`Self::sign`] method constructs a proof and adds it to the entry and
    /// should be used instead of this method for a controller's proof.
    ///
    /// # Errors
    ///
    /// Will return an error if the signer fails or the proof structure cannot
    /// be serialized.
    pub async fn proof(&self, signer: &impl Signer) -> Result<Proof> {
        let config = Proof {
            id: Some(format!("urn:uuid:{}", Uuid::new_v4())),
            type_: "DataIntegrityProof".to_string(),
            cryptosuite: Some("eddsa-jcs-2022".to_string()),
            proof_purpose: "assertionMethod".to_string(),
            verification_method: signer.verification_method().await.map_err(Error::Other)?,
            created: Some(Utc::now()),
            ..Proof::default()
        };

        let mut unsigned = self.clone();
        unsigned.proof = Vec::new();
        let payload = signing_payload(&config, &unsigned)?;
        let signature = signer.try_sign(&payload).await.map_err(Error::Other)?;

        let mut proof = config;
        proof.proof_value = Some(multibase::encode(Base::Base58Btc, signature));
        Ok(proof)
    }

    /// Construct a witness's data integrity proof for the log entry.
    ///
    /// A witness attests to the log's tip rather than its content: the
    /// signature is over the entry's `version_id` alone, which (through the
    /// hash chain) commits to the entire log.
    ///
    /// # Errors
    ///
    /// Will return an error if the signer fails or the proof structure cannot
    /// be serialized.
    pub async fn witness_proof(&self, signer: &impl Signer) -> Result<Proof> {
        let config = Proof {
            type_: "DataIntegrityProof".to_string(),
            cryptosuite: Some("eddsa-jcs-2022".to_string()),
            proof_purpose: "authentication".to_string(),
            verification_method: signer.verification_method().await.map_err(Error::Other)?,
            created: Some(Utc::now()),
            ..Proof::default()
        };

        let payload = signing_payload(&config, &json!({ "versionId": self.version_id }))?;
        let signature = signer.try_sign(&payload).await.map_err(Error::Other)?;

        let mut proof = config;
        proof.proof_value = Some(multibase::encode(Base::Base58Btc, signature));
        Ok(proof)
    }
}

/// Parameters for a DID log entry.
///
/// Each field is optional: an entry carries only the parameters that changed
/// at that version, and a resolver folds them over the values accumulated
/// from prior entries.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Parameters {
    /// The `did:webvh` specification version to use when processing the log.
    /// Required on the first log entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// The self-certifying identifier (SCID) for the DID. Required on the
    /// first log entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scid: Option<String>,

    /// An array of public keys associated with private keys authorized to
    /// sign log entries for this DID. Multikey format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_keys: Option<Vec<String>>,

    /// Hashes of public keys that may be added to the update keys in
    /// subsequent key rotation operations. An explicit empty list disables
    /// pre-rotation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_key_hashes: Option<Vec<String>>,

    /// Can the DID be renamed and hosted on a different domain?
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portable: Option<bool>,

    /// Parameters declaring witnesses for the DID and the threshold of
    /// witness approval required before the log's tip is authoritative. An
    /// explicit witness object with an empty witness list clears witnessing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub witness: Option<Witness>,

    /// Indicator of whether the DID has been deactivated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deactivated: Option<bool>,

    /// Maximum time in seconds the resolved document should be cached before
    /// a full resolution must be performed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
}

/// A list of IDs of witnesses and their contribution to verification of
/// changes to the DID document.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Witness {
    /// The total of the weights of witnesses required to approve a change.
    pub threshold: u64,

    /// The list of witnesses and their contributing weights.
    pub witnesses: Vec<WitnessWeight>,
}

/// The weight a witness contributes to the approval of a DID update.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WitnessWeight {
    /// The DID of the witness using the `did:key` method.
    pub id: String,

    /// The weight of the witness.
    pub weight: u64,
}

/// Entry in the `did-witness.json` file: the proofs one or more witnesses
/// have published for a particular log entry.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WitnessEntry {
    /// Version ID of the log entry to which the witnesses' proofs apply.
    pub version_id: String,

    /// Witnesses' proofs of the log entry using the `eddsa-jcs-2022`
    /// cryptosuite.
    pub proof: Vec<Proof>,
}

/// Parse a line-delimited (`did.jsonl`) log representation.
///
/// One JSON object per line; blank lines and a trailing newline are
/// tolerated.
///
/// # Errors
///
/// Will fail if any non-empty line is not a valid log entry.
pub fn from_jsonl(jsonl: &str) -> Result<DidLog> {
    let mut log = DidLog::new();
    for line in jsonl.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let entry = serde_json::from_str(line)
            .map_err(|e| Error::Other(anyhow!("invalid log entry: {e}")))?;
        log.push(entry);
    }
    Ok(log)
}

/// Serialize a log to its line-delimited (`did.jsonl`) representation.
///
/// The output ends with a newline so appending a future entry never rewrites
/// an existing line.
///
/// # Errors
///
/// Will fail if an entry cannot be serialized.
pub fn to_jsonl(log: &[LogEntry]) -> Result<String> {
    let mut out = String::new();
    for entry in log {
        let line = serde_json::to_string(entry)
            .map_err(|e| Error::Other(anyhow!("failed to serialize log entry: {e}")))?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

/// Canonicalize a value using JCS (RFC 8785).
pub(crate) fn jcs<T: Serialize>(value: &T) -> Result<String> {
    serde_json_canonicalizer::to_string(value)
        .map_err(|e| Error::Other(anyhow!("canonicalization failed: {e}")))
}

/// The payload signed by an `eddsa-jcs-2022` proof: the SHA-256 digest of the
/// canonical proof configuration concatenated with the SHA-256 digest of the
/// canonical data.
pub(crate) fn signing_payload<T: Serialize>(config: &Proof, data: &T) -> Result<Vec<u8>> {
    let mut config = config.clone();
    config.proof_value = None;
    let config_hash = Sha256::digest(jcs(&config)?.as_bytes());
    let data_hash = Sha256::digest(jcs(data)?.as_bytes());
    Ok([config_hash.as_slice(), data_hash.as_slice()].concat())
}

/// Split a `"<n>-<entryHash>"` version id into its sequence number and hash.
pub(crate) fn split_version_id(version_id: &str) -> Result<(u64, String)> {
    let Some((number, hash)) = version_id.split_once('-') else {
        return Err(Error::Other(anyhow!(
            "log entry version id '{version_id}' has an unexpected format"
        )));
    };
    let number = number.parse::<u64>().map_err(|_| {
        Error::Other(anyhow!("log entry version id '{version_id}' has an unexpected format"))
    })?;
    if hash.is_empty() {
        return Err(Error::Other(anyhow!(
            "log entry version id '{version_id}' has an unexpected format"
        )));
    }
    Ok((number, hash.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_id_splits() {
        let (number, hash) = split_version_id("3-zQmExampleHash").expect("should split");
        assert_eq!(number, 3);
        assert_eq!(hash, "zQmExampleHash");

        assert!(split_version_id("no-dash").is_err());
        assert!(split_version_id("4-").is_err());
        assert!(split_version_id("qqq").is_err());
    }

    #[test]
    fn jsonl_round_trip_tolerates_trailing_newline() {
        let entry = LogEntry {
            version_id: "1-zQmExampleHash".to_string(),
            ..LogEntry::default()
        };
        let jsonl = to_jsonl(&[entry.clone(), entry.clone()]).expect("should serialize");
        assert!(jsonl.ends_with('\n'));

        let log = from_jsonl(&jsonl).expect("should parse");
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], entry);

        // a reader must tolerate blank lines as well
        let log = from_jsonl(&format!("{jsonl}\n\n")).expect("should parse");
        assert_eq!(log.len(), 2);
    }
}
