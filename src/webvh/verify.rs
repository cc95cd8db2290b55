//! Verification and validation functions for `did:webvh` log entries and
//! information referenced in the log parameters.

use anyhow::anyhow;
use multibase::Base;
use serde_json::json;
use sha2::{Digest, Sha256};

use super::{signing_payload, LogEntry, Witness, WitnessEntry};
use crate::provider::Verifier;
use crate::{multikey, Error, Result};

/// Verify the proofs in a log entry against the set of authorized update
/// keys.
///
/// Every proof on the entry must verify, and every proof's signer must be a
/// member of the authorized key set. Pure function over its inputs: no clock,
/// no I/O.
///
/// # Errors
///
/// Will fail if the entry carries no proof, a signer is not authorized
/// ([`Error::UnauthorizedKey`]), or a signature does not verify
/// ([`Error::SignatureInvalid`]).
pub fn verify_proofs(
    entry: &LogEntry, update_keys: &[String], verifier: &impl Verifier,
) -> Result<()> {
    if entry.proof.is_empty() {
        return Err(Error::SignatureInvalid(entry.version_id.clone()));
    }

    let mut unsigned = entry.clone();
    unsigned.proof = Vec::new();

    for proof in &entry.proof {
        check_proof_format(proof)?;

        let key = multikey::from_did_url(&proof.verification_method)?;
        if !update_keys.contains(&key) {
            return Err(Error::UnauthorizedKey(key));
        }

        let payload = signing_payload(proof, &unsigned)?;
        if !verify_signature(proof, &payload, &key, verifier)? {
            return Err(Error::SignatureInvalid(entry.version_id.clone()));
        }
    }
    Ok(())
}

/// Validate a witness parameter.
///
/// This function checks the witness information in the log parameters meets
/// structural requirements. It does not verify the proofs supplied by the
/// witnesses - see [`verify_witness_proofs`] for that.
///
/// # Errors
///
/// Will fail if the witness threshold is zero, the witness list is empty, a
/// witness id is not a `did:key`, the contribution (weight) of a witness is
/// zero, or the sum of contributions would never reach the threshold.
pub fn validate_witness(witness: &Witness) -> Result<()> {
    if witness.threshold == 0 {
        return Err(Error::InvalidWitnessConfig("threshold must be greater than zero".into()));
    }
    if witness.witnesses.is_empty() {
        return Err(Error::InvalidWitnessConfig("witness list must not be empty".into()));
    }
    let mut total_weight = 0;
    for w in &witness.witnesses {
        if !w.id.starts_with("did:key:") {
            return Err(Error::InvalidWitnessConfig(format!(
                "witness id '{}' must be a did:key",
                w.id
            )));
        }
        if w.weight == 0 {
            return Err(Error::InvalidWitnessConfig(format!(
                "witness '{}' weight must be greater than zero",
                w.id
            )));
        }
        total_weight += w.weight;
    }
    if total_weight < witness.threshold {
        return Err(Error::InvalidWitnessConfig(format!(
            "total witness weight {total_weight} can never reach threshold {}",
            witness.threshold
        )));
    }
    Ok(())
}

/// Verify a set of witness proofs against the log's final entry.
///
/// Witnessing targets the current tip of the log, not historical entries:
/// proof files for other versions are ignored. Each proof's signer must be a
/// declared witness and its signature is over the entry's `version_id`. A
/// witness that proves twice is counted once. Returns the total weight of
/// valid, unique-signer proofs.
///
/// # Errors
///
/// Will fail if a proof's signer is not in the declared witness set
/// ([`Error::UnknownWitness`]), a signature does not verify
/// ([`Error::SignatureInvalid`]), or the accumulated weight does not meet the
/// threshold ([`Error::WitnessThresholdNotMet`]).
pub fn verify_witness_proofs(
    last_entry: &LogEntry, proofs: &[WitnessEntry], witness: &Witness, verifier: &impl Verifier,
) -> Result<u64> {
    validate_witness(witness)?;

    let data = json!({ "versionId": last_entry.version_id });
    let mut proven: Vec<String> = Vec::new();
    let mut total_weight = 0;

    for file in proofs {
        if file.version_id != last_entry.version_id {
            continue;
        }
        for proof in &file.proof {
            check_proof_format(proof)?;

            let key = multikey::from_did_url(&proof.verification_method)?;
            let witness_did = format!("did:key:{key}");
            let Some(declared) = witness.witnesses.iter().find(|w| w.id == witness_did) else {
                return Err(Error::UnknownWitness(witness_did));
            };

            let payload = signing_payload(proof, &data)?;
            if !verify_signature(proof, &payload, &key, verifier)? {
                return Err(Error::SignatureInvalid(last_entry.version_id.clone()));
            }

            // a duplicate witness contributes its weight once
            if proven.contains(&witness_did) {
                continue;
            }
            proven.push(witness_did);
            total_weight += declared.weight;
        }
    }

    if total_weight < witness.threshold {
        return Err(Error::WitnessThresholdNotMet {
            threshold: witness.threshold,
            weight: total_weight,
        });
    }
    Ok(total_weight)
}

/// The pre-rotation commitment for a multibase-encoded public key: the
/// multibase-encoded SHA-256 digest of the key string.
#[must_use]
pub fn next_key_hash(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    multibase::encode(Base::Base58Btc, digest.as_slice())
}

/// Check that every candidate update key was committed to by an earlier next
/// key hash.
///
/// Runs both when constructing an update (the local key about to be used) and
/// when resolving a log authored by someone else (the keys the log claims for
/// the new version).
///
/// # Errors
///
/// Will fail with [`Error::InvalidUpdateKey`] for the first key whose hash is
/// not among the commitments.
pub fn keys_match_commitments(
    update_keys: &[String], next_key_hashes: &[String],
) -> Result<()> {
    for key in update_keys {
        if !next_key_hashes.contains(&next_key_hash(key)) {
            return Err(Error::InvalidUpdateKey(key.clone()));
        }
    }
    Ok(())
}

/// Structural checks common to controller and witness proofs.
fn check_proof_format(proof: &crate::Proof) -> Result<()> {
    if proof.type_ != "DataIntegrityProof" {
        return Err(Error::Other(anyhow!(
            "unsupported proof type '{}' - must be 'DataIntegrityProof'",
            proof.type_
        )));
    }
    if proof.cryptosuite.as_deref() != Some("eddsa-jcs-2022") {
        return Err(Error::Other(anyhow!(
            "unsupported cryptosuite '{}' - must be 'eddsa-jcs-2022'",
            proof.cryptosuite.as_deref().unwrap_or("")
        )));
    }
    if proof.proof_purpose != "authentication" && proof.proof_purpose != "assertionMethod" {
        return Err(Error::Other(anyhow!(
            "unsupported proof purpose '{}' - must be 'authentication' or 'assertionMethod'",
            proof.proof_purpose
        )));
    }
    Ok(())
}

/// Decode a proof value and check the signature over the payload using the
/// verifier capability.
fn verify_signature(
    proof: &crate::Proof, payload: &[u8], key: &str, verifier: &impl Verifier,
) -> Result<bool> {
    let Some(proof_value) = &proof.proof_value else {
        return Err(Error::Other(anyhow!("proof value is missing")));
    };
    let (base, signature) = multibase::decode(proof_value)
        .map_err(|e| Error::Other(anyhow!("failed to decode proof value: {e}")))?;
    if base != Base::Base58Btc {
        return Err(Error::Other(anyhow!("unsupported multibase encoding for proof value")));
    }
    let key_bytes = multikey::decode(key)?;
    verifier.verify(&signature, payload, &key_bytes).map_err(Error::Other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webvh::WitnessWeight;

    #[test]
    fn witness_config_rules() {
        let valid = Witness {
            threshold: 2,
            witnesses: vec![
                WitnessWeight { id: "did:key:z6MkW1".to_string(), weight: 1 },
                WitnessWeight { id: "did:key:z6MkW2".to_string(), weight: 1 },
            ],
        };
        assert!(validate_witness(&valid).is_ok());

        let zero_threshold = Witness { threshold: 0, ..valid.clone() };
        assert!(matches!(validate_witness(&zero_threshold), Err(Error::InvalidWitnessConfig(_))));

        let empty = Witness { threshold: 1, witnesses: vec![] };
        assert!(matches!(validate_witness(&empty), Err(Error::InvalidWitnessConfig(_))));

        let unreachable = Witness { threshold: 5, ..valid.clone() };
        assert!(matches!(validate_witness(&unreachable), Err(Error::InvalidWitnessConfig(_))));

        let not_did_key = Witness {
            threshold: 1,
            witnesses: vec![WitnessWeight { id: "did:web:w1".to_string(), weight: 1 }],
        };
        assert!(matches!(validate_witness(&not_did_key), Err(Error::InvalidWitnessConfig(_))));
    }

    #[test]
    fn commitments_must_cover_new_keys() {
        let committed = vec![next_key_hash("z6MkNew")];
        assert!(keys_match_commitments(&["z6MkNew".to_string()], &committed).is_ok());

        let err = keys_match_commitments(&["z6MkRogue".to_string()], &committed);
        assert!(matches!(err, Err(Error::InvalidUpdateKey(k)) if k == "z6MkRogue"));
    }
}
