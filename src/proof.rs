//! # Data Integrity Proof
//!
//! [W3C Data Integrity 1.0 Report](https://www.w3.org/community/reports/credentials/CG-FINAL-data-integrity-20220722)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An embedded proof binding a signature to a deterministic byte
/// representation of a document or log entry.
///
/// The `proof_value` field is computed using a cryptosuite algorithm as
/// specified in
/// [Data Integrity EdDSA Cryptosuites v1.0](https://www.w3.org/TR/vc-di-eddsa).
/// Those algorithms describe the process whereby a configuration or options
/// object is used. This is the same structure as the `proof` object without
/// the `proof_value` field, hence the field being optional on this struct.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Proof {
    /// An optional identifier for the proof. MUST be a URL, such as a UUID as
    /// a URN e.g. "`urn:uuid:6a1676b8-b51f-11ed-937b-d76685a20ff5`".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The specific proof type. For log entries this is always
    /// "`DataIntegrityProof`", which requires the `cryptosuite` and
    /// `proofValue` properties to be set.
    #[serde(rename = "type")]
    pub type_: String,

    /// The value of the cryptosuite property identifies the cryptographic
    /// suite, e.g. 'eddsa-jcs-2022'.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cryptosuite: Option<String>,

    /// The reason for the proof. Acts as a safeguard to prevent the proof
    /// from being misused.
    pub proof_purpose: String,

    /// Used to verify the proof. A `did:key` URL identifying the public key
    /// used by a verifier during the verification process.
    pub verification_method: String,

    /// The date-time the proof was created. MUST be an XMLSCHEMA11-2
    /// date-time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    /// Contains the data needed to verify the proof using the
    /// `verification_method` specified. MUST be a MULTIBASE-encoded binary
    /// value.
    ///
    /// Required on a proof object and omitted on a proof configuration
    /// object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_value: Option<String>,
}
