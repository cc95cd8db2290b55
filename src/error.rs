//! # Errors
//!
//! Typed failures raised while constructing, extending, or resolving a DID
//! log. All variants are terminal for the operation in progress: the core
//! never retries, and never downgrades a failure to a partial result. Retry
//! policy belongs to the I/O adapters that fetch logs and witness proofs.

use thiserror::Error;

/// Result type for DID log operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by log construction, extension, and resolution.
///
/// Variants carry enough context (version, expected vs. actual hash or key)
/// to diagnose a failure without re-deriving log state.
#[derive(Error, Debug)]
pub enum Error {
    /// The log declares a method tag this implementation does not process.
    #[error("unknown log protocol '{0}'")]
    ProtocolMismatch(String),

    /// An entry's sequence number does not match its position in the log.
    #[error("version number {found} in log doesn't match expected {expected}")]
    VersionSequence {
        /// Position the entry occupies in the log (1-based).
        expected: u64,
        /// Sequence number the entry claims.
        found: u64,
    },

    /// The SCID cannot be re-derived from the genesis entry's content.
    #[error("SCID '{scid}' not derived from genesis entry (derived '{derived}')")]
    ScidMismatch {
        /// SCID claimed by the log.
        scid: String,
        /// SCID derived from the entry's content.
        derived: String,
    },

    /// An entry hash does not commit to the entry's content.
    #[error("hash chain broken at '{version_id}': computed hash '{computed}'")]
    HashChainBroken {
        /// Version id of the offending entry.
        version_id: String,
        /// Hash computed from the entry's canonical content.
        computed: String,
    },

    /// A data integrity proof failed signature verification.
    #[error("proof signature verification failed for version '{0}'")]
    SignatureInvalid(String),

    /// A proof was produced by a key outside the authorized update keys.
    #[error("key '{0}' is not authorized to sign log entries")]
    UnauthorizedKey(String),

    /// An update key does not match any pre-rotation commitment.
    #[error("update key '{0}' does not match any next key hash")]
    InvalidUpdateKey(String),

    /// Pre-rotation is active but no next key hashes were supplied.
    #[error("next key hashes are required while pre-rotation is active")]
    MissingNextKeyHashes,

    /// The document moved to a new host while the DID is not portable.
    #[error("host changed from '{previous}' to '{requested}' for a non-portable DID")]
    PortabilityViolation {
        /// Host component of the previous version's DID.
        previous: String,
        /// Host component the new version requests.
        requested: String,
    },

    /// The witness parameter is malformed.
    #[error("invalid witness configuration: {0}")]
    InvalidWitnessConfig(String),

    /// The supplied witness proofs do not reach the declared threshold.
    #[error("witness weight {weight} does not meet threshold {threshold}")]
    WitnessThresholdNotMet {
        /// Weight required by the witness parameter.
        threshold: u64,
        /// Total weight of valid, unique witness proofs supplied.
        weight: u64,
    },

    /// A witness proof was signed by a key outside the declared witness set.
    #[error("proof signer '{0}' is not a declared witness")]
    UnknownWitness(String),

    /// No update keys were supplied when constructing a log.
    #[error("update keys must not be empty")]
    MissingUpdateKeys,

    /// Conflicting resolution filters were requested.
    #[error("invalid resolution options: {0}")]
    InvalidOptions(String),

    /// The log is empty or a requested filter never matched an entry.
    #[error("no version satisfied the resolution request")]
    NotFound,

    /// A capability (signer, verifier, resolver) or serialization failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
