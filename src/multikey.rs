//! # Multikey
//!
//! Encoding and decoding of Ed25519 public keys in Multikey format, and the
//! `did:key` identifiers used to reference the keys that sign log entries and
//! witness proofs.

use anyhow::anyhow;
use multibase::Base;

use crate::{Error, Result};

/// Multicodec prefix for an Ed25519 public key.
pub const ED25519_CODEC: [u8; 2] = [0xed, 0x01];

/// Encode raw Ed25519 public key bytes as a base58-btc Multikey.
#[must_use]
pub fn encode(verifying_key: &[u8]) -> String {
    let mut multi_bytes = Vec::with_capacity(ED25519_CODEC.len() + verifying_key.len());
    multi_bytes.extend_from_slice(&ED25519_CODEC);
    multi_bytes.extend_from_slice(verifying_key);
    multibase::encode(Base::Base58Btc, multi_bytes)
}

/// Decode a Multikey into raw Ed25519 public key bytes.
///
/// # Errors
///
/// Will fail if the key is not base58-btc encoded or is not an Ed25519 key.
pub fn decode(multikey: &str) -> Result<Vec<u8>> {
    let (base, multi_bytes) = multibase::decode(multikey)
        .map_err(|e| Error::Other(anyhow!("failed to decode multibase key: {e}")))?;
    if base != Base::Base58Btc {
        return Err(Error::Other(anyhow!("multibase base is not Base58Btc")));
    }
    if multi_bytes.len() <= ED25519_CODEC.len()
        || multi_bytes[0..ED25519_CODEC.len()] != ED25519_CODEC
    {
        return Err(Error::Other(anyhow!("key is not an Ed25519 key")));
    }
    Ok(multi_bytes[ED25519_CODEC.len()..].to_vec())
}

/// Construct a `did:key` verification method id for a Multikey.
#[must_use]
pub fn did_key(multikey: &str) -> String {
    format!("did:key:{multikey}#{multikey}")
}

/// Extract the Multikey from a `did:key` DID or DID URL.
///
/// Both the bare DID (`did:key:z6Mk...`) and the verification method form
/// (`did:key:z6Mk...#z6Mk...`) are accepted.
///
/// # Errors
///
/// Will fail if the identifier is not a `did:key`.
pub fn from_did_url(url: &str) -> Result<String> {
    let Some(rest) = url.strip_prefix("did:key:") else {
        return Err(Error::Other(anyhow!("'{url}' is not a did:key identifier")));
    };
    let key = rest.split_once('#').map_or(rest, |(_, fragment)| fragment);
    if key.is_empty() {
        return Err(Error::Other(anyhow!("'{url}' has no key component")));
    }
    Ok(key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let key_bytes = [7u8; 32];
        let multikey = encode(&key_bytes);
        assert!(multikey.starts_with('z'));
        assert_eq!(decode(&multikey).unwrap(), key_bytes);
    }

    #[test]
    fn did_key_extraction() {
        let multikey = encode(&[9u8; 32]);
        let url = did_key(&multikey);
        assert_eq!(from_did_url(&url).unwrap(), multikey);
        assert_eq!(from_did_url(&format!("did:key:{multikey}")).unwrap(), multikey);
        assert!(from_did_url("did:web:example.com").is_err());
    }
}
