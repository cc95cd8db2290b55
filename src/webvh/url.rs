//! URL conversions for the `did:webvh` method: from the HTTP URL where a log
//! is hosted to the host-and-path component of a DID, and from a DID back to
//! the HTTP URL of its `did.jsonl` log file.

use std::sync::LazyLock;

use anyhow::anyhow;
use regex::Regex;
use url::Url;

use super::SCID_PLACEHOLDER;
use crate::{Error, Result};

static DID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^did:webvh:(?<identifier>[a-zA-Z0-9.\\-:\\%\\{\\}]+)$").expect("should compile")
});

/// Convert an HTTP URL to the host-and-path component of a `did:webvh` DID.
///
/// Valid examples:
/// - `https://example.com`
/// - `http://example.com/custom/path/`
/// - `https://example.com:8080`
///
/// If the log is to be hosted on a sub-path, the path should be included.
/// Otherwise it is assumed the log is hosted at
/// `https://<host>/.well-known/did.jsonl` and you SHOULD NOT include the
/// `/.well-known` path.
///
/// # Errors
///
/// Will fail if the URL cannot be parsed into the host and path portion of a
/// `did:webvh` DID.
pub fn parse_url(url: &str) -> Result<String> {
    let url = Url::parse(url).map_err(|e| Error::Other(anyhow!("invalid URL: {e}")))?;
    let host_str =
        url.host_str().ok_or_else(|| Error::Other(anyhow!("no host in URL '{url}'")))?;
    let mut host = host_str.to_string();
    if let Some(port) = url.port() {
        host.push_str(&format!("%3A{port}"));
    }
    if let Some(path) = url.path().strip_prefix('/') {
        if !path.is_empty() {
            let formatted_path = path.trim_end_matches('/');
            let formatted_path = formatted_path.replace('/', ":");
            host.push_str(&format!(":{formatted_path}"));
        }
    }
    Ok(host)
}

/// Construct a placeholder DID for the given HTTP URL, suitable for building
/// a document ahead of SCID generation.
///
/// # Errors
///
/// Will fail if the URL cannot be parsed.
pub fn default_did(url: &str) -> Result<String> {
    let host_and_path = parse_url(url)?;
    Ok(format!("did:{}:{SCID_PLACEHOLDER}:{host_and_path}", super::METHOD))
}

/// Convert a `did:webvh` DID to the HTTP URL of a file co-located with the
/// DID list document. `file_path` defaults to `/did.jsonl`; pass e.g.
/// `/did-witness.json` for the witness proof file.
///
/// # Errors
///
/// Will fail if the DID is invalid.
///
/// <https://identity.foundation/didwebvh/#the-did-to-https-transformation>
pub fn http_url(did: &str, file_path: Option<&str>) -> Result<String> {
    // 1. Remove the literal `did:webvh:` prefix from the DID.
    let Some(caps) = DID_REGEX.captures(did) else {
        return Err(Error::Other(anyhow!("'{did}' is not a valid did:webvh DID")));
    };
    let scid_and_fqdn = &caps["identifier"];

    // 2. Remove the SCID by removing the text up to and including the first
    // `:` character.
    let Some(fqdn) = scid_and_fqdn.split_once(':').map(|x| x.1) else {
        return Err(Error::Other(anyhow!("'{did}' is not a valid did:webvh DID - no SCID")));
    };

    // 3. Replace `:` with `/` in the domain part of the identifier to obtain
    // the fully qualified domain name and optional path.
    let mut domain = fqdn.replace(':', "/");

    // 4. If there is no optional path, append `/.well-known` to the URL.
    if !fqdn.contains(':') {
        domain.push_str("/.well-known");
    }

    // 5. If the domain contains a port, percent-decode the colon.
    let domain = domain.replace("%3A", ":");

    // 6. Prepend `https://` to the domain to generate the URL.
    // 7. Append `/did.jsonl` (default) or the specified file sub-path.
    let fp = file_path.unwrap_or("/did.jsonl");
    Ok(format!("https://{domain}{fp}"))
}

/// The HTTP URL of the directory the DID's documents are published under,
/// used when synthesizing the implicit `#files` and `#whois` services.
pub(crate) fn base_url(did: &str) -> Result<String> {
    let url = http_url(did, Some(""))?;
    Ok(url.trim_end_matches('/').to_string())
}

/// Split a `did:webvh` DID into its SCID and host-and-path components.
pub(crate) fn split_did(did: &str) -> Result<(String, String)> {
    let Some(caps) = DID_REGEX.captures(did) else {
        return Err(Error::Other(anyhow!("'{did}' is not a valid did:webvh DID")));
    };
    let identifier = &caps["identifier"];
    let Some((scid, host)) = identifier.split_once(':') else {
        return Err(Error::Other(anyhow!("'{did}' is not a valid did:webvh DID - no SCID")));
    };
    Ok((scid.to_string(), host.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_urls() {
        assert_eq!(parse_url("https://example.com").unwrap(), "example.com");
        assert_eq!(
            parse_url("http://example.com/custom/path/").unwrap(),
            "example.com:custom:path"
        );
        assert_eq!(parse_url("https://example.com:8080").unwrap(), "example.com%3A8080");
    }

    #[test]
    fn should_construct_default_did() {
        assert_eq!(
            default_did("https://example.com/dids/issuer").unwrap(),
            "did:webvh:{SCID}:example.com:dids:issuer"
        );
    }

    #[test]
    fn should_construct_default_url() {
        let did =
            "did:webvh:QmaJp6pmb6RUk4oaDyWQcjeqYbvxsc3kvmHWPpz7B5JwDU:domain.with-hyphens.computer";
        let url = http_url(did, None).unwrap();
        assert_eq!(url, "https://domain.with-hyphens.computer/.well-known/did.jsonl");
    }

    #[test]
    fn should_construct_path_url() {
        let did = "did:webvh:QmaJp6pmb6RUk4oaDyWQcjeqYbvxsc3kvmHWPpz7B5JwDU:domain.with-hyphens.computer:dids:issuer";
        let url = http_url(did, None).unwrap();
        assert_eq!(url, "https://domain.with-hyphens.computer/dids/issuer/did.jsonl");
    }

    #[test]
    fn should_construct_port_url() {
        let did = "did:webvh:QmaJp6pmb6RUk4oaDyWQcjeqYbvxsc3kvmHWPpz7B5JwDU:domain.with-hyphens.computer%3A8080";
        let url = http_url(did, None).unwrap();
        assert_eq!(url, "https://domain.with-hyphens.computer:8080/.well-known/did.jsonl");
    }

    #[test]
    fn should_split_did() {
        let (scid, host) =
            split_did("did:webvh:QmaJp6pmb6RUk4oaDyWQcjeqYbvxsc3kvmHWPpz7B5JwDU:example.com:dids")
                .unwrap();
        assert_eq!(scid, "QmaJp6pmb6RUk4oaDyWQcjeqYbvxsc3kvmHWPpz7B5JwDU");
        assert_eq!(host, "example.com:dids");
    }
}
