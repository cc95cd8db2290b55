//! Tests for resolving a `did:webvh` log into a DID document.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use didwebvh::webvh::{
    self, CreateBuilder, CreateResult, ResolutionOptions, UpdateBuilder, Witness, WitnessEntry,
    WitnessWeight,
};
use didwebvh::{
    DocumentBuilder, Ed25519Verifier, EphemeralKeyring, Error, KeyPurpose, LogResolver,
    VerificationMethod,
};

const DID_URL: &str = "https://example.com/dids/issuer";

async fn create(keyring: &EphemeralKeyring, witness: Option<&Witness>) -> CreateResult {
    let did = webvh::default_did(DID_URL).expect("should create DID");
    let vm = VerificationMethod::build(keyring.multikey()).build(&did);
    let doc =
        DocumentBuilder::new(&*did).verification_method(vm, KeyPurpose::Authentication).build();

    let builder = CreateBuilder::new()
        .document(doc)
        .expect("should apply document")
        .update_keys(vec![keyring.multikey()])
        .expect("should apply update keys");
    let builder = match witness {
        Some(w) => builder.witness(w).expect("witness information should be applied"),
        None => builder,
    };
    builder.signer(keyring).build(&Ed25519Verifier).await.expect("should build genesis entry")
}

// Extend the log with `count` no-change entries.
async fn extend(create_result: &CreateResult, keyring: &EphemeralKeyring, count: usize)
-> webvh::DidLog {
    let mut log = create_result.log.clone();
    for _ in 0..count {
        let result = UpdateBuilder::from(&log, None, &Ed25519Verifier)
            .expect("should create builder")
            .document(&create_result.document)
            .expect("should apply document")
            .signer(keyring)
            .build(&Ed25519Verifier)
            .await
            .expect("should build update entry");
        log = result.log;
    }
    log
}

#[tokio::test]
async fn resolve_single_with_witness_proofs() {
    let keyring = EphemeralKeyring::generate();
    let witness_1 = EphemeralKeyring::generate();
    let witness_2 = EphemeralKeyring::generate();

    let witnesses = Witness {
        threshold: 2,
        witnesses: vec![
            WitnessWeight { id: format!("did:key:{}", witness_1.multikey()), weight: 1 },
            WitnessWeight { id: format!("did:key:{}", witness_2.multikey()), weight: 1 },
        ],
    };
    let result = create(&keyring, Some(&witnesses)).await;

    let proof_1 = result.log[0].witness_proof(&witness_1).await.expect("should get proof");
    let proof_2 = result.log[0].witness_proof(&witness_2).await.expect("should get proof");
    let witness_proofs = vec![WitnessEntry {
        version_id: result.log[0].version_id.clone(),
        proof: vec![proof_1, proof_2],
    }];

    let resolved = webvh::resolve_log(&result.log, Some(&witness_proofs), None, &Ed25519Verifier)
        .expect("should resolve log");

    assert_eq!(resolved.did, result.did);
    assert_eq!(resolved.metadata.version_id, result.metadata.version_id);
    assert_eq!(resolved.document.verification_method, result.document.verification_method);
}

#[tokio::test]
async fn resolve_synthesizes_default_services() {
    let keyring = EphemeralKeyring::generate();
    let result = create(&keyring, None).await;

    let resolved = webvh::resolve_log(&result.log, None, None, &Ed25519Verifier)
        .expect("should resolve log");

    // the implicit services are a resolution-time convenience, not signed
    // state
    let did = &resolved.did;
    assert!(resolved.document.service(&format!("{did}#files")).is_some());
    let whois = resolved.document.service(&format!("{did}#whois")).expect("should have #whois");
    assert_eq!(whois.type_, "LinkedVerifiablePresentation");
    assert!(result.log[0].state.service(&format!("{did}#whois")).is_none());
}

#[tokio::test]
async fn resolve_multiple_reaches_the_tip() {
    let keyring = EphemeralKeyring::generate();
    let result = create(&keyring, None).await;
    let log = extend(&result, &keyring, 2).await;

    let resolved =
        webvh::resolve_log(&log, None, None, &Ed25519Verifier).expect("should resolve log");
    assert!(resolved.metadata.version_id.starts_with("3-"));
    assert_eq!(resolved.metadata.created, log[0].version_time);
    assert_eq!(resolved.metadata.updated, log[2].version_time);
    assert_eq!(
        resolved.metadata.previous_log_entry_hash.as_deref(),
        log[1].version_id.split_once('-').map(|(_, hash)| hash)
    );
}

#[tokio::test]
async fn versioned_lookup() {
    let keyring = EphemeralKeyring::generate();
    let result = create(&keyring, None).await;
    let log = extend(&result, &keyring, 3).await;

    // by version number
    let options = ResolutionOptions { version_number: Some(2), ..ResolutionOptions::default() };
    let resolved = webvh::resolve_log(&log, None, Some(options), &Ed25519Verifier)
        .expect("should resolve log");
    assert!(resolved.metadata.version_id.starts_with("2-"));
    assert_eq!(resolved.metadata.version_id, log[1].version_id);

    // by version id
    let options = ResolutionOptions {
        version_id: Some(log[2].version_id.clone()),
        ..ResolutionOptions::default()
    };
    let resolved = webvh::resolve_log(&log, None, Some(options), &Ed25519Verifier)
        .expect("should resolve log");
    assert_eq!(resolved.metadata.version_id, log[2].version_id);

    // a version that does not exist
    let options = ResolutionOptions { version_number: Some(9), ..ResolutionOptions::default() };
    let err = webvh::resolve_log(&log, None, Some(options), &Ed25519Verifier)
        .expect_err("version 9 should not be found");
    assert!(matches!(err, Error::NotFound));
}

#[tokio::test]
async fn time_based_lookup() {
    let keyring = EphemeralKeyring::generate();
    let result = create(&keyring, None).await;
    let log = extend(&result, &keyring, 2).await;

    // a time after the tip resolves to the tip
    let options = ResolutionOptions {
        version_time: Some(Utc::now() + Duration::hours(1)),
        ..ResolutionOptions::default()
    };
    let resolved = webvh::resolve_log(&log, None, Some(options), &Ed25519Verifier)
        .expect("should resolve log");
    assert_eq!(resolved.metadata.version_id, log[2].version_id);

    // a time before the first version matches nothing
    let before: DateTime<Utc> = "2000-01-01T00:00:00Z".parse().expect("should parse");
    let options =
        ResolutionOptions { version_time: Some(before), ..ResolutionOptions::default() };
    let err = webvh::resolve_log(&log, None, Some(options), &Ed25519Verifier)
        .expect_err("a time before the first version should not be found");
    assert!(matches!(err, Error::NotFound));
}

#[tokio::test]
async fn verification_method_lookup() {
    let keyring = EphemeralKeyring::generate();
    let result = create(&keyring, None).await;

    // version 2 introduces a second verification method
    let added = EphemeralKeyring::generate();
    let vm = VerificationMethod::build(added.multikey()).build(&result.did);
    let vm_id = vm.id.clone();
    let doc = DocumentBuilder::from(result.document.clone())
        .verification_method(vm, KeyPurpose::AssertionMethod)
        .build();
    let updated = UpdateBuilder::from(&result.log, None, &Ed25519Verifier)
        .expect("should create builder")
        .document(&doc)
        .expect("should apply document")
        .signer(&keyring)
        .build(&Ed25519Verifier)
        .await
        .expect("should build update entry");

    let options = ResolutionOptions {
        verification_method: Some(vm_id),
        ..ResolutionOptions::default()
    };
    let resolved = webvh::resolve_log(&updated.log, None, Some(options), &Ed25519Verifier)
        .expect("should resolve log");
    assert!(resolved.metadata.version_id.starts_with("2-"));

    let options = ResolutionOptions {
        verification_method: Some("did:webvh:zMissing:example.com#zUnknown".to_string()),
        ..ResolutionOptions::default()
    };
    let err = webvh::resolve_log(&updated.log, None, Some(options), &Ed25519Verifier)
        .expect_err("an unknown verification method should not be found");
    assert!(matches!(err, Error::NotFound));
}

#[tokio::test]
async fn conflicting_options_are_rejected() {
    let keyring = EphemeralKeyring::generate();
    let result = create(&keyring, None).await;

    let options = ResolutionOptions {
        version_number: Some(1),
        verification_method: Some("did:webvh:z:example.com#z".to_string()),
        ..ResolutionOptions::default()
    };
    let err = webvh::resolve_log(&result.log, None, Some(options), &Ed25519Verifier)
        .expect_err("conflicting filters should be rejected");
    assert!(matches!(err, Error::InvalidOptions(_)));

    let options = ResolutionOptions {
        version_number: Some(1),
        version_id: Some(result.metadata.version_id.clone()),
        ..ResolutionOptions::default()
    };
    let err = webvh::resolve_log(&result.log, None, Some(options), &Ed25519Verifier)
        .expect_err("conflicting version filters should be rejected");
    assert!(matches!(err, Error::InvalidOptions(_)));
}

#[tokio::test]
async fn empty_log_is_not_found() {
    let err = webvh::resolve_log(&[], None, None, &Ed25519Verifier)
        .expect_err("an empty log should not resolve");
    assert!(matches!(err, Error::NotFound));
}

struct Store(webvh::DidLog);

impl LogResolver for Store {
    async fn resolve_log(&self, _did: &str) -> Result<Option<webvh::DidLog>> {
        Ok(Some(self.0.clone()))
    }

    async fn resolve_witness_proofs(&self, _did: &str) -> Result<Vec<WitnessEntry>> {
        Ok(vec![])
    }
}

#[tokio::test]
async fn resolve_did_through_resolver() {
    let keyring = EphemeralKeyring::generate();
    let result = create(&keyring, None).await;
    let store = Store(result.log.clone());

    let resolved = webvh::resolve_did(&result.did, &store, None, &Ed25519Verifier)
        .await
        .expect("should resolve DID");
    assert_eq!(resolved.did, result.did);

    // a log that does not prove the requested identifier is rejected
    let other = "did:webvh:zSomeOtherScid:example.com";
    let err = webvh::resolve_did(other, &store, None, &Ed25519Verifier)
        .await
        .expect_err("a mismatched log should be rejected");
    assert!(matches!(err, Error::NotFound));
}

#[tokio::test]
async fn jsonl_round_trip_resolves() {
    let keyring = EphemeralKeyring::generate();
    let result = create(&keyring, None).await;
    let log = extend(&result, &keyring, 1).await;

    let jsonl = webvh::to_jsonl(&log).expect("should serialize");
    let parsed = webvh::from_jsonl(&jsonl).expect("should parse");
    let resolved =
        webvh::resolve_log(&parsed, None, None, &Ed25519Verifier).expect("should resolve log");
    assert!(resolved.metadata.version_id.starts_with("2-"));
}
