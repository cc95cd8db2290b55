//! Tests for deactivating a `did:webvh` log.

use didwebvh::webvh::{self, CreateBuilder, CreateResult, DeactivateBuilder, UpdateBuilder};
use didwebvh::{
    DocumentBuilder, Ed25519Verifier, EphemeralKeyring, Error, KeyPurpose, VerificationMethod,
};

const DID_URL: &str = "https://example.com/dids/issuer";

async fn create(keyring: &EphemeralKeyring, prerotation: bool) -> CreateResult {
    let did = webvh::default_did(DID_URL).expect("should create DID");
    let vm = VerificationMethod::build(keyring.multikey()).build(&did);
    let doc =
        DocumentBuilder::new(&*did).verification_method(vm, KeyPurpose::Authentication).build();

    let builder = CreateBuilder::new()
        .document(doc)
        .expect("should apply document")
        .update_keys(vec![keyring.multikey()])
        .expect("should apply update keys");
    let builder = if prerotation { builder.next_key(&keyring.next_multikey()) } else { builder };
    builder.signer(keyring).build(&Ed25519Verifier).await.expect("should build genesis entry")
}

#[tokio::test]
async fn deactivate_strips_verification_material() {
    let keyring = EphemeralKeyring::generate();
    let create_result = create(&keyring, false).await;

    let result = DeactivateBuilder::from(&create_result.log, None, &Ed25519Verifier)
        .expect("should create builder")
        .signer(&keyring)
        .build(&Ed25519Verifier)
        .await
        .expect("should build deactivate entry");

    assert_eq!(result.log.len(), 2);
    assert!(result.metadata.deactivated);
    assert!(result.metadata.update_keys.is_empty());

    // all verification-method-bearing arrays are explicitly empty
    assert_eq!(result.document.verification_method, Some(vec![]));
    assert_eq!(result.document.authentication, Some(vec![]));
    assert_eq!(result.document.assertion_method, Some(vec![]));
    assert_eq!(result.document.key_agreement, Some(vec![]));
    assert_eq!(result.document.capability_invocation, Some(vec![]));
    assert_eq!(result.document.capability_delegation, Some(vec![]));
}

#[tokio::test]
async fn deactivate_clears_outstanding_commitments() {
    let keyring = EphemeralKeyring::generate();
    let create_result = create(&keyring, true).await;

    let result = DeactivateBuilder::from(&create_result.log, None, &Ed25519Verifier)
        .expect("should create builder")
        .signer(&keyring)
        .build(&Ed25519Verifier)
        .await
        .expect("should build deactivate entry");

    // pre-rotation was explicitly, visibly, disabled
    assert_eq!(result.log[1].parameters.next_key_hashes, Some(vec![]));
    assert!(!result.metadata.prerotation);
    assert!(result.metadata.deactivated);
}

#[tokio::test]
async fn resolving_deactivated_log_reports_deactivation() {
    let keyring = EphemeralKeyring::generate();
    let create_result = create(&keyring, false).await;

    let result = DeactivateBuilder::from(&create_result.log, None, &Ed25519Verifier)
        .expect("should create builder")
        .signer(&keyring)
        .build(&Ed25519Verifier)
        .await
        .expect("should build deactivate entry");

    let resolved = webvh::resolve_log(&result.log, None, None, &Ed25519Verifier)
        .expect("should resolve log");
    assert!(resolved.metadata.deactivated);
    let doc_meta = resolved.document.did_document_metadata.expect("should have metadata");
    assert_eq!(doc_meta.deactivated, Some(true));
}

#[tokio::test]
async fn deactivated_log_cannot_be_extended() {
    let keyring = EphemeralKeyring::generate();
    let create_result = create(&keyring, false).await;

    let deactivated = DeactivateBuilder::from(&create_result.log, None, &Ed25519Verifier)
        .expect("should create builder")
        .signer(&keyring)
        .build(&Ed25519Verifier)
        .await
        .expect("should build deactivate entry");

    // with the update keys emptied, no signer can be authorized for a further
    // entry
    let err = UpdateBuilder::from(&deactivated.log, None, &Ed25519Verifier)
        .expect("should create builder")
        .document(&create_result.document)
        .expect("should apply document")
        .signer(&keyring)
        .build(&Ed25519Verifier)
        .await
        .expect_err("extending a deactivated log should fail");
    assert!(matches!(err, Error::UnauthorizedKey(_)));
}
