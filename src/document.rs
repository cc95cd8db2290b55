//! # DID Document
//!
//! A DID Document is a JSON-LD document that contains information related to a
//! DID.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{Kind, OneMany};

/// Base contexts added to every DID document built by this crate.
pub const BASE_CONTEXT: [&str; 2] =
    ["https://www.w3.org/ns/did/v1", "https://w3id.org/security/multikey/v1"];

/// DID Document
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// The context of the DID document.
    #[serde(rename = "@context")]
    pub context: Vec<Kind<Value>>,

    /// The DID for a particular DID subject.
    pub id: String,

    /// A set of URIs that are other identifiers for the subject of the above
    /// DID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub also_known_as: Option<Vec<String>>,

    /// One or more strings that conform to the rules of DID syntax. Proofs
    /// that satisfy the verification methods of a controller are considered
    /// equivalent to proofs provided by the DID subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller: Option<OneMany<String>>,

    /// A set of services, that express ways of communicating with the DID
    /// subject or related entities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<Vec<Service>>,

    /// If set, MUST be a set of verification methods for the DID subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_method: Option<Vec<VerificationMethod>>,

    /// Specifies how the DID subject is expected to be authenticated.
    ///
    /// <https://www.w3.org/TR/did-core/#authentication>
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<Vec<Kind<VerificationMethod>>>,

    /// Specifies how the DID subject is expected to express claims, such as
    /// for the purposes of issuing a Verifiable Credential.
    ///
    /// <https://www.w3.org/TR/did-core/#assertion>
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertion_method: Option<Vec<Kind<VerificationMethod>>>,

    /// Specifies how an entity can generate encryption material to transmit
    /// confidential information intended for the DID subject.
    ///
    /// <https://www.w3.org/TR/did-core/#key-agreement>
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_agreement: Option<Vec<Kind<VerificationMethod>>>,

    /// Specifies a verification method the DID subject may use to invoke a
    /// cryptographic capability.
    ///
    /// <https://www.w3.org/TR/did-core/#capability-invocation>
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability_invocation: Option<Vec<Kind<VerificationMethod>>>,

    /// Specifies a mechanism the DID subject may use to delegate a
    /// cryptographic capability to another party.
    ///
    /// <https://www.w3.org/TR/did-core/#capability-delegation>
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability_delegation: Option<Vec<Kind<VerificationMethod>>>,

    /// Metadata about the document, populated during resolution.
    ///
    /// <https://w3c.github.io/did-core/#dfn-diddocumentmetadata>
    #[serde(skip_serializing_if = "Option::is_none")]
    pub did_document_metadata: Option<DocumentMetadata>,
}

impl Document {
    /// Retrieve a service by its ID.
    #[must_use]
    pub fn service(&self, id: &str) -> Option<&Service> {
        self.service.as_ref()?.iter().find(|s| s.id == id)
    }

    /// Retrieve a verification method by its ID.
    #[must_use]
    pub fn verification_method(&self, id: &str) -> Option<&VerificationMethod> {
        self.verification_method.as_ref()?.iter().find(|vm| vm.id == id)
    }

    /// Check whether the document references a verification method with the
    /// given ID, either in the `verification_method` set or in one of the
    /// verification relationships.
    #[must_use]
    pub fn has_verification_method(&self, id: &str) -> bool {
        if self.verification_method(id).is_some() {
            return true;
        }
        let relationships = [
            &self.authentication,
            &self.assertion_method,
            &self.key_agreement,
            &self.capability_invocation,
            &self.capability_delegation,
        ];
        relationships.into_iter().filter_map(Option::as_ref).flatten().any(|vm| match vm {
            Kind::String(reference) => reference == id,
            Kind::Object(vm) => vm.id == id,
        })
    }

    /// Remove all verification material from the document, leaving explicitly
    /// empty verification relationships. Used when deactivating a DID.
    pub fn strip_verification_material(&mut self) {
        self.verification_method = Some(vec![]);
        self.authentication = Some(vec![]);
        self.assertion_method = Some(vec![]);
        self.key_agreement = Some(vec![]);
        self.capability_invocation = Some(vec![]);
        self.capability_delegation = Some(vec![]);
    }
}

/// DID document metadata. This typically does not change unless the DID
/// document changes.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::module_name_repetitions)]
pub struct DocumentMetadata {
    /// Timestamp of the Create operation.
    /// An XMLSCHEMA11-2 (RFC3339) e.g. 2010-01-01T19:23:24Z.
    pub created: DateTime<Utc>,

    /// Timestamp of the last Update operation. Omitted if an Update operation
    /// has never been performed. An XMLSCHEMA11-2 (RFC3339) e.g.
    /// 2010-01-01T19:23:24Z.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,

    /// MUST be set to true if the DID has been deactivated. Optional if the
    /// DID has not been deactivated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deactivated: Option<bool>,

    /// Used to indicate the version of the last Update operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
}

/// The purpose a verification method serves within a DID document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyPurpose {
    /// Membership of the `verification_method` set only.
    VerificationMethod,

    /// The `authentication` relationship.
    Authentication,

    /// The `assertion_method` relationship.
    AssertionMethod,

    /// The `key_agreement` relationship.
    KeyAgreement,

    /// The `capability_invocation` relationship.
    CapabilityInvocation,

    /// The `capability_delegation` relationship.
    CapabilityDelegation,
}

/// A public key the DID subject can use to prove control, expressed in
/// Multikey format.
///
/// <https://www.w3.org/TR/did-core/#verification-methods>
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    /// A DID URL unique to the verification method.
    pub id: String,

    /// The verification method type. Always "Multikey" for this method.
    #[serde(rename = "type")]
    pub type_: String,

    /// The DID of the controller of the verification method.
    pub controller: String,

    /// The multibase-encoded public key.
    pub public_key_multibase: String,

    /// Secret key material, when held by a signer. Never serialized: secret
    /// material must not appear in a resolved document.
    #[serde(skip_serializing, default)]
    pub secret_key_multibase: Option<String>,
}

impl VerificationMethod {
    /// Create a new `VerificationMethodBuilder` for the given public key.
    #[must_use]
    pub fn build(public_key_multibase: impl Into<String>) -> VerificationMethodBuilder {
        VerificationMethodBuilder::new(public_key_multibase)
    }
}

/// Builder for a [`VerificationMethod`].
#[derive(Clone, Debug, Default)]
pub struct VerificationMethodBuilder {
    key: String,
    id: Option<String>,
    controller: Option<String>,
}

impl VerificationMethodBuilder {
    /// Create a new builder for the given multibase-encoded public key.
    #[must_use]
    pub fn new(public_key_multibase: impl Into<String>) -> Self {
        Self {
            key: public_key_multibase.into(),
            id: None,
            controller: None,
        }
    }

    /// Override the verification method ID. Defaults to `<did>#<multikey>`.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Override the controller. Defaults to the containing document's DID.
    #[must_use]
    pub fn controller(mut self, controller: impl Into<String>) -> Self {
        self.controller = Some(controller.into());
        self
    }

    /// Build the verification method for the given DID.
    #[must_use]
    pub fn build(self, did: &str) -> VerificationMethod {
        VerificationMethod {
            id: self.id.unwrap_or_else(|| format!("{did}#{}", self.key)),
            type_: "Multikey".to_string(),
            controller: self.controller.unwrap_or_else(|| did.to_string()),
            public_key_multibase: self.key,
            secret_key_multibase: None,
        }
    }
}

/// A Service is used to express a way of communicating with the DID subject
/// or associated entities.
///
/// Due to privacy concerns, revealing public information through services,
/// such as social media accounts and email addresses, is discouraged.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// A URI unique to the service.
    pub id: String,

    /// The service type. SHOULD be registered in the DID Specification
    /// Registries.
    #[serde(rename = "type")]
    pub type_: String,

    /// One or more endpoints for the service.
    #[allow(clippy::struct_field_names)]
    pub service_endpoint: OneMany<Kind<Value>>,
}

/// Service builder
#[derive(Clone, Debug, Default)]
pub struct ServiceBuilder {
    id: String,
    service_type: Option<String>,
    endpoint: Option<Vec<Kind<Value>>>,
}

impl ServiceBuilder {
    /// Creates a new `ServiceBuilder` with the given service ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            service_type: None,
            endpoint: None,
        }
    }

    /// Specify the service type.
    #[must_use]
    pub fn service_type(mut self, service_type: impl Into<String>) -> Self {
        self.service_type = Some(service_type.into());
        self
    }

    /// Add a string-based service endpoint.
    ///
    /// Chain to add multiple endpoints.
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint.get_or_insert(vec![]).push(Kind::String(endpoint.into()));
        self
    }

    /// Build the service.
    #[must_use]
    pub fn build(self) -> Service {
        let endpoint = self.endpoint.unwrap_or_default();
        let service_endpoint = if endpoint.len() == 1 {
            OneMany::One(endpoint[0].clone())
        } else {
            OneMany::Many(endpoint)
        };
        Service {
            id: self.id,
            type_: self.service_type.unwrap_or_default(),
            service_endpoint,
        }
    }
}

/// DID Document builder.
#[derive(Clone, Debug, Default)]
pub struct DocumentBuilder {
    document: Document,
}

impl DocumentBuilder {
    /// Creates a new `DocumentBuilder` with the given DID.
    ///
    /// The base contexts are added and the DID is set as its own controller.
    #[must_use]
    pub fn new(did: impl Into<String>) -> Self {
        let did: String = did.into();
        let document = Document {
            context: BASE_CONTEXT.iter().map(|ctx| Kind::String((*ctx).to_string())).collect(),
            id: did.clone(),
            controller: Some(OneMany::One(did)),
            ..Document::default()
        };
        Self { document }
    }

    /// Creates a new `DocumentBuilder` from an existing [`Document`].
    #[must_use]
    pub fn from(document: Document) -> Self {
        Self { document }
    }

    /// Add a context.
    ///
    /// There is no need to call this for the base contexts - these are added
    /// automatically. Chain to add multiple contexts.
    #[must_use]
    pub fn context(mut self, context: Kind<Value>) -> Self {
        if !self.document.context.contains(&context) {
            self.document.context.push(context);
        }
        self
    }

    /// Add an also-known-as identifier.
    #[must_use]
    pub fn also_known_as(mut self, aka: impl Into<String>) -> Self {
        self.document.also_known_as.get_or_insert(vec![]).push(aka.into());
        self
    }

    /// Add a controller.
    ///
    /// Chain to add multiple controllers.
    #[must_use]
    pub fn add_controller(mut self, controller: impl Into<String>) -> Self {
        match &mut self.document.controller {
            Some(existing) => existing.add(controller.into()),
            None => self.document.controller = Some(OneMany::One(controller.into())),
        }
        self
    }

    /// Add a service endpoint.
    ///
    /// Chain to add multiple service endpoints.
    #[must_use]
    pub fn service(mut self, service: Service) -> Self {
        self.document.service.get_or_insert(vec![]).push(service);
        self
    }

    /// Add a verification method for the stated purpose.
    ///
    /// The method is added to the document's `verification_method` set and,
    /// for purposes other than [`KeyPurpose::VerificationMethod`], referenced
    /// by ID from the corresponding verification relationship.
    #[must_use]
    pub fn verification_method(mut self, vm: VerificationMethod, purpose: KeyPurpose) -> Self {
        let id = vm.id.clone();
        self.document.verification_method.get_or_insert(vec![]).push(vm);
        if purpose == KeyPurpose::VerificationMethod {
            return self;
        }
        self.reference(id, purpose)
    }

    /// Reference an existing verification method from a verification
    /// relationship.
    #[must_use]
    pub fn reference(mut self, vm_id: impl Into<String>, purpose: KeyPurpose) -> Self {
        let reference = Kind::String(vm_id.into());
        let relationship = match purpose {
            KeyPurpose::VerificationMethod => return self,
            KeyPurpose::Authentication => &mut self.document.authentication,
            KeyPurpose::AssertionMethod => &mut self.document.assertion_method,
            KeyPurpose::KeyAgreement => &mut self.document.key_agreement,
            KeyPurpose::CapabilityInvocation => &mut self.document.capability_invocation,
            KeyPurpose::CapabilityDelegation => &mut self.document.capability_delegation,
        };
        relationship.get_or_insert(vec![]).push(reference);
        self
    }

    /// Build the DID Document.
    #[must_use]
    pub fn build(self) -> Document {
        self.document
    }
}
