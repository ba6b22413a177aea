//! Shared fixtures for writeguard integration tests
//!
//! Stands in for the identity provider: one RSA signing key published as a
//! self-signed certificate from a mockito endpoint, plus a token builder that
//! signs with that key.
//!
//! ```text
//! ┌──────────────────────┐   GET /certs    ┌──────────────────┐
//! │ mockito (kid → PEM)  │ ◀────────────── │ RemoteKeyCache   │
//! └──────────────────────┘                 └────────┬─────────┘
//!                                                   │
//! TokenBuilder ── sign(k1) ──▶ token ──▶ TokenVerifier / AccessDecision
//! ```

#![allow(dead_code)]

pub mod token_gen;

use aws_lc_rs::signature::RsaKeyPair;
use rsa::{RsaPrivateKey, pkcs8::EncodePrivateKey};
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub const ISSUER_PREFIX: &str = "https://securetoken.google.com";
pub const PROJECT: &str = "p1";
pub const KID: &str = "k1";
pub const ADMIN_EMAIL: &str = "admin@example.com";

pub fn issuer() -> String {
    format!("{ISSUER_PREFIX}/{PROJECT}")
}

/// Provider signing key and the certificate publishing it
pub struct SigningKey {
    pub keypair: RsaKeyPair,
    pub certificate_pem: String,
}

fn generate_signing_key() -> SigningKey {
    let mut rng = rand::thread_rng();
    let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("Failed to generate key");
    let pkcs8 = private_key
        .to_pkcs8_der()
        .expect("Failed to serialize to PKCS#8");

    let keypair = RsaKeyPair::from_pkcs8(pkcs8.as_bytes()).expect("Failed to import key");

    let cert_key = rcgen::KeyPair::try_from(pkcs8.as_bytes()).expect("Failed to load rcgen key");
    let certificate = rcgen::CertificateParams::new(vec!["securetoken.test".to_string()])
        .expect("Failed to build certificate params")
        .self_signed(&cert_key)
        .expect("Failed to self-sign certificate");

    SigningKey {
        keypair,
        certificate_pem: certificate.pem(),
    }
}

/// The key behind certificate [`KID`]
pub fn signing_key() -> &'static SigningKey {
    static KEY: OnceLock<SigningKey> = OnceLock::new();
    KEY.get_or_init(generate_signing_key)
}

/// A second key the provider never published
pub fn rogue_key() -> &'static SigningKey {
    static KEY: OnceLock<SigningKey> = OnceLock::new();
    KEY.get_or_init(generate_signing_key)
}

/// Certificate endpoint body publishing [`signing_key`] under [`KID`]
pub fn certificate_body() -> String {
    let mut certificates = BTreeMap::new();
    certificates.insert(KID.to_string(), signing_key().certificate_pem.clone());
    serde_json::to_string(&certificates).expect("Failed to encode certificates")
}

/// Start a certificate endpoint expecting exactly `expected_fetches` requests
pub async fn certificate_server(
    max_age: u64,
    expected_fetches: usize,
) -> (mockito::ServerGuard, mockito::Mock) {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/certs")
        .with_status(200)
        .with_header("content-type", "application/json; charset=UTF-8")
        .with_header(
            "cache-control",
            &format!("public, max-age={max_age}, must-revalidate, no-transform"),
        )
        .with_body(certificate_body())
        .expect(expected_fetches)
        .create_async()
        .await;
    (server, mock)
}

pub fn certificate_url(server: &mockito::ServerGuard) -> String {
    format!("{}/certs", server.url())
}
