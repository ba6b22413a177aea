//! Unit test fixtures
//!
//! Hand-assembled DER certificates for the parser, plus one generated RSA
//! key published through a self-signed certificate for signing tokens.

use aws_lc_rs::rand::SystemRandom;
use aws_lc_rs::signature::{RSA_PKCS1_SHA256, RsaKeyPair};
use base64::{
    Engine,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use rsa::{RsaPrivateKey, pkcs8::EncodePrivateKey};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) const ISSUER_PREFIX: &str = "https://securetoken.google.com";
pub(crate) const PROJECT: &str = "p1";
pub(crate) const KID: &str = "k1";

pub(crate) fn issuer() -> String {
    format!("{ISSUER_PREFIX}/{PROJECT}")
}

pub(crate) fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

pub(crate) fn wrap_pem(der: &[u8]) -> String {
    let body = STANDARD.encode(der);
    let lines: Vec<&str> = body
        .as_bytes()
        .chunks(64)
        .map(|c| std::str::from_utf8(c).unwrap())
        .collect();
    format!(
        "-----BEGIN CERTIFICATE-----\n{}\n-----END CERTIFICATE-----\n",
        lines.join("\n")
    )
}

/// SPKI with rsaEncryption OID, NULL params and a one-byte key
pub(crate) fn fake_spki() -> Vec<u8> {
    vec![
        0x30, 0x13, // SEQUENCE
        0x30, 0x0d, // AlgorithmIdentifier
        0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01, // OID
        0x05, 0x00, // NULL
        0x03, 0x02, 0x00, 0x00, // BIT STRING
    ]
}

/// Hand-assembled certificate with the fields in their fixed order
pub(crate) fn fake_certificate(with_version: bool, spki: &[u8]) -> Vec<u8> {
    let mut tbs = Vec::new();
    if with_version {
        tbs.extend_from_slice(&[0xA0, 0x03, 0x02, 0x01, 0x02]);
    }
    tbs.extend_from_slice(&[0x02, 0x01, 0x01]); // serialNumber
    tbs.extend_from_slice(&[0x30, 0x00]); // signature
    tbs.extend_from_slice(&[0x30, 0x00]); // issuer
    tbs.extend_from_slice(&[0x30, 0x00]); // validity
    tbs.extend_from_slice(&[0x30, 0x00]); // subject
    tbs.extend_from_slice(spki);

    let mut tbs_seq = vec![0x30, tbs.len() as u8];
    tbs_seq.extend_from_slice(&tbs);

    let mut cert = vec![0x30, tbs_seq.len() as u8];
    cert.extend_from_slice(&tbs_seq);
    cert
}

pub(crate) fn fake_certificate_pem() -> String {
    wrap_pem(&fake_certificate(true, &fake_spki()))
}

/// RSA key pair plus the self-signed certificate that publishes it
pub(crate) struct TestKey {
    pub keypair: RsaKeyPair,
    pub certificate_pem: String,
}

/// Process-wide test key; RSA generation is slow enough to do once
pub(crate) fn test_key() -> &'static TestKey {
    static KEY: OnceLock<TestKey> = OnceLock::new();
    KEY.get_or_init(|| {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("Failed to generate key");
        let pkcs8 = private_key
            .to_pkcs8_der()
            .expect("Failed to serialize to PKCS#8");

        let keypair = RsaKeyPair::from_pkcs8(pkcs8.as_bytes()).unwrap();

        let cert_key = rcgen::KeyPair::try_from(pkcs8.as_bytes()).unwrap();
        let params = rcgen::CertificateParams::new(vec!["securetoken.test".to_string()]).unwrap();
        let certificate = params.self_signed(&cert_key).unwrap();

        TestKey {
            keypair,
            certificate_pem: certificate.pem(),
        }
    })
}

/// Sign `header.payload` with the test key and return the compact token
pub(crate) fn sign_token(header_json: &str, payload_json: &str) -> String {
    let key = test_key();
    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(payload_json)
    );

    let mut signature = vec![0u8; key.keypair.public_modulus_len()];
    key.keypair
        .sign(
            &RSA_PKCS1_SHA256,
            &SystemRandom::new(),
            signing_input.as_bytes(),
            &mut signature,
        )
        .unwrap();

    format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(&signature))
}

pub(crate) fn header_json(kid: &str) -> String {
    format!(r#"{{"alg":"RS256","kid":"{kid}"}}"#)
}

/// Claims accepted by a verifier configured for [`PROJECT`] at time `now`
pub(crate) fn claims_json(now: i64) -> String {
    format!(
        r#"{{"iss":"{}","aud":"{PROJECT}","sub":"u1","iat":{},"exp":{},"auth_time":{},"email":"admin@example.com","email_verified":true}}"#,
        issuer(),
        now - 10,
        now + 3600,
        now - 10
    )
}
