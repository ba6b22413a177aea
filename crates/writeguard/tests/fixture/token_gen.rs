//! Identity token generation
//!
//! ```rust,ignore
//! let token = TokenBuilder::valid(now).claim("aud", json!("p2")).sign();
//! let broken = corrupt_signature(&token);
//! ```

use super::{ADMIN_EMAIL, KID, PROJECT, SigningKey, issuer, signing_key};
use aws_lc_rs::rand::SystemRandom;
use aws_lc_rs::signature::RSA_PKCS1_SHA256;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::{Value, json};
use std::time::{SystemTime, UNIX_EPOCH};

/// Builder for signed identity tokens
#[derive(Debug, Clone)]
pub struct TokenBuilder {
    header: Value,
    claims: Value,
}

impl TokenBuilder {
    /// Header and claims that pass every check at time `now`
    pub fn valid(now: i64) -> Self {
        Self {
            header: json!({ "alg": "RS256", "kid": KID }),
            claims: json!({
                "iss": issuer(),
                "aud": PROJECT,
                "sub": "u1",
                "iat": now - 10,
                "exp": now + 3600,
                "auth_time": now - 10,
                "email": ADMIN_EMAIL,
                "email_verified": true,
            }),
        }
    }

    /// Set or replace a header field
    pub fn header(mut self, key: &str, value: Value) -> Self {
        self.header[key] = value;
        self
    }

    /// Set or replace a claim
    pub fn claim(mut self, key: &str, value: Value) -> Self {
        self.claims[key] = value;
        self
    }

    /// Remove a claim entirely
    pub fn without(mut self, key: &str) -> Self {
        if let Some(claims) = self.claims.as_object_mut() {
            claims.remove(key);
        }
        self
    }

    pub fn claims(&self) -> &Value {
        &self.claims
    }

    /// Sign with the published key
    pub fn sign(&self) -> String {
        self.sign_with(signing_key())
    }

    /// Sign with an arbitrary key
    pub fn sign_with(&self, key: &SigningKey) -> String {
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(self.header.to_string()),
            URL_SAFE_NO_PAD.encode(self.claims.to_string())
        );

        let mut signature = vec![0u8; key.keypair.public_modulus_len()];
        key.keypair
            .sign(
                &RSA_PKCS1_SHA256,
                &SystemRandom::new(),
                signing_input.as_bytes(),
                &mut signature,
            )
            .expect("Failed to sign token");

        format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature))
    }
}

/// Current Unix timestamp
pub fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

/// Flip one bit in byte `index` of the decoded signature
pub fn corrupt_signature(token: &str, index: usize) -> String {
    let (signing_input, signature) = token.rsplit_once('.').expect("three-part token");
    let mut bytes = URL_SAFE_NO_PAD.decode(signature).expect("base64url signature");
    bytes[index] ^= 0x01;
    format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(bytes))
}
