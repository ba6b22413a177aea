//! Admin authorization for privileged writes
//!
//! A request is an admin request when either
//!
//! - its bearer token verifies and carries an allow-listed email, or
//! - it presents the configured shared secret.
//!
//! The outcome is a plain boolean; why a request was refused only shows up in
//! `debug` logs.

use crate::validator::TokenVerifier;
use constant_time_eq::constant_time_eq;
use http::header::{AUTHORIZATION, HeaderMap, HeaderName};
use std::collections::HashSet;

/// Normalized (lower-cased) admin email addresses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminAllowList {
    emails: HashSet<String>,
}

impl AdminAllowList {
    /// Parse a comma-separated list, ignoring blanks and surrounding whitespace
    pub fn parse(list: &str) -> Self {
        list.split(',').collect()
    }

    pub fn contains(&self, email: &str) -> bool {
        self.emails.contains(&email.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for AdminAllowList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let emails = iter
            .into_iter()
            .map(|email| email.as_ref().trim().to_lowercase())
            .filter(|email| !email.is_empty())
            .collect();
        Self { emails }
    }
}

/// Decides whether a request may perform privileged writes
#[derive(Clone)]
pub struct AccessDecision {
    verifier: TokenVerifier,
    admins: AdminAllowList,
    secret: Option<String>,
    secret_header: HeaderName,
}

impl AccessDecision {
    /// An empty `secret` disables the shared-secret path
    pub fn new(
        verifier: TokenVerifier,
        admins: AdminAllowList,
        secret: Option<String>,
        secret_header: HeaderName,
    ) -> Self {
        Self {
            verifier,
            admins,
            secret: secret.filter(|s| !s.is_empty()),
            secret_header,
        }
    }

    /// Whether the request carries admin credentials
    pub async fn is_admin(&self, headers: &HeaderMap) -> bool {
        if self.secret_matches(headers) {
            tracing::debug!("admin access granted by shared secret");
            return true;
        }

        let Some(token) = bearer_token(headers) else {
            return false;
        };

        let Ok(claims) = self.verifier.verify(token).await else {
            return false;
        };

        match claims.email.as_deref() {
            Some(email) if self.admins.contains(email) => {
                tracing::debug!(subject = %claims.subject, "admin access granted by token");
                true
            }
            _ => {
                tracing::debug!(subject = %claims.subject, "verified identity is not an admin");
                false
            }
        }
    }

    fn secret_matches(&self, headers: &HeaderMap) -> bool {
        let Some(secret) = &self.secret else {
            return false;
        };

        headers
            .get(&self.secret_header)
            .is_some_and(|provided| constant_time_eq(provided.as_bytes(), secret.as_bytes()))
    }
}

/// Token from an `Authorization: Bearer <token>` header
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certs::CertificateMap;
    use crate::certs::caching::RemoteKeyCache;
    use crate::shared::MemoryCache;
    use crate::testutil::{KID, PROJECT, claims_json, header_json, issuer, now, sign_token, test_key};
    use http::HeaderValue;
    use mockito::{Mock, ServerGuard};
    use std::sync::Arc;

    const SECRET_HEADER: &str = "x-admin-secret";

    async fn key_server(expected_fetches: usize) -> (ServerGuard, Mock) {
        let mut certificates = CertificateMap::new();
        certificates.insert(KID.to_string(), test_key().certificate_pem.clone());

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/certs")
            .with_status(200)
            .with_body(miniserde::json::to_string(&certificates))
            .expect(expected_fetches)
            .create_async()
            .await;
        (server, mock)
    }

    fn decision(server: &ServerGuard, admins: &str, secret: Option<&str>) -> AccessDecision {
        let keys = RemoteKeyCache::new(
            reqwest::Client::new(),
            format!("{}/certs", server.url()),
            Arc::new(MemoryCache::default()),
        );
        AccessDecision::new(
            TokenVerifier::new(issuer(), PROJECT, Arc::new(keys)),
            AdminAllowList::parse(admins),
            secret.map(str::to_string),
            HeaderName::from_static(SECRET_HEADER),
        )
    }

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        headers
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    #[test]
    fn test_allow_list_parse() {
        let list = AdminAllowList::parse(" Admin@Example.com, ,ops@example.com ,");
        assert_eq!(list.len(), 2);
        assert!(list.contains("admin@example.com"));
        assert!(list.contains("ADMIN@example.COM"));
        assert!(list.contains("ops@example.com"));
        assert!(!list.contains("other@example.com"));
        assert!(AdminAllowList::parse("").is_empty());
    }

    #[test]
    fn test_bearer_token() {
        let h = headers(&[("authorization", "Bearer abc.def.ghi")]);
        assert_eq!(bearer_token(&h), Some("abc.def.ghi"));

        let h = headers(&[("authorization", "bearer   abc")]);
        assert_eq!(bearer_token(&h), Some("abc"));

        for value in ["Basic abc", "Bearer", "Bearer ", "abc"] {
            let h = headers(&[("authorization", value)]);
            assert_eq!(bearer_token(&h), None, "{value}");
        }

        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_no_credentials_rejected() {
        let (server, mock) = key_server(0).await;
        let decision = decision(&server, "admin@example.com", Some("s3cret"));

        assert!(!decision.is_admin(&HeaderMap::new()).await);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_secret_accepted_regardless_of_token() {
        let (server, mock) = key_server(0).await;
        let decision = decision(&server, "", Some("s3cret"));

        assert!(decision.is_admin(&headers(&[(SECRET_HEADER, "s3cret")])).await);
        assert!(
            decision
                .is_admin(&headers(&[
                    (SECRET_HEADER, "s3cret"),
                    ("authorization", "Bearer garbage"),
                ]))
                .await
        );

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_wrong_secret_rejected() {
        let (server, _mock) = key_server(0).await;
        let decision = decision(&server, "", Some("s3cret"));

        assert!(!decision.is_admin(&headers(&[(SECRET_HEADER, "s3cre")])).await);
        assert!(!decision.is_admin(&headers(&[(SECRET_HEADER, "s3cret!")])).await);
        assert!(!decision.is_admin(&headers(&[("x-other", "s3cret")])).await);
    }

    #[tokio::test]
    async fn test_empty_secret_disables_secret_path() {
        let (server, _mock) = key_server(0).await;
        let decision = decision(&server, "", Some(""));

        assert!(!decision.is_admin(&headers(&[(SECRET_HEADER, "")])).await);
    }

    #[tokio::test]
    async fn test_allow_listed_token_accepted() {
        let (server, _mock) = key_server(1).await;
        let decision = decision(&server, "Admin@Example.com", None);

        let token = sign_token(&header_json(KID), &claims_json(now()));
        assert!(decision.is_admin(&headers(&[("authorization", &bearer(&token))])).await);
    }

    #[tokio::test]
    async fn test_valid_token_not_allow_listed() {
        let (server, _mock) = key_server(1).await;
        let decision = decision(&server, "someone@example.com", None);

        let token = sign_token(&header_json(KID), &claims_json(now()));
        assert!(!decision.is_admin(&headers(&[("authorization", &bearer(&token))])).await);
    }

    #[tokio::test]
    async fn test_token_without_email_rejected() {
        let (server, _mock) = key_server(1).await;
        let decision = decision(&server, "admin@example.com", None);

        let claims = claims_json(now()).replace("\"email\":", "\"phone_number\":");
        let token = sign_token(&header_json(KID), &claims);
        assert!(!decision.is_admin(&headers(&[("authorization", &bearer(&token))])).await);
    }
}
