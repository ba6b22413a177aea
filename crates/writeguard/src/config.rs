//! Deployment configuration
//!
//! Built with [`ConfigBuilder`] or loaded from `WRITEGUARD_*` environment
//! variables. Validation happens once in `build()`, before any network call.

use crate::access::AdminAllowList;
use crate::error::{Error, Result};
use http::HeaderName;
use std::time::Duration;

pub const DEFAULT_ISSUER_PREFIX: &str = "https://securetoken.google.com";

pub const DEFAULT_CERTIFICATE_URL: &str =
    "https://www.googleapis.com/robot/v1/metadata/x509/securetoken@system.gserviceaccount.com";

pub const DEFAULT_SECRET_HEADER: &str = "x-admin-secret";

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

pub const ENV_PROJECT_ID: &str = "WRITEGUARD_PROJECT_ID";
pub const ENV_ISSUER_PREFIX: &str = "WRITEGUARD_ISSUER_PREFIX";
pub const ENV_CERTIFICATE_URL: &str = "WRITEGUARD_CERTIFICATE_URL";
pub const ENV_ADMIN_EMAILS: &str = "WRITEGUARD_ADMIN_EMAILS";
pub const ENV_ADMIN_SECRET: &str = "WRITEGUARD_ADMIN_SECRET";
pub const ENV_SECRET_HEADER: &str = "WRITEGUARD_SECRET_HEADER";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "WRITEGUARD_FETCH_TIMEOUT_SECS";

/// Validated deployment settings
#[derive(Clone)]
pub struct Config {
    project_id: String,
    issuer_prefix: String,
    certificate_url: String,
    admin_emails: AdminAllowList,
    admin_secret: Option<String>,
    secret_header: HeaderName,
    fetch_timeout: Duration,
}

impl Config {
    pub fn builder(project_id: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(project_id)
    }

    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup
    ///
    /// Unset and empty variables fall back to defaults. The project id is
    /// required.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let project_id = var(ENV_PROJECT_ID).ok_or_else(|| {
            Error::ConfigurationInvalid(format!("{ENV_PROJECT_ID} is not set"))
        })?;

        let mut builder = ConfigBuilder::new(project_id);

        if let Some(prefix) = var(ENV_ISSUER_PREFIX) {
            builder.issuer_prefix(prefix);
        }
        if let Some(url) = var(ENV_CERTIFICATE_URL) {
            builder.certificate_url(url);
        }
        if let Some(emails) = var(ENV_ADMIN_EMAILS) {
            builder.admin_emails(AdminAllowList::parse(&emails));
        }
        if let Some(secret) = var(ENV_ADMIN_SECRET) {
            builder.admin_secret(secret);
        }
        if let Some(header) = var(ENV_SECRET_HEADER) {
            builder.secret_header(header);
        }
        if let Some(seconds) = var(ENV_FETCH_TIMEOUT_SECS) {
            let seconds = seconds.trim().parse::<u64>().map_err(|_| {
                Error::ConfigurationInvalid(format!(
                    "{ENV_FETCH_TIMEOUT_SECS} must be a whole number of seconds"
                ))
            })?;
            builder.fetch_timeout(Duration::from_secs(seconds));
        }

        builder.build()
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Issuer every accepted token must carry
    pub fn issuer(&self) -> String {
        format!("{}/{}", self.issuer_prefix, self.project_id)
    }

    /// Audience every accepted token must carry
    pub fn audience(&self) -> &str {
        &self.project_id
    }

    pub fn certificate_url(&self) -> &str {
        &self.certificate_url
    }

    pub fn admin_emails(&self) -> &AdminAllowList {
        &self.admin_emails
    }

    pub fn admin_secret(&self) -> Option<&str> {
        self.admin_secret.as_deref()
    }

    pub fn secret_header(&self) -> &HeaderName {
        &self.secret_header
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("project_id", &self.project_id)
            .field("issuer_prefix", &self.issuer_prefix)
            .field("certificate_url", &self.certificate_url)
            .field("admin_emails", &self.admin_emails.len())
            .field("admin_secret", &self.admin_secret.as_ref().map(|_| "<redacted>"))
            .field("secret_header", &self.secret_header)
            .field("fetch_timeout", &self.fetch_timeout)
            .finish()
    }
}

/// Builder for [`Config`]
#[derive(Clone)]
pub struct ConfigBuilder {
    project_id: String,
    issuer_prefix: String,
    certificate_url: String,
    admin_emails: AdminAllowList,
    admin_secret: Option<String>,
    secret_header: String,
    fetch_timeout: Duration,
}

impl ConfigBuilder {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            issuer_prefix: DEFAULT_ISSUER_PREFIX.to_string(),
            certificate_url: DEFAULT_CERTIFICATE_URL.to_string(),
            admin_emails: AdminAllowList::default(),
            admin_secret: None,
            secret_header: DEFAULT_SECRET_HEADER.to_string(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Issuer prefix; the project id is appended to form the expected issuer
    pub fn issuer_prefix(&mut self, prefix: impl Into<String>) -> &mut Self {
        self.issuer_prefix = prefix.into();
        self
    }

    /// Endpoint serving the kid to PEM certificate map
    pub fn certificate_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.certificate_url = url.into();
        self
    }

    pub fn admin_emails(&mut self, admins: AdminAllowList) -> &mut Self {
        self.admin_emails = admins;
        self
    }

    /// Static shared secret; an empty string disables it
    pub fn admin_secret(&mut self, secret: impl Into<String>) -> &mut Self {
        let secret = secret.into();
        self.admin_secret = (!secret.is_empty()).then_some(secret);
        self
    }

    pub fn secret_header(&mut self, name: impl Into<String>) -> &mut Self {
        self.secret_header = name.into();
        self
    }

    /// Upper bound for a single certificate fetch
    pub fn fetch_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn build(&self) -> Result<Config> {
        let project_id = self.project_id.trim();
        if project_id.is_empty() {
            return Err(invalid("project id is empty"));
        }

        let issuer_prefix = self.issuer_prefix.trim().trim_end_matches('/');
        if issuer_prefix.is_empty() {
            return Err(invalid("issuer prefix is empty"));
        }

        let certificate_url = self.certificate_url.trim();
        let has_scheme = certificate_url
            .strip_prefix("https://")
            .or_else(|| certificate_url.strip_prefix("http://"))
            .is_some_and(|rest| !rest.is_empty());
        if !has_scheme {
            return Err(invalid("certificate url must be an http(s) url"));
        }

        let secret_header = HeaderName::from_bytes(self.secret_header.trim().as_bytes())
            .map_err(|_| invalid("secret header is not a valid header name"))?;

        if self.fetch_timeout.is_zero() {
            return Err(invalid("fetch timeout must be greater than zero"));
        }

        Ok(Config {
            project_id: project_id.to_string(),
            issuer_prefix: issuer_prefix.to_string(),
            certificate_url: certificate_url.to_string(),
            admin_emails: self.admin_emails.clone(),
            admin_secret: self.admin_secret.clone(),
            secret_header,
            fetch_timeout: self.fetch_timeout,
        })
    }
}

fn invalid(reason: &str) -> Error {
    Error::ConfigurationInvalid(reason.to_string())
}
