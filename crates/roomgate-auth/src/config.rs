//! Token service configuration.
//!
//! The host supplies these options as typed values (deserialized from its own
//! configuration system). `TokenConfig::validated` normalizes defaults that
//! depend on other fields and rejects invalid combinations up front; an
//! authenticator can only be built from a validated configuration.

use serde::Deserialize;
use thiserror::Error;

/// Default size of the public key cache.
pub const DEFAULT_PUBKEY_CACHE_SIZE: usize = 128;

/// Errors raised while validating a [`TokenConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `app_id` was empty.
    #[error("'app_id' must not be empty")]
    MissingAppId,

    /// Neither `app_secret` nor `asap_key_server` was set.
    #[error("one of 'app_secret' or 'asap_key_server' must be set")]
    MissingKeySource,

    /// Both `app_secret` and `asap_key_server` were set.
    #[error("'app_secret' and 'asap_key_server' are mutually exclusive")]
    AmbiguousKeySource,
}

/// Configuration for the token authentication service.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    /// Application identifier; the default accepted issuer.
    pub app_id: String,

    /// Static shared secret for HMAC-signed tokens.
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Base URL of the remote public key server for ASAP-signed tokens.
    #[serde(default)]
    pub asap_key_server: Option<String>,

    /// Accept sessions that present no token at all.
    #[serde(default)]
    pub allow_empty_token: bool,

    /// Issuers accepted in the `iss` claim. Empty means `[app_id]`.
    #[serde(default)]
    pub asap_accepted_issuers: Vec<String>,

    /// Audiences accepted in the `aud` claim. Empty means `["*"]`,
    /// which accepts any audience.
    #[serde(default)]
    pub asap_accepted_audiences: Vec<String>,

    /// Enable multidomain (virtual subdomain) room matching.
    #[serde(default)]
    pub enable_domain_verification: bool,

    /// Prefix of the conference domain, e.g. `conference` in
    /// `conference.example.com`.
    #[serde(default = "TokenConfig::default_muc_domain_prefix")]
    pub muc_mapper_domain_prefix: String,

    /// Base domain under which conference domains live.
    #[serde(default)]
    pub muc_mapper_domain_base: Option<String>,

    /// Full conference proxy domain. Derived as `{prefix}.{base}` when unset.
    #[serde(default)]
    pub muc_mapper_domain: Option<String>,

    /// Maximum number of public keys kept in the resolver cache.
    #[serde(default = "TokenConfig::default_pubkey_cache_size")]
    pub jwt_pubkey_cache_size: usize,
}

impl TokenConfig {
    /// Create a configuration with the given application ID and all other
    /// options at their defaults. A key source must still be set before the
    /// configuration validates.
    #[must_use]
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: None,
            asap_key_server: None,
            allow_empty_token: false,
            asap_accepted_issuers: Vec::new(),
            asap_accepted_audiences: Vec::new(),
            enable_domain_verification: false,
            muc_mapper_domain_prefix: Self::default_muc_domain_prefix(),
            muc_mapper_domain_base: None,
            muc_mapper_domain: None,
            jwt_pubkey_cache_size: Self::default_pubkey_cache_size(),
        }
    }

    fn default_muc_domain_prefix() -> String {
        "conference".to_string()
    }

    const fn default_pubkey_cache_size() -> usize {
        DEFAULT_PUBKEY_CACHE_SIZE
    }

    /// Check the configuration and fill in the defaults that depend on other
    /// fields.
    ///
    /// # Errors
    ///
    /// Returns an error if `app_id` is empty, or unless exactly one of
    /// `app_secret` / `asap_key_server` is set.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if self.app_id.is_empty() {
            return Err(ConfigError::MissingAppId);
        }
        match (&self.app_secret, &self.asap_key_server) {
            (None, None) => return Err(ConfigError::MissingKeySource),
            (Some(_), Some(_)) => return Err(ConfigError::AmbiguousKeySource),
            _ => {}
        }

        if let Some(server) = &mut self.asap_key_server {
            while server.ends_with('/') {
                server.pop();
            }
        }
        if self.asap_accepted_issuers.is_empty() {
            self.asap_accepted_issuers.push(self.app_id.clone());
        }
        if self.asap_accepted_audiences.is_empty() {
            self.asap_accepted_audiences.push("*".to_string());
        }
        if self.muc_mapper_domain.is_none() {
            if let Some(base) = &self.muc_mapper_domain_base {
                self.muc_mapper_domain =
                    Some(format!("{}.{base}", self.muc_mapper_domain_prefix));
            }
        }

        Ok(self)
    }

    /// The configured conference proxy domain, if any.
    #[must_use]
    pub fn muc_domain(&self) -> Option<&str> {
        self.muc_mapper_domain.as_deref()
    }
}
