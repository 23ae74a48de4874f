//! Signed-token room authorization for roomgate.
//!
//! This crate decides two things for a real-time collaboration host:
//! whether a presented bearer token is valid (authentication), and whether
//! the session it was bound to may join a given room (authorization).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐      ┌─────────────────────┐
//! │   Host server    │─────▶│  TokenAuthenticator │
//! │ (session owner)  │      │  authenticate()     │
//! └──────────────────┘      └─────────┬───────────┘
//!                                     │ kid (remote mode)
//!                           ┌─────────▼───────────┐
//!                           │  PublicKeyResolver  │
//!                           │  (bounded LRU)      │
//!                           └─────────┬───────────┘
//!                                     │ HTTPS
//!                           ┌─────────▼───────────┐
//!                           │   ASAP key server   │
//!                           └─────────────────────┘
//! ```
//!
//! Accepted claims are projected onto the caller's [`SessionState`]; at join
//! time [`TokenAuthenticator::authorize_room`] reconciles them with the room
//! address, including the multidomain `[subdomain]room` convention.
//!
//! # Example
//!
//! ```no_run
//! use roomgate_auth::{SessionState, TokenAuthenticator, TokenConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = TokenConfig::new("myapp");
//! config.app_secret = Some("s3cr3t".to_string());
//! let authenticator = TokenAuthenticator::new(config)?;
//!
//! let mut session = SessionState::with_token("eyJhbGciOiJIUzI1NiJ9...");
//! authenticator.authenticate(&mut session).await?;
//!
//! assert!(authenticator.authorize_room(&session, "myroom@conference.example.com"));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod authz;
pub mod config;
pub mod error;
pub mod keys;
pub mod session;
pub mod token;

pub use authz::RoomTarget;
pub use config::{ConfigError, TokenConfig};
pub use error::{AuthError, Result};
pub use keys::PublicKeyResolver;
pub use session::SessionState;
pub use token::{Audience, TokenClaims, TokenContext};

use jsonwebtoken::DecodingKey;

/// Where verification key material comes from.
enum KeySource {
    /// Static shared secret (HMAC).
    Secret(String),
    /// Per-key public keys fetched from a remote server (ASAP).
    Remote(PublicKeyResolver),
}

/// The token authentication service.
///
/// Owns its configuration and key cache; independent instances are fully
/// isolated from each other.
pub struct TokenAuthenticator {
    config: TokenConfig,
    keys: KeySource,
}

impl TokenAuthenticator {
    /// Build an authenticator from a configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the configuration does not validate;
    /// see [`TokenConfig::validated`].
    pub fn new(config: TokenConfig) -> std::result::Result<Self, ConfigError> {
        let config = config.validated()?;
        let keys = if let Some(secret) = config.app_secret.clone() {
            KeySource::Secret(secret)
        } else if let Some(server) = config.asap_key_server.clone() {
            KeySource::Remote(PublicKeyResolver::new(
                server,
                config.jwt_pubkey_cache_size,
            ))
        } else {
            return Err(ConfigError::MissingKeySource);
        };
        Ok(Self { config, keys })
    }

    /// The validated configuration this instance runs with.
    #[must_use]
    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Authenticate the token presented on `session`.
    ///
    /// With no token, the session is accepted iff `allow_empty_token` is
    /// set. Otherwise the verification key is selected (static secret, or a
    /// public key resolved via the `kid` token header), the token is
    /// verified, and the accepted claims are bound onto the session.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] carrying the rejection reason. No session
    /// fields are written on failure.
    pub async fn authenticate(&self, session: &mut SessionState) -> Result<()> {
        let Some(auth_token) = session.auth_token.clone() else {
            if self.config.allow_empty_token {
                tracing::debug!("no token presented, accepted by policy");
                return Ok(());
            }
            return Err(AuthError::TokenRequired);
        };

        let claims = match &self.keys {
            KeySource::Secret(secret) => token::verify(
                &auth_token,
                &DecodingKey::from_secret(secret.as_bytes()),
                token::HMAC_ALGORITHMS,
                &self.config,
            )?,
            KeySource::Remote(resolver) => {
                let header = token::peek_header(&auth_token)?;
                let kid = header.kid.ok_or(AuthError::MissingKeyId)?;
                let pem = resolver.resolve(&kid).await.map_err(|e| {
                    tracing::warn!(%kid, error = %e, "public key resolution failed");
                    AuthError::PublicKeyUnavailable
                })?;
                let key = DecodingKey::from_rsa_pem(pem.as_bytes())
                    .map_err(|e| AuthError::InvalidPublicKey(e.to_string()))?;
                token::verify(&auth_token, &key, token::RSA_ALGORITHMS, &self.config)?
            }
        };

        tracing::debug!(
            room = claims.room.as_deref().unwrap_or_default(),
            domain = claims.sub.as_deref().unwrap_or_default(),
            "token accepted"
        );
        session.bind_claims(&claims);
        Ok(())
    }

    /// Decide whether `session` may join the room at `room_address`.
    ///
    /// The answer is a bare boolean; rejection reasons are logged but not
    /// reported to the remote party.
    #[must_use]
    pub fn authorize_room(&self, session: &SessionState, room_address: &str) -> bool {
        authz::authorize(&self.config, session, room_address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_invalid_config() {
        assert!(TokenAuthenticator::new(TokenConfig::new("myapp")).is_err());
    }

    #[test]
    fn new_accepts_secret_config() {
        let mut config = TokenConfig::new("myapp");
        config.app_secret = Some("secret".to_string());
        let authenticator = TokenAuthenticator::new(config).unwrap();
        assert_eq!(authenticator.config().app_id, "myapp");
    }

    #[tokio::test]
    async fn empty_token_accepted_only_by_policy() {
        let mut config = TokenConfig::new("myapp");
        config.app_secret = Some("secret".to_string());
        config.allow_empty_token = true;
        let authenticator = TokenAuthenticator::new(config).unwrap();

        let mut session = SessionState::default();
        authenticator.authenticate(&mut session).await.unwrap();
        assert_eq!(session.authorized_room, None);

        let mut config = TokenConfig::new("myapp");
        config.app_secret = Some("secret".to_string());
        let strict = TokenAuthenticator::new(config).unwrap();
        let err = strict
            .authenticate(&mut SessionState::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenRequired));
    }
}
