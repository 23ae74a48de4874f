//! Authentication error types.

use thiserror::Error;

/// A result type using `AuthError`.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur while authenticating a token.
///
/// Each rejection carries its own display string so that log lines and test
/// assertions can tell the failure modes apart.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No token was presented and empty tokens are not allowed.
    #[error("token required")]
    TokenRequired,

    /// The token header does not carry a `kid` field, but a remote key
    /// server is configured.
    #[error("'kid' claim is missing")]
    MissingKeyId,

    /// The public key named by the token's `kid` could not be resolved.
    #[error("could not obtain public key")]
    PublicKeyUnavailable,

    /// The resolved key material could not be parsed as a public key.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// The token's `alg` header is empty or `none`.
    #[error("'alg' claim is not allowed: '{0}'")]
    ForbiddenAlgorithm(String),

    /// A required claim is missing from the token payload.
    #[error("'{0}' claim is missing")]
    MissingClaim(&'static str),

    /// The `iss` claim is not an accepted issuer.
    #[error("invalid issuer '{0}'")]
    InvalidIssuer(String),

    /// The `aud` claim is not an accepted audience.
    #[error("invalid audience '{0}'")]
    InvalidAudience(String),

    /// The token signature does not verify against the selected key.
    #[error("invalid signature")]
    InvalidSignature,

    /// The token's `exp` claim is in the past.
    #[error("token expired")]
    TokenExpired,

    /// The token could not be decoded at all.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The key server did not answer within the fetch deadline.
    #[error("public key fetch timed out")]
    KeyFetchTimeout,

    /// The key server answered with an error or could not be reached.
    #[error("public key fetch failed: {0}")]
    KeyFetchFailed(String),

    /// No key material exists for the given key ID.
    #[error("key not found: {0}")]
    KeyNotFound(String),
}
