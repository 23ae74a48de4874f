//! Token decoding and claim validation.
//!
//! Signature verification is delegated to `jsonwebtoken`; tokens are never
//! decoded without verification. After the signature is accepted, claims are
//! checked in a fixed order (algorithm, issuer, room, audience), stopping at
//! the first failure so every rejection carries a single precise reason.

use base64::prelude::*;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::config::TokenConfig;
use crate::error::{AuthError, Result};

/// Algorithms accepted for tokens signed with the static shared secret.
pub(crate) const HMAC_ALGORITHMS: &[Algorithm] =
    &[Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Algorithms accepted for tokens verified with ASAP public keys.
pub(crate) const RSA_ALGORITHMS: &[Algorithm] =
    &[Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];

/// The `aud` claim, which may be a single value or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// A single audience string.
    Single(String),
    /// Several audience strings.
    Multiple(Vec<String>),
}

impl Audience {
    /// Iterate over the audience values.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        match self {
            Self::Single(s) => std::slice::from_ref(s),
            Self::Multiple(v) => v.as_slice(),
        }
        .iter()
        .map(String::as_str)
    }

    fn display(&self) -> String {
        self.values().collect::<Vec<_>>().join(",")
    }
}

/// Structured `context` claim, passed through to the session unexamined.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenContext {
    /// Opaque user descriptor.
    #[serde(default)]
    pub user: Option<serde_json::Value>,
    /// Opaque group descriptor.
    #[serde(default)]
    pub group: Option<serde_json::Value>,
    /// Opaque feature flags.
    #[serde(default)]
    pub features: Option<serde_json::Value>,
}

/// Claims carried by an accepted token.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// Issuer.
    #[serde(default)]
    pub iss: Option<String>,
    /// Audience.
    #[serde(default)]
    pub aud: Option<Audience>,
    /// Authorized domain (tenant).
    #[serde(default)]
    pub sub: Option<String>,
    /// Authorized room name, possibly the wildcard `*`.
    #[serde(default)]
    pub room: Option<String>,
    /// Opaque context passed through to the session.
    #[serde(default)]
    pub context: Option<TokenContext>,
}

/// The decoded (but not yet verified) JOSE header of a compact token.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenHeader {
    /// Signing algorithm name, verbatim.
    #[serde(default)]
    pub alg: Option<String>,
    /// Key ID naming the verification key.
    #[serde(default)]
    pub kid: Option<String>,
}

/// Decode the first segment of a compact token as base64url JSON.
///
/// This only reads the header; nothing here is trusted until the signature
/// has been verified.
pub(crate) fn peek_header(token: &str) -> Result<TokenHeader> {
    let segment = token
        .split('.')
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AuthError::MalformedToken("empty header segment".to_string()))?;

    let raw = BASE64_URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| AuthError::MalformedToken(format!("header is not base64url: {e}")))?;

    serde_json::from_slice(&raw)
        .map_err(|e| AuthError::MalformedToken(format!("header is not JSON: {e}")))
}

/// Verify `token` against `key` and validate its claims.
///
/// The `alg` header is checked first: `none` and the empty string are
/// rejected outright, independent of what the underlying library would
/// accept. `exp` is enforced when present (with the library's default
/// leeway) but is not required.
pub(crate) fn verify(
    token: &str,
    key: &DecodingKey,
    algorithms: &[Algorithm],
    config: &TokenConfig,
) -> Result<TokenClaims> {
    let header = peek_header(token)?;
    let alg = header.alg.unwrap_or_default();
    if alg.is_empty() || alg == "none" {
        return Err(AuthError::ForbiddenAlgorithm(alg));
    }

    let mut validation = Validation::new(algorithms[0]);
    validation.algorithms = algorithms.to_vec();
    validation.set_required_spec_claims::<&str>(&[]);
    validation.validate_exp = true;
    // Issuer and audience are checked manually below to produce
    // per-claim rejection reasons.
    validation.validate_aud = false;

    let token_data = decode::<TokenClaims>(token, key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        _ => AuthError::MalformedToken(e.to_string()),
    })?;
    let claims = token_data.claims;

    let Some(iss) = &claims.iss else {
        return Err(AuthError::MissingClaim("iss"));
    };
    if !config.asap_accepted_issuers.iter().any(|i| i == iss) {
        tracing::warn!(%iss, "token rejected: issuer not accepted");
        return Err(AuthError::InvalidIssuer(iss.clone()));
    }

    if claims.room.as_deref().map_or(true, str::is_empty) {
        return Err(AuthError::MissingClaim("room"));
    }

    let Some(aud) = &claims.aud else {
        return Err(AuthError::MissingClaim("aud"));
    };
    let wildcard = config.asap_accepted_audiences.iter().any(|a| a == "*");
    let matched = aud
        .values()
        .any(|v| config.asap_accepted_audiences.iter().any(|a| a == v));
    if !wildcard && !matched {
        tracing::warn!(aud = %aud.display(), "token rejected: audience not accepted");
        return Err(AuthError::InvalidAudience(aud.display()));
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "unit-test-secret";

    fn config() -> TokenConfig {
        let mut config = TokenConfig::new("myapp");
        config.app_secret = Some(SECRET.to_string());
        config.validated().unwrap()
    }

    fn exp() -> i64 {
        chrono::Utc::now().timestamp() + 600
    }

    fn sign(claims: &serde_json::Value) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn secret_key() -> DecodingKey {
        DecodingKey::from_secret(SECRET.as_bytes())
    }

    #[test]
    fn accepts_valid_token() {
        let token = sign(&json!({
            "iss": "myapp", "aud": "anyone", "sub": "example.com",
            "room": "myroom", "exp": exp(),
        }));
        let claims = verify(&token, &secret_key(), HMAC_ALGORITHMS, &config()).unwrap();
        assert_eq!(claims.room.as_deref(), Some("myroom"));
        assert_eq!(claims.sub.as_deref(), Some("example.com"));
    }

    #[test]
    fn rejects_unknown_issuer() {
        let token = sign(&json!({
            "iss": "other", "aud": "x", "room": "r", "exp": exp(),
        }));
        let err = verify(&token, &secret_key(), HMAC_ALGORITHMS, &config()).unwrap_err();
        assert!(matches!(err, AuthError::InvalidIssuer(iss) if iss == "other"));
    }

    #[test]
    fn rejects_missing_issuer() {
        let token = sign(&json!({ "aud": "x", "room": "r", "exp": exp() }));
        let err = verify(&token, &secret_key(), HMAC_ALGORITHMS, &config()).unwrap_err();
        assert!(matches!(err, AuthError::MissingClaim("iss")));
    }

    #[test]
    fn rejects_missing_room() {
        let token = sign(&json!({ "iss": "myapp", "aud": "x", "exp": exp() }));
        let err = verify(&token, &secret_key(), HMAC_ALGORITHMS, &config()).unwrap_err();
        assert!(matches!(err, AuthError::MissingClaim("room")));
    }

    #[test]
    fn wildcard_room_claim_is_structurally_valid() {
        let token = sign(&json!({
            "iss": "myapp", "aud": "x", "room": "*", "exp": exp(),
        }));
        let claims = verify(&token, &secret_key(), HMAC_ALGORITHMS, &config()).unwrap();
        assert_eq!(claims.room.as_deref(), Some("*"));
    }

    #[test]
    fn rejects_missing_audience() {
        let token = sign(&json!({ "iss": "myapp", "room": "r", "exp": exp() }));
        let err = verify(&token, &secret_key(), HMAC_ALGORITHMS, &config()).unwrap_err();
        assert!(matches!(err, AuthError::MissingClaim("aud")));
    }

    #[test]
    fn wildcard_accepted_audience_accepts_anything() {
        // The default accepted-audiences list is ["*"].
        let token = sign(&json!({
            "iss": "myapp", "aud": "whatever", "room": "r", "exp": exp(),
        }));
        assert!(verify(&token, &secret_key(), HMAC_ALGORITHMS, &config()).is_ok());
    }

    #[test]
    fn explicit_audience_list_requires_exact_match() {
        let mut config = TokenConfig::new("myapp");
        config.app_secret = Some(SECRET.to_string());
        config.asap_accepted_audiences = vec!["roomgate".to_string()];
        let config = config.validated().unwrap();

        let good = sign(&json!({
            "iss": "myapp", "aud": "roomgate", "room": "r", "exp": exp(),
        }));
        assert!(verify(&good, &secret_key(), HMAC_ALGORITHMS, &config).is_ok());

        let bad = sign(&json!({
            "iss": "myapp", "aud": "elsewhere", "room": "r", "exp": exp(),
        }));
        let err = verify(&bad, &secret_key(), HMAC_ALGORITHMS, &config).unwrap_err();
        assert!(matches!(err, AuthError::InvalidAudience(_)));
    }

    #[test]
    fn audience_array_matches_any_member() {
        let mut config = TokenConfig::new("myapp");
        config.app_secret = Some(SECRET.to_string());
        config.asap_accepted_audiences = vec!["roomgate".to_string()];
        let config = config.validated().unwrap();

        let token = sign(&json!({
            "iss": "myapp", "aud": ["other", "roomgate"], "room": "r", "exp": exp(),
        }));
        assert!(verify(&token, &secret_key(), HMAC_ALGORITHMS, &config).is_ok());
    }

    #[test]
    fn rejects_alg_none_header() {
        // Hand-built unsigned token with alg "none"; the signature check
        // must never be reached.
        let header = BASE64_URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = BASE64_URL_SAFE_NO_PAD
            .encode(br#"{"iss":"myapp","aud":"x","room":"r"}"#);
        let token = format!("{header}.{payload}.");
        let err = verify(&token, &secret_key(), HMAC_ALGORITHMS, &config()).unwrap_err();
        assert!(matches!(err, AuthError::ForbiddenAlgorithm(alg) if alg == "none"));
    }

    #[test]
    fn rejects_empty_alg_header() {
        let header = BASE64_URL_SAFE_NO_PAD.encode(br#"{"alg":"","typ":"JWT"}"#);
        let token = format!("{header}.e30.");
        let err = verify(&token, &secret_key(), HMAC_ALGORITHMS, &config()).unwrap_err();
        assert!(matches!(err, AuthError::ForbiddenAlgorithm(alg) if alg.is_empty()));
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = sign(&json!({
            "iss": "myapp", "aud": "x", "room": "r", "exp": exp(),
        }));
        let err = verify(
            &token,
            &DecodingKey::from_secret(b"a different secret"),
            HMAC_ALGORITHMS,
            &config(),
        )
        .unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature));
    }

    #[test]
    fn rejects_expired_token() {
        let token = sign(&json!({
            "iss": "myapp", "aud": "x", "room": "r",
            // Beyond the default 60 second leeway.
            "exp": chrono::Utc::now().timestamp() - 120,
        }));
        let err = verify(&token, &secret_key(), HMAC_ALGORITHMS, &config()).unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[test]
    fn rejects_garbage() {
        let err = verify("not-a-token", &secret_key(), HMAC_ALGORITHMS, &config()).unwrap_err();
        assert!(matches!(err, AuthError::MalformedToken(_)));
    }

    #[test]
    fn peek_header_extracts_kid() {
        let token = encode(
            &Header {
                kid: Some("key-7".to_string()),
                ..Header::default()
            },
            &json!({ "room": "r" }),
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        let header = peek_header(&token).unwrap();
        assert_eq!(header.kid.as_deref(), Some("key-7"));
        assert_eq!(header.alg.as_deref(), Some("HS256"));
    }
}
