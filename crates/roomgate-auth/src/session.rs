//! Session state touched by authentication.
//!
//! The host owns the real session object; this struct is the fixed set of
//! fields the authenticator reads and writes on it. Claims are projected
//! onto it once per successful verification and read back at join time by
//! the room matcher.

use serde_json::Value;

use crate::token::TokenClaims;

/// Authentication-related session fields.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// The token presented by the client, if any.
    pub auth_token: Option<String>,
    /// Room name the token authorizes, possibly the wildcard `*`.
    pub authorized_room: Option<String>,
    /// Domain (tenant) the token authorizes, from the `sub` claim.
    pub authorized_domain: Option<String>,
    /// Opaque `context.user` claim.
    pub context_user: Option<Value>,
    /// Opaque `context.group` claim.
    pub context_group: Option<Value>,
    /// Opaque `context.features` claim.
    pub context_features: Option<Value>,
}

impl SessionState {
    /// Create a session presenting the given token.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            auth_token: Some(token.into()),
            ..Self::default()
        }
    }

    /// Project accepted claims onto the session. Fields absent from the
    /// claims are left untouched.
    pub(crate) fn bind_claims(&mut self, claims: &TokenClaims) {
        if let Some(room) = &claims.room {
            self.authorized_room = Some(room.clone());
        }
        if let Some(sub) = &claims.sub {
            self.authorized_domain = Some(sub.clone());
        }
        if let Some(context) = &claims.context {
            if let Some(user) = &context.user {
                self.context_user = Some(user.clone());
            }
            if let Some(group) = &context.group {
                self.context_group = Some(group.clone());
            }
            if let Some(features) = &context.features {
                self.context_features = Some(features.clone());
            }
        }
    }
}
