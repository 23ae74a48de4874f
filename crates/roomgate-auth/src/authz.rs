//! Room authorization matching.
//!
//! Reconciles the room a session is authorized for (bound from token claims)
//! with the room address actually being joined. With domain verification
//! enabled, room addresses use the multidomain convention where a virtual
//! subdomain is embedded in the room's local part as `[subdomain]room`.
//!
//! The matcher only answers yes or no; the reason for a rejection is logged
//! but never surfaced to the remote party.

use roomgate_core::Jid;

use crate::config::TokenConfig;
use crate::session::SessionState;

/// A room-local identifier parsed against the `[subdomain]room` convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomTarget<'a> {
    /// A plain room name without an embedded subdomain.
    Plain(&'a str),
    /// A room name scoped to a virtual subdomain.
    Scoped {
        /// The embedded tenant subdomain.
        subdomain: &'a str,
        /// The room name proper.
        room: &'a str,
    },
}

impl<'a> RoomTarget<'a> {
    /// Parse a room-local identifier. Only a leading `[subdomain]` with a
    /// non-empty subdomain and a non-empty remainder counts as scoped;
    /// anything else is a plain room name.
    #[must_use]
    pub fn parse(local: &'a str) -> Self {
        if let Some(rest) = local.strip_prefix('[') {
            if let Some((subdomain, room)) = rest.split_once(']') {
                if !subdomain.is_empty() && !room.is_empty() {
                    return Self::Scoped { subdomain, room };
                }
            }
        }
        Self::Plain(local)
    }
}

/// Decide whether `session` may join the room at `room_address`.
///
/// Comparisons are case-insensitive on the authorized side only: expectation
/// strings are composed from the lower-cased authorized room, while the
/// presented address keeps its case.
pub(crate) fn authorize(
    config: &TokenConfig,
    session: &SessionState,
    room_address: &str,
) -> bool {
    if config.allow_empty_token && session.auth_token.is_none() {
        return true;
    }

    // A room address we cannot take a local part from is out of scope for
    // token authorization; a downstream component decides.
    let Ok(jid) = room_address.parse::<Jid>() else {
        tracing::debug!(%room_address, "unparseable room address, delegating authorization");
        return true;
    };
    let Some(room) = jid.node() else {
        tracing::debug!(%room_address, "room address has no local part, delegating authorization");
        return true;
    };

    if !config.enable_domain_verification {
        return match session.authorized_room.as_deref() {
            // Anonymous session, no room claim bound.
            None => true,
            Some("*") => true,
            Some(authorized) => authorized.eq_ignore_ascii_case(room),
        };
    }

    let target = RoomTarget::parse(room);

    // A wildcard authorization defers to the room actually requested.
    let room_to_check = match session.authorized_room.as_deref() {
        Some("*") => Some(match target {
            RoomTarget::Scoped { room, .. } | RoomTarget::Plain(room) => room,
        }),
        Some(authorized) => Some(authorized),
        None => None,
    };
    let Some(room_to_check) = room_to_check else {
        return config.allow_empty_token;
    };
    let Some(domain) = session.authorized_domain.as_deref() else {
        tracing::warn!(%room_address, "no authorized domain bound, rejecting");
        return false;
    };

    let bare = jid.bare();
    match target {
        RoomTarget::Scoped { .. } => {
            if config.muc_mapper_domain_base.is_none() {
                tracing::warn!(
                    %room_address,
                    "scoped room address but 'muc_mapper_domain_base' is not configured"
                );
                return false;
            }
            let Some(muc_domain) = config.muc_domain() else {
                return false;
            };
            let node = format!("[{domain}]{}", room_to_check.to_lowercase());
            Jid::join(&node, muc_domain) == bare
        }
        RoomTarget::Plain(_) => {
            let muc_domain = format!("{}.{domain}", config.muc_mapper_domain_prefix);
            Jid::join(&room_to_check.to_lowercase(), &muc_domain) == bare
        }
    }
}
