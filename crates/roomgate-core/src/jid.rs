//! JID-style address parsing and composition.
//!
//! Addresses have the shape `local@domain/resource`, where both the local
//! part (node) and the resource are optional. No stringprep profile is
//! applied; the parts are kept exactly as presented.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors produced when parsing an address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JidError {
    /// The input was empty.
    #[error("empty address")]
    Empty,

    /// The domain part was empty (e.g. `room@` or `room@/res`).
    #[error("address has an empty domain")]
    EmptyDomain,

    /// An `@` was present but the node before it was empty.
    #[error("address has an empty node")]
    EmptyNode,

    /// A `/` was present but the resource after it was empty.
    #[error("address has an empty resource")]
    EmptyResource,
}

/// A parsed `local@domain/resource` address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Jid {
    node: Option<String>,
    domain: String,
    resource: Option<String>,
}

impl Jid {
    /// Compose a bare address string from a node and a domain.
    #[must_use]
    pub fn join(node: &str, domain: &str) -> String {
        format!("{node}@{domain}")
    }

    /// The local part, if any.
    #[must_use]
    pub fn node(&self) -> Option<&str> {
        self.node.as_deref()
    }

    /// The domain part.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The resource part, if any.
    #[must_use]
    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    /// The address without its resource, as a string.
    #[must_use]
    pub fn bare(&self) -> String {
        match &self.node {
            Some(node) => format!("{node}@{}", self.domain),
            None => self.domain.clone(),
        }
    }
}

impl FromStr for Jid {
    type Err = JidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(JidError::Empty);
        }

        // Resource is everything after the first '/'; the node/domain split
        // only looks at the part before it.
        let (bare, resource) = match s.split_once('/') {
            Some((bare, resource)) => {
                if resource.is_empty() {
                    return Err(JidError::EmptyResource);
                }
                (bare, Some(resource.to_string()))
            }
            None => (s, None),
        };

        let (node, domain) = match bare.split_once('@') {
            Some((node, domain)) => {
                if node.is_empty() {
                    return Err(JidError::EmptyNode);
                }
                (Some(node.to_string()), domain)
            }
            None => (None, bare),
        };

        if domain.is_empty() {
            return Err(JidError::EmptyDomain);
        }

        Ok(Self {
            node,
            domain: domain.to_string(),
            resource,
        })
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(node) = &self.node {
            write!(f, "{node}@")?;
        }
        write!(f, "{}", self.domain)?;
        if let Some(resource) = &self.resource {
            write!(f, "/{resource}")?;
        }
        Ok(())
    }
}
