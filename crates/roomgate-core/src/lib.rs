//! Core address types for roomgate.
//!
//! This crate provides the JID-style address type shared by the roomgate
//! services: a `local@domain/resource` identifier with the usual split /
//! join / bare operations.
//!
//! # Example
//!
//! ```
//! use roomgate_core::Jid;
//!
//! let jid: Jid = "myroom@conference.example.com/laptop".parse().unwrap();
//! assert_eq!(jid.node(), Some("myroom"));
//! assert_eq!(jid.domain(), "conference.example.com");
//! assert_eq!(jid.bare(), "myroom@conference.example.com");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod jid;

pub use jid::{Jid, JidError};
