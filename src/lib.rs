#![deny(missing_docs)]

//! This crate provides client-side and server-side implementations of the
//! SASL mechanisms ANONYMOUS, EXTERNAL, PLAIN, OAUTHBEARER,
//! ECDSA-NIST256P-CHALLENGE, SCRAM-SHA-1 and SCRAM-SHA-256.
//!
//! The crate is transport-agnostic: it consumes and produces opaque byte
//! messages and leaves wire framing to the surrounding protocol. Every
//! mechanism here is client-first, so a client drives the first message by
//! stepping with an empty input:
//!
//! ```rust
//! use saslkit::client::mechanisms::Plain;
//! use saslkit::client::Mechanism;
//! use saslkit::Credentials;
//!
//! let creds = Credentials::default()
//!     .with_username("user")
//!     .with_password("pencil");
//!
//! let mut mechanism = Plain::from_credentials(creds).unwrap();
//!
//! let initial_data = mechanism.step(b"").unwrap();
//!
//! assert_eq!(initial_data, Some(b"\0user\0pencil".to_vec()));
//! ```
//!
//! A server-side mechanism is constructed around an authenticator, the
//! application's hook into credential storage, and reports its result
//! through [`server::Mechanism::outcome`]. The tests of
//! `server/mechanisms/scram.rs` demonstrate complete exchanges.

pub mod client;
pub mod common;
mod error;
pub mod server;

pub use crate::common::{Credentials, Identity, Secret};
pub use crate::error::Error;
pub use crate::server::Outcome;

#[cfg(feature = "scram")]
pub use crate::common::{Password, ScramCredentials};
