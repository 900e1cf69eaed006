//! Provides the client side of the SASL "ANONYMOUS" mechanism (RFC 4505).

use crate::client::Mechanism;
use crate::common::prep::trace_prep;
use crate::common::{Credentials, Identity, SingleMessage};
use crate::error::Error;

/// A struct for authenticating anonymously, optionally leaving a trace
/// string for the server's records.
pub struct Anonymous {
    inner: SingleMessage,
}

impl Anonymous {
    /// The registered name of this mechanism.
    pub const NAME: &'static str = "ANONYMOUS";

    /// Constructs a new struct for authenticating using the SASL ANONYMOUS
    /// mechanism. Returns an error when the trace string contains prohibited
    /// characters or violates the bidirectional rules of RFC 4505 section 3.
    pub fn new(trace: &str) -> Result<Anonymous, Error> {
        let trace = trace_prep(trace)?;
        Ok(Anonymous {
            inner: SingleMessage::new(trace.into_bytes()),
        })
    }
}

impl Mechanism for Anonymous {
    fn name(&self) -> &str {
        Anonymous::NAME
    }

    fn from_credentials(credentials: Credentials) -> Result<Anonymous, Error> {
        match credentials.identity {
            Identity::Username(trace) => Anonymous::new(&trace),
            Identity::None => Anonymous::new(""),
        }
    }

    fn step(&mut self, input: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        self.inner.step(input)
    }
}
