//! Provides the server side of the SASL "ANONYMOUS" mechanism (RFC 4505).

use crate::common::prep::trace_prep;
use crate::error::Error;
use crate::server::{Mechanism, Outcome};

/// Implemented by the application to record trace strings left by
/// anonymous clients.
pub trait AnonymousAuthenticator {
    /// Called with the prepared trace string. Not called when the client
    /// did not provide one.
    fn store_trace(&mut self, trace: &str);
}

/// A struct for accepting anonymous logins under a fixed authorization
/// identity.
pub struct Anonymous<A: AnonymousAuthenticator> {
    authz: String,
    auth: A,
    outcome: Outcome,
}

impl<A: AnonymousAuthenticator> Anonymous<A> {
    /// Constructs a new server-side struct for the SASL ANONYMOUS
    /// mechanism. Every successful exchange results in the given `authz`.
    pub fn new<Z: Into<String>>(authz: Z, auth: A) -> Anonymous<A> {
        Anonymous {
            authz: authz.into(),
            auth,
            outcome: Outcome::InProgress,
        }
    }

    fn validate(&mut self, ir: &[u8]) -> Result<String, Error> {
        let trace = std::str::from_utf8(ir).map_err(|_| Error::InvalidMessage)?;
        let trace = trace_prep(trace)?;
        if !trace.is_empty() {
            self.auth.store_trace(&trace);
        }
        Ok(std::mem::take(&mut self.authz))
    }
}

impl<A: AnonymousAuthenticator> Mechanism for Anonymous<A> {
    fn name(&self) -> &str {
        "ANONYMOUS"
    }

    fn step(&mut self, input: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        if self.outcome.is_completed() {
            return Err(Error::InvalidState);
        }
        match self.validate(input) {
            Ok(authz) => {
                self.outcome = Outcome::Success { authz };
                Ok(None)
            }
            Err(err) => {
                log::debug!("ANONYMOUS exchange failed: {}", err);
                self.outcome = Outcome::Failure;
                Err(err)
            }
        }
    }

    fn outcome(&self) -> &Outcome {
        &self.outcome
    }
}
