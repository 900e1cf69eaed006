//! Provides the server side of the SASL "EXTERNAL" mechanism (RFC 4422,
//! appendix A).

use crate::error::Error;
use crate::server::{Mechanism, Outcome};

/// Implemented by the application to map transport-level credentials to an
/// authorization identity.
pub trait ExternalAuthenticator {
    /// Derives an authorization identity from external sources. Only called
    /// when the client did not request one. Return `None` when no identity
    /// can be derived.
    fn derive_authz(&self) -> Option<String>;

    /// Whether the externally authenticated peer may act as `authz`.
    fn authorize(&self, authz: &str) -> bool;
}

/// A struct for accepting logins backed by credentials the transport
/// already verified.
pub struct External<A: ExternalAuthenticator> {
    auth: A,
    outcome: Outcome,
}

impl<A: ExternalAuthenticator> External<A> {
    /// Constructs a new server-side struct for the SASL EXTERNAL mechanism.
    pub fn new(auth: A) -> External<A> {
        External {
            auth,
            outcome: Outcome::InProgress,
        }
    }

    fn validate(&self, ir: &[u8]) -> Result<String, Error> {
        let authz = std::str::from_utf8(ir).map_err(|_| Error::InvalidMessage)?;
        let authz = if authz.is_empty() {
            self.auth
                .derive_authz()
                .ok_or(Error::AuthenticationFailed)?
        } else {
            authz.to_owned()
        };
        if !self.auth.authorize(&authz) {
            return Err(Error::Unauthorized);
        }
        Ok(authz)
    }
}

impl<A: ExternalAuthenticator> Mechanism for External<A> {
    fn name(&self) -> &str {
        "EXTERNAL"
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
                log::debug!("EXTERNAL exchange failed: {}", err);
                self.outcome = Outcome::Failure;
                Err(err)
            }
        }
    }

    fn outcome(&self) -> &Outcome {
        &self.outcome
    }
}
