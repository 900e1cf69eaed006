//! Provides the server side of the SASL "PLAIN" mechanism (RFC 4616).

use crate::common::prep::saslprep;
use crate::error::Error;
use crate::server::{Mechanism, Outcome};

/// Implemented by the application to verify passwords and authorize
/// identities for the PLAIN mechanism.
pub trait PlainAuthenticator {
    /// Whether the supplied combination of authentication identity and
    /// password is valid.
    fn verify_passwd(&self, authn: &str, passwd: &[u8]) -> bool;

    /// Derives an authorization identity from an authentication identity.
    /// Only called when the client did not request one. Return `None` when
    /// no identity can be derived.
    fn derive_authz(&self, authn: &str) -> Option<String>;

    /// Whether `authn` may act as `authz`.
    fn authorize(&self, authz: &str, authn: &str) -> bool;
}

/// A struct for accepting plaintext password logins.
pub struct Plain<A: PlainAuthenticator> {
    auth: A,
    outcome: Outcome,
}

impl<A: PlainAuthenticator> Plain<A> {
    /// Constructs a new server-side struct for the SASL PLAIN mechanism.
    pub fn new(auth: A) -> Plain<A> {
        Plain {
            auth,
            outcome: Outcome::InProgress,
        }
    }

    fn validate(&self, ir: &[u8]) -> Result<String, Error> {
        let mut fields = ir.splitn(3, |&b| b == 0);
        let authz = fields.next().ok_or(Error::InvalidMessage)?;
        let authn = fields.next().ok_or(Error::InvalidMessage)?;
        let passwd = fields.next().ok_or(Error::InvalidMessage)?;

        let authz =
            String::from_utf8(authz.to_vec()).map_err(|_| Error::InvalidMessage)?;
        let authn = std::str::from_utf8(authn).map_err(|_| Error::InvalidMessage)?;
        let authn = saslprep(authn).map_err(|_| Error::InvalidMessage)?;
        let passwd = std::str::from_utf8(passwd).map_err(|_| Error::InvalidMessage)?;
        let passwd = saslprep(passwd).map_err(|_| Error::InvalidMessage)?;

        if !self.auth.verify_passwd(&authn, passwd.as_bytes()) {
            return Err(Error::AuthenticationFailed);
        }
        let authz = if authz.is_empty() {
            self.auth
                .derive_authz(&authn)
                .ok_or(Error::AuthenticationFailed)?
        } else {
            authz
        };
        if !self.auth.authorize(&authz, &authn) {
            return Err(Error::Unauthorized);
        }
        Ok(authz)
    }
}

impl<A: PlainAuthenticator> Mechanism for Plain<A> {
    fn name(&self) -> &str {
        "PLAIN"
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
                log::debug!("PLAIN exchange failed: {}", err);
                self.outcome = Outcome::Failure;
                Err(err)
            }
        }
    }

    fn outcome(&self) -> &Outcome {
        &self.outcome
    }
}
