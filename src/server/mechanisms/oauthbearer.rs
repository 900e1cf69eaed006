//! Provides the server side of the SASL "OAUTHBEARER" mechanism (RFC 7628).

use crate::error::Error;
use crate::server::{Mechanism, Outcome};

/// Implemented by the application to verify bearer tokens and authorize
/// identities for the OAUTHBEARER mechanism.
pub trait OAuthBearerAuthenticator {
    /// Whether the supplied token is valid for the given host and port.
    /// `host` is empty and `port` is zero when the client did not provide
    /// them.
    fn verify_token(&self, token: &[u8], host: &str, port: u16) -> bool;

    /// Derives an authorization identity from a token. Only called when the
    /// client did not request one. Return `None` when no identity can be
    /// derived.
    fn derive_authz(&self, token: &[u8]) -> Option<String>;

    /// Whether the bearer of `token` may act as `authz`.
    fn authorize(&self, authz: &str, token: &[u8]) -> bool;
}

/// A struct for accepting OAuth 2.0 bearer token logins.
pub struct OAuthBearer<A: OAuthBearerAuthenticator> {
    auth: A,
    outcome: Outcome,
}

impl<A: OAuthBearerAuthenticator> OAuthBearer<A> {
    /// Constructs a new server-side struct for the SASL OAUTHBEARER
    /// mechanism.
    pub fn new(auth: A) -> OAuthBearer<A> {
        OAuthBearer {
            auth,
            outcome: Outcome::InProgress,
        }
    }

    fn validate(&self, ir: &[u8]) -> Result<String, Error> {
        let mut rest = ir.strip_prefix(b"n,").ok_or(Error::InvalidMessage)?;

        let mut authz = "";
        if let Some(value) = rest.strip_prefix(b"a=") {
            let comma = value
                .iter()
                .position(|&b| b == b',')
                .ok_or(Error::InvalidMessage)?;
            authz = std::str::from_utf8(&value[..comma]).map_err(|_| Error::InvalidMessage)?;
            rest = &value[comma + 1..];
        } else if let Some(after) = rest.strip_prefix(b",") {
            // Canonical gs2 header with an empty authzid.
            rest = after;
        }

        let mut host = "";
        if let Some(value) = rest.strip_prefix(b"\x01host=") {
            let delim = value
                .iter()
                .position(|&b| b == 1)
                .ok_or(Error::InvalidMessage)?;
            host = std::str::from_utf8(&value[..delim]).map_err(|_| Error::InvalidMessage)?;
            rest = &value[delim..];
        }

        let mut port = 0u16;
        if let Some(value) = rest.strip_prefix(b"\x01port=") {
            let delim = value
                .iter()
                .position(|&b| b == 1)
                .ok_or(Error::InvalidMessage)?;
            port = std::str::from_utf8(&value[..delim])
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or(Error::InvalidMessage)?;
            rest = &value[delim..];
        }

        let rest = rest
            .strip_prefix(b"\x01auth=")
            .ok_or(Error::InvalidMessage)?;
        let rest = rest.strip_prefix(b"Bearer ").ok_or(Error::InvalidMessage)?;
        let delim = rest
            .iter()
            .position(|&b| b == 1)
            .ok_or(Error::InvalidMessage)?;
        let token = &rest[..delim];
        if rest[delim..] != [1, 1] {
            return Err(Error::InvalidMessage);
        }

        if !self.auth.verify_token(token, host, port) {
            return Err(Error::AuthenticationFailed);
        }
        let authz = if authz.is_empty() {
            self.auth
                .derive_authz(token)
                .ok_or(Error::AuthenticationFailed)?
        } else {
            authz.to_owned()
        };
        if !self.auth.authorize(&authz, token) {
            return Err(Error::Unauthorized);
        }
        Ok(authz)
    }
}

impl<A: OAuthBearerAuthenticator> Mechanism for OAuthBearer<A> {
    fn name(&self) -> &str {
        "OAUTHBEARER"
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
                log::debug!("OAUTHBEARER exchange failed: {}", err);
                self.outcome = Outcome::Failure;
                Err(err)
            }
        }
    }

    fn outcome(&self) -> &Outcome {
        &self.outcome
    }
}
