//! Provides the client side of the SASL "EXTERNAL" mechanism (RFC 4422,
//! appendix A).

use crate::client::Mechanism;
use crate::common::{Credentials, Secret, SingleMessage};
use crate::error::Error;

/// A struct for authenticating through credentials the transport already
/// established, such as a TLS client certificate.
pub struct External {
    inner: SingleMessage,
}

impl External {
    /// The registered name of this mechanism.
    pub const NAME: &'static str = "EXTERNAL";

    /// Constructs a new struct for authenticating using the SASL EXTERNAL
    /// mechanism, requesting the given authorization identity. Pass an
    /// empty string to let the server derive one.
    pub fn new<A: Into<String>>(authz: A) -> External {
        External {
            inner: SingleMessage::new(authz.into().into_bytes()),
        }
    }
}

impl Mechanism for External {
    fn name(&self) -> &str {
        External::NAME
    }

    fn from_credentials(credentials: Credentials) -> Result<External, Error> {
        if let Secret::None = credentials.secret {
            Ok(External::new(credentials.authzid.unwrap_or_default()))
        } else {
            Err(Error::MissingCredentials)
        }
    }

    fn step(&mut self, input: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        self.inner.step(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requested_authz_is_the_message() {
        let mut mechanism = External::new("admin");
        assert_eq!(mechanism.step(b"").unwrap(), Some(b"admin".to_vec()));
        assert!(matches!(mechanism.step(b""), Err(Error::InvalidState)));
    }

    #[test]
    fn empty_authz_sends_empty_message() {
        let mut mechanism = External::new("");
        assert_eq!(mechanism.step(b"").unwrap(), Some(Vec::new()));
    }
}
