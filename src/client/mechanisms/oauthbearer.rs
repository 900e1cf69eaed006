//! Provides the client side of the SASL "OAUTHBEARER" mechanism (RFC 7628).

use crate::client::Mechanism;
use crate::common::{Credentials, Secret, SingleMessage};
use crate::error::Error;

/// A struct for authenticating with an OAuth 2.0 bearer token.
pub struct OAuthBearer {
    inner: SingleMessage,
}

impl OAuthBearer {
    /// The registered name of this mechanism.
    pub const NAME: &'static str = "OAUTHBEARER";

    /// Constructs a new struct for authenticating using the SASL OAUTHBEARER
    /// mechanism. The `host` and `port` fields are omitted from the message
    /// when empty and zero respectively.
    pub fn new<A, T, H>(authz: A, token: T, host: H, port: u16) -> OAuthBearer
    where
        A: Into<String>,
        T: Into<Vec<u8>>,
        H: Into<String>,
    {
        let authz = authz.into();
        let host = host.into();
        let mut ir = Vec::new();
        ir.extend(b"n,");
        if !authz.is_empty() {
            ir.extend(b"a=");
            ir.extend(authz.into_bytes());
        }
        ir.push(b',');
        if !host.is_empty() {
            ir.extend(b"\x01host=");
            ir.extend(host.into_bytes());
        }
        if port != 0 {
            ir.extend(b"\x01port=");
            ir.extend(port.to_string().into_bytes());
        }
        ir.extend(b"\x01auth=Bearer ");
        ir.extend(token.into());
        ir.extend(b"\x01\x01");
        OAuthBearer {
            inner: SingleMessage::new(ir),
        }
    }
}

impl Mechanism for OAuthBearer {
    fn name(&self) -> &str {
        OAuthBearer::NAME
    }

    fn from_credentials(credentials: Credentials) -> Result<OAuthBearer, Error> {
        if let Secret::Token { token, host, port } = credentials.secret {
            Ok(OAuthBearer::new(
                credentials.authzid.unwrap_or_default(),
                token,
                host,
                port,
            ))
        } else {
            Err(Error::MissingCredentials)
        }
    }

    fn step(&mut self, input: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        self.inner.step(input)
    }
}
