//! Provides the client side of the SASL "PLAIN" mechanism (RFC 4616).

use crate::client::Mechanism;
use crate::common::{Credentials, Identity, Secret, SingleMessage};
use crate::error::Error;

/// A struct for authenticating with a plaintext password.
///
/// The password travels unprotected; only use this over a confidential
/// transport.
pub struct Plain {
    inner: SingleMessage,
}

impl Plain {
    /// The registered name of this mechanism.
    pub const NAME: &'static str = "PLAIN";

    /// Constructs a new struct for authenticating using the SASL PLAIN
    /// mechanism. Pass an empty `authz` to let the server derive the
    /// authorization identity from `authn`.
    pub fn new<A, N, P>(authz: A, authn: N, passwd: P) -> Plain
    where
        A: Into<String>,
        N: Into<String>,
        P: Into<Vec<u8>>,
    {
        let authz = authz.into();
        let authn = authn.into();
        let passwd = passwd.into();
        let mut ir = Vec::with_capacity(authz.len() + authn.len() + passwd.len() + 2);
        ir.extend(authz.into_bytes());
        ir.push(0);
        ir.extend(authn.into_bytes());
        ir.push(0);
        ir.extend(passwd);
        Plain {
            inner: SingleMessage::new(ir),
        }
    }
}

impl Mechanism for Plain {
    fn name(&self) -> &str {
        Plain::NAME
    }

    fn from_credentials(credentials: Credentials) -> Result<Plain, Error> {
        if let Secret::Password(password) = credentials.secret {
            if let Identity::Username(username) = credentials.identity {
                Ok(Plain::new(
                    credentials.authzid.unwrap_or_default(),
                    username,
                    password,
                ))
            } else {
                Err(Error::MissingCredentials)
            }
        } else {
            Err(Error::MissingCredentials)
        }
    }

    fn step(&mut self, input: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        self.inner.step(input)
    }
}
