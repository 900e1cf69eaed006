//! Types and helpers shared between client-side and server-side mechanisms.

use zeroize::Zeroizing;

use crate::error::Error;

pub mod prep;

#[cfg(feature = "scram")]
pub mod scram;

/// An authentication identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Identity {
    /// No identity provided.
    None,
    /// A username, or for the ANONYMOUS mechanism the trace string.
    Username(String),
}

impl From<String> for Identity {
    fn from(s: String) -> Identity {
        Identity::Username(s)
    }
}

impl<'a> From<&'a str> for Identity {
    fn from(s: &'a str) -> Identity {
        Identity::Username(s.to_owned())
    }
}

/// A struct containing SASL credentials.
#[derive(Clone, Debug)]
pub struct Credentials {
    /// The authorization identity to request, if any.
    pub authzid: Option<String>,
    /// The authentication identity.
    pub identity: Identity,
    /// The secret used to authenticate.
    pub secret: Secret,
}

impl Default for Credentials {
    fn default() -> Credentials {
        Credentials {
            authzid: None,
            identity: Identity::None,
            secret: Secret::None,
        }
    }
}

impl Credentials {
    /// Creates a new Credentials with the specified username.
    pub fn with_username<N: Into<String>>(mut self, username: N) -> Credentials {
        self.identity = Identity::Username(username.into());
        self
    }

    /// Creates a new Credentials requesting the specified authorization
    /// identity.
    pub fn with_authzid<A: Into<String>>(mut self, authzid: A) -> Credentials {
        self.authzid = Some(authzid.into());
        self
    }

    /// Creates a new Credentials with the specified plaintext password.
    pub fn with_password<P: Into<String>>(mut self, password: P) -> Credentials {
        self.secret = Secret::Password(password.into());
        self
    }

    /// Creates a new Credentials with the specified bearer token and the
    /// host and port of the service it was issued for. Pass an empty host
    /// or a zero port when they are not relevant.
    pub fn with_token<T: Into<Vec<u8>>, H: Into<String>>(
        mut self,
        token: T,
        host: H,
        port: u16,
    ) -> Credentials {
        self.secret = Secret::Token {
            token: token.into(),
            host: host.into(),
            port,
        };
        self
    }

    /// Creates a new Credentials with the specified PKCS#8 DER encoded
    /// ECDSA private key.
    pub fn with_ecdsa_key<K: Into<Vec<u8>>>(mut self, key: K) -> Credentials {
        self.secret = Secret::EcdsaKey(key.into());
        self
    }
}

/// Represents a SASL secret, like a password.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Secret {
    /// No extra data needed.
    None,
    /// A plaintext password.
    Password(String),
    /// A bearer token with the host and port it was issued for.
    Token {
        /// The opaque token bytes.
        token: Vec<u8>,
        /// The server host, empty when not provided.
        host: String,
        /// The server port, zero when not provided.
        port: u16,
    },
    /// A PKCS#8 DER encoded ECDSA private key.
    EcdsaKey(Vec<u8>),
}

/// A password as stored by a SCRAM credential store.
#[cfg(feature = "scram")]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Password {
    /// A plaintext password, salted on demand.
    Plain(String),
    /// A password already salted with the salt and iteration count it is
    /// stored next to.
    Salted(Vec<u8>),
}

/// Credential material returned by a
/// [`ScramAuthenticator`](crate::server::mechanisms::ScramAuthenticator).
///
/// The salt and iteration count are advertised to the client in the
/// challenge, whether or not the password is already salted with them.
#[cfg(feature = "scram")]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScramCredentials {
    /// The stored password.
    pub password: Password,
    /// The salt to advertise.
    pub salt: Vec<u8>,
    /// The iteration count to advertise.
    pub iterations: u32,
}

#[doc(hidden)]
pub fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
    assert_eq!(a.len(), b.len());
    let mut ret = Vec::with_capacity(a.len());
    for (a, b) in a.iter().zip(b) {
        ret.push(a ^ b);
    }
    ret
}

/// Length of generated SCRAM nonces, both client and server side.
#[cfg(feature = "scram")]
pub(crate) const NONCE_LEN: usize = 24;

/// Generate a nonce of printable ASCII bytes, excluding `,`.
///
/// Random blocks are filtered and refilled until the nonce is complete, so
/// the result always has exactly `len` bytes from the allowed alphabet.
#[cfg(feature = "scram")]
pub(crate) fn generate_nonce(len: usize) -> Result<Vec<u8>, Error> {
    let mut nonce = Vec::with_capacity(len);
    let mut block = [0u8; 32];
    while nonce.len() < len {
        getrandom::getrandom(&mut block)?;
        for &b in block.iter() {
            if nonce.len() == len {
                break;
            }
            if b > 0x20 && b < 0x7f && b != b',' {
                nonce.push(b);
            }
        }
    }
    Ok(nonce)
}

/// Escape a value for inclusion in a comma-separated SCRAM message.
#[cfg(feature = "scram")]
pub(crate) fn escape_value(s: &str) -> String {
    s.replace('=', "=3D").replace(',', "=2C")
}

/// Unescape a value extracted from a comma-separated SCRAM message.
///
/// `=2C` is decoded before `=3D`.
#[cfg(feature = "scram")]
pub(crate) fn unescape_value(s: &str) -> String {
    s.replace("=2C", ",").replace("=3D", "=")
}

/// One-shot initial-response state shared by the single-message client
/// mechanisms.
///
/// The initial response is handed out exactly once; any further step, and a
/// first step carrying unexpected data, leaves the session terminal.
pub(crate) struct SingleMessage {
    ir: Option<Zeroizing<Vec<u8>>>,
}

impl SingleMessage {
    pub(crate) fn new(ir: Vec<u8>) -> SingleMessage {
        SingleMessage {
            ir: Some(Zeroizing::new(ir)),
        }
    }

    pub(crate) fn step(&mut self, input: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        match self.ir.take() {
            None => Err(Error::InvalidState),
            Some(_) if !input.is_empty() => Err(Error::InvalidMessage),
            Some(mut ir) => Ok(Some(std::mem::take(&mut *ir))),
        }
    }
}
