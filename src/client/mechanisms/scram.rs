//! Provides the client side of the SASL "SCRAM-*" mechanisms (RFC 5802 and
//! RFC 7677).

use std::marker::PhantomData;

use base64::{engine::general_purpose::STANDARD as Base64, Engine};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::client::Mechanism;
use crate::common::prep::saslprep;
use crate::common::scram::{client_proof, server_signature, ScramProvider};
use crate::common::{escape_value, generate_nonce, Credentials, Identity, Secret, NONCE_LEN};
use crate::error::Error;

enum ScramState {
    Init,
    SentInitialMessage {
        gs2_header: Vec<u8>,
        auth_message: Vec<u8>,
    },
    GotServerData {
        server_signature: Vec<u8>,
    },
    Done,
}

/// A struct for authenticating using the SASL SCRAM-* family of mechanisms,
/// parameterized on the hash function.
pub struct Scram<S: ScramProvider> {
    name: String,
    authz: String,
    authn: String,
    passwd: Zeroizing<String>,
    client_nonce: Vec<u8>,
    state: ScramState,
    _marker: PhantomData<S>,
}

impl<S: ScramProvider> Scram<S> {
    /// Constructs a new struct for authenticating using the SASL SCRAM-*
    /// mechanism matching the provider. Pass an empty `authz` to let the
    /// server derive the authorization identity.
    ///
    /// Non-empty arguments go through SASLprep; preparation failure aborts
    /// construction, as does a failing random source.
    pub fn new<A, N, P>(authz: A, authn: N, passwd: P) -> Result<Scram<S>, Error>
    where
        A: Into<String>,
        N: Into<String>,
        P: Into<String>,
    {
        Ok(Scram {
            name: format!("SCRAM-{}", S::name()),
            authz: prepare(authz.into())?,
            authn: prepare(authn.into())?,
            passwd: Zeroizing::new(prepare(passwd.into())?),
            client_nonce: generate_nonce(NONCE_LEN)?,
            state: ScramState::Init,
            _marker: PhantomData,
        })
    }

    // Used for testing.
    #[doc(hidden)]
    #[cfg(test)]
    pub(crate) fn new_with_nonce<A, N, P>(
        authz: A,
        authn: N,
        passwd: P,
        nonce: &str,
    ) -> Result<Scram<S>, Error>
    where
        A: Into<String>,
        N: Into<String>,
        P: Into<String>,
    {
        let mut scram = Scram::new(authz, authn, passwd)?;
        scram.client_nonce = nonce.as_bytes().to_vec();
        Ok(scram)
    }

    fn initial_response(&mut self, input: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        if !input.is_empty() {
            return Err(Error::InvalidMessage);
        }
        let mut gs2_header = Vec::new();
        gs2_header.extend(b"n,");
        if !self.authz.is_empty() {
            gs2_header.extend(b"a=");
            gs2_header.extend(escape_value(&self.authz).into_bytes());
        }
        gs2_header.push(b',');
        let mut bare = Vec::new();
        bare.extend(b"n=");
        bare.extend(escape_value(&self.authn).into_bytes());
        bare.extend(b",r=");
        bare.extend(&self.client_nonce);
        let mut ir = Vec::new();
        ir.extend(&gs2_header);
        ir.extend(&bare);
        self.state = ScramState::SentInitialMessage {
            gs2_header,
            auth_message: bare,
        };
        Ok(Some(ir))
    }

    fn respond_to_challenge(
        &mut self,
        challenge: &[u8],
        gs2_header: Vec<u8>,
        mut auth_message: Vec<u8>,
    ) -> Result<Option<Vec<u8>>, Error> {
        let (server_nonce, salt, iterations) = self.parse_challenge(challenge)?;

        let mut resp = Vec::new();
        resp.extend(b"c=");
        resp.extend(Base64.encode(&gs2_header).into_bytes());
        resp.extend(b",r=");
        resp.extend(&self.client_nonce);
        resp.extend(&server_nonce);

        auth_message.push(b',');
        auth_message.extend(challenge);
        auth_message.push(b',');
        auth_message.extend(&resp);

        let salted_password =
            Zeroizing::new(S::derive(self.passwd.as_bytes(), &salt, iterations));
        let proof = client_proof::<S>(&salted_password, &auth_message);
        resp.extend(b",p=");
        resp.extend(Base64.encode(&proof).into_bytes());

        self.state = ScramState::GotServerData {
            server_signature: server_signature::<S>(&salted_password, &auth_message),
        };
        Ok(Some(resp))
    }

    /// Parses `r=<nonce>,s=<b64 salt>,i=<digits>`, returning the server
    /// nonce, the decoded salt and the iteration count.
    fn parse_challenge(&self, challenge: &[u8]) -> Result<(Vec<u8>, Vec<u8>, u32), Error> {
        let rest = challenge.strip_prefix(b"r=").ok_or(Error::InvalidMessage)?;
        if rest.len() < self.client_nonce.len() {
            return Err(Error::InvalidMessage);
        }
        if rest[..self.client_nonce.len()] != self.client_nonce[..] {
            return Err(Error::AuthenticationFailed);
        }
        let rest = &rest[self.client_nonce.len()..];
        let comma = rest
            .iter()
            .position(|&b| b == b',')
            .ok_or(Error::InvalidMessage)?;
        let server_nonce = rest[..comma].to_vec();
        let rest = &rest[comma + 1..];
        let rest = rest.strip_prefix(b"s=").ok_or(Error::InvalidMessage)?;
        let comma = rest
            .iter()
            .position(|&b| b == b',')
            .ok_or(Error::InvalidMessage)?;
        let salt = Base64
            .decode(&rest[..comma])
            .map_err(|_| Error::InvalidMessage)?;
        let rest = &rest[comma + 1..];
        let rest = rest.strip_prefix(b"i=").ok_or(Error::InvalidMessage)?;
        let iterations = std::str::from_utf8(rest)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(Error::InvalidMessage)?;
        Ok((server_nonce, salt, iterations))
    }

    fn verify_server_signature(
        &mut self,
        input: &[u8],
        server_signature: Vec<u8>,
    ) -> Result<Option<Vec<u8>>, Error> {
        let received = input.strip_prefix(b"v=").ok_or(Error::InvalidMessage)?;
        let received = Base64.decode(received).map_err(|_| Error::InvalidMessage)?;
        if bool::from(received.ct_eq(&server_signature)) {
            Ok(None)
        } else {
            Err(Error::AuthenticationFailed)
        }
    }
}

/// SASLprep a construction argument, leaving empty strings alone.
fn prepare(s: String) -> Result<String, Error> {
    if s.is_empty() {
        Ok(s)
    } else {
        saslprep(&s)
    }
}

impl<S: ScramProvider> Mechanism for Scram<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn from_credentials(credentials: Credentials) -> Result<Scram<S>, Error> {
        if let Secret::Password(password) = credentials.secret {
            if let Identity::Username(username) = credentials.identity {
                Scram::new(
                    credentials.authzid.unwrap_or_default(),
                    username,
                    password,
                )
            } else {
                Err(Error::MissingCredentials)
            }
        } else {
            Err(Error::MissingCredentials)
        }
    }

    fn step(&mut self, input: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        match std::mem::replace(&mut self.state, ScramState::Done) {
            ScramState::Init => self.initial_response(input),
            ScramState::SentInitialMessage {
                gs2_header,
                auth_message,
            } => self.respond_to_challenge(input, gs2_header, auth_message),
            ScramState::GotServerData { server_signature } => {
                self.verify_server_signature(input, server_signature)
            }
            ScramState::Done => Err(Error::InvalidState),
        }
    }
}
