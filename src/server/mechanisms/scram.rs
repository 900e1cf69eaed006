//! Provides the server side of the SASL "SCRAM-*" mechanisms (RFC 5802 and
//! RFC 7677).

use std::marker::PhantomData;

use base64::{engine::general_purpose::STANDARD as Base64, Engine};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::common::prep::saslprep;
use crate::common::scram::{client_proof, server_signature, ScramProvider};
use crate::common::{
    generate_nonce, unescape_value, Password, ScramCredentials, NONCE_LEN,
};
use crate::error::Error;
use crate::server::{Mechanism, Outcome};

/// Implemented by the application to retrieve SCRAM credentials and
/// authorize identities.
pub trait ScramAuthenticator {
    /// Returns the credentials stored for `authn`, or `None` when there are
    /// none. Storing passwords in salted form is advised; a plaintext
    /// password is salted on the fly with the salt and iteration count
    /// returned next to it.
    fn get_credentials(&self, authn: &str) -> Option<ScramCredentials>;

    /// Derives an authorization identity from an authentication identity.
    /// Only called when the client did not request one. Return `None` when
    /// no identity can be derived.
    fn derive_authz(&self, authn: &str) -> Option<String>;

    /// Whether `authn` may act as `authz`.
    fn authorize(&self, authz: &str, authn: &str) -> bool;
}

enum ScramState {
    Init,
    SentChallenge {
        authz: String,
        authn: String,
        client_nonce: Vec<u8>,
        gs2_header: Vec<u8>,
        salted_password: Zeroizing<Vec<u8>>,
        auth_message: Vec<u8>,
    },
    IgnoreOne,
    Done,
}

/// A struct for authenticating clients using the SASL SCRAM-* family of
/// mechanisms, parameterized on the hash function.
pub struct Scram<S: ScramProvider, A: ScramAuthenticator> {
    name: String,
    auth: A,
    server_nonce: Vec<u8>,
    state: ScramState,
    outcome: Outcome,
    _marker: PhantomData<S>,
}

impl<S: ScramProvider, A: ScramAuthenticator> Scram<S, A> {
    /// Constructs a new server-side struct for the SASL SCRAM-* mechanism
    /// matching the provider. Returns an error when the random source fails
    /// while generating the server nonce.
    pub fn new(auth: A) -> Result<Scram<S, A>, Error> {
        Ok(Scram {
            name: format!("SCRAM-{}", S::name()),
            auth,
            server_nonce: generate_nonce(NONCE_LEN)?,
            state: ScramState::Init,
            outcome: Outcome::InProgress,
            _marker: PhantomData,
        })
    }

    fn create_challenge(&mut self, ir: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        let parsed = parse_initial_response(ir)?;
        let mut auth_message = parsed.bare;

        let credentials = self
            .auth
            .get_credentials(&parsed.authn)
            .ok_or(Error::AuthenticationFailed)?;
        let salted_password = Zeroizing::new(match credentials.password {
            Password::Salted(digest) => digest,
            Password::Plain(plain) => S::derive(
                plain.as_bytes(),
                &credentials.salt,
                credentials.iterations,
            ),
        });

        let mut challenge = Vec::new();
        challenge.extend(b"r=");
        challenge.extend(&parsed.client_nonce);
        challenge.extend(&self.server_nonce);
        challenge.extend(b",s=");
        challenge.extend(Base64.encode(&credentials.salt).into_bytes());
        challenge.extend(b",i=");
        challenge.extend(credentials.iterations.to_string().into_bytes());

        auth_message.push(b',');
        auth_message.extend(&challenge);

        self.state = ScramState::SentChallenge {
            authz: parsed.authz,
            authn: parsed.authn,
            client_nonce: parsed.client_nonce,
            gs2_header: parsed.gs2_header,
            salted_password,
            auth_message,
        };
        Ok(Some(challenge))
    }

    fn verify_client_proof(
        &mut self,
        data: &[u8],
        authz: String,
        authn: &str,
        client_nonce: &[u8],
        gs2_header: &[u8],
        salted_password: &[u8],
        auth_message: &mut Vec<u8>,
    ) -> Result<Option<Vec<u8>>, Error> {
        let rest = data.strip_prefix(b"c=").ok_or(Error::InvalidMessage)?;
        let comma = rest
            .iter()
            .position(|&b| b == b',')
            .ok_or(Error::InvalidMessage)?;
        let echoed_header = Base64
            .decode(&rest[..comma])
            .map_err(|_| Error::InvalidMessage)?;
        if echoed_header != gs2_header {
            return Err(Error::InvalidMessage);
        }
        let rest = &rest[comma + 1..];
        let rest = rest.strip_prefix(b"r=").ok_or(Error::InvalidMessage)?;
        if rest.len() < client_nonce.len() {
            return Err(Error::InvalidMessage);
        }
        if rest[..client_nonce.len()] != client_nonce[..] {
            return Err(Error::AuthenticationFailed);
        }
        let rest = &rest[client_nonce.len()..];
        if rest.len() < self.server_nonce.len() {
            return Err(Error::InvalidMessage);
        }
        if rest[..self.server_nonce.len()] != self.server_nonce[..] {
            return Err(Error::AuthenticationFailed);
        }
        let rest = &rest[self.server_nonce.len()..];

        auth_message.push(b',');
        auth_message.extend(&data[..data.len() - rest.len()]);

        let rest = rest.strip_prefix(b",p=").ok_or(Error::InvalidMessage)?;
        let received_proof = Base64.decode(rest).map_err(|_| Error::InvalidMessage)?;
        let expected_proof = client_proof::<S>(salted_password, auth_message);
        if !bool::from(received_proof.ct_eq(&expected_proof)) {
            return Err(Error::AuthenticationFailed);
        }

        let authz = if authz.is_empty() {
            self.auth
                .derive_authz(authn)
                .ok_or(Error::AuthenticationFailed)?
        } else {
            authz
        };
        if !self.auth.authorize(&authz, authn) {
            return Err(Error::Unauthorized);
        }

        let mut signature = Vec::new();
        signature.extend(b"v=");
        signature.extend(
            Base64
                .encode(server_signature::<S>(salted_password, auth_message))
                .into_bytes(),
        );
        self.outcome = Outcome::Success { authz };
        Ok(Some(signature))
    }
}

struct InitialResponse {
    authz: String,
    authn: String,
    client_nonce: Vec<u8>,
    gs2_header: Vec<u8>,
    bare: Vec<u8>,
}

/// Parses the initial response into the requested authz, the prepared
/// authn, the client nonce, the raw GS2 header bytes and the
/// client-first-message-bare.
fn parse_initial_response(ir: &[u8]) -> Result<InitialResponse, Error> {
    let mut rest = ir.strip_prefix(b"n,").ok_or(Error::InvalidMessage)?;
    let mut authz = String::new();
    if let Some(value) = rest.strip_prefix(b"a=") {
        let comma = value
            .iter()
            .position(|&b| b == b',')
            .ok_or(Error::InvalidMessage)?;
        authz = String::from_utf8(value[..comma].to_vec()).map_err(|_| Error::InvalidMessage)?;
        rest = &value[comma..];
    }
    let rest = rest.strip_prefix(b",").ok_or(Error::InvalidMessage)?;
    let gs2_header = ir[..ir.len() - rest.len()].to_vec();
    let bare = rest.to_vec();

    let rest = rest.strip_prefix(b"n=").ok_or(Error::InvalidMessage)?;
    let comma = rest
        .iter()
        .position(|&b| b == b',')
        .ok_or(Error::InvalidMessage)?;
    let authn = std::str::from_utf8(&rest[..comma]).map_err(|_| Error::InvalidMessage)?;
    let authn = saslprep(&unescape_value(authn)).map_err(|_| Error::InvalidMessage)?;
    let rest = &rest[comma + 1..];
    let client_nonce = rest
        .strip_prefix(b"r=")
        .ok_or(Error::InvalidMessage)?
        .to_vec();

    Ok(InitialResponse {
        authz,
        authn,
        client_nonce,
        gs2_header,
        bare,
    })
}

impl<S: ScramProvider, A: ScramAuthenticator> Mechanism for Scram<S, A> {
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self, input: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        match std::mem::replace(&mut self.state, ScramState::Done) {
            ScramState::Init => match self.create_challenge(input) {
                Ok(challenge) => Ok(challenge),
                Err(err) => {
                    log::debug!("{} exchange failed: {}", self.name, err);
                    self.outcome = Outcome::Failure;
                    Err(err)
                }
            },
            ScramState::SentChallenge {
                authz,
                authn,
                client_nonce,
                gs2_header,
                salted_password,
                mut auth_message,
            } => {
                let result = self.verify_client_proof(
                    input,
                    authz,
                    &authn,
                    &client_nonce,
                    &gs2_header,
                    &salted_password,
                    &mut auth_message,
                );
                match result {
                    Ok(signature) => {
                        self.state = ScramState::IgnoreOne;
                        Ok(signature)
                    }
                    Err(err) => {
                        log::debug!("{} exchange failed: {}", self.name, err);
                        self.outcome = Outcome::Failure;
                        Err(err)
                    }
                }
            }
            ScramState::IgnoreOne => {
                if input.is_empty() {
                    Ok(None)
                } else {
                    Err(Error::InvalidMessage)
                }
            }
            ScramState::Done => Err(Error::InvalidState),
        }
    }

    fn outcome(&self) -> &Outcome {
        &self.outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::scram::{Sha1, Sha256};

    struct Fixture {
        salted: bool,
        sha256_salt: bool,
    }

    impl Fixture {
        fn plain() -> Fixture {
            Fixture {
                salted: false,
                sha256_salt: false,
            }
        }
    }

    impl ScramAuthenticator for Fixture {
        fn get_credentials(&self, authn: &str) -> Option<ScramCredentials> {
            if authn != "user" {
                return None;
            }
            let salt = if self.sha256_salt {
                b"[m\x99h\x9d\x125\x8e\xec\xa0K\x14\x126\xfa\x81".to_vec()
            } else {
                b"A%\xc2G\xe4:\xb1\xe9<m\xffv".to_vec()
            };
            let password = if self.salted {
                Password::Salted(
                    b"\x1d\x96\xee:R\x9bZ_\x9eG\xc0\x1f\"\x9a,\xb8\xa6\xe1_}".to_vec(),
                )
            } else {
                Password::Plain("pencil".to_owned())
            };
            Some(ScramCredentials {
                password,
                salt,
                iterations: 4096,
            })
        }

        fn derive_authz(&self, authn: &str) -> Option<String> {
            Some(format!("{}Z", authn))
        }

        fn authorize(&self, authz: &str, authn: &str) -> bool {
            authz == format!("{}Z", authn) || authz == "RequestedAuthz"
        }
    }

    fn sha1_server(fixture: Fixture) -> Scram<Sha1, Fixture> {
        let mut mechanism = Scram::<Sha1, _>::new(fixture).unwrap();
        mechanism.server_nonce = b"3rfcNHYJY1ZVvWVs7j".to_vec();
        mechanism
    }

    // RFC 5802 test vectors.
    #[test]
    fn sha1_derived_authz() {
        let mut mechanism = sha1_server(Fixture::plain());
        assert_eq!(mechanism.name(), "SCRAM-SHA-1");
        assert!(mechanism.is_client_first());
        assert_eq!(mechanism.outcome(), &Outcome::InProgress);
        let challenge = mechanism
            .step(b"n,,n=user,r=fyko+d2lbbFgONRv9qkxdawL")
            .unwrap();
        assert_eq!(
            challenge,
            Some(
                b"r=fyko+d2lbbFgONRv9qkxdawL3rfcNHYJY1ZVvWVs7j,\
                  s=QSXCR+Q6sek8bf92,i=4096"
                    .to_vec()
            )
        );
        assert_eq!(mechanism.outcome(), &Outcome::InProgress);
        let signature = mechanism
            .step(
                b"c=biws,r=fyko+d2lbbFgONRv9qkxdawL3rfcNHYJY1ZVvWVs7j,\
                  p=v0X8v3Bz2T0CJGbJQyF0X+HI4Ts=",
            )
            .unwrap();
        assert_eq!(signature, Some(b"v=rmF9pqV8S7suAoZWja4dJRkFsKQ=".to_vec()));
        assert_eq!(mechanism.outcome().authz(), Some("userZ"));
        // one trailing empty message is tolerated
        assert_eq!(mechanism.step(b"").unwrap(), None);
        assert!(matches!(mechanism.step(b""), Err(Error::InvalidState)));
    }

    #[test]
    fn sha1_salted_credentials() {
        let mut mechanism = sha1_server(Fixture {
            salted: true,
            sha256_salt: false,
        });
        mechanism
            .step(b"n,,n=user,r=fyko+d2lbbFgONRv9qkxdawL")
            .unwrap();
        let signature = mechanism
            .step(
                b"c=biws,r=fyko+d2lbbFgONRv9qkxdawL3rfcNHYJY1ZVvWVs7j,\
                  p=v0X8v3Bz2T0CJGbJQyF0X+HI4Ts=",
            )
            .unwrap();
        assert_eq!(signature, Some(b"v=rmF9pqV8S7suAoZWja4dJRkFsKQ=".to_vec()));
        assert_eq!(mechanism.outcome().authz(), Some("userZ"));
    }

    #[test]
    fn sha1_requested_authz() {
        let mut mechanism = sha1_server(Fixture::plain());
        let challenge = mechanism
            .step(b"n,a=RequestedAuthz,n=user,r=fyko+d2lbbFgONRv9qkxdawL")
            .unwrap();
        assert_eq!(
            challenge,
            Some(
                b"r=fyko+d2lbbFgONRv9qkxdawL3rfcNHYJY1ZVvWVs7j,\
                  s=QSXCR+Q6sek8bf92,i=4096"
                    .to_vec()
            )
        );
        let signature = mechanism
            .step(
                b"c=bixhPVJlcXVlc3RlZEF1dGh6LA==,\
                  r=fyko+d2lbbFgONRv9qkxdawL3rfcNHYJY1ZVvWVs7j,\
                  p=Y1CrAXpRtiwzxkxa33oLCr6ShzY=",
            )
            .unwrap();
        assert_eq!(signature, Some(b"v=DLwvoqxRReuaVe1fCmOZJaEMJ6s=".to_vec()));
        assert_eq!(mechanism.outcome().authz(), Some("RequestedAuthz"));
    }

    // RFC 7677 test vectors.
    #[test]
    fn sha256_derived_authz() {
        let mut mechanism = Scram::<Sha256, _>::new(Fixture {
            salted: false,
            sha256_salt: true,
        })
        .unwrap();
        mechanism.server_nonce = b"%hvYDpWUa2RaTCAfuxFIlj)hNlF$k0".to_vec();
        assert_eq!(mechanism.name(), "SCRAM-SHA-256");
        let challenge = mechanism.step(b"n,,n=user,r=rOprNGfwEbeRWgbNEkqO").unwrap();
        assert_eq!(
            challenge,
            Some(
                b"r=rOprNGfwEbeRWgbNEkqO%hvYDpWUa2RaTCAfuxFIlj)hNlF$k0,\
                  s=W22ZaJ0SNY7soEsUEjb6gQ==,i=4096"
                    .to_vec()
            )
        );
        let signature = mechanism
            .step(
                b"c=biws,r=rOprNGfwEbeRWgbNEkqO%hvYDpWUa2RaTCAfuxFIlj)hNlF$k0,\
                  p=dHzbZapWIk4jUhN+Ute9ytag9zjfMHgsqmmiz7AndVQ=",
            )
            .unwrap();
        assert_eq!(
            signature,
            Some(b"v=6rriTRBi23WpRR/wtup+mMhUZUn/dB5nLTJRsjl95G4=".to_vec())
        );
        assert_eq!(mechanism.outcome().authz(), Some("userZ"));
    }

    #[test]
    fn invalid_client_proof() {
        let mut mechanism = sha1_server(Fixture::plain());
        mechanism
            .step(b"n,,n=user,r=fyko+d2lbbFgONRv9qkxdawL")
            .unwrap();
        assert!(matches!(
            mechanism.step(
                b"c=biws,r=fyko+d2lbbFgONRv9qkxdawL3rfcNHYJY1ZVvWVs7j,\
                  p=V0x8v3Bz2T0CJGbJQyF0X+HI4Ts="
            ),
            Err(Error::AuthenticationFailed)
        ));
        assert_eq!(mechanism.outcome(), &Outcome::Failure);
        assert!(matches!(mechanism.step(b""), Err(Error::InvalidState)));
    }

    #[test]
    fn modified_client_nonce() {
        let mut mechanism = sha1_server(Fixture::plain());
        mechanism
            .step(b"n,,n=user,r=fyko+d2lbbFgONRv9qkxdawL")
            .unwrap();
        assert!(matches!(
            mechanism.step(
                b"c=biws,r=FYko+d2lbbFgONRv9qkxdawL3rfcNHYJY1ZVvWVs7j,\
                  p=v0X8v3Bz2T0CJGbJQyF0X+HI4Ts="
            ),
            Err(Error::AuthenticationFailed)
        ));
        assert_eq!(mechanism.outcome(), &Outcome::Failure);
    }

    #[test]
    fn modified_server_nonce() {
        let mut mechanism = sha1_server(Fixture::plain());
        mechanism
            .step(b"n,,n=user,r=fyko+d2lbbFgONRv9qkxdawL")
            .unwrap();
        assert!(matches!(
            mechanism.step(
                b"c=biws,r=fyko+d2lbbFgONRv9qkxdawL3RFcNHYJY1ZVvWVs7j,\
                  p=v0X8v3Bz2T0CJGbJQyF0X+HI4Ts="
            ),
            Err(Error::AuthenticationFailed)
        ));
    }

    #[test]
    fn nonce_without_server_part() {
        let mut mechanism = sha1_server(Fixture::plain());
        mechanism
            .step(b"n,,n=user,r=fyko+d2lbbFgONRv9qkxdawL")
            .unwrap();
        assert!(matches!(
            mechanism.step(
                b"c=biws,r=fyko+d2lbbFgONRv9qkxdawL,p=v0X8v3Bz2T0CJGbJQyF0X+HI4Ts="
            ),
            Err(Error::InvalidMessage)
        ));
    }

    #[test]
    fn gs2_header_echo_mismatch() {
        let mut mechanism = sha1_server(Fixture::plain());
        mechanism
            .step(b"n,,n=user,r=fyko+d2lbbFgONRv9qkxdawL")
            .unwrap();
        // "bixhPVgs" decodes to "n,a=X," instead of the recorded "n,,"
        assert!(matches!(
            mechanism.step(
                b"c=bixhPVgs,r=fyko+d2lbbFgONRv9qkxdawL3rfcNHYJY1ZVvWVs7j,\
                  p=v0X8v3Bz2T0CJGbJQyF0X+HI4Ts="
            ),
            Err(Error::InvalidMessage)
        ));
    }

    #[test]
    fn unknown_user() {
        let mut mechanism = sha1_server(Fixture::plain());
        assert!(matches!(
            mechanism.step(b"n,,n=nobody,r=fyko+d2lbbFgONRv9qkxdawL"),
            Err(Error::AuthenticationFailed)
        ));
        assert_eq!(mechanism.outcome(), &Outcome::Failure);
    }

    #[test]
    fn malformed_initial_responses() {
        for ir in [
            // channel binding flags are not supported
            &b"y,,n=user,r=abc"[..],
            b"p=tls-unique,,n=user,r=abc",
            // missing pieces
            b"n,n=user,r=abc",
            b"n,,r=abc",
            b"n,,n=user",
            b"n,a=unterminated",
        ] {
            let mut mechanism = Scram::<Sha1, _>::new(Fixture::plain()).unwrap();
            assert!(
                matches!(mechanism.step(ir), Err(Error::InvalidMessage)),
                "initial response {:?} should be rejected",
                std::str::from_utf8(ir).unwrap()
            );
        }
    }

    #[test]
    fn escaped_authn_is_unescaped() {
        let mut mechanism = sha1_server(Fixture::plain());
        // "us=2Cer" unescapes to "us,er", which the fixture does not know
        assert!(matches!(
            mechanism.step(b"n,,n=us=2Cer,r=fyko+d2lbbFgONRv9qkxdawL"),
            Err(Error::AuthenticationFailed)
        ));
    }

    #[test]
    fn trailing_message_with_data() {
        let mut mechanism = sha1_server(Fixture::plain());
        mechanism
            .step(b"n,,n=user,r=fyko+d2lbbFgONRv9qkxdawL")
            .unwrap();
        mechanism
            .step(
                b"c=biws,r=fyko+d2lbbFgONRv9qkxdawL3rfcNHYJY1ZVvWVs7j,\
                  p=v0X8v3Bz2T0CJGbJQyF0X+HI4Ts=",
            )
            .unwrap();
        assert!(matches!(mechanism.step(b"x"), Err(Error::InvalidMessage)));
        // the exchange itself already succeeded
        assert_eq!(mechanism.outcome().authz(), Some("userZ"));
        assert!(matches!(mechanism.step(b""), Err(Error::InvalidState)));
    }
}
