//! Provides the server side of the "ECDSA-NIST256P-CHALLENGE" mechanism.

use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use p256::pkcs8::DecodePublicKey;

use crate::error::Error;
use crate::server::{Mechanism, Outcome};

/// Number of random bytes in the challenge sent to the client.
const CHALLENGE_LEN: usize = 30;

/// Implemented by the application to look up public keys and authorize
/// identities for the ECDSA-NIST256P-CHALLENGE mechanism.
pub trait EcdsaAuthenticator {
    /// Returns the SPKI DER encoded public key registered for `authn`, or
    /// `None` when there is none.
    fn get_public_key(&self, authn: &str) -> Option<Vec<u8>>;

    /// Derives an authorization identity from an authentication identity.
    /// Only called when the client did not request one. Return `None` when
    /// no identity can be derived.
    fn derive_authz(&self, authn: &str) -> Option<String>;

    /// Whether `authn` may act as `authz`.
    fn authorize(&self, authz: &str, authn: &str) -> bool;
}

enum EcdsaState {
    Init,
    AwaitingSignature {
        key: VerifyingKey,
        challenge: Vec<u8>,
        authz: String,
        authn: String,
    },
    Done,
}

/// A struct for authenticating clients that hold a NIST P-256 key pair.
pub struct Ecdsa<A: EcdsaAuthenticator> {
    auth: A,
    state: EcdsaState,
    outcome: Outcome,
}

impl<A: EcdsaAuthenticator> Ecdsa<A> {
    /// Constructs a new server-side struct for the ECDSA-NIST256P-CHALLENGE
    /// mechanism.
    pub fn new(auth: A) -> Ecdsa<A> {
        Ecdsa {
            auth,
            state: EcdsaState::Init,
            outcome: Outcome::InProgress,
        }
    }

    fn create_challenge(&mut self, ir: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        let (authz, authn) = match ir.iter().position(|&b| b == 0) {
            None => (Vec::new(), ir.to_vec()),
            Some(delim) => (ir[..delim].to_vec(), ir[delim + 1..].to_vec()),
        };
        let authz = String::from_utf8(authz).map_err(|_| Error::InvalidMessage)?;
        let authn = String::from_utf8(authn).map_err(|_| Error::InvalidMessage)?;

        let key_der = self
            .auth
            .get_public_key(&authn)
            .ok_or(Error::AuthenticationFailed)?;
        let key =
            VerifyingKey::from_public_key_der(&key_der).map_err(|_| Error::InvalidCurve)?;

        let mut challenge = vec![0u8; CHALLENGE_LEN];
        getrandom::getrandom(&mut challenge)?;
        self.state = EcdsaState::AwaitingSignature {
            key,
            challenge: challenge.clone(),
            authz,
            authn,
        };
        Ok(Some(challenge))
    }

    fn verify_signature(
        &mut self,
        data: &[u8],
        key: VerifyingKey,
        challenge: &[u8],
        authz: String,
        authn: &str,
    ) -> Result<String, Error> {
        let signature = Signature::from_der(data).map_err(|_| Error::AuthenticationFailed)?;
        key.verify(challenge, &signature)
            .map_err(|_| Error::AuthenticationFailed)?;
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
        Ok(authz)
    }
}

impl<A: EcdsaAuthenticator> Mechanism for Ecdsa<A> {
    fn name(&self) -> &str {
        "ECDSA-NIST256P-CHALLENGE"
    }

    fn step(&mut self, input: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        match std::mem::replace(&mut self.state, EcdsaState::Done) {
            EcdsaState::Init => match self.create_challenge(input) {
                Ok(challenge) => Ok(challenge),
                Err(err) => {
                    log::debug!("ECDSA-NIST256P-CHALLENGE exchange failed: {}", err);
                    self.outcome = Outcome::Failure;
                    Err(err)
                }
            },
            EcdsaState::AwaitingSignature {
                key,
                challenge,
                authz,
                authn,
            } => match self.verify_signature(input, key, &challenge, authz, &authn) {
                Ok(authz) => {
                    self.outcome = Outcome::Success { authz };
                    Ok(None)
                }
                Err(err) => {
                    log::debug!("ECDSA-NIST256P-CHALLENGE exchange failed: {}", err);
                    self.outcome = Outcome::Failure;
                    Err(err)
                }
            },
            EcdsaState::Done => Err(Error::InvalidState),
        }
    }

    fn outcome(&self) -> &Outcome {
        &self.outcome
    }
}

#[cfg(test)]
mod tests {
    use p256::ecdsa::signature::Signer;
    use p256::ecdsa::SigningKey;
    use p256::pkcs8::DecodePrivateKey;

    use super::*;
    use crate::test_keys::{P256_KEY_DER, P256_PUBLIC_DER, P384_PUBLIC_DER};

    struct Fixture {
        key_der: Vec<u8>,
    }

    impl Fixture {
        fn new() -> Fixture {
            Fixture {
                key_der: P256_PUBLIC_DER.to_vec(),
            }
        }
    }

    impl EcdsaAuthenticator for Fixture {
        fn get_public_key(&self, authn: &str) -> Option<Vec<u8>> {
            if authn == "user" {
                Some(self.key_der.clone())
            } else {
                None
            }
        }

        fn derive_authz(&self, authn: &str) -> Option<String> {
            Some(format!("{}Z", authn))
        }

        fn authorize(&self, authz: &str, authn: &str) -> bool {
            authz == format!("{}Z", authn) || authz == "RequestedAuthz"
        }
    }

    fn sign(challenge: &[u8]) -> Vec<u8> {
        let key = SigningKey::from_pkcs8_der(P256_KEY_DER).unwrap();
        let signature: Signature = key.sign(challenge);
        signature.to_der().as_bytes().to_vec()
    }

    #[test]
    fn derived_authz() {
        let mut mechanism = Ecdsa::new(Fixture::new());
        assert_eq!(mechanism.name(), "ECDSA-NIST256P-CHALLENGE");
        let challenge = mechanism.step(b"user").unwrap().unwrap();
        assert_eq!(challenge.len(), CHALLENGE_LEN);
        assert_eq!(mechanism.outcome(), &Outcome::InProgress);
        assert_eq!(mechanism.step(&sign(&challenge)).unwrap(), None);
        assert_eq!(mechanism.outcome().authz(), Some("userZ"));
        assert!(matches!(mechanism.step(b""), Err(Error::InvalidState)));
    }

    #[test]
    fn requested_authz() {
        let mut mechanism = Ecdsa::new(Fixture::new());
        let challenge = mechanism.step(b"RequestedAuthz\0user").unwrap().unwrap();
        assert_eq!(mechanism.step(&sign(&challenge)).unwrap(), None);
        assert_eq!(mechanism.outcome().authz(), Some("RequestedAuthz"));
    }

    #[test]
    fn unknown_principal() {
        let mut mechanism = Ecdsa::new(Fixture::new());
        assert!(matches!(
            mechanism.step(b"stranger"),
            Err(Error::AuthenticationFailed)
        ));
        assert_eq!(mechanism.outcome(), &Outcome::Failure);
    }

    #[test]
    fn foreign_curve_key() {
        let mut mechanism = Ecdsa::new(Fixture {
            key_der: P384_PUBLIC_DER.to_vec(),
        });
        assert!(matches!(mechanism.step(b"user"), Err(Error::InvalidCurve)));
        assert_eq!(mechanism.outcome(), &Outcome::Failure);
    }

    #[test]
    fn invalid_signature() {
        let mut mechanism = Ecdsa::new(Fixture::new());
        let challenge = mechanism.step(b"user").unwrap().unwrap();
        let mut signature = sign(&challenge);
        let last = signature.len() - 1;
        signature[last] ^= 0x01;
        assert!(matches!(
            mechanism.step(&signature),
            Err(Error::AuthenticationFailed)
        ));
        assert_eq!(mechanism.outcome(), &Outcome::Failure);
        assert!(matches!(mechanism.step(b""), Err(Error::InvalidState)));
    }

    #[test]
    fn unauthorized_authz() {
        let mut mechanism = Ecdsa::new(Fixture::new());
        let challenge = mechanism.step(b"other\0user").unwrap().unwrap();
        assert!(matches!(
            mechanism.step(&sign(&challenge)),
            Err(Error::Unauthorized)
        ));
        assert_eq!(mechanism.outcome(), &Outcome::Failure);
    }
}
