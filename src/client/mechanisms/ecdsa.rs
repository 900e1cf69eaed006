//! Provides the client side of the "ECDSA-NIST256P-CHALLENGE" mechanism,
//! a two-round signed challenge used by several IRC networks.

use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::pkcs8::DecodePrivateKey;

use crate::client::Mechanism;
use crate::common::{Credentials, Identity, Secret};
use crate::error::Error;

enum EcdsaState {
    Init { key: SigningKey },
    AwaitingChallenge { key: SigningKey },
    Done,
}

/// A struct for authenticating by signing a server challenge with a NIST
/// P-256 private key.
///
/// The key is dropped, and its memory zeroed, as soon as the challenge has
/// been signed.
pub struct Ecdsa {
    authz: String,
    authn: String,
    state: EcdsaState,
}

impl Ecdsa {
    /// The registered name of this mechanism.
    pub const NAME: &'static str = "ECDSA-NIST256P-CHALLENGE";

    /// Constructs a new struct for authenticating using the
    /// ECDSA-NIST256P-CHALLENGE mechanism. The key is a PKCS#8 DER encoded
    /// private key; a key on any curve other than NIST P-256 is rejected
    /// with [`Error::InvalidCurve`].
    pub fn new<A, N>(authz: A, authn: N, key_der: &[u8]) -> Result<Ecdsa, Error>
    where
        A: Into<String>,
        N: Into<String>,
    {
        let key = SigningKey::from_pkcs8_der(key_der).map_err(|_| Error::InvalidCurve)?;
        Ok(Ecdsa {
            authz: authz.into(),
            authn: authn.into(),
            state: EcdsaState::Init { key },
        })
    }
}

impl Mechanism for Ecdsa {
    fn name(&self) -> &str {
        Ecdsa::NAME
    }

    fn from_credentials(credentials: Credentials) -> Result<Ecdsa, Error> {
        if let Secret::EcdsaKey(key_der) = credentials.secret {
            if let Identity::Username(username) = credentials.identity {
                Ecdsa::new(
                    credentials.authzid.unwrap_or_default(),
                    username,
                    &key_der,
                )
            } else {
                Err(Error::MissingCredentials)
            }
        } else {
            Err(Error::MissingCredentials)
        }
    }

    fn step(&mut self, input: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        match std::mem::replace(&mut self.state, EcdsaState::Done) {
            EcdsaState::Init { key } => {
                if !input.is_empty() {
                    return Err(Error::InvalidMessage);
                }
                let mut ir = Vec::new();
                if !self.authz.is_empty() {
                    ir.extend(self.authz.as_bytes());
                    ir.push(0);
                }
                ir.extend(self.authn.as_bytes());
                self.state = EcdsaState::AwaitingChallenge { key };
                Ok(Some(ir))
            }
            EcdsaState::AwaitingChallenge { key } => {
                let signature: Signature = key.sign(input);
                Ok(Some(signature.to_der().as_bytes().to_vec()))
            }
            EcdsaState::Done => Err(Error::InvalidState),
        }
    }
}

#[cfg(test)]
mod tests {
    use p256::ecdsa::signature::Verifier;
    use p256::ecdsa::VerifyingKey;

    use super::*;
    use crate::test_keys::{P256_KEY_DER, P384_KEY_DER};

    #[test]
    fn identity_then_signature() {
        let mut mechanism = Ecdsa::new("", "user", P256_KEY_DER).unwrap();
        assert_eq!(mechanism.name(), "ECDSA-NIST256P-CHALLENGE");
        assert_eq!(mechanism.step(b"").unwrap(), Some(b"user".to_vec()));

        let challenge = b"tis but a random challenge...0";
        let der = mechanism.step(challenge).unwrap().unwrap();
        let signature = Signature::from_der(&der).unwrap();
        let key = SigningKey::from_pkcs8_der(P256_KEY_DER).unwrap();
        VerifyingKey::from(&key)
            .verify(challenge, &signature)
            .unwrap();

        assert!(matches!(mechanism.step(b""), Err(Error::InvalidState)));
    }

    #[test]
    fn authz_is_prefixed() {
        let mut mechanism = Ecdsa::new("admin", "user", P256_KEY_DER).unwrap();
        assert_eq!(mechanism.step(b"").unwrap(), Some(b"admin\0user".to_vec()));
    }

    #[test]
    fn wrong_curve_fails_construction() {
        assert!(matches!(
            Ecdsa::new("", "user", P384_KEY_DER),
            Err(Error::InvalidCurve)
        ));
    }

    #[test]
    fn data_in_first_step_is_terminal() {
        let mut mechanism = Ecdsa::new("", "user", P256_KEY_DER).unwrap();
        assert!(matches!(mechanism.step(b"x"), Err(Error::InvalidMessage)));
        assert!(matches!(mechanism.step(b""), Err(Error::InvalidState)));
    }
}
