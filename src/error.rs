use thiserror::Error;

/// A wrapper enum for everything that can go wrong during an exchange.
///
/// Every error is terminal for the session it occurred in: after a `step`
/// call has returned an error, all further calls return
/// [`InvalidState`](Error::InvalidState).
#[derive(Debug, Error)]
pub enum Error {
    /// A `step` call was made at an inappropriate moment in the exchange,
    /// including any call after a terminal success or failure.
    #[error("mechanism in invalid state")]
    InvalidState,

    /// The peer sent a syntactically invalid message.
    #[error("invalid message")]
    InvalidMessage,

    /// The peer could not be authenticated.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// The authenticated identity is not authorized to act as the requested
    /// or derived authorization identity.
    #[error("unauthorized")]
    Unauthorized,

    /// The supplied key material is not on the NIST P-256 curve.
    #[error("invalid curve")]
    InvalidCurve,

    /// The supplied [`Credentials`](crate::common::Credentials) do not carry
    /// what the mechanism needs.
    #[error("credentials do not match the mechanism")]
    MissingCredentials,

    /// A string failed preparation, such as SASLprep on an authentication
    /// identity or the trace profile on an ANONYMOUS trace.
    #[error("string preparation failed: {0}")]
    StringPrep(String),

    /// The random source failed while generating a nonce or challenge.
    #[cfg(any(feature = "scram", feature = "ecdsa"))]
    #[error("random source failure: {0}")]
    Rng(#[from] getrandom::Error),
}

impl From<stringprep::Error> for Error {
    fn from(err: stringprep::Error) -> Error {
        Error::StringPrep(err.to_string())
    }
}
