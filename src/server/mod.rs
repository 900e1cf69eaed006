//! Server-side ("responder") mechanism implementations.

use crate::error::Error;

/// The observable result of a server-side exchange.
///
/// The authorization identity only exists on success, so a completed-but-
/// failed exchange cannot claim one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The exchange has not finished yet.
    InProgress,
    /// The exchange finished without authenticating the peer.
    Failure,
    /// The peer was authenticated and authorized.
    Success {
        /// The authorization identity the peer may act as.
        authz: String,
    },
}

impl Outcome {
    /// Whether the exchange has finished, successfully or not.
    pub fn is_completed(&self) -> bool {
        !matches!(self, Outcome::InProgress)
    }

    /// The authorization identity, present only on success.
    pub fn authz(&self) -> Option<&str> {
        match self {
            Outcome::Success { authz } => Some(authz),
            _ => None,
        }
    }
}

/// A trait which defines the server side of a SASL mechanism.
///
/// The application relays messages between the client and the mechanism,
/// one at a time, through [`step`](Mechanism::step), and consults
/// [`outcome`](Mechanism::outcome) after each call to learn whether the
/// exchange has finished.
pub trait Mechanism {
    /// The name of the mechanism, as registered with the IANA.
    fn name(&self) -> &str;

    /// Whether the first message of the exchange is sent by the client.
    /// True for every mechanism implemented here.
    fn is_client_first(&self) -> bool {
        true
    }

    /// Consumes one message from the client and produces the next message
    /// to send, or `None` when nothing must be sent back.
    ///
    /// Returning an error leaves the session in a failed state; every later
    /// call returns [`Error::InvalidState`].
    fn step(&mut self, input: &[u8]) -> Result<Option<Vec<u8>>, Error>;

    /// The result of the exchange so far.
    fn outcome(&self) -> &Outcome;
}

pub mod mechanisms;
