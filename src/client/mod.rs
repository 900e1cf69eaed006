//! Client-side ("initiator") mechanism implementations.

use crate::common::Credentials;
use crate::error::Error;

/// A trait which defines the client side of a SASL mechanism.
///
/// The application relays messages between the mechanism and the server,
/// one at a time, through [`step`](Mechanism::step). Every mechanism in
/// this crate is client-first: drive the first message by calling `step`
/// with an empty input.
pub trait Mechanism {
    /// The name of the mechanism, as registered with the IANA.
    fn name(&self) -> &str;

    /// Whether the first message of the exchange is sent by the client.
    /// True for every mechanism implemented here.
    fn is_client_first(&self) -> bool {
        true
    }

    /// Creates this mechanism from `Credentials`.
    fn from_credentials(credentials: Credentials) -> Result<Self, Error>
    where
        Self: Sized;

    /// Consumes one message from the server and produces the next message
    /// to send, or `None` when authentication has finished successfully and
    /// no further data must be sent.
    ///
    /// Returning an error leaves the session in a failed state; every later
    /// call returns [`Error::InvalidState`].
    fn step(&mut self, input: &[u8]) -> Result<Option<Vec<u8>>, Error>;
}

pub mod mechanisms;
