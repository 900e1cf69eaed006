//! Provides the client side of the mechanisms.

mod anonymous;
mod external;
mod oauthbearer;
mod plain;

#[cfg(feature = "ecdsa")]
mod ecdsa;

#[cfg(feature = "scram")]
mod scram;

pub use self::anonymous::Anonymous;
pub use self::external::External;
pub use self::oauthbearer::OAuthBearer;
pub use self::plain::Plain;

#[cfg(feature = "ecdsa")]
pub use self::ecdsa::Ecdsa;

#[cfg(feature = "scram")]
pub use self::scram::Scram;
