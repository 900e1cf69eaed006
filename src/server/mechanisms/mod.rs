//! Provides the server side of the mechanisms, along with the
//! authenticator traits that hook them up to credential storage.

mod anonymous;
mod external;
mod oauthbearer;
mod plain;

#[cfg(feature = "ecdsa")]
mod ecdsa;

#[cfg(feature = "scram")]
mod scram;

pub use self::anonymous::{Anonymous, AnonymousAuthenticator};
pub use self::external::{External, ExternalAuthenticator};
pub use self::oauthbearer::{OAuthBearer, OAuthBearerAuthenticator};
pub use self::plain::{Plain, PlainAuthenticator};

#[cfg(feature = "ecdsa")]
pub use self::ecdsa::{Ecdsa, EcdsaAuthenticator};

#[cfg(feature = "scram")]
pub use self::scram::{Scram, ScramAuthenticator};
