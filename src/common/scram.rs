//! The cryptographic core shared by the SCRAM-* client and server.

use hmac::{Hmac, Mac};
use sha1::Sha1 as Sha1Hash;
use sha2::{Digest, Sha256 as Sha256Hash};

use crate::common::xor;

/// A trait which defines the hash parameterization needed for SCRAM.
pub trait ScramProvider {
    /// The name of the hash function, as it appears in the mechanism name.
    fn name() -> &'static str;

    /// A function which hashes the data using the hash function.
    fn hash(data: &[u8]) -> Vec<u8>;

    /// A function which performs an HMAC over the data using the hash
    /// function.
    fn hmac(key: &[u8], data: &[u8]) -> Vec<u8>;

    /// A function which derives a salted password from a plaintext one,
    /// producing as many bytes as the HMAC output length.
    fn derive(passwd: &[u8], salt: &[u8], iterations: u32) -> Vec<u8>;
}

/// A `ScramProvider` which provides SCRAM-SHA-1.
pub struct Sha1;

impl ScramProvider for Sha1 {
    fn name() -> &'static str {
        "SHA-1"
    }

    fn hash(data: &[u8]) -> Vec<u8> {
        Sha1Hash::digest(data).to_vec()
    }

    fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
        let mut mac =
            Hmac::<Sha1Hash>::new_from_slice(key).expect("HMAC can take key of any size");
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }

    fn derive(passwd: &[u8], salt: &[u8], iterations: u32) -> Vec<u8> {
        let mut out = vec![0u8; 20];
        pbkdf2::pbkdf2_hmac::<Sha1Hash>(passwd, salt, iterations, &mut out);
        out
    }
}

/// A `ScramProvider` which provides SCRAM-SHA-256.
pub struct Sha256;

impl ScramProvider for Sha256 {
    fn name() -> &'static str {
        "SHA-256"
    }

    fn hash(data: &[u8]) -> Vec<u8> {
        Sha256Hash::digest(data).to_vec()
    }

    fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
        let mut mac =
            Hmac::<Sha256Hash>::new_from_slice(key).expect("HMAC can take key of any size");
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }

    fn derive(passwd: &[u8], salt: &[u8], iterations: u32) -> Vec<u8> {
        let mut out = vec![0u8; 32];
        pbkdf2::pbkdf2_hmac::<Sha256Hash>(passwd, salt, iterations, &mut out);
        out
    }
}

/// Compute the client proof over an auth message.
///
/// `ClientProof = ClientKey XOR HMAC(H(ClientKey), AuthMessage)`.
pub(crate) fn client_proof<S: ScramProvider>(salted_password: &[u8], auth_message: &[u8]) -> Vec<u8> {
    let client_key = S::hmac(salted_password, b"Client Key");
    let stored_key = S::hash(&client_key);
    let client_signature = S::hmac(&stored_key, auth_message);
    xor(&client_key, &client_signature)
}

/// Compute the server signature over an auth message.
///
/// `ServerSignature = HMAC(HMAC(SaltedPassword, "Server Key"), AuthMessage)`.
pub(crate) fn server_signature<S: ScramProvider>(
    salted_password: &[u8],
    auth_message: &[u8],
) -> Vec<u8> {
    let server_key = S::hmac(salted_password, b"Server Key");
    S::hmac(&server_key, auth_message)
}
