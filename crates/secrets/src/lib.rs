mod cipher;
mod credentials;
mod error;

pub use cipher::{decrypt_token, encrypt_token, generate_key};
pub use credentials::{Credentials, DeployCredential, SealedCredentials, SealedSecret};
pub use error::{DecryptionError, EncryptionError, KeyError};
pub use secrecy::{ExposeSecret, SecretString};
