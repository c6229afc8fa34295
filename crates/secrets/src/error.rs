use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum KeyError {
    #[error("encryption key is empty")]
    Empty,
    #[error("encryption key is not url-safe base64")]
    NotBase64,
    #[error("encryption key decodes to {0} bytes, expected 32")]
    WrongLength(usize),
}

#[derive(Error, Debug)]
pub enum DecryptionError {
    #[error("malformed encryption key: {0}")]
    Key(#[from] KeyError),
    #[error("ciphertext is corrupt: {0}")]
    Corrupt(&'static str),
    #[error("ciphertext failed authentication (wrong key or tampered value)")]
    Authentication,
    #[error("decrypted secret is not utf-8")]
    NotUtf8,
    #[error("decrypted secret is empty")]
    EmptySecret,
    #[error("failed to decrypt {name}: {source}")]
    Secret {
        name: &'static str,
        #[source]
        source: Box<DecryptionError>,
    },
}

impl DecryptionError {
    pub(crate) fn for_secret(name: &'static str, source: DecryptionError) -> Self {
        Self::Secret {
            name,
            source: Box::new(source),
        }
    }
}

#[derive(Error, Debug)]
pub enum EncryptionError {
    #[error("malformed encryption key: {0}")]
    Key(#[from] KeyError),
    #[error("refusing to encrypt an empty secret")]
    EmptySecret,
}
