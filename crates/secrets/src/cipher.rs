use base64::{engine::general_purpose, Engine as _};
use fernet::Fernet;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{DecryptionError, EncryptionError, KeyError};

const KEY_LEN: usize = 32;
const TOKEN_VERSION: u8 = 0x80;
// version + timestamp + iv + one cipher block + hmac
const MIN_TOKEN_LEN: usize = 1 + 8 + 16 + 16 + 32;

pub fn generate_key() -> SecretString {
    SecretString::new(Fernet::generate_key())
}

pub fn encrypt_token(plaintext: &SecretString, key: &SecretString) -> Result<String, EncryptionError> {
    let cipher = cipher_for(key)?;
    let token = plaintext.expose_secret();
    if token.is_empty() {
        return Err(EncryptionError::EmptySecret);
    }
    Ok(cipher.encrypt(token.as_bytes()))
}

// Byte-exact: the plaintext is returned as sealed, surrounding whitespace included.
pub fn decrypt_token(ciphertext: &str, key: &SecretString) -> Result<SecretString, DecryptionError> {
    let cipher = cipher_for(key)?;
    let compact: String = ciphertext.split_whitespace().collect();
    check_token_shape(&compact)?;
    let decrypted = cipher
        .decrypt(&compact)
        .map_err(|_| DecryptionError::Authentication)?;
    let plaintext = String::from_utf8(decrypted).map_err(|_| DecryptionError::NotUtf8)?;
    if plaintext.is_empty() {
        return Err(DecryptionError::EmptySecret);
    }
    Ok(SecretString::new(plaintext))
}

fn cipher_for(key: &SecretString) -> Result<Fernet, KeyError> {
    let encoded = key.expose_secret().trim();
    if encoded.is_empty() {
        return Err(KeyError::Empty);
    }
    let decoded = general_purpose::URL_SAFE
        .decode(encoded)
        .map_err(|_| KeyError::NotBase64)?;
    if decoded.len() != KEY_LEN {
        return Err(KeyError::WrongLength(decoded.len()));
    }
    Fernet::new(encoded).ok_or(KeyError::NotBase64)
}

fn check_token_shape(token: &str) -> Result<(), DecryptionError> {
    if token.is_empty() {
        return Err(DecryptionError::Corrupt("ciphertext is empty"));
    }
    let raw = general_purpose::URL_SAFE
        .decode(token)
        .map_err(|_| DecryptionError::Corrupt("ciphertext is not url-safe base64"))?;
    if raw.first() != Some(&TOKEN_VERSION) {
        return Err(DecryptionError::Corrupt("unknown token version"));
    }
    if raw.len() < MIN_TOKEN_LEN {
        return Err(DecryptionError::Corrupt("token is truncated"));
    }
    Ok(())
}
