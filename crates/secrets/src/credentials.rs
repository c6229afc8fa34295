use std::fmt;

use secrecy::{ExposeSecret, SecretString};

use crate::cipher::decrypt_token;
use crate::error::DecryptionError;

pub struct SealedSecret {
    pub ciphertext: String,
    pub key: SecretString,
}

impl SealedSecret {
    pub fn new(ciphertext: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            ciphertext: ciphertext.into(),
            key: SecretString::new(key.into()),
        }
    }

    pub fn open(&self) -> Result<SecretString, DecryptionError> {
        decrypt_token(&self.ciphertext, &self.key)
    }
}

impl fmt::Debug for SealedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealedSecret")
            .field("ciphertext_len", &self.ciphertext.len())
            .field("key", &"[redacted]")
            .finish()
    }
}

#[derive(Debug)]
pub struct SealedCredentials {
    pub deploy_username: String,
    pub deploy_token: SealedSecret,
    pub api_token: SealedSecret,
}

pub struct DeployCredential {
    username: String,
    token: SecretString,
}

impl DeployCredential {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }
}

impl fmt::Debug for DeployCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployCredential")
            .field("username", &self.username)
            .field("token", &"[redacted]")
            .finish()
    }
}

// Plaintext lives only inside `SecretString`, which zeroizes on drop.
pub struct Credentials {
    deploy: DeployCredential,
    api_token: SecretString,
}

impl Credentials {
    pub fn open(sealed: &SealedCredentials) -> Result<Self, DecryptionError> {
        let deploy_token = sealed
            .deploy_token
            .open()
            .map_err(|e| DecryptionError::for_secret("deploy token", e))?;
        let api_token = sealed
            .api_token
            .open()
            .map_err(|e| DecryptionError::for_secret("personal api token", e))?;
        Ok(Self {
            deploy: DeployCredential {
                username: sealed.deploy_username.clone(),
                token: deploy_token,
            },
            api_token,
        })
    }

    pub fn from_plaintext(
        deploy_username: impl Into<String>,
        deploy_token: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            deploy: DeployCredential {
                username: deploy_username.into(),
                token: SecretString::new(deploy_token.into()),
            },
            api_token: SecretString::new(api_token.into()),
        }
    }

    pub fn deploy(&self) -> &DeployCredential {
        &self.deploy
    }

    pub fn api_token(&self) -> &str {
        self.api_token.expose_secret()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("deploy", &self.deploy)
            .field("api_token", &"[redacted]")
            .finish()
    }
}
