//! BMC login credentials.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Problems with the credentials for a BMC.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialsError {
    #[error("the host has no BMC credentials secret name")]
    MissingSecretName,

    #[error("BMC credentials secret '{namespace}/{name}' was not found")]
    SecretNotFound { namespace: String, name: String },

    #[error("missing BMC username")]
    MissingUsername,

    #[error("missing BMC password")]
    MissingPassword,
}

/// Username and password for a BMC.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Check that both fields are present.
    ///
    /// # Errors
    /// Returns the first missing field.
    pub fn validate(&self) -> Result<(), CredentialsError> {
        if self.username.is_empty() {
            return Err(CredentialsError::MissingUsername);
        }
        if self.password.is_empty() {
            return Err(CredentialsError::MissingPassword);
        }
        Ok(())
    }
}
