use std::fmt;

use thiserror::Error;

/// Which credential backend an error (or a token) came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    AzureCli,
    DeviceCode,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::AzureCli => "Azure CLI",
            Backend::DeviceCode => "device code",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("{backend} credential unavailable: {reason}")]
    CredentialConstruction { backend: Backend, reason: String },
    #[error("az login failed: {0}")]
    LoginFailed(String),
    #[error("{backend} token request failed: {reason}")]
    TokenRequest { backend: Backend, reason: String },
    #[error("could not decode token claims: {0}")]
    ClaimsDecode(String),
    #[error("authentication cancelled")]
    Cancelled,
}

impl AuthError {
    pub fn construction(backend: Backend, reason: impl Into<String>) -> Self {
        AuthError::CredentialConstruction {
            backend,
            reason: reason.into(),
        }
    }

    pub fn token(backend: Backend, reason: impl Into<String>) -> Self {
        AuthError::TokenRequest {
            backend,
            reason: reason.into(),
        }
    }
}
