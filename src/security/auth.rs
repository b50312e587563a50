//! Bearer token authentication for the control API

use crate::error::ControllerError;
use subtle::ConstantTimeEq;

/// Checks `Authorization: Bearer <token>` values against a shared secret
#[derive(Clone)]
pub struct BearerAuth {
    secret: String,
}

impl BearerAuth {
    /// Create a checker for `secret`
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Verify a raw `Authorization` header value
    pub fn verify_header(&self, header: Option<&str>) -> Result<(), ControllerError> {
        let header = header
            .ok_or_else(|| ControllerError::Auth("Missing authorization header".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ControllerError::Auth("Expected a Bearer token".to_string()))?;

        if self.verify_token(token.trim()) {
            Ok(())
        } else {
            Err(ControllerError::Auth("Invalid API key".to_string()))
        }
    }

    /// Constant-time comparison of `token` with the secret
    pub fn verify_token(&self, token: &str) -> bool {
        token.as_bytes().ct_eq(self.secret.as_bytes()).into()
    }
}

impl std::fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuth").field("secret", &"<redacted>").finish()
    }
}
