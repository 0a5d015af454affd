use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("refresh token rejected by the auth backend")]
    InvalidRefreshToken,

    #[error("credential pair rejected by the auth backend")]
    InvalidCredential,

    #[error("server error: {0}")]
    Server(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl GatewayError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    /// Map a non-success status outside the per-operation credential cases.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            500..=599 => GatewayError::Server(truncated),
            _ => GatewayError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Terminal errors mean the credential itself was rejected: retrying
    /// with the same token cannot succeed.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GatewayError::InvalidRefreshToken | GatewayError::InvalidCredential
        )
    }
}
