use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("subscription service unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("subscription service still failing after {attempts} attempts: {last_error}")]
    UpstreamExhausted { attempts: u32, last_error: String },

    #[error("malformed subscription response: {0}")]
    MalformedResponse(String),

    #[error("community not found: {0}")]
    CommunityNotFound(String),

    #[error("platform error: {0}")]
    Platform(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SyncError {
    /// Whether the failure came from the subscription service.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            SyncError::UpstreamUnavailable(_)
                | SyncError::UpstreamExhausted { .. }
                | SyncError::MalformedResponse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
