#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{detail}")]
    Rejected { status: u16, detail: String },
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Network-level failure. Recovered locally: the next poll tick or the
    /// reconnect cycle retries, nothing is surfaced beyond connection state.
    Transport,
    /// The backend refused the operation. Surfaced to the user, no retry.
    Rejected,
    /// The response body did not decode. Dropped like any malformed payload.
    Decode,
}

impl ApiError {
    pub fn kind(&self) -> ApiErrorKind {
        match self {
            ApiError::Transport(_) => ApiErrorKind::Transport,
            ApiError::Rejected { .. } => ApiErrorKind::Rejected,
            ApiError::Decode(_) => ApiErrorKind::Decode,
        }
    }

    /// Human-readable rejection detail, or the transport/decode message.
    pub fn detail(&self) -> String {
        match self {
            ApiError::Rejected { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}
