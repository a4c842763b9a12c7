/// Errors talking to a Falcon Pi Player
#[derive(Debug, thiserror::Error)]
pub enum FppError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {path} failed: {source}")]
    Http {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{path} returned HTTP {status}")]
    Status { path: String, status: u16 },

    #[error("volume level {0} is outside 0.0-1.0")]
    InvalidVolume(f64),

    #[error("{0} is not supported by this player")]
    Unsupported(&'static str),
}
