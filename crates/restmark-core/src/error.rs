use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum RestmarkError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No reachable targets — aborting before any phase")]
    NoReachableTargets,

    #[error("Chart error: {0}")]
    Chart(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Serialize for RestmarkError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
