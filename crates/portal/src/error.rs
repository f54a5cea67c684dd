use std::fmt;

#[derive(Debug)]
pub enum PortalError {
    /// Invalid caller input, maps to 400.
    Value(String),
    NotFound(String),
    InsufficientFunds {
        required: f64,
        available: f64,
    },
    Redis(redis::RedisError),
    Serialization(serde_json::Error),
    /// Grid or wallet service failure.
    Upstream(anyhow::Error),
}

impl fmt::Display for PortalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortalError::Value(msg) => write!(f, "{msg}"),
            PortalError::NotFound(what) => write!(f, "{what} not found"),
            PortalError::InsufficientFunds {
                required,
                available,
            } => write!(
                f,
                "insufficient funds: {required} TFT required, {available} TFT available"
            ),
            PortalError::Redis(e) => write!(f, "Redis error: {e}"),
            PortalError::Serialization(e) => write!(f, "Serialization error: {e}"),
            PortalError::Upstream(e) => write!(f, "Upstream error: {e}"),
        }
    }
}

impl std::error::Error for PortalError {}

impl From<redis::RedisError> for PortalError {
    fn from(err: redis::RedisError) -> Self {
        PortalError::Redis(err)
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(err: serde_json::Error) -> Self {
        PortalError::Serialization(err)
    }
}

impl From<anyhow::Error> for PortalError {
    fn from(err: anyhow::Error) -> Self {
        PortalError::Upstream(err)
    }
}
