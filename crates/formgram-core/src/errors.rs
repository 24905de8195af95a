/// Core error type for infrastructure operations.
///
/// Delivery attempts never surface this type: they are classified into a
/// `DeliveryResult` instead. Adapter crates map their transport errors into
/// `Error::Transport` so the delivery client can capture them uniformly.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
