use thiserror::Error;

#[derive(Debug, Error)]
pub enum WsError {
    #[error("Websocket transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Feed message parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No pong received within {0} seconds, connection presumed dead")]
    DeadConnection(u64),

    #[error("Feed closed by the venue")]
    Closed,

    #[error("Snapshot resync failed: {0}")]
    Resync(#[source] anyhow::Error),
}

pub type WsResult<T> = std::result::Result<T, WsError>;
