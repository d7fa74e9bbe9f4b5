use thiserror::Error;

/// Failures reported by a broker session (connection, drain, subscription binding, ack/nak).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    #[error("Connect error: {0}")]
    Connect(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Drain error: {0}")]
    Drain(String),

    #[error("Subscribe error: {0}")]
    Subscribe(String),

    #[error("Ack error: {0}")]
    Ack(String),
}

/// Outcome of a failed pull fetch. Only `Other` is a real failure; the loop handles all three locally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// No message arrived within the fetch wait; normal idle polling.
    #[error("No messages within fetch wait")]
    Timeout,

    /// The stream service is temporarily unavailable (e.g. no responders / 503).
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Fetch error: {0}")]
    Other(String),
}

/// Failures reported by a bot session (Telegram API calls).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BotError {
    #[error("Bot API error: {0}")]
    Api(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid allowed update type: {0}")]
    InvalidAllowedUpdate(String),

    #[error("Bot session has been dropped")]
    SessionGone,

    #[error("Update has no chat")]
    NoChat,
}

/// A fetched payload could not be turned into an update.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid update JSON: {0}")]
    Json(#[from] serde_json::Error),
}
