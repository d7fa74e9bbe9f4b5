use thiserror::Error;
use updater_core::{BotError, BrokerError, DecodeError};

#[derive(Error, Debug)]
pub enum UpdaterError {
    #[error("This Updater is already running")]
    AlreadyRunning,

    #[error("This Updater is not running")]
    NotRunning,

    #[error("This Updater was not initialized via `initialize`")]
    NotInitialized,

    #[error("Cannot shut down while running")]
    StillRunning,

    #[error("Failed to connect to broker: {0}")]
    BrokerConnect(#[source] BrokerError),

    #[error("Failed to initialize bot: {0}")]
    BotConnect(#[source] BotError),

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Bot error: {0}")]
    Bot(#[from] BotError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Failed to spawn poll task: {0}")]
    Spawn(String),
}

impl UpdaterError {
    /// Lifecycle contract violations: a bug in the caller, not a runtime condition.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::AlreadyRunning | Self::NotRunning | Self::NotInitialized | Self::StillRunning
        )
    }

    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::BrokerConnect(_) | Self::BotConnect(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
}

pub type Result<T> = std::result::Result<T, UpdaterError>;
