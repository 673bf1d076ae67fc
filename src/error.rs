use rdkafka::error::KafkaError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("failed to connect to broker '{broker}': {source}")]
    Connection {
        broker: String,
        #[source]
        source: KafkaError,
    },

    #[error("failed to enqueue record for topic '{topic}': {source}")]
    Enqueue {
        topic: String,
        #[source]
        source: KafkaError,
    },

    #[error("consumer poll failed: {source}")]
    Poll {
        #[source]
        source: KafkaError,
        fatal: bool,
    },
}

impl SessionError {
    /// Whether the session can keep going after this error.
    pub fn is_fatal(&self) -> bool {
        match self {
            SessionError::Poll { fatal, .. } => *fatal,
            SessionError::Enqueue { .. } => false,
            SessionError::Configuration(_) | SessionError::Connection { .. } => true,
        }
    }
}
