use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rdkafka::client::{Client, ClientContext};
use rdkafka::config::ClientConfig;
use tracing::{debug, info};

use crate::error::{Result, SessionError};

pub const TOPIC: &str = "purchases";
pub const SECURITY_PROTOCOL: &str = "SASL_SSL";
pub const SASL_MECHANISMS: &str = "PLAIN";
pub const DEFAULT_GROUP_ID: &str = "kafka-consumer-groud-0";
pub const PRODUCER_ACKS: &str = "all";

pub const POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const FLUSH_TIMEOUT: Duration = Duration::from_secs(15);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// SASL credentials. The secret never shows up in `Debug` output.
#[derive(Clone)]
pub struct Credentials {
    pub key: String,
    pub secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Connection settings shared by both sessions.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub broker: String,
    pub credentials: Credentials,
    pub topic: String,
    /// Upper bound on the metadata request made when a session is created.
    pub connect_timeout: Duration,
}

impl SessionConfig {
    pub fn new(broker: impl Into<String>, credentials: Credentials) -> Self {
        SessionConfig {
            broker: broker.into(),
            credentials,
            topic: TOPIC.to_owned(),
            connect_timeout: CONNECT_TIMEOUT,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.broker.trim().is_empty() {
            return Err(SessionError::Configuration(
                "broker address must not be empty".to_owned(),
            ));
        }
        if self.credentials.key.is_empty() || self.credentials.secret.is_empty() {
            return Err(SessionError::Configuration(
                "SASL key and secret must both be set".to_owned(),
            ));
        }
        if self.topic.is_empty() {
            return Err(SessionError::Configuration(
                "topic must not be empty".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", &self.broker)
            .set("sasl.username", &self.credentials.key)
            .set("sasl.password", &self.credentials.secret)
            .set("security.protocol", SECURITY_PROTOCOL)
            .set("sasl.mechanisms", SASL_MECHANISMS);
        client_config
    }

    /// Fetches topic metadata so an unreachable broker or rejected
    /// credentials surface at session creation, within `connect_timeout`.
    pub(crate) fn check_reachable<C: ClientContext>(&self, client: &Client<C>) -> Result<()> {
        debug!(
            broker = %self.broker,
            timeout_ms = self.connect_timeout.as_millis() as u64,
            "Probing broker metadata"
        );
        let metadata = client
            .fetch_metadata(Some(self.topic.as_str()), self.connect_timeout)
            .map_err(|source| SessionError::Connection {
                broker: self.broker.clone(),
                source,
            })?;

        let partitions = metadata
            .topics()
            .first()
            .map(|topic| topic.partitions().len())
            .unwrap_or(0);
        info!(
            broker = %self.broker,
            topic = %self.topic,
            partitions,
            "Connected to broker"
        );
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct ProducerConfig {
    pub session: SessionConfig,
}

impl ProducerConfig {
    pub fn new(session: SessionConfig) -> Result<Self> {
        session.validate()?;
        Ok(ProducerConfig { session })
    }

    pub fn client_config(&self) -> ClientConfig {
        let mut client_config = self.session.client_config();
        client_config.set("acks", PRODUCER_ACKS);
        client_config
    }
}

/// Where a consumer group starts reading when it has no committed offset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OffsetReset {
    #[default]
    Earliest,
    Latest,
}

impl OffsetReset {
    pub fn as_str(&self) -> &'static str {
        match self {
            OffsetReset::Earliest => "earliest",
            OffsetReset::Latest => "latest",
        }
    }
}

impl fmt::Display for OffsetReset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OffsetReset {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "earliest" => Ok(OffsetReset::Earliest),
            "latest" => Ok(OffsetReset::Latest),
            other => Err(SessionError::Configuration(format!(
                "unknown offset reset policy '{}'",
                other
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ConsumerConfig {
    pub session: SessionConfig,
    pub group_id: String,
    pub offset_reset: OffsetReset,
}

impl ConsumerConfig {
    pub fn new(session: SessionConfig, group_id: impl Into<String>) -> Result<Self> {
        session.validate()?;
        let group_id = group_id.into();
        if group_id.is_empty() {
            return Err(SessionError::Configuration(
                "consumer group id must not be empty".to_owned(),
            ));
        }
        Ok(ConsumerConfig {
            session,
            group_id,
            offset_reset: OffsetReset::default(),
        })
    }

    pub fn client_config(&self) -> ClientConfig {
        let mut client_config = self.session.client_config();
        client_config
            .set("group.id", &self.group_id)
            .set("auto.offset.reset", self.offset_reset.as_str());
        client_config
    }
}
