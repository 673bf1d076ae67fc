use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::config::{ConsumerConfig, Credentials, ProducerConfig, SessionConfig, DEFAULT_GROUP_ID};
use crate::error::Result;

/// Broker connection settings, taken from flags or the environment.
#[derive(Args, Clone, Debug)]
pub struct ConnectionArgs {
    /// Broker address (host:port)
    #[arg(long, env = "BROKER")]
    pub broker: String,

    /// SASL username (API key)
    #[arg(long, env = "KEY")]
    pub key: String,

    /// SASL password (API secret)
    #[arg(long, env = "SECRET", hide_env_values = true)]
    pub secret: String,

    /// Seconds to wait for the broker before giving up on startup
    #[arg(long, default_value_t = 10)]
    pub connect_timeout_secs: u64,
}

impl ConnectionArgs {
    pub fn session_config(&self) -> SessionConfig {
        let mut session = SessionConfig::new(
            self.broker.clone(),
            Credentials {
                key: self.key.clone(),
                secret: self.secret.clone(),
            },
        );
        session.connect_timeout = Duration::from_secs(self.connect_timeout_secs);
        session
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "producer",
    version,
    about = "Send a batch of mock purchases to the purchases topic."
)]
pub struct ProducerCli {
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

impl ProducerCli {
    pub fn config(&self) -> Result<ProducerConfig> {
        ProducerConfig::new(self.connection.session_config())
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "consumer",
    version,
    about = "Print purchases from the purchases topic until interrupted."
)]
pub struct ConsumerCli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Join a new, randomly named consumer group and read the topic from the start
    #[arg(long)]
    pub fresh_group: bool,
}

impl ConsumerCli {
    pub fn group_id(&self) -> String {
        if self.fresh_group {
            Uuid::new_v4().to_string()
        } else {
            DEFAULT_GROUP_ID.to_owned()
        }
    }

    pub fn config(&self) -> Result<ConsumerConfig> {
        ConsumerConfig::new(self.connection.session_config(), self.group_id())
    }
}

/// Loads `.env` from the working directory if there is one. Variables that
/// are already exported win. Runs before logging is set up so `RUST_LOG` can
/// come from the file too.
pub fn load_env_file() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => Some(path),
        Err(e) if e.not_found() => None,
        Err(e) => {
            eprintln!("Ignoring unreadable .env file: {}", e);
            None
        }
    }
}

/// Diagnostics go to stderr so stdout only carries record lines.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OffsetReset;

    const CONNECTION: [&str; 7] = [
        "--broker",
        "pkc-test.example.com:9092",
        "--key",
        "api-key",
        "--secret",
        "api-secret",
        "--connect-timeout-secs=3",
    ];

    fn args(bin: &str, extra: &[&str]) -> Vec<String> {
        std::iter::once(bin)
            .chain(CONNECTION)
            .chain(extra.iter().copied())
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn producer_flags_build_config() {
        let cli = ProducerCli::try_parse_from(args("producer", &[])).unwrap();
        let config = cli.config().unwrap();
        assert_eq!(config.session.broker, "pkc-test.example.com:9092");
        assert_eq!(config.session.credentials.key, "api-key");
        assert_eq!(config.session.topic, "purchases");
        assert_eq!(config.session.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn consumer_defaults_to_fixed_group() {
        let cli = ConsumerCli::try_parse_from(args("consumer", &[])).unwrap();
        let config = cli.config().unwrap();
        assert_eq!(config.group_id, "kafka-consumer-groud-0");
        assert_eq!(config.offset_reset, OffsetReset::Earliest);
    }

    #[test]
    fn fresh_group_is_random_per_call() {
        let cli = ConsumerCli::try_parse_from(args("consumer", &["--fresh-group"])).unwrap();
        let first = cli.group_id();
        let second = cli.group_id();
        assert_ne!(first, DEFAULT_GROUP_ID);
        assert_ne!(first, second);
        assert!(Uuid::parse_str(&first).is_ok());
    }

    #[test]
    fn empty_broker_flag_is_a_configuration_error() {
        let mut argv = args("producer", &[]);
        argv[2] = String::new();
        let cli = ProducerCli::try_parse_from(argv).unwrap();
        assert!(cli.config().is_err());
    }

    #[test]
    fn clap_definitions_are_consistent() {
        use clap::CommandFactory;
        ProducerCli::command().debug_assert();
        ConsumerCli::command().debug_assert();
    }
}
