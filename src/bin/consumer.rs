use anyhow::{Context, Result};
use clap::Parser;
use purchases::config::POLL_INTERVAL;
use purchases::consumer::{consume_until, ConsumerSession};
use purchases::drivers::cli::{init_tracing, load_env_file, ConsumerCli};
use purchases::shutdown::{listen_for_signals, Shutdown};
use tokio::task;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let env_file = load_env_file();
    init_tracing();
    if let Some(path) = env_file {
        debug!(path = %path.display(), "Loaded environment file");
    }

    let cli = ConsumerCli::parse();
    let config = cli.config()?;

    let shutdown = Shutdown::new();
    listen_for_signals(shutdown.clone(), std::io::stdout());

    let summary = task::spawn_blocking(move || {
        let session = ConsumerSession::connect(&config)?;
        if let Err(e) = session.subscribe(&[config.session.topic.as_str()]) {
            session.close();
            return Err(e);
        }
        consume_until(session, &shutdown, POLL_INTERVAL, |record| {
            println!("{}", record)
        })
    })
    .await
    .context("Consumer task panicked")?
    .context("Consumer failed")?;

    info!(records = summary.records, "Consumer finished");
    Ok(())
}
