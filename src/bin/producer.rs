use anyhow::{Context, Result};
use clap::Parser;
use purchases::config::FLUSH_TIMEOUT;
use purchases::drivers::cli::{init_tracing, load_env_file, ProducerCli};
use purchases::producer::{report_deliveries, ProducerSession};
use purchases::purchases::{produce_purchases, BATCH_SIZE};
use tokio::task;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let env_file = load_env_file();
    init_tracing();
    if let Some(path) = env_file {
        debug!(path = %path.display(), "Loaded environment file");
    }

    let cli = ProducerCli::parse();
    let config = cli.config()?;

    let (session, reports) = task::block_in_place(|| ProducerSession::connect(&config))
        .context("Failed to create the producer")?;

    // Delivery reports are printed as they arrive, independently of the send loop.
    let listener = tokio::spawn(report_deliveries(reports, std::io::stdout()));

    let summary = produce_purchases(
        &session,
        &mut rand::thread_rng(),
        &config.session.topic,
        BATCH_SIZE,
    );
    info!(
        enqueued = summary.enqueued,
        rejected = summary.rejected,
        "Batch enqueued"
    );

    let undelivered = task::block_in_place(|| session.flush(FLUSH_TIMEOUT));
    if undelivered > 0 {
        warn!(undelivered, "Records still undelivered after flush");
    }

    session.close();

    let deliveries = listener.await.context("Delivery listener panicked")?;
    info!(
        delivered = deliveries.delivered,
        failed = deliveries.failed,
        "Producer finished"
    );
    Ok(())
}
