use std::time::Duration;

use rdkafka::consumer::{BaseConsumer, Consumer};
use tracing::{debug, error, info};

use crate::config::ConsumerConfig;
use crate::error::{Result, SessionError};
use crate::models::Record;
use crate::shutdown::Shutdown;

/// Anything the consumer loop can pull records from.
pub trait RecordSource {
    /// Waits up to `timeout` for the next record. `Ok(None)` means nothing
    /// arrived in time.
    fn poll(&mut self, timeout: Duration) -> Result<Option<Record>>;

    fn close(self)
    where
        Self: Sized;
}

pub struct ConsumerSession {
    consumer: BaseConsumer,
    group_id: String,
}

impl ConsumerSession {
    pub fn connect(config: &ConsumerConfig) -> Result<Self> {
        config.session.validate()?;

        let consumer: BaseConsumer = config.client_config().create().map_err(|e| {
            SessionError::Configuration(format!("failed to create consumer: {}", e))
        })?;

        config.session.check_reachable(consumer.client())?;

        info!(
            group_id = %config.group_id,
            offset_reset = %config.offset_reset,
            "Consumer created"
        );
        Ok(ConsumerSession {
            consumer,
            group_id: config.group_id.clone(),
        })
    }

    pub fn subscribe(&self, topics: &[&str]) -> Result<()> {
        validate_topics(topics)?;
        self.consumer.subscribe(topics).map_err(|e| {
            SessionError::Configuration(format!("failed to subscribe to {:?}: {}", topics, e))
        })?;
        info!(?topics, group_id = %self.group_id, "Subscribed");
        Ok(())
    }

    pub fn poll(&self, timeout: Duration) -> Result<Option<Record>> {
        match self.consumer.poll(timeout) {
            None => Ok(None),
            Some(Ok(msg)) => Ok(Some(Record::from_message(&msg))),
            Some(Err(source)) => {
                let fatal = self.consumer.client().fatal_error().is_some();
                Err(SessionError::Poll { source, fatal })
            }
        }
    }

    /// Leaves the group and releases the handle.
    pub fn close(self) {
        info!(group_id = %self.group_id, "Closing consumer");
        self.consumer.unsubscribe();
        drop(self.consumer);
    }
}

fn validate_topics(topics: &[&str]) -> Result<()> {
    if topics.is_empty() {
        return Err(SessionError::Configuration(
            "cannot subscribe to an empty topic list".to_owned(),
        ));
    }
    if topics.iter().any(|topic| topic.is_empty()) {
        return Err(SessionError::Configuration(
            "topic names must not be empty".to_owned(),
        ));
    }
    Ok(())
}

impl RecordSource for ConsumerSession {
    fn poll(&mut self, timeout: Duration) -> Result<Option<Record>> {
        ConsumerSession::poll(self, timeout)
    }

    fn close(self) {
        ConsumerSession::close(self)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConsumeSummary {
    pub records: usize,
    pub swallowed_errors: usize,
}

/// Polls `source` every `poll_interval` until `shutdown` is triggered,
/// handing each record to `on_record`. The shutdown flag is checked between
/// polls, so cancellation is seen within one interval. The source is closed
/// exactly once on the way out, including when a fatal error ends the loop.
pub fn consume_until<S, F>(
    mut source: S,
    shutdown: &Shutdown,
    poll_interval: Duration,
    mut on_record: F,
) -> Result<ConsumeSummary>
where
    S: RecordSource,
    F: FnMut(&Record),
{
    let mut summary = ConsumeSummary::default();

    while !shutdown.is_triggered() {
        match source.poll(poll_interval) {
            Ok(Some(record)) => {
                summary.records += 1;
                on_record(&record);
            }
            Ok(None) => {}
            Err(e) if e.is_fatal() => {
                error!(error = %e, "Fatal consumer error");
                source.close();
                return Err(e);
            }
            Err(e) => {
                debug!(error = %e, "Ignoring transient poll error");
                summary.swallowed_errors += 1;
            }
        }
    }

    info!(
        records = summary.records,
        swallowed_errors = summary.swallowed_errors,
        "Consumer loop stopped"
    );
    source.close();
    Ok(summary)
}
