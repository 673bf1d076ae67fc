use std::io::Write;
use std::time::Duration;

use rdkafka::client::ClientContext;
use rdkafka::producer::{BaseRecord, DeliveryResult, Producer, ProducerContext, ThreadedProducer};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::config::ProducerConfig;
use crate::error::{Result, SessionError};
use crate::models::{DeliveryOutcome, Record};

/// Receiving end of the delivery-report channel. It yields `None` once the
/// session that produced it has been closed.
pub type DeliveryReports = UnboundedReceiver<DeliveryOutcome>;

/// Anything records can be handed to for sending.
pub trait RecordSink {
    fn send(&self, record: &Record) -> Result<()>;
}

/// Client context that forwards every delivery callback into a channel.
pub struct DeliveryReporter {
    outcomes: UnboundedSender<DeliveryOutcome>,
}

impl ClientContext for DeliveryReporter {}

impl ProducerContext for DeliveryReporter {
    type DeliveryOpaque = ();

    fn delivery(&self, delivery_result: &DeliveryResult<'_>, _: Self::DeliveryOpaque) {
        let outcome = DeliveryOutcome::from_result(delivery_result);
        if self.outcomes.send(outcome).is_err() {
            debug!("Delivery report dropped, listener is gone");
        }
    }
}

pub struct ProducerSession {
    producer: ThreadedProducer<DeliveryReporter>,
    topic: String,
}

impl ProducerSession {
    /// Creates the producer and checks that the broker answers. Delivery
    /// outcomes for every record sent through the session arrive on the
    /// returned receiver.
    pub fn connect(config: &ProducerConfig) -> Result<(Self, DeliveryReports)> {
        config.session.validate()?;

        let (outcomes, reports) = mpsc::unbounded_channel();
        let producer: ThreadedProducer<DeliveryReporter> = config
            .client_config()
            .create_with_context(DeliveryReporter { outcomes })
            .map_err(|e| {
                SessionError::Configuration(format!("failed to create producer: {}", e))
            })?;

        config.session.check_reachable(producer.client())?;

        Ok((
            ProducerSession {
                producer,
                topic: config.session.topic.clone(),
            },
            reports,
        ))
    }

    /// Hands the record to the client's buffer and returns without waiting
    /// for the broker.
    pub fn send(&self, record: &Record) -> Result<()> {
        let base = BaseRecord::to(&record.topic)
            .key(record.key.as_str())
            .payload(record.value.as_str());
        self.producer
            .send(base)
            .map_err(|(source, _)| SessionError::Enqueue {
                topic: record.topic.clone(),
                source,
            })
    }

    /// Waits up to `timeout` for buffered records to be delivered and returns
    /// how many are still outstanding.
    pub fn flush(&self, timeout: Duration) -> usize {
        if let Err(e) = self.producer.flush(timeout) {
            warn!(error = %e, "Flush did not complete");
        }
        let undelivered = self.in_flight();
        debug!(undelivered, "Flushed producer");
        undelivered
    }

    pub fn in_flight(&self) -> usize {
        self.producer.in_flight_count().max(0) as usize
    }

    /// Shuts the producer down. The delivery-report channel closes once the
    /// client has released its context.
    pub fn close(self) {
        info!(
            topic = %self.topic,
            in_flight = self.in_flight(),
            "Closing producer"
        );
        drop(self.producer);
    }
}

impl RecordSink for ProducerSession {
    fn send(&self, record: &Record) -> Result<()> {
        ProducerSession::send(self, record)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeliverySummary {
    pub delivered: usize,
    pub failed: usize,
}

/// Drains delivery outcomes until the channel closes, writing one line per
/// outcome to `out`.
pub async fn report_deliveries<W: Write>(
    mut reports: DeliveryReports,
    mut out: W,
) -> DeliverySummary {
    let mut summary = DeliverySummary::default();
    while let Some(outcome) = reports.recv().await {
        if outcome.is_delivered() {
            summary.delivered += 1;
        } else {
            summary.failed += 1;
        }
        if let Err(e) = writeln!(out, "{}", outcome) {
            warn!(error = %e, "Failed to write delivery report");
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TOPIC;
    use rdkafka::config::ClientConfig;
    use tokio::task;
    use tokio::time::timeout;

    fn delivered(key: &str, value: &str) -> DeliveryOutcome {
        DeliveryOutcome::Delivered(Record::new(TOPIC, key, value))
    }

    #[tokio::test]
    async fn listener_reports_each_outcome_and_stops_when_channel_closes() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(delivered("eabara", "book")).unwrap();
        let failed = DeliveryOutcome::Failed {
            record: Record::new(TOPIC, "jsmith", "batteries"),
            error: "Broker: Not enough in-sync replicas".to_owned(),
        };
        tx.send(failed).unwrap();
        tx.send(delivered("awalther", "t-shirts")).unwrap();
        drop(tx);

        let mut out = Vec::new();
        let summary = report_deliveries(rx, &mut out).await;

        assert_eq!(summary.delivered, 2);
        assert_eq!(summary.failed, 1);
        let printed = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = printed.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Produced event to topic purchases: key = eabara     value = book",
                "Failed to deliver message: Broker: Not enough in-sync replicas",
                "Produced event to topic purchases: key = awalther   value = t-shirts",
            ]
        );
    }

    #[tokio::test]
    async fn listener_runs_concurrently_with_sender() {
        let (tx, rx) = mpsc::unbounded_channel();
        let listener = tokio::spawn(report_deliveries(rx, std::io::sink()));

        for _ in 0..10 {
            tx.send(delivered("sgarcia", "gift card")).unwrap();
            task::yield_now().await;
        }
        drop(tx);

        let summary = listener.await.unwrap();
        assert_eq!(summary.delivered, 10);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn undeliverable_record_is_reported_and_close_ends_the_listener() {
        // Nothing listens on port 1, so the record times out in the client.
        let (outcomes, reports) = mpsc::unbounded_channel();
        let producer: ThreadedProducer<DeliveryReporter> = ClientConfig::new()
            .set("bootstrap.servers", "127.0.0.1:1")
            .set("message.timeout.ms", "300")
            .create_with_context(DeliveryReporter { outcomes })
            .unwrap();
        let session = ProducerSession {
            producer,
            topic: TOPIC.to_owned(),
        };

        session.send(&Record::new(TOPIC, "eabara", "book")).unwrap();
        let listener = tokio::spawn(report_deliveries(reports, std::io::sink()));

        let undelivered = task::block_in_place(|| session.flush(Duration::from_secs(5)));
        session.close();

        let finished = timeout(Duration::from_secs(10), listener).await;
        let summary = finished.unwrap().unwrap();
        assert_eq!(undelivered, 0);
        assert_eq!(summary.delivered, 0);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn session_is_shareable_across_tasks() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ProducerSession>();
    }
}
