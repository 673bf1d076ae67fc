use rand::Rng;
use tracing::warn;

use crate::models::Record;
use crate::producer::RecordSink;

/// Number of purchases the producer sends per run.
pub const BATCH_SIZE: usize = 10;

pub const USERS: [&str; 6] = [
    "eabara", "jsmith", "sgarcia", "jbernard", "htanaka", "awalther",
];
pub const ITEMS: [&str; 5] = ["book", "alarm clock", "t-shirts", "gift card", "batteries"];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProduceSummary {
    pub enqueued: usize,
    pub rejected: usize,
}

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, choices: &[&'a str]) -> &'a str {
    choices[rng.gen_range(0..choices.len())]
}

/// A purchase by a random user of a random item, keyed by the user.
pub fn random_purchase<R: Rng + ?Sized>(rng: &mut R, topic: &str) -> Record {
    let user = pick(rng, &USERS);
    let item = pick(rng, &ITEMS);
    Record::new(topic, user, item)
}

/// Enqueues `count` random purchases. A record the sink refuses is logged and
/// counted; it does not stop the batch.
pub fn produce_purchases<S, R>(sink: &S, rng: &mut R, topic: &str, count: usize) -> ProduceSummary
where
    S: RecordSink + ?Sized,
    R: Rng + ?Sized,
{
    let mut summary = ProduceSummary::default();
    for _ in 0..count {
        let record = random_purchase(rng, topic);
        match sink.send(&record) {
            Ok(()) => summary.enqueued += 1,
            Err(e) => {
                warn!(error = %e, key = %record.key, "record was not enqueued");
                summary.rejected += 1;
            }
        }
    }
    summary
}
