use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use rdkafka::Message;

/// A key/value pair addressed to a topic. Records built for sending carry no
/// partition or offset; the broker picks the partition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub topic: String,
    pub key: String,
    pub value: String,
    pub partition: Option<i32>,
    pub offset: Option<i64>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Record {
    pub fn new(topic: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        Record {
            topic: topic.into(),
            key: key.into(),
            value: value.into(),
            partition: None,
            offset: None,
            timestamp: None,
        }
    }

    /// Copies a broker message into an owned record.
    pub fn from_message<M: Message>(msg: &M) -> Self {
        Record {
            topic: msg.topic().to_owned(),
            key: get_key(msg),
            value: get_value(msg),
            partition: Some(msg.partition()),
            offset: Some(msg.offset()),
            timestamp: get_timestamp(msg),
        }
    }
}

/// The line printed for every consumed record.
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Consumed event from topic: {}, key = {:<10}, value = {:<10}",
            self.topic, self.key, self.value
        )
    }
}

fn get_key<M: Message>(msg: &M) -> String {
    msg.key()
        .map(|key| String::from_utf8_lossy(key).into_owned())
        .unwrap_or_default()
}

fn get_value<M: Message>(msg: &M) -> String {
    msg.payload()
        .map(|payload| String::from_utf8_lossy(payload).into_owned())
        .unwrap_or_default()
}

fn get_timestamp<M: Message>(msg: &M) -> Option<DateTime<Utc>> {
    let millis = msg.timestamp().to_millis()?;
    Utc.timestamp_millis_opt(millis).single()
}
