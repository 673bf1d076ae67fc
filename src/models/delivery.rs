use std::fmt;

use rdkafka::producer::DeliveryResult;

use super::Record;

/// What the broker reported back for one produced record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered(Record),
    Failed { record: Record, error: String },
}

impl DeliveryOutcome {
    pub fn from_result(result: &DeliveryResult<'_>) -> Self {
        match result {
            Ok(msg) => DeliveryOutcome::Delivered(Record::from_message(msg)),
            Err((err, msg)) => DeliveryOutcome::Failed {
                record: Record::from_message(msg),
                error: err.to_string(),
            },
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered(_))
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryOutcome::Delivered(record) => write!(
                f,
                "Produced event to topic {}: key = {:<10} value = {}",
                record.topic, record.key, record.value
            ),
            DeliveryOutcome::Failed { error, .. } => {
                write!(f, "Failed to deliver message: {}", error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivered_line() {
        let record = Record::new("purchases", "htanaka", "batteries");
        let outcome = DeliveryOutcome::Delivered(record);
        assert!(outcome.is_delivered());
        assert_eq!(
            outcome.to_string(),
            "Produced event to topic purchases: key = htanaka    value = batteries"
        );
    }

    #[test]
    fn failed_line_carries_error() {
        let outcome = DeliveryOutcome::Failed {
            record: Record::new("purchases", "jsmith", "book"),
            error: "Message timed out".to_owned(),
        };
        assert!(!outcome.is_delivered());
        assert_eq!(
            outcome.to_string(),
            "Failed to deliver message: Message timed out"
        );
    }
}
