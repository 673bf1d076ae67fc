mod delivery;
mod record;

pub use delivery::DeliveryOutcome;
pub use record::Record;
