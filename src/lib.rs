pub mod config;
pub mod consumer;
pub mod drivers;
pub mod error;
pub mod models;
pub mod producer;
pub mod purchases;
pub mod shutdown;

pub use error::{Result, SessionError};
