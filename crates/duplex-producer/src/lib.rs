//! Scheduled event producer.
//!
//! Three independent timers synthesize operational and business data,
//! persist each batch through the analytics write path, and publish it to
//! the live event hub. A failed tick is logged and the schedule carries on.

pub mod generator;
pub mod producer;

pub use producer::{start, ProducerConfig, ProducerHandle};
