//! # updater-nats
//!
//! NATS JetStream implementation of [`updater_core::BrokerSession`]: client connection with a closed
//! callback, drain/close, and fetch/ack/nak against an existing durable pull consumer.

mod session;
mod subscription;

pub use session::NatsBrokerSession;
pub use subscription::{NatsPullSubscription, NatsRawMessage};
