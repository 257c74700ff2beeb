//! Event plumbing for the picture book service.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`DomainEvent`]: the domain event envelope.
//! - [`Telemetry`]: the production [`Observability`] implementation:
//!   logs and publishes recorded events and fronts the [`TextCache`].
//! - [`progress`]: batch progress events, sinks, and the stream consumer.
//!
//! [`Observability`]: picturebook_core::observability::Observability

pub mod bus;
pub mod cache;
pub mod progress;
pub mod telemetry;

pub use bus::{DomainEvent, EventBus};
pub use cache::TextCache;
pub use progress::{
    ChannelSink, LocalView, NoopSink, ProgressConsumer, ProgressError, ProgressEvent, ProgressSink,
};
pub use telemetry::Telemetry;
