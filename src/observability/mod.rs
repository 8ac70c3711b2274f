//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every endpoint call passes, outermost first:
//!     → logging.rs (one structured event per call, redacted input)
//!     → metrics.rs (latency histogram by method and outcome)
//!     → tracing.rs (span per call, propagated through the Context)
//!
//! Consumers:
//!     → tracing-subscriber (stderr, pretty or JSON)
//!     → Prometheus recorder (rendered by the CLI)
//! ```
//!
//! # Design Decisions
//! - None of these layers change control flow; each calls its inner
//!   endpoint exactly once and returns the result untouched
//! - Sinks are injected: the tracing subscriber and a `DurationRecorder`
//! - Request ID flows through every event and span

pub mod logging;
pub mod metrics;
pub mod tracing;

pub use self::logging::{LoggingLayer, Redact};
pub use self::metrics::{DurationRecorder, InstrumentingLayer, MetricsRecorder};
pub use self::tracing::TracingLayer;
