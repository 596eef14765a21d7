//! Telemetry boundary: event records, sink, and settings
//!
//! The pipeline produces in-memory event records only; delivery is the
//! sink's problem. Everything here is fire-and-forget: a failed send is
//! logged at debug level by the caller and never retried or surfaced to the
//! editing thread.

use serde::Serialize;
use thiserror::Error;

/// Aggregated per-window, per-language coverage metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeCoverageEvent {
    pub language: String,
    /// Sum of the original lengths of suggestions accepted in the window.
    pub accepted_chars: u64,
    /// Edit-distance-adjusted count of accepted chars still unmodified.
    pub unmodified_accepted_chars: u64,
    /// Chars of user-written plus accepted code observed in the window.
    pub total_chars: u64,
    /// `round(100 * accepted_chars / total_chars)`.
    pub percentage: u64,
    /// Successful completion-service invocations in the window.
    pub invocation_count: u32,
    pub customization_id: Option<String>,
}

/// Per-acceptance modification metric, emitted when an accepted suggestion
/// is retired from tracking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModificationEvent {
    pub session_id: String,
    pub request_id: String,
    pub language: String,
    /// 0.0 = untouched, 1.0 = fully modified (or unknown).
    pub modification_percentage: f64,
    pub original_char_count: u64,
    pub modified_char_count: u64,
}

/// Failure to hand an event to the telemetry transport.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to deliver telemetry event (request id: {request_id:?}): {message}")]
    Delivery {
        request_id: Option<String>,
        message: String,
    },
    #[error("telemetry sink is closed")]
    SinkClosed,
}

/// Receives the two event shapes the pipeline emits. Implemented by the
/// network client; must not block the caller for long.
pub trait TelemetrySink: Send + Sync {
    fn send_code_coverage(&self, event: CodeCoverageEvent) -> Result<(), TelemetryError>;
    fn send_modification(&self, event: ModificationEvent) -> Result<(), TelemetryError>;
}

/// Live view of the user's telemetry opt-in. Polled at each flush decision
/// point rather than cached, so a settings toggle takes effect on the next
/// window.
pub trait TelemetrySettings: Send + Sync {
    fn is_telemetry_enabled(&self) -> bool;
}
