pub mod coverage;
pub mod distance;
pub mod document;
pub mod events;
pub mod ledger;
pub mod logging;
pub mod modification;
pub mod overlap;
pub mod reconcile;

pub use coverage::{CoverageTracker, CoverageTrackerRegistry, DEFAULT_COVERAGE_WINDOW};
pub use document::{AcceptedSpan, DocumentChange, DocumentId, DocumentSource};
pub use events::{
    CodeCoverageEvent, ModificationEvent, TelemetryError, TelemetrySettings, TelemetrySink,
};
pub use ledger::{AcceptanceLedger, CoverageSnapshot};
pub use modification::{AcceptedSuggestionEntry, ModificationTracker};
pub use reconcile::{Candidate, ReconciliationResult, reconcile};
