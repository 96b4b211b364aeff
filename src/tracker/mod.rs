mod orchestrator;
mod query;
mod runner;

pub use orchestrator::{AggregateResult, SlotResult, TrackerOrchestrator};
pub use runner::{NoiseFilter, TrackerRunner, DEFAULT_FILTER_LINES, DEFAULT_TIMEOUT};
