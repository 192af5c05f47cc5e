//! Outbound progress events and the collaborators that carry them.

mod sink;
mod types;

pub use sink::{ProgressAggregator, ProgressEventSink};
pub use types::{ProgressEvent, NO_DATA_STATUS};
