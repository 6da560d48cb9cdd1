pub mod orchestrator;
pub mod types;
pub mod verdict;

pub use orchestrator::{merge_channel_identity, Orchestrator};
pub use types::{InvocationOutcome, InvocationRequest, InvokeError};
pub use verdict::{MarkerScanPolicy, VerdictPolicy};
