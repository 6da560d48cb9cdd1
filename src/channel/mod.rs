pub mod buffer;
pub mod harness;
pub mod manager;
pub mod name;
pub mod timestamp;

pub use buffer::LogBuffer;
pub use harness::run_shipped;
pub use manager::ChannelManager;
pub use name::build_stream_name;
pub use timestamp::extract_timestamp_millis;

use crate::client::TransportError;

/// Where one invocation's log events live. The group pre-exists and is
/// shared across invocations of a job; the stream is fresh per attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogChannel {
    pub group: String,
    pub stream: String,
}

impl LogChannel {
    pub fn new(group: &str, stream: &str) -> Self {
        Self {
            group: group.to_string(),
            stream: stream.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("log channel {group}/{stream} could not be prepared: {reason}")]
    Unavailable {
        group: String,
        stream: String,
        reason: String,
    },
    #[error("failed to ship {count} log events to {group}/{stream}: {source}")]
    ShipFailed {
        group: String,
        stream: String,
        count: usize,
        #[source]
        source: TransportError,
    },
    #[error("failed to generate stream name randomness: {0}")]
    TokenGeneration(String),
}
