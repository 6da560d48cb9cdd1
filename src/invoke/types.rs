use crate::channel::ChannelError;
use crate::client::JobRef;
use serde_json::{Map, Value};

/// One request to run a remote job and judge it afterwards. The caller
/// supplies the payload fields the job expects; the orchestrator injects
/// the channel identity on top of them.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    pub job: JobRef,
    /// Pre-existing log group the job's stream is created under.
    pub group: String,
    pub payload: Map<String, Value>,
}

impl InvocationRequest {
    pub fn new(job: JobRef, group: &str) -> Self {
        Self {
            job,
            group: group.to_string(),
            payload: Map::new(),
        }
    }

    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = payload;
        self
    }
}

/// Classified result of one attempt. `Inconclusive` means the evidence
/// never arrived; callers must not conflate it with `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    Succeeded,
    Failed { reason: String },
    Inconclusive { reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("log channel unavailable: {0}")]
    ChannelUnavailable(#[from] ChannelError),
    #[error("remote invoke rejected for `{function}` qualifier `{qualifier}`: {reason}")]
    InvocationRejected {
        function: String,
        qualifier: String,
        reason: String,
    },
    #[error(
        "function `{function}` qualifier `{qualifier}` did not become active \
         within {attempts} polls at {poll_interval_seconds}s intervals"
    )]
    ActivationTimeout {
        function: String,
        qualifier: String,
        attempts: u32,
        poll_interval_seconds: u64,
    },
    #[error("invocation attempt was interrupted by its stop flag")]
    Interrupted,
}
