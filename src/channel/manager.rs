use crate::channel::timestamp::extract_timestamp_millis;
use crate::channel::{ChannelError, LogBuffer};
use crate::client::{LogEvent, LogStore, TransportError, TransportErrorKind};
use chrono::Utc;

const SOFT_DELETE_FAILURE_KINDS: [TransportErrorKind; 3] = [
    TransportErrorKind::InvalidParameter,
    TransportErrorKind::OperationAborted,
    TransportErrorKind::ServiceUnavailable,
];

/// Provisions log channels and ships buffered lines into them. Owns the
/// channel lifecycle up to shipping; retrieval and classification stay
/// with the orchestrator.
pub struct ChannelManager<'a> {
    store: &'a dyn LogStore,
}

impl<'a> ChannelManager<'a> {
    pub fn new(store: &'a dyn LogStore) -> Self {
        Self { store }
    }

    /// A transport failure counts as "no such group": a flaky describe
    /// call must never green-light shipping into a group that may be gone.
    pub fn group_exists(&self, group: &str) -> bool {
        self.store.group_exists(group).unwrap_or(false)
    }

    /// Delete-then-create. Deleting an absent stream is success; a delete
    /// rejected with one of the soft-failure kinds returns false, while
    /// any other delete failure is ignored and left for the create call
    /// to surface. Create failure returns false.
    pub fn reset_stream(&self, group: &str, stream: &str) -> bool {
        if !self.delete_tolerantly(group, stream) {
            return false;
        }
        self.store.create_stream(group, stream).is_ok()
    }

    /// Strict precondition before any line may be shipped: the group must
    /// exist and the stream must have been recreated empty.
    pub fn prepare_channel(&self, group: &str, stream: &str) -> Result<(), ChannelError> {
        if !self.group_exists(group) {
            return Err(unavailable(group, stream, "log group does not exist"));
        }
        if !self.reset_stream(group, stream) {
            return Err(unavailable(group, stream, "failed to recreate log stream"));
        }
        Ok(())
    }

    /// Converts the buffered lines to events (empty lines dropped) and
    /// submits them as one ordered batch. A submission failure is always
    /// surfaced: losing the evidence the invoking side classifies on is
    /// itself a failure the caller must see.
    pub fn ship_buffer(
        &self,
        group: &str,
        stream: &str,
        buffer: &LogBuffer,
    ) -> Result<(), ChannelError> {
        let events: Vec<LogEvent> = buffer
            .lines()
            .iter()
            .filter(|line| !line.is_empty())
            .map(|line| LogEvent {
                timestamp_millis: extract_timestamp_millis(line, Utc::now().timestamp_millis()),
                message: line.clone(),
            })
            .collect();
        if events.is_empty() {
            return Ok(());
        }
        self.store
            .put_events(group, stream, &events)
            .map_err(|source| ship_failed(group, stream, events.len(), source))
    }

    fn delete_tolerantly(&self, group: &str, stream: &str) -> bool {
        match self.store.delete_stream(group, stream) {
            Ok(()) => true,
            Err(err) if err.kind == TransportErrorKind::NotFound => true,
            Err(err) => !SOFT_DELETE_FAILURE_KINDS.contains(&err.kind),
        }
    }
}

fn unavailable(group: &str, stream: &str, reason: &str) -> ChannelError {
    ChannelError::Unavailable {
        group: group.to_string(),
        stream: stream.to_string(),
        reason: reason.to_string(),
    }
}

fn ship_failed(group: &str, stream: &str, count: usize, source: TransportError) -> ChannelError {
    ChannelError::ShipFailed {
        group: group.to_string(),
        stream: stream.to_string(),
        count,
        source,
    }
}
