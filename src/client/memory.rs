use crate::client::{
    ActivationState, InvokeResponse, JobInvoker, JobRef, LogEvent, LogStore, TransportError,
    TransportErrorKind,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

/// In-process log store used as the local substrate for tests and dev
/// runs. Streams keep events in submission order; the test hooks simulate
/// the propagation and outage behavior of a real store.
#[derive(Debug, Default)]
pub struct InMemoryLogStore {
    state: Mutex<StoreState>,
}

#[derive(Debug, Default)]
struct StoreState {
    groups: BTreeSet<String>,
    streams: BTreeMap<(String, String), Vec<LogEvent>>,
    fail_puts: bool,
    fail_group_queries: bool,
    suppressed_gets: u32,
    delete_failure: Option<TransportErrorKind>,
}

fn lock_state<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_group(&self, group: &str) {
        lock_state(&self.state).groups.insert(group.to_string());
    }

    pub fn stream_exists(&self, group: &str, stream: &str) -> bool {
        lock_state(&self.state)
            .streams
            .contains_key(&(group.to_string(), stream.to_string()))
    }

    pub fn stream_names(&self, group: &str) -> Vec<String> {
        lock_state(&self.state)
            .streams
            .keys()
            .filter(|(owner, _)| owner == group)
            .map(|(_, stream)| stream.clone())
            .collect()
    }

    /// Makes every subsequent put fail with service-unavailable.
    pub fn fail_puts(&self, fail: bool) {
        lock_state(&self.state).fail_puts = fail;
    }

    /// The next `count` fetches observe an empty stream, mimicking the
    /// store's propagation delay.
    pub fn suppress_gets(&self, count: u32) {
        lock_state(&self.state).suppressed_gets = count;
    }

    /// Makes every subsequent delete fail with the given kind.
    pub fn fail_deletes(&self, kind: Option<TransportErrorKind>) {
        lock_state(&self.state).delete_failure = kind;
    }

    /// Makes every subsequent group query fail with service-unavailable.
    pub fn fail_group_queries(&self, fail: bool) {
        lock_state(&self.state).fail_group_queries = fail;
    }
}

impl LogStore for InMemoryLogStore {
    fn group_exists(&self, prefix: &str) -> Result<bool, TransportError> {
        let state = lock_state(&self.state);
        if state.fail_group_queries {
            return Err(TransportError::new(
                TransportErrorKind::ServiceUnavailable,
                "describe groups",
                "injected describe outage",
            ));
        }
        Ok(state.groups.iter().any(|group| group.starts_with(prefix)))
    }

    fn create_stream(&self, group: &str, stream: &str) -> Result<(), TransportError> {
        let mut state = lock_state(&self.state);
        if !state.groups.contains(group) {
            return Err(TransportError::new(
                TransportErrorKind::NotFound,
                "create stream",
                format!("log group `{group}` does not exist"),
            ));
        }
        let key = (group.to_string(), stream.to_string());
        if state.streams.contains_key(&key) {
            return Err(TransportError::new(
                TransportErrorKind::OperationAborted,
                "create stream",
                format!("log stream `{stream}` already exists"),
            ));
        }
        state.streams.insert(key, Vec::new());
        Ok(())
    }

    fn delete_stream(&self, group: &str, stream: &str) -> Result<(), TransportError> {
        let mut state = lock_state(&self.state);
        if let Some(kind) = state.delete_failure {
            return Err(TransportError::new(
                kind,
                "delete stream",
                "injected delete failure",
            ));
        }
        // absent streams delete cleanly
        state.streams.remove(&(group.to_string(), stream.to_string()));
        Ok(())
    }

    fn put_events(
        &self,
        group: &str,
        stream: &str,
        events: &[LogEvent],
    ) -> Result<(), TransportError> {
        let mut state = lock_state(&self.state);
        if state.fail_puts {
            return Err(TransportError::new(
                TransportErrorKind::ServiceUnavailable,
                "put events",
                "injected put outage",
            ));
        }
        let key = (group.to_string(), stream.to_string());
        match state.streams.get_mut(&key) {
            Some(stored) => {
                stored.extend(events.iter().cloned());
                Ok(())
            }
            None => Err(TransportError::new(
                TransportErrorKind::NotFound,
                "put events",
                format!("log stream `{stream}` does not exist"),
            )),
        }
    }

    fn get_events(&self, group: &str, stream: &str) -> Result<Vec<LogEvent>, TransportError> {
        let mut state = lock_state(&self.state);
        if state.suppressed_gets > 0 {
            state.suppressed_gets -= 1;
            return Ok(Vec::new());
        }
        match state.streams.get(&(group.to_string(), stream.to_string())) {
            Some(stored) => Ok(stored.clone()),
            None => Err(TransportError::new(
                TransportErrorKind::NotFound,
                "get events",
                format!("log stream `{stream}` does not exist"),
            )),
        }
    }
}

type InvokeHandler = Box<dyn Fn(&[u8]) -> Result<u16, String> + Send>;

/// In-process invocation substrate: `invoke` runs the registered handler
/// synchronously on the caller's thread, the way the remote side would
/// run the job after a synchronous-mode invoke returns.
pub struct InMemoryInvoker {
    handler: Mutex<Option<InvokeHandler>>,
    state: Mutex<InvokerState>,
}

#[derive(Debug)]
struct InvokerState {
    timeout_seconds: u64,
    pending_polls: u32,
    polls_seen: u32,
    failing_polls: u32,
    fail_timeout_reads: bool,
    reject_next_invoke: Option<TransportError>,
}

impl InMemoryInvoker {
    pub fn new(timeout_seconds: u64) -> Self {
        Self {
            handler: Mutex::new(None),
            state: Mutex::new(InvokerState {
                timeout_seconds,
                pending_polls: 0,
                polls_seen: 0,
                failing_polls: 0,
                fail_timeout_reads: false,
                reject_next_invoke: None,
            }),
        }
    }

    pub fn set_handler<F>(&self, handler: F)
    where
        F: Fn(&[u8]) -> Result<u16, String> + Send + 'static,
    {
        *lock_state(&self.handler) = Some(Box::new(handler));
    }

    /// The substrate reports pending for this many activation polls
    /// before flipping to active.
    pub fn set_pending_polls(&self, count: u32) {
        let mut state = lock_state(&self.state);
        state.pending_polls = count;
        state.polls_seen = 0;
    }

    pub fn reject_next_invoke(&self, error: TransportError) {
        lock_state(&self.state).reject_next_invoke = Some(error);
    }

    /// The next `count` activation polls fail at the transport level
    /// before the pending/active progression resumes.
    pub fn fail_activation_polls(&self, count: u32) {
        lock_state(&self.state).failing_polls = count;
    }

    /// Makes every subsequent declared-timeout read fail.
    pub fn fail_timeout_reads(&self, fail: bool) {
        lock_state(&self.state).fail_timeout_reads = fail;
    }

    pub fn polls_seen(&self) -> u32 {
        lock_state(&self.state).polls_seen
    }
}

impl JobInvoker for InMemoryInvoker {
    fn invoke(&self, job: &JobRef, payload: &[u8]) -> Result<InvokeResponse, TransportError> {
        if let Some(error) = lock_state(&self.state).reject_next_invoke.take() {
            return Err(error);
        }
        let handler = lock_state(&self.handler);
        let handler = handler.as_ref().ok_or_else(|| {
            TransportError::new(
                TransportErrorKind::NotFound,
                "invoke",
                format!("no function registered for `{job}`"),
            )
        })?;
        // handler failures surface as the substrate's own status code,
        // not as the job's verdict; the log channel carries the evidence
        let status_code = handler(payload).unwrap_or(200);
        Ok(InvokeResponse { status_code })
    }

    fn activation_state(&self, _job: &JobRef) -> Result<ActivationState, TransportError> {
        let mut state = lock_state(&self.state);
        state.polls_seen += 1;
        if state.failing_polls > 0 {
            state.failing_polls -= 1;
            return Err(TransportError::new(
                TransportErrorKind::ServiceUnavailable,
                "get activation state",
                "injected poll outage",
            ));
        }
        if state.polls_seen > state.pending_polls {
            Ok(ActivationState::Active)
        } else {
            Ok(ActivationState::Pending)
        }
    }

    fn declared_timeout_seconds(&self, _job: &JobRef) -> Result<u64, TransportError> {
        let state = lock_state(&self.state);
        if state.fail_timeout_reads {
            return Err(TransportError::new(
                TransportErrorKind::ServiceUnavailable,
                "get configuration",
                "injected configuration outage",
            ));
        }
        Ok(state.timeout_seconds)
    }
}
