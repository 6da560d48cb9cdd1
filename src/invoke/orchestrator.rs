use crate::channel::{build_stream_name, ChannelManager, LogChannel};
use crate::client::{ActivationState, JobInvoker, LogStore};
use crate::config::Settings;
use crate::invoke::{
    InvocationOutcome, InvocationRequest, InvokeError, MarkerScanPolicy, VerdictPolicy,
};
use crate::shared::logging::append_invoker_log_line;
use crate::shared::wait::sleep_unless_stopped;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::time::Duration;

/// Drives one invocation attempt end to end:
///
/// ```text
/// prepare channel -> invoke -> wait-active -> retrieve logs -> classify
/// ```
///
/// Setup failures abort with a typed error; a missing log trail after
/// bounded retrieval degrades to an inconclusive outcome instead. Retry
/// across attempts belongs to the external scheduler, not here.
pub struct Orchestrator<'a> {
    log_store: &'a dyn LogStore,
    invoker: &'a dyn JobInvoker,
    settings: Settings,
    verdict: Box<dyn VerdictPolicy + 'a>,
    diagnostics_root: Option<PathBuf>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        log_store: &'a dyn LogStore,
        invoker: &'a dyn JobInvoker,
        settings: Settings,
    ) -> Self {
        let verdict = Box::new(MarkerScanPolicy::new(&settings.failure_marker));
        Self {
            log_store,
            invoker,
            settings,
            verdict,
            diagnostics_root: None,
        }
    }

    pub fn with_verdict_policy(mut self, policy: Box<dyn VerdictPolicy + 'a>) -> Self {
        self.verdict = policy;
        self
    }

    /// Progress lines get appended under `<state_root>/logs/invoker.log`.
    pub fn with_diagnostics(mut self, state_root: &Path) -> Self {
        self.diagnostics_root = Some(state_root.to_path_buf());
        self
    }

    pub fn run(
        &self,
        request: &InvocationRequest,
        stop: &AtomicBool,
    ) -> Result<InvocationOutcome, InvokeError> {
        let channel = self.prepare(request)?;
        self.invoke(request, &channel)?;
        self.wait_until_active(request, stop)?;
        let messages = self.retrieve_messages(&channel, stop)?;
        if messages.is_empty() {
            self.note("no log events arrived; outcome is inconclusive");
            return Ok(InvocationOutcome::Inconclusive {
                reason: "no log events".to_string(),
            });
        }
        let outcome = self.verdict.classify(&messages);
        match &outcome {
            InvocationOutcome::Succeeded => self.note("function invocation succeeded"),
            InvocationOutcome::Failed { reason } => {
                self.note(&format!("function invocation failed: {reason}"));
            }
            InvocationOutcome::Inconclusive { reason } => {
                self.note(&format!("function invocation inconclusive: {reason}"));
            }
        }
        Ok(outcome)
    }

    fn prepare(&self, request: &InvocationRequest) -> Result<LogChannel, InvokeError> {
        let stream = build_stream_name(&request.job.qualifier)?;
        let channel = LogChannel::new(&request.group, &stream);
        ChannelManager::new(self.log_store).prepare_channel(&channel.group, &channel.stream)?;
        self.note(&format!(
            "log channel ready: {}/{}",
            channel.group, channel.stream
        ));
        Ok(channel)
    }

    fn invoke(&self, request: &InvocationRequest, channel: &LogChannel) -> Result<(), InvokeError> {
        let payload = merge_channel_identity(&request.payload, channel);
        let bytes = serde_json::to_vec(&Value::Object(payload))
            .map_err(|err| rejected(request, format!("payload serialization failed: {err}")))?;
        self.note(&format!(
            "invoking function `{}` qualifier `{}`",
            request.job.function, request.job.qualifier
        ));
        let response = self
            .invoker
            .invoke(&request.job, &bytes)
            .map_err(|err| rejected(request, err.to_string()))?;
        self.note(&format!(
            "function invoked; status code {}",
            response.status_code
        ));
        Ok(())
    }

    /// The invoke round trip is synchronous, but the substrate may still
    /// be provisioning. Poll until active so log retrieval never races a
    /// job that has not begun; the attempt budget is the job's declared
    /// timeout divided by the poll interval, rounded up.
    fn wait_until_active(
        &self,
        request: &InvocationRequest,
        stop: &AtomicBool,
    ) -> Result<(), InvokeError> {
        let declared = self
            .invoker
            .declared_timeout_seconds(&request.job)
            .map_err(|err| rejected(request, format!("failed to read declared timeout: {err}")))?;
        // settings fields are public; guard against an unvalidated zero
        let interval = self.settings.poll_interval_seconds.max(1);
        let attempts = u32::try_from(declared.div_ceil(interval))
            .unwrap_or(u32::MAX)
            .max(1);
        for attempt in 1..=attempts {
            match self.invoker.activation_state(&request.job) {
                Ok(ActivationState::Active) => return Ok(()),
                // a failed poll burns an attempt like a pending one
                Ok(ActivationState::Pending) | Err(_) => {}
            }
            if attempt < attempts && !sleep_unless_stopped(stop, Duration::from_secs(interval)) {
                return Err(InvokeError::Interrupted);
            }
        }
        Err(InvokeError::ActivationTimeout {
            function: request.job.function.clone(),
            qualifier: request.job.qualifier.clone(),
            attempts,
            poll_interval_seconds: interval,
        })
    }

    /// Shipping happens on the remote side only after the job finishes,
    /// so the stream may legitimately read empty for a short window.
    /// Bounded retries absorb that; exhaustion hands back an empty list
    /// rather than an error.
    fn retrieve_messages(
        &self,
        channel: &LogChannel,
        stop: &AtomicBool,
    ) -> Result<Vec<String>, InvokeError> {
        let attempts = self.settings.retrieval_attempts;
        let pause = Duration::from_millis(self.settings.retrieval_sleep_ms);
        for attempt in 1..=attempts {
            let events = self
                .log_store
                .get_events(&channel.group, &channel.stream)
                .unwrap_or_default();
            if !events.is_empty() {
                self.note("function log output:");
                let mut messages = Vec::with_capacity(events.len());
                for event in events {
                    self.note(&format!(
                        "[{}] {}",
                        format_event_timestamp(event.timestamp_millis),
                        event.message
                    ));
                    messages.push(event.message);
                }
                return Ok(messages);
            }
            if attempt < attempts && !sleep_unless_stopped(stop, pause) {
                return Err(InvokeError::Interrupted);
            }
        }
        Ok(Vec::new())
    }

    fn note(&self, line: &str) {
        if let Some(root) = &self.diagnostics_root {
            let _ = append_invoker_log_line(root, line);
        }
    }
}

/// Copies the caller payload and lays the channel identity on top.
/// Identity fields always win on key collision: a payload that could
/// redirect its own log shipment would break outcome correlation.
pub fn merge_channel_identity(
    payload: &Map<String, Value>,
    channel: &LogChannel,
) -> Map<String, Value> {
    let mut merged = payload.clone();
    merged.insert(
        "group_name".to_string(),
        Value::String(channel.group.clone()),
    );
    merged.insert(
        "stream_name".to_string(),
        Value::String(channel.stream.clone()),
    );
    merged
}

fn rejected(request: &InvocationRequest, reason: String) -> InvokeError {
    InvokeError::InvocationRejected {
        function: request.job.function.clone(),
        qualifier: request.job.qualifier.clone(),
        reason,
    }
}

fn format_event_timestamp(millis: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(millis) {
        Some(stamp) => stamp.format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
        None => millis.to_string(),
    }
}
