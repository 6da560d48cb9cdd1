use jobsignal::channel::{run_shipped, ChannelManager, LogBuffer, LogChannel};
use jobsignal::client::{InMemoryInvoker, InMemoryLogStore, JobRef, LogStore};
use jobsignal::config::Settings;
use jobsignal::invoke::{InvocationOutcome, InvocationRequest, Orchestrator};
use serde_json::{json, Map, Value};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

const GROUP: &str = "/jobs/demo";

fn fast_settings() -> Settings {
    Settings {
        poll_interval_seconds: 1,
        retrieval_attempts: 3,
        retrieval_sleep_ms: 10,
        failure_marker: "ERROR".to_string(),
    }
}

/// The demo job body: log `current run i` up to `max_len`, failing at
/// `fail_at` when the payload asks for it.
fn demo_job(buffer: &mut LogBuffer, payload: &Map<String, Value>) -> Result<Value, String> {
    let max_len = payload.get("max_len").and_then(Value::as_u64).unwrap_or(6);
    let fail_at = payload.get("fail_at").and_then(Value::as_u64);
    for i in 0..max_len {
        if fail_at == Some(i) {
            return Err(format!("fails at {i}"));
        }
        buffer.info(&format!("current run {i}"));
    }
    Ok(json!({ "ran": max_len }))
}

fn wire_substrate() -> (Arc<InMemoryLogStore>, InMemoryInvoker) {
    let store = Arc::new(InMemoryLogStore::new());
    store.add_group(GROUP);
    let invoker = InMemoryInvoker::new(3);
    let handler_store = Arc::clone(&store);
    invoker.set_handler(move |payload| {
        let parsed: Value = serde_json::from_slice(payload).map_err(|e| e.to_string())?;
        let fields = parsed.as_object().ok_or("payload is not an object")?;
        let group = fields
            .get("group_name")
            .and_then(Value::as_str)
            .ok_or("missing group_name")?;
        let stream = fields
            .get("stream_name")
            .and_then(Value::as_str)
            .ok_or("missing stream_name")?;
        let channel = LogChannel::new(group, stream);
        let manager = ChannelManager::new(&*handler_store);
        run_shipped(&manager, &channel, fields, demo_job).map_err(|e| e.to_string())?;
        Ok(200)
    });
    (store, invoker)
}

fn stream_of_only_channel(store: &InMemoryLogStore) -> Vec<String> {
    // the orchestrator minted the stream name; recover it from the store
    let events = store
        .get_events(GROUP, &only_stream_name(store))
        .expect("events");
    events.into_iter().map(|e| e.message).collect()
}

fn only_stream_name(store: &InMemoryLogStore) -> String {
    let names = store.stream_names(GROUP);
    assert_eq!(names.len(), 1, "expected exactly one stream, got {names:?}");
    names.into_iter().next().expect("one stream")
}

#[test]
fn clean_job_run_yields_success_with_all_lines_shipped() {
    let (store, invoker) = wire_substrate();
    let orchestrator = Orchestrator::new(&*store, &invoker, fast_settings());
    let stop = AtomicBool::new(false);

    let mut payload = Map::new();
    payload.insert("max_len".to_string(), json!(5));
    let request = InvocationRequest::new(JobRef::new("demo-job", "$LATEST"), GROUP)
        .with_payload(payload);

    let outcome = orchestrator.run(&request, &stop).expect("run");
    assert_eq!(outcome, InvocationOutcome::Succeeded);

    let messages = stream_of_only_channel(&store);
    let runs: Vec<&String> = messages
        .iter()
        .filter(|m| m.contains("current run"))
        .collect();
    assert_eq!(runs.len(), 5);
    assert!(runs[0].contains("current run 0"));
    assert!(runs[4].contains("current run 4"));
}

#[test]
fn job_failing_mid_run_yields_failed_with_the_error_line() {
    let (store, invoker) = wire_substrate();
    let orchestrator = Orchestrator::new(&*store, &invoker, fast_settings());
    let stop = AtomicBool::new(false);

    let mut payload = Map::new();
    payload.insert("max_len".to_string(), json!(5));
    payload.insert("fail_at".to_string(), json!(2));
    let request = InvocationRequest::new(JobRef::new("demo-job", "$LATEST"), GROUP)
        .with_payload(payload);

    let outcome = orchestrator.run(&request, &stop).expect("run");
    match outcome {
        InvocationOutcome::Failed { reason } => {
            assert!(reason.contains("ERROR"));
            assert!(reason.contains("fails at 2"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let messages = stream_of_only_channel(&store);
    // two clean iterations ran before the failure
    assert!(messages.iter().any(|m| m.contains("current run 1")));
    assert!(!messages.iter().any(|m| m.contains("current run 2")));
}

#[test]
fn consecutive_attempts_use_distinct_streams() {
    let (store, invoker) = wire_substrate();
    let orchestrator = Orchestrator::new(&*store, &invoker, fast_settings());
    let stop = AtomicBool::new(false);
    let request = InvocationRequest::new(JobRef::new("demo-job", "$LATEST"), GROUP);

    orchestrator.run(&request, &stop).expect("first run");
    orchestrator.run(&request, &stop).expect("second run");

    assert_eq!(store.stream_names(GROUP).len(), 2);
}
