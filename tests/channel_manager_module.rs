use chrono::Utc;
use jobsignal::channel::{ChannelError, ChannelManager, LogBuffer};
use jobsignal::client::{InMemoryLogStore, LogStore, TransportErrorKind};

const GROUP: &str = "/jobs/demo";
const STREAM: &str = "2020/04/02/[v1]0123456789abcdef0123456789abcdef";

fn prepared_store() -> InMemoryLogStore {
    let store = InMemoryLogStore::new();
    store.add_group(GROUP);
    store
}

#[test]
fn prepare_ship_get_round_trips_non_empty_lines_in_order() {
    let store = prepared_store();
    let manager = ChannelManager::new(&store);
    manager.prepare_channel(GROUP, STREAM).expect("prepare");

    let mut buffer = LogBuffer::new();
    buffer.push_raw("a");
    buffer.push_raw("");
    buffer.push_raw("b");
    buffer.push_raw("c");
    manager.ship_buffer(GROUP, STREAM, &buffer).expect("ship");

    let events = store.get_events(GROUP, STREAM).expect("events");
    let messages: Vec<&str> = events.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["a", "b", "c"]);
}

#[test]
fn shipped_events_use_embedded_stamps_and_near_now_fallback() {
    let store = prepared_store();
    let manager = ChannelManager::new(&store);
    manager.prepare_channel(GROUP, STREAM).expect("prepare");

    let mut buffer = LogBuffer::new();
    buffer.push_raw("INFO     2020-04-02 03:29:50,913 root stamped");
    buffer.push_raw("no stamp at all");
    let before = Utc::now().timestamp_millis();
    manager.ship_buffer(GROUP, STREAM, &buffer).expect("ship");
    let after = Utc::now().timestamp_millis();

    let events = store.get_events(GROUP, STREAM).expect("events");
    assert_eq!(events[0].timestamp_millis, 1_585_798_190_913);
    assert!(events[1].timestamp_millis >= before && events[1].timestamp_millis <= after);
}

#[test]
fn reset_stream_is_idempotent_for_absent_and_present_streams() {
    let store = prepared_store();
    let manager = ChannelManager::new(&store);

    assert!(manager.reset_stream(GROUP, STREAM), "absent stream");
    assert!(store.stream_exists(GROUP, STREAM));

    assert!(manager.reset_stream(GROUP, STREAM), "present stream");
    assert!(store.stream_exists(GROUP, STREAM));
    let events = store.get_events(GROUP, STREAM).expect("events");
    assert!(events.is_empty(), "reset must leave the stream empty");
}

#[test]
fn reset_clears_previously_shipped_events() {
    let store = prepared_store();
    let manager = ChannelManager::new(&store);
    manager.prepare_channel(GROUP, STREAM).expect("prepare");

    let mut buffer = LogBuffer::new();
    buffer.push_raw("stale remnant");
    manager.ship_buffer(GROUP, STREAM, &buffer).expect("ship");

    manager.prepare_channel(GROUP, STREAM).expect("re-prepare");
    let events = store.get_events(GROUP, STREAM).expect("events");
    assert!(events.is_empty());
}

#[test]
fn missing_group_makes_the_channel_unavailable() {
    let store = InMemoryLogStore::new();
    let manager = ChannelManager::new(&store);

    assert!(!manager.group_exists("/jobs/absent"));
    let err = manager
        .prepare_channel("/jobs/absent", STREAM)
        .expect_err("must fail");
    assert!(matches!(err, ChannelError::Unavailable { .. }));
    assert!(err.to_string().contains("log group does not exist"));
}

#[test]
fn group_query_outage_counts_as_group_missing() {
    let store = prepared_store();
    let manager = ChannelManager::new(&store);
    store.fail_group_queries(true);

    // the group is there, but a failed describe must never green-light it
    assert!(!manager.group_exists(GROUP));
    let err = manager
        .prepare_channel(GROUP, STREAM)
        .expect_err("must fail");
    assert!(matches!(err, ChannelError::Unavailable { .. }));

    store.fail_group_queries(false);
    assert!(manager.group_exists(GROUP));
}

#[test]
fn benign_delete_failures_soft_fail_the_reset() {
    for kind in [
        TransportErrorKind::InvalidParameter,
        TransportErrorKind::OperationAborted,
        TransportErrorKind::ServiceUnavailable,
    ] {
        let store = prepared_store();
        let manager = ChannelManager::new(&store);
        store.fail_deletes(Some(kind));
        assert!(!manager.reset_stream(GROUP, STREAM), "kind {kind:?}");
        assert!(manager.prepare_channel(GROUP, STREAM).is_err());
    }
}

#[test]
fn other_delete_failures_defer_to_the_create_call() {
    let store = prepared_store();
    let manager = ChannelManager::new(&store);
    store.fail_deletes(Some(TransportErrorKind::Http));
    // the create right after the failed delete succeeds, so the reset does
    assert!(manager.reset_stream(GROUP, STREAM));
    assert!(store.stream_exists(GROUP, STREAM));
}

#[test]
fn ship_failure_is_surfaced_never_swallowed() {
    let store = prepared_store();
    let manager = ChannelManager::new(&store);
    manager.prepare_channel(GROUP, STREAM).expect("prepare");
    store.fail_puts(true);

    let mut buffer = LogBuffer::new();
    buffer.push_raw("evidence");
    let err = manager
        .ship_buffer(GROUP, STREAM, &buffer)
        .expect_err("must fail");
    assert!(matches!(err, ChannelError::ShipFailed { count: 1, .. }));
}

#[test]
fn shipping_an_empty_buffer_is_a_no_op() {
    let store = prepared_store();
    let manager = ChannelManager::new(&store);
    manager.prepare_channel(GROUP, STREAM).expect("prepare");

    let mut buffer = LogBuffer::new();
    buffer.push_raw("");
    manager.ship_buffer(GROUP, STREAM, &buffer).expect("ship");
    let events = store.get_events(GROUP, STREAM).expect("events");
    assert!(events.is_empty());
}
