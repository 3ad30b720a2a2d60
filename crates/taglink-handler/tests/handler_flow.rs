//! End-to-end pipeline tests: adapter wiring, processing modes, connection
//! tracking and event ordering across the full handler surface.

use std::cell::RefCell;
use std::rc::Rc;
use taglink_core::RawDatagram;
use taglink_handler::{
    FormatOptions, Handled, HandlerConfig, LoopbackAdapter, StatusUpdate, TagEvent, TagHandler,
    TagParser,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("taglink_handler=debug,taglink_events=debug")
        .with_test_writer()
        .try_init();
}

fn to_hex(text: &str) -> String {
    text.bytes().map(|b| format!("{b:02x}")).collect()
}

#[test]
fn adapter_wiring_feeds_the_full_pipeline() {
    init_tracing();

    let mut adapter = LoopbackAdapter::new();
    let handler = TagHandler::with_adapter(HandlerConfig::default(), &mut adapter);
    assert!(adapter.has_data_callback());
    assert!(adapter.has_status_callback());

    let events = Rc::new(RefCell::new(Vec::new()));
    {
        let handler = handler.borrow();
        for name in ["rawData", "dataReady", "parseError", "connectionStatus"] {
            let sink = Rc::clone(&events);
            handler.on(name, move |event: &TagEvent| {
                sink.borrow_mut().push(event.name());
            });
        }
    }

    // reader connects, sends a valid tag, then a runt frame, then leaves
    adapter.push_status(StatusUpdate::new("10.0.0.1", true));
    adapter.push_data(RawDatagram::new(to_hex("1234567890"), "10.0.0.1"));
    adapter.push_data(RawDatagram::new(to_hex("99"), "10.0.0.1"));
    adapter.push_status(StatusUpdate::new("10.0.0.1", false));

    assert_eq!(
        *events.borrow(),
        vec![
            "connectionStatus",
            "rawData",
            "dataReady",
            "rawData",
            "parseError",
            "connectionStatus",
        ]
    );

    let handler = handler.borrow();
    assert_eq!(handler.last_processed().unwrap().rfid, "1234567890");
    assert_eq!(handler.registry().connection_count(), 0);
    assert!(handler.registry().client("10.0.0.1").is_none());
}

#[test]
fn stats_survive_disconnect_only_via_implicit_reconnect() {
    // data from a source the registry never saw counts as an implicit connect
    let mut adapter = LoopbackAdapter::new();
    let handler = TagHandler::with_adapter(HandlerConfig::default(), &mut adapter);

    adapter.push_data(RawDatagram::new(to_hex("1234567890"), "10.0.0.5"));

    let handler = handler.borrow();
    let record = handler.registry().client("10.0.0.5").unwrap();
    assert_eq!(record.stats.data_received, 1);
    assert_eq!(handler.registry().connection_count(), 1);
}

#[test]
fn manual_mode_round_trip() {
    init_tracing();

    let mut handler = TagHandler::new(HandlerConfig {
        auto_process: false,
        ..HandlerConfig::default()
    });

    let ready = Rc::new(RefCell::new(0u32));
    let parse_errors = Rc::new(RefCell::new(0u32));
    let ready_sink = Rc::clone(&ready);
    handler.on("dataReady", move |_| *ready_sink.borrow_mut() += 1);
    let error_sink = Rc::clone(&parse_errors);
    handler.on("parseError", move |_| *error_sink.borrow_mut() += 1);

    let raw = RawDatagram::new(to_hex("1234567890"), "10.0.0.1");
    let outcome = handler.handle_data(raw.clone());

    // rawData only: neither processing event fired yet
    assert!(matches!(outcome, Some(Handled::Raw(_))));
    assert_eq!(*ready.borrow(), 0);
    assert_eq!(*parse_errors.borrow(), 0);

    // the explicit entry point emits exactly one of the two
    handler.manual_process(&raw);
    assert_eq!(*ready.borrow(), 1);
    assert_eq!(*parse_errors.borrow(), 0);

    handler.manual_process(&RawDatagram::new(to_hex("nope"), "10.0.0.1"));
    assert_eq!(*parse_errors.borrow(), 1);
}

#[test]
fn per_source_stats_accumulate_across_mixed_traffic() {
    let mut handler = TagHandler::default();

    handler.handle_data(RawDatagram::new(to_hex("1234567890"), "10.0.0.1"));
    handler.handle_data(RawDatagram::new(to_hex("1111"), "10.0.0.1"));
    handler.handle_data(RawDatagram::new(to_hex("0987654321"), "10.0.0.2"));

    let first = handler.registry().client("10.0.0.1").unwrap();
    assert_eq!(first.stats.data_received, 2);
    assert_eq!(first.stats.errors, 1);

    let second = handler.registry().client("10.0.0.2").unwrap();
    assert_eq!(second.stats.data_received, 1);
    assert_eq!(second.stats.errors, 0);

    assert_eq!(handler.clients().len(), 2);
}

#[test]
fn simulation_needs_no_adapter() {
    let mut handler = TagHandler::default();
    handler.init();

    let result = handler.simulate(to_hex("1234567890"), Some("172.16.0.9"));
    assert!(matches!(result, Some(Handled::Parsed(_))));

    let tag = handler.last_processed().unwrap();
    assert_eq!(tag.source, "172.16.0.9");
    assert_eq!(tag.rfid, "1234567890");
    assert!(tag.formatted.ends_with("-1234567890"));
}

#[test]
fn reset_returns_to_never_seen() {
    let mut adapter = LoopbackAdapter::new();
    let handler = TagHandler::with_adapter(HandlerConfig::default(), &mut adapter);

    adapter.push_status(StatusUpdate::new("10.0.0.1", true));
    adapter.push_data(RawDatagram::new(to_hex("1234567890"), "10.0.0.1"));

    handler.borrow_mut().reset();

    let handler = handler.borrow();
    assert!(handler.last_processed().is_none());
    assert!(!handler.registry().has_active_connections());
    assert!(handler.clients().is_empty());

    // absence of a record is equivalent to "never seen"
    assert!(handler.registry().client("10.0.0.1").is_none());
}

#[test]
fn formatter_flows_from_config_to_output() {
    let mut handler = TagHandler::new_with_formatter(HandlerConfig::default(), |timestamp| {
        timestamp.format("%Y%m%d").to_string()
    });

    let raw = RawDatagram::new(to_hex("1234567890"), "10.0.0.1");
    let expected_prefix = raw.timestamp.format("%Y%m%d").to_string();
    let tag = handler.manual_process(&raw).unwrap();
    assert_eq!(tag.formatted, format!("{expected_prefix}-1234567890"));
}

#[test]
fn standalone_reformatting_matches_pipeline_output() {
    let parser = TagParser::default();
    let formatted = parser.format_rfid(
        "1234567890",
        FormatOptions {
            prefix: Some("SIM".to_string()),
            separator: None,
        },
    );
    assert_eq!(formatted, "SIM-1234567890");
}
