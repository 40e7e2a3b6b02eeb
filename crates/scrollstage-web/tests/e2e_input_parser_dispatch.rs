#![forbid(unsafe_code)]

//! Encoded host events replayed through the web host.
//!
//! Run:
//!   cargo test -p scrollstage-web --features input-parser --test e2e_input_parser_dispatch

use pretty_assertions::assert_eq;
use scrollstage_core::{PointerPosition, SectionElement, StageId};
use scrollstage_runtime::Narrative;
use scrollstage_web::WebHost;
use scrollstage_web::input_parser::InputParseError;

const SESSION: &[&str] = &[
    r#"{"kind":"intersection","entries":[{"id":"hero","ratio":0.8,"intersecting":true}]}"#,
    r#"{"kind":"pointer","x":12,"y":30}"#,
    r#"{"kind":"resize","width":1024,"height":768}"#,
    r#"{"kind":"intersection","entries":[{"id":"hero","ratio":0.3,"intersecting":false},{"id":"origins","ratio":0.55,"intersecting":true}]}"#,
    r#"{"kind":"intersection","entries":[{"id":"feedback","ratio":0.8,"intersecting":true},{"id":"intent","ratio":0.7,"intersecting":true}]}"#,
    r#"{"kind":"pointer","x":320,"y":140}"#,
];

#[test]
fn replayed_session_reaches_expected_state() {
    let mut host = WebHost::new();
    let mounted = Narrative::new(SectionElement::canonical_document())
        .mount(&mut host)
        .expect("mount");

    let mapped: Vec<bool> = SESSION
        .iter()
        .map(|json| host.push_encoded(json).expect("valid event"))
        .collect();
    assert_eq!(mapped, vec![true, true, false, true, true, true]);

    let stats = host.dispatch_pending();
    assert_eq!(stats.pointer_events, 2);
    assert_eq!(stats.batches, 3);
    assert_eq!(stats.dropped, 0);

    let state = mounted.read();
    assert_eq!(state.active_stage, StageId::Intent);
    assert_eq!(state.pointer, PointerPosition::new(320.0, 140.0));
}

#[test]
fn malformed_event_is_rejected_without_queueing() {
    let mut host = WebHost::new();
    assert!(matches!(
        host.push_encoded(r#"{"kind":"pointer","x":1"#),
        Err(InputParseError::Json(_))
    ));
    assert_eq!(
        host.push_encoded(r#"{"kind":"pointer","y":1}"#),
        Err(InputParseError::MissingField("x"))
    );
    assert_eq!(host.pending(), 0);
}
