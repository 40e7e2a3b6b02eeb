#![forbid(unsafe_code)]

//! Tracing span checks for the publish path.
//!
//! Every distinct change produces one `narrative.publish` span carrying the
//! consumer count and revision; transactions and intersection batches
//! additionally produce one `narrative.flush` span.
//!
//! Run:
//!   cargo test -p scrollstage-runtime --test tracing_publish_spans

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use scrollstage_core::{PointerPosition, SectionElement, StageId};
use scrollstage_runtime::testing::{ManualHost, RecordingConsumer};
use scrollstage_runtime::{BackgroundTheme, ConsumerSet, Narrative, NarrativeStore};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

#[derive(Debug, Clone)]
struct CapturedSpan {
    name: String,
    fields: HashMap<String, String>,
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }
    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

struct SpanCapture {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
}

impl<S> tracing_subscriber::Layer<S> for SpanCapture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        attrs.record(&mut visitor);
        self.spans.lock().unwrap().push(CapturedSpan {
            name: attrs.metadata().name().to_string(),
            fields: visitor.0.into_iter().collect(),
        });
    }
}

fn with_captured_spans<R>(f: impl FnOnce() -> R) -> (R, Vec<CapturedSpan>) {
    let spans = Arc::new(Mutex::new(Vec::new()));
    let layer = SpanCapture {
        spans: Arc::clone(&spans),
    };
    let subscriber = tracing_subscriber::registry().with(layer);
    let result = tracing::subscriber::with_default(subscriber, f);
    let captured = spans.lock().unwrap().clone();
    (result, captured)
}

fn named<'a>(spans: &'a [CapturedSpan], name: &str) -> Vec<&'a CapturedSpan> {
    spans.iter().filter(|s| s.name == name).collect()
}

#[test]
fn one_publish_span_per_distinct_change() {
    let ((), spans) = with_captured_spans(|| {
        let mut host = ManualHost::new();
        let _mounted = Narrative::new(SectionElement::canonical_document())
            .with_consumer(BackgroundTheme::new())
            .with_consumer(RecordingConsumer::new())
            .mount(&mut host)
            .expect("mount");
        host.move_pointer(10.0, 10.0);
        host.move_pointer(10.0, 10.0);
        host.enter(&[StageId::Origins]);
    });

    let publishes = named(&spans, "narrative.publish");
    // Initial frame, pointer, stage.
    assert_eq!(publishes.len(), 3);
    for span in &publishes {
        assert_eq!(span.fields.get("consumers").map(String::as_str), Some("2"));
    }
    assert_eq!(
        publishes[2].fields.get("revision").map(String::as_str),
        Some("2")
    );
    assert_eq!(
        publishes[2].fields.get("stage").map(String::as_str),
        Some("origins")
    );
}

#[test]
fn transaction_flushes_once() {
    let ((), spans) = with_captured_spans(|| {
        let store = NarrativeStore::new();
        let recorder = RecordingConsumer::shared();
        let _set = ConsumerSet::attach(&store.reader(), vec![Box::new(Rc::clone(&recorder))]);
        store.transaction(|w| {
            w.set_stage(StageId::Footer);
            w.set_pointer(PointerPosition::new(3.0, 4.0));
        });
        assert_eq!(recorder.borrow().frames().len(), 2);
    });

    let flushes = named(&spans, "narrative.flush");
    assert_eq!(flushes.len(), 1);
    // One subscriber, however many writes the transaction made.
    assert_eq!(flushes[0].fields.get("callbacks").map(String::as_str), Some("1"));
    assert_eq!(named(&spans, "narrative.publish").len(), 2);
}
