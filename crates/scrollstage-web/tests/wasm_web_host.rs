#![cfg(target_arch = "wasm32")]
#![forbid(unsafe_code)]

use scrollstage_core::{SectionElement, SectionObservation, StageId};
use scrollstage_runtime::Narrative;
use scrollstage_web::{SimulatedViewport, WebHost};
use wasm_bindgen_test::wasm_bindgen_test;

#[wasm_bindgen_test]
fn web_host_drives_narrative_on_wasm() {
    let mut host = WebHost::new();
    let mounted = Narrative::new(SectionElement::canonical_document())
        .mount(&mut host)
        .expect("mount");
    host.push_pointer(320.0, 140.0);
    host.push_intersections(vec![
        SectionObservation::entering(StageId::Feedback, 0.8),
        SectionObservation::entering(StageId::Intent, 0.6),
    ]);
    host.dispatch_pending();
    assert_eq!(mounted.read().active_stage, StageId::Intent);
    assert_eq!(mounted.read().pointer.x, 320.0);
}

#[wasm_bindgen_test]
fn simulated_viewport_on_wasm() {
    let mut host = WebHost::new();
    let mounted = Narrative::new(SectionElement::canonical_document())
        .mount(&mut host)
        .expect("mount");
    let mut viewport = SimulatedViewport::canonical(800.0, 600.0);
    host.push_intersections(viewport.observe());
    host.push_intersections(viewport.scroll_to_stage(StageId::Footer));
    host.dispatch_pending();
    assert_eq!(mounted.read().active_stage, StageId::Footer);
    let _ = mounted.unmount();
    assert_eq!(host.live_subscriptions(), 0);
}
