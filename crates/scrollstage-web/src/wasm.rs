#![forbid(unsafe_code)]

//! `wasm-bindgen` exports: the narrative bound to the live document.
//!
//! [`BrowserHost`] implements the runtime's host traits on top of
//! `window` `mousemove` events and an `IntersectionObserver` over the
//! page's `section[id]` elements. [`NarrativeRunner`] is the JS-facing
//! handle. Only compiled on `wasm32` targets.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Array, Function, Object, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    Document, Element, IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit,
    MouseEvent, Window,
};

use scrollstage_core::{
    ArtifactAnchor, ObserverOptions, PointerPosition, SectionElement, SectionObservation, StageId,
    StageLayout,
};
use scrollstage_runtime::{
    ArtifactMorph, BackgroundTheme, ConsumerSet, HostError, IntersectionSource, Listener,
    MountedNarrative, Narrative, NarrativeConfig, NarrativeConsumer, NarrativeFrame,
    NarrativeState, PointerSource, SubId, SubscriptionGuard, TieBreak,
};

fn console_error(msg: &str) {
    let global = js_sys::global();
    let Ok(console) = Reflect::get(&global, &"console".into()) else {
        return;
    };
    let Ok(error) = Reflect::get(&console, &"error".into()) else {
        return;
    };
    let Ok(error_fn) = error.dyn_into::<Function>() else {
        return;
    };
    let _ = error_fn.call1(&console, &JsValue::from_str(msg));
}

fn install_panic_hook() {
    use std::sync::Once;

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            let msg = if let Some(loc) = info.location() {
                format!(
                    "panic at {}:{}:{}: {info}",
                    loc.file(),
                    loc.line(),
                    loc.column()
                )
            } else {
                format!("panic: {info}")
            };
            console_error(&msg);
        }));
    });
}

fn describe(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}

fn set_js(obj: &Object, key: &str, value: JsValue) {
    let _ = Reflect::set(obj, &JsValue::from_str(key), &value);
}

fn layout_label(layout: StageLayout) -> &'static str {
    match layout {
        StageLayout::Centered => "centered",
        StageLayout::TextLeft => "text-left",
        StageLayout::TextRight => "text-right",
    }
}

fn anchor_label(anchor: ArtifactAnchor) -> &'static str {
    match anchor {
        ArtifactAnchor::Left => "left",
        ArtifactAnchor::Center => "center",
        ArtifactAnchor::Right => "right",
    }
}

fn frame_to_js(frame: &NarrativeFrame) -> JsValue {
    let obj = Object::new();
    set_js(&obj, "stage", JsValue::from_str(frame.stage.element_id()));
    set_js(&obj, "theme", JsValue::from_str(frame.theme.as_str()));
    set_js(&obj, "rootClass", JsValue::from_str(&frame.theme.root_class()));
    set_js(&obj, "layout", JsValue::from_str(layout_label(frame.layout)));
    set_js(
        &obj,
        "anchor",
        JsValue::from_str(anchor_label(frame.layout.artifact_anchor())),
    );
    set_js(&obj, "x", JsValue::from_f64(frame.pointer.x));
    set_js(&obj, "y", JsValue::from_f64(frame.pointer.y));
    set_js(&obj, "revision", JsValue::from_f64(frame.revision as f64));
    obj.into()
}

/// Host backed by the live `window` and `document`.
struct BrowserHost {
    window: Window,
    document: Document,
    next_id: SubId,
}

impl BrowserHost {
    fn new() -> Option<Self> {
        let window = web_sys::window()?;
        let document = window.document()?;
        Some(Self {
            window,
            document,
            next_id: 0,
        })
    }

    fn allocate(&mut self) -> SubId {
        self.next_id += 1;
        self.next_id
    }

    fn viewport_size(&self) -> (f64, f64) {
        let width = self
            .window
            .inner_width()
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let height = self
            .window
            .inner_height()
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        (width, height)
    }

    /// Every `section[id]` currently in the document, in document order.
    fn section_elements(&self) -> Vec<SectionElement> {
        let Ok(list) = self.document.query_selector_all("section[id]") else {
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .map(|element| SectionElement::new(element.id()))
            .collect()
    }
}

impl PointerSource for BrowserHost {
    fn subscribe_pointer(
        &mut self,
        listener: Listener<PointerPosition>,
    ) -> Result<SubscriptionGuard, HostError> {
        let sink = listener.clone();
        let callback = Closure::<dyn FnMut(MouseEvent)>::new(move |event: MouseEvent| {
            sink.emit(PointerPosition::new(
                f64::from(event.client_x()),
                f64::from(event.client_y()),
            ));
        });
        self.window
            .add_event_listener_with_callback("mousemove", callback.as_ref().unchecked_ref())
            .map_err(|err| HostError::Rejected(describe(&err)))?;

        let window = self.window.clone();
        Ok(SubscriptionGuard::new(
            self.allocate(),
            "browser.mousemove",
            &listener,
            Some(Box::new(move || {
                let _ = window.remove_event_listener_with_callback(
                    "mousemove",
                    callback.as_ref().unchecked_ref(),
                );
                drop(callback);
            })),
        ))
    }
}

impl IntersectionSource for BrowserHost {
    fn observe_sections(
        &mut self,
        stages: &[StageId],
        options: &ObserverOptions,
        listener: Listener<Vec<SectionObservation>>,
    ) -> Result<SubscriptionGuard, HostError> {
        let sink = listener.clone();
        let threshold_options = *options;
        let callback = Closure::<dyn FnMut(Array, IntersectionObserver)>::new(
            move |entries: Array, _observer: IntersectionObserver| {
                let batch: Vec<SectionObservation> = entries
                    .iter()
                    .filter_map(|value| {
                        let entry = value.dyn_into::<IntersectionObserverEntry>().ok()?;
                        let id = StageId::from_element_id(&entry.target().id())?;
                        let ratio = entry.intersection_ratio();
                        // Browsers flag any overlap as intersecting; only a
                        // section at or above the threshold may take the stage.
                        let intersecting =
                            entry.is_intersecting() && threshold_options.meets_threshold(ratio);
                        Some(SectionObservation::new(id, ratio, intersecting))
                    })
                    .collect();
                sink.emit(batch);
            },
        );

        let init = IntersectionObserverInit::new();
        init.set_threshold(&JsValue::from_f64(options.threshold));
        init.set_root_margin(&options.root_margin.to_css());
        let observer =
            IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init)
                .map_err(|err| HostError::Rejected(describe(&err)))?;

        let mut observed = 0usize;
        for stage in stages {
            if let Some(element) = self.document.get_element_by_id(stage.element_id()) {
                observer.observe(&element);
                observed += 1;
            }
        }
        if observed == 0 {
            observer.disconnect();
            return Err(HostError::Rejected(
                "no stage sections in document".to_owned(),
            ));
        }

        Ok(SubscriptionGuard::new(
            self.allocate(),
            "browser.intersections",
            &listener,
            Some(Box::new(move || {
                observer.disconnect();
                drop(callback);
            })),
        ))
    }
}

/// Forwards every frame to a JS callback.
struct JsConsumer {
    callback: Function,
}

impl NarrativeConsumer for JsConsumer {
    fn render(&mut self, frame: &NarrativeFrame) {
        if let Err(err) = self.callback.call1(&JsValue::NULL, &frame_to_js(frame)) {
            console_error(&format!("narrative callback failed: {}", describe(&err)));
        }
    }

    fn name(&self) -> &'static str {
        "js-callback"
    }
}

/// Applies the background root class to a document element.
struct RootClassBinding {
    element: Element,
    background: BackgroundTheme,
}

impl NarrativeConsumer for RootClassBinding {
    fn render(&mut self, frame: &NarrativeFrame) {
        let before = self.background.transitions();
        self.background.render(frame);
        if self.background.transitions() != before || self.element.class_name().is_empty() {
            self.element.set_class_name(self.background.root_class());
        }
    }

    fn name(&self) -> &'static str {
        "root-class"
    }
}

fn tie_break_from_label(label: Option<String>) -> Result<TieBreak, JsValue> {
    match label.as_deref() {
        None | Some("last-reported") => Ok(TieBreak::LastReported),
        Some("most-visible") => Ok(TieBreak::MostVisible),
        Some(other) => Err(JsValue::from_str(&format!("unknown tie-break policy: {other}"))),
    }
}

/// JS handle for a narrative mounted on the live document.
#[wasm_bindgen]
pub struct NarrativeRunner {
    mounted: Option<MountedNarrative>,
    last: NarrativeState,
    background: Rc<RefCell<BackgroundTheme>>,
    artifact: Rc<RefCell<ArtifactMorph>>,
    attached: Vec<ConsumerSet>,
}

#[wasm_bindgen]
impl NarrativeRunner {
    /// Mount on the current document.
    ///
    /// `tie_break` is `"last-reported"` (default) or `"most-visible"`.
    #[wasm_bindgen(constructor)]
    pub fn new(tie_break: Option<String>) -> Result<NarrativeRunner, JsValue> {
        install_panic_hook();
        let mut host =
            BrowserHost::new().ok_or_else(|| JsValue::from_str("no window or document"))?;
        let (width, height) = host.viewport_size();
        let background = Rc::new(RefCell::new(BackgroundTheme::new()));
        let artifact = Rc::new(RefCell::new(ArtifactMorph::new(width, height)));
        let config = NarrativeConfig {
            tie_break: tie_break_from_label(tie_break)?,
            ..NarrativeConfig::default()
        };

        let mounted = Narrative::new(host.section_elements())
            .with_config(config)
            .with_consumer(Rc::clone(&background))
            .with_consumer(Rc::clone(&artifact))
            .mount(&mut host)
            .map_err(|err| JsValue::from_str(&err.to_string()))?;

        Ok(Self {
            last: mounted.read(),
            mounted: Some(mounted),
            background,
            artifact,
            attached: Vec::new(),
        })
    }

    fn state(&self) -> NarrativeState {
        self.mounted.as_ref().map_or(self.last, MountedNarrative::read)
    }

    /// Active stage as its section id.
    pub fn stage(&self) -> String {
        self.state().active_stage.element_id().to_owned()
    }

    pub fn theme(&self) -> String {
        self.state().theme().as_str().to_owned()
    }

    #[wasm_bindgen(js_name = rootClass)]
    pub fn root_class(&self) -> String {
        self.background.borrow().root_class().to_owned()
    }

    #[wasm_bindgen(js_name = pointerX)]
    pub fn pointer_x(&self) -> f64 {
        self.state().pointer.x
    }

    #[wasm_bindgen(js_name = pointerY)]
    pub fn pointer_y(&self) -> f64 {
        self.state().pointer.y
    }

    /// Artifact tilt as `[x, y]`, each in `[-1, 1]` inside the viewport.
    pub fn tilt(&self) -> Array {
        let (x, y) = self.artifact.borrow().tilt();
        Array::of2(&JsValue::from_f64(x), &JsValue::from_f64(y))
    }

    #[wasm_bindgen(js_name = artifactAnchor)]
    pub fn artifact_anchor(&self) -> String {
        anchor_label(self.artifact.borrow().anchor()).to_owned()
    }

    /// Current frame as a plain object.
    pub fn frame(&self) -> JsValue {
        match &self.mounted {
            Some(mounted) => frame_to_js(&mounted.frame()),
            None => JsValue::NULL,
        }
    }

    /// Call `callback(frame)` now and after every change.
    #[wasm_bindgen(js_name = onChange)]
    pub fn on_change(&mut self, callback: Function) -> Result<(), JsValue> {
        let mounted = self
            .mounted
            .as_ref()
            .ok_or_else(|| JsValue::from_str("narrative is unmounted"))?;
        self.attached.push(ConsumerSet::attach(
            &mounted.reader(),
            vec![Box::new(JsConsumer { callback })],
        ));
        Ok(())
    }

    /// Keep `class` of the element with `element_id` equal to the
    /// background root class.
    #[wasm_bindgen(js_name = bindRootClass)]
    pub fn bind_root_class(&mut self, element_id: &str) -> Result<(), JsValue> {
        let mounted = self
            .mounted
            .as_ref()
            .ok_or_else(|| JsValue::from_str("narrative is unmounted"))?;
        let element = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id(element_id))
            .ok_or_else(|| JsValue::from_str(&format!("no element #{element_id}")))?;
        self.attached.push(ConsumerSet::attach(
            &mounted.reader(),
            vec![Box::new(RootClassBinding {
                element,
                background: BackgroundTheme::new(),
            })],
        ));
        Ok(())
    }

    /// Update the viewport size used for artifact tilt.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.artifact.borrow_mut().resize(width, height);
    }

    /// Release the document listeners. Later events change nothing.
    pub fn destroy(&mut self) {
        self.attached.clear();
        if let Some(mounted) = self.mounted.take() {
            self.last = mounted.unmount();
        }
    }

    #[wasm_bindgen(js_name = isMounted)]
    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }
}
