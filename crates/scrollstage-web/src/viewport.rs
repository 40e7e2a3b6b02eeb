#![forbid(unsafe_code)]

//! Deterministic intersection watcher over a simulated document.
//!
//! Sections are laid out in document coordinates. Scrolling moves the
//! viewport; each call reports only the sections whose threshold state
//! flipped, the way a browser intersection watcher does. [`observe`]
//! reports every section once, like the initial callback a browser makes
//! right after `observe()`.
//!
//! `is_intersecting` here means "visible ratio reaches the threshold",
//! not "any overlap at all".
//!
//! [`observe`]: SimulatedViewport::observe

use scrollstage_core::{ObserverOptions, SectionObservation, StageId, ViewportRect};

#[derive(Debug, Clone)]
struct Target {
    stage: StageId,
    rect: ViewportRect,
    intersecting: Option<bool>,
}

/// A scrollable document of stage sections.
#[derive(Debug, Clone)]
pub struct SimulatedViewport {
    width: f64,
    height: f64,
    scroll_y: f64,
    options: ObserverOptions,
    targets: Vec<Target>,
}

impl SimulatedViewport {
    /// Empty document viewed through a `width` x `height` viewport.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
            scroll_y: 0.0,
            options: ObserverOptions::default(),
            targets: Vec::new(),
        }
    }

    /// Every stage stacked top to bottom, each one viewport tall.
    #[must_use]
    pub fn canonical(width: f64, height: f64) -> Self {
        let mut viewport = Self::new(width, height);
        for stage in StageId::ALL {
            viewport.append_section(stage, height);
        }
        viewport
    }

    #[must_use]
    pub fn with_options(mut self, options: ObserverOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the watcher options. Threshold state is re-derived on the
    /// next [`observe`](Self::observe).
    pub fn set_options(&mut self, options: ObserverOptions) {
        self.options = options;
    }

    #[must_use]
    pub const fn options(&self) -> &ObserverOptions {
        &self.options
    }

    /// Place a full-width section at document offset `top`.
    pub fn add_section(&mut self, stage: StageId, top: f64, height: f64) {
        self.targets.push(Target {
            stage,
            rect: ViewportRect::new(0.0, top, self.width, height),
            intersecting: None,
        });
    }

    /// Place a full-width section directly below the last one.
    pub fn append_section(&mut self, stage: StageId, height: f64) {
        let top = self.document_height();
        self.add_section(stage, top, height);
    }

    /// Bottom edge of the lowest section.
    #[must_use]
    pub fn document_height(&self) -> f64 {
        self.targets
            .iter()
            .map(|t| t.rect.bottom())
            .fold(0.0, f64::max)
    }

    /// Largest scroll offset that keeps the viewport inside the document.
    #[must_use]
    pub fn max_scroll(&self) -> f64 {
        (self.document_height() - self.height).max(0.0)
    }

    #[must_use]
    pub const fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    /// Document offset of a stage's section, if it is laid out.
    #[must_use]
    pub fn section_top(&self, stage: StageId) -> Option<f64> {
        self.targets.iter().find(|t| t.stage == stage).map(|t| t.rect.y)
    }

    /// Current visible ratio of a stage's section against the
    /// margin-adjusted viewport.
    #[must_use]
    pub fn ratio_of(&self, stage: StageId) -> Option<f64> {
        let root = self.effective_root();
        self.targets
            .iter()
            .find(|t| t.stage == stage)
            .map(|t| self.ratio(t, &root))
    }

    /// Start watching: one entry per section, in document order.
    pub fn observe(&mut self) -> Vec<SectionObservation> {
        let root = self.effective_root();
        let mut batch = Vec::with_capacity(self.targets.len());
        for i in 0..self.targets.len() {
            let ratio = self.ratio(&self.targets[i], &root);
            let intersecting = self.options.meets_threshold(ratio);
            let target = &mut self.targets[i];
            target.intersecting = Some(intersecting);
            batch.push(SectionObservation::new(target.stage, ratio, intersecting));
        }
        batch
    }

    /// Scroll to `y` (clamped to the document) and report the sections
    /// whose threshold state changed, in document order.
    pub fn scroll_to(&mut self, y: f64) -> Vec<SectionObservation> {
        self.scroll_y = y.clamp(0.0, self.max_scroll());
        let root = self.effective_root();
        let mut batch = Vec::new();
        for i in 0..self.targets.len() {
            let ratio = self.ratio(&self.targets[i], &root);
            let intersecting = self.options.meets_threshold(ratio);
            let target = &mut self.targets[i];
            if target.intersecting != Some(intersecting) {
                target.intersecting = Some(intersecting);
                batch.push(SectionObservation::new(target.stage, ratio, intersecting));
            }
        }
        batch
    }

    /// Scroll by `dy` relative to the current offset.
    pub fn scroll_by(&mut self, dy: f64) -> Vec<SectionObservation> {
        self.scroll_to(self.scroll_y + dy)
    }

    /// Scroll so that a stage's section starts at the top of the viewport.
    pub fn scroll_to_stage(&mut self, stage: StageId) -> Vec<SectionObservation> {
        match self.section_top(stage) {
            Some(top) => self.scroll_to(top),
            None => Vec::new(),
        }
    }

    fn effective_root(&self) -> ViewportRect {
        self.options
            .effective_root(&ViewportRect::from_size(self.width, self.height))
    }

    fn ratio(&self, target: &Target, root: &ViewportRect) -> f64 {
        target
            .rect
            .translate(0.0, -self.scroll_y)
            .visible_ratio(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn observe_reports_every_section_once() {
        let mut viewport = SimulatedViewport::canonical(1000.0, 800.0);
        let batch = viewport.observe();
        assert_eq!(batch.len(), StageId::ALL.len());
        assert_eq!(batch[0].id, StageId::Hero);
        assert!(batch[0].is_intersecting);
        assert!(batch[1..].iter().all(|obs| !obs.is_intersecting));
    }

    #[test]
    fn root_margin_trims_top_and_bottom() {
        let viewport = SimulatedViewport::canonical(1000.0, 1000.0);
        // Effective viewport is y in [100, 900]; hero covers [0, 1000].
        assert_eq!(viewport.ratio_of(StageId::Hero), Some(0.8));
        assert_eq!(viewport.ratio_of(StageId::Origins), Some(0.0));
    }

    #[test]
    fn scrolling_reports_only_threshold_crossings() {
        let mut viewport = SimulatedViewport::canonical(1000.0, 1000.0);
        viewport.observe();

        // Small scroll: hero still dominates, nothing crosses.
        assert!(viewport.scroll_to(100.0).is_empty());

        // Half way into origins: hero drops below, origins rises above.
        let batch = viewport.scroll_to(600.0);
        let ids: Vec<_> = batch.iter().map(|obs| (obs.id, obs.is_intersecting)).collect();
        assert_eq!(ids, vec![(StageId::Hero, false), (StageId::Origins, true)]);
    }

    #[test]
    fn scroll_is_clamped_to_document() {
        let mut viewport = SimulatedViewport::canonical(100.0, 100.0);
        viewport.observe();
        viewport.scroll_to(1.0e9);
        assert_eq!(viewport.scroll_y(), viewport.max_scroll());
        assert_eq!(viewport.max_scroll(), 700.0);
        viewport.scroll_to(-50.0);
        assert_eq!(viewport.scroll_y(), 0.0);
    }

    #[test]
    fn scroll_to_stage_lands_on_section() {
        let mut viewport = SimulatedViewport::canonical(1000.0, 1000.0);
        viewport.observe();
        let batch = viewport.scroll_to_stage(StageId::Intent);
        assert!(
            batch
                .iter()
                .any(|obs| obs.id == StageId::Intent && obs.is_intersecting)
        );
        assert_eq!(viewport.section_top(StageId::Intent), Some(3000.0));
    }

    #[test]
    fn tall_section_never_reaches_threshold() {
        let mut viewport = SimulatedViewport::new(1000.0, 1000.0);
        viewport.append_section(StageId::Hero, 1000.0);
        viewport.append_section(StageId::Probabilistic, 5000.0);
        viewport.observe();
        viewport.scroll_to(2500.0);
        // 800px of a 5000px section is visible at most: 0.16 < 0.5.
        assert_eq!(viewport.ratio_of(StageId::Probabilistic), Some(0.16));
        assert!(viewport.scroll_to(3000.0).is_empty());
    }
}
