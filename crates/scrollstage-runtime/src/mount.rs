#![forbid(unsafe_code)]

//! Narrative lifecycle: build, mount, unmount.
//!
//! ```rust,ignore
//! let mounted = Narrative::new(SectionElement::canonical_document())
//!     .with_consumer(BackgroundTheme::new())
//!     .with_consumer(ArtifactMorph::new(1280.0, 720.0))
//!     .mount(&mut host)?;
//! // ... host delivers events ...
//! let last = mounted.unmount();
//! ```
//!
//! Mount order is store, consumers, tracker, observer. Consumers render the
//! initial frame before any host subscription exists. Unmount releases both
//! host subscriptions before the consumers are detached.

use scrollstage_core::SectionElement;
use tracing::{debug, info};

use crate::config::{ConfigError, NarrativeConfig};
use crate::consumer::{ConsumerSet, NarrativeConsumer};
use crate::host::NarrativeHost;
use crate::narrative::{NarrativeFrame, NarrativeReader, NarrativeState, NarrativeStore};
use crate::pointer_tracker::{MountedTracker, PointerTracker};
use crate::stage_observer::{MountedObserver, StageObserver};

/// Builder for a narrative over an explicit list of sections.
pub struct Narrative {
    sections: Vec<SectionElement>,
    config: NarrativeConfig,
    consumers: Vec<Box<dyn NarrativeConsumer>>,
}

impl Narrative {
    #[must_use]
    pub fn new(sections: Vec<SectionElement>) -> Self {
        Self {
            sections,
            config: NarrativeConfig::default(),
            consumers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: NarrativeConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach a consumer. Consumers render in the order they were added.
    #[must_use]
    pub fn with_consumer(mut self, consumer: impl NarrativeConsumer + 'static) -> Self {
        self.consumers.push(Box::new(consumer));
        self
    }

    /// Validate the configuration and subscribe to `host`.
    ///
    /// Missing host capabilities are not errors; only an invalid
    /// configuration fails the mount.
    pub fn mount<H: NarrativeHost>(self, host: &mut H) -> Result<MountedNarrative, ConfigError> {
        let config = self.config.validated()?;
        let store = NarrativeStore::new();
        let consumers = ConsumerSet::attach(&store.reader(), self.consumers);

        let tracker = PointerTracker::new().mount(host, store.writer());
        let observer = StageObserver::new(&self.sections, &config).mount(host, store.writer());

        info!(
            stages = observer.stages().len(),
            consumers = consumers.len(),
            pointer_live = tracker.is_live(),
            observer_live = observer.is_live(),
            tie_break = ?config.tie_break,
            "narrative mounted"
        );

        Ok(MountedNarrative {
            tracker,
            observer,
            consumers,
            store,
            config,
        })
    }
}

impl std::fmt::Debug for Narrative {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Narrative")
            .field("sections", &self.sections)
            .field("config", &self.config)
            .field("consumers", &self.consumers.len())
            .finish()
    }
}

/// A mounted narrative.
///
/// Dropping it unsubscribes from the host; no host event can change the
/// state afterwards.
#[derive(Debug)]
pub struct MountedNarrative {
    // Field order is drop order: host subscriptions go first.
    tracker: MountedTracker,
    observer: MountedObserver,
    consumers: ConsumerSet,
    store: NarrativeStore,
    config: NarrativeConfig,
}

impl MountedNarrative {
    /// Latest `(stage, pointer)`.
    #[must_use]
    pub fn read(&self) -> NarrativeState {
        self.store.read()
    }

    #[must_use]
    pub fn frame(&self) -> NarrativeFrame {
        self.store.frame()
    }

    /// Reader for attaching further consumers.
    #[must_use]
    pub fn reader(&self) -> NarrativeReader {
        self.store.reader()
    }

    #[must_use]
    pub const fn config(&self) -> &NarrativeConfig {
        &self.config
    }

    #[must_use]
    pub fn pointer_live(&self) -> bool {
        self.tracker.is_live()
    }

    #[must_use]
    pub fn observer_live(&self) -> bool {
        self.observer.is_live()
    }

    /// Frames delivered to consumers, counting the initial one.
    #[must_use]
    pub fn publishes(&self) -> u64 {
        self.consumers.publishes()
    }

    /// Stage transitions taken since mount.
    #[must_use]
    pub fn transitions(&self) -> u64 {
        self.observer.transitions()
    }

    /// Release both host subscriptions and return the final state.
    pub fn unmount(self) -> NarrativeState {
        let Self {
            tracker,
            observer,
            consumers,
            store,
            ..
        } = self;
        tracker.unmount();
        observer.unmount();
        let state = store.read();
        debug!(
            stage = %state.active_stage,
            publishes = consumers.publishes(),
            "narrative unmounted"
        );
        state
    }
}
