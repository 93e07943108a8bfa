use std::cell::{Cell, OnceCell, RefCell};
use std::rc::Rc;

use viewport_sense_protocol::{
    AccessibilityState, Breakpoint, ColorScheme, DeviceState, DeviceType, Orientation,
    SafeAreaInsets, ScreenDensity, ScrollState, ViewportState,
};

use crate::breakpoints::{BreakpointValues, Breakpoints};
use crate::clipboard::CopyFeedback;
use crate::config::{ConfigError, EngineConfig};
use crate::platform::{
    Callback, ElementId, IntersectionEntry, ListenerKey, ListenerOptions, Platform, Signal,
};
use crate::safe_area::read_safe_area;
use crate::scroll::{ScrollSample, ScrollTracker};
use crate::subscription::{Liveness, Subscription};
use crate::user_agent::parse_user_agent;
use crate::visibility::{ElementRef, VisibilityOptions};

pub const HIGH_CONTRAST_QUERY: &str = "(prefers-contrast: high)";
pub const REDUCED_DATA_QUERY: &str = "(prefers-reduced-data: reduce)";
pub const DARK_SCHEME_QUERY: &str = "(prefers-color-scheme: dark)";
pub const REDUCED_MOTION_QUERY: &str = "(prefers-reduced-motion: reduce)";
pub const STANDALONE_QUERY: &str = "(display-mode: standalone)";

/// Derives viewport, device, accessibility, scroll, visibility and
/// safe-area state from a [`Platform`].
///
/// Each `observe_*` call registers its own host listeners and returns a
/// [`Subscription`] that removes them. Snapshots that have an initial value
/// are delivered synchronously before `observe_*` returns. Subscriptions
/// share no mutable state with each other.
pub struct ViewportEngine<P: Platform + 'static> {
    platform: Rc<P>,
    config: EngineConfig,
    device: OnceCell<DeviceState>,
}

impl<P: Platform + 'static> ViewportEngine<P> {
    pub fn new(platform: Rc<P>) -> Self {
        Self {
            platform,
            config: EngineConfig::default(),
            device: OnceCell::new(),
        }
    }

    pub fn with_config(platform: Rc<P>, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            platform,
            config,
            device: OnceCell::new(),
        })
    }

    pub fn platform(&self) -> &Rc<P> {
        &self.platform
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- Snapshots ---

    pub fn viewport(&self) -> ViewportState {
        read_viewport(self.platform.as_ref(), &self.config.breakpoints)
    }

    pub fn breakpoint(&self) -> Breakpoint {
        self.config
            .breakpoints
            .classify(self.platform.inner_size().0)
    }

    /// Browser/OS identity. Computed on first call, then cached for the
    /// lifetime of the engine.
    pub fn device(&self) -> &DeviceState {
        self.device
            .get_or_init(|| read_device(self.platform.as_ref()))
    }

    pub fn accessibility(&self) -> AccessibilityState {
        read_accessibility(self.platform.as_ref())
    }

    pub fn color_scheme(&self) -> ColorScheme {
        color_scheme(self.platform.matches_media(DARK_SCHEME_QUERY))
    }

    pub fn prefers_reduced_motion(&self) -> bool {
        self.platform.matches_media(REDUCED_MOTION_QUERY)
    }

    pub fn safe_area(&self) -> SafeAreaInsets {
        read_safe_area(self.platform.as_ref())
    }

    /// Current scroll position with zero velocity and no direction.
    pub fn scroll(&self) -> ScrollState {
        let sample = read_scroll_sample(self.platform.as_ref());
        ScrollTracker::new(&sample, self.config.near_edge_margin).update(&sample)
    }

    /// Value for the current breakpoint, walking down the tiers, falling back
    /// to the first-inserted value. `None` only for an empty mapping.
    pub fn resolve_breakpoint_value<'a, T>(&self, values: &'a BreakpointValues<T>) -> Option<&'a T> {
        values.resolve(self.breakpoint())
    }

    pub fn copy_feedback(&self) -> CopyFeedback<P> {
        CopyFeedback::new(Rc::clone(&self.platform), self.config.copy_reset_ms)
    }

    // --- Resize-driven projections ---

    /// Full viewport snapshot now and after every resize.
    pub fn observe_viewport(&self, callback: impl Fn(&ViewportState) + 'static) -> Subscription {
        let breakpoints = self.config.breakpoints;
        let emit = move |platform: &P| {
            let state = read_viewport(platform, &breakpoints);
            tracing::trace!(
                width = state.width,
                height = state.height,
                breakpoint = %state.breakpoint,
                "viewport"
            );
            callback(&state);
        };
        emit(self.platform.as_ref());
        self.on_resize(emit)
    }

    /// Breakpoint tier, delivered only when it changes.
    pub fn observe_breakpoint(&self, callback: impl Fn(Breakpoint) + 'static) -> Subscription {
        self.observe_distinct(|state| state.breakpoint, callback)
    }

    pub fn observe_orientation(&self, callback: impl Fn(Orientation) + 'static) -> Subscription {
        self.observe_distinct(|state| state.orientation, callback)
    }

    pub fn observe_device_type(&self, callback: impl Fn(DeviceType) + 'static) -> Subscription {
        self.observe_distinct(ViewportState::device_type, callback)
    }

    /// Resolved [`BreakpointValues`] entry, delivered when the resolved
    /// value changes.
    pub fn observe_breakpoint_value<T: Clone + PartialEq + 'static>(
        &self,
        values: BreakpointValues<T>,
        callback: impl Fn(Option<&T>) + 'static,
    ) -> Subscription {
        let last: RefCell<Option<Option<T>>> = RefCell::new(None);
        self.observe_breakpoint(move |tier| {
            let resolved = values.resolve(tier);
            let changed = last.borrow().as_ref().is_none_or(|prev| prev.as_ref() != resolved);
            if changed {
                *last.borrow_mut() = Some(resolved.cloned());
                callback(resolved);
            }
        })
    }

    /// Insets now and after every resize (rotation moves the notch).
    pub fn observe_safe_area(&self, callback: impl Fn(&SafeAreaInsets) + 'static) -> Subscription {
        let emit = move |platform: &P| callback(&read_safe_area(platform));
        emit(self.platform.as_ref());
        self.on_resize(emit)
    }

    // --- Media features ---

    /// Whether `query` matches, now and on every `change` of that query.
    pub fn observe_media_query(
        &self,
        query: &str,
        callback: impl Fn(bool) + 'static,
    ) -> Subscription {
        let owned = query.to_string();
        let emit = move |platform: &P| callback(platform.matches_media(&owned));
        emit(self.platform.as_ref());
        self.listen(
            Signal::MediaChange(query.to_string()),
            ListenerOptions::default(),
            emit,
        )
    }

    /// Contrast and reduced-data preferences, merged. Either feature's
    /// `change` delivers a fresh snapshot of both.
    pub fn observe_accessibility(
        &self,
        callback: impl Fn(&AccessibilityState) + 'static,
    ) -> Subscription {
        let emit = Rc::new(move |platform: &P| callback(&read_accessibility(platform)));
        emit(self.platform.as_ref());

        let listeners = [HIGH_CONTRAST_QUERY, REDUCED_DATA_QUERY].map(|query| {
            let emit = Rc::clone(&emit);
            self.listen(
                Signal::MediaChange(query.to_string()),
                ListenerOptions::default(),
                move |platform: &P| emit(platform),
            )
        });
        Subscription::merge(listeners)
    }

    pub fn observe_color_scheme(&self, callback: impl Fn(ColorScheme) + 'static) -> Subscription {
        self.observe_media_query(DARK_SCHEME_QUERY, move |dark| callback(color_scheme(dark)))
    }

    pub fn observe_reduced_motion(&self, callback: impl Fn(bool) + 'static) -> Subscription {
        self.observe_media_query(REDUCED_MOTION_QUERY, callback)
    }

    // --- Scroll ---

    /// Scroll position and kinematics, through a passive listener.
    ///
    /// The previous sample lives inside this subscription only.
    pub fn observe_scroll(&self, callback: impl Fn(&ScrollState) + 'static) -> Subscription {
        let initial = read_scroll_sample(self.platform.as_ref());
        let tracker = RefCell::new(ScrollTracker::new(&initial, self.config.near_edge_margin));
        let emit = move |platform: &P| {
            let state = tracker.borrow_mut().update(&read_scroll_sample(platform));
            tracing::trace!(y = state.y, velocity = state.velocity, "scroll");
            callback(&state);
        };
        emit(self.platform.as_ref());
        self.listen(Signal::Scroll, ListenerOptions::PASSIVE, emit)
    }

    // --- Visibility ---

    /// Whether `element` is at least `threshold` visible.
    ///
    /// Does nothing while the ref is empty. When the ref is pointed at
    /// another element the old observer is disconnected and a new one
    /// attached; clearing the ref reports `false`.
    pub fn observe_visibility(
        &self,
        element: &ElementRef,
        options: VisibilityOptions,
        callback: impl Fn(bool) + 'static,
    ) -> Subscription {
        let threshold = options.resolve(self.config.visibility_threshold);
        let live = Liveness::new();
        let callback: Rc<dyn Fn(bool)> = Rc::new(callback);
        let attached: Rc<Cell<Option<(ElementId, ListenerKey)>>> = Rc::default();

        let reattach = {
            let platform = Rc::downgrade(&self.platform);
            let attached = Rc::clone(&attached);
            let gate = live.clone();
            move |target: Option<ElementId>| {
                let Some(platform) = platform.upgrade() else {
                    return;
                };
                if attached.get().map(|(id, _)| id) == target {
                    return;
                }
                if let Some((previous, key)) = attached.take() {
                    platform.disconnect_intersection(key);
                    tracing::debug!(element = previous.0, "visibility observer detached");
                    if target.is_none() && gate.is_live() {
                        callback(false);
                    }
                }
                let Some(target) = target else {
                    return;
                };
                let report = {
                    let gate = gate.clone();
                    let callback = Rc::clone(&callback);
                    Rc::new(move |entry: IntersectionEntry| {
                        if gate.is_live() {
                            callback(entry.meets(threshold));
                        }
                    })
                };
                let key = platform.observe_intersection(target, threshold, report);
                if !gate.is_live() {
                    platform.disconnect_intersection(key);
                    return;
                }
                tracing::debug!(element = target.0, threshold, "visibility observer attached");
                attached.set(Some((target, key)));
            }
        };

        // Hosts may report from inside observe_intersection, and the
        // subscriber may re-point the ref from that report. Nested requests
        // are queued until the current attach has recorded its key.
        let attach = {
            let busy = Cell::new(false);
            let pending: Cell<Option<Option<ElementId>>> = Cell::new(None);
            Rc::new(move |target: Option<ElementId>| {
                if busy.replace(true) {
                    pending.set(Some(target));
                    return;
                }
                let mut next = Some(target);
                while let Some(target) = next {
                    reattach(target);
                    next = pending.take();
                }
                busy.set(false);
            })
        };

        let watcher = {
            let attach = Rc::clone(&attach);
            element.watch(move |target| attach(target))
        };
        attach(element.get());

        let element = element.clone();
        let platform = Rc::downgrade(&self.platform);
        Subscription::new(live, move || {
            element.unwatch(watcher);
            if let (Some((_, key)), Some(platform)) = (attached.take(), platform.upgrade()) {
                platform.disconnect_intersection(key);
            }
        })
    }

    // --- Plumbing ---

    fn observe_distinct<T: Copy + PartialEq + 'static>(
        &self,
        project: impl Fn(&ViewportState) -> T + 'static,
        callback: impl Fn(T) + 'static,
    ) -> Subscription {
        let last = Cell::new(None);
        self.observe_viewport(move |state| {
            let value = project(state);
            if last.get() != Some(value) {
                last.set(Some(value));
                callback(value);
            }
        })
    }

    /// Register `handler` for `signal`, gated on the returned subscription.
    fn listen(
        &self,
        signal: Signal,
        options: ListenerOptions,
        handler: impl Fn(&P) + 'static,
    ) -> Subscription {
        let live = Liveness::new();
        let gate = live.clone();
        let platform = Rc::downgrade(&self.platform);
        let callback: Callback = Rc::new(move || {
            if !gate.is_live() {
                return;
            }
            if let Some(platform) = platform.upgrade() {
                handler(platform.as_ref());
            }
        });
        let key = self.platform.add_listener(signal.clone(), options, callback);
        tracing::debug!(?signal, key = key.0, passive = options.passive, "listener attached");

        let platform = Rc::downgrade(&self.platform);
        Subscription::new(live, move || {
            if let Some(platform) = platform.upgrade() {
                platform.remove_listener(key);
            }
            tracing::debug!(?signal, key = key.0, "listener released");
        })
    }

    /// Resize listener, debounced when `resize_debounce_ms` is set.
    fn on_resize(&self, handler: impl Fn(&P) + 'static) -> Subscription {
        let Some(delay) = self.config.resize_debounce_ms else {
            return self.listen(Signal::Resize, ListenerOptions::default(), handler);
        };

        let handler = Rc::new(handler);
        let pending: Rc<Cell<Option<ListenerKey>>> = Rc::default();
        let timer_live = Liveness::new();

        let listener = {
            let pending = Rc::clone(&pending);
            let gate = timer_live.clone();
            let weak = Rc::downgrade(&self.platform);
            self.listen(
                Signal::Resize,
                ListenerOptions::default(),
                move |platform: &P| {
                    if let Some(previous) = pending.take() {
                        platform.clear_timeout(previous);
                    }
                    let handler = Rc::clone(&handler);
                    let slot = Rc::clone(&pending);
                    let gate = gate.clone();
                    let weak = weak.clone();
                    let key = platform.set_timeout(
                        delay,
                        Box::new(move || {
                            slot.set(None);
                            if !gate.is_live() {
                                return;
                            }
                            if let Some(platform) = weak.upgrade() {
                                handler(platform.as_ref());
                            }
                        }),
                    );
                    pending.set(Some(key));
                },
            )
        };

        let platform = Rc::downgrade(&self.platform);
        let timer = Subscription::new(timer_live, move || {
            if let (Some(key), Some(platform)) = (pending.take(), platform.upgrade()) {
                platform.clear_timeout(key);
            }
        });
        Subscription::merge([listener, timer])
    }
}

fn read_viewport<P: Platform + ?Sized>(platform: &P, breakpoints: &Breakpoints) -> ViewportState {
    let (width, height) = platform.inner_size();
    ViewportState::new(
        width,
        height,
        breakpoints.classify(width),
        platform.device_pixel_ratio(),
    )
}

fn read_device<P: Platform + ?Sized>(platform: &P) -> DeviceState {
    let ua = parse_user_agent(&platform.user_agent());
    let device = DeviceState {
        browser: ua.browser.to_string(),
        browser_version: ua.browser_version,
        os: ua.os.to_string(),
        touch_points: platform.max_touch_points(),
        is_pwa: platform.matches_media(STANDALONE_QUERY),
        screen_density: ScreenDensity::from_pixel_ratio(platform.device_pixel_ratio()),
    };
    tracing::debug!(browser = %device.browser, os = %device.os, "device detected");
    device
}

fn read_accessibility<P: Platform + ?Sized>(platform: &P) -> AccessibilityState {
    AccessibilityState {
        prefers_high_contrast: platform.matches_media(HIGH_CONTRAST_QUERY),
        prefers_reduced_data: platform.matches_media(REDUCED_DATA_QUERY),
    }
}

fn read_scroll_sample<P: Platform + ?Sized>(platform: &P) -> ScrollSample {
    ScrollSample {
        y: platform.scroll_y(),
        time_ms: platform.now_ms(),
        document_height: platform.document_height(),
        window_height: f64::from(platform.inner_size().1),
    }
}

fn color_scheme(dark: bool) -> ColorScheme {
    if dark {
        ColorScheme::Dark
    } else {
        ColorScheme::Light
    }
}
