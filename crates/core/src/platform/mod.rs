pub mod headless;

use std::rc::Rc;

use crate::clipboard::ClipboardError;

/// Host signal the engine can listen to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Window resize (also fired on orientation changes).
    Resize,
    /// Window vertical scroll.
    Scroll,
    /// `change` event of the media query list for this exact query string.
    MediaChange(String),
}

/// Options passed along with a listener registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    /// The listener promises not to cancel the event, so the host may keep
    /// its default handling (scrolling) off the listener's critical path.
    pub passive: bool,
}

impl ListenerOptions {
    pub const PASSIVE: ListenerOptions = ListenerOptions { passive: true };
}

/// Opaque handle for a registered listener, observer or timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerKey(pub u64);

/// Host-assigned identity of a DOM element (or anything else that can be
/// observed for intersection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

/// One intersection observer report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    /// Visible fraction of the target, `0.0..=1.0`.
    pub ratio: f64,
    pub is_intersecting: bool,
}

impl IntersectionEntry {
    /// Whether this report satisfies `threshold`.
    ///
    /// A zero threshold means "any pixel visible", which the ratio alone
    /// cannot express.
    pub fn meets(&self, threshold: f64) -> bool {
        if threshold <= 0.0 {
            self.is_intersecting
        } else {
            self.is_intersecting && self.ratio >= threshold
        }
    }
}

/// Safe-area edge, named after the `env(safe-area-inset-*)` variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SafeAreaEdge {
    Top,
    Bottom,
    Left,
    Right,
}

impl SafeAreaEdge {
    pub const ALL: [SafeAreaEdge; 4] = [Self::Top, Self::Bottom, Self::Left, Self::Right];

    pub fn env_name(self) -> &'static str {
        match self {
            Self::Top => "safe-area-inset-top",
            Self::Bottom => "safe-area-inset-bottom",
            Self::Left => "safe-area-inset-left",
            Self::Right => "safe-area-inset-right",
        }
    }
}

pub type Callback = Rc<dyn Fn()>;
pub type IntersectionCallback = Rc<dyn Fn(IntersectionEntry)>;
pub type ClipboardCallback = Box<dyn FnOnce(Result<(), ClipboardError>)>;

/// The host's signal surface.
///
/// Reads are infallible: hosts map missing APIs to a neutral value
/// (`None`, `0`, `false`, an empty string). Callbacks are invoked on the
/// host's single event thread; a host must not invoke a listener after
/// the matching `remove_*`/`clear_*` call returns.
pub trait Platform {
    /// Layout viewport size in CSS pixels.
    fn inner_size(&self) -> (u32, u32);
    fn device_pixel_ratio(&self) -> f64;
    /// Vertical scroll offset of the document.
    fn scroll_y(&self) -> f64;
    /// Full scrollable height of the document element.
    fn document_height(&self) -> f64;
    fn user_agent(&self) -> String;
    fn max_touch_points(&self) -> u32;
    /// Evaluate a media query right now. Unsupported queries do not match.
    fn matches_media(&self, query: &str) -> bool;
    /// Resolved value of an `env(safe-area-inset-*)` variable, if the host
    /// exposes one.
    fn safe_area_env(&self, edge: SafeAreaEdge) -> Option<String>;
    /// Monotonic clock in milliseconds.
    fn now_ms(&self) -> f64;

    fn add_listener(
        &self,
        signal: Signal,
        options: ListenerOptions,
        callback: Callback,
    ) -> ListenerKey;
    fn remove_listener(&self, key: ListenerKey);

    /// Start watching `target`. Hosts report the current intersection once
    /// after observing and again whenever the ratio crosses `threshold`.
    fn observe_intersection(
        &self,
        target: ElementId,
        threshold: f64,
        callback: IntersectionCallback,
    ) -> ListenerKey;
    fn disconnect_intersection(&self, key: ListenerKey);

    fn set_timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> ListenerKey;
    fn clear_timeout(&self, key: ListenerKey);

    /// Write `text` to the system clipboard. `done` may run synchronously or
    /// after the host's async clipboard promise settles.
    fn write_clipboard(&self, text: &str, done: ClipboardCallback);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_threshold_means_any_intersection() {
        let sliver = IntersectionEntry {
            ratio: 0.01,
            is_intersecting: true,
        };
        assert!(sliver.meets(0.0));
        assert!(!sliver.meets(0.5));
    }

    #[test]
    fn threshold_is_inclusive() {
        let half = IntersectionEntry {
            ratio: 0.5,
            is_intersecting: true,
        };
        assert!(half.meets(0.5));
        let off = IntersectionEntry {
            ratio: 0.0,
            is_intersecting: false,
        };
        assert!(!off.meets(0.0));
    }
}
