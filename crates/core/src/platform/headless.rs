//! In-memory host with scripted signals.
//!
//! Used by the test suite and by non-browser embedders (the terminal demo
//! drives one from crossterm events). Every signal is raised explicitly:
//! `resize`, `scroll_to`, `set_media`, `place_element`, `advance`.
//! Dispatch is synchronous and never holds an internal borrow while a
//! callback runs, so callbacks may freely subscribe or unsubscribe.

use std::cell::RefCell;
use std::collections::HashMap;

use viewport_sense_protocol::Rect;

use super::{
    Callback, ClipboardCallback, ElementId, IntersectionCallback, IntersectionEntry, ListenerKey,
    ListenerOptions, Platform, SafeAreaEdge, Signal,
};
use crate::clipboard::ClipboardError;

struct ListenerEntry {
    key: ListenerKey,
    signal: Signal,
    options: ListenerOptions,
    callback: Callback,
}

struct ObserverEntry {
    key: ListenerKey,
    target: ElementId,
    threshold: f64,
    callback: IntersectionCallback,
    last_met: bool,
}

struct TimerEntry {
    key: ListenerKey,
    due_ms: f64,
    callback: Box<dyn FnOnce()>,
}

struct HeadlessState {
    width: u32,
    height: u32,
    pixel_ratio: f64,
    scroll_y: f64,
    document_height: f64,
    user_agent: String,
    touch_points: u32,
    now_ms: f64,
    media: HashMap<String, bool>,
    safe_area: HashMap<SafeAreaEdge, String>,
    elements: HashMap<ElementId, Rect>,
    listeners: Vec<ListenerEntry>,
    observers: Vec<ObserverEntry>,
    timers: Vec<TimerEntry>,
    next_key: u64,
    clipboard: Option<String>,
    clipboard_denied: bool,
}

impl HeadlessState {
    fn next_key(&mut self) -> ListenerKey {
        let key = ListenerKey(self.next_key);
        self.next_key += 1;
        key
    }

    fn viewport_rect(&self) -> Rect {
        Rect::new(
            0.0,
            self.scroll_y,
            f64::from(self.width),
            f64::from(self.height),
        )
    }

    fn intersection(&self, target: ElementId) -> IntersectionEntry {
        let ratio = self
            .elements
            .get(&target)
            .map_or(0.0, |rect| rect.visible_ratio(&self.viewport_rect()));
        IntersectionEntry {
            ratio,
            is_intersecting: ratio > 0.0,
        }
    }

    fn max_scroll(&self) -> f64 {
        (self.document_height - f64::from(self.height)).max(0.0)
    }
}

pub struct HeadlessPlatform {
    state: RefCell<HeadlessState>,
}

impl HeadlessPlatform {
    /// A 1024×768 desktop viewport at pixel ratio 1 with no scrollable
    /// content, an empty user agent and no media features matching.
    pub fn new() -> Self {
        Self {
            state: RefCell::new(HeadlessState {
                width: 1024,
                height: 768,
                pixel_ratio: 1.0,
                scroll_y: 0.0,
                document_height: 768.0,
                user_agent: String::new(),
                touch_points: 0,
                now_ms: 0.0,
                media: HashMap::new(),
                safe_area: HashMap::new(),
                elements: HashMap::new(),
                listeners: Vec::new(),
                observers: Vec::new(),
                timers: Vec::new(),
                next_key: 1,
                clipboard: None,
                clipboard_denied: false,
            }),
        }
    }

    pub fn with_size(self, width: u32, height: u32) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.width = width;
            state.height = height;
            state.document_height = state.document_height.max(f64::from(height));
        }
        self
    }

    pub fn with_pixel_ratio(self, ratio: f64) -> Self {
        self.state.borrow_mut().pixel_ratio = ratio;
        self
    }

    pub fn with_user_agent(self, user_agent: impl Into<String>) -> Self {
        self.state.borrow_mut().user_agent = user_agent.into();
        self
    }

    pub fn with_touch_points(self, touch_points: u32) -> Self {
        self.state.borrow_mut().touch_points = touch_points;
        self
    }

    pub fn with_document_height(self, height: f64) -> Self {
        self.set_document_height(height);
        self
    }

    pub fn with_media(self, query: impl Into<String>, matches: bool) -> Self {
        self.state.borrow_mut().media.insert(query.into(), matches);
        self
    }

    // --- Signals ---

    /// Change the viewport size and fire `resize`.
    pub fn resize(&self, width: u32, height: u32) {
        {
            let mut state = self.state.borrow_mut();
            state.width = width;
            state.height = height;
        }
        self.dispatch(&Signal::Resize);
        self.reevaluate_intersections();
    }

    /// Scroll to `y` (clamped to the scrollable range) and fire `scroll`.
    pub fn scroll_to(&self, y: f64) {
        {
            let mut state = self.state.borrow_mut();
            let max = state.max_scroll();
            state.scroll_y = y.clamp(0.0, max);
        }
        self.dispatch(&Signal::Scroll);
        self.reevaluate_intersections();
    }

    pub fn scroll_by(&self, dy: f64) {
        let y = self.state.borrow().scroll_y + dy;
        self.scroll_to(y);
    }

    /// Content height changes do not fire any signal by themselves.
    pub fn set_document_height(&self, height: f64) {
        self.state.borrow_mut().document_height = height.max(0.0);
    }

    /// Set whether `query` matches; fires its `change` event if the value
    /// flipped.
    pub fn set_media(&self, query: &str, matches: bool) {
        let previous = self
            .state
            .borrow_mut()
            .media
            .insert(query.to_string(), matches);
        if previous.unwrap_or(false) != matches {
            self.dispatch(&Signal::MediaChange(query.to_string()));
        }
    }

    /// Set the resolved `env(safe-area-inset-*)` value. No event fires;
    /// hosts change insets together with a resize.
    pub fn set_safe_area(&self, edge: SafeAreaEdge, value: Option<&str>) {
        let mut state = self.state.borrow_mut();
        match value {
            Some(value) => state.safe_area.insert(edge, value.to_string()),
            None => state.safe_area.remove(&edge),
        };
    }

    pub fn set_pixel_ratio(&self, ratio: f64) {
        self.state.borrow_mut().pixel_ratio = ratio;
    }

    /// Place (or move) an element, in document coordinates.
    pub fn place_element(&self, id: ElementId, rect: Rect) {
        self.state.borrow_mut().elements.insert(id, rect);
        self.reevaluate_intersections();
    }

    pub fn remove_element(&self, id: ElementId) {
        self.state.borrow_mut().elements.remove(&id);
        self.reevaluate_intersections();
    }

    /// Move the clock forward, running due timers in deadline order.
    pub fn advance(&self, ms: f64) {
        let target = self.state.borrow().now_ms + ms.max(0.0);
        loop {
            let next = {
                let mut state = self.state.borrow_mut();
                let due = state
                    .timers
                    .iter()
                    .enumerate()
                    .filter(|(_, timer)| timer.due_ms <= target)
                    .min_by(|(_, a), (_, b)| {
                        a.due_ms.total_cmp(&b.due_ms).then(a.key.cmp(&b.key))
                    })
                    .map(|(index, _)| index);
                due.map(|index| {
                    let timer = state.timers.remove(index);
                    state.now_ms = state.now_ms.max(timer.due_ms);
                    timer.callback
                })
            };
            match next {
                Some(callback) => callback(),
                None => break,
            }
        }
        self.state.borrow_mut().now_ms = target;
    }

    pub fn set_clipboard_denied(&self, denied: bool) {
        self.state.borrow_mut().clipboard_denied = denied;
    }

    // --- Inspection ---

    pub fn clipboard(&self) -> Option<String> {
        self.state.borrow().clipboard.clone()
    }

    pub fn listener_count(&self, signal: &Signal) -> usize {
        self.listener_options(signal).len()
    }

    pub fn listener_options(&self, signal: &Signal) -> Vec<ListenerOptions> {
        self.state
            .borrow()
            .listeners
            .iter()
            .filter(|l| &l.signal == signal)
            .map(|l| l.options)
            .collect()
    }

    pub fn observer_count(&self) -> usize {
        self.state.borrow().observers.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.state.borrow().timers.len()
    }

    fn dispatch(&self, signal: &Signal) {
        let callbacks: Vec<Callback> = self
            .state
            .borrow()
            .listeners
            .iter()
            .filter(|l| &l.signal == signal)
            .map(|l| Callback::clone(&l.callback))
            .collect();
        for callback in callbacks {
            callback();
        }
    }

    fn reevaluate_intersections(&self) {
        let reports: Vec<(IntersectionCallback, IntersectionEntry)> = {
            let mut state = self.state.borrow_mut();
            let entries: Vec<IntersectionEntry> = state
                .observers
                .iter()
                .map(|o| state.intersection(o.target))
                .collect();
            state
                .observers
                .iter_mut()
                .zip(entries)
                .filter_map(|(observer, entry)| {
                    let met = entry.meets(observer.threshold);
                    if met == observer.last_met {
                        return None;
                    }
                    observer.last_met = met;
                    Some((IntersectionCallback::clone(&observer.callback), entry))
                })
                .collect()
        };
        for (callback, entry) in reports {
            callback(entry);
        }
    }
}

impl Default for HeadlessPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for HeadlessPlatform {
    fn inner_size(&self) -> (u32, u32) {
        let state = self.state.borrow();
        (state.width, state.height)
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.state.borrow().pixel_ratio
    }

    fn scroll_y(&self) -> f64 {
        self.state.borrow().scroll_y
    }

    fn document_height(&self) -> f64 {
        self.state.borrow().document_height
    }

    fn user_agent(&self) -> String {
        self.state.borrow().user_agent.clone()
    }

    fn max_touch_points(&self) -> u32 {
        self.state.borrow().touch_points
    }

    fn matches_media(&self, query: &str) -> bool {
        self.state
            .borrow()
            .media
            .get(query)
            .copied()
            .unwrap_or(false)
    }

    fn safe_area_env(&self, edge: SafeAreaEdge) -> Option<String> {
        self.state.borrow().safe_area.get(&edge).cloned()
    }

    fn now_ms(&self) -> f64 {
        self.state.borrow().now_ms
    }

    fn add_listener(
        &self,
        signal: Signal,
        options: ListenerOptions,
        callback: Callback,
    ) -> ListenerKey {
        let mut state = self.state.borrow_mut();
        let key = state.next_key();
        state.listeners.push(ListenerEntry {
            key,
            signal,
            options,
            callback,
        });
        key
    }

    fn remove_listener(&self, key: ListenerKey) {
        self.state.borrow_mut().listeners.retain(|l| l.key != key);
    }

    fn observe_intersection(
        &self,
        target: ElementId,
        threshold: f64,
        callback: IntersectionCallback,
    ) -> ListenerKey {
        let (key, entry) = {
            let mut state = self.state.borrow_mut();
            let key = state.next_key();
            let entry = state.intersection(target);
            state.observers.push(ObserverEntry {
                key,
                target,
                threshold,
                callback: IntersectionCallback::clone(&callback),
                last_met: entry.meets(threshold),
            });
            (key, entry)
        };
        callback(entry);
        key
    }

    fn disconnect_intersection(&self, key: ListenerKey) {
        self.state.borrow_mut().observers.retain(|o| o.key != key);
    }

    fn set_timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> ListenerKey {
        let mut state = self.state.borrow_mut();
        let key = state.next_key();
        let due_ms = state.now_ms + f64::from(delay_ms);
        state.timers.push(TimerEntry {
            key,
            due_ms,
            callback,
        });
        key
    }

    fn clear_timeout(&self, key: ListenerKey) {
        self.state.borrow_mut().timers.retain(|t| t.key != key);
    }

    fn write_clipboard(&self, text: &str, done: ClipboardCallback) {
        let result = {
            let mut state = self.state.borrow_mut();
            if state.clipboard_denied {
                Err(ClipboardError::Rejected("permission denied".into()))
            } else {
                state.clipboard = Some(text.to_string());
                Ok(())
            }
        };
        done(result);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn dispatch_reaches_matching_listeners_only() {
        let platform = HeadlessPlatform::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        platform.add_listener(
            Signal::Resize,
            ListenerOptions::default(),
            Rc::new(move || counter.set(counter.get() + 1)),
        );
        platform.resize(800, 600);
        platform.scroll_to(10.0);
        assert_eq!(hits.get(), 1);
        assert_eq!(platform.inner_size(), (800, 600));
    }

    #[test]
    fn scroll_is_clamped_to_document() {
        let platform = HeadlessPlatform::new()
            .with_size(1000, 800)
            .with_document_height(3000.0);
        platform.scroll_to(5000.0);
        assert_eq!(platform.scroll_y(), 2200.0);
        platform.scroll_to(-10.0);
        assert_eq!(platform.scroll_y(), 0.0);
    }

    #[test]
    fn media_change_fires_only_on_flip() {
        let platform = HeadlessPlatform::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let query = "(prefers-color-scheme: dark)";
        platform.add_listener(
            Signal::MediaChange(query.into()),
            ListenerOptions::default(),
            Rc::new(move || counter.set(counter.get() + 1)),
        );
        platform.set_media(query, false);
        platform.set_media(query, true);
        platform.set_media(query, true);
        platform.set_media("(prefers-reduced-motion: reduce)", true);
        assert_eq!(hits.get(), 1);
        assert!(platform.matches_media(query));
    }

    #[test]
    fn timers_run_in_deadline_order() {
        let platform = HeadlessPlatform::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for (delay, label) in [(30, "c"), (10, "a"), (20, "b")] {
            let order = Rc::clone(&order);
            platform.set_timeout(delay, Box::new(move || order.borrow_mut().push(label)));
        }
        let cancelled = platform.set_timeout(15, Box::new(|| unreachable!()));
        platform.clear_timeout(cancelled);
        platform.advance(25.0);
        assert_eq!(*order.borrow(), vec!["a", "b"]);
        assert_eq!(platform.now_ms(), 25.0);
        platform.advance(5.0);
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn observer_reports_initial_and_crossings() {
        let platform = HeadlessPlatform::new()
            .with_size(1000, 800)
            .with_document_height(4000.0);
        platform.place_element(ElementId(1), Rect::new(0.0, 1000.0, 100.0, 200.0));
        let reports = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&reports);
        platform.observe_intersection(
            ElementId(1),
            0.5,
            Rc::new(move |entry| sink.borrow_mut().push(entry.meets(0.5))),
        );
        // Element spans 1000..1200; viewport spans y..y+800.
        platform.scroll_to(250.0); // 1000..1050 visible: 25%
        platform.scroll_to(300.0); // 1000..1100 visible: 50%
        platform.scroll_to(350.0); // 75%, no crossing
        platform.scroll_to(0.0);
        assert_eq!(*reports.borrow(), vec![false, true, false]);
    }
}
