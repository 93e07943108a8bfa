use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use gloo::events::{EventListener, EventListenerOptions, EventListenerPhase};
use gloo::timers::callback::Timeout;
use js_sys::{Array, Function, Promise, Reflect};
use viewport_sense_core::platform::{
    Callback, ClipboardCallback, IntersectionCallback, SafeAreaEdge,
};
use viewport_sense_core::{
    ClipboardError, ElementId, IntersectionEntry, ListenerKey, ListenerOptions, Platform, Signal,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Document, Element, EventTarget, IntersectionObserver, IntersectionObserverEntry,
    IntersectionObserverInit, MediaQueryList, Performance, Window,
};

/// Off-screen element whose padding resolves the `env(safe-area-inset-*)`
/// variables, so `getComputedStyle` can read them back as `NNpx`.
const SAFE_AREA_PROBE_STYLE: &str = "position:fixed;top:0;left:0;visibility:hidden;\
    pointer-events:none;padding:env(safe-area-inset-top) env(safe-area-inset-right) \
    env(safe-area-inset-bottom) env(safe-area-inset-left);";

struct Observer {
    observer: IntersectionObserver,
    _callback: Closure<dyn FnMut(Array)>,
}

#[derive(Default)]
struct BrowserState {
    next_key: u64,
    listeners: HashMap<ListenerKey, EventListener>,
    observers: HashMap<ListenerKey, Observer>,
    timers: HashMap<ListenerKey, Timeout>,
    /// Timers whose callback already ran; dropped on the next timer call
    /// rather than from inside their own callback.
    fired: Vec<ListenerKey>,
    elements: HashMap<ElementId, Element>,
    next_element: u64,
    safe_area_probe: Option<Element>,
}

impl BrowserState {
    fn next_key(&mut self) -> ListenerKey {
        self.next_key += 1;
        ListenerKey(self.next_key)
    }

    fn prune_fired(&mut self) {
        for key in std::mem::take(&mut self.fired) {
            self.timers.remove(&key);
        }
    }
}

/// [`Platform`] backed by the page's `window`.
///
/// Listeners are gloo [`EventListener`]s, removed by dropping them. Elements
/// must be registered before they can be observed for visibility.
pub struct BrowserPlatform {
    window: Window,
    state: Rc<RefCell<BrowserState>>,
}

impl BrowserPlatform {
    pub fn new() -> Result<Self, JsError> {
        let window = web_sys::window().ok_or_else(|| JsError::new("no global window"))?;
        Ok(Self {
            window,
            state: Rc::new(RefCell::new(BrowserState::default())),
        })
    }

    pub fn register_element(&self, element: Element) -> ElementId {
        let mut state = self.state.borrow_mut();
        state.next_element += 1;
        let id = ElementId(state.next_element);
        state.elements.insert(id, element);
        id
    }

    pub fn unregister_element(&self, id: ElementId) {
        self.state.borrow_mut().elements.remove(&id);
    }

    fn event_target(&self, signal: &Signal) -> Option<(EventTarget, &'static str)> {
        match signal {
            Signal::Resize => Some((self.window.clone().into(), "resize")),
            Signal::Scroll => Some((self.window.clone().into(), "scroll")),
            Signal::MediaChange(query) => self
                .window
                .match_media(query)
                .ok()
                .flatten()
                .map(|list| (list.into(), "change")),
        }
    }

    fn safe_area_probe(&self) -> Option<Element> {
        if let Some(probe) = self.state.borrow().safe_area_probe.clone() {
            return Some(probe);
        }
        let document = self.window.document()?;
        let probe = document.create_element("div").ok()?;
        probe.set_attribute("style", SAFE_AREA_PROBE_STYLE).ok()?;
        probe.set_attribute("aria-hidden", "true").ok()?;
        document.body()?.append_child(&probe).ok()?;
        self.state.borrow_mut().safe_area_probe = Some(probe.clone());
        Some(probe)
    }
}

impl Drop for BrowserPlatform {
    fn drop(&mut self) {
        if let Some(probe) = self.state.borrow_mut().safe_area_probe.take() {
            probe.remove();
        }
    }
}

impl Platform for BrowserPlatform {
    fn inner_size(&self) -> (u32, u32) {
        (
            css_pixels(self.window.inner_width()),
            css_pixels(self.window.inner_height()),
        )
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.window.device_pixel_ratio()
    }

    fn scroll_y(&self) -> f64 {
        self.window.scroll_y().unwrap_or(0.0)
    }

    fn document_height(&self) -> f64 {
        self.window
            .document()
            .as_ref()
            .and_then(Document::document_element)
            .map_or(0.0, |root| f64::from(root.scroll_height()))
    }

    fn user_agent(&self) -> String {
        self.window.navigator().user_agent().unwrap_or_default()
    }

    fn max_touch_points(&self) -> u32 {
        u32::try_from(self.window.navigator().max_touch_points()).unwrap_or(0)
    }

    fn matches_media(&self, query: &str) -> bool {
        self.window
            .match_media(query)
            .ok()
            .flatten()
            .as_ref()
            .is_some_and(MediaQueryList::matches)
    }

    fn safe_area_env(&self, edge: SafeAreaEdge) -> Option<String> {
        let probe = self.safe_area_probe()?;
        let style = self.window.get_computed_style(&probe).ok()??;
        let value = style.get_property_value(padding_property(edge)).ok()?;
        (!value.is_empty()).then_some(value)
    }

    fn now_ms(&self) -> f64 {
        self.window
            .performance()
            .as_ref()
            .map_or_else(js_sys::Date::now, Performance::now)
    }

    fn add_listener(
        &self,
        signal: Signal,
        options: ListenerOptions,
        callback: Callback,
    ) -> ListenerKey {
        let key = self.state.borrow_mut().next_key();
        let Some((target, event)) = self.event_target(&signal) else {
            gloo::console::warn!("viewport-sense: no event target for", format!("{signal:?}"));
            return key;
        };
        let listener = EventListener::new_with_options(
            &target,
            event,
            EventListenerOptions {
                phase: EventListenerPhase::Bubble,
                passive: options.passive,
            },
            move |_event| callback(),
        );
        self.state.borrow_mut().listeners.insert(key, listener);
        key
    }

    fn remove_listener(&self, key: ListenerKey) {
        let listener = self.state.borrow_mut().listeners.remove(&key);
        drop(listener);
    }

    fn observe_intersection(
        &self,
        target: ElementId,
        threshold: f64,
        callback: IntersectionCallback,
    ) -> ListenerKey {
        let (key, element) = {
            let mut state = self.state.borrow_mut();
            (state.next_key(), state.elements.get(&target).cloned())
        };
        let Some(element) = element else {
            gloo::console::warn!("viewport-sense: unregistered element", target.0 as f64);
            return key;
        };

        let closure = Closure::<dyn FnMut(Array)>::new(move |entries: Array| {
            for entry in entries.iter() {
                let Ok(entry) = entry.dyn_into::<IntersectionObserverEntry>() else {
                    continue;
                };
                callback(IntersectionEntry {
                    ratio: entry.intersection_ratio(),
                    is_intersecting: entry.is_intersecting(),
                });
            }
        });
        let init = IntersectionObserverInit::new();
        init.set_threshold(&JsValue::from_f64(threshold));
        let observer =
            match IntersectionObserver::new_with_options(closure.as_ref().unchecked_ref(), &init) {
                Ok(observer) => observer,
                Err(err) => {
                    gloo::console::warn!("viewport-sense: IntersectionObserver failed", err);
                    return key;
                }
            };
        observer.observe(&element);
        self.state.borrow_mut().observers.insert(
            key,
            Observer {
                observer,
                _callback: closure,
            },
        );
        key
    }

    fn disconnect_intersection(&self, key: ListenerKey) {
        let observer = self.state.borrow_mut().observers.remove(&key);
        if let Some(observer) = observer {
            observer.observer.disconnect();
        }
    }

    fn set_timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> ListenerKey {
        let key = {
            let mut state = self.state.borrow_mut();
            state.prune_fired();
            state.next_key()
        };
        let weak: Weak<RefCell<BrowserState>> = Rc::downgrade(&self.state);
        let timeout = Timeout::new(delay_ms, move || {
            callback();
            if let Some(state) = weak.upgrade() {
                state.borrow_mut().fired.push(key);
            }
        });
        self.state.borrow_mut().timers.insert(key, timeout);
        key
    }

    fn clear_timeout(&self, key: ListenerKey) {
        let timeout = {
            let mut state = self.state.borrow_mut();
            state.prune_fired();
            state.timers.remove(&key)
        };
        drop(timeout);
    }

    fn write_clipboard(&self, text: &str, done: ClipboardCallback) {
        let navigator = self.window.navigator();
        let clipboard = Reflect::get(&navigator, &"clipboard".into())
            .ok()
            .filter(|value| !value.is_undefined() && !value.is_null());
        let write_text = clipboard.as_ref().and_then(|clipboard| {
            Reflect::get(clipboard, &"writeText".into())
                .ok()
                .and_then(|value| value.dyn_into::<Function>().ok())
        });
        let (Some(clipboard), Some(write_text)) = (clipboard, write_text) else {
            done(Err(ClipboardError::Unavailable));
            return;
        };

        let promise = match write_text.call1(&clipboard, &JsValue::from_str(text)) {
            Ok(value) => value.dyn_into::<Promise>(),
            Err(err) => {
                done(Err(ClipboardError::Rejected(describe_js_error(&err))));
                return;
            }
        };
        let Ok(promise) = promise else {
            done(Err(ClipboardError::Unavailable));
            return;
        };
        wasm_bindgen_futures::spawn_local(async move {
            let result = JsFuture::from(promise)
                .await
                .map(|_| ())
                .map_err(|err| ClipboardError::Rejected(describe_js_error(&err)));
            done(result);
        });
    }
}

fn css_pixels(value: Result<JsValue, JsValue>) -> u32 {
    value
        .ok()
        .as_ref()
        .and_then(JsValue::as_f64)
        .filter(|px| px.is_finite() && *px > 0.0)
        .map_or(0, |px| px.min(f64::from(u32::MAX)) as u32)
}

fn padding_property(edge: SafeAreaEdge) -> &'static str {
    match edge {
        SafeAreaEdge::Top => "padding-top",
        SafeAreaEdge::Bottom => "padding-bottom",
        SafeAreaEdge::Left => "padding-left",
        SafeAreaEdge::Right => "padding-right",
    }
}

pub(crate) fn describe_js_error(err: &JsValue) -> String {
    if let Some(message) = err.as_string() {
        return message;
    }
    Reflect::get(err, &"message".into())
        .ok()
        .as_ref()
        .and_then(JsValue::as_string)
        .unwrap_or_else(|| "unknown error".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_edge_maps_to_its_padding() {
        let properties: Vec<_> = SafeAreaEdge::ALL.into_iter().map(padding_property).collect();
        assert_eq!(
            properties,
            ["padding-top", "padding-bottom", "padding-left", "padding-right"]
        );
    }
}
