mod platform;

use std::rc::Rc;

use js_sys::Function;
use serde::Serialize;
use viewport_sense_core::protocol::Breakpoint;
use viewport_sense_core::{
    BreakpointValues, CopyFeedback, ElementRef, EngineConfig, Subscription,
    ViewportEngine, VisibilityOptions,
};
use wasm_bindgen::prelude::*;
use web_sys::Element;

pub use platform::BrowserPlatform;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&e.to_string()))
}

/// Call a JS callback, reporting (not propagating) a thrown exception.
fn invoke(callback: &Function, value: &JsValue) {
    if let Err(err) = callback.call1(&JsValue::NULL, value) {
        gloo::console::error!("viewport-sense: callback threw", err);
    }
}

fn invoke_json<T: Serialize>(callback: &Function, value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => invoke(callback, &JsValue::from_str(&json)),
        Err(err) => gloo::console::error!("viewport-sense: serialize failed", err.to_string()),
    }
}

/// Viewport, device and preference state for the current page.
///
/// Snapshots are returned as JSON strings. Every `observe*` method calls
/// `callback` immediately when there is a current value, then on each
/// change, until the returned handle is unsubscribed or freed.
#[wasm_bindgen]
pub struct ViewportSense {
    engine: ViewportEngine<BrowserPlatform>,
}

#[wasm_bindgen]
impl ViewportSense {
    /// `config_json` is an optional `EngineConfig` JSON object.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<ViewportSense, JsError> {
        let config = match config_json {
            Some(json) => EngineConfig::from_json(json.as_bytes())
                .map_err(|e| JsError::new(&e.to_string()))?,
            None => EngineConfig::default(),
        };
        let platform = Rc::new(BrowserPlatform::new()?);
        let engine = ViewportEngine::with_config(platform, config)
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(Self { engine })
    }

    pub fn viewport(&self) -> Result<String, JsError> {
        to_json(&self.engine.viewport())
    }

    pub fn breakpoint(&self) -> String {
        self.engine.breakpoint().to_string()
    }

    pub fn device(&self) -> Result<String, JsError> {
        to_json(self.engine.device())
    }

    pub fn accessibility(&self) -> Result<String, JsError> {
        to_json(&self.engine.accessibility())
    }

    pub fn scroll(&self) -> Result<String, JsError> {
        to_json(&self.engine.scroll())
    }

    #[wasm_bindgen(js_name = safeArea)]
    pub fn safe_area(&self) -> Result<String, JsError> {
        to_json(&self.engine.safe_area())
    }

    /// `"dark"` or `"light"`.
    #[wasm_bindgen(js_name = colorScheme)]
    pub fn color_scheme(&self) -> Result<String, JsError> {
        to_json(&self.engine.color_scheme())
    }

    #[wasm_bindgen(js_name = prefersReducedMotion)]
    pub fn prefers_reduced_motion(&self) -> bool {
        self.engine.prefers_reduced_motion()
    }

    /// Resolve a `{"sm": ..., "lg": ...}` mapping against the current
    /// breakpoint. Returns the chosen value as JSON, or `undefined` for an
    /// empty mapping.
    #[wasm_bindgen(js_name = resolveBreakpointValue)]
    pub fn resolve_breakpoint_value(&self, values_json: &str) -> Result<Option<String>, JsError> {
        let values = parse_breakpoint_values(values_json)?;
        self.engine
            .resolve_breakpoint_value(&values)
            .map(to_json)
            .transpose()
    }

    /// `callback(json)` with the full viewport state.
    #[wasm_bindgen(js_name = observeViewport)]
    pub fn observe_viewport(&self, callback: Function) -> SubscriptionHandle {
        self.engine
            .observe_viewport(move |state| invoke_json(&callback, state))
            .into()
    }

    /// `callback(tier)` with `"xs"`..`"2xl"`, only when the tier changes.
    #[wasm_bindgen(js_name = observeBreakpoint)]
    pub fn observe_breakpoint(&self, callback: Function) -> SubscriptionHandle {
        self.engine
            .observe_breakpoint(move |tier| invoke(&callback, &JsValue::from_str(tier.as_str())))
            .into()
    }

    #[wasm_bindgen(js_name = observeOrientation)]
    pub fn observe_orientation(&self, callback: Function) -> SubscriptionHandle {
        self.engine
            .observe_orientation(move |orientation| invoke_json(&callback, &orientation))
            .into()
    }

    #[wasm_bindgen(js_name = observeDeviceType)]
    pub fn observe_device_type(&self, callback: Function) -> SubscriptionHandle {
        self.engine
            .observe_device_type(move |device| invoke_json(&callback, &device))
            .into()
    }

    #[wasm_bindgen(js_name = observeSafeArea)]
    pub fn observe_safe_area(&self, callback: Function) -> SubscriptionHandle {
        self.engine
            .observe_safe_area(move |insets| invoke_json(&callback, insets))
            .into()
    }

    #[wasm_bindgen(js_name = observeAccessibility)]
    pub fn observe_accessibility(&self, callback: Function) -> SubscriptionHandle {
        self.engine
            .observe_accessibility(move |state| invoke_json(&callback, state))
            .into()
    }

    /// `callback(matches)` for an arbitrary media query.
    #[wasm_bindgen(js_name = observeMediaQuery)]
    pub fn observe_media_query(&self, query: &str, callback: Function) -> SubscriptionHandle {
        self.engine
            .observe_media_query(query, move |matches| {
                invoke(&callback, &JsValue::from_bool(matches));
            })
            .into()
    }

    #[wasm_bindgen(js_name = observeColorScheme)]
    pub fn observe_color_scheme(&self, callback: Function) -> SubscriptionHandle {
        self.engine
            .observe_color_scheme(move |scheme| invoke_json(&callback, &scheme))
            .into()
    }

    #[wasm_bindgen(js_name = observeReducedMotion)]
    pub fn observe_reduced_motion(&self, callback: Function) -> SubscriptionHandle {
        self.engine
            .observe_reduced_motion(move |reduce| invoke(&callback, &JsValue::from_bool(reduce)))
            .into()
    }

    #[wasm_bindgen(js_name = observeScroll)]
    pub fn observe_scroll(&self, callback: Function) -> SubscriptionHandle {
        self.engine
            .observe_scroll(move |state| invoke_json(&callback, state))
            .into()
    }

    /// `callback(visible)` for the element held by `slot`. `threshold`
    /// defaults to the configured visibility threshold.
    #[wasm_bindgen(js_name = observeVisibility)]
    pub fn observe_visibility(
        &self,
        slot: &ElementSlot,
        threshold: Option<f64>,
        callback: Function,
    ) -> SubscriptionHandle {
        let options = VisibilityOptions { threshold };
        self.engine
            .observe_visibility(&slot.element, options, move |visible| {
                invoke(&callback, &JsValue::from_bool(visible));
            })
            .into()
    }

    /// A late-bound element slot for [`ViewportSense::observe_visibility`].
    #[wasm_bindgen(js_name = createElementSlot)]
    pub fn create_element_slot(&self) -> ElementSlot {
        ElementSlot {
            platform: Rc::clone(self.engine.platform()),
            element: ElementRef::new(),
        }
    }

    #[wasm_bindgen(js_name = copyButton)]
    pub fn copy_button(&self) -> CopyButton {
        CopyButton {
            feedback: self.engine.copy_feedback(),
        }
    }
}

/// Parse `{"sm": value, ...}` preserving key order, which decides the
/// fallback for widths below every listed tier.
fn parse_breakpoint_values(json: &str) -> Result<BreakpointValues<serde_json::Value>, JsError> {
    let map: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(json).map_err(|e| JsError::new(&e.to_string()))?;
    map.into_iter()
        .map(|(tier, value)| {
            let tier = tier
                .parse::<Breakpoint>()
                .map_err(|e| JsError::new(&e.to_string()))?;
            Ok((tier, value))
        })
        .collect()
}

#[wasm_bindgen]
pub struct SubscriptionHandle {
    inner: Option<Subscription>,
}

#[wasm_bindgen]
impl SubscriptionHandle {
    pub fn unsubscribe(&mut self) {
        if let Some(subscription) = self.inner.take() {
            subscription.unsubscribe();
        }
    }

    #[wasm_bindgen(getter)]
    pub fn active(&self) -> bool {
        self.inner.as_ref().is_some_and(Subscription::is_active)
    }
}

impl From<Subscription> for SubscriptionHandle {
    fn from(subscription: Subscription) -> Self {
        Self {
            inner: Some(subscription),
        }
    }
}

/// Holds at most one DOM element; visibility subscriptions follow it.
#[wasm_bindgen]
pub struct ElementSlot {
    platform: Rc<BrowserPlatform>,
    element: ElementRef,
}

#[wasm_bindgen]
impl ElementSlot {
    /// Point the slot at `element`, or empty it with `null`.
    pub fn set(&self, element: Option<Element>) {
        let previous = self.element.get();
        let next = element.map(|element| self.platform.register_element(element));
        self.element.set(next);
        if let Some(previous) = previous {
            self.platform.unregister_element(previous);
        }
    }

    #[wasm_bindgen(getter, js_name = isEmpty)]
    pub fn is_empty(&self) -> bool {
        self.element.get().is_none()
    }
}

impl Drop for ElementSlot {
    fn drop(&mut self) {
        if let Some(id) = self.element.get() {
            self.platform.unregister_element(id);
        }
    }
}

/// "Copy" / "Copied!" feedback for a copy button.
#[wasm_bindgen]
pub struct CopyButton {
    feedback: CopyFeedback<BrowserPlatform>,
}

#[wasm_bindgen]
impl CopyButton {
    /// Write `text` to the clipboard; `done(success)` runs once the write
    /// settles.
    pub fn copy(&self, text: &str, done: Option<Function>) {
        self.feedback.copy(text, move |success| {
            if let Some(done) = done {
                invoke(&done, &JsValue::from_bool(success));
            }
        });
    }

    pub fn label(&self, text: &str) -> String {
        self.feedback.label(text).to_string()
    }

    #[wasm_bindgen(js_name = isCopied)]
    pub fn is_copied(&self, text: &str) -> bool {
        self.feedback.is_copied(text)
    }

    /// `callback(text)` on copy, `callback(null)` when the label reverts.
    #[wasm_bindgen(js_name = onChange)]
    pub fn on_change(&self, callback: Function) {
        self.feedback.set_on_change(move |text| {
            invoke(&callback, &text.map_or(JsValue::NULL, JsValue::from_str));
        });
    }
}
