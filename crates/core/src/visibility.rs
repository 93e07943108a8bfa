use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::platform::ElementId;

type TargetWatcher = Rc<dyn Fn(Option<ElementId>)>;

#[derive(Default)]
struct ElementRefInner {
    target: Option<ElementId>,
    watchers: Vec<(u64, TargetWatcher)>,
    next_watcher: u64,
}

/// Late-bound handle to an element, like a UI framework's node ref.
///
/// May be empty when a visibility subscription is created; setting it later
/// (or pointing it at another element) re-attaches every subscription that
/// watches this ref.
#[derive(Clone, Default)]
pub struct ElementRef {
    inner: Rc<RefCell<ElementRefInner>>,
}

impl ElementRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(target: ElementId) -> Self {
        let element = Self::new();
        element.inner.borrow_mut().target = Some(target);
        element
    }

    pub fn get(&self) -> Option<ElementId> {
        self.inner.borrow().target
    }

    /// Point the ref at `target` and notify watchers if it changed.
    pub fn set(&self, target: Option<ElementId>) {
        let watchers: Vec<TargetWatcher> = {
            let mut inner = self.inner.borrow_mut();
            if inner.target == target {
                return;
            }
            inner.target = target;
            inner.watchers.iter().map(|(_, w)| Rc::clone(w)).collect()
        };
        for watcher in watchers {
            watcher(target);
        }
    }

    pub fn clear(&self) {
        self.set(None);
    }

    pub(crate) fn watch(&self, watcher: impl Fn(Option<ElementId>) + 'static) -> u64 {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_watcher;
        inner.next_watcher += 1;
        inner.watchers.push((id, Rc::new(watcher)));
        id
    }

    pub(crate) fn unwatch(&self, id: u64) {
        self.inner.borrow_mut().watchers.retain(|(w, _)| *w != id);
    }
}

impl fmt::Debug for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ElementRef")
            .field("target", &inner.target)
            .field("watchers", &inner.watchers.len())
            .finish()
    }
}

/// Per-call visibility options.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VisibilityOptions {
    /// Fraction of the element that must be on screen, `0.0..=1.0`. `None`
    /// uses the engine's configured default.
    pub threshold: Option<f64>,
}

impl VisibilityOptions {
    pub fn threshold(threshold: f64) -> Self {
        Self {
            threshold: Some(threshold),
        }
    }

    /// Effective threshold: out-of-range values are clamped, NaN falls back
    /// to `default`.
    pub(crate) fn resolve(&self, default: f64) -> f64 {
        match self.threshold {
            Some(t) if t.is_nan() => {
                tracing::warn!("NaN visibility threshold, using {default}");
                default
            }
            Some(t) if !(0.0..=1.0).contains(&t) => {
                tracing::warn!(threshold = t, "visibility threshold clamped to [0, 1]");
                t.clamp(0.0, 1.0)
            }
            Some(t) => t,
            None => default,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn set_notifies_only_on_change() {
        let element = ElementRef::new();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        element.watch(move |_| counter.set(counter.get() + 1));

        element.set(Some(ElementId(1)));
        element.set(Some(ElementId(1)));
        element.set(Some(ElementId(2)));
        element.clear();
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn unwatch_stops_notifications() {
        let element = ElementRef::new();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let id = element.watch(move |_| counter.set(counter.get() + 1));
        element.unwatch(id);
        element.set(Some(ElementId(7)));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn threshold_resolution() {
        assert_eq!(VisibilityOptions::default().resolve(0.5), 0.5);
        assert_eq!(VisibilityOptions::threshold(0.25).resolve(0.5), 0.25);
        assert_eq!(VisibilityOptions::threshold(4.0).resolve(0.5), 1.0);
        assert_eq!(VisibilityOptions::threshold(f64::NAN).resolve(0.5), 0.5);
    }
}
