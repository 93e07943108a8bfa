use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Shared on/off switch checked before every delivery.
///
/// Hosts may snapshot their listener list before dispatching, so a
/// subscriber torn down by an earlier listener in the same dispatch can
/// still be reached. Gating on this flag turns that call into a no-op.
#[derive(Debug, Clone)]
pub(crate) struct Liveness(Rc<Cell<bool>>);

impl Liveness {
    pub(crate) fn new() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    pub(crate) fn is_live(&self) -> bool {
        self.0.get()
    }

    fn kill(&self) {
        self.0.set(false);
    }
}

/// Handle for one live projection.
///
/// Dropping the handle or calling [`Subscription::unsubscribe`] removes
/// every host listener/observer/timer the projection registered; no
/// callback is delivered afterwards.
#[must_use = "dropping a Subscription immediately tears it down"]
pub struct Subscription {
    live: Liveness,
    teardown: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub(crate) fn new(live: Liveness, teardown: impl FnOnce() + 'static) -> Self {
        Self {
            live,
            teardown: Some(Box::new(teardown)),
        }
    }

    /// Combine several subscriptions into one handle that tears them all
    /// down together.
    pub fn merge(subscriptions: impl IntoIterator<Item = Subscription>) -> Self {
        let parts: Vec<Subscription> = subscriptions.into_iter().collect();
        let live = Liveness::new();
        Self::new(live, move || drop(parts))
    }

    /// Tear down now.
    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    pub fn is_active(&self) -> bool {
        self.live.is_live()
    }

    fn cancel(&mut self) {
        self.live.kill();
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teardown_runs_once() {
        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        let sub = Subscription::new(Liveness::new(), move || counter.set(counter.get() + 1));
        assert!(sub.is_active());
        sub.unsubscribe();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn drop_tears_down() {
        let live = Liveness::new();
        let observed = live.clone();
        {
            let _sub = Subscription::new(live, || {});
        }
        assert!(!observed.is_live());
    }

    #[test]
    fn merged_subscriptions_release_together() {
        let a = Liveness::new();
        let b = Liveness::new();
        let (a_seen, b_seen) = (a.clone(), b.clone());
        let merged = Subscription::merge([Subscription::new(a, || {}), Subscription::new(b, || {})]);
        assert!(a_seen.is_live() && b_seen.is_live());
        merged.unsubscribe();
        assert!(!a_seen.is_live());
        assert!(!b_seen.is_live());
    }
}
