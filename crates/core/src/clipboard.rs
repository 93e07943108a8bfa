use std::cell::RefCell;
use std::rc::{Rc, Weak};

use thiserror::Error;

use crate::platform::{ListenerKey, Platform};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClipboardError {
    #[error("clipboard API unavailable")]
    Unavailable,
    #[error("clipboard write rejected: {0}")]
    Rejected(String),
}

pub const COPY_LABEL: &str = "Copy";
pub const COPIED_LABEL: &str = "Copied!";

type ChangeListener = Rc<dyn Fn(Option<&str>)>;

#[derive(Default)]
struct CopyState {
    copied: Option<String>,
    reset_timer: Option<ListenerKey>,
    generation: u64,
    on_change: Option<ChangeListener>,
}

/// Transient "Copied!" feedback for copy buttons.
///
/// A successful write shows the copied text for `reset_ms`, then reverts.
/// A failed write leaves the state untouched and reports `false`; the
/// failure never propagates as a panic or error to the caller.
pub struct CopyFeedback<P: Platform + 'static> {
    platform: Rc<P>,
    state: Rc<RefCell<CopyState>>,
    reset_ms: u32,
}

impl<P: Platform + 'static> CopyFeedback<P> {
    pub fn new(platform: Rc<P>, reset_ms: u32) -> Self {
        Self {
            platform,
            state: Rc::new(RefCell::new(CopyState::default())),
            reset_ms,
        }
    }

    /// Called with the copied text on success and with `None` on revert.
    pub fn set_on_change(&self, listener: impl Fn(Option<&str>) + 'static) {
        self.state.borrow_mut().on_change = Some(Rc::new(listener));
    }

    /// Write `text` to the clipboard; `done` receives whether it succeeded.
    pub fn copy(&self, text: &str, done: impl FnOnce(bool) + 'static) {
        let platform = Rc::downgrade(&self.platform);
        let state = Rc::downgrade(&self.state);
        let reset_ms = self.reset_ms;
        let text_owned = text.to_string();
        self.platform.write_clipboard(
            text,
            Box::new(move |result| match result {
                Ok(()) => {
                    tracing::debug!(len = text_owned.len(), "copied to clipboard");
                    mark_copied(&platform, &state, text_owned, reset_ms);
                    done(true);
                }
                Err(err) => {
                    tracing::warn!(%err, "failed to copy");
                    done(false);
                }
            }),
        );
    }

    pub fn copied_text(&self) -> Option<String> {
        self.state.borrow().copied.clone()
    }

    pub fn is_copied(&self, text: &str) -> bool {
        self.state.borrow().copied.as_deref() == Some(text)
    }

    /// Button label for a copy button bound to `text`.
    pub fn label(&self, text: &str) -> &'static str {
        if self.is_copied(text) {
            COPIED_LABEL
        } else {
            COPY_LABEL
        }
    }
}

impl<P: Platform + 'static> Drop for CopyFeedback<P> {
    fn drop(&mut self) {
        if let Some(timer) = self.state.borrow_mut().reset_timer.take() {
            self.platform.clear_timeout(timer);
        }
    }
}

fn mark_copied<P: Platform + 'static>(
    platform: &Weak<P>,
    state: &Weak<RefCell<CopyState>>,
    text: String,
    reset_ms: u32,
) {
    let (Some(platform), Some(state_rc)) = (platform.upgrade(), state.upgrade()) else {
        return;
    };

    let (previous_timer, generation) = {
        let mut state = state_rc.borrow_mut();
        state.generation += 1;
        state.copied = Some(text.clone());
        (state.reset_timer.take(), state.generation)
    };
    if let Some(timer) = previous_timer {
        platform.clear_timeout(timer);
    }

    let weak = Rc::downgrade(&state_rc);
    let timer = platform.set_timeout(
        reset_ms,
        Box::new(move || {
            let Some(state) = weak.upgrade() else {
                return;
            };
            let listener = {
                let mut state = state.borrow_mut();
                if state.generation != generation {
                    return;
                }
                state.copied = None;
                state.reset_timer = None;
                state.on_change.clone()
            };
            if let Some(listener) = listener {
                listener(None);
            }
        }),
    );

    let listener = {
        let mut state = state_rc.borrow_mut();
        if state.generation == generation {
            state.reset_timer = Some(timer);
        }
        state.on_change.clone()
    };
    if let Some(listener) = listener {
        listener(Some(&text));
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::platform::headless::HeadlessPlatform;

    #[test]
    fn success_reverts_after_interval() {
        let platform = Rc::new(HeadlessPlatform::new());
        let feedback = CopyFeedback::new(Rc::clone(&platform), 2000);
        let ok = Rc::new(Cell::new(None));
        let seen = Rc::clone(&ok);
        feedback.copy("npm i viewport-sense", move |success| seen.set(Some(success)));

        assert_eq!(ok.get(), Some(true));
        assert_eq!(platform.clipboard().as_deref(), Some("npm i viewport-sense"));
        assert_eq!(feedback.label("npm i viewport-sense"), COPIED_LABEL);
        assert_eq!(feedback.label("something else"), COPY_LABEL);

        platform.advance(1999.0);
        assert!(feedback.is_copied("npm i viewport-sense"));
        platform.advance(1.0);
        assert_eq!(feedback.copied_text(), None);
    }

    #[test]
    fn denied_write_keeps_label() {
        let platform = Rc::new(HeadlessPlatform::new());
        platform.set_clipboard_denied(true);
        let feedback = CopyFeedback::new(Rc::clone(&platform), 2000);
        let ok = Rc::new(Cell::new(None));
        let seen = Rc::clone(&ok);
        feedback.copy("x", move |success| seen.set(Some(success)));

        assert_eq!(ok.get(), Some(false));
        assert_eq!(feedback.label("x"), COPY_LABEL);
        assert_eq!(platform.clipboard(), None);
    }

    #[test]
    fn second_copy_restarts_interval() {
        let platform = Rc::new(HeadlessPlatform::new());
        let feedback = CopyFeedback::new(Rc::clone(&platform), 1000);
        feedback.copy("a", |_| {});
        platform.advance(800.0);
        feedback.copy("b", |_| {});
        platform.advance(800.0);
        assert!(feedback.is_copied("b"));
        platform.advance(200.0);
        assert_eq!(feedback.copied_text(), None);
    }

    #[test]
    fn change_listener_sees_copy_and_revert() {
        let platform = Rc::new(HeadlessPlatform::new());
        let feedback = CopyFeedback::new(Rc::clone(&platform), 500);
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        feedback.set_on_change(move |text| sink.borrow_mut().push(text.map(str::to_string)));
        feedback.copy("hi", |_| {});
        platform.advance(500.0);
        assert_eq!(*log.borrow(), vec![Some("hi".to_string()), None]);
    }
}
