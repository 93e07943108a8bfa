//! Viewport state engine.
//!
//! ```text
//!   Platform (resize, scroll, media, intersection, timers)
//!        │
//!        ▼
//!   ViewportEngine ──observe_*──▶ Subscription + callback(snapshot)
//! ```
//!
//! The engine never owns a global listener registry: every `observe_*` call
//! returns a [`Subscription`] that owns its own teardown.

pub mod breakpoints;
pub mod clipboard;
pub mod config;
pub mod engine;
pub mod platform;
pub mod safe_area;
pub mod scroll;
pub mod subscription;
pub mod user_agent;
pub mod visibility;

pub use breakpoints::{BreakpointValues, Breakpoints};
pub use clipboard::{ClipboardError, CopyFeedback};
pub use config::{ConfigError, EngineConfig};
pub use engine::ViewportEngine;
pub use platform::headless::HeadlessPlatform;
pub use platform::{ElementId, IntersectionEntry, ListenerKey, ListenerOptions, Platform, Signal};
pub use subscription::Subscription;
pub use visibility::{ElementRef, VisibilityOptions};

pub use viewport_sense_protocol as protocol;
