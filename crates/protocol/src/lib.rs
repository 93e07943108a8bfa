pub mod breakpoint;
pub mod state;
pub mod types;

pub use breakpoint::{Breakpoint, DeviceClass, Orientation, ParseBreakpointError};
pub use state::{
    AccessibilityState, ColorScheme, DeviceState, DeviceType, SafeAreaInsets, ScreenDensity,
    ScrollDirection, ScrollState, ViewportState,
};
pub use types::Rect;
