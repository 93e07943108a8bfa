use serde::{Deserialize, Serialize};

use crate::breakpoint::{Breakpoint, DeviceClass, Orientation};

/// Snapshot of the layout viewport, recomputed on every resize.
///
/// Exactly one of `is_mobile`, `is_tablet` and `is_desktop` is set; the
/// flags are always derived from `breakpoint` by [`ViewportState::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportState {
    pub width: u32,
    pub height: u32,
    pub breakpoint: Breakpoint,
    pub is_mobile: bool,
    pub is_tablet: bool,
    pub is_desktop: bool,
    pub orientation: Orientation,
    /// Device pixel ratio, never below 1.0.
    pub pixel_ratio: f64,
}

impl ViewportState {
    pub fn new(width: u32, height: u32, breakpoint: Breakpoint, pixel_ratio: f64) -> Self {
        let device = DeviceType::from(breakpoint.device_class());
        Self {
            width,
            height,
            breakpoint,
            is_mobile: device.is_mobile,
            is_tablet: device.is_tablet,
            is_desktop: device.is_desktop,
            orientation: Orientation::from_size(width, height),
            pixel_ratio: normalize_pixel_ratio(pixel_ratio),
        }
    }

    pub fn device_type(&self) -> DeviceType {
        DeviceType {
            is_mobile: self.is_mobile,
            is_tablet: self.is_tablet,
            is_desktop: self.is_desktop,
        }
    }

    pub fn device_class(&self) -> DeviceClass {
        self.breakpoint.device_class()
    }
}

/// Hosts report 0, NaN or sub-1 ratios on some headless/zoomed setups.
fn normalize_pixel_ratio(ratio: f64) -> f64 {
    if ratio.is_finite() && ratio >= 1.0 {
        ratio
    } else {
        1.0
    }
}

/// The mobile/tablet/desktop triple on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceType {
    pub is_mobile: bool,
    pub is_tablet: bool,
    pub is_desktop: bool,
}

impl From<DeviceClass> for DeviceType {
    fn from(class: DeviceClass) -> Self {
        Self {
            is_mobile: class == DeviceClass::Mobile,
            is_tablet: class == DeviceClass::Tablet,
            is_desktop: class == DeviceClass::Desktop,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenDensity {
    High,
    Normal,
}

impl ScreenDensity {
    pub fn from_pixel_ratio(ratio: f64) -> Self {
        if ratio > 1.0 { Self::High } else { Self::Normal }
    }
}

/// Browser and OS identity, computed once per engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    /// Browser family, or `"Unknown"`.
    pub browser: String,
    /// Major version digits, or empty when the UA carries none.
    pub browser_version: String,
    /// Operating system family, or `"Unknown"`.
    pub os: String,
    pub touch_points: u32,
    #[serde(rename = "isPWA")]
    pub is_pwa: bool,
    pub screen_density: ScreenDensity,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityState {
    pub prefers_high_contrast: bool,
    pub prefers_reduced_data: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    Dark,
    Light,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
    #[default]
    None,
}

impl ScrollDirection {
    pub fn from_delta(delta: f64) -> Self {
        if delta > 0.0 {
            Self::Down
        } else if delta < 0.0 {
            Self::Up
        } else {
            Self::None
        }
    }
}

/// One scroll sample with kinematics relative to the previous sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollState {
    pub y: f64,
    pub direction_y: ScrollDirection,
    /// Pixels per second, never negative.
    pub velocity: f64,
    pub is_near_top: bool,
    pub is_near_bottom: bool,
}

/// Platform safe-area padding in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SafeAreaInsets {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl SafeAreaInsets {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_device_flag_per_tier() {
        for bp in Breakpoint::ALL {
            let state = ViewportState::new(1000, 800, bp, 1.0);
            let set = [state.is_mobile, state.is_tablet, state.is_desktop]
                .iter()
                .filter(|flag| **flag)
                .count();
            assert_eq!(set, 1, "tier {bp} must set exactly one flag");
        }
    }

    #[test]
    fn pixel_ratio_is_clamped_to_one() {
        assert_eq!(ViewportState::new(10, 10, Breakpoint::Xs, 0.0).pixel_ratio, 1.0);
        assert_eq!(ViewportState::new(10, 10, Breakpoint::Xs, f64::NAN).pixel_ratio, 1.0);
        assert_eq!(ViewportState::new(10, 10, Breakpoint::Xs, 2.5).pixel_ratio, 2.5);
    }

    #[test]
    fn viewport_json_uses_camel_case() {
        let state = ViewportState::new(1536, 900, Breakpoint::Xxl, 2.0);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["breakpoint"], "2xl");
        assert_eq!(json["isDesktop"], true);
        assert_eq!(json["orientation"], "landscape");
        assert_eq!(json["pixelRatio"], 2.0);
    }

    #[test]
    fn device_json_keeps_pwa_spelling() {
        let device = DeviceState {
            browser: "Firefox".into(),
            browser_version: "128".into(),
            os: "Linux".into(),
            touch_points: 0,
            is_pwa: true,
            screen_density: ScreenDensity::Normal,
        };
        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json["isPWA"], true);
        assert_eq!(json["browserVersion"], "128");
        assert_eq!(json["screenDensity"], "normal");
    }

    #[test]
    fn direction_follows_delta_sign() {
        assert_eq!(ScrollDirection::from_delta(4.0), ScrollDirection::Down);
        assert_eq!(ScrollDirection::from_delta(-0.5), ScrollDirection::Up);
        assert_eq!(ScrollDirection::from_delta(0.0), ScrollDirection::None);
    }
}
