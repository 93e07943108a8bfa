use viewport_sense_protocol::SafeAreaInsets;

use crate::platform::{Platform, SafeAreaEdge};

/// Read all four insets from the host. Missing or unparseable values are 0.
pub fn read_safe_area<P: Platform + ?Sized>(platform: &P) -> SafeAreaInsets {
    let inset = |edge| {
        platform
            .safe_area_env(edge)
            .as_deref()
            .map_or(0, parse_inset)
    };
    SafeAreaInsets {
        top: inset(SafeAreaEdge::Top),
        bottom: inset(SafeAreaEdge::Bottom),
        left: inset(SafeAreaEdge::Left),
        right: inset(SafeAreaEdge::Right),
    }
}

/// Leading integer of a computed CSS length (`"44px"` → 44, `"12.7px"` → 12).
///
/// Empty, non-numeric and negative values resolve to 0.
pub fn parse_inset(value: &str) -> u32 {
    let value = value.trim();
    let (negative, digits) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if negative || end == 0 {
        return 0;
    }
    digits[..end].parse().unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_leading_integer() {
        assert_eq!(parse_inset("44px"), 44);
        assert_eq!(parse_inset(" 12.7px "), 12);
        assert_eq!(parse_inset("+3px"), 3);
        assert_eq!(parse_inset("0"), 0);
    }

    #[test]
    fn garbage_is_zero() {
        assert_eq!(parse_inset(""), 0);
        assert_eq!(parse_inset("env(safe-area-inset-top)"), 0);
        assert_eq!(parse_inset("px"), 0);
        assert_eq!(parse_inset("-20px"), 0);
    }

    #[test]
    fn overflow_saturates() {
        assert_eq!(parse_inset("99999999999px"), u32::MAX);
    }
}
