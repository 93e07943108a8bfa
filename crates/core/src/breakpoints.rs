use serde::{Deserialize, Serialize};
use viewport_sense_protocol::Breakpoint;

/// Inclusive minimum widths (CSS px) for each tier.
///
/// Tiers partition `[0, ∞)`: `xs` starts at 0 and every threshold is
/// strictly greater than the previous one (see [`crate::EngineConfig::validate`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Breakpoints {
    pub xs: u32,
    pub sm: u32,
    pub md: u32,
    pub lg: u32,
    pub xl: u32,
    #[serde(rename = "2xl")]
    pub xxl: u32,
}

impl Default for Breakpoints {
    fn default() -> Self {
        Self {
            xs: 0,
            sm: 640,
            md: 768,
            lg: 1024,
            xl: 1280,
            xxl: 1536,
        }
    }
}

impl Breakpoints {
    pub fn threshold(&self, tier: Breakpoint) -> u32 {
        match tier {
            Breakpoint::Xs => self.xs,
            Breakpoint::Sm => self.sm,
            Breakpoint::Md => self.md,
            Breakpoint::Lg => self.lg,
            Breakpoint::Xl => self.xl,
            Breakpoint::Xxl => self.xxl,
        }
    }

    /// Highest tier whose minimum is `<= width`.
    pub fn classify(&self, width: u32) -> Breakpoint {
        Breakpoint::Xxl
            .at_or_below()
            .find(|tier| self.threshold(*tier) <= width)
            .unwrap_or(Breakpoint::Xs)
    }

    /// Half-open width range `[min, max)` covered by `tier`; the widest tier
    /// has no upper bound.
    pub fn range(&self, tier: Breakpoint) -> (u32, Option<u32>) {
        let next = Breakpoint::ALL
            .get(tier.index() + 1)
            .map(|next| self.threshold(*next));
        (self.threshold(tier), next)
    }
}

/// Per-tier values keyed by a subset of tiers, in insertion order.
///
/// Mirrors a `{ sm: .., lg: .. }` object literal: inserting a tier that is
/// already present replaces its value but keeps its original position.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakpointValues<T> {
    entries: Vec<(Breakpoint, T)>,
}

impl<T> BreakpointValues<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, tier: Breakpoint, value: T) -> Self {
        self.insert(tier, value);
        self
    }

    pub fn insert(&mut self, tier: Breakpoint, value: T) {
        match self.entries.iter_mut().find(|(t, _)| *t == tier) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((tier, value)),
        }
    }

    pub fn get(&self, tier: Breakpoint) -> Option<&T> {
        self.entries
            .iter()
            .find_map(|(t, value)| (*t == tier).then_some(value))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Breakpoint, &T)> {
        self.entries.iter().map(|(tier, value)| (*tier, value))
    }

    /// Value for `current`, else the nearest defined tier below it, else the
    /// first-inserted value. `None` only when no tier is defined at all.
    pub fn resolve(&self, current: Breakpoint) -> Option<&T> {
        current
            .at_or_below()
            .find_map(|tier| self.get(tier))
            .or_else(|| self.entries.first().map(|(_, value)| value))
    }
}

impl<T> Default for BreakpointValues<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<(Breakpoint, T)> for BreakpointValues<T> {
    fn from_iter<I: IntoIterator<Item = (Breakpoint, T)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (tier, value) in iter {
            values.insert(tier, value);
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_boundaries() {
        let bp = Breakpoints::default();
        assert_eq!(bp.classify(0), Breakpoint::Xs);
        assert_eq!(bp.classify(639), Breakpoint::Xs);
        assert_eq!(bp.classify(640), Breakpoint::Sm);
        assert_eq!(bp.classify(767), Breakpoint::Sm);
        assert_eq!(bp.classify(768), Breakpoint::Md);
        assert_eq!(bp.classify(1023), Breakpoint::Md);
        assert_eq!(bp.classify(1024), Breakpoint::Lg);
        assert_eq!(bp.classify(1279), Breakpoint::Lg);
        assert_eq!(bp.classify(1280), Breakpoint::Xl);
        assert_eq!(bp.classify(1535), Breakpoint::Xl);
        assert_eq!(bp.classify(1536), Breakpoint::Xxl);
        assert_eq!(bp.classify(u32::MAX), Breakpoint::Xxl);
    }

    #[test]
    fn tiers_partition_widths() {
        let bp = Breakpoints::default();
        for width in 0..2000 {
            let tier = bp.classify(width);
            let (min, max) = bp.range(tier);
            assert!(min <= width, "width {width} below {tier} minimum");
            assert!(max.is_none_or(|max| width < max), "width {width} above {tier}");
        }
    }

    #[test]
    fn custom_thresholds() {
        let bp = Breakpoints {
            sm: 500,
            ..Breakpoints::default()
        };
        assert_eq!(bp.classify(500), Breakpoint::Sm);
        assert_eq!(bp.classify(499), Breakpoint::Xs);
    }

    #[test]
    fn resolves_nearest_lower_tier() {
        let values = BreakpointValues::new()
            .with(Breakpoint::Sm, "A")
            .with(Breakpoint::Lg, "C");
        assert_eq!(values.resolve(Breakpoint::Md), Some(&"A"));
        assert_eq!(values.resolve(Breakpoint::Lg), Some(&"C"));
        assert_eq!(values.resolve(Breakpoint::Xxl), Some(&"C"));
    }

    #[test]
    fn falls_back_to_first_inserted() {
        let values = BreakpointValues::new()
            .with(Breakpoint::Sm, "A")
            .with(Breakpoint::Lg, "C");
        assert_eq!(values.resolve(Breakpoint::Xs), Some(&"A"));

        let reversed = BreakpointValues::new()
            .with(Breakpoint::Lg, "C")
            .with(Breakpoint::Sm, "A");
        assert_eq!(reversed.resolve(Breakpoint::Xs), Some(&"C"));
    }

    #[test]
    fn empty_mapping_resolves_to_none() {
        let values: BreakpointValues<u8> = BreakpointValues::new();
        assert_eq!(values.resolve(Breakpoint::Lg), None);
    }

    #[test]
    fn reinsert_keeps_position() {
        let values: BreakpointValues<i32> =
            [(Breakpoint::Md, 1), (Breakpoint::Xs, 2), (Breakpoint::Md, 3)]
                .into_iter()
                .collect();
        let order: Vec<_> = values.iter().collect();
        assert_eq!(order, vec![(Breakpoint::Md, &3), (Breakpoint::Xs, &2)]);
    }
}
