//! Device name classification.
//!
//! Decides whether a device is the undesired headset microphone and which
//! devices may be chosen as a replacement.

use regex::Regex;

use super::device::Device;
use crate::config::{DevicePattern, MatchStrategy};

/// Classifies devices by name.
pub trait DeviceClassifier: Send + Sync {
    /// Returns `true` if a device with this name must not stay the default input.
    fn is_undesired(&self, name: &str) -> bool;

    /// Returns the input-capable, not-undesired devices in enumeration order.
    fn filter_selectable(&self, devices: &[Device]) -> Vec<Device> {
        devices
            .iter()
            .filter(|device| device.is_input && !self.is_undesired(&device.name))
            .cloned()
            .collect()
    }
}

/// A compiled [`DevicePattern`].
#[derive(Debug, Clone)]
pub struct NameMatcher {
    needle: String,
    strategy: MatchStrategy,
    regex: Option<Regex>,
}

impl NameMatcher {
    /// Compiles a pattern. An invalid regex is logged and matches nothing.
    #[must_use]
    pub fn new(pattern: &DevicePattern) -> Self {
        let regex = match pattern.strategy {
            MatchStrategy::Regex => Regex::new(&pattern.name)
                .inspect_err(|err| {
                    tracing::warn!(pattern = %pattern.name, error = %err, "invalid device name regex");
                })
                .ok(),
            _ => None,
        };

        Self {
            needle: pattern.name.to_lowercase(),
            strategy: pattern.strategy,
            regex,
        }
    }

    /// Checks a device name against the pattern.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        if self.needle.is_empty() {
            return false;
        }

        let name_lower = name.to_lowercase();

        match self.strategy {
            MatchStrategy::Exact => name_lower == self.needle,
            MatchStrategy::Contains => name_lower.contains(&self.needle),
            MatchStrategy::StartsWith => name_lower.starts_with(&self.needle),
            MatchStrategy::Regex => self.regex.as_ref().is_some_and(|re| re.is_match(name)),
        }
    }
}

/// Classifier backed by a list of undesired name patterns.
#[derive(Debug, Clone)]
pub struct PatternClassifier {
    undesired: Vec<NameMatcher>,
}

impl PatternClassifier {
    /// Creates a classifier flagging any device matching one of `patterns`.
    #[must_use]
    pub fn new(patterns: &[DevicePattern]) -> Self {
        Self {
            undesired: patterns.iter().map(NameMatcher::new).collect(),
        }
    }

    /// Creates a classifier flagging names that contain `marker`.
    #[must_use]
    pub fn marker(marker: &str) -> Self { Self::new(&[DevicePattern::contains(marker)]) }
}

impl DeviceClassifier for PatternClassifier {
    fn is_undesired(&self, name: &str) -> bool {
        self.undesired.iter().any(|matcher| matcher.matches(name))
    }
}
