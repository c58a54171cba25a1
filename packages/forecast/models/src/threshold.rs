//! Wind-speed thresholds at which impact envelopes are computed.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A sustained wind-speed threshold, in knots.
///
/// Displays and parses as the bare knot value (`"50"`), which is how the
/// threshold appears in view file names and upstream tables.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum WindThreshold {
    /// Tropical storm force.
    #[serde(rename = "34")]
    #[strum(serialize = "34")]
    Kt34,
    /// Strong tropical storm.
    #[serde(rename = "40")]
    #[strum(serialize = "40")]
    Kt40,
    /// Very strong tropical storm.
    #[serde(rename = "50")]
    #[strum(serialize = "50")]
    Kt50,
    /// Category 1 hurricane.
    #[serde(rename = "64")]
    #[strum(serialize = "64")]
    Kt64,
    /// Category 2 hurricane.
    #[serde(rename = "83")]
    #[strum(serialize = "83")]
    Kt83,
    /// Category 3 hurricane.
    #[serde(rename = "96")]
    #[strum(serialize = "96")]
    Kt96,
    /// Category 4 hurricane.
    #[serde(rename = "113")]
    #[strum(serialize = "113")]
    Kt113,
    /// Category 5 hurricane.
    #[serde(rename = "137")]
    #[strum(serialize = "137")]
    Kt137,
}

/// Knots to metres per second.
const KNOT_MS: f64 = 0.514_444;

impl WindThreshold {
    /// Threshold used when nothing better is known.
    pub const DEFAULT: Self = Self::Kt50;

    /// Returns all thresholds in ascending order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Kt34,
            Self::Kt40,
            Self::Kt50,
            Self::Kt64,
            Self::Kt83,
            Self::Kt96,
            Self::Kt113,
            Self::Kt137,
        ]
    }

    /// Wind speed in knots.
    #[must_use]
    pub const fn knots(self) -> u16 {
        match self {
            Self::Kt34 => 34,
            Self::Kt40 => 40,
            Self::Kt50 => 50,
            Self::Kt64 => 64,
            Self::Kt83 => 83,
            Self::Kt96 => 96,
            Self::Kt113 => 113,
            Self::Kt137 => 137,
        }
    }

    /// Looks up a threshold by its knot value.
    #[must_use]
    pub fn from_knots(knots: u16) -> Option<Self> {
        Self::all().iter().copied().find(|t| t.knots() == knots)
    }

    /// Wind speed in metres per second.
    #[must_use]
    pub fn meters_per_second(self) -> f64 {
        f64::from(self.knots()) * KNOT_MS
    }

    /// Storm category this threshold corresponds to.
    #[must_use]
    pub const fn category(self) -> &'static str {
        match self {
            Self::Kt34 => "Tropical storm force",
            Self::Kt40 => "Strong tropical storm",
            Self::Kt50 => "Very strong tropical storm",
            Self::Kt64 => "Category 1 hurricane",
            Self::Kt83 => "Category 2 hurricane",
            Self::Kt96 => "Category 3 hurricane",
            Self::Kt113 => "Category 4 hurricane",
            Self::Kt137 => "Category 5 hurricane",
        }
    }

    /// Selector label, e.g. `"64kt - Category 1 hurricane (32.92 m/s)"`.
    #[must_use]
    pub fn label(self) -> String {
        format!(
            "{}kt - {} ({:.2} m/s)",
            self.knots(),
            self.category(),
            self.meters_per_second()
        )
    }
}

/// One entry of the wind threshold selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdOption {
    /// The threshold.
    pub value: WindThreshold,
    /// Display label.
    pub label: String,
    /// Whether the threshold has no data for the current selection.
    pub disabled: bool,
}

/// Builds the selector entries, disabling thresholds absent from
/// `available`.
#[must_use]
pub fn threshold_options(available: &[WindThreshold]) -> Vec<ThresholdOption> {
    WindThreshold::all()
        .iter()
        .map(|&value| ThresholdOption {
            value,
            label: value.label(),
            disabled: !available.contains(&value),
        })
        .collect()
}

/// Chooses the threshold to preselect.
///
/// Keeps the user's `current` choice while it remains available,
/// otherwise prefers 50 kt, otherwise the strongest available threshold.
/// With nothing available the default 50 kt is returned.
#[must_use]
pub fn default_threshold(
    available: &[WindThreshold],
    current: Option<WindThreshold>,
) -> WindThreshold {
    if let Some(current) = current
        && available.contains(&current)
    {
        return current;
    }

    if available.contains(&WindThreshold::DEFAULT) {
        return WindThreshold::DEFAULT;
    }

    available
        .iter()
        .copied()
        .max()
        .unwrap_or(WindThreshold::DEFAULT)
}
