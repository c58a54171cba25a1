#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Scenario summary types.
//!
//! An ensemble of track realizations is reduced to three columns per
//! metric: the low-impact member, the probability-weighted expectation,
//! and the high-impact member.

use serde::{Deserialize, Serialize};
use storm_impact_forecast_models::{MemberId, format::format_thousands};
use strum_macros::{AsRefStr, Display, EnumString};

/// An impact metric reported in the scenario summary.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScenarioMetric {
    /// Affected people.
    Population,
    /// Affected school-age children.
    Children,
    /// Affected infants.
    Infants,
    /// Affected schools.
    Schools,
    /// Affected health centres.
    HealthCenters,
    /// Affected built surface, in square metres.
    BuiltSurface,
}

impl ScenarioMetric {
    /// Returns all variants of this enum, in display order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Population,
            Self::Children,
            Self::Infants,
            Self::Schools,
            Self::HealthCenters,
            Self::BuiltSurface,
        ]
    }

    /// Human-readable row label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Population => "Population",
            Self::Children => "Children (Age 5-15)",
            Self::Infants => "Infants (Age 0-5)",
            Self::Schools => "Schools",
            Self::HealthCenters => "Health Centers",
            Self::BuiltSurface => "Built Surface (m²)",
        }
    }

    /// Track column carrying this metric's per-zone severity.
    #[must_use]
    pub const fn severity_column(self) -> &'static str {
        match self {
            Self::Population => "severity_population",
            Self::Children => "severity_school_age_population",
            Self::Infants => "severity_infant_population",
            Self::Schools => "severity_schools",
            Self::HealthCenters => "severity_hcs",
            Self::BuiltSurface => "severity_built_surface_m2",
        }
    }

    /// Tile property carrying this metric's probability-weighted value.
    #[must_use]
    pub const fn expected_column(self) -> &'static str {
        match self {
            Self::Population => "E_population",
            Self::Children => "E_school_age_population",
            Self::Infants => "E_infant_population",
            Self::Schools => "E_num_schools",
            Self::HealthCenters => "E_num_hcs",
            Self::BuiltSurface => "E_built_surface_m2",
        }
    }

    /// Whether low/high values need the health-centre view to exist.
    #[must_use]
    pub const fn requires_health_data(self) -> bool {
        matches!(self, Self::HealthCenters | Self::BuiltSurface)
    }
}

/// A summary cell: a number, or the "unavailable" sentinel.
///
/// Zero and unavailable are distinct: `Available(0.0)` means the column
/// exists and sums to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// A summed value.
    Available(f64),
    /// The source column is absent for this selection.
    #[default]
    Unavailable,
}

impl MetricValue {
    /// The number, if available.
    #[must_use]
    pub const fn as_f64(self) -> Option<f64> {
        match self {
            Self::Available(value) => Some(value),
            Self::Unavailable => None,
        }
    }

    /// Returns `true` for [`MetricValue::Available`].
    #[must_use]
    pub const fn is_available(self) -> bool {
        matches!(self, Self::Available(_))
    }
}

impl From<Option<f64>> for MetricValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Unavailable, Self::Available)
    }
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available(value) => f.pad(&format_thousands(*value)),
            Self::Unavailable => f.pad("N/A"),
        }
    }
}

/// Low, expected and high values of one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    /// Which metric this row reports.
    pub metric: ScenarioMetric,
    /// Value for the low-impact member.
    pub low: MetricValue,
    /// Probability-weighted expectation.
    pub expected: MetricValue,
    /// Value for the high-impact member.
    pub high: MetricValue,
}

impl MetricRow {
    /// A row with every cell unavailable.
    #[must_use]
    pub const fn unavailable(metric: ScenarioMetric) -> Self {
        Self {
            metric,
            low: MetricValue::Unavailable,
            expected: MetricValue::Unavailable,
            high: MetricValue::Unavailable,
        }
    }
}

/// The low / expected / high impact summary for one selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSummary {
    /// One row per [`ScenarioMetric`], in [`ScenarioMetric::all`] order.
    pub rows: Vec<MetricRow>,
    /// Member with the lowest total population severity.
    pub low_member: Option<MemberId>,
    /// Member with the highest total population severity.
    pub high_member: Option<MemberId>,
}

impl ScenarioSummary {
    /// The row for `metric`.
    #[must_use]
    pub fn row(&self, metric: ScenarioMetric) -> Option<&MetricRow> {
        self.rows.iter().find(|row| row.metric == metric)
    }

    /// Badge text for the low member (`#7`, or `N/A`).
    #[must_use]
    pub fn low_badge(&self) -> String {
        member_badge(self.low_member)
    }

    /// Badge text for the high member (`#7`, or `N/A`).
    #[must_use]
    pub fn high_badge(&self) -> String {
        member_badge(self.high_member)
    }
}

impl Default for ScenarioSummary {
    fn default() -> Self {
        Self {
            rows: ScenarioMetric::all()
                .iter()
                .copied()
                .map(MetricRow::unavailable)
                .collect(),
            low_member: None,
            high_member: None,
        }
    }
}

fn member_badge(member: Option<MemberId>) -> String {
    member.map_or_else(|| "N/A".to_string(), |id| format!("#{id}"))
}

/// One entry of the ensemble member picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberOption {
    /// Member id.
    pub value: MemberId,
    /// Display label, e.g. `"Ensemble 7 (ID: 7) (HIGH IMPACT)"`.
    pub label: String,
}
