//! Low / expected / high scenario reduction.
//!
//! Members are ranked by total population severity only. The low and high
//! rows of every other metric come from those same two members, so each
//! column describes one coherent storyline rather than per-metric
//! extremes. Ties go to the first member in ascending id order.

use std::collections::{BTreeMap, BTreeSet};

use geojson::FeatureCollection;
use storm_impact_forecast_models::{MemberId, Outcome, TrackBatch, TrackRow};
use storm_impact_scenario_models::{MetricRow, MetricValue, ScenarioMetric, ScenarioSummary};

use crate::{ScenarioError, expected_totals};

/// Severities of one member summed across all of its zones.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberTotals {
    /// Member id.
    pub member: MemberId,
    totals: BTreeMap<ScenarioMetric, f64>,
}

impl MemberTotals {
    const fn new(member: MemberId) -> Self {
        Self {
            member,
            totals: BTreeMap::new(),
        }
    }

    /// Summed severity of `metric`. Missing cells count as zero.
    #[must_use]
    pub fn total(&self, metric: ScenarioMetric) -> f64 {
        self.totals.get(&metric).copied().unwrap_or_default()
    }
}

const fn severity(row: &TrackRow, metric: ScenarioMetric) -> Option<f64> {
    match metric {
        ScenarioMetric::Population => row.severity_population,
        ScenarioMetric::Children => row.severity_school_age_population,
        ScenarioMetric::Infants => row.severity_infant_population,
        ScenarioMetric::Schools => row.severity_schools,
        ScenarioMetric::HealthCenters => row.severity_hcs,
        ScenarioMetric::BuiltSurface => row.severity_built_surface_m2,
    }
}

/// Groups `rows` by member and sums each severity, in ascending member
/// order. Missing and non-finite cells are skipped.
///
/// # Errors
///
/// Returns [`ScenarioError::NegativeSeverity`] if any row carries a
/// negative severity.
pub fn member_totals(rows: &[TrackRow]) -> Result<Vec<MemberTotals>, ScenarioError> {
    let mut by_member: BTreeMap<MemberId, MemberTotals> = BTreeMap::new();

    for row in rows {
        let totals = by_member
            .entry(row.member)
            .or_insert_with(|| MemberTotals::new(row.member));

        for metric in ScenarioMetric::all() {
            let Some(value) = severity(row, *metric).filter(|v| v.is_finite()) else {
                continue;
            };
            if value < 0.0 {
                return Err(ScenarioError::NegativeSeverity {
                    member: row.member,
                    column: metric.severity_column(),
                    value,
                });
            }
            *totals.totals.entry(*metric).or_default() += value;
        }
    }

    Ok(by_member.into_values().collect())
}

/// Metrics whose severity column is carried by at least one row.
fn present_metrics(rows: &[TrackRow]) -> BTreeSet<ScenarioMetric> {
    ScenarioMetric::all()
        .iter()
        .copied()
        .filter(|metric| rows.iter().any(|row| severity(row, *metric).is_some()))
        .collect()
}

/// The lowest and highest members by total population severity. The
/// first member wins a tie.
pub(crate) fn population_extremes(
    totals: &[MemberTotals],
) -> Option<(&MemberTotals, &MemberTotals)> {
    let (first, rest) = totals.split_first()?;
    let (mut low, mut high) = (first, first);

    for candidate in rest {
        let population = candidate.total(ScenarioMetric::Population);
        if population < low.total(ScenarioMetric::Population) {
            low = candidate;
        }
        if population > high.total(ScenarioMetric::Population) {
            high = candidate;
        }
    }

    Some((low, high))
}

/// Reduces a track batch and its expectation tiles to a
/// [`ScenarioSummary`].
///
/// * No track rows and no tiles is [`Outcome::Empty`].
/// * No track rows, or no population severity to rank by, leaves the low
///   and high columns unavailable while the expected column is still
///   computed from the tiles.
/// * A failure is [`Outcome::Degraded`] carrying the all-unavailable
///   summary.
#[must_use]
pub fn reduce_scenarios(
    batch: &TrackBatch,
    expectation_tiles: Option<&FeatureCollection>,
) -> Outcome<ScenarioSummary> {
    let tiles = expectation_tiles.filter(|tiles| !tiles.features.is_empty());
    if batch.rows.is_empty() && tiles.is_none() {
        log::debug!("No track rows or expectation tiles to reduce");
        return Outcome::Empty;
    }

    match summarize(batch, tiles) {
        Ok(summary) => Outcome::Data(summary),
        Err(e) => {
            log::warn!("Error reducing scenarios: {e}");
            Outcome::degraded(ScenarioSummary::default(), e)
        }
    }
}

fn summarize(
    batch: &TrackBatch,
    tiles: Option<&FeatureCollection>,
) -> Result<ScenarioSummary, ScenarioError> {
    let expected = match tiles {
        Some(tiles) => expected_totals(tiles)?,
        None => BTreeMap::new(),
    };

    let present = present_metrics(&batch.rows);
    let totals = member_totals(&batch.rows)?;
    let extremes = if present.contains(&ScenarioMetric::Population) {
        population_extremes(&totals)
    } else {
        if !batch.rows.is_empty() {
            log::debug!("Track rows carry no population severity; low/high unavailable");
        }
        None
    };

    if let Some((low, high)) = extremes {
        log::debug!(
            "Scenario members: low=#{} ({}), high=#{} ({}) of {} members",
            low.member,
            low.total(ScenarioMetric::Population),
            high.member,
            high.total(ScenarioMetric::Population),
            totals.len(),
        );
    }

    let rows = ScenarioMetric::all()
        .iter()
        .map(|&metric| {
            let reportable = present.contains(&metric)
                && (batch.health_data_available || !metric.requires_health_data());
            let value = |member: &MemberTotals| {
                if reportable {
                    MetricValue::Available(member.total(metric))
                } else {
                    MetricValue::Unavailable
                }
            };

            MetricRow {
                metric,
                low: extremes.map_or(MetricValue::Unavailable, |(low, _)| value(low)),
                expected: expected.get(&metric).copied().unwrap_or_default(),
                high: extremes.map_or(MetricValue::Unavailable, |(_, high)| value(high)),
            }
        })
        .collect();

    Ok(ScenarioSummary {
        rows,
        low_member: extremes.map(|(low, _)| low.member),
        high_member: extremes.map(|(_, high)| high.member),
    })
}
