//! Probability-weighted ("expected") column of the scenario summary.

use std::collections::BTreeMap;

use geojson::{FeatureCollection, JsonValue};
use storm_impact_scenario_models::{MetricValue, ScenarioMetric};

use crate::ScenarioError;

/// Sums every metric's `E_*` property across the tile batch.
///
/// A column that no tile carries is [`MetricValue::Unavailable`]. A column
/// that is carried but missing (`null` or non-finite) in every tile sums
/// to zero, except for the children and infant columns, which upstream
/// leaves empty when the age breakdown is unknown and are then reported
/// as unavailable.
///
/// # Errors
///
/// Returns [`ScenarioError::NonNumericExpectation`] if a tile carries a
/// value that is not a number.
pub fn expected_totals(
    tiles: &FeatureCollection,
) -> Result<BTreeMap<ScenarioMetric, MetricValue>, ScenarioError> {
    ScenarioMetric::all()
        .iter()
        .map(|metric| Ok((*metric, column_sum(tiles, *metric)?)))
        .collect()
}

const fn empty_column_is_unavailable(metric: ScenarioMetric) -> bool {
    matches!(metric, ScenarioMetric::Children | ScenarioMetric::Infants)
}

fn column_sum(
    tiles: &FeatureCollection,
    metric: ScenarioMetric,
) -> Result<MetricValue, ScenarioError> {
    let column = metric.expected_column();
    let mut carried = false;
    let mut sum: Option<f64> = None;

    for (index, feature) in tiles.features.iter().enumerate() {
        let raw = feature.properties.as_ref().and_then(|p| p.get(column));
        carried |= raw.is_some();
        match raw {
            None | Some(JsonValue::Null) => {}
            Some(JsonValue::Number(n)) => {
                if let Some(value) = n.as_f64().filter(|v| v.is_finite()) {
                    *sum.get_or_insert(0.0) += value;
                }
            }
            Some(other) => {
                return Err(ScenarioError::NonNumericExpectation {
                    column,
                    index,
                    value: other.to_string(),
                });
            }
        }
    }

    if !carried || (sum.is_none() && empty_column_is_unavailable(metric)) {
        return Ok(MetricValue::Unavailable);
    }
    Ok(MetricValue::Available(sum.unwrap_or_default()))
}
