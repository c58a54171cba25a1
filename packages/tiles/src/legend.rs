//! Legend bars for the tile layers.

use geojson::{FeatureCollection, JsonValue};
use storm_impact_forecast_models::format::{format_compact, format_thousands};
use storm_impact_tiles_models::{LegendRange, LegendSwatch, Palette, TileAttribute};

/// One equal-width swatch per coloured bucket of `palette`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn legend_swatches(palette: &Palette) -> Vec<LegendSwatch> {
    let buckets = palette.buckets();
    if buckets.is_empty() {
        return vec![];
    }
    let width_pct = 100.0 / buckets.len() as f64;
    buckets
        .iter()
        .map(|color| LegendSwatch {
            color: color.clone(),
            width_pct,
        })
        .collect()
}

/// End labels for an exposure legend: the smallest and largest strictly
/// positive value of `attribute` in the batch. Falls back to
/// `"Min"`/`"Max"` when there is none.
#[must_use]
pub fn legend_range(tiles: &FeatureCollection, attribute: TileAttribute) -> LegendRange {
    let name = attribute.as_ref();
    let positive = tiles
        .features
        .iter()
        .filter_map(|f| f.properties.as_ref()?.get(name))
        .filter_map(JsonValue::as_f64)
        .filter(|v| v.is_finite() && *v > 0.0);

    let bounds = positive.fold(None, |acc: Option<(f64, f64)>, v| {
        Some(acc.map_or((v, v), |(lo, hi)| (lo.min(v), hi.max(v))))
    });

    bounds.map_or_else(LegendRange::default, |(min, max)| LegendRange {
        min: format_thousands(min),
        max: format_compact(max),
    })
}
