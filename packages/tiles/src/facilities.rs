//! Marker styling for school and health-centre impact views.
//!
//! Facility views arrive as buffered polygons carrying an impact
//! `probability`. They are drawn as centroid markers whose colour and
//! radius grow with the probability.

use geo::Centroid as _;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};
use storm_impact_forecast_models::Outcome;
use storm_impact_tiles_models::{
    COLOR_PROPERTY, FILL_OPACITY_PROPERTY, FILLED_OPACITY, FacilityKind, OPACITY_PROPERTY,
    RADIUS_PROPERTY, STROKE_OPACITY, StyledTiles, TileAttribute, WEIGHT_PROPERTY,
};

use crate::cache_key;

const MARKER_WEIGHT: u32 = 2;
const IDLE_RADIUS: u32 = 4;

/// Upper probability bound, colour and radius of each marker step.
const PROBABILITY_STEPS: &[(f64, &str, u32)] = &[
    (0.15, "#FFFF00", 10),
    (0.30, "#FFD700", 12),
    (0.45, "#FFA500", 15),
    (0.60, "#FF8C00", 18),
    (0.75, "#FF4500", 20),
    (0.90, "#DC143C", 22),
];
const SEVERE_STEP: (&str, u32) = ("#8B0000", 25);

/// Marker colour and radius for a facility.
#[must_use]
pub fn marker_style(kind: FacilityKind, probability: Option<f64>) -> (&'static str, u32) {
    let Some(p) = probability.filter(|p| p.is_finite() && *p != 0.0) else {
        return (kind.idle_color(), IDLE_RADIUS);
    };
    PROBABILITY_STEPS
        .iter()
        .find(|(bound, _, _)| p <= *bound)
        .map_or(SEVERE_STEP, |(_, color, radius)| (*color, *radius))
}

/// Converts every facility to a styled centroid marker.
///
/// Features without a geometry, or whose centroid cannot be computed,
/// are dropped. An empty view is [`Outcome::Empty`].
#[must_use]
pub fn style_facilities(tiles: &FeatureCollection, kind: FacilityKind) -> Outcome<StyledTiles> {
    if tiles.features.is_empty() {
        return Outcome::Empty;
    }

    let cache_key = match cache_key(tiles) {
        Ok(key) => Some(key),
        Err(e) => {
            log::warn!("Failed to hash {kind} view: {e}");
            None
        }
    };

    let features: Vec<Feature> = tiles
        .features
        .iter()
        .filter_map(|feature| marker(feature, kind))
        .collect();

    let dropped = tiles.features.len() - features.len();
    if dropped > 0 {
        log::debug!("Dropped {dropped} {kind} features without a usable geometry");
    }

    Outcome::Data(StyledTiles {
        collection: FeatureCollection {
            bbox: None,
            features,
            foreign_members: tiles.foreign_members.clone(),
        },
        has_data: true,
        cache_key,
    })
}

fn marker(feature: &Feature, kind: FacilityKind) -> Option<Feature> {
    let geometry: geo::Geometry<f64> = feature.geometry.clone()?.try_into().ok()?;
    let centroid = geometry.centroid()?;

    let mut properties = feature.properties.clone().unwrap_or_default();
    let probability = properties
        .get(TileAttribute::Probability.as_ref())
        .and_then(JsonValue::as_f64);
    let (color, radius) = marker_style(kind, probability);
    insert_marker_style(&mut properties, color, radius);

    Some(Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(&centroid))),
        id: feature.id.clone(),
        properties: Some(properties),
        foreign_members: None,
    })
}

fn insert_marker_style(properties: &mut JsonObject, color: &str, radius: u32) {
    properties.insert(COLOR_PROPERTY.to_string(), color.into());
    properties.insert(RADIUS_PROPERTY.to_string(), radius.into());
    properties.insert(OPACITY_PROPERTY.to_string(), STROKE_OPACITY.into());
    properties.insert(WEIGHT_PROPERTY.to_string(), MARKER_WEIGHT.into());
    properties.insert(FILL_OPACITY_PROPERTY.to_string(), FILLED_OPACITY.into());
}
