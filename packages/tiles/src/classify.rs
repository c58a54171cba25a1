//! Choropleth bucketing of tile batches.
//!
//! Each [`AttributeClass`] gets its own scale:
//!
//! * `Categorical`: settlement classes `10/20/30` map to the three
//!   palette colours; anything else is transparent.
//! * `SignedScale`: fixed `[-1, 1]` domain, rounded to the nearest
//!   bucket. Zero is a real value and gets the middle colour.
//! * `UnitScale`: fixed `[0, 1]` domain so probability layers compare
//!   across selections.
//! * `Adaptive`: domain is the batch's observed maximum.
//!
//! For the linear scales (unit and adaptive) zero and missing values are
//! both transparent.

use std::str::FromStr as _;

use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};
use storm_impact_forecast_models::Outcome;
use storm_impact_tiles_models::{
    AttributeClass, COLOR_PROPERTY, FILL_OPACITY_PROPERTY, OPACITY_PROPERTY, Palette,
    SettlementClass, StyledTiles, TileAttribute, TileStyle, WEIGHT_PROPERTY,
};

use crate::{ImpactContext, TilesError, cache_key};

const SIGNED_MIN: f64 = -1.0;
const SIGNED_MAX: f64 = 1.0;
const UNIT_MAX: f64 = 1.0;

/// Value-to-bucket mapping for one batch.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Scale {
    /// Every tile renders transparent.
    Transparent,
    Categorical,
    Signed,
    /// Equal-width buckets over `(0, max]`.
    Linear { max: f64 },
}

impl Scale {
    /// Picks the scale for `class` given the batch's values.
    fn for_batch(class: AttributeClass, values: &[Option<f64>]) -> Self {
        let observed_max = values.iter().flatten().copied().reduce(f64::max);
        let Some(observed_max) = observed_max else {
            return Self::Transparent;
        };

        match class {
            AttributeClass::Categorical => Self::Categorical,
            AttributeClass::SignedScale => Self::Signed,
            AttributeClass::UnitScale => Self::Linear { max: UNIT_MAX },
            AttributeClass::Adaptive if observed_max > 0.0 => Self::Linear { max: observed_max },
            AttributeClass::Adaptive => Self::Transparent,
        }
    }

    /// Bucket index for one value, `None` meaning transparent.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn bucket(self, value: Option<f64>, buckets: usize) -> Option<usize> {
        let value = value?;
        if buckets == 0 {
            return None;
        }
        let last = buckets - 1;

        match self {
            Self::Transparent => None,
            Self::Categorical => SettlementClass::from_raw(value).map(SettlementClass::bucket),
            Self::Signed => {
                let norm = (value - SIGNED_MIN) / (SIGNED_MAX - SIGNED_MIN);
                let index = (norm * last as f64).round_ties_even();
                Some(index.clamp(0.0, last as f64) as usize)
            }
            Self::Linear { max } => {
                if value == 0.0 {
                    return None;
                }
                let step = max / buckets as f64;
                let index = (value / step).floor().max(0.0) as usize;
                Some(index.min(last))
            }
        }
    }
}

/// Styles every tile in `tiles` by `attribute`.
///
/// The input batch is never modified; the styled output is a copy.
///
/// * An empty batch is [`Outcome::Empty`].
/// * A failure (attribute absent, non-numeric values, missing palette)
///   is [`Outcome::Degraded`] carrying the unstyled copy with
///   `has_data` still set.
#[must_use]
pub fn classify(
    ctx: &ImpactContext,
    tiles: &FeatureCollection,
    attribute: TileAttribute,
) -> Outcome<StyledTiles> {
    if tiles.features.is_empty() {
        log::debug!("No tiles to style for {attribute}");
        return Outcome::Empty;
    }

    let key = match cache_key(tiles) {
        Ok(key) => Some(key),
        Err(e) => {
            log::warn!("Failed to hash tile batch: {e}");
            None
        }
    };

    match style_batch(ctx, tiles, attribute) {
        Ok(collection) => Outcome::Data(StyledTiles {
            collection,
            has_data: true,
            cache_key: key,
        }),
        Err(e) => {
            log::warn!("Error styling {attribute} tiles: {e}");
            Outcome::degraded(unstyled(tiles, key), e)
        }
    }
}

/// Like [`classify`], resolving the attribute by name first. An unknown
/// name degrades to the unstyled batch.
#[must_use]
pub fn classify_named(
    ctx: &ImpactContext,
    tiles: &FeatureCollection,
    name: &str,
) -> Outcome<StyledTiles> {
    match TileAttribute::from_str(name) {
        Ok(attribute) => classify(ctx, tiles, attribute),
        Err(_) if tiles.features.is_empty() => Outcome::Empty,
        Err(_) => {
            let e = TilesError::UnknownAttribute {
                name: name.to_string(),
            };
            log::warn!("{e}");
            let key = cache_key(tiles).ok();
            Outcome::degraded(unstyled(tiles, key), e)
        }
    }
}

/// Like [`classify`], accepting an arbitrary JSON value.
///
/// Anything without a `features` list is treated as an empty batch. A
/// batch that has one but is not a strict `FeatureCollection` (no
/// top-level `type`, features without `type` or `geometry`) is read
/// feature by feature; a feature that still cannot be read degrades the
/// whole batch with `has_data` set.
#[must_use]
pub fn classify_json(
    ctx: &ImpactContext,
    tiles: &JsonValue,
    attribute: TileAttribute,
) -> Outcome<StyledTiles> {
    let Some(features) = tiles.get("features").and_then(JsonValue::as_array) else {
        log::error!("Invalid tiles data structure: no features list");
        return Outcome::Empty;
    };

    let collection = match serde_json::from_value::<FeatureCollection>(tiles.clone()) {
        Ok(collection) => collection,
        Err(e) => {
            log::warn!("Tiles are not a strict FeatureCollection ({e}), reading leniently");
            match lenient_collection(features) {
                Ok(collection) => collection,
                Err(e) => {
                    log::error!("Invalid tiles data structure: {e}");
                    let empty = FeatureCollection {
                        bbox: None,
                        features: vec![],
                        foreign_members: None,
                    };
                    return Outcome::degraded(unstyled(&empty, None), e);
                }
            }
        }
    };

    classify(ctx, &collection, attribute)
}

/// Reads features one by one, defaulting a missing `geometry` or
/// `properties` to `None` and ignoring a missing `type`.
fn lenient_collection(features: &[JsonValue]) -> Result<FeatureCollection, TilesError> {
    let features = features
        .iter()
        .enumerate()
        .map(|(index, raw)| lenient_feature(index, raw))
        .collect::<Result<Vec<_>, TilesError>>()?;
    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

fn lenient_feature(index: usize, raw: &JsonValue) -> Result<Feature, TilesError> {
    let malformed = |reason: String| TilesError::MalformedFeature { index, reason };
    let Some(object) = raw.as_object() else {
        return Err(malformed(format!("expected an object, got {raw}")));
    };

    let geometry = match object.get("geometry") {
        None | Some(JsonValue::Null) => None,
        Some(value) => Some(
            serde_json::from_value::<Geometry>(value.clone())
                .map_err(|e| malformed(format!("invalid geometry: {e}")))?,
        ),
    };
    let properties = match object.get("properties") {
        None | Some(JsonValue::Null) => None,
        Some(JsonValue::Object(properties)) => Some(properties.clone()),
        Some(other) => return Err(malformed(format!("properties is not an object: {other}"))),
    };
    let id = match object.get("id") {
        None | Some(JsonValue::Null) => None,
        Some(JsonValue::String(id)) => Some(Id::String(id.clone())),
        Some(JsonValue::Number(id)) => Some(Id::Number(id.clone())),
        Some(other) => return Err(malformed(format!("invalid id: {other}"))),
    };

    Ok(Feature {
        bbox: None,
        geometry,
        id,
        properties,
        foreign_members: None,
    })
}

fn unstyled(tiles: &FeatureCollection, cache_key: Option<String>) -> StyledTiles {
    StyledTiles {
        collection: tiles.clone(),
        has_data: true,
        cache_key,
    }
}

/// Computes the styles for every tile, then applies them to a copy.
fn style_batch(
    ctx: &ImpactContext,
    tiles: &FeatureCollection,
    attribute: TileAttribute,
) -> Result<FeatureCollection, TilesError> {
    let palette = ctx.palette(attribute)?;
    let values = attribute_values(tiles, attribute)?;
    let styles = styles_for(palette, attribute.class(), &values);

    log_batch_stats(attribute, &values);

    let mut styled = tiles.clone();
    for (feature, style) in styled.features.iter_mut().zip(styles) {
        apply_style(feature.properties.get_or_insert_with(JsonObject::new), &style);
    }
    Ok(styled)
}

/// Buckets `values` into styles for `palette`.
fn styles_for(palette: &Palette, class: AttributeClass, values: &[Option<f64>]) -> Vec<TileStyle> {
    let scale = Scale::for_batch(class, values);
    let buckets = palette.bucket_count();
    values
        .iter()
        .map(|value| TileStyle::for_bucket(palette, scale.bucket(*value, buckets)))
        .collect()
}

/// Reads `attribute` from every tile. Absent keys, `null`s and non-finite
/// numbers are missing values.
fn attribute_values(
    tiles: &FeatureCollection,
    attribute: TileAttribute,
) -> Result<Vec<Option<f64>>, TilesError> {
    let name = attribute.as_ref();
    let mut seen = false;
    let mut values = Vec::with_capacity(tiles.features.len());

    for (index, feature) in tiles.features.iter().enumerate() {
        let raw = feature.properties.as_ref().and_then(|p| p.get(name));
        seen |= raw.is_some();
        let value = match raw {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::Number(n)) => n.as_f64().filter(|v| v.is_finite()),
            Some(other) => {
                return Err(TilesError::NonNumeric {
                    attribute,
                    index,
                    value: other.to_string(),
                });
            }
        };
        values.push(value);
    }

    if !seen {
        return Err(TilesError::AttributeAbsent { attribute });
    }
    Ok(values)
}

fn apply_style(properties: &mut JsonObject, style: &TileStyle) {
    properties.insert(COLOR_PROPERTY.to_string(), style.color.clone().into());
    properties.insert(FILL_OPACITY_PROPERTY.to_string(), style.fill_opacity.into());
    properties.insert(WEIGHT_PROPERTY.to_string(), style.weight.into());
    properties.insert(OPACITY_PROPERTY.to_string(), style.opacity.into());
}

#[allow(clippy::float_cmp)]
fn log_batch_stats(attribute: TileAttribute, values: &[Option<f64>]) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    let clean: Vec<f64> = values.iter().flatten().copied().collect();
    let zeros = clean.iter().filter(|v| **v == 0.0).count();
    let min = clean.iter().copied().reduce(f64::min);
    let max = clean.iter().copied().reduce(f64::max);
    log::debug!(
        "{attribute} tiles: total={} zero={zeros} missing={} min={min:?} max={max:?}",
        values.len(),
        values.len() - clean.len(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use storm_impact_tiles_models::{FILLED_OPACITY, TRANSPARENT};

    use crate::PaletteRegistry;

    fn batch(attribute: &str, values: &[Option<f64>]) -> FeatureCollection {
        let features: Vec<JsonValue> = values
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let mut properties = serde_json::Map::new();
                properties.insert("tile_id".to_string(), (i + 1).into());
                properties.insert(
                    attribute.to_string(),
                    value.map_or(JsonValue::Null, JsonValue::from),
                );
                serde_json::json!({
                    "type": "Feature",
                    "id": i + 1,
                    "geometry": null,
                    "properties": properties,
                })
            })
            .collect();
        serde_json::from_value(serde_json::json!({
            "type": "FeatureCollection",
            "features": features,
        }))
        .unwrap()
    }

    fn prop<'a>(styled: &'a StyledTiles, index: usize, key: &str) -> &'a JsonValue {
        &styled.collection.features[index]
            .properties
            .as_ref()
            .unwrap()[key]
    }

    fn color(styled: &StyledTiles, index: usize) -> String {
        prop(styled, index, COLOR_PROPERTY).as_str().unwrap().to_string()
    }

    fn fill_opacity(styled: &StyledTiles, index: usize) -> f64 {
        prop(styled, index, FILL_OPACITY_PROPERTY).as_f64().unwrap()
    }

    fn six_bucket_ctx() -> ImpactContext {
        let mut palettes = PaletteRegistry::embedded();
        palettes.insert(
            TileAttribute::Population,
            Palette::from_buckets(["#p0", "#p1", "#p2", "#p3", "#p4", "#p5"]),
        );
        ImpactContext::new(palettes)
    }

    fn data(outcome: Outcome<StyledTiles>) -> StyledTiles {
        match outcome {
            Outcome::Data(styled) => styled,
            other => panic!("expected styled data, got {other:?}"),
        }
    }

    #[test]
    fn population_zero_and_missing_are_transparent() {
        let ctx = six_bucket_ctx();
        let tiles = batch("population", &[Some(0.0), Some(2500.0), None]);
        let styled = data(classify(&ctx, &tiles, TileAttribute::Population));

        assert!(styled.has_data);
        assert_eq!(color(&styled, 0), TRANSPARENT);
        assert!(fill_opacity(&styled, 0).abs() < f64::EPSILON);
        assert_eq!(color(&styled, 1), "#p5");
        assert!((fill_opacity(&styled, 1) - FILLED_OPACITY).abs() < f64::EPSILON);
        assert_eq!(color(&styled, 2), TRANSPARENT);
        assert!(fill_opacity(&styled, 2).abs() < f64::EPSILON);
    }

    #[test]
    fn population_equal_width_buckets() {
        let ctx = six_bucket_ctx();
        // width = 600 / 6 = 100
        let tiles = batch(
            "population",
            &[Some(1.0), Some(99.0), Some(100.0), Some(350.0), Some(599.0), Some(600.0)],
        );
        let styled = data(classify(&ctx, &tiles, TileAttribute::Population));
        let colors: Vec<String> = (0..6).map(|i| color(&styled, i)).collect();
        assert_eq!(colors, ["#p0", "#p0", "#p1", "#p3", "#p5", "#p5"]);
    }

    #[test]
    fn every_tile_gets_stroke_styling() {
        let ctx = ImpactContext::default();
        let tiles = batch("population", &[Some(0.0), Some(5.0)]);
        let styled = data(classify(&ctx, &tiles, TileAttribute::Population));
        for i in 0..2 {
            assert_eq!(prop(&styled, i, WEIGHT_PROPERTY).as_u64(), Some(1));
            assert!((prop(&styled, i, OPACITY_PROPERTY).as_f64().unwrap() - 0.8).abs() < 1e-12);
        }
    }

    #[test]
    fn all_zero_batch_is_transparent() {
        let ctx = ImpactContext::default();
        let tiles = batch("E_population", &[Some(0.0), Some(0.0)]);
        let styled = data(classify(&ctx, &tiles, TileAttribute::ExpectedPopulation));
        assert_eq!(color(&styled, 0), TRANSPARENT);
        assert_eq!(color(&styled, 1), TRANSPARENT);
    }

    #[test]
    fn probability_domain_is_fixed() {
        let ctx = ImpactContext::default();
        let low = batch("probability", &[Some(0.05), Some(0.1)]);
        let high = batch("probability", &[Some(0.05), Some(0.9)]);
        let low = data(classify(&ctx, &low, TileAttribute::Probability));
        let high = data(classify(&ctx, &high, TileAttribute::Probability));

        // 0.05 lands in the first of ten 0.1-wide buckets regardless of
        // the batch maximum.
        assert_eq!(color(&low, 0), "#ffffcc");
        assert_eq!(color(&low, 0), color(&high, 0));
        // A batch maximum of 0.1 is not stretched to the top colour.
        assert_eq!(color(&low, 1), "#ffeda0");
        assert_eq!(color(&high, 1), "#800026");
    }

    #[test]
    fn probability_zero_is_transparent() {
        let ctx = ImpactContext::default();
        let tiles = batch("probability", &[Some(0.0), Some(1.0)]);
        let styled = data(classify(&ctx, &tiles, TileAttribute::Probability));
        assert_eq!(color(&styled, 0), TRANSPARENT);
        assert_eq!(color(&styled, 1), "#800026");
    }

    #[test]
    fn rwi_zero_is_the_middle_colour() {
        let ctx = ImpactContext::default();
        let tiles = batch("rwi", &[Some(-1.0), Some(0.0), Some(1.0), None]);
        let styled = data(classify(&ctx, &tiles, TileAttribute::RelativeWealthIndex));

        assert_eq!(color(&styled, 0), "#d73027");
        assert_eq!(color(&styled, 1), "#808080");
        assert!((fill_opacity(&styled, 1) - FILLED_OPACITY).abs() < f64::EPSILON);
        assert_eq!(color(&styled, 2), "#1a9850");
        assert_eq!(color(&styled, 3), TRANSPARENT);
    }

    #[test]
    fn rwi_out_of_range_clamps() {
        let ctx = ImpactContext::default();
        let tiles = batch("rwi", &[Some(-3.0), Some(2.5)]);
        let styled = data(classify(&ctx, &tiles, TileAttribute::RelativeWealthIndex));
        assert_eq!(color(&styled, 0), "#d73027");
        assert_eq!(color(&styled, 1), "#1a9850");
    }

    #[test]
    fn rwi_all_zero_still_coloured() {
        let ctx = ImpactContext::default();
        let tiles = batch("rwi", &[Some(0.0), Some(0.0)]);
        let styled = data(classify(&ctx, &tiles, TileAttribute::RelativeWealthIndex));
        assert_eq!(color(&styled, 0), "#808080");
    }

    #[test]
    fn settlement_classes() {
        let ctx = ImpactContext::default();
        let tiles = batch(
            "smod_class",
            &[Some(0.0), Some(10.0), Some(20.0), Some(30.0), Some(15.0), Some(-10.0), None],
        );
        let styled = data(classify(&ctx, &tiles, TileAttribute::SettlementClass));
        let colors: Vec<String> = (0..7).map(|i| color(&styled, i)).collect();
        assert_eq!(
            colors,
            [TRANSPARENT, "#dda0dd", "#9370db", "#4b0082", TRANSPARENT, TRANSPARENT, TRANSPARENT]
        );
        assert!(fill_opacity(&styled, 4).abs() < f64::EPSILON);
    }

    #[test]
    fn classification_is_deterministic_and_non_mutating() {
        let ctx = ImpactContext::default();
        let tiles = batch("population", &[Some(3.0), Some(40.0), None]);
        let before = tiles.clone();
        let first = classify(&ctx, &tiles, TileAttribute::Population);
        let second = classify(&ctx, &tiles, TileAttribute::Population);
        assert_eq!(first, second);
        assert_eq!(tiles, before);
    }

    #[test]
    fn cache_key_is_of_the_input() {
        let ctx = ImpactContext::default();
        let tiles = batch("population", &[Some(3.0), Some(40.0)]);
        let styled = data(classify(&ctx, &tiles, TileAttribute::Population));
        assert_eq!(styled.cache_key, Some(cache_key(&tiles).unwrap()));
    }

    #[test]
    fn empty_batch_is_empty_outcome() {
        let ctx = ImpactContext::default();
        let tiles = batch("population", &[]);
        let outcome = classify(&ctx, &tiles, TileAttribute::Population);
        assert!(outcome.is_empty());

        let fallback = outcome.into_value_or_default();
        assert!(!fallback.has_data);
        assert!(fallback.collection.features.is_empty());
        assert!(fallback.cache_key.is_none());
    }

    #[test]
    fn malformed_json_is_empty_outcome() {
        let ctx = ImpactContext::default();
        let no_features = serde_json::json!({ "type": "FeatureCollection" });
        let not_object = serde_json::json!([1, 2, 3]);
        assert!(classify_json(&ctx, &no_features, TileAttribute::Population).is_empty());
        assert!(classify_json(&ctx, &not_object, TileAttribute::Population).is_empty());
        assert!(classify_json(&ctx, &JsonValue::Null, TileAttribute::Population).is_empty());
    }

    #[test]
    fn json_batch_without_collection_type_is_classified() {
        let ctx = ImpactContext::default();
        let tiles = serde_json::json!({
            "features": [{
                "type": "Feature",
                "geometry": null,
                "properties": { "population": 5 },
            }],
        });
        let styled = data(classify_json(&ctx, &tiles, TileAttribute::Population));
        assert!(styled.has_data);
        assert_eq!(color(&styled, 0), "#011129");
    }

    #[test]
    fn json_feature_without_geometry_is_classified() {
        let ctx = ImpactContext::default();
        let tiles = serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "population": 10 } },
                { "properties": { "population": 0 }, "id": 2 },
            ],
        });
        let styled = data(classify_json(&ctx, &tiles, TileAttribute::Population));
        assert_eq!(styled.collection.features.len(), 2);
        assert!(styled.collection.features[0].geometry.is_none());
        assert_eq!(color(&styled, 0), "#011129");
        assert_eq!(color(&styled, 1), TRANSPARENT);
    }

    #[test]
    fn unreadable_json_feature_degrades() {
        let ctx = ImpactContext::default();
        let tiles = serde_json::json!({ "features": [42] });
        let outcome = classify_json(&ctx, &tiles, TileAttribute::Population);

        assert!(outcome.is_degraded());
        assert!(outcome.reason().unwrap().contains("Tile 0 is malformed"));
        let styled = outcome.into_value_or_default();
        assert!(styled.has_data);
        assert!(styled.collection.features.is_empty());
    }

    #[test]
    fn json_batch_is_classified() {
        let ctx = ImpactContext::default();
        let tiles = serde_json::to_value(batch("population", &[Some(5.0)])).unwrap();
        let outcome = classify_json(&ctx, &tiles, TileAttribute::Population);
        assert!(outcome.is_data());
    }

    #[test]
    fn absent_attribute_degrades_to_unstyled() {
        let ctx = ImpactContext::default();
        let tiles = batch("population", &[Some(5.0)]);
        let outcome = classify(&ctx, &tiles, TileAttribute::RelativeWealthIndex);

        assert!(outcome.is_degraded());
        let styled = outcome.into_value_or_default();
        assert!(styled.has_data);
        assert_eq!(styled.collection, tiles);
        assert!(styled.cache_key.is_some());
    }

    #[test]
    fn non_numeric_value_degrades() {
        let ctx = ImpactContext::default();
        let tiles: FeatureCollection = serde_json::from_value(serde_json::json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": null,
                "properties": { "population": "many" },
            }],
        }))
        .unwrap();
        let outcome = classify(&ctx, &tiles, TileAttribute::Population);
        assert!(outcome.reason().unwrap().contains("non-numeric"));
    }

    #[test]
    fn unknown_attribute_name_degrades() {
        let ctx = ImpactContext::default();
        let tiles = batch("population", &[Some(5.0)]);
        let outcome = classify_named(&ctx, &tiles, "num_schools");
        assert!(outcome.is_degraded());

        let named = classify_named(&ctx, &tiles, "population");
        assert_eq!(named, classify(&ctx, &tiles, TileAttribute::Population));
    }

    #[test]
    fn missing_palette_degrades() {
        let ctx = ImpactContext::new(PaletteRegistry::default());
        let tiles = batch("population", &[Some(5.0)]);
        assert!(classify(&ctx, &tiles, TileAttribute::Population).is_degraded());
    }
}
