#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Tile attribute taxonomy, palettes and styling types for impact tiles.
//!
//! Impact tiles are mercator grid cells carrying exposure attributes
//! (population, built surface, settlement class, wealth index, impact
//! probability, ...). Each attribute belongs to exactly one
//! [`AttributeClass`], which decides how raw values are bucketed into
//! [`Palette`] colours.

use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Property key holding a tile's fill colour.
pub const COLOR_PROPERTY: &str = "_color";
/// Property key holding a tile's fill opacity.
pub const FILL_OPACITY_PROPERTY: &str = "_fillOpacity";
/// Property key holding a tile's stroke weight.
pub const WEIGHT_PROPERTY: &str = "_weight";
/// Property key holding a tile's stroke opacity.
pub const OPACITY_PROPERTY: &str = "_opacity";
/// Property key holding a facility marker's radius.
pub const RADIUS_PROPERTY: &str = "_radius";

/// Colour name of the "no data" palette entry.
pub const TRANSPARENT: &str = "transparent";

/// Fill opacity of every coloured tile.
pub const FILLED_OPACITY: f64 = 0.7;
/// Stroke weight applied to every tile.
pub const STROKE_WEIGHT: u32 = 1;
/// Stroke opacity applied to every tile.
pub const STROKE_OPACITY: f64 = 0.8;

/// Prefix marking probability-weighted ("expected") attributes.
pub const EXPECTED_PREFIX: &str = "E_";

/// A tile attribute that can be rendered as a choropleth layer.
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
pub enum TileAttribute {
    /// Resident population.
    #[serde(rename = "population")]
    #[strum(serialize = "population")]
    Population,
    /// Probability-weighted population.
    #[serde(rename = "E_population")]
    #[strum(serialize = "E_population")]
    ExpectedPopulation,
    /// School-age population.
    #[serde(rename = "school_age_population")]
    #[strum(serialize = "school_age_population")]
    SchoolAgePopulation,
    /// Probability-weighted school-age population.
    #[serde(rename = "E_school_age_population")]
    #[strum(serialize = "E_school_age_population")]
    ExpectedSchoolAgePopulation,
    /// Infant population.
    #[serde(rename = "infant_population")]
    #[strum(serialize = "infant_population")]
    InfantPopulation,
    /// Probability-weighted infant population.
    #[serde(rename = "E_infant_population")]
    #[strum(serialize = "E_infant_population")]
    ExpectedInfantPopulation,
    /// Built-up surface in square metres.
    #[serde(rename = "built_surface_m2")]
    #[strum(serialize = "built_surface_m2")]
    BuiltSurface,
    /// Probability-weighted built-up surface.
    #[serde(rename = "E_built_surface_m2")]
    #[strum(serialize = "E_built_surface_m2")]
    ExpectedBuiltSurface,
    /// GHSL settlement model class, encoded in tens.
    #[serde(rename = "smod_class")]
    #[strum(serialize = "smod_class")]
    SettlementClass,
    /// Relative wealth index, roughly in `[-1, 1]`.
    #[serde(rename = "rwi")]
    #[strum(serialize = "rwi")]
    RelativeWealthIndex,
    /// Share of ensemble members whose envelope covers the tile.
    #[serde(rename = "probability")]
    #[strum(serialize = "probability")]
    Probability,
}

impl TileAttribute {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Population,
            Self::ExpectedPopulation,
            Self::SchoolAgePopulation,
            Self::ExpectedSchoolAgePopulation,
            Self::InfantPopulation,
            Self::ExpectedInfantPopulation,
            Self::BuiltSurface,
            Self::ExpectedBuiltSurface,
            Self::SettlementClass,
            Self::RelativeWealthIndex,
            Self::Probability,
        ]
    }

    /// The bucketing class of this attribute.
    #[must_use]
    pub const fn class(self) -> AttributeClass {
        match self {
            Self::SettlementClass => AttributeClass::Categorical,
            Self::RelativeWealthIndex => AttributeClass::SignedScale,
            Self::Probability => AttributeClass::UnitScale,
            Self::Population
            | Self::ExpectedPopulation
            | Self::SchoolAgePopulation
            | Self::ExpectedSchoolAgePopulation
            | Self::InfantPopulation
            | Self::ExpectedInfantPopulation
            | Self::BuiltSurface
            | Self::ExpectedBuiltSurface => AttributeClass::Adaptive,
        }
    }

    /// Whether this is a probability-weighted (`E_`-prefixed) attribute.
    #[must_use]
    pub fn is_expected(self) -> bool {
        self.as_ref().starts_with(EXPECTED_PREFIX)
    }
}

/// How an attribute's values map onto palette buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeClass {
    /// Fixed categories (settlement class).
    Categorical,
    /// Fixed `[-1, 1]` domain where zero is a real value (wealth index).
    SignedScale,
    /// Fixed `[0, 1]` domain (impact probability).
    UnitScale,
    /// Domain is the observed maximum of the batch (exposure counts).
    Adaptive,
}

/// GHSL settlement model classes, as stored in tile views.
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
pub enum SettlementClass {
    /// Raw value 10.
    Rural = 1,
    /// Raw value 20.
    UrbanCluster = 2,
    /// Raw value 30.
    UrbanCenter = 3,
}

impl SettlementClass {
    /// Decodes a raw class value. Only exact multiples of ten map to a
    /// class; `0` and anything else is "no data".
    #[must_use]
    #[allow(clippy::float_cmp, clippy::cast_possible_truncation)]
    pub fn from_raw(raw: f64) -> Option<Self> {
        if !raw.is_finite() || raw % 10.0 != 0.0 {
            return None;
        }
        match (raw / 10.0) as i64 {
            1 => Some(Self::Rural),
            2 => Some(Self::UrbanCluster),
            3 => Some(Self::UrbanCenter),
            _ => None,
        }
    }

    /// Zero-based index into the non-transparent palette colours.
    #[must_use]
    pub const fn bucket(self) -> usize {
        self as usize - 1
    }
}

/// An ordered colour ramp whose first entry is the transparent
/// "no data" colour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    /// Colours, transparent first.
    pub colors: Vec<String>,
}

impl Palette {
    /// Builds a palette from its non-transparent colours.
    #[must_use]
    pub fn from_buckets<I, S>(buckets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let colors = std::iter::once(TRANSPARENT.to_string())
            .chain(buckets.into_iter().map(Into::into))
            .collect();
        Self { colors }
    }

    /// The "no data" colour.
    #[must_use]
    pub fn transparent(&self) -> &str {
        self.colors.first().map_or(TRANSPARENT, String::as_str)
    }

    /// The non-transparent colours.
    #[must_use]
    pub fn buckets(&self) -> &[String] {
        self.colors.get(1..).unwrap_or_default()
    }

    /// Number of non-transparent colours.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets().len()
    }

    /// Colour of bucket `index`, or the transparent colour for `None`.
    #[must_use]
    pub fn color(&self, index: Option<usize>) -> &str {
        index
            .and_then(|i| self.buckets().get(i))
            .map_or_else(|| self.transparent(), String::as_str)
    }
}

/// Styling attached to one rendered tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileStyle {
    /// Fill colour.
    pub color: String,
    /// Fill opacity: `0.7` when coloured, `0` when transparent.
    pub fill_opacity: f64,
    /// Stroke weight.
    pub weight: u32,
    /// Stroke opacity.
    pub opacity: f64,
}

impl TileStyle {
    /// Style for a tile in bucket `index` of `palette` (`None` is
    /// transparent).
    #[must_use]
    pub fn for_bucket(palette: &Palette, index: Option<usize>) -> Self {
        let color = palette.color(index);
        let fill_opacity = if color == palette.transparent() {
            0.0
        } else {
            FILLED_OPACITY
        };
        Self {
            color: color.to_string(),
            fill_opacity,
            weight: STROKE_WEIGHT,
            opacity: STROKE_OPACITY,
        }
    }

    /// Whether this style renders nothing.
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.fill_opacity == 0.0
    }
}

/// A tile batch ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledTiles {
    /// The styled copy of the input batch.
    pub collection: FeatureCollection,
    /// Whether the batch has anything to render.
    pub has_data: bool,
    /// Content hash of the input batch. `None` means "leave the previous
    /// key unchanged".
    pub cache_key: Option<String>,
}

impl Default for StyledTiles {
    fn default() -> Self {
        Self {
            collection: FeatureCollection {
                bbox: None,
                features: vec![],
                foreign_members: None,
            },
            has_data: false,
            cache_key: None,
        }
    }
}

/// One colour block of a legend bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendSwatch {
    /// Block colour.
    pub color: String,
    /// Block width as a percentage of the bar.
    pub width_pct: f64,
}

/// End labels of a legend bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegendRange {
    /// Label under the first colour.
    pub min: String,
    /// Label under the last colour.
    pub max: String,
}

impl Default for LegendRange {
    fn default() -> Self {
        Self {
            min: "Min".to_string(),
            max: "Max".to_string(),
        }
    }
}

/// Point facilities whose impact views are drawn as markers.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FacilityKind {
    /// Schools.
    School,
    /// Health centres.
    HealthCenter,
}

impl FacilityKind {
    /// Marker colour for a facility with no impact probability.
    #[must_use]
    pub const fn idle_color(self) -> &'static str {
        match self {
            Self::School => "#ADD8E6",
            Self::HealthCenter => "#90EE90",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr as _;

    #[test]
    fn attribute_names_roundtrip() {
        for attribute in TileAttribute::all() {
            let name = attribute.to_string();
            assert_eq!(TileAttribute::from_str(&name).unwrap(), *attribute);
        }
        assert_eq!(
            TileAttribute::from_str("E_population").unwrap(),
            TileAttribute::ExpectedPopulation
        );
        assert!(TileAttribute::from_str("num_schools").is_err());
    }

    #[test]
    fn attribute_classes() {
        assert_eq!(
            TileAttribute::SettlementClass.class(),
            AttributeClass::Categorical
        );
        assert_eq!(
            TileAttribute::RelativeWealthIndex.class(),
            AttributeClass::SignedScale
        );
        assert_eq!(TileAttribute::Probability.class(), AttributeClass::UnitScale);
        for attribute in TileAttribute::all() {
            if attribute.is_expected() {
                assert_eq!(attribute.class(), AttributeClass::Adaptive);
            }
        }
    }

    #[test]
    fn settlement_class_decoding() {
        assert_eq!(SettlementClass::from_raw(0.0), None);
        assert_eq!(SettlementClass::from_raw(10.0), Some(SettlementClass::Rural));
        assert_eq!(
            SettlementClass::from_raw(20.0),
            Some(SettlementClass::UrbanCluster)
        );
        assert_eq!(
            SettlementClass::from_raw(30.0),
            Some(SettlementClass::UrbanCenter)
        );
        assert_eq!(SettlementClass::from_raw(15.0), None);
        assert_eq!(SettlementClass::from_raw(-10.0), None);
        assert_eq!(SettlementClass::from_raw(40.0), None);
        assert_eq!(SettlementClass::from_raw(f64::NAN), None);
    }

    #[test]
    fn palette_lookup() {
        let palette = Palette::from_buckets(["#111", "#222"]);
        assert_eq!(palette.bucket_count(), 2);
        assert_eq!(palette.color(None), TRANSPARENT);
        assert_eq!(palette.color(Some(1)), "#222");
        assert_eq!(palette.color(Some(5)), TRANSPARENT);

        let style = TileStyle::for_bucket(&palette, Some(0));
        assert!((style.fill_opacity - FILLED_OPACITY).abs() < f64::EPSILON);
        assert!(TileStyle::for_bucket(&palette, None).is_transparent());
    }
}
