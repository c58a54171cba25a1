#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Impact tile classification into choropleth colour buckets.
//!
//! Takes an already-loaded tile batch (a `GeoJSON` feature collection whose
//! features carry flat numeric exposure attributes) and attaches
//! per-tile `_color`, `_fillOpacity`, `_weight` and `_opacity` properties
//! for one selected attribute. Bucketing follows the attribute's
//! [`AttributeClass`](storm_impact_tiles_models::AttributeClass).
//!
//! Nothing here performs I/O. Failures never escape as errors: every
//! public operation returns an [`Outcome`](storm_impact_forecast_models::Outcome).

pub mod cache;
pub mod classify;
pub mod context;
pub mod facilities;
pub mod legend;

use storm_impact_tiles_models::TileAttribute;
use thiserror::Error;

pub use cache::cache_key;
pub use classify::{classify, classify_json, classify_named};
pub use context::{ImpactContext, PaletteRegistry};
pub use facilities::style_facilities;
pub use legend::{legend_range, legend_swatches};

/// Errors that can occur while styling a tile batch.
#[derive(Debug, Error)]
pub enum TilesError {
    /// Palette configuration could not be parsed.
    #[error("Palette config error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Tile batch could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No palette is registered for the attribute.
    #[error("No palette registered for '{attribute}'")]
    MissingPalette {
        /// Attribute that was requested.
        attribute: TileAttribute,
    },

    /// The attribute's palette has no coloured buckets.
    #[error("Palette for '{attribute}' has no colours")]
    EmptyPalette {
        /// Attribute whose palette is empty.
        attribute: TileAttribute,
    },

    /// No tile in the batch carries the attribute.
    #[error("Attribute '{attribute}' is absent from the tile batch")]
    AttributeAbsent {
        /// Attribute that was requested.
        attribute: TileAttribute,
    },

    /// A tile carries a non-numeric value for the attribute.
    #[error("Tile {index} has a non-numeric '{attribute}' value: {value}")]
    NonNumeric {
        /// Attribute that was requested.
        attribute: TileAttribute,
        /// Position of the offending feature in the batch.
        index: usize,
        /// The offending value.
        value: String,
    },

    /// A feature of a raw tile batch could not be read.
    #[error("Tile {index} is malformed: {reason}")]
    MalformedFeature {
        /// Position of the offending feature in the batch.
        index: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// The attribute name is not a recognized tile attribute.
    #[error("Unknown tile attribute '{name}'")]
    UnknownAttribute {
        /// Name that failed to resolve.
        name: String,
    },
}
