//! Palette registry and the immutable rendering context.
//!
//! Palettes are defined in TOML. The default set is embedded at compile
//! time from `palettes/default.toml`; callers may layer their own TOML
//! on top with [`PaletteRegistry::merge`]. The registry and the tile zoom
//! level are bundled into an [`ImpactContext`] that is built once at
//! startup and passed by reference into every operation.

use std::collections::BTreeMap;
use std::str::FromStr as _;

use serde::Deserialize;
use storm_impact_forecast_models::DEFAULT_ZOOM_LEVEL;
use storm_impact_tiles_models::{Palette, TileAttribute};

use crate::TilesError;

const DEFAULT_PALETTES_TOML: &str = include_str!("../palettes/default.toml");

/// On-disk palette file layout.
#[derive(Debug, Deserialize)]
struct PaletteFile {
    #[serde(default)]
    palettes: BTreeMap<String, PaletteDef>,
}

#[derive(Debug, Deserialize)]
struct PaletteDef {
    colors: Vec<String>,
}

/// Colour palettes keyed by tile attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaletteRegistry {
    palettes: BTreeMap<TileAttribute, Palette>,
}

impl PaletteRegistry {
    /// Parses palettes from TOML. Each `[palettes.<attribute>]` table lists
    /// its coloured buckets; the transparent entry is prepended.
    ///
    /// # Errors
    ///
    /// Returns [`TilesError::Toml`] if the TOML is malformed, or
    /// [`TilesError::UnknownAttribute`] if a table names an unknown
    /// attribute.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, TilesError> {
        let file: PaletteFile = toml::de::from_str(toml_str)?;
        let palettes = file
            .palettes
            .into_iter()
            .map(|(name, def)| {
                let attribute = TileAttribute::from_str(&name)
                    .map_err(|_| TilesError::UnknownAttribute { name })?;
                Ok((attribute, Palette::from_buckets(def.colors)))
            })
            .collect::<Result<_, TilesError>>()?;
        Ok(Self { palettes })
    }

    /// Returns the palettes embedded in the binary.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML fails to parse. It is a compile-time
    /// constant, so a failure is a development error caught by the tests.
    #[must_use]
    pub fn embedded() -> Self {
        Self::from_toml_str(DEFAULT_PALETTES_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded palettes: {e}"))
    }

    /// Overrides palettes in `self` with those defined in `other`.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        self.palettes.extend(other.palettes);
        self
    }

    /// Looks up the palette for an attribute.
    #[must_use]
    pub fn get(&self, attribute: TileAttribute) -> Option<&Palette> {
        self.palettes.get(&attribute)
    }

    /// Inserts or replaces a palette.
    pub fn insert(&mut self, attribute: TileAttribute, palette: Palette) {
        self.palettes.insert(attribute, palette);
    }

    /// Number of registered palettes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.palettes.len()
    }

    /// Whether no palette is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.palettes.is_empty()
    }
}

/// Everything the tile operations need besides the batch itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpactContext {
    /// Palettes by attribute.
    pub palettes: PaletteRegistry,
    /// Zoom level of the mercator tile views.
    pub zoom_level: u8,
}

impl ImpactContext {
    /// Creates a context with the given palettes at the default zoom.
    #[must_use]
    pub const fn new(palettes: PaletteRegistry) -> Self {
        Self {
            palettes,
            zoom_level: DEFAULT_ZOOM_LEVEL,
        }
    }

    /// Returns the palette for `attribute`.
    ///
    /// # Errors
    ///
    /// Returns [`TilesError::MissingPalette`] if none is registered, or
    /// [`TilesError::EmptyPalette`] if it has no coloured buckets.
    pub fn palette(&self, attribute: TileAttribute) -> Result<&Palette, TilesError> {
        let palette = self
            .palettes
            .get(attribute)
            .ok_or(TilesError::MissingPalette { attribute })?;
        if palette.bucket_count() == 0 {
            return Err(TilesError::EmptyPalette { attribute });
        }
        Ok(palette)
    }
}

impl Default for ImpactContext {
    fn default() -> Self {
        Self::new(PaletteRegistry::embedded())
    }
}
