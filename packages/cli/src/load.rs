//! Reading already-materialized tile and track files.

use std::path::Path;

use geojson::{Feature, FeatureCollection, JsonObject, JsonValue};
use serde::de::DeserializeOwned;
use storm_impact_tiles::{PaletteRegistry, TilesError};
use thiserror::Error;

/// Errors that can occur while loading CLI inputs or writing output.
#[derive(Debug, Error)]
pub enum CliError {
    /// A file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A CSV file could not be opened or its headers parsed.
    #[error("Failed to parse CSV {path}: {source}")]
    Csv {
        /// Path that failed.
        path: String,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// A JSON file could not be parsed.
    #[error("Failed to parse JSON {path}: {source}")]
    Json {
        /// Path that failed.
        path: String,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// A palette file was invalid.
    #[error(transparent)]
    Tiles(#[from] TilesError),

    /// Output could not be serialized.
    #[error("Failed to serialize output: {0}")]
    Output(#[from] serde_json::Error),
}

fn read_to_string(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|e| CliError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

/// Reads and deserializes a JSON file.
///
/// # Errors
///
/// Returns [`CliError::Io`] or [`CliError::Json`] if the file is
/// unreadable or does not deserialize into `T`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let content = read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| CliError::Json {
        path: path.display().to_string(),
        source: e,
    })
}

/// Reads every well-formed row of a CSV file. Malformed rows are skipped.
///
/// A missing file yields no rows: companion views are routinely absent
/// for a forecast cycle.
///
/// # Errors
///
/// Returns [`CliError::Csv`] if the file exists but cannot be opened or
/// its header row is unreadable.
pub fn read_csv_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, CliError> {
    if !path.exists() {
        log::warn!("File not found: {}", path.display());
        return Ok(vec![]);
    }

    let csv_error = |e| CliError::Csv {
        path: path.display().to_string(),
        source: e,
    };
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;
    reader.headers().map_err(csv_error)?;

    let mut rows = Vec::new();
    let mut skipped = 0u64;
    for result in reader.deserialize::<T>() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                log::trace!("  skipping malformed row: {e}");
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} malformed rows in {}", path.display());
    }
    log::info!("Loaded {} rows from {}", rows.len(), path.display());

    Ok(rows)
}

/// Reads a tabular tile view as a collection of geometry-less features,
/// one per row, keyed by the header names.
///
/// Empty cells become `null`, numeric cells numbers (integers stay
/// integers), and anything else a string. A missing file yields an empty
/// collection.
///
/// # Errors
///
/// Returns [`CliError::Csv`] if the file exists but cannot be opened or
/// its header row is unreadable.
pub fn read_csv_features(path: &Path) -> Result<FeatureCollection, CliError> {
    let mut collection = FeatureCollection {
        bbox: None,
        features: vec![],
        foreign_members: None,
    };
    if !path.exists() {
        log::warn!("File not found: {}", path.display());
        return Ok(collection);
    }

    let csv_error = |e| CliError::Csv {
        path: path.display().to_string(),
        source: e,
    };
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;
    let headers = reader.headers().map_err(csv_error)?.clone();

    let mut skipped = 0u64;
    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                log::trace!("  skipping malformed row: {e}");
                skipped += 1;
                continue;
            }
        };
        let properties: JsonObject = headers
            .iter()
            .zip(record.iter())
            .map(|(name, cell)| (name.to_string(), cell_value(cell)))
            .collect();
        collection.features.push(Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: Some(properties),
            foreign_members: None,
        });
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} malformed rows in {}", path.display());
    }
    log::info!(
        "Loaded {} tiles from {}",
        collection.features.len(),
        path.display()
    );

    Ok(collection)
}

fn cell_value(cell: &str) -> JsonValue {
    let cell = cell.trim();
    if cell.is_empty() {
        return JsonValue::Null;
    }
    if let Ok(value) = cell.parse::<i64>() {
        return value.into();
    }
    // Non-finite floats map to `null`.
    if let Ok(value) = cell.parse::<f64>() {
        return value.into();
    }
    JsonValue::String(cell.to_string())
}

/// Loads the embedded palettes, overridden by `path` when given.
///
/// # Errors
///
/// Returns [`CliError::Io`] if the file is unreadable, or
/// [`CliError::Tiles`] if it is not a valid palette file.
pub fn load_palettes(path: Option<&Path>) -> Result<PaletteRegistry, CliError> {
    let embedded = PaletteRegistry::embedded();
    let Some(path) = path else {
        return Ok(embedded);
    };
    let overrides = PaletteRegistry::from_toml_str(&read_to_string(path)?)?;
    log::info!(
        "Loaded {} palette override(s) from {}",
        overrides.len(),
        path.display()
    );
    Ok(embedded.merge(overrides))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use storm_impact_forecast_models::TrackRow;
    use storm_impact_tiles_models::TileAttribute;

    fn fixture_dir(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&tmp);
        std::fs::create_dir_all(&tmp).unwrap();
        tmp
    }

    #[test]
    fn missing_csv_yields_no_rows() {
        let tmp = fixture_dir("storm_impact_missing_csv");
        let rows: Vec<TrackRow> = read_csv_rows(&tmp.join("absent.csv")).unwrap();
        assert!(rows.is_empty());
        assert!(read_csv_features(&tmp.join("absent.csv")).unwrap().features.is_empty());
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn track_rows_accept_either_member_header() {
        let tmp = fixture_dir("storm_impact_member_headers");
        let by_zone = tmp.join("zone.csv");
        std::fs::write(
            &by_zone,
            "zone_id,wind_threshold,severity_population,severity_schools\n\
             3,50,120.5,2\n\
             4.0,50,80,\n",
        )
        .unwrap();
        let by_member = tmp.join("member.csv");
        std::fs::write(&by_member, "ensemble_member,severity_population\n51,10\n").unwrap();

        let rows: Vec<TrackRow> = read_csv_rows(&by_zone).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].member, 3);
        assert_eq!(rows[0].severity_population, Some(120.5));
        assert_eq!(rows[0].severity_schools, Some(2.0));
        assert_eq!(rows[1].member, 4);
        assert_eq!(rows[1].severity_schools, None);

        let rows: Vec<TrackRow> = read_csv_rows(&by_member).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].member, 51);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let tmp = fixture_dir("storm_impact_malformed_rows");
        let path = tmp.join("tracks.csv");
        std::fs::write(
            &path,
            "zone_id,severity_population\n\
             1,10\n\
             not-a-member,20\n\
             2,lots\n\
             3,30\n",
        )
        .unwrap();

        let rows: Vec<TrackRow> = read_csv_rows(&path).unwrap();
        let members: Vec<u32> = rows.iter().map(|row| row.member).collect();
        assert_eq!(members, [1, 3]);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn tile_cells_are_typed() {
        let tmp = fixture_dir("storm_impact_tile_cells");
        let path = tmp.join("tiles.csv");
        std::fs::write(
            &path,
            "tile_id,population,E_population,smod_class,name\n\
             7,120,3.5,,coast\n\
             8,,NaN,20,\n",
        )
        .unwrap();

        let tiles = read_csv_features(&path).unwrap();
        assert_eq!(tiles.features.len(), 2);

        let first = tiles.features[0].properties.as_ref().unwrap();
        assert!(tiles.features[0].geometry.is_none());
        assert_eq!(first["tile_id"], 7);
        assert_eq!(first["population"], 120);
        assert_eq!(first["E_population"], 3.5);
        assert!(first["smod_class"].is_null());
        assert_eq!(first["name"], "coast");

        let second = tiles.features[1].properties.as_ref().unwrap();
        assert!(second["population"].is_null());
        assert!(second["E_population"].is_null());
        assert_eq!(second["smod_class"], 20);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn palette_file_overrides_embedded() {
        let tmp = fixture_dir("storm_impact_palettes");
        let path = tmp.join("palettes.toml");
        std::fs::write(
            &path,
            "[palettes.population]\ncolors = [\"#000001\", \"#000002\"]\n",
        )
        .unwrap();

        let embedded = load_palettes(None).unwrap();
        let merged = load_palettes(Some(path.as_path())).unwrap();
        assert_eq!(merged.len(), embedded.len());
        assert_eq!(
            merged.get(TileAttribute::Population).unwrap().bucket_count(),
            2
        );
        assert_eq!(
            merged.get(TileAttribute::RelativeWealthIndex),
            embedded.get(TileAttribute::RelativeWealthIndex)
        );

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn invalid_palette_file_is_an_error() {
        let tmp = fixture_dir("storm_impact_bad_palettes");
        let unknown = tmp.join("unknown.toml");
        std::fs::write(&unknown, "[palettes.num_boats]\ncolors = [\"#000001\"]\n").unwrap();

        assert!(matches!(
            load_palettes(Some(unknown.as_path())),
            Err(CliError::Tiles(TilesError::UnknownAttribute { .. }))
        ));
        assert!(matches!(
            load_palettes(Some(tmp.join("absent.toml").as_path())),
            Err(CliError::Io { .. })
        ));

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
