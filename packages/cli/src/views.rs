//! Locating the materialized views of one forecast selection.
//!
//! Views live under a single directory, one folder per kind:
//!
//! ```text
//! <views-dir>/mercator_views/{country}_{storm}_{stamp}_{threshold}_{zoom}.csv
//! <views-dir>/track_views/{country}_{storm}_{stamp}_{threshold}.csv
//! <views-dir>/hc_views/{country}_{storm}_{stamp}_{threshold}.parquet
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr as _;

use clap::Args;
use storm_impact_forecast_models::{
    DEFAULT_ZOOM_LEVEL, InvalidForecastTimeError, Selection, WindThreshold,
};

const TILES_DIR: &str = "mercator_views";
const TRACKS_DIR: &str = "track_views";
const HEALTH_DIR: &str = "hc_views";

/// Arguments naming one forecast selection and where its views live.
#[derive(Debug, Clone, Args)]
pub struct ViewArgs {
    /// Directory holding the `mercator_views`, `track_views` and `hc_views` folders
    #[arg(long)]
    pub views_dir: PathBuf,
    /// ISO3 country code (e.g. `NIC`)
    #[arg(long)]
    pub country: String,
    /// Storm identifier (e.g. `MELISSA`)
    #[arg(long)]
    pub storm: String,
    /// Forecast issue date, `YYYY-MM-DD`
    #[arg(long)]
    pub date: String,
    /// Forecast issue time, `HH:MM`
    #[arg(long)]
    pub time: String,
    /// Wind threshold in knots
    #[arg(long, value_parser = parse_threshold, default_value = "50")]
    pub threshold: WindThreshold,
    /// Zoom level of the mercator tile views
    #[arg(long, default_value_t = DEFAULT_ZOOM_LEVEL)]
    pub zoom_level: u8,
}

impl ViewArgs {
    /// The selection these arguments describe.
    #[must_use]
    pub fn selection(&self) -> Selection {
        Selection {
            country: self.country.clone(),
            storm: self.storm.clone(),
            forecast_date: self.date.clone(),
            forecast_time: self.time.clone(),
            wind_threshold: self.threshold,
        }
    }
}

/// Paths of every view of one selection. None of them need to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewPaths {
    /// Tabular tile view carrying the raw and `E_*` columns.
    pub tiles: PathBuf,
    /// Per-member track severity view.
    pub tracks: PathBuf,
    /// Health-centre view; only its presence matters.
    pub health: PathBuf,
}

impl ViewPaths {
    /// Resolves the view paths of `selection` under `views_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidForecastTimeError`] if the selection's issue time
    /// is malformed.
    pub fn resolve(
        views_dir: &Path,
        selection: &Selection,
        zoom_level: u8,
    ) -> Result<Self, InvalidForecastTimeError> {
        Ok(Self {
            tiles: views_dir
                .join(TILES_DIR)
                .join(selection.tiles_view_name(zoom_level)?),
            tracks: views_dir
                .join(TRACKS_DIR)
                .join(selection.tracks_view_name()?),
            health: views_dir
                .join(HEALTH_DIR)
                .join(selection.health_view_name()?),
        })
    }

    /// Whether the health-centre view exists for this selection.
    #[must_use]
    pub fn health_data_available(&self) -> bool {
        self.health.exists()
    }
}

/// Parses a wind threshold given in knots.
///
/// # Errors
///
/// Returns a message listing the known thresholds if `value` is not one.
pub fn parse_threshold(value: &str) -> Result<WindThreshold, String> {
    WindThreshold::from_str(value.trim()).map_err(|_| {
        let known: Vec<String> = WindThreshold::all()
            .iter()
            .map(ToString::to_string)
            .collect();
        format!(
            "unknown wind threshold '{value}' (expected one of {})",
            known.join(", ")
        )
    })
}
