#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Forecast selection, wind threshold and ensemble track types.
//!
//! A user picks a country, storm, forecast issue time and wind threshold;
//! everything downstream (tiles, tracks, envelopes) is keyed by that
//! [`Selection`]. Track tables are delivered by upstream collaborators
//! as rows of [`TrackRow`] (per-member severities) and [`TrackSample`]
//! (per-member trajectory points).

pub mod format;
mod outcome;
pub mod threshold;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use outcome::Outcome;
pub use threshold::{ThresholdOption, WindThreshold, default_threshold, threshold_options};

/// Identifier of one ensemble realization of a forecast track.
pub type MemberId = u32;

/// Member ids reserved for the deterministic control runs.
pub const CONTROL_MEMBERS: [MemberId; 2] = [51, 52];

/// Zoom level of the mercator tile views.
pub const DEFAULT_ZOOM_LEVEL: u8 = 15;

/// Whether a track realization is a control run or a perturbed member.
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
pub enum MemberKind {
    /// Control realization (ids 51 and 52).
    Control,
    /// Perturbed ensemble realization.
    Ensemble,
}

impl MemberKind {
    /// Classifies a member id.
    #[must_use]
    pub fn of(member: MemberId) -> Self {
        if CONTROL_MEMBERS.contains(&member) {
            Self::Control
        } else {
            Self::Ensemble
        }
    }
}

/// The (country, storm, issue time, threshold) tuple every data batch is
/// keyed by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    /// ISO3 country code (e.g. `"NIC"`).
    pub country: String,
    /// Storm identifier (e.g. `"MELISSA"`).
    pub storm: String,
    /// Forecast issue date, `YYYY-MM-DD`.
    pub forecast_date: String,
    /// Forecast issue time, `HH:MM`.
    pub forecast_time: String,
    /// Wind threshold the envelopes were computed at.
    pub wind_threshold: WindThreshold,
}

impl Selection {
    /// Parses the forecast issue date and time.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidForecastTimeError`] if the date is not `YYYY-MM-DD`
    /// or the time is not `HH:MM`.
    pub fn issued_at(&self) -> Result<NaiveDateTime, InvalidForecastTimeError> {
        let raw = format!("{} {}", self.forecast_date, self.forecast_time);
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M")
            .map_err(|_| InvalidForecastTimeError { value: raw })
    }

    /// Issue time as the compact `YYYYMMDDHHMMSS` stamp used in view file
    /// names.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidForecastTimeError`] if the date or time is malformed.
    pub fn forecast_stamp(&self) -> Result<String, InvalidForecastTimeError> {
        Ok(self.issued_at()?.format("%Y%m%d%H%M%S").to_string())
    }

    /// `{country}_{storm}_{stamp}_{threshold}`, shared by every view of
    /// this selection.
    fn view_stem(&self) -> Result<String, InvalidForecastTimeError> {
        Ok(format!(
            "{}_{}_{}_{}",
            self.country,
            self.storm,
            self.forecast_stamp()?,
            self.wind_threshold
        ))
    }

    /// File name of the tile impact view for this selection.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidForecastTimeError`] if the date or time is malformed.
    pub fn tiles_view_name(&self, zoom_level: u8) -> Result<String, InvalidForecastTimeError> {
        Ok(format!("{}_{zoom_level}.csv", self.view_stem()?))
    }

    /// File name of the per-member track severity view, materialized as
    /// CSV.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidForecastTimeError`] if the date or time is malformed.
    pub fn tracks_view_name(&self) -> Result<String, InvalidForecastTimeError> {
        Ok(format!("{}.csv", self.view_stem()?))
    }

    /// File name of the health-centre impact view. Only its presence is
    /// consulted: it decides whether health-centre severities are
    /// reported.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidForecastTimeError`] if the date or time is malformed.
    pub fn health_view_name(&self) -> Result<String, InvalidForecastTimeError> {
        Ok(format!("{}.parquet", self.view_stem()?))
    }
}

/// Error returned when a [`Selection`] carries an unparseable issue time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidForecastTimeError {
    /// The combined `date time` string that failed to parse.
    pub value: String,
}

impl std::fmt::Display for InvalidForecastTimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid forecast time '{}': expected YYYY-MM-DD HH:MM",
            self.value
        )
    }
}

impl std::error::Error for InvalidForecastTimeError {}

/// Aggregate severities of one ensemble member inside one spatial zone.
///
/// Upstream views name the member column either `zone_id` or
/// `ensemble_member`. Every severity is optional; a column that no row
/// carries is reported as unavailable downstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackRow {
    /// Ensemble member id.
    #[serde(
        rename = "zone_id",
        alias = "ensemble_member",
        deserialize_with = "deserialize_member"
    )]
    pub member: MemberId,
    /// Wind threshold in knots.
    #[serde(default)]
    pub wind_threshold: Option<u16>,
    /// People inside the envelope.
    #[serde(default)]
    pub severity_population: Option<f64>,
    /// School-age children inside the envelope.
    #[serde(default)]
    pub severity_school_age_population: Option<f64>,
    /// Infants inside the envelope.
    #[serde(default)]
    pub severity_infant_population: Option<f64>,
    /// Schools inside the envelope.
    #[serde(default)]
    pub severity_schools: Option<f64>,
    /// Health centres inside the envelope.
    #[serde(default)]
    pub severity_hcs: Option<f64>,
    /// Built surface inside the envelope, in square metres.
    #[serde(default)]
    pub severity_built_surface_m2: Option<f64>,
}

/// Reads a member id written either as an integer or as an integral float
/// (`3.0`), as float-typed table exports produce.
fn deserialize_member<'de, D>(deserializer: D) -> Result<MemberId, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct MemberVisitor;

    impl serde::de::Visitor<'_> for MemberVisitor {
        type Value = MemberId;

        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("a non-negative integral member id")
        }

        fn visit_u64<E: serde::de::Error>(self, value: u64) -> Result<MemberId, E> {
            MemberId::try_from(value)
                .map_err(|_| E::custom(format!("member id {value} out of range")))
        }

        fn visit_i64<E: serde::de::Error>(self, value: i64) -> Result<MemberId, E> {
            MemberId::try_from(value)
                .map_err(|_| E::custom(format!("member id {value} out of range")))
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::float_cmp)]
        fn visit_f64<E: serde::de::Error>(self, value: f64) -> Result<MemberId, E> {
            if value.fract() != 0.0 || !(0.0..=f64::from(MemberId::MAX)).contains(&value) {
                return Err(E::custom(format!("member id {value} is not a whole number")));
            }
            Ok(value as MemberId)
        }

        fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<MemberId, E> {
            let value: f64 = value
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid member id '{value}'")))?;
            self.visit_f64(value)
        }
    }

    deserializer.deserialize_any(MemberVisitor)
}

/// The severity rows of one selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackBatch {
    /// Per-member, per-zone severity rows.
    pub rows: Vec<TrackRow>,
    /// Whether the companion health-centre view exists for this
    /// selection. Health-centre and built-surface severities are only
    /// reported when it does.
    pub health_data_available: bool,
}

impl TrackBatch {
    /// Creates a batch with health-centre data available.
    #[must_use]
    pub const fn new(rows: Vec<TrackRow>) -> Self {
        Self {
            rows,
            health_data_available: true,
        }
    }
}

/// One trajectory point of one ensemble member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSample {
    /// Ensemble member id.
    #[serde(
        rename = "ENSEMBLE_MEMBER",
        alias = "ensemble_member",
        deserialize_with = "deserialize_member"
    )]
    pub member: MemberId,
    /// Valid time of the sample (ISO 8601).
    #[serde(rename = "VALID_TIME", alias = "valid_time")]
    pub valid_time: String,
    /// Hours since the forecast issue time.
    #[serde(rename = "LEAD_TIME", alias = "lead_time")]
    pub lead_time: f64,
    /// Latitude in degrees.
    #[serde(rename = "LATITUDE", alias = "latitude")]
    pub latitude: f64,
    /// Longitude in degrees.
    #[serde(rename = "LONGITUDE", alias = "longitude")]
    pub longitude: f64,
    /// Maximum sustained wind, in knots.
    #[serde(rename = "WIND_SPEED_KNOTS", alias = "wind_speed_knots", default)]
    pub wind_speed_knots: Option<f64>,
    /// Central pressure, in hPa.
    #[serde(rename = "PRESSURE_HPA", alias = "pressure_hpa", default)]
    pub pressure_hpa: Option<f64>,
}
