#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Command-line driver for impact tile styling and scenario reduction.
//!
//! Works on views that upstream collaborators have already materialized.
//! Tile, track and health-centre views are located from a forecast
//! selection under `--views-dir`; facility views are `GeoJSON` files. All
//! results are printed to stdout; diagnostics go through `log` (set
//! `RUST_LOG=debug` for per-batch statistics).

mod load;
mod views;

use std::path::PathBuf;
use std::str::FromStr as _;

use clap::{Parser, Subcommand};
use geojson::{FeatureCollection, JsonValue};
use load::CliError;
use storm_impact_forecast_models::{
    Outcome, TrackBatch, TrackRow, TrackSample, WindThreshold, default_threshold,
    threshold_options,
};
use storm_impact_scenario::{member_options, reduce_scenarios, track_lines};
use storm_impact_scenario_models::ScenarioSummary;
use storm_impact_tiles::{
    ImpactContext, classify_named, legend_range, legend_swatches, style_facilities,
};
use storm_impact_tiles_models::{FacilityKind, StyledTiles, TileAttribute};
use views::{ViewArgs, ViewPaths, parse_threshold};

#[derive(Parser)]
#[command(name = "storm-impact", about = "Hurricane impact tile and scenario tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Style a selection's tile view by one attribute
    Classify {
        #[command(flatten)]
        view: ViewArgs,
        /// Attribute to colour by (e.g. `population`, `E_population`, `rwi`)
        #[arg(long)]
        attribute: String,
        /// TOML file overriding the embedded palettes
        #[arg(long)]
        palettes: Option<PathBuf>,
    },
    /// Convert a school or health-centre view to impact markers
    Facilities {
        /// `GeoJSON` facility view
        #[arg(long)]
        tiles: PathBuf,
        /// `school` or `health_center`
        #[arg(long, value_parser = parse_facility_kind, default_value = "school")]
        kind: FacilityKind,
    },
    /// Print a selection's low / expected / high impact summary
    Scenarios {
        #[command(flatten)]
        view: ViewArgs,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List ensemble members with their impact labels
    Members {
        /// CSV track severity view
        #[arg(long)]
        tracks: PathBuf,
    },
    /// Build one polyline per ensemble member
    Lines {
        /// CSV of per-member trajectory samples
        #[arg(long)]
        samples: PathBuf,
    },
    /// Show wind threshold options and the preselected threshold
    Thresholds {
        /// Thresholds with data, in knots (comma-separated)
        #[arg(long, value_delimiter = ',', value_parser = parse_threshold)]
        available: Vec<WindThreshold>,
        /// Currently selected threshold, in knots
        #[arg(long, value_parser = parse_threshold)]
        current: Option<WindThreshold>,
    },
}

fn parse_facility_kind(value: &str) -> Result<FacilityKind, String> {
    FacilityKind::from_str(value.trim()).map_err(|_| {
        format!("unknown facility kind '{value}' (expected school or health_center)")
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Classify {
            view,
            attribute,
            palettes,
        } => {
            let ctx = ImpactContext {
                palettes: load::load_palettes(palettes.as_deref())?,
                zoom_level: view.zoom_level,
            };
            let paths = ViewPaths::resolve(&view.views_dir, &view.selection(), ctx.zoom_level)?;
            let tiles = load::read_csv_features(&paths.tiles)?;
            print_json(&classify_view(&ctx, &tiles, &attribute)?)?;
        }
        Commands::Facilities { tiles, kind } => {
            let view: FeatureCollection = load::read_json(&tiles)?;
            let outcome = style_facilities(&view, kind);
            print_json(&styled_json(outcome))?;
        }
        Commands::Scenarios { view, json } => {
            let paths = ViewPaths::resolve(&view.views_dir, &view.selection(), view.zoom_level)?;
            let outcome = load_scenarios(&paths)?;
            if let Some(reason) = outcome.reason() {
                log::warn!("Scenario summary degraded: {reason}");
            }
            let summary = outcome.into_value_or_default();
            if json {
                print_json(&summary)?;
            } else {
                print_summary(&summary);
            }
        }
        Commands::Members { tracks } => {
            let rows: Vec<TrackRow> = load::read_csv_rows(&tracks)?;
            let options = member_options(&TrackBatch::new(rows));
            print_json(&options)?;
        }
        Commands::Lines { samples } => {
            let samples: Vec<TrackSample> = load::read_csv_rows(&samples)?;
            print_json(&track_lines(&samples))?;
        }
        Commands::Thresholds { available, current } => {
            let options = threshold_options(&available);
            let selected = default_threshold(&available, current);
            print_json(&serde_json::json!({
                "options": options,
                "selected": selected,
            }))?;
        }
    }

    Ok(())
}

/// Styles a tile view and attaches the attribute's legend.
fn classify_view(
    ctx: &ImpactContext,
    tiles: &FeatureCollection,
    name: &str,
) -> Result<JsonValue, CliError> {
    let mut output = styled_json(classify_named(ctx, tiles, name));
    let Ok(attribute) = TileAttribute::from_str(name) else {
        return Ok(output);
    };
    if let Ok(palette) = ctx.palette(attribute) {
        output["legend"] = serde_json::json!({
            "swatches": legend_swatches(palette),
            "range": serde_json::to_value(legend_range(tiles, attribute))?,
        });
    }
    Ok(output)
}

/// Loads a selection's track and tile views and reduces them. Health-centre
/// severities are only reported when the selection's health view exists.
fn load_scenarios(paths: &ViewPaths) -> Result<Outcome<ScenarioSummary>, CliError> {
    let rows: Vec<TrackRow> = load::read_csv_rows(&paths.tracks)?;
    let tiles = if paths.tiles.exists() {
        Some(load::read_csv_features(&paths.tiles)?)
    } else {
        log::warn!("No tile view at {}", paths.tiles.display());
        None
    };

    let health_data_available = paths.health_data_available();
    if !health_data_available {
        log::info!(
            "No health-centre view at {}; health metrics unavailable",
            paths.health.display()
        );
    }

    let batch = TrackBatch {
        rows,
        health_data_available,
    };
    Ok(reduce_scenarios(&batch, tiles.as_ref()))
}

fn styled_json(outcome: Outcome<StyledTiles>) -> JsonValue {
    let status = match &outcome {
        Outcome::Data(_) => "data",
        Outcome::Empty => "empty",
        Outcome::Degraded { .. } => "degraded",
    };
    let reason = outcome.reason().map(str::to_string);
    let styled = outcome.into_value_or_default();

    serde_json::json!({
        "status": status,
        "reason": reason,
        "hasData": styled.has_data,
        "cacheKey": styled.cache_key,
        "collection": styled.collection,
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_summary(summary: &ScenarioSummary) {
    let low = format!("Low ({})", summary.low_badge());
    let high = format!("High ({})", summary.high_badge());
    println!("{:<22}{low:>16}{:>16}{high:>16}", "Metric", "Expected");
    for row in &summary.rows {
        println!(
            "{:<22}{:>16}{:>16}{:>16}",
            row.metric.label(),
            row.low,
            row.expected,
            row.high,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storm_impact_scenario_models::{MetricValue, ScenarioMetric};

    fn views_dir(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&tmp);
        for folder in ["mercator_views", "track_views", "hc_views"] {
            std::fs::create_dir_all(tmp.join(folder)).unwrap();
        }
        tmp
    }

    fn scenario_args(views_dir: &std::path::Path) -> Vec<String> {
        let dir = views_dir.display().to_string();
        [
            "storm-impact",
            "scenarios",
            "--views-dir",
            dir.as_str(),
            "--country",
            "NIC",
            "--storm",
            "MELISSA",
            "--date",
            "2025-10-15",
            "--time",
            "06:00",
            "--threshold",
            "64",
        ]
        .iter()
        .map(ToString::to_string)
        .collect()
    }

    fn scenario_paths(views_dir: &std::path::Path) -> ViewPaths {
        let cli = Cli::try_parse_from(scenario_args(views_dir)).unwrap();
        let Commands::Scenarios { view, .. } = cli.command else {
            panic!("expected scenarios command");
        };
        ViewPaths::resolve(&view.views_dir, &view.selection(), view.zoom_level).unwrap()
    }

    #[test]
    fn styled_json_reports_status() {
        let empty = styled_json(Outcome::Empty);
        assert_eq!(empty["status"], "empty");
        assert_eq!(empty["hasData"], false);
        assert!(empty["cacheKey"].is_null());

        let degraded = styled_json(Outcome::degraded(
            StyledTiles {
                has_data: true,
                ..StyledTiles::default()
            },
            "attribute absent",
        ));
        assert_eq!(degraded["status"], "degraded");
        assert_eq!(degraded["reason"], "attribute absent");
        assert_eq!(degraded["hasData"], true);
    }

    #[test]
    fn thresholds_parse_from_knots() {
        let cli = Cli::try_parse_from([
            "storm-impact",
            "thresholds",
            "--available",
            "34,64",
            "--current",
            "64",
        ])
        .unwrap();
        let Commands::Thresholds { available, current } = cli.command else {
            panic!("expected thresholds command");
        };
        assert_eq!(available, [WindThreshold::Kt34, WindThreshold::Kt64]);
        assert_eq!(current, Some(WindThreshold::Kt64));

        assert!(Cli::try_parse_from(["storm-impact", "thresholds", "--current", "65"]).is_err());
    }

    #[test]
    fn facility_kind_parses() {
        let cli = Cli::try_parse_from([
            "storm-impact",
            "facilities",
            "--tiles",
            "hc.geojson",
            "--kind",
            "health_center",
        ])
        .unwrap();
        let Commands::Facilities { kind, .. } = cli.command else {
            panic!("expected facilities command");
        };
        assert_eq!(kind, FacilityKind::HealthCenter);

        let cli = Cli::try_parse_from(["storm-impact", "facilities", "--tiles", "s.geojson"])
            .unwrap();
        let Commands::Facilities { kind, .. } = cli.command else {
            panic!("expected facilities command");
        };
        assert_eq!(kind, FacilityKind::School);

        assert!(
            Cli::try_parse_from([
                "storm-impact",
                "facilities",
                "--tiles",
                "s.geojson",
                "--kind",
                "hospital",
            ])
            .is_err()
        );
    }

    #[test]
    fn no_views_is_an_unavailable_summary() {
        let tmp = views_dir("storm_impact_no_views");
        let outcome = load_scenarios(&scenario_paths(&tmp)).unwrap();

        assert!(outcome.is_empty());
        assert_eq!(outcome.into_value_or_default(), ScenarioSummary::default());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn health_view_gates_health_metrics() {
        let tmp = views_dir("storm_impact_health_gating");
        let paths = scenario_paths(&tmp);
        std::fs::write(
            &paths.tracks,
            "zone_id,severity_population,severity_hcs\n1,100,2\n2,500,3\n",
        )
        .unwrap();
        std::fs::write(&paths.tiles, "tile_id,E_population,E_num_hcs\n1,40.5,0.5\n").unwrap();

        let Outcome::Data(without) = load_scenarios(&paths).unwrap() else {
            panic!("expected a summary");
        };
        let hcs = without.row(ScenarioMetric::HealthCenters).unwrap();
        assert_eq!(hcs.high, MetricValue::Unavailable);
        assert_eq!(hcs.expected, MetricValue::Available(0.5));
        assert_eq!(without.high_member, Some(2));
        assert_eq!(
            without.row(ScenarioMetric::Population).unwrap().expected,
            MetricValue::Available(40.5)
        );

        std::fs::write(&paths.health, b"").unwrap();
        let Outcome::Data(with) = load_scenarios(&paths).unwrap() else {
            panic!("expected a summary");
        };
        let hcs = with.row(ScenarioMetric::HealthCenters).unwrap();
        assert_eq!(hcs.low, MetricValue::Available(2.0));
        assert_eq!(hcs.high, MetricValue::Available(3.0));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn classify_attaches_legend() {
        let ctx = ImpactContext::default();
        let tiles: FeatureCollection = serde_json::from_value(serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "geometry": null, "properties": { "population": 10 } },
                { "type": "Feature", "geometry": null, "properties": { "population": 0 } },
            ],
        }))
        .unwrap();

        let output = classify_view(&ctx, &tiles, "population").unwrap();
        assert_eq!(output["status"], "data");
        assert!(output["legend"]["swatches"].is_array());

        let unknown = classify_view(&ctx, &tiles, "num_boats").unwrap();
        assert_eq!(unknown["status"], "degraded");
        assert!(unknown.get("legend").is_none());
    }
}
