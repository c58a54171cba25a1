//! Ensemble track polylines.

use std::collections::BTreeMap;

use geo::LineString;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use storm_impact_forecast_models::{MemberId, MemberKind, TrackSample};

/// Builds one `LineString` feature per ensemble member, ordered by member
/// id, with its samples ordered by lead time.
///
/// Members with fewer than two samples are skipped.
#[must_use]
pub fn track_lines(samples: &[TrackSample]) -> FeatureCollection {
    let mut by_member: BTreeMap<MemberId, Vec<&TrackSample>> = BTreeMap::new();
    for sample in samples {
        by_member.entry(sample.member).or_default().push(sample);
    }

    let features = by_member
        .into_iter()
        .filter_map(|(member, mut points)| {
            if points.len() < 2 {
                log::debug!("Skipping member {member}: {} track sample(s)", points.len());
                return None;
            }
            points.sort_by(|a, b| a.lead_time.total_cmp(&b.lead_time));
            Some(line_feature(member, &points))
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn line_feature(member: MemberId, points: &[&TrackSample]) -> Feature {
    let line: LineString<f64> = points
        .iter()
        .map(|sample| (sample.longitude, sample.latitude))
        .collect::<Vec<_>>()
        .into();

    let mut properties = JsonObject::new();
    properties.insert("ensemble_member".to_string(), member.into());
    properties.insert(
        "member_type".to_string(),
        MemberKind::of(member).as_ref().into(),
    );

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(&line))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}
