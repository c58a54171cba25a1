//! Ensemble member picker options.

use storm_impact_forecast_models::{MemberKind, TrackBatch};
use storm_impact_scenario_models::MemberOption;

use crate::{member_totals, reduce::population_extremes};

/// Lists every member of the batch in ascending id order, labelling the
/// control runs and flagging the population-ranked low and high members.
///
/// Returns no options when the batch has no population severity to rank
/// by, or when its rows cannot be summed.
#[must_use]
pub fn member_options(batch: &TrackBatch) -> Vec<MemberOption> {
    if !batch.rows.iter().any(|row| row.severity_population.is_some()) {
        return vec![];
    }

    let totals = match member_totals(&batch.rows) {
        Ok(totals) => totals,
        Err(e) => {
            log::warn!("Error loading track options: {e}");
            return vec![];
        }
    };
    let extremes = population_extremes(&totals).map(|(low, high)| (low.member, high.member));

    totals
        .iter()
        .map(|entry| {
            let member = entry.member;
            let name = match MemberKind::of(member) {
                MemberKind::Control => "Control".to_string(),
                MemberKind::Ensemble => format!("Ensemble {member}"),
            };
            let indicator = match extremes {
                Some((low, _)) if low == member => " (LOW IMPACT)",
                Some((_, high)) if high == member => " (HIGH IMPACT)",
                _ => "",
            };
            MemberOption {
                value: member,
                label: format!("{name} (ID: {member}){indicator}"),
            }
        })
        .collect()
}
