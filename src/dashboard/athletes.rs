use crate::config::{AthleteView, Limits};
use crate::data::aggregate::{distribution, group_count, top_n};
use crate::data::filter::FilterContext;
use crate::data::schema::{field, TableKind};
use crate::session::Session;

use super::{medallists_only, Section};

const PROFILE_COLUMNS: [&str; 10] = [
    field::NAME,
    field::COUNTRY_LONG,
    field::COUNTRY_CODE,
    field::GENDER,
    field::AGE,
    "height",
    "weight",
    "coach",
    field::SPORT,
    field::MAIN_SPORT,
];

/// Athlete demographics plus the most decorated medallists.
pub fn render(
    session: &Session,
    filters: &FilterContext,
    limits: &Limits,
    view: &AthleteView,
) -> Vec<Section> {
    let table = session.table(TableKind::Athletes);
    let athletes = table.apply_filters(filters);
    let medals = session
        .table(TableKind::Medallists)
        .apply_filters(&medallists_only(filters));

    let ages = distribution(athletes.iter().copied(), view.group_ages_by.group_key(), field::AGE);

    let gender_scope = match &view.gender_region {
        Some(region) => filters.clone().with(region.field(), [region.name()]),
        None => filters.clone(),
    };
    let in_scope = table.apply_filters(&gender_scope);
    let genders = group_count(in_scope.iter().copied(), field::GENDER).sorted_by_value_desc();

    let per_athlete = group_count(medals.iter().copied(), field::NAME);

    let mut sections = Vec::new();
    if let Some(name) = &view.profile {
        // first record wins when a name repeats
        let profile: Vec<_> = athletes
            .iter()
            .copied()
            .filter(|rec| rec.get(field::NAME).is_some_and(|n| n.to_string() == *name))
            .take(1)
            .collect();
        sections.push(Section::rows(
            "Athlete Detailed Profile",
            &profile,
            &PROFILE_COLUMNS,
            &[field::NAME],
            "No athlete with that name in the current selection.",
        ));
    }
    sections.extend([
        Section::distribution(
            "Athlete Age Distribution",
            ages,
            "No valid age information available to plot age distribution.",
        ),
        Section::flat(
            "Gender Distribution",
            genders,
            "No gender data available for the selected filter.",
        ),
        Section::flat(
            "Top Athletes by Total Medals",
            top_n(&per_athlete, limits.athletes),
            "No medalist records available to plot top athletes.",
        ),
    ]);
    sections
}
