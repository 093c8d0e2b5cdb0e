use crate::data::aggregate::group_count;
use crate::data::filter::FilterContext;
use crate::data::schema::{field, TableKind};
use crate::session::Session;

use super::{medallists_only, Section};

/// Venue schedule and map, with medal counts per sport.
pub fn render(session: &Session, filters: &FilterContext) -> Vec<Section> {
    let venues = session.table(TableKind::Venues).apply_filters(filters);
    let medals = session
        .table(TableKind::Medallists)
        .apply_filters(&medallists_only(filters));

    let schedule = Section::rows(
        "Event Schedule by Venue",
        &venues,
        &[
            field::VENUE,
            field::MAIN_SPORT,
            field::DATE_START,
            field::DATE_END,
            field::SPORT,
        ],
        &[field::DATE_START, field::DATE_END],
        "No venues match the current filters.",
    );

    let by_sport = group_count(medals.iter().copied(), field::SPORT).sorted_by_value_desc();

    let map = Section::rows(
        "Venue Map",
        &venues,
        &[field::VENUE, field::LATITUDE, field::LONGITUDE, field::SPORT],
        &[field::LATITUDE, field::LONGITUDE],
        "No venue coordinates available for the current filters.",
    );

    vec![
        schedule,
        Section::flat(
            "Medal Count by Sport",
            by_sport,
            "No medal data available for the current filters.",
        ),
        map,
    ]
}
