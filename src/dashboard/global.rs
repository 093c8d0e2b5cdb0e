use crate::config::Limits;
use crate::data::aggregate::{crosstab, group_count, roll_up, top_n};
use crate::data::filter::FilterContext;
use crate::data::schema::{field, TableKind};
use crate::session::Session;

use super::Section;

const MEDAL_COLUMNS: [&str; 3] = ["Gold", "Silver", "Bronze"];

/// Medal geography: per-country totals, the continent hierarchy, the
/// continent × medal table and the leading countries.
pub fn render(session: &Session, filters: &FilterContext, limits: &Limits) -> Vec<Section> {
    let medals = session.table(TableKind::Medals).apply_filters(filters);

    if medals.is_empty() {
        return vec![Section::empty(
            "Global Analysis",
            "No data for the current filter selection.",
        )];
    }

    let by_code = group_count(medals.iter().copied(), field::COUNTRY_CODE).sorted_by_key();
    let hierarchy = roll_up(
        medals.iter().copied(),
        &[field::CONTINENT, field::COUNTRY, field::SPORT, field::MEDAL_TYPE],
        None,
    );
    let continents = crosstab(
        medals.iter().copied(),
        field::CONTINENT,
        field::MEDAL_TYPE,
        &MEDAL_COLUMNS,
    );
    let by_country = group_count(medals.iter().copied(), field::COUNTRY);

    vec![
        Section::flat(
            "World Medal Map",
            by_code,
            "No country codes among the selected medals.",
        ),
        Section::hierarchy(
            "Medal Hierarchy by Continent",
            hierarchy,
            "No medals with a full continent / country / sport / medal path.",
        ),
        Section::crosstab(
            "Continent vs. Medals",
            continents,
            "No continent information for the selected medals.",
        ),
        Section::flat(
            "Medals by Country",
            top_n(&by_country, limits.countries),
            "No country information for the selected medals.",
        ),
    ]
}
