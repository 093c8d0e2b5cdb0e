use crate::config::Limits;
use crate::data::aggregate::{distinct_count, group_sum, sum_field, top_n, FlatAggregate};
use crate::data::filter::FilterContext;
use crate::data::model::Value;
use crate::data::schema::{field, TableKind};
use crate::session::Session;

use super::{Metric, Section};

/// KPIs, the medal-type split and the top of the medal table.
pub fn render(session: &Session, filters: &FilterContext, limits: &Limits) -> Vec<Section> {
    let athletes = session.table(TableKind::Athletes);
    let events = session.table(TableKind::Events);
    let nocs = session.table(TableKind::Nocs);
    let standings = session.table(TableKind::MedalsTotal);

    let fa = athletes.apply_filters(filters);
    let fe = events.apply_filters(filters);
    let fm = standings.apply_filters(filters);

    let metrics = vec![
        Metric::new("Total Athletes", fa.len() as f64, Some(athletes.len() as f64)),
        Metric::new(
            "Total Countries",
            distinct_count(fm.iter().copied(), field::COUNTRY) as f64,
            Some(nocs.len() as f64),
        ),
        Metric::new(
            "Total Sports",
            distinct_count(fe.iter().copied(), field::SPORT) as f64,
            Some(distinct_count(&events.records, field::SPORT) as f64),
        ),
        Metric::new(
            "Total Medals",
            sum_field(fm.iter().copied(), field::TOTAL),
            None,
        ),
        Metric::new("Number of Events", fe.len() as f64, None),
    ];

    let split: Vec<(Value, f64)> = [
        ("Gold", field::GOLD),
        ("Silver", field::SILVER),
        ("Bronze", field::BRONZE),
    ]
    .into_iter()
    .map(|(label, column)| (Value::from(label), sum_field(fm.iter().copied(), column)))
    .collect();
    let split = if split.iter().all(|(_, n)| *n == 0.0) {
        FlatAggregate::default()
    } else {
        FlatAggregate::from_entries(field::MEDAL_TYPE, split)
    };

    let by_country = group_sum(fm.iter().copied(), field::COUNTRY, field::TOTAL);

    vec![
        Section::metrics("Key Performance Indicators", metrics),
        Section::flat(
            "Global Medal Distribution",
            split,
            "No medals awarded for the current selection.",
        ),
        Section::flat(
            "Top Medal Standings",
            top_n(&by_country, limits.standings),
            "No medal standings for the current selection.",
        ),
    ]
}
