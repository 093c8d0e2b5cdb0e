//! Page compositions: each page filters the session's tables with one
//! [`FilterContext`] and turns the result into report sections for the
//! presentation layer. Pages are pure functions of `(session, filters)`.

pub mod athletes;
pub mod events;
pub mod global;
pub mod overview;

use serde::Serialize;

use crate::config::DashboardConfig;
use crate::data::aggregate::{Crosstab, Distribution, FlatAggregate, Hierarchy};
use crate::data::filter::FilterContext;
use crate::data::model::{Record, Value};
use crate::session::Session;

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Overview,
    GlobalAnalysis,
    SportsEvents,
    AthletePerformance,
}

impl Page {
    pub const ALL: [Page; 4] = [
        Page::Overview,
        Page::GlobalAnalysis,
        Page::SportsEvents,
        Page::AthletePerformance,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Page::Overview => "Paris 2024 Olympics Dashboard",
            Page::GlobalAnalysis => "Global Analysis",
            Page::SportsEvents => "Sports Events",
            Page::AthletePerformance => "Athlete Performance",
        }
    }

    pub fn render(self, session: &Session, filters: &FilterContext, config: &DashboardConfig) -> PageReport {
        let limits = &config.limits;
        let sections = match self {
            Page::Overview => overview::render(session, filters, limits),
            Page::GlobalAnalysis => global::render(session, filters, limits),
            Page::SportsEvents => events::render(session, filters),
            Page::AthletePerformance => athletes::render(session, filters, limits, &config.athletes),
        };
        log::debug!(
            "{}: {} section(s), {} empty",
            self.title(),
            sections.len(),
            sections.iter().filter(|s| s.is_empty()).count()
        );
        PageReport {
            title: self.title().to_string(),
            sections,
        }
    }
}

// ---------------------------------------------------------------------------
// Report structure
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageReport {
    pub title: String,
    pub sections: Vec<Section>,
}

impl PageReport {
    pub fn section(&self, title: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.title == title)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub title: String,
    pub data: SectionData,
}

/// A headline number, optionally with the unfiltered figure it is part of.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub label: String,
    pub value: f64,
    pub of: Option<f64>,
}

impl Metric {
    pub fn new(label: &str, value: f64, of: Option<f64>) -> Self {
        Metric {
            label: label.to_string(),
            value,
            of,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SectionData {
    Metrics { metrics: Vec<Metric> },
    Flat(FlatAggregate),
    Hierarchy(Hierarchy),
    Crosstab(Crosstab),
    Distribution(Distribution),
    Rows { columns: Vec<String>, rows: Vec<Vec<Value>> },
    /// Nothing to show for the current selection.
    Empty { message: String },
}

impl Section {
    fn new(title: &str, data: SectionData) -> Self {
        Section {
            title: title.to_string(),
            data,
        }
    }

    pub fn empty(title: &str, message: &str) -> Self {
        Self::new(
            title,
            SectionData::Empty {
                message: message.to_string(),
            },
        )
    }

    pub fn metrics(title: &str, metrics: Vec<Metric>) -> Self {
        Self::new(title, SectionData::Metrics { metrics })
    }

    pub fn flat(title: &str, aggregate: FlatAggregate, empty_message: &str) -> Self {
        if aggregate.is_empty() {
            return Self::empty(title, empty_message);
        }
        Self::new(title, SectionData::Flat(aggregate))
    }

    pub fn hierarchy(title: &str, hierarchy: Hierarchy, empty_message: &str) -> Self {
        if hierarchy.is_empty() {
            return Self::empty(title, empty_message);
        }
        Self::new(title, SectionData::Hierarchy(hierarchy))
    }

    pub fn crosstab(title: &str, crosstab: Crosstab, empty_message: &str) -> Self {
        if crosstab.is_empty() {
            return Self::empty(title, empty_message);
        }
        Self::new(title, SectionData::Crosstab(crosstab))
    }

    pub fn distribution(title: &str, distribution: Distribution, empty_message: &str) -> Self {
        if distribution.is_empty() {
            return Self::empty(title, empty_message);
        }
        Self::new(title, SectionData::Distribution(distribution))
    }

    /// Selected columns of `records`, keeping only rows where every
    /// `required` field is present.
    pub fn rows(
        title: &str,
        records: &[&Record],
        columns: &[&str],
        required: &[&str],
        empty_message: &str,
    ) -> Self {
        let rows: Vec<Vec<Value>> = records
            .iter()
            .filter(|rec| required.iter().all(|f| rec.get(f).is_some()))
            .map(|rec| {
                columns
                    .iter()
                    .map(|c| rec.get(c).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        if rows.is_empty() {
            return Self::empty(title, empty_message);
        }
        Self::new(
            title,
            SectionData::Rows {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows,
            },
        )
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.data, SectionData::Empty { .. })
    }
}

/// Page-level base selection: medal tables only count actual medallists.
fn medallists_only(filters: &FilterContext) -> FilterContext {
    filters
        .clone()
        .with(crate::data::schema::field::IS_MEDALLIST, ["true"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_aggregates_become_placeholders() {
        let section = Section::flat("Medals", FlatAggregate::default(), "No medals.");
        assert!(section.is_empty());
        assert_eq!(
            section.data,
            SectionData::Empty {
                message: "No medals.".into()
            }
        );
    }

    #[test]
    fn rows_require_fields() {
        let a = Record::new().with("venue", "Invalides").with("latitude", 48.85);
        let b = Record::new().with("venue", "Unknown");
        let section = Section::rows(
            "Venue Map",
            &[&a, &b],
            &["venue", "latitude"],
            &["latitude"],
            "No coordinates.",
        );
        match section.data {
            SectionData::Rows { rows, .. } => assert_eq!(rows.len(), 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn sections_serialize_with_kind_tag() {
        let section = Section::metrics("KPIs", vec![Metric::new("Events", 3.0, None)]);
        let json = serde_json::to_value(&section).unwrap();
        assert_eq!(json["data"]["kind"], "metrics");
        assert_eq!(json["data"]["metrics"][0]["label"], "Events");
    }
}
