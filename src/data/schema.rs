//! Load-time schema adapter.
//!
//! Source tables name the same concept differently (`country_code` /
//! `noc_code` / `code`, `sport` / `discipline`, `Gold Medal` / `gold`).
//! Every table passes through [`SchemaAdapter::normalize`] once, right after
//! loading, so the filter and aggregate stages only ever see canonical names.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::model::{Record, Table, Value};

/// Canonical field names used throughout the pipeline.
pub mod field {
    pub const AGE: &str = "age";
    pub const BIRTH_DATE: &str = "birth_date";
    pub const BRONZE: &str = "bronze";
    pub const CONTINENT: &str = "continent";
    pub const COUNTRY: &str = "country";
    pub const COUNTRY_CODE: &str = "country_code";
    pub const COUNTRY_LONG: &str = "country_long";
    pub const DATE_END: &str = "date_end";
    pub const DATE_START: &str = "date_start";
    pub const GENDER: &str = "gender";
    pub const GOLD: &str = "gold";
    pub const IS_MEDALLIST: &str = "is_medallist";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
    pub const MAIN_SPORT: &str = "main_sport";
    pub const MEDAL_TYPE: &str = "medal_type";
    pub const NAME: &str = "name";
    pub const SILVER: &str = "silver";
    pub const SPORT: &str = "sport";
    pub const TOTAL: &str = "total";
    pub const VENUE: &str = "venue";
}

// ---------------------------------------------------------------------------
// TableKind
// ---------------------------------------------------------------------------

/// The source tables of the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Athletes,
    Coaches,
    Events,
    Medallists,
    Medals,
    MedalsTotal,
    Nocs,
    Teams,
    Venues,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown table '{0}'")]
pub struct UnknownTable(pub String);

impl TableKind {
    pub const ALL: [TableKind; 9] = [
        TableKind::Athletes,
        TableKind::Coaches,
        TableKind::Events,
        TableKind::Medallists,
        TableKind::Medals,
        TableKind::MedalsTotal,
        TableKind::Nocs,
        TableKind::Teams,
        TableKind::Venues,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TableKind::Athletes => "athletes",
            TableKind::Coaches => "coaches",
            TableKind::Events => "events",
            TableKind::Medallists => "medallists",
            TableKind::Medals => "medals",
            TableKind::MedalsTotal => "medals_total",
            TableKind::Nocs => "nocs",
            TableKind::Teams => "teams",
            TableKind::Venues => "venues",
        }
    }

    /// File name looked up in the data directory when the config names none.
    pub fn default_file(self) -> String {
        format!("{}.csv", self.name())
    }

    /// Alias lists consulted for this table, in priority order per canonical field.
    fn aliases(self) -> Vec<(&'static str, &'static [&'static str])> {
        let mut aliases = COMMON_ALIASES.to_vec();
        if self == TableKind::Nocs {
            aliases.push((field::COUNTRY_CODE, &["code"]));
        }
        aliases
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TableKind {
    type Err = UnknownTable;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TableKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| UnknownTable(s.to_string()))
    }
}

/// Canonical field → source spellings, shared by every table.
const COMMON_ALIASES: &[(&str, &[&str])] = &[
    (field::COUNTRY_CODE, &["noc_code", "noc", "NOC"]),
    (field::COUNTRY_LONG, &["country_full"]),
    (
        field::SPORT,
        &["discipline", "Discipline", "disciplines", "sports"],
    ),
    (field::VENUE, &["venue_name"]),
    (field::GOLD, &["Gold Medal", "Gold"]),
    (field::SILVER, &["Silver Medal", "Silver"]),
    (field::BRONZE, &["Bronze Medal", "Bronze"]),
    (field::TOTAL, &["Total"]),
];

const DATE_FIELDS: &[&str] = &[field::BIRTH_DATE, field::DATE_START, field::DATE_END, "medal_date"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
/// Timestamps with a UTC offset; the local (offset) date is kept.
const OFFSET_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z", "%Y-%m-%d %H:%M%:z"];

// ---------------------------------------------------------------------------
// SchemaAdapter
// ---------------------------------------------------------------------------

/// Normalizes freshly loaded tables into the canonical naming scheme.
#[derive(Debug, Clone, Copy)]
pub struct SchemaAdapter {
    /// Date at which athlete ages are computed.
    reference_date: NaiveDate,
}

impl SchemaAdapter {
    pub fn new(reference_date: NaiveDate) -> Self {
        Self { reference_date }
    }

    /// Rename aliased columns, tokenize list fields, normalize medal labels
    /// and dates, then add derived fields (`age`, `main_sport`).
    pub fn normalize(&self, kind: TableKind, table: Table) -> Table {
        let renames = column_renames(kind, &table);
        for (from, to) in &renames {
            log::debug!("{kind}: column '{from}' → '{to}'");
        }

        let mut records = table.records;
        let mut unparsed_dates = 0usize;
        for record in &mut records {
            for (from, to) in &renames {
                record.rename(from, to);
            }
            unparsed_dates += self.normalize_record(record);
        }
        if unparsed_dates > 0 {
            log::warn!("{kind}: {unparsed_dates} date value(s) could not be parsed and were cleared");
        }

        Table::from_records(kind.name(), records)
    }

    /// Returns the number of date cells that failed to parse.
    fn normalize_record(&self, record: &mut Record) -> usize {
        let mut unparsed = 0;

        for value in record.fields.values_mut() {
            if let Some(tokens) = value.as_str().and_then(parse_bracketed_list) {
                *value = Value::List(tokens);
            }
        }

        if let Some(value) = record.fields.get_mut(field::SPORT) {
            if let Value::String(s) = value {
                if s.contains(';') {
                    let tokens = split_tokens(s, &[';']);
                    *value = Value::List(tokens);
                }
            }
        }

        if let Some(Value::String(s)) = record.fields.get_mut(field::MEDAL_TYPE) {
            *s = normalize_medal_label(s);
        }

        for name in DATE_FIELDS {
            let Some(value) = record.fields.get_mut(*name) else {
                continue;
            };
            let parsed = match value {
                Value::String(s) => parse_date(s),
                Value::Date(_) | Value::Null => continue,
                _ => None,
            };
            match parsed {
                Some(date) => *value = Value::Date(date.format("%Y-%m-%d").to_string()),
                None => {
                    *value = Value::Null;
                    unparsed += 1;
                }
            }
        }

        if record.has_column(field::BIRTH_DATE) {
            let age = record
                .get(field::BIRTH_DATE)
                .and_then(Value::as_str)
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                .and_then(|birth| age_at(birth, self.reference_date))
                .map(Value::Integer)
                .unwrap_or(Value::Null);
            record.set(field::AGE, age);
        }

        if let Some(sport) = record.fields.get(field::SPORT) {
            let main = match sport {
                Value::List(items) => items.first().cloned().map(Value::String),
                Value::Null => None,
                other => Some(Value::String(other.to_string())),
            };
            record.set(field::MAIN_SPORT, main.unwrap_or(Value::Null));
        }

        unparsed
    }
}

/// `(from, to)` renames for columns whose canonical name is missing.
fn column_renames(kind: TableKind, table: &Table) -> Vec<(String, String)> {
    let mut renames = Vec::new();
    for (canonical, aliases) in kind.aliases() {
        if table.has_column(canonical) || renames.iter().any(|(_, to)| to == canonical) {
            continue;
        }
        if let Some(alias) = aliases.iter().find(|a| table.has_column(a)) {
            renames.push((alias.to_string(), canonical.to_string()));
        }
    }
    renames
}

/// Whole years between `birth` and `at`, counted as 365-day blocks.
fn age_at(birth: NaiveDate, at: NaiveDate) -> Option<i64> {
    let days = (at - birth).num_days();
    (days >= 0).then_some(days / 365)
}

/// `"Gold Medal"` → `"Gold"`; other labels are only trimmed.
pub fn normalize_medal_label(label: &str) -> String {
    let trimmed = label.trim();
    trimmed
        .strip_suffix(" Medal")
        .or_else(|| trimmed.strip_suffix(" medal"))
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

/// Parse a Python-style list literal such as `"['Athletics', 'Football']"`.
pub fn parse_bracketed_list(s: &str) -> Option<Vec<String>> {
    let inner = s.trim().strip_prefix('[')?.strip_suffix(']')?;
    Some(split_tokens(inner, &[',', ';']))
}

fn split_tokens(s: &str, separators: &[char]) -> Vec<String> {
    s.split(|c| separators.contains(&c))
        .map(|tok| tok.trim().trim_matches(|c| c == '\'' || c == '"').trim())
        .filter(|tok| !tok.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .or_else(|| {
                    OFFSET_DATETIME_FORMATS
                        .iter()
                        .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
                })
                .map(|dt| dt.date_naive())
        })
}
