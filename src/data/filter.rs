use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::model::{Record, Table, Value};
use super::DataIssue;

// ---------------------------------------------------------------------------
// Filter selections
// ---------------------------------------------------------------------------

/// How list-valued fields are tested against a filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// A list element must equal an accepted value.
    #[default]
    Exact,
    /// A list element must contain an accepted value as a substring.
    /// `"Cycling"` then also matches `"Cycling Track"`; kept only to
    /// reproduce the pattern-based filtering of older dashboards.
    Contains,
}

/// Accepted value labels for one dimension. Empty accepts everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSpec {
    accepted: BTreeSet<String>,
}

impl FilterSpec {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterSpec {
            accepted: values.into_iter().map(Into::into).collect(),
        }
    }

    /// An empty selection places no constraint.
    pub fn is_active(&self) -> bool {
        !self.accepted.is_empty()
    }

    pub fn values(&self) -> &BTreeSet<String> {
        &self.accepted
    }

    /// Whether a present value satisfies this selection.
    pub fn accepts(&self, value: &Value, mode: MatchMode) -> bool {
        match value {
            Value::Null => false,
            Value::List(items) => match mode {
                MatchMode::Exact => items.iter().any(|item| self.accepted.contains(item)),
                MatchMode::Contains => items
                    .iter()
                    .any(|item| self.accepted.iter().any(|a| item.contains(a.as_str()))),
            },
            scalar => self.accepted.contains(&scalar.to_string()),
        }
    }
}

/// Immutable per-request filter selections: dimension → accepted values.
///
/// Built fresh for every interaction and passed into the pipeline; the
/// pipeline itself keeps no selection state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterContext {
    filters: BTreeMap<String, FilterSpec>,
    list_match: MatchMode,
}

impl FilterContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a context where `dimension` accepts `values`, replacing any
    /// previous selection for it.
    pub fn with<I, S>(mut self, dimension: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters.insert(dimension.into(), FilterSpec::new(values));
        self
    }

    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.list_match = mode;
        self
    }

    /// A copy without any selection on `dimension`.
    pub fn without(&self, dimension: &str) -> Self {
        let mut next = self.clone();
        next.filters.remove(dimension);
        next
    }

    /// Overlay `other` on top of `self`; `other` wins per dimension.
    pub fn merged(&self, other: &FilterContext) -> Self {
        let mut next = self.clone();
        next.filters
            .extend(other.filters.iter().map(|(k, v)| (k.clone(), v.clone())));
        if other.list_match != MatchMode::default() {
            next.list_match = other.list_match;
        }
        next
    }

    /// A copy keeping only the dimensions for which `keep` holds.
    pub fn retain_dimensions(&self, mut keep: impl FnMut(&str) -> bool) -> Self {
        let mut next = self.clone();
        next.filters.retain(|dim, _| keep(dim.as_str()));
        next
    }

    pub fn get(&self, dimension: &str) -> Option<&FilterSpec> {
        self.filters.get(dimension)
    }

    pub fn match_mode(&self) -> MatchMode {
        self.list_match
    }

    /// Dimensions with a non-empty selection.
    pub fn active(&self) -> impl Iterator<Item = (&str, &FilterSpec)> {
        self.filters
            .iter()
            .filter(|(_, spec)| spec.is_active())
            .map(|(dim, spec)| (dim.as_str(), spec))
    }

    /// No dimension constrains anything.
    pub fn is_empty(&self) -> bool {
        self.active().next().is_none()
    }
}

// ---------------------------------------------------------------------------
// Filter application
// ---------------------------------------------------------------------------

/// Return the records that pass all active filters, in input order.
///
/// Each record is judged on its own:
/// * The filter is absent or its selection empty → passes (no constraint)
/// * The record's value is null or absent → fails
/// * The value (or any element of a list value) is selected → passes
///
/// Dimensions are not checked against any schema here; use
/// [`Table::apply_filters`] to ignore filters on columns a table lacks.
pub fn apply_filters<'a, I>(records: I, filters: &FilterContext) -> Vec<&'a Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    let active: Vec<(&str, &FilterSpec)> = filters.active().collect();
    let kept: Vec<&Record> = records
        .into_iter()
        .filter(|rec| passes(rec, &active, filters.match_mode()))
        .collect();
    if kept.is_empty() && !active.is_empty() {
        log::debug!("{}", DataIssue::EmptyResult);
    }
    kept
}

fn passes(record: &Record, active: &[(&str, &FilterSpec)], mode: MatchMode) -> bool {
    active.iter().all(|(dim, spec)| match record.get(dim) {
        Some(value) => spec.accepts(value, mode),
        None => false,
    })
}

impl Table {
    /// The selections of `filters` on columns this table has. Filters on
    /// other dimensions are dropped.
    pub fn applicable_filters(&self, filters: &FilterContext) -> FilterContext {
        filters.retain_dimensions(|dim| {
            let known = self.has_column(dim);
            if !known {
                log::debug!("{}: ignoring filter on unknown dimension '{dim}'", self.name);
            }
            known
        })
    }

    /// Indices of records passing all active filters. Dimensions are matched
    /// against this table's columns, so a filter on a column the table does
    /// not have is ignored.
    pub fn filtered_indices(&self, filters: &FilterContext) -> Vec<usize> {
        let applicable = self.applicable_filters(filters);
        let active: Vec<(&str, &FilterSpec)> = applicable.active().collect();

        self.records
            .iter()
            .enumerate()
            .filter(|(_, rec)| passes(rec, &active, applicable.match_mode()))
            .map(|(i, _)| i)
            .collect()
    }

    /// The records passing all active filters, in table order.
    pub fn apply_filters(&self, filters: &FilterContext) -> Vec<&Record> {
        self.filtered_indices(filters)
            .into_iter()
            .map(|i| &self.records[i])
            .collect()
    }

    /// Sorted distinct labels of `dimension` among records passing every
    /// *other* active filter. Feeds cascading selectors (countries narrowed
    /// by the selected continents).
    pub fn available_options(&self, filters: &FilterContext, dimension: &str) -> Vec<String> {
        self.apply_filters(&filters.without(dimension))
            .into_iter()
            .filter_map(|rec| rec.get(dimension))
            .flat_map(Value::labels)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Command-line filter syntax: `dimension=value1,value2`
// ---------------------------------------------------------------------------

/// One `dimension=v1,v2` selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterArg {
    pub dimension: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterArgError {
    #[error("expected `dimension=value[,value...]`, got '{0}'")]
    MissingSeparator(String),

    #[error("empty dimension name in '{0}'")]
    EmptyDimension(String),
}

impl FromStr for FilterArg {
    type Err = FilterArgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (dimension, values) = s
            .split_once('=')
            .ok_or_else(|| FilterArgError::MissingSeparator(s.to_string()))?;
        let dimension = dimension.trim();
        if dimension.is_empty() {
            return Err(FilterArgError::EmptyDimension(s.to_string()));
        }
        let values = values
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
        Ok(FilterArg {
            dimension: dimension.to_string(),
            values,
        })
    }
}
