//! Data layer: core types, loading, normalization, filtering and aggregation.
//!
//! Architecture:
//! ```text
//!  .csv / .json / .parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file → Table
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  schema   │  canonical column names, list tokens, dates, derived fields
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  lookup   │  NOC / continent / venue coordinate joins (misses stay null)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  conjunction of per-dimension selections → row subset
//!   └──────────┘
//!        │
//!        ▼
//!   ┌───────────┐
//!   │ aggregate  │  flat counts, roll-ups, crosstabs, distributions
//!   └───────────┘
//! ```

pub mod aggregate;
pub mod filter;
pub mod loader;
pub mod lookup;
pub mod model;
pub mod schema;

use thiserror::Error;

/// Data-quality conditions the pipeline absorbs instead of failing on.
///
/// None of these are ever returned as errors; they are logged and the
/// affected records degrade by omission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataIssue {
    #[error("{omitted} record(s) have no value for '{field}' and were left out")]
    MissingAttribute { field: String, omitted: usize },

    #[error("{table}: '{key}' did not resolve against {lookup}")]
    UnresolvedJoin {
        table: String,
        lookup: String,
        key: String,
    },

    #[error("no records match the current selection")]
    EmptyResult,
}
