use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::filter::FilterContext;
use crate::data::schema::{field, TableKind};

// ---------------------------------------------------------------------------
// Dashboard configuration
// ---------------------------------------------------------------------------

/// Everything the session loader and the pages need, read from an optional
/// JSON file. Every field has a default, so `{}` is a valid config.
///
/// ```json
/// {
///   "data_dir": "data",
///   "tables": { "medals": "medals_2024.parquet" },
///   "venue_coords": "venue_coords.csv",
///   "continents": "continents.csv",
///   "filters": { "filters": { "medal_type": ["Gold"] } }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Directory relative paths below resolve against.
    pub data_dir: PathBuf,
    /// Per-table file overrides keyed by table name (`athletes`, `medals_total`, ...).
    pub tables: BTreeMap<String, PathBuf>,
    /// Optional `venue,latitude,longitude` table.
    pub venue_coords: Option<PathBuf>,
    /// Optional `country_code,continent` table.
    pub continents: Option<PathBuf>,
    /// Date at which athlete ages are computed.
    pub reference_date: NaiveDate,
    pub limits: Limits,
    /// Athlete Performance page settings.
    pub athletes: AthleteView,
    /// Selections applied before any command-line filter.
    pub filters: FilterContext,
}

/// Sizes of the top-N sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub standings: usize,
    pub countries: usize,
    pub athletes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            standings: 10,
            countries: 20,
            athletes: 10,
        }
    }
}

/// Field the athlete age distribution is split by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeGrouping {
    #[default]
    Sport,
    Gender,
    /// One group holding every athlete.
    All,
}

impl AgeGrouping {
    pub fn group_key(self) -> Option<&'static str> {
        match self {
            AgeGrouping::Sport => Some(field::MAIN_SPORT),
            AgeGrouping::Gender => Some(field::GENDER),
            AgeGrouping::All => None,
        }
    }
}

/// One continent or one country, e.g. `{ "continent": "Europe" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Continent(String),
    Country(String),
}

impl Region {
    pub fn field(&self) -> &'static str {
        match self {
            Region::Continent(_) => field::CONTINENT,
            Region::Country(_) => field::COUNTRY,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Region::Continent(name) | Region::Country(name) => name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AthleteView {
    pub group_ages_by: AgeGrouping,
    /// Restricts the gender split to one region on top of the page filters.
    pub gender_region: Option<Region>,
    /// Athlete whose profile card is shown.
    pub profile: Option<String>,
}

/// Opening day of the Paris 2024 Games.
fn opening_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, 26).unwrap_or_default()
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            tables: BTreeMap::new(),
            venue_coords: None,
            continents: None,
            reference_date: opening_day(),
            limits: Limits::default(),
            athletes: AthleteView::default(),
            filters: FilterContext::default(),
        }
    }
}

impl DashboardConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: DashboardConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        for name in config.tables.keys() {
            name.parse::<TableKind>()
                .with_context(|| format!("config {}: bad `tables` entry", path.display()))?;
        }
        Ok(config)
    }

    /// Where the given table is read from.
    pub fn table_path(&self, kind: TableKind) -> PathBuf {
        let file = self
            .tables
            .get(kind.name())
            .cloned()
            .unwrap_or_else(|| PathBuf::from(kind.default_file()));
        self.resolve(&file)
    }

    pub fn venue_coords_path(&self) -> Option<PathBuf> {
        self.venue_coords.as_deref().map(|p| self.resolve(p))
    }

    pub fn continents_path(&self) -> Option<PathBuf> {
        self.continents.as_deref().map(|p| self.resolve(p))
    }

    fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.data_dir.join(file)
        }
    }
}
