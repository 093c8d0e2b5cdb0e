use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::DashboardConfig;
use crate::data::loader::load_table;
use crate::data::lookup::{fill_missing, Lookup};
use crate::data::model::{Table, Value};
use crate::data::schema::{field, SchemaAdapter, TableKind};

/// Continent given to records whose NOC code resolves nowhere.
pub const UNKNOWN_CONTINENT: &str = "Other";

/// Tables whose rows belong to a national committee.
const NOC_TABLES: [TableKind; 6] = [
    TableKind::Athletes,
    TableKind::Coaches,
    TableKind::Medallists,
    TableKind::Medals,
    TableKind::MedalsTotal,
    TableKind::Teams,
];

// ---------------------------------------------------------------------------
// Optional reference tables
// ---------------------------------------------------------------------------

/// Reference lookups supplied next to the dataset.
#[derive(Debug, Clone, Default)]
pub struct Lookups {
    /// venue → latitude / longitude
    pub venue_coords: Option<Lookup>,
    /// country_code → continent
    pub continents: Option<Lookup>,
}

impl Lookups {
    pub fn load(config: &DashboardConfig) -> Result<Self> {
        let venue_coords = config
            .venue_coords_path()
            .map(|p| load_lookup(&p, field::VENUE))
            .transpose()?;
        let continents = config
            .continents_path()
            .map(|p| load_lookup(&p, field::COUNTRY_CODE))
            .transpose()?;
        Ok(Lookups {
            venue_coords,
            continents,
        })
    }
}

fn load_lookup(path: &Path, key_field: &str) -> Result<Lookup> {
    let table = load_table(path).with_context(|| format!("loading lookup {}", path.display()))?;
    Ok(Lookup::from_table(&table, key_field))
}

// ---------------------------------------------------------------------------
// Session – the loaded, normalized dataset
// ---------------------------------------------------------------------------

/// Every source table, loaded and normalized once. Immutable afterwards and
/// safe to share between any number of readers.
#[derive(Debug, Clone, Default)]
pub struct Session {
    tables: BTreeMap<TableKind, Table>,
}

impl Session {
    /// Load every table named by `config`. A missing file yields an empty
    /// table (pages then show their "no data" placeholders); an unreadable
    /// one is an error.
    pub fn load(config: &DashboardConfig) -> Result<Self> {
        let mut raw = Vec::new();
        for kind in TableKind::ALL {
            let path = config.table_path(kind);
            if !path.exists() {
                log::warn!("{kind}: {} not found, continuing without it", path.display());
                continue;
            }
            let table = load_table(&path).with_context(|| format!("loading {kind} table"))?;
            raw.push((kind, table));
        }
        let lookups = Lookups::load(config)?;
        Ok(Self::from_tables(
            raw,
            &lookups,
            SchemaAdapter::new(config.reference_date),
        ))
    }

    /// Normalize and join already-loaded tables.
    pub fn from_tables(
        tables: impl IntoIterator<Item = (TableKind, Table)>,
        lookups: &Lookups,
        adapter: SchemaAdapter,
    ) -> Self {
        let mut tables: BTreeMap<TableKind, Table> = tables
            .into_iter()
            .map(|(kind, table)| (kind, adapter.normalize(kind, table)))
            .collect();

        let nocs = tables
            .get(&TableKind::Nocs)
            .map(|t| Lookup::from_table(t, field::COUNTRY_CODE));
        let continents = lookups.continents.clone().or_else(|| {
            nocs.clone()
                .filter(|l| l.provides(field::CONTINENT))
        });

        for kind in NOC_TABLES {
            let Some(table) = tables.get_mut(&kind) else {
                continue;
            };
            if !table.has_column(field::COUNTRY_CODE) {
                continue;
            }
            if let Some(nocs) = &nocs {
                nocs.attach(table, field::COUNTRY_CODE, &[field::COUNTRY, field::COUNTRY_LONG]);
            }
            if let Some(continents) = &continents {
                continents.attach(table, field::COUNTRY_CODE, &[field::CONTINENT]);
            }
            fill_missing(table, field::CONTINENT, Value::from(UNKNOWN_CONTINENT));
        }

        if let Some(nocs_table) = tables.get_mut(&TableKind::Nocs) {
            if let Some(continents) = &lookups.continents {
                continents.attach(nocs_table, field::COUNTRY_CODE, &[field::CONTINENT]);
            }
        }

        if let (Some(venues), Some(coords)) =
            (tables.get_mut(&TableKind::Venues), &lookups.venue_coords)
        {
            coords.attach(venues, field::VENUE, &[field::LATITUDE, field::LONGITUDE]);
        }

        for (kind, table) in &tables {
            log::info!(
                "{kind}: {} records, {} columns",
                table.len(),
                table.column_names.len()
            );
        }
        Session { tables }
    }

    /// The table of `kind`; empty when it was not loaded.
    pub fn table(&self, kind: TableKind) -> &Table {
        static EMPTY: std::sync::OnceLock<Table> = std::sync::OnceLock::new();
        self.tables
            .get(&kind)
            .unwrap_or_else(|| EMPTY.get_or_init(Table::default))
    }

    pub fn is_loaded(&self, kind: TableKind) -> bool {
        self.tables.contains_key(&kind)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::data::model::Record;

    fn adapter() -> SchemaAdapter {
        SchemaAdapter::new(NaiveDate::from_ymd_opt(2024, 7, 26).unwrap())
    }

    #[test]
    fn joins_country_names_and_continents() {
        let nocs = Table::from_records(
            "nocs",
            vec![
                Record::new()
                    .with("code", "FRA")
                    .with("country", "France")
                    .with("country_long", "France"),
                Record::new()
                    .with("code", "KEN")
                    .with("country", "Kenya")
                    .with("country_long", "Kenya"),
            ],
        );
        let athletes = Table::from_records(
            "athletes",
            vec![
                Record::new().with("name", "A").with("country_code", "FRA"),
                Record::new().with("name", "B").with("country_code", "KEN"),
                Record::new().with("name", "C").with("country_code", "EOR"),
            ],
        );
        let continents = Lookup::from_entries(
            "continents",
            [("FRA", Record::new().with("continent", "Europe"))],
        );
        let lookups = Lookups {
            continents: Some(continents),
            ..Default::default()
        };

        let session = Session::from_tables(
            [(TableKind::Nocs, nocs), (TableKind::Athletes, athletes)],
            &lookups,
            adapter(),
        );
        let athletes = session.table(TableKind::Athletes);
        assert_eq!(athletes.len(), 3);
        assert_eq!(athletes.records[1].get("country"), Some(&Value::from("Kenya")));
        assert_eq!(athletes.records[0].get("continent"), Some(&Value::from("Europe")));
        assert_eq!(athletes.records[1].get("continent"), Some(&Value::from("Other")));
        assert!(athletes.records[2].get("country").is_none());
        assert_eq!(athletes.records[2].get("continent"), Some(&Value::from("Other")));
    }

    #[test]
    fn nocs_continent_column_is_used_without_lookup_file() {
        let nocs = Table::from_records(
            "nocs",
            vec![Record::new().with("code", "JPN").with("continent", "Asia")],
        );
        let medals = Table::from_records(
            "medals",
            vec![Record::new()
                .with("country_code", "JPN")
                .with("medal_type", "Gold Medal")],
        );
        let session = Session::from_tables(
            [(TableKind::Nocs, nocs), (TableKind::Medals, medals)],
            &Lookups::default(),
            adapter(),
        );
        let rec = &session.table(TableKind::Medals).records[0];
        assert_eq!(rec.get("continent"), Some(&Value::from("Asia")));
        assert_eq!(rec.get("medal_type"), Some(&Value::from("Gold")));
    }

    #[test]
    fn venues_without_coordinates_are_kept() {
        let venues = Table::from_records(
            "venues",
            vec![
                Record::new().with("venue", "Grand Palais"),
                Record::new().with("venue", "Somewhere New"),
            ],
        );
        let coords = Lookup::from_entries(
            "venue_coords",
            [(
                "Grand Palais",
                Record::new().with("latitude", 48.866).with("longitude", 2.3117),
            )],
        );
        let lookups = Lookups {
            venue_coords: Some(coords),
            ..Default::default()
        };
        let session = Session::from_tables([(TableKind::Venues, venues)], &lookups, adapter());
        let venues = session.table(TableKind::Venues);
        assert_eq!(venues.len(), 2);
        assert!(venues.records[0].get("latitude").is_some());
        assert!(venues.records[1].get("latitude").is_none());
    }

    #[test]
    fn unloaded_tables_read_as_empty() {
        let session = Session::default();
        assert!(session.table(TableKind::Teams).is_empty());
        assert!(!session.is_loaded(TableKind::Teams));
    }
}
