use std::collections::HashMap;

use super::model::{Record, Table, Value};
use super::DataIssue;

// ---------------------------------------------------------------------------
// Lookup – a string-keyed reference table
// ---------------------------------------------------------------------------

/// Reference attributes keyed by a join value, e.g. NOC code → continent or
/// venue name → coordinates.
#[derive(Debug, Clone, Default)]
pub struct Lookup {
    name: String,
    entries: HashMap<String, Record>,
}

/// Outcome of one [`Lookup::attach`] pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinReport {
    pub matched: usize,
    pub unresolved: Vec<DataIssue>,
}

impl Lookup {
    /// Build a lookup from a loaded table, keyed by `key_field`.
    /// Rows without a key are skipped; the first row wins on duplicate keys.
    pub fn from_table(table: &Table, key_field: &str) -> Self {
        let mut entries = HashMap::new();
        for record in &table.records {
            let Some(key) = record.get(key_field) else {
                continue;
            };
            entries
                .entry(key.to_string())
                .or_insert_with(|| record.clone());
        }
        Lookup {
            name: table.name.clone(),
            entries,
        }
    }

    pub fn from_entries<K: Into<String>>(
        name: impl Into<String>,
        entries: impl IntoIterator<Item = (K, Record)>,
    ) -> Self {
        Lookup {
            name: name.into(),
            entries: entries.into_iter().map(|(k, r)| (k.into(), r)).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any entry carries `attribute`.
    pub fn provides(&self, attribute: &str) -> bool {
        self.entries.values().any(|r| r.get(attribute).is_some())
    }

    pub fn resolve(&self, key: &str) -> Option<&Record> {
        self.entries.get(key)
    }

    /// Copy `attributes` from the entry matching each record's `on` field.
    ///
    /// Fields the record already carries are left alone. A record whose key
    /// misses keeps null attributes; it is never dropped. Every attribute
    /// column exists on every record afterwards so downstream filters see it.
    pub fn attach(&self, table: &mut Table, on: &str, attributes: &[&str]) -> JoinReport {
        let mut report = JoinReport::default();

        for record in &mut table.records {
            let entry = record.get(on).map(|key| {
                let key = key.to_string();
                let found = self.entries.get(&key);
                (key, found)
            });

            match entry {
                Some((_, Some(found))) => {
                    report.matched += 1;
                    for attr in attributes {
                        if record.get(attr).is_none() {
                            let value = found.get(attr).cloned().unwrap_or(Value::Null);
                            record.set(*attr, value);
                        }
                    }
                }
                Some((key, None)) => {
                    let issue = DataIssue::UnresolvedJoin {
                        table: table.name.clone(),
                        lookup: self.name.clone(),
                        key,
                    };
                    log::debug!("{issue}");
                    report.unresolved.push(issue);
                    fill_absent(record, attributes);
                }
                None => fill_absent(record, attributes),
            }
        }

        if !report.unresolved.is_empty() {
            log::warn!(
                "{}: {} record(s) did not resolve against {}",
                table.name,
                report.unresolved.len(),
                self.name
            );
        }
        table.reindex();
        report
    }
}

fn fill_absent(record: &mut Record, attributes: &[&str]) {
    for attr in attributes {
        if !record.has_column(attr) {
            record.set(*attr, Value::Null);
        }
    }
}

/// Replace missing values of `field` with `fallback` (e.g. the `"Other"` continent bucket).
/// Returns how many records were filled.
pub fn fill_missing(table: &mut Table, field: &str, fallback: Value) -> usize {
    let mut filled = 0;
    for record in &mut table.records {
        if record.get(field).is_none() {
            record.set(field, fallback.clone());
            filled += 1;
        }
    }
    if filled > 0 {
        log::debug!("{}: {filled} record(s) defaulted '{field}' to {fallback}", table.name);
        table.reindex();
    }
    filled
}
