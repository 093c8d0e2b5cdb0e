use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Array, ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use parquet::arrow::ArrowWriter;

use crate::dashboard::{PageReport, Section, SectionData};
use crate::data::model::Value;

// ---------------------------------------------------------------------------
// Section → Arrow
// ---------------------------------------------------------------------------

/// Columnar form of a section; `None` for placeholders.
pub fn section_batch(section: &Section) -> Result<Option<RecordBatch>> {
    let mut columns: Vec<(String, ArrayRef)> = Vec::new();

    match &section.data {
        SectionData::Empty { .. } => return Ok(None),
        SectionData::Metrics { metrics } => {
            columns.push(text("metric", metrics.iter().map(|m| Some(m.label.clone()))));
            columns.push(number("value", metrics.iter().map(|m| Some(m.value))));
            columns.push(number("of", metrics.iter().map(|m| m.of)));
        }
        SectionData::Flat(flat) => {
            columns.push(text(&flat.key, flat.entries.iter().map(|(k, _)| label(k))));
            columns.push(number("value", flat.entries.iter().map(|(_, v)| Some(*v))));
        }
        SectionData::Hierarchy(tree) => {
            let paths = tree.paths();
            for (depth, level) in tree.levels.iter().enumerate() {
                columns.push(text(
                    level,
                    paths.iter().map(|(path, _)| path.get(depth).and_then(label)),
                ));
            }
            columns.push(number("value", paths.iter().map(|(_, v)| Some(*v))));
        }
        SectionData::Crosstab(table) => {
            columns.push(text(&table.row_key, table.rows.iter().map(|(k, _)| label(k))));
            for (i, name) in table.columns.iter().enumerate() {
                columns.push(number(
                    name,
                    table.rows.iter().map(|(_, cells)| cells.get(i).copied()),
                ));
            }
        }
        SectionData::Distribution(dist) => {
            let group_key = dist.group_key.as_deref().unwrap_or("group");
            let obs: Vec<(&Value, f64)> = dist
                .groups
                .iter()
                .flat_map(|(k, xs)| xs.iter().map(move |x| (k, *x)))
                .collect();
            columns.push(text(group_key, obs.iter().map(|(k, _)| label(k))));
            columns.push(number(&dist.value_field, obs.iter().map(|(_, x)| Some(*x))));
        }
        SectionData::Rows { columns: names, rows } => {
            for (i, name) in names.iter().enumerate() {
                columns.push(text(
                    name,
                    rows.iter().map(|row| row.get(i).and_then(label)),
                ));
            }
        }
    }

    let schema = Arc::new(Schema::new(
        columns
            .iter()
            .map(|(name, array)| Field::new(name, array.data_type().clone(), true))
            .collect::<Vec<_>>(),
    ));
    let arrays = columns.into_iter().map(|(_, array)| array).collect();
    let batch = RecordBatch::try_new(schema, arrays)
        .with_context(|| format!("building columns for '{}'", section.title))?;
    Ok(Some(batch))
}

fn label(value: &Value) -> Option<String> {
    (!value.is_null()).then(|| value.to_string())
}

fn text(name: &str, values: impl Iterator<Item = Option<String>>) -> (String, ArrayRef) {
    let array: StringArray = values.collect::<Vec<_>>().into();
    (name.to_string(), Arc::new(array))
}

fn number(name: &str, values: impl Iterator<Item = Option<f64>>) -> (String, ArrayRef) {
    let array: Float64Array = values.collect::<Vec<_>>().into();
    (name.to_string(), Arc::new(array))
}

// ---------------------------------------------------------------------------
// Renderers
// ---------------------------------------------------------------------------

/// Plain-text rendering: one ASCII table per section, placeholders as text.
pub fn pretty(report: &PageReport) -> Result<String> {
    let mut out = format!("== {} ==\n", report.title);
    for section in &report.sections {
        out.push_str(&format!("\n-- {} --\n", section.title));
        match (&section.data, section_batch(section)?) {
            (SectionData::Empty { message }, _) => {
                out.push_str(message);
                out.push('\n');
            }
            (_, Some(batch)) => {
                let table = pretty_format_batches(&[batch])
                    .with_context(|| format!("formatting '{}'", section.title))?;
                out.push_str(&format!("{table}\n"));
            }
            (_, None) => {}
        }
    }
    Ok(out)
}

pub fn to_json(report: &PageReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("serializing report")
}

/// Write every non-empty section to `<dir>/<page>__<section>.parquet`.
pub fn write_parquet(report: &PageReport, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating output directory {}", dir.display()))?;

    let mut written = Vec::new();
    for section in &report.sections {
        let Some(batch) = section_batch(section)? else {
            log::debug!("skipping empty section '{}'", section.title);
            continue;
        };
        let path = dir.join(format!(
            "{}__{}.parquet",
            slug(&report.title),
            slug(&section.title)
        ));
        let file = std::fs::File::create(&path)
            .with_context(|| format!("creating {}", path.display()))?;
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
        writer.write(&batch)?;
        writer.close()?;
        log::info!("wrote {} rows to {}", batch.num_rows(), path.display());
        written.push(path);
    }
    Ok(written)
}

/// Lowercase ASCII file-name form of a title.
fn slug(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
    }
    out.trim_end_matches('_').to_string()
}
