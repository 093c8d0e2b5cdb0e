//! Group-by aggregation over filtered records.
//!
//! Every shape here preserves first-appearance order of keys unless a
//! caller explicitly re-sorts, so results are reproducible for a given input.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use super::model::{Record, Value};
use super::DataIssue;

// ---------------------------------------------------------------------------
// Result shapes
// ---------------------------------------------------------------------------

/// One level of grouping: `(category, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlatAggregate {
    /// Field the categories come from.
    pub key: String,
    pub entries: Vec<(Value, f64)>,
}

impl FlatAggregate {
    pub fn from_entries(key: impl Into<String>, entries: Vec<(Value, f64)>) -> Self {
        FlatAggregate {
            key: key.into(),
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all values.
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v).sum()
    }

    /// Value for the category whose label is `label`.
    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(k, _)| k.to_string() == label)
            .map(|(_, v)| *v)
    }

    /// Descending by value; ties keep their current relative order.
    pub fn sorted_by_value_desc(mut self) -> Self {
        self.entries.sort_by(|a, b| b.1.total_cmp(&a.1));
        self
    }

    /// Ascending by category.
    pub fn sorted_by_key(mut self) -> Self {
        self.entries.sort_by(|a, b| a.0.cmp(&b.0));
        self
    }
}

/// A node of a hierarchical roll-up. `value` always equals the sum of the
/// children's values for inner nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub key: Value,
    pub value: f64,
    pub children: Vec<Node>,
}

/// Multi-level grouping suitable for treemaps and sunbursts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Hierarchy {
    /// Group keys, outermost first.
    pub levels: Vec<String>,
    pub roots: Vec<Node>,
}

impl Hierarchy {
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.roots.iter().map(|n| n.value).sum()
    }

    /// Every node as `(path, value)` in pre-order; each path is a prefix of
    /// the level list.
    pub fn paths(&self) -> Vec<(Vec<Value>, f64)> {
        let mut out = Vec::new();
        let mut prefix = Vec::new();
        for root in &self.roots {
            walk(root, &mut prefix, &mut out, false);
        }
        out
    }

    /// Only the full-depth paths.
    pub fn leaves(&self) -> Vec<(Vec<Value>, f64)> {
        let mut out = Vec::new();
        let mut prefix = Vec::new();
        for root in &self.roots {
            walk(root, &mut prefix, &mut out, true);
        }
        out
    }

    /// Node reached by following category labels from the top.
    pub fn node(&self, path: &[&str]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.roots.iter().find(|n| n.key.to_string() == *first)?;
        for label in rest {
            node = node.children.iter().find(|n| n.key.to_string() == *label)?;
        }
        Some(node)
    }
}

fn walk(node: &Node, prefix: &mut Vec<Value>, out: &mut Vec<(Vec<Value>, f64)>, leaves_only: bool) {
    prefix.push(node.key.clone());
    if !leaves_only || node.children.is_empty() {
        out.push((prefix.clone(), node.value));
    }
    for child in &node.children {
        walk(child, prefix, out, leaves_only);
    }
    prefix.pop();
}

/// Either aggregate shape, chosen by the number of group keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AggregateView {
    Flat(FlatAggregate),
    Hierarchical(Hierarchy),
}

impl AggregateView {
    pub fn is_empty(&self) -> bool {
        match self {
            AggregateView::Flat(f) => f.is_empty(),
            AggregateView::Hierarchical(h) => h.is_empty(),
        }
    }

    pub fn total(&self) -> f64 {
        match self {
            AggregateView::Flat(f) => f.total(),
            AggregateView::Hierarchical(h) => h.total(),
        }
    }

    pub fn into_flat(self) -> Option<FlatAggregate> {
        match self {
            AggregateView::Flat(f) => Some(f),
            AggregateView::Hierarchical(_) => None,
        }
    }

    pub fn into_hierarchy(self) -> Option<Hierarchy> {
        match self {
            AggregateView::Hierarchical(h) => Some(h),
            AggregateView::Flat(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Group-by
// ---------------------------------------------------------------------------

/// Group `records` by `group_keys` and count rows, or sum `value_field`.
///
/// One key yields [`AggregateView::Flat`], more yield
/// [`AggregateView::Hierarchical`]. A record missing any group key, or a
/// numeric `value_field` in sum mode, is left out of this view only.
pub fn aggregate<'a, I>(records: I, group_keys: &[&str], value_field: Option<&str>) -> AggregateView
where
    I: IntoIterator<Item = &'a Record>,
{
    match group_keys {
        [] => {
            log::warn!("aggregate called without group keys");
            AggregateView::Flat(FlatAggregate::default())
        }
        [key] => AggregateView::Flat(group(records, key, value_field)),
        keys => AggregateView::Hierarchical(roll_up(records, keys, value_field)),
    }
}

/// Row count per category of `key`, in first-appearance order.
pub fn group_count<'a, I>(records: I, key: &str) -> FlatAggregate
where
    I: IntoIterator<Item = &'a Record>,
{
    group(records, key, None)
}

/// Sum of `value_field` per category of `key`, in first-appearance order.
pub fn group_sum<'a, I>(records: I, key: &str, value_field: &str) -> FlatAggregate
where
    I: IntoIterator<Item = &'a Record>,
{
    group(records, key, Some(value_field))
}

fn group<'a, I>(records: I, key: &str, value_field: Option<&str>) -> FlatAggregate
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut index: HashMap<Value, usize> = HashMap::new();
    let mut entries: Vec<(Value, f64)> = Vec::new();
    let mut omitted = 0usize;

    for rec in records {
        let (Some(category), Some(amount)) = (rec.get(key), measure(rec, value_field)) else {
            omitted += 1;
            continue;
        };
        match index.get(category) {
            Some(&i) => entries[i].1 += amount,
            None => {
                index.insert(category.clone(), entries.len());
                entries.push((category.clone(), amount));
            }
        }
    }

    report_omitted(key, value_field, omitted);
    FlatAggregate::from_entries(key, entries)
}

/// Hierarchical roll-up over `keys`, outermost first.
pub fn roll_up<'a, I>(records: I, keys: &[&str], value_field: Option<&str>) -> Hierarchy
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut root = NodeBuilder::default();
    let mut omitted = 0usize;

    for rec in records {
        let path: Option<Vec<&Value>> = keys.iter().map(|k| rec.get(k)).collect();
        let (Some(path), Some(amount)) = (path, measure(rec, value_field)) else {
            omitted += 1;
            continue;
        };
        root.add(&path, amount);
    }

    report_omitted(&keys.join("/"), value_field, omitted);
    Hierarchy {
        levels: keys.iter().map(|k| k.to_string()).collect(),
        roots: root.children.into_iter().map(NodeBuilder::finish).collect(),
    }
}

/// 1 per record in count mode, the numeric field in sum mode.
fn measure(rec: &Record, value_field: Option<&str>) -> Option<f64> {
    match value_field {
        None => Some(1.0),
        Some(field) => rec.get(field).and_then(Value::as_f64),
    }
}

fn report_omitted(key: &str, value_field: Option<&str>, omitted: usize) {
    if omitted > 0 {
        let field = match value_field {
            Some(v) => format!("{key}|{v}"),
            None => key.to_string(),
        };
        log::debug!("{}", DataIssue::MissingAttribute { field, omitted });
    }
}

#[derive(Default)]
struct NodeBuilder {
    key: Option<Value>,
    value: f64,
    children: Vec<NodeBuilder>,
    index: HashMap<Value, usize>,
}

impl NodeBuilder {
    fn add(&mut self, path: &[&Value], amount: f64) {
        self.value += amount;
        let Some((head, rest)) = path.split_first() else {
            return;
        };
        let slot = match self.index.get(*head) {
            Some(&i) => i,
            None => {
                self.index.insert((*head).clone(), self.children.len());
                self.children.push(NodeBuilder {
                    key: Some((*head).clone()),
                    ..Default::default()
                });
                self.children.len() - 1
            }
        };
        self.children[slot].add(rest, amount);
    }

    fn finish(self) -> Node {
        Node {
            key: self.key.unwrap_or(Value::Null),
            value: self.value,
            children: self.children.into_iter().map(NodeBuilder::finish).collect(),
        }
    }
}

/// The `n` largest entries, descending. Ties keep the order produced by
/// [`aggregate`] (stable sort), so repeated runs agree.
pub fn top_n(aggregate: &FlatAggregate, n: usize) -> FlatAggregate {
    let mut top = aggregate.clone().sorted_by_value_desc();
    top.entries.truncate(n);
    top
}

// ---------------------------------------------------------------------------
// Crosstab
// ---------------------------------------------------------------------------

/// Row key × column key counts with zero fill.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Crosstab {
    pub row_key: String,
    pub column_key: String,
    pub columns: Vec<String>,
    /// Sorted by row category; each vector aligns with `columns`.
    pub rows: Vec<(Value, Vec<f64>)>,
}

impl Crosstab {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: &str, column: &str) -> Option<f64> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows
            .iter()
            .find(|(k, _)| k.to_string() == row)
            .map(|(_, cells)| cells[col])
    }
}

/// Count records per `(row_key, column_key)` pair.
///
/// `columns` are always present, in the given order, even when nothing
/// falls into them; other column categories follow in first-appearance order.
pub fn crosstab<'a, I>(records: I, row_key: &str, column_key: &str, columns: &[&str]) -> Crosstab
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut column_names: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
    let mut counts: BTreeMap<Value, HashMap<String, f64>> = BTreeMap::new();
    let mut omitted = 0usize;

    for rec in records {
        let (Some(row), Some(col)) = (rec.get(row_key), rec.get(column_key)) else {
            omitted += 1;
            continue;
        };
        let col = col.to_string();
        if !column_names.contains(&col) {
            column_names.push(col.clone());
        }
        *counts.entry(row.clone()).or_default().entry(col).or_default() += 1.0;
    }

    report_omitted(&format!("{row_key}×{column_key}"), None, omitted);
    let rows = counts
        .into_iter()
        .map(|(row, cells)| {
            let aligned = column_names
                .iter()
                .map(|c| cells.get(c).copied().unwrap_or(0.0))
                .collect();
            (row, aligned)
        })
        .collect();

    Crosstab {
        row_key: row_key.to_string(),
        column_key: column_key.to_string(),
        columns: column_names,
        rows,
    }
}

// ---------------------------------------------------------------------------
// Distribution
// ---------------------------------------------------------------------------

/// Numeric values per group, the input of violin and box plots.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Distribution {
    pub group_key: Option<String>,
    pub value_field: String,
    pub groups: Vec<(Value, Vec<f64>)>,
}

impl Distribution {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of observations across groups.
    pub fn len(&self) -> usize {
        self.groups.iter().map(|(_, v)| v.len()).sum()
    }
}

/// Collect numeric `value_field` observations per `group_key` category, or
/// into a single `"All"` group when no key is given.
pub fn distribution<'a, I>(records: I, group_key: Option<&str>, value_field: &str) -> Distribution
where
    I: IntoIterator<Item = &'a Record>,
{
    let all = Value::from("All");
    let mut index: HashMap<Value, usize> = HashMap::new();
    let mut groups: Vec<(Value, Vec<f64>)> = Vec::new();
    let mut omitted = 0usize;

    for rec in records {
        let category = match group_key {
            Some(key) => rec.get(key),
            None => Some(&all),
        };
        let (Some(category), Some(x)) = (category, rec.get(value_field).and_then(Value::as_f64))
        else {
            omitted += 1;
            continue;
        };
        match index.get(category) {
            Some(&i) => groups[i].1.push(x),
            None => {
                index.insert(category.clone(), groups.len());
                groups.push((category.clone(), vec![x]));
            }
        }
    }

    report_omitted(group_key.unwrap_or("All"), Some(value_field), omitted);
    Distribution {
        group_key: group_key.map(str::to_string),
        value_field: value_field.to_string(),
        groups,
    }
}

// ---------------------------------------------------------------------------
// Scalar summaries
// ---------------------------------------------------------------------------

/// Number of distinct non-null values of `field`.
pub fn distinct_count<'a, I>(records: I, field: &str) -> usize
where
    I: IntoIterator<Item = &'a Record>,
{
    records
        .into_iter()
        .filter_map(|r| r.get(field))
        .collect::<BTreeSet<_>>()
        .len()
}

/// Sum of the numeric values of `field`; non-numeric cells are skipped.
pub fn sum_field<'a, I>(records: I, field: &str) -> f64
where
    I: IntoIterator<Item = &'a Record>,
{
    records
        .into_iter()
        .filter_map(|r| r.get(field).and_then(Value::as_f64))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn medals() -> Vec<Record> {
        let rows = [
            ("Europe", "France", "Judo", "Gold"),
            ("Europe", "France", "Judo", "Silver"),
            ("Africa", "Kenya", "Athletics", "Gold"),
            ("Europe", "Italy", "Fencing", "Bronze"),
            ("Europe", "France", "Rowing", "Gold"),
        ];
        rows.iter()
            .map(|(cont, country, sport, medal)| {
                Record::new()
                    .with("continent", *cont)
                    .with("country", *country)
                    .with("sport", *sport)
                    .with("medal_type", *medal)
            })
            .collect()
    }

    #[test]
    fn top_n_breaks_ties_by_first_appearance() {
        let data = vec![
            rec(&[("c", "A".into()), ("v", 1_i64.into())]),
            rec(&[("c", "B".into()), ("v", 1_i64.into())]),
            rec(&[("c", "C".into()), ("v", 2_i64.into())]),
        ];
        let summed = group_sum(&data, "c", "v");
        assert_eq!(
            top_n(&summed, 2).entries,
            vec![(Value::from("C"), 2.0), (Value::from("A"), 1.0)]
        );

        let counted = group_count(&data, "c");
        assert_eq!(
            top_n(&counted, 2).entries,
            vec![(Value::from("A"), 1.0), (Value::from("B"), 1.0)]
        );
    }

    #[test]
    fn flat_counts_in_first_appearance_order() {
        let data = medals();
        let by_country = group_count(&data, "country");
        assert_eq!(
            by_country.entries,
            vec![
                (Value::from("France"), 3.0),
                (Value::from("Kenya"), 1.0),
                (Value::from("Italy"), 1.0),
            ]
        );
        assert_eq!(by_country.total(), 5.0);
        assert_eq!(
            by_country.clone().sorted_by_key().entries[0].0,
            Value::from("France")
        );
        assert_eq!(by_country.get("Kenya"), Some(1.0));
    }

    #[test]
    fn records_missing_the_key_are_left_out() {
        let mut data = medals();
        data.push(Record::new().with("sport", "Judo").with("medal_type", "Gold"));
        assert_eq!(group_count(&data, "country").total(), 5.0);
        assert_eq!(group_count(&data, "sport").total(), 6.0);
    }

    #[test]
    fn sum_mode_skips_non_numeric_values() {
        let data = vec![
            Record::new().with("country", "France").with("total", 64_i64),
            Record::new().with("country", "Kenya").with("total", "n/a"),
            Record::new().with("country", "Italy").with("total", 40_i64),
        ];
        let summed = group_sum(&data, "country", "total");
        assert_eq!(summed.len(), 2);
        assert_eq!(sum_field(&data, "total"), 104.0);
    }

    #[test]
    fn hierarchy_rolls_up_exactly() {
        let data = medals();
        let view = aggregate(&data, &["continent", "country", "sport", "medal_type"], None);
        let tree = view.into_hierarchy().unwrap();

        assert_eq!(tree.total(), 5.0);
        let europe = tree.node(&["Europe"]).unwrap();
        assert_eq!(europe.value, 4.0);
        assert_eq!(europe.children.iter().map(|c| c.value).sum::<f64>(), 4.0);
        assert_eq!(tree.node(&["Europe", "France", "Judo"]).unwrap().value, 2.0);
        assert_eq!(tree.leaves().len(), 5);
        assert_eq!(
            tree.paths()[0],
            (vec![Value::from("Europe")], 4.0)
        );
        assert!(tree.node(&["Oceania"]).is_none());
    }

    #[test]
    fn single_key_is_flat() {
        let data = medals();
        let view = aggregate(&data, &["medal_type"], None);
        let flat = view.into_flat().unwrap();
        assert_eq!(flat.get("Gold"), Some(3.0));
    }

    #[test]
    fn empty_input_gives_empty_views() {
        let data: Vec<Record> = Vec::new();
        assert!(aggregate(&data, &["country"], None).is_empty());
        assert!(aggregate(&data, &["continent", "country"], None).is_empty());
        assert!(crosstab(&data, "continent", "medal_type", &["Gold"]).is_empty());
        assert!(distribution(&data, None, "age").is_empty());
        assert_eq!(distinct_count(&data, "country"), 0);
    }

    #[test]
    fn crosstab_fills_zero_and_keeps_requested_columns() {
        let data = medals();
        let table = crosstab(&data, "continent", "medal_type", &["Gold", "Silver", "Bronze"]);
        assert_eq!(table.columns, vec!["Gold", "Silver", "Bronze"]);
        assert_eq!(table.rows[0].0, Value::from("Africa"));
        assert_eq!(table.cell("Africa", "Gold"), Some(1.0));
        assert_eq!(table.cell("Africa", "Bronze"), Some(0.0));
        assert_eq!(table.cell("Europe", "Gold"), Some(2.0));
    }

    #[test]
    fn distribution_groups_numeric_values() {
        let data = vec![
            Record::new().with("sport", "Judo").with("age", 24_i64),
            Record::new().with("sport", "Rowing").with("age", 31_i64),
            Record::new().with("sport", "Judo").with("age", 19_i64),
            Record::new().with("sport", "Judo").with("age", Value::Null),
        ];
        let by_sport = distribution(&data, Some("sport"), "age");
        assert_eq!(
            by_sport.groups,
            vec![
                (Value::from("Judo"), vec![24.0, 19.0]),
                (Value::from("Rowing"), vec![31.0]),
            ]
        );
        let all = distribution(&data, None, "age");
        assert_eq!(all.groups.len(), 1);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn distinct_count_ignores_nulls() {
        let data = vec![
            Record::new().with("sport", "Judo"),
            Record::new().with("sport", "Judo"),
            Record::new().with("sport", Value::Null),
            Record::new().with("sport", "Rowing"),
        ];
        assert_eq!(distinct_count(&data, "sport"), 2);
    }
}
