use std::collections::{BTreeMap, HashSet};

use crate::config::MergeConfig;
use crate::model::{Cell, MergeStats, NormalizedTable, UnifiedTable};

/// One side of the join: the table, its first row for each non-empty key,
/// and the rows whose key is empty.
struct Side<'a> {
    table: &'a NormalizedTable,
    by_key: BTreeMap<&'a str, usize>,
    unkeyed: Vec<usize>,
    duplicates: usize,
}

impl<'a> Side<'a> {
    fn index(label: &str, table: &'a NormalizedTable) -> Self {
        let mut by_key = BTreeMap::new();
        let mut unkeyed = Vec::new();
        let mut duplicates = 0;
        for row in 0..table.len() {
            let key = table.key(row);
            if key.is_empty() {
                unkeyed.push(row);
            } else if by_key.contains_key(key) {
                duplicates += 1;
                log::warn!("{label}: duplicate key '{key}' at row {}, keeping the first", row + 1);
            } else {
                by_key.insert(key, row);
            }
        }
        Self {
            table,
            by_key,
            unkeyed,
            duplicates,
        }
    }

    fn has_column(&self, name: &str) -> bool {
        self.table.column_index(name).is_some()
    }

    /// Non-null cell of `column` on `row`; `None` when either is absent.
    fn cell(&self, row: Option<usize>, column: &str) -> Option<&'a str> {
        let table = self.table;
        let idx = table.column_index(column)?;
        table.cell(row?, idx)
    }

    fn passthrough(&self) -> impl Iterator<Item = (usize, &'a str)> + '_ {
        let table = self.table;
        let key_index = table.key_index;
        table
            .headers
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != key_index)
            .map(|(i, h)| (i, h.as_str()))
    }
}

/// How `FINAL_METER` is resolved for a given pair of tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeterResolution {
    /// No alias column exists on either side: every row gets the sentinel.
    Neither,
    /// Exactly one alias column exists.
    Single(String),
    /// Several alias columns exist: first non-null in alias order.
    Ordered(Vec<String>),
}

impl MeterResolution {
    fn columns(&self) -> &[String] {
        match self {
            Self::Neither => &[],
            Self::Single(column) => std::slice::from_ref(column),
            Self::Ordered(columns) => columns,
        }
    }
}

fn resolve_meter(left: &Side<'_>, right: &Side<'_>, config: &MergeConfig) -> MeterResolution {
    let mut present: Vec<String> = config
        .meter
        .aliases
        .iter()
        .filter(|alias| left.has_column(alias) || right.has_column(alias))
        .cloned()
        .collect();

    match present.len() {
        0 => MeterResolution::Neither,
        1 => MeterResolution::Single(present.remove(0)),
        _ => MeterResolution::Ordered(present),
    }
}

/// Full outer join of two normalized tables on `config.key`.
///
/// Every non-empty key from either side yields exactly one row, ordered by
/// key. A key that repeats within one side keeps its first row. A row with an
/// empty key is never joined: it becomes its own row, before the keyed rows,
/// with values from its own side only. Columns present on
/// both sides are suffixed per origin; `coalesce` fields take the current
/// (right) value and fall back to the legacy (left) one; the meter column
/// resolves through the alias table.
pub fn merge(left: &NormalizedTable, right: &NormalizedTable, config: &MergeConfig) -> UnifiedTable {
    let left = Side::index("legacy", left);
    let right = Side::index("current", right);
    let columns = config.unified_columns();

    // Key union, each key tagged with the row on either side
    let mut keys: BTreeMap<&str, (Option<usize>, Option<usize>)> = BTreeMap::new();
    let unkeyed = left
        .unkeyed
        .iter()
        .map(|&row| ("", (Some(row), None)))
        .chain(right.unkeyed.iter().map(|&row| ("", (None, Some(row)))));
    for (&key, &row) in &left.by_key {
        keys.entry(key).or_default().0 = Some(row);
    }
    for (&key, &row) in &right.by_key {
        keys.entry(key).or_default().1 = Some(row);
    }

    let mut derived: Vec<&str> = config.coalesce.iter().map(|c| c.as_str()).collect();
    derived.push(&config.meter.output);
    let derived_set: HashSet<&str> = derived.iter().copied().collect();

    let left_names: HashSet<&str> = left.passthrough().map(|(_, h)| h).collect();
    let right_names: HashSet<&str> = right.passthrough().map(|(_, h)| h).collect();
    let [left_suffix, right_suffix] = &config.suffixes;

    // (side, source column index, output name)
    let mut plan: Vec<(bool, usize, String)> = Vec::new();
    for (i, name) in left.passthrough() {
        let out = if right_names.contains(name) {
            format!("{name}{left_suffix}")
        } else {
            name.to_string()
        };
        plan.push((false, i, out));
    }
    for (i, name) in right.passthrough() {
        let out = if left_names.contains(name) {
            format!("{name}{right_suffix}")
        } else {
            name.to_string()
        };
        plan.push((true, i, out));
    }
    // Derived columns supersede same-named passthrough columns
    plan.retain(|(_, _, out)| !derived_set.contains(out.as_str()) && *out != columns.key);

    let meter = resolve_meter(&left, &right, config);
    log::debug!("meter resolution: {meter:?}");

    let mut headers = Vec::with_capacity(1 + plan.len() + derived.len());
    headers.push(columns.key.clone());
    headers.extend(plan.iter().map(|(_, _, out)| out.clone()));
    headers.extend(derived.iter().map(|d| d.to_string()));

    let mut stats = MergeStats {
        left_rows: left.table.len(),
        right_rows: right.table.len(),
        unkeyed: left.unkeyed.len() + right.unkeyed.len(),
        duplicates_dropped: left.duplicates + right.duplicates,
        ..MergeStats::default()
    };

    let mut rows = Vec::with_capacity(stats.unkeyed + keys.len());
    for (key, (l, r)) in unkeyed.chain(keys) {
        match (l, r) {
            (Some(_), Some(_)) => stats.matched += 1,
            (Some(_), None) => stats.left_only += 1,
            (None, Some(_)) => stats.right_only += 1,
            (None, None) => {}
        }

        let mut row: Vec<Cell> = Vec::with_capacity(headers.len());
        row.push(Some(key.to_string()));

        for (is_right, idx, _) in &plan {
            let (side, at) = if *is_right { (&right, r) } else { (&left, l) };
            row.push(at.and_then(|at| side.table.cell(at, *idx)).map(str::to_string));
        }

        for field in &config.coalesce {
            let value = right.cell(r, field).or_else(|| left.cell(l, field));
            row.push(value.map(str::to_string));
        }

        let meter_value = meter
            .columns()
            .iter()
            .find_map(|alias| right.cell(r, alias).or_else(|| left.cell(l, alias)))
            .unwrap_or(&config.meter.default);
        row.push(Some(meter_value.to_string()));

        rows.push(row);
    }

    log::info!(
        "merged {} legacy + {} current rows into {} accounts ({} matched, {} legacy-only, {} current-only)",
        stats.left_rows,
        stats.right_rows,
        rows.len(),
        stats.matched,
        stats.left_only,
        stats.right_only,
    );

    UnifiedTable {
        headers,
        rows,
        columns,
        stats,
    }
}
