use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Canonical column names shared by the legacy and current schemas.
pub const ACCOUNT_NO: &str = "ACCOUNT_NO";
pub const OLD_LEGACY_ID: &str = "OLD_LEGACY_ID";
pub const NAME: &str = "NAME";
pub const ADDRESS: &str = "ADDRESS";
pub const FINAL_METER: &str = "FINAL_METER";
pub const METER_NUMBER: &str = "METER_NUMBER";
pub const MTR_SER_NO: &str = "MTR_SER_NO";
pub const LATITUDE: &str = "LATITUDE";
pub const LONGITUDE: &str = "LONGITUDE";
pub const VILLAGE_MRU: &str = "Village/MRU";

/// Display default for absent fields.
pub const NOT_AVAILABLE: &str = "N/A";

/// A single cell. `None` is a null (empty field in the source file).
pub type Cell = Option<String>;

// ---------------------------------------------------------------------------
// Raw input
// ---------------------------------------------------------------------------

/// One source file as read from disk: headers as written, every cell text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Build a table from string literals; empty strings become nulls.
    pub fn from_text_rows(headers: &[&str], rows: &[&[&str]]) -> Self {
        let mut table = Self::new(headers.iter().map(|h| h.to_string()).collect());
        for row in rows {
            table.push_row(row.iter().map(|v| cell_from_field(v)).collect());
        }
        table
    }

    /// Append a row, padding short rows with nulls. Overflow cells are kept;
    /// [`normalize`](crate::normalize) rejects such rows.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        if row.len() < self.headers.len() {
            row.resize(self.headers.len(), None);
        }
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Map a raw CSV field to a cell. Empty fields are nulls.
pub fn cell_from_field(field: &str) -> Cell {
    if field.is_empty() {
        None
    } else {
        Some(field.to_string())
    }
}

// ---------------------------------------------------------------------------
// Normalized
// ---------------------------------------------------------------------------

/// A source after header trimming, renaming and key canonicalization.
///
/// The key column always holds `Some(canonical_key)`; every other column is
/// passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    pub key_index: usize,
}

impl NormalizedTable {
    pub fn key_column(&self) -> &str {
        &self.headers[self.key_index]
    }

    pub fn key(&self, row: usize) -> &str {
        self.cell(row, self.key_index).unwrap_or("")
    }

    /// Cell at `(row, column)`; `None` when null or out of range.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column)?.as_deref()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Unified
// ---------------------------------------------------------------------------

/// Names of the structural columns of a unified table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnifiedColumns {
    pub key: String,
    pub legacy_id: String,
    pub meter: String,
}

impl Default for UnifiedColumns {
    fn default() -> Self {
        Self {
            key: ACCOUNT_NO.into(),
            legacy_id: OLD_LEGACY_ID.into(),
            meter: FINAL_METER.into(),
        }
    }
}

/// Counts gathered while merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub left_rows: usize,
    pub right_rows: usize,
    pub matched: usize,
    pub left_only: usize,
    pub right_only: usize,
    /// Rows with an empty key. Each is emitted on its own, never joined, and
    /// is also counted in `left_only` or `right_only`.
    pub unkeyed: usize,
    pub duplicates_dropped: usize,
}

/// The merged table, ordered by key.
///
/// At most one row per non-empty canonical key. Rows whose key is empty come
/// first, one per source row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnifiedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    pub columns: UnifiedColumns,
    pub stats: MergeStats,
}

impl UnifiedTable {
    /// An empty table with only the key column.
    pub fn empty(columns: UnifiedColumns) -> Self {
        Self {
            headers: vec![columns.key.clone()],
            rows: Vec::new(),
            columns,
            stats: MergeStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn record(&self, row: usize) -> UnifiedRecord<'_> {
        UnifiedRecord { table: self, row }
    }

    pub fn records(&self) -> impl Iterator<Item = UnifiedRecord<'_>> + '_ {
        (0..self.rows.len()).map(move |row| self.record(row))
    }

    /// Look up the row for a canonical key.
    pub fn find(&self, key: &str) -> Option<UnifiedRecord<'_>> {
        let idx = self.column_index(&self.columns.key)?;
        self.rows
            .binary_search_by(|row| row.get(idx).and_then(|c| c.as_deref()).unwrap_or("").cmp(key))
            .ok()
            .map(|row| self.record(row))
    }
}

/// A borrowed view of one unified row.
///
/// Lookups never panic: an absent column and a null cell both read as `None`.
#[derive(Debug, Clone, Copy)]
pub struct UnifiedRecord<'a> {
    table: &'a UnifiedTable,
    row: usize,
}

impl<'a> UnifiedRecord<'a> {
    pub fn row_index(&self) -> usize {
        self.row
    }

    pub fn get(&self, column: &str) -> Option<&'a str> {
        let idx = self.table.column_index(column)?;
        self.table.rows.get(self.row)?.get(idx)?.as_deref()
    }

    pub fn get_or(&self, column: &str, default: &'a str) -> &'a str {
        self.get(column).unwrap_or(default)
    }

    pub fn account_no(&self) -> &'a str {
        self.get(&self.table.columns.key).unwrap_or("")
    }

    pub fn legacy_id(&self) -> Option<&'a str> {
        self.get(&self.table.columns.legacy_id)
    }

    pub fn name(&self) -> Option<&'a str> {
        self.get(NAME)
    }

    pub fn address(&self) -> Option<&'a str> {
        self.get(ADDRESS)
    }

    pub fn final_meter(&self) -> Option<&'a str> {
        self.get(&self.table.columns.meter)
    }

    /// `(column, cell)` pairs in header order.
    pub fn fields(&self) -> impl Iterator<Item = (&'a str, Option<&'a str>)> + 'a {
        let table = self.table;
        let cells = table.rows.get(self.row).map(Vec::as_slice).unwrap_or(&[]);
        table
            .headers
            .iter()
            .zip(cells.iter().chain(std::iter::repeat(&None)))
            .map(|(h, c)| (h.as_str(), c.as_deref()))
    }
}

impl PartialEq for UnifiedRecord<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.table, other.table) && self.row == other.row
    }
}

impl Eq for UnifiedRecord<'_> {}

impl Serialize for UnifiedRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.table.headers.len()))?;
        for (column, value) in self.fields() {
            map.serialize_entry(column, &value)?;
        }
        map.end()
    }
}
