use crate::model::{UnifiedRecord, UnifiedTable};

/// A non-empty search term, lowercased once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    raw: String,
    folded: String,
}

impl Query {
    /// `None` for the empty string: nothing to search for. Whitespace is
    /// kept as typed and searched literally.
    pub fn new(text: &str) -> Option<Self> {
        if text.is_empty() {
            return None;
        }
        Some(Self {
            raw: text.to_string(),
            folded: text.to_lowercase(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Lowercased copy of every cell, built once per unified table.
///
/// Null cells stay `None` and never match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchIndex {
    rows: Vec<Vec<Option<String>>>,
}

impl SearchIndex {
    pub fn build(table: &UnifiedTable) -> Self {
        let rows = table
            .rows
            .iter()
            .map(|row| row.iter().map(|c| c.as_deref().map(str::to_lowercase)).collect())
            .collect();
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row indices where any cell contains the query, in table order.
    pub fn matching_rows<'a>(&'a self, query: &'a Query) -> impl Iterator<Item = usize> + 'a {
        self.rows.iter().enumerate().filter_map(move |(i, cells)| {
            cells
                .iter()
                .flatten()
                .any(|cell| cell.contains(query.folded.as_str()))
                .then_some(i)
        })
    }
}

/// Case-insensitive substring search over every cell of every row.
///
/// `index` must have been built from `table`.
pub fn search<'t>(table: &'t UnifiedTable, index: &SearchIndex, query: &Query) -> Vec<UnifiedRecord<'t>> {
    debug_assert_eq!(table.len(), index.len());
    index
        .matching_rows(query)
        .map(|row| table.record(row))
        .collect()
}
