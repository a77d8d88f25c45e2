use std::collections::{BTreeMap, HashSet};

use crate::error::ReconError;
use crate::model::{NormalizedTable, RawTable};

/// Canonical form of a join key: trimmed, cut at the first `.`.
///
/// Numeric parsing upstream turns `00123` into `00123.0`; both forms must
/// compare equal. A null key becomes the empty key.
pub fn canonical_key(raw: Option<&str>) -> String {
    let trimmed = raw.unwrap_or("").trim();
    match trimmed.split_once('.') {
        Some((head, _)) => head.to_string(),
        None => trimmed.to_string(),
    }
}

/// Trim headers, apply `rename`, and canonicalize `key_column`.
///
/// `label` names the source in errors. Fails when the key column is missing
/// after renaming, two columns end up with the same name, or a row has more
/// cells than there are headers. Short rows are padded with nulls.
pub fn normalize(
    label: &str,
    table: RawTable,
    key_column: &str,
    rename: &BTreeMap<String, String>,
) -> Result<NormalizedTable, ReconError> {
    let headers: Vec<String> = table
        .headers
        .iter()
        .map(|h| {
            let trimmed = h.trim();
            rename
                .get(trimmed)
                .cloned()
                .unwrap_or_else(|| trimmed.to_string())
        })
        .collect();

    let mut seen = HashSet::new();
    for h in &headers {
        if !seen.insert(h.as_str()) {
            return Err(ReconError::source_unavailable(
                label,
                format!("duplicate column '{h}' after trimming and renaming"),
            ));
        }
    }

    let key_index = headers.iter().position(|h| h == key_column).ok_or_else(|| {
        ReconError::source_unavailable(label, format!("missing key column '{key_column}'"))
    })?;

    let width = headers.len();
    let mut empty_keys = 0usize;
    let mut rows = Vec::with_capacity(table.rows.len());
    for (n, mut row) in table.rows.into_iter().enumerate() {
        if row.len() > width {
            return Err(overflow(label, n + 1, width, row.len()));
        }
        row.resize(width, None);
        let key = canonical_key(row[key_index].as_deref());
        if key.is_empty() {
            empty_keys += 1;
        }
        row[key_index] = Some(key);
        rows.push(row);
    }

    if empty_keys > 0 {
        log::warn!("{label}: {empty_keys} row(s) have an empty '{key_column}', kept unmatched");
    }

    Ok(NormalizedTable {
        headers,
        rows,
        key_index,
    })
}

/// Error for a data row (1-based) with more fields than the header.
pub(crate) fn overflow(label: &str, row: usize, expected: usize, found: usize) -> ReconError {
    ReconError::source_unavailable(
        label,
        format!("row {row}: expected {expected} fields, found {found}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_rename() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("ACCTID".to_string(), "OLD_LEGACY_ID".to_string()),
            ("LEGACYACCTID".to_string(), "ACCOUNT_NO".to_string()),
        ])
    }

    #[test]
    fn key_forms_converge() {
        assert_eq!(canonical_key(Some("00123.0")), "00123");
        assert_eq!(canonical_key(Some(" 00123 ")), "00123");
        assert_eq!(canonical_key(Some("500")), "500");
        assert_eq!(canonical_key(Some("1.2.3")), "1");
        assert_eq!(canonical_key(Some(".5")), "");
        assert_eq!(canonical_key(None), "");
    }

    #[test]
    fn trims_renames_and_cleans_key() {
        let raw = RawTable::from_text_rows(
            &[" ACCTID", "LEGACYACCTID ", " NAME "],
            &[&["L1", " 500.0", "John"], &["L2", "501", ""]],
        );
        let table = normalize("legacy", raw, "ACCOUNT_NO", &legacy_rename()).unwrap();
        assert_eq!(table.headers, vec!["OLD_LEGACY_ID", "ACCOUNT_NO", "NAME"]);
        assert_eq!(table.key_index, 1);
        assert_eq!(table.key(0), "500");
        assert_eq!(table.key(1), "501");
        assert_eq!(table.rows[0][2].as_deref(), Some("John"));
        assert_eq!(table.rows[1][2], None);
    }

    #[test]
    fn empty_rename_map() {
        let raw = RawTable::from_text_rows(&["ACCOUNT_NO", "LATITUDE"], &[&["9.0", "30.2"]]);
        let table = normalize("current", raw, "ACCOUNT_NO", &BTreeMap::new()).unwrap();
        assert_eq!(table.key(0), "9");
        // Non-key columns are untouched, decimals included
        assert_eq!(table.rows[0][1].as_deref(), Some("30.2"));
    }

    #[test]
    fn null_key_becomes_empty() {
        let raw = RawTable::from_text_rows(&["ACCOUNT_NO", "NAME"], &[&["", "Ghost"]]);
        let table = normalize("current", raw, "ACCOUNT_NO", &BTreeMap::new()).unwrap();
        assert_eq!(table.key(0), "");
    }

    #[test]
    fn short_rows_padded_long_rows_rejected() {
        let mut raw = RawTable::new(vec!["ACCOUNT_NO".into(), "NAME".into()]);
        raw.rows.push(vec![Some("7".into())]);
        let table = normalize("current", raw.clone(), "ACCOUNT_NO", &BTreeMap::new()).unwrap();
        assert_eq!(table.rows[0], vec![Some("7".into()), None]);

        raw.rows.push(vec![Some("8".into()), Some("Asha".into()), Some("EXTRA".into())]);
        let err = normalize("current", raw, "ACCOUNT_NO", &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ReconError::SourceUnavailable { .. }));
        assert!(err.to_string().contains("row 2: expected 2 fields, found 3"));
    }

    #[test]
    fn missing_key_column() {
        let raw = RawTable::from_text_rows(&["ACCTID"], &[&["L1"]]);
        let err = normalize("legacy", raw, "ACCOUNT_NO", &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ReconError::SourceUnavailable { .. }));
        assert!(err.to_string().contains("missing key column 'ACCOUNT_NO'"));
    }

    #[test]
    fn collision_after_trim() {
        let raw = RawTable::from_text_rows(&["ACCOUNT_NO", "NAME", " NAME"], &[]);
        let err = normalize("current", raw, "ACCOUNT_NO", &BTreeMap::new()).unwrap_err();
        assert!(err.to_string().contains("duplicate column 'NAME'"));
    }
}
