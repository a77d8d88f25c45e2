//! Reading source files into [`RawTable`]s.
//!
//! Every failure here is a [`ReconError::SourceUnavailable`]: a source that
//! cannot be read in full aborts the load.

use std::path::Path;

use crate::error::ReconError;
use crate::model::{cell_from_field, RawTable};
use crate::normalize::overflow;

/// Read a delimited file from disk.
pub fn load_source(path: &Path) -> Result<RawTable, ReconError> {
    let bytes = std::fs::read(path)
        .map_err(|e| ReconError::source_unavailable(path.display().to_string(), e.to_string()))?;
    parse_source(&path.display().to_string(), &bytes)
}

/// Decode and parse source bytes. `label` names the source in errors.
pub fn parse_source(label: &str, bytes: &[u8]) -> Result<RawTable, ReconError> {
    let content = decode_utf8(bytes);
    let delimiter = sniff_delimiter(&content);
    parse_delimited(label, &content, delimiter)
}

/// Decode bytes as UTF-8, falling back to Windows-1252 (Excel exports).
pub fn decode_utf8(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Candidate delimiters. Later entries win ties, so comma is preferred.
const DELIMITERS: [u8; 4] = [b'|', b'\t', b';', b','];

/// Lines inspected when guessing the delimiter.
const SNIFF_LINES: usize = 10;

/// Guess the field delimiter from the header line and the lines after it.
///
/// A candidate must split the header into at least two fields; it scores the
/// header width times the number of sampled lines with that same width.
pub fn sniff_delimiter(content: &str) -> u8 {
    let sample: Vec<&str> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();
    let Some((header, data)) = sample.split_first() else {
        return b',';
    };

    DELIMITERS
        .iter()
        .filter_map(|&delim| {
            let width = field_count(header, delim);
            if width < 2 {
                return None;
            }
            let consistent = 1 + data.iter().filter(|line| field_count(line, delim) == width).count();
            Some((consistent * width, delim))
        })
        .max_by_key(|&(score, _)| score)
        .map_or(b',', |(_, delim)| delim)
}

fn field_count(line: &str, delimiter: u8) -> usize {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .and_then(Result::ok)
        .map_or(1, |record| record.len())
}

/// Parse delimited text whose first record is the header row.
///
/// Short records are padded with nulls; a record with more fields than the
/// header fails the whole source.
pub fn parse_delimited(label: &str, content: &str, delimiter: u8) -> Result<RawTable, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReconError::source_unavailable(label, e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ReconError::source_unavailable(label, "no header row"));
    }

    let width = headers.len();
    let mut table = RawTable::new(headers);
    for (n, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ReconError::source_unavailable(label, e.to_string()))?;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        if record.len() > width {
            return Err(overflow(label, n + 1, width, record.len()));
        }
        table.push_row(record.iter().map(cell_from_field).collect());
    }

    log::debug!("{label}: {} rows, {} columns", table.len(), table.headers.len());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn parses_header_and_nulls() {
        let table = parse_source("t", b"ACCOUNT_NO,NAME\n500,\n501,Asha\n").unwrap();
        assert_eq!(table.headers, vec!["ACCOUNT_NO", "NAME"]);
        assert_eq!(table.rows[0], vec![Some("500".into()), None]);
        assert_eq!(table.rows[1][1].as_deref(), Some("Asha"));
    }

    #[test]
    fn keeps_untrimmed_headers() {
        let table = parse_source("t", b" ACCTID ,LEGACYACCTID\nL1,500.0\n").unwrap();
        assert_eq!(table.headers[0], " ACCTID ");
        assert_eq!(table.rows[0][1].as_deref(), Some("500.0"));
    }

    #[test]
    fn strips_utf8_bom() {
        let table = parse_source("t", b"\xEF\xBB\xBFACCOUNT_NO\n1\n").unwrap();
        assert_eq!(table.headers, vec!["ACCOUNT_NO"]);
    }

    #[test]
    fn windows_1252_fallback() {
        // 0xE9 is 'é' in Windows-1252 and invalid as a lone UTF-8 byte
        let table = parse_source("t", b"ACCOUNT_NO,NAME\n1,Jos\xE9\n").unwrap();
        assert_eq!(table.rows[0][1].as_deref(), Some("José"));
    }

    #[test]
    fn sniffs_semicolons_and_tabs() {
        assert_eq!(sniff_delimiter("A;B;C\n1;2;3\n"), b';');
        assert_eq!(sniff_delimiter("A\tB\n1\t2\n"), b'\t');
        assert_eq!(sniff_delimiter("A,B\n1,2\n"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn quoted_field_with_delimiter() {
        let table = parse_source("t", b"ACCOUNT_NO,ADDRESS\n7,\"Ward 3, Sangrur\"\n").unwrap();
        assert_eq!(table.rows[0][1].as_deref(), Some("Ward 3, Sangrur"));
    }

    #[test]
    fn sniffs_pipes_and_ignores_leading_blank_lines() {
        assert_eq!(sniff_delimiter("\nA|B|C\n1|2|3\n"), b'|');
        // Comma wins when a single field is quoted around semicolons
        assert_eq!(sniff_delimiter("A,B\n\"x;y\",2\n"), b',');
    }

    #[test]
    fn short_record_padded() {
        let table = parse_source("t", b"ACCOUNT_NO,NAME,ADDRESS\n500,Asha\n").unwrap();
        assert_eq!(table.rows[0], vec![Some("500".into()), Some("Asha".into()), None]);
    }

    #[test]
    fn long_record_fails_source() {
        let err = parse_source("t", b"ACCOUNT_NO,NAME\n499,Ravi\n500,Asha,EXTRA,MORE\n").unwrap_err();
        assert!(matches!(err, ReconError::SourceUnavailable { .. }));
        assert!(err.to_string().contains("row 2: expected 2 fields, found 4"));
    }

    #[test]
    fn skips_blank_records() {
        let table = parse_source("t", b"A,B\n1,2\n,\n3,4\n").unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn empty_file_is_unavailable() {
        let err = parse_source("empty.csv", b"").unwrap_err();
        assert!(matches!(err, ReconError::SourceUnavailable { .. }));
        assert!(err.to_string().contains("empty.csv"));
    }

    #[test]
    fn missing_file_is_unavailable() {
        let dir = tempdir().unwrap();
        let err = load_source(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, ReconError::SourceUnavailable { .. }));
    }

    #[test]
    fn load_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data2.csv");
        fs::write(&path, "ACCOUNT_NO,METER_NUMBER\n500,MTR9\n").unwrap();
        let table = load_source(&path).unwrap();
        assert_eq!(table.len(), 1);
    }
}
