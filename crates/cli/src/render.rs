// Presentation of unified records: text blocks, JSON, CSV.
// No loading, no clap.

use std::io::{self, Write};

use acctmap_recon::model::{LATITUDE, LONGITUDE, NOT_AVAILABLE, VILLAGE_MRU};
use acctmap_recon::{UnifiedRecord, UnifiedTable};

/// Map search link, only when both coordinates are present.
pub fn map_link(record: &UnifiedRecord<'_>) -> Option<String> {
    let lat = record.get(LATITUDE)?;
    let lon = record.get(LONGITUDE)?;
    Some(format!(
        "https://www.google.com/maps/search/?api=1&query={lat},{lon}"
    ))
}

/// One human-readable block per record.
pub fn write_record<W: Write>(out: &mut W, record: &UnifiedRecord<'_>) -> io::Result<()> {
    let na = NOT_AVAILABLE;
    writeln!(
        out,
        "{} | SAP: {}",
        record.name().unwrap_or(na),
        record.account_no()
    )?;
    writeln!(out, "  SAP Account:  {}", record.account_no())?;
    writeln!(out, "  Legacy ID:    {}", record.legacy_id().unwrap_or(na))?;
    writeln!(out, "  Meter No:     {}", record.final_meter().unwrap_or(na))?;
    writeln!(out, "  MRU:          {}", record.get_or(VILLAGE_MRU, na))?;
    writeln!(out, "  Address:      {}", record.address().unwrap_or(na))?;
    if let Some(link) = map_link(record) {
        writeln!(out, "  Map:          {link}")?;
    }
    Ok(())
}

pub fn write_records<W: Write>(out: &mut W, records: &[UnifiedRecord<'_>]) -> io::Result<()> {
    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        write_record(out, record)?;
    }
    Ok(())
}

/// Records as a JSON array of objects in column order; nulls stay null.
pub fn records_json(records: &[UnifiedRecord<'_>]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(records)
}

/// The whole unified table as CSV; nulls become empty fields.
pub fn write_table_csv<W: Write>(out: W, table: &UnifiedTable) -> csv::Result<()> {
    let mut writer = csv::WriterBuilder::new().from_writer(out);
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|c| c.as_deref().unwrap_or("")))?;
    }
    writer.flush()?;
    Ok(())
}
