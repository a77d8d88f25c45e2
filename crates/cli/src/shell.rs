//! `acctmap shell`: line-oriented interactive search.
//!
//! Each line is a query. The unified table comes from a [`LoadCache`], so
//! it is rebuilt only when a source file changes between queries.
//!
//! Meta commands: `:reload` drops the cache, `:stats` prints merge counts,
//! `:quit` exits. A blank line is not a search.

use std::io::{BufRead, Write};
use std::path::Path;

use acctmap_recon::{LoadCache, Query, ReconConfig};

use crate::render;
use crate::CliError;

pub fn run_shell<R: BufRead, W: Write>(
    input: R,
    out: &mut W,
    cache: &LoadCache,
    config: &ReconConfig,
    base_dir: &Path,
    prompt: bool,
) -> Result<(), CliError> {
    // Nothing is searchable if the first load fails
    let dataset = cache.get_or_load(config, base_dir).map_err(CliError::recon)?;
    writeln!(out, "{}: {} accounts loaded", config.name, dataset.table.len()).map_err(CliError::output)?;

    let show_prompt = |out: &mut W| -> Result<(), CliError> {
        if prompt {
            write!(out, "search> ").map_err(CliError::output)?;
            out.flush().map_err(CliError::output)?;
        }
        Ok(())
    };

    show_prompt(out)?;
    for line in input.lines() {
        let line = line.map_err(|e| CliError::usage(format!("cannot read stdin: {e}")))?;
        let line = line.trim_end_matches('\r');

        match line.trim() {
            ":quit" | ":q" => break,
            ":reload" => {
                cache.invalidate();
                writeln!(out, "cache cleared").map_err(CliError::output)?;
            }
            ":stats" => match cache.current() {
                Some(ds) => {
                    let s = &ds.table.stats;
                    writeln!(
                        out,
                        "{} accounts: {} matched, {} legacy-only, {} current-only, {} duplicates dropped [{}]",
                        ds.table.len(),
                        s.matched,
                        s.left_only,
                        s.right_only,
                        s.duplicates_dropped,
                        ds.fingerprint,
                    )
                    .map_err(CliError::output)?;
                }
                None => writeln!(out, "nothing loaded").map_err(CliError::output)?,
            },
            _ => {
                if let Some(query) = Query::new(line) {
                    search_once(out, cache, config, base_dir, &query)?;
                }
            }
        }
        show_prompt(out)?;
    }
    Ok(())
}

fn search_once<W: Write>(
    out: &mut W,
    cache: &LoadCache,
    config: &ReconConfig,
    base_dir: &Path,
    query: &Query,
) -> Result<(), CliError> {
    // A source that breaks mid-session is reported; the session continues
    let dataset = match cache.get_or_load(config, base_dir) {
        Ok(ds) => ds,
        Err(e) => {
            writeln!(out, "error: {e}").map_err(CliError::output)?;
            return Ok(());
        }
    };

    let hits = dataset.search(query);
    if hits.is_empty() {
        writeln!(out, "No matches found.").map_err(CliError::output)?;
    } else {
        writeln!(out, "Found {} matches", hits.len()).map_err(CliError::output)?;
        writeln!(out).map_err(CliError::output)?;
        render::write_records(out, &hits).map_err(CliError::output)?;
    }
    Ok(())
}
