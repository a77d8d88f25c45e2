// acctmap CLI - search the unified account master built from the legacy
// mapping file and the current SAP/location file.

mod exit_codes;
mod render;
mod shell;

use std::fmt;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use acctmap_recon::{load, LoadCache, Query, ReconConfig, ReconError};

use exit_codes::{
    EXIT_CONFIG_INVALID, EXIT_NO_MATCHES, EXIT_OUTPUT, EXIT_SOURCE_UNAVAILABLE, EXIT_SUCCESS,
    EXIT_USAGE,
};

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "acctmap.toml";

#[derive(Parser)]
#[command(name = "acctmap")]
#[command(about = "Reconcile legacy and current account files, then search every field")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Config file (default: ./acctmap.toml if present, else built-in defaults)
    #[arg(long, short = 'c', global = true, env = "ACCTMAP_CONFIG")]
    config: Option<PathBuf>,

    /// Legacy mapping file (overrides sources.legacy.file)
    #[arg(long, global = true)]
    legacy: Option<PathBuf>,

    /// Current SAP/location file (overrides sources.current.file)
    #[arg(long, global = true)]
    current: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG wins when set.
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search every field of the unified table (case-insensitive substring)
    #[command(after_help = "\
Examples:
  acctmap search sangrur
  acctmap search 241022 --json
  acctmap --legacy data1.csv --current data2.csv search MTR9")]
    Search {
        /// Text to look for in any column
        query: String,

        /// Print matches as a JSON array on stdout
        #[arg(long)]
        json: bool,

        /// Show at most N matches
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Write the unified table as CSV
    #[command(after_help = "\
Examples:
  acctmap export > master.csv
  acctmap export --output master.csv")]
    Export {
        /// Output file (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Interactive search: one query per line on stdin
    Shell,

    /// Check the config and both sources, print merge counts
    Validate {
        /// Print counts as JSON
        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_COMMIT_HASH"), ")")
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(cli);

    match result {
        Ok(code) => ExitCode::from(code),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> Result<u8, CliError> {
    let (config, base_dir) = resolve_config(cli.config, cli.legacy, cli.current)?;

    match cli.command {
        Commands::Search { query, json, limit } => cmd_search(&config, &base_dir, &query, json, limit),
        Commands::Export { output } => cmd_export(&config, &base_dir, output),
        Commands::Shell => cmd_shell(&config, &base_dir),
        Commands::Validate { json } => cmd_validate(&config, &base_dir, json),
    }
}

/// Pick the config and the directory its relative source paths resolve against.
fn resolve_config(
    config_path: Option<PathBuf>,
    legacy: Option<PathBuf>,
    current: Option<PathBuf>,
) -> Result<(ReconConfig, PathBuf), CliError> {
    let cwd = std::env::current_dir()
        .map_err(|e| CliError::usage(format!("cannot read working directory: {e}")))?;

    let config_path = config_path.or_else(|| {
        let candidate = cwd.join(DEFAULT_CONFIG_FILE);
        candidate.is_file().then_some(candidate)
    });

    let (mut config, base_dir) = match config_path {
        Some(path) => {
            let config = ReconConfig::from_path(&path).map_err(CliError::recon)?;
            let base = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| cwd.clone());
            log::debug!("config {} (sources relative to {})", path.display(), base.display());
            (config, base)
        }
        None => (ReconConfig::default(), cwd.clone()),
    };

    // Command-line paths are relative to where the user is, not to the config
    if let Some(path) = legacy {
        config.sources.legacy.file = cwd.join(path);
    }
    if let Some(path) = current {
        config.sources.current.file = cwd.join(path);
    }

    Ok((config, base_dir))
}

// ============================================================================
// search
// ============================================================================

fn cmd_search(
    config: &ReconConfig,
    base_dir: &Path,
    query: &str,
    json: bool,
    limit: Option<usize>,
) -> Result<u8, CliError> {
    let Some(query) = Query::new(query) else {
        return Err(CliError::usage("empty query: nothing to search for")
            .with_hint("use `acctmap export` to see every record"));
    };

    let dataset = load(config, base_dir).map_err(CliError::recon)?;
    let hits = dataset.search(&query);
    let shown = &hits[..limit.unwrap_or(hits.len()).min(hits.len())];

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if json {
        let body = render::records_json(shown).map_err(CliError::output)?;
        writeln!(out, "{body}").map_err(CliError::output)?;
    } else {
        render::write_records(&mut out, shown).map_err(CliError::output)?;
    }

    if hits.is_empty() {
        eprintln!("No matches found.");
        return Ok(EXIT_NO_MATCHES);
    }
    if shown.len() < hits.len() {
        eprintln!("Found {} matches (showing {})", hits.len(), shown.len());
    } else {
        eprintln!("Found {} matches", hits.len());
    }
    Ok(EXIT_SUCCESS)
}

// ============================================================================
// export
// ============================================================================

fn cmd_export(config: &ReconConfig, base_dir: &Path, output: Option<PathBuf>) -> Result<u8, CliError> {
    let dataset = load(config, base_dir).map_err(CliError::recon)?;

    match output {
        Some(path) => {
            let file = std::fs::File::create(&path)
                .map_err(|e| CliError::output(format!("cannot write {}: {e}", path.display())))?;
            render::write_table_csv(file, &dataset.table).map_err(CliError::output)?;
            eprintln!("wrote {} accounts to {}", dataset.table.len(), path.display());
        }
        None => {
            render::write_table_csv(io::stdout().lock(), &dataset.table).map_err(CliError::output)?;
        }
    }
    Ok(EXIT_SUCCESS)
}

// ============================================================================
// shell
// ============================================================================

fn cmd_shell(config: &ReconConfig, base_dir: &Path) -> Result<u8, CliError> {
    let cache = LoadCache::new();
    let stdin = io::stdin();
    let prompt = stdin.is_terminal();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    shell::run_shell(stdin.lock(), &mut out, &cache, config, base_dir, prompt)?;
    Ok(EXIT_SUCCESS)
}

// ============================================================================
// validate
// ============================================================================

fn cmd_validate(config: &ReconConfig, base_dir: &Path, json: bool) -> Result<u8, CliError> {
    let dataset = load(config, base_dir).map_err(CliError::recon)?;
    let s = &dataset.table.stats;

    if json {
        let body = serde_json::json!({
            "name": config.name,
            "accounts": dataset.table.len(),
            "columns": dataset.table.headers,
            "stats": s,
            "fingerprint": dataset.fingerprint.to_hex(),
            "built_at": dataset.built_at,
        });
        println!("{}", serde_json::to_string_pretty(&body).map_err(CliError::output)?);
    } else {
        println!("{}: ok", config.name);
        println!("  legacy rows:        {}", s.left_rows);
        println!("  current rows:       {}", s.right_rows);
        println!(
            "  accounts:           {} ({} matched, {} legacy-only, {} current-only)",
            dataset.table.len(),
            s.matched,
            s.left_only,
            s.right_only
        );
        println!("  unkeyed rows:       {}", s.unkeyed);
        println!("  duplicates dropped: {}", s.duplicates_dropped);
        println!("  fingerprint:        {}", dataset.fingerprint);
    }
    Ok(EXIT_SUCCESS)
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn output(err: impl fmt::Display) -> Self {
        Self { code: EXIT_OUTPUT, message: err.to_string(), hint: None }
    }

    /// Map an engine error to its exit code, with a hint where one helps.
    pub fn recon(err: ReconError) -> Self {
        let (code, hint) = match &err {
            ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => {
                (EXIT_CONFIG_INVALID, Some("acctmap.toml accepts name, [sources.legacy], [sources.current] and [merge]"))
            }
            ReconError::SourceUnavailable { .. } => (
                EXIT_SOURCE_UNAVAILABLE,
                Some("check the source paths (--legacy / --current or sources.*.file)"),
            ),
        };
        Self { code, message: err.to_string(), hint: hint.map(String::from) }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
