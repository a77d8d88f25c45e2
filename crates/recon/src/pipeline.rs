//! Source files in, searchable [`Dataset`] out.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::merge::merge;
use crate::model::{RawTable, UnifiedRecord, UnifiedTable};
use crate::normalize::normalize;
use crate::search::{search, Query, SearchIndex};
use crate::source::parse_source;

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

/// BLAKE3 digest of the merge-relevant config and both sources' bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(blake3::Hash);

impl Fingerprint {
    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.0.to_hex();
        f.write_str(&hex.as_str()[..16])
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// The bytes of one source file at read time.
#[derive(Debug, Clone)]
pub struct SourceSnapshot {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl SourceSnapshot {
    pub fn read(path: PathBuf) -> Result<Self, ReconError> {
        let bytes = std::fs::read(&path).map_err(|e| {
            ReconError::source_unavailable(path.display().to_string(), e.to_string())
        })?;
        Ok(Self { path, bytes })
    }

    pub fn label(&self) -> String {
        self.path.display().to_string()
    }

    pub fn parse(&self) -> Result<RawTable, ReconError> {
        parse_source(&self.label(), &self.bytes)
    }
}

#[derive(Debug, Clone)]
pub struct Snapshots {
    pub legacy: SourceSnapshot,
    pub current: SourceSnapshot,
}

/// Read both configured sources. Relative paths resolve against `base_dir`.
pub fn read_sources(config: &ReconConfig, base_dir: &Path) -> Result<Snapshots, ReconError> {
    Ok(Snapshots {
        legacy: SourceSnapshot::read(config.sources.legacy.resolve(base_dir))?,
        current: SourceSnapshot::read(config.sources.current.resolve(base_dir))?,
    })
}

/// Digest of the settings that shape the merge plus both snapshots.
///
/// Fails only if the settings cannot be serialized.
pub fn fingerprint(config: &ReconConfig, snapshots: &Snapshots) -> Result<Fingerprint, ReconError> {
    let mut hasher = blake3::Hasher::new();
    let settings = serde_json::to_vec(&(
        &config.sources.legacy.rename,
        &config.sources.current.rename,
        &config.merge,
    ))
    .map_err(|e| ReconError::ConfigValidation(format!("cannot fingerprint settings: {e}")))?;

    // Length-prefix every part so boundaries cannot shift between inputs
    for part in [&settings, &snapshots.legacy.bytes, &snapshots.current.bytes] {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    Ok(Fingerprint(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// Reconcile
// ---------------------------------------------------------------------------

/// Normalize both raw tables and merge them.
pub fn reconcile(
    config: &ReconConfig,
    legacy: RawTable,
    current: RawTable,
) -> Result<UnifiedTable, ReconError> {
    let key = &config.merge.key;
    let legacy = normalize("legacy", legacy, key, &config.sources.legacy.rename)?;
    let current = normalize("current", current, key, &config.sources.current.rename)?;
    Ok(merge(&legacy, &current, &config.merge))
}

/// A unified table ready for queries. Immutable once built.
#[derive(Debug)]
pub struct Dataset {
    pub table: UnifiedTable,
    pub index: SearchIndex,
    pub fingerprint: Fingerprint,
    pub built_at: String,
}

impl Dataset {
    pub fn search(&self, query: &Query) -> Vec<UnifiedRecord<'_>> {
        search(&self.table, &self.index, query)
    }
}

/// Parse, normalize, merge and index a pair of snapshots.
pub fn build(config: &ReconConfig, snapshots: &Snapshots) -> Result<Dataset, ReconError> {
    let fingerprint = fingerprint(config, snapshots)?;
    let legacy = snapshots.legacy.parse()?;
    let current = snapshots.current.parse()?;
    let table = reconcile(config, legacy, current)?;
    let index = SearchIndex::build(&table);

    log::info!("built dataset {fingerprint}: {} accounts", table.len());

    Ok(Dataset {
        table,
        index,
        fingerprint,
        built_at: chrono::Utc::now().to_rfc3339(),
    })
}

/// Uncached load: read both sources and build.
pub fn load(config: &ReconConfig, base_dir: &Path) -> Result<Dataset, ReconError> {
    let snapshots = read_sources(config, base_dir)?;
    build(config, &snapshots)
}
