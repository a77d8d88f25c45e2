use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::{
    UnifiedColumns, ACCOUNT_NO, ADDRESS, FINAL_METER, METER_NUMBER, MTR_SER_NO, NAME,
    NOT_AVAILABLE, OLD_LEGACY_ID,
};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReconConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub merge: MergeConfig,
}

fn default_name() -> String {
    "Account Master".into()
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            sources: SourcesConfig::default(),
            merge: MergeConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourcesConfig {
    #[serde(default = "SourceConfig::legacy")]
    pub legacy: SourceConfig,
    #[serde(default = "SourceConfig::current")]
    pub current: SourceConfig,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            legacy: SourceConfig::legacy(),
            current: SourceConfig::current(),
        }
    }
}

/// One input file plus the header renames applied after trimming.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceConfig {
    pub file: PathBuf,
    #[serde(default)]
    pub rename: BTreeMap<String, String>,
}

impl SourceConfig {
    /// The legacy mapping file: `ACCTID` is the old id, `LEGACYACCTID` the SAP account.
    pub fn legacy() -> Self {
        Self {
            file: PathBuf::from("data1.csv"),
            rename: BTreeMap::from([
                ("ACCTID".to_string(), OLD_LEGACY_ID.to_string()),
                ("LEGACYACCTID".to_string(), ACCOUNT_NO.to_string()),
            ]),
        }
    }

    /// The current SAP/location file, already keyed by `ACCOUNT_NO`.
    pub fn current() -> Self {
        Self {
            file: PathBuf::from("data2.csv"),
            rename: BTreeMap::new(),
        }
    }

    /// Resolve `file` against a base directory unless it is absolute.
    pub fn resolve(&self, base_dir: &Path) -> PathBuf {
        if self.file.is_absolute() {
            self.file.clone()
        } else {
            base_dir.join(&self.file)
        }
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MergeConfig {
    #[serde(default = "default_key")]
    pub key: String,
    #[serde(default = "default_legacy_id")]
    pub legacy_id: String,
    /// Suffixes for same-named columns: `[legacy, current]`.
    #[serde(default = "default_suffixes")]
    pub suffixes: [String; 2],
    /// Fields resolved current-first, legacy as fallback.
    #[serde(default = "default_coalesce")]
    pub coalesce: Vec<String>,
    #[serde(default)]
    pub meter: MeterConfig,
}

fn default_key() -> String {
    ACCOUNT_NO.into()
}

fn default_legacy_id() -> String {
    OLD_LEGACY_ID.into()
}

fn default_suffixes() -> [String; 2] {
    ["_f1".into(), "_f2".into()]
}

fn default_coalesce() -> Vec<String> {
    vec![NAME.into(), ADDRESS.into()]
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            key: default_key(),
            legacy_id: default_legacy_id(),
            suffixes: default_suffixes(),
            coalesce: default_coalesce(),
            meter: MeterConfig::default(),
        }
    }
}

impl MergeConfig {
    pub fn unified_columns(&self) -> UnifiedColumns {
        UnifiedColumns {
            key: self.key.clone(),
            legacy_id: self.legacy_id.clone(),
            meter: self.meter.output.clone(),
        }
    }
}

/// Alias table for the meter number column.
///
/// `aliases` are tried in order; the first non-null value wins and `default`
/// fills rows where none of them has a value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MeterConfig {
    #[serde(default = "default_meter_output")]
    pub output: String,
    #[serde(default = "default_meter_aliases")]
    pub aliases: Vec<String>,
    #[serde(default = "default_meter_sentinel")]
    pub default: String,
}

fn default_meter_output() -> String {
    FINAL_METER.into()
}

fn default_meter_aliases() -> Vec<String> {
    vec![METER_NUMBER.into(), MTR_SER_NO.into()]
}

fn default_meter_sentinel() -> String {
    NOT_AVAILABLE.into()
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            output: default_meter_output(),
            aliases: default_meter_aliases(),
            default: default_meter_sentinel(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let merge = &self.merge;

        if merge.key.trim().is_empty() {
            return Err(ReconError::ConfigValidation("merge.key must not be empty".into()));
        }

        let [left, right] = &merge.suffixes;
        if left.is_empty() || right.is_empty() {
            return Err(ReconError::ConfigValidation(
                "merge.suffixes must both be non-empty".into(),
            ));
        }
        if left == right {
            return Err(ReconError::ConfigValidation(format!(
                "merge.suffixes must differ, both are '{left}'"
            )));
        }

        if merge.meter.aliases.is_empty() {
            return Err(ReconError::ConfigValidation(
                "merge.meter.aliases must name at least one column".into(),
            ));
        }

        // Derived columns must not shadow the key or each other
        let mut derived = BTreeSet::new();
        for column in merge.coalesce.iter().chain(std::iter::once(&merge.meter.output)) {
            if column == &merge.key {
                return Err(ReconError::ConfigValidation(format!(
                    "derived column '{column}' collides with the join key"
                )));
            }
            if !derived.insert(column.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "derived column '{column}' is listed twice"
                )));
            }
        }

        for (role, source) in [("legacy", &self.sources.legacy), ("current", &self.sources.current)] {
            let mut targets = BTreeSet::new();
            for target in source.rename.values() {
                if !targets.insert(target.as_str()) {
                    return Err(ReconError::ConfigValidation(format!(
                        "sources.{role}.rename maps two columns to '{target}'"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Load and validate a config file.
    pub fn from_path(path: &Path) -> Result<Self, ReconError> {
        let input = std::fs::read_to_string(path).map_err(|e| {
            ReconError::ConfigParse(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&input)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
