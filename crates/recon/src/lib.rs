//! `acctmap-recon`: Account master reconciliation engine.
//!
//! Two account sources in (a legacy mapping file and a current SAP/location
//! file), one unified table out, searchable across every field. No CLI
//! dependencies; presentation lives in `acctmap-cli`.

pub mod cache;
pub mod config;
pub mod error;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod search;
pub mod source;

pub use cache::LoadCache;
pub use config::ReconConfig;
pub use error::ReconError;
pub use merge::merge;
pub use model::{MergeStats, RawTable, UnifiedRecord, UnifiedTable};
pub use normalize::{canonical_key, normalize};
pub use pipeline::{load, reconcile, Dataset, Fingerprint};
pub use search::{search, Query, SearchIndex};
pub use source::load_source;
