//! `skymerge-dedup`: multi-archive observation deduplication engine.
//!
//! Pure engine crate: receives a normalized observation table, returns the
//! deduplicated catalog and the elimination log. Archive loading, profiling
//! and CSV output live alongside but the core stages never touch IO.

pub mod blocking;
pub mod cluster;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod load;
pub mod matcher;
pub mod model;
pub mod output;
pub mod profile;
pub mod representative;
pub mod resolver;

pub use config::DedupConfig;
pub use engine::run;
pub use error::DedupError;
pub use model::{DedupResult, EliminationRecord, Observation, ObservationTable, Representative};
