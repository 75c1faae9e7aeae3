use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;

use crate::error::DedupError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct DedupConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub resolution: ResolutionConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Archives in load order. The merged table concatenates them as listed.
    #[serde(default)]
    pub archives: Vec<ArchiveConfig>,
}

fn default_name() -> String {
    "skymerge".into()
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            matching: MatchingConfig::default(),
            resolution: ResolutionConfig::default(),
            output: OutputConfig::default(),
            archives: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    #[serde(default = "default_spatial_threshold")]
    pub spatial_threshold_deg: f64,
    #[serde(default = "default_temporal_threshold")]
    pub temporal_threshold_days: f64,
    #[serde(default = "default_name_threshold")]
    pub name_threshold: f64,
    #[serde(default = "default_block_size")]
    pub block_size_deg: f64,
    /// Match blocks on the rayon pool instead of sequentially.
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub clustering: ClusterStrategy,
}

fn default_spatial_threshold() -> f64 {
    1.0
}

fn default_temporal_threshold() -> f64 {
    7.0
}

fn default_name_threshold() -> f64 {
    0.8
}

fn default_block_size() -> f64 {
    1.0
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            spatial_threshold_deg: default_spatial_threshold(),
            temporal_threshold_days: default_temporal_threshold(),
            name_threshold: default_name_threshold(),
            block_size_deg: default_block_size(),
            parallel: false,
            clustering: ClusterStrategy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterStrategy {
    /// petgraph undirected graph + breadth-first traversal.
    Graph,
    /// Disjoint-set with path compression.
    #[default]
    UnionFind,
}

impl ClusterStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Graph => "graph",
            Self::UnionFind => "union_find",
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ResolutionConfig {
    #[serde(default)]
    pub tie_break: TieBreak,
    /// Lower age = newer instrument = higher priority.
    #[serde(default = "default_instrument_ages")]
    pub instrument_ages: BTreeMap<String, u32>,
}

fn default_instrument_ages() -> BTreeMap<String, u32> {
    [("JWST", 1), ("TESS", 2), ("ALMA", 3), ("HAWKI", 4)]
        .into_iter()
        .map(|(tag, age)| (tag.to_string(), age))
        .collect()
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            tie_break: TieBreak::default(),
            instrument_ages: default_instrument_ages(),
        }
    }
}

/// What to do when several cluster members share the newest instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Earliest epoch among the tied members wins, then input order.
    #[default]
    EarliestEpoch,
    /// Record no eliminations for the cluster.
    Skip,
}

impl TieBreak {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EarliestEpoch => "earliest_epoch",
            Self::Skip => "skip",
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,
    #[serde(default = "default_deduplicated_file")]
    pub deduplicated: String,
    #[serde(default = "default_eliminations_file")]
    pub eliminations: String,
}

fn default_output_dir() -> String {
    "pipeline_outputs".into()
}

fn default_deduplicated_file() -> String {
    "deduplicated_data.csv".into()
}

fn default_eliminations_file() -> String {
    "elimination_details.csv".into()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            deduplicated: default_deduplicated_file(),
            eliminations: default_eliminations_file(),
        }
    }
}

// ---------------------------------------------------------------------------
// Archive
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveConfig {
    pub tag: String,
    pub file: String,
    #[serde(default)]
    pub columns: ColumnMapping,
    /// Source header → new header, applied before any lookup.
    #[serde(default)]
    pub rename: BTreeMap<String, String>,
    /// Columns removed from the retained record. Absent names are ignored.
    #[serde(default)]
    pub drop: Vec<String>,
    /// Drop non-core columns whose empty-cell fraction exceeds this.
    #[serde(default)]
    pub max_missing_fraction: Option<f64>,
    #[serde(default)]
    pub scale: Vec<ScaleRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnMapping {
    #[serde(default = "default_target_column")]
    pub target_name: String,
    #[serde(default = "default_ra_column")]
    pub ra: String,
    #[serde(default = "default_dec_column")]
    pub dec: String,
    #[serde(default = "default_epoch_column")]
    pub epoch: String,
}

fn default_target_column() -> String {
    "target_name".into()
}

fn default_ra_column() -> String {
    "s_ra".into()
}

fn default_dec_column() -> String {
    "s_dec".into()
}

fn default_epoch_column() -> String {
    "MJD-OBS".into()
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            target_name: default_target_column(),
            ra: default_ra_column(),
            dec: default_dec_column(),
            epoch: default_epoch_column(),
        }
    }
}

impl ColumnMapping {
    pub fn core_columns(&self) -> [&str; 4] {
        [&self.target_name, &self.ra, &self.dec, &self.epoch]
    }
}

/// Multiply numeric columns by a constant (unit conversion, e.g. mm → nm).
#[derive(Debug, Clone, Deserialize)]
pub struct ScaleRule {
    pub columns: Vec<String>,
    pub factor: f64,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl DedupConfig {
    pub fn from_toml(input: &str) -> Result<Self, DedupError> {
        let config: DedupConfig =
            toml::from_str(input).map_err(|e| DedupError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DedupError> {
        let m = &self.matching;

        if !m.spatial_threshold_deg.is_finite() || m.spatial_threshold_deg < 0.0 {
            return Err(DedupError::ConfigValidation(format!(
                "spatial_threshold_deg must be a non-negative number, got {}",
                m.spatial_threshold_deg
            )));
        }
        if !m.temporal_threshold_days.is_finite() || m.temporal_threshold_days < 0.0 {
            return Err(DedupError::ConfigValidation(format!(
                "temporal_threshold_days must be a non-negative number, got {}",
                m.temporal_threshold_days
            )));
        }
        if !(0.0..=1.0).contains(&m.name_threshold) {
            return Err(DedupError::ConfigValidation(format!(
                "name_threshold must be within [0, 1], got {}",
                m.name_threshold
            )));
        }
        if !m.block_size_deg.is_finite() || m.block_size_deg <= 0.0 {
            return Err(DedupError::ConfigValidation(format!(
                "block_size_deg must be positive, got {}",
                m.block_size_deg
            )));
        }

        if self.resolution.instrument_ages.is_empty() {
            return Err(DedupError::ConfigValidation(
                "instrument_ages must rank at least one archive".into(),
            ));
        }

        let mut seen = HashSet::new();
        for archive in &self.archives {
            if archive.tag.trim().is_empty() {
                return Err(DedupError::ConfigValidation(format!(
                    "archive for file '{}' has an empty tag",
                    archive.file
                )));
            }
            if !seen.insert(archive.tag.as_str()) {
                return Err(DedupError::ConfigValidation(format!(
                    "archive '{}' is declared more than once",
                    archive.tag
                )));
            }
            if !self.resolution.instrument_ages.contains_key(&archive.tag) {
                return Err(DedupError::UnknownArchive(format!(
                    "'{}' has no entry in resolution.instrument_ages",
                    archive.tag
                )));
            }
            if let Some(frac) = archive.max_missing_fraction {
                if !(0.0..=1.0).contains(&frac) {
                    return Err(DedupError::ConfigValidation(format!(
                        "archive '{}': max_missing_fraction must be within [0, 1], got {frac}",
                        archive.tag
                    )));
                }
            }
            for rule in &archive.scale {
                if !rule.factor.is_finite() {
                    return Err(DedupError::ConfigValidation(format!(
                        "archive '{}': scale factor must be finite",
                        archive.tag
                    )));
                }
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
