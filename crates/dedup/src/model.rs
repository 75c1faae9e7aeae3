use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A single normalized observation from any archive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    /// Position in the merged table.
    pub id: usize,
    pub target_name: String,
    /// Right ascension, degrees.
    pub ra: f64,
    /// Declination, degrees.
    pub dec: f64,
    /// Modified Julian date.
    pub epoch_mjd: f64,
    /// Archive tag (`TESS`, `HAWKI`, ...).
    pub source: String,
    /// Retained non-core columns after pruning and renaming.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl Observation {
    pub fn new(target_name: &str, ra: f64, dec: f64, epoch_mjd: f64, source: &str) -> Self {
        Self {
            id: 0,
            target_name: target_name.to_string(),
            ra,
            dec,
            epoch_mjd,
            source: source.to_string(),
            extra: BTreeMap::new(),
        }
    }
}

/// The merged, read-only observation table handed to the engine.
///
/// Ids always equal positions: construction renumbers every observation.
#[derive(Debug, Clone, Default)]
pub struct ObservationTable {
    observations: Vec<Observation>,
}

impl ObservationTable {
    pub fn new(observations: Vec<Observation>) -> Self {
        let observations = observations
            .into_iter()
            .enumerate()
            .map(|(id, obs)| Observation { id, ..obs })
            .collect();
        Self { observations }
    }

    /// Concatenate per-archive tables in the given order.
    pub fn merge(parts: Vec<Vec<Observation>>) -> Self {
        Self::new(parts.into_iter().flatten().collect())
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&Observation> {
        self.observations.get(id)
    }

    pub fn as_slice(&self) -> &[Observation] {
        &self.observations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.observations.iter()
    }
}

impl std::ops::Index<usize> for ObservationTable {
    type Output = Observation;

    fn index(&self, id: usize) -> &Observation {
        &self.observations[id]
    }
}

// ---------------------------------------------------------------------------
// Blocking + matching
// ---------------------------------------------------------------------------

/// Coarse grid cell over (ra, dec). Rendered as `"{ra_cell}_{dec_cell}"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId {
    pub ra_cell: i64,
    pub dec_cell: i64,
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.ra_cell, self.dec_cell)
    }
}

impl Serialize for BlockId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Unordered pair of observations judged a possible duplicate (`lo < hi`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateEdge {
    pub lo: usize,
    pub hi: usize,
    pub block: BlockId,
    pub spatial_deg: f64,
    pub temporal_days: f64,
    pub name_similarity: f64,
}

// ---------------------------------------------------------------------------
// Clusters
// ---------------------------------------------------------------------------

/// Maximal transitively-connected group of observations.
/// Members are sorted ascending; `id` is the cluster's position in the partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cluster {
    pub id: usize,
    pub members: Vec<usize>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Resolution outputs
// ---------------------------------------------------------------------------

/// One row of the deduplicated table.
#[derive(Debug, Clone, Serialize)]
pub struct Representative {
    pub cluster_id: usize,
    pub cluster_size: usize,
    pub block_id: BlockId,
    pub observation: Observation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EliminationReason {
    /// The winner comes from a strictly newer instrument.
    InstrumentAge,
    /// Same instrument age as the winner; lost on epoch.
    EpochTiebreak,
}

impl fmt::Display for EliminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InstrumentAge => write!(f, "instrument_age"),
            Self::EpochTiebreak => write!(f, "epoch_tiebreak"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EliminationRecord {
    pub eliminated_id: usize,
    pub winner_id: usize,
    pub cluster_id: usize,
    pub elimination_reason: EliminationReason,
    pub winner_source: String,
    pub loser_source: String,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct DedupSummary {
    pub observations: usize,
    pub blocks: usize,
    pub candidate_edges: usize,
    pub clusters: usize,
    pub multi_member_clusters: usize,
    pub largest_cluster: usize,
    pub unique_objects: usize,
    pub eliminated: usize,
    pub tie_clusters_broken: usize,
    pub tie_clusters_skipped: usize,
    pub eliminated_by_source: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DedupMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub input_fingerprint: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DedupResult {
    pub meta: DedupMeta,
    pub summary: DedupSummary,
    #[serde(skip)]
    pub edges: Vec<CandidateEdge>,
    #[serde(skip)]
    pub clusters: Vec<Cluster>,
    #[serde(skip)]
    pub representatives: Vec<Representative>,
    pub eliminations: Vec<EliminationRecord>,
}
