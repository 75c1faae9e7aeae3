use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;

use crate::config::MatchingConfig;
use crate::model::{BlockId, CandidateEdge, ObservationTable};

/// Match thresholds. A pair is a candidate iff all three hold.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub spatial_deg: f64,
    pub temporal_days: f64,
    pub name_similarity: f64,
}

impl From<&MatchingConfig> for Thresholds {
    fn from(m: &MatchingConfig) -> Self {
        Self {
            spatial_deg: m.spatial_threshold_deg,
            temporal_days: m.temporal_threshold_days,
            name_similarity: m.name_threshold,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::from(&MatchingConfig::default())
    }
}

/// Great-circle separation of two equatorial positions, in degrees.
pub fn angular_distance_deg(ra1: f64, dec1: f64, ra2: f64, dec2: f64) -> f64 {
    let (dec1, dec2) = (dec1.to_radians(), dec2.to_radians());
    let d_dec = dec2 - dec1;
    let d_ra = (ra2 - ra1).to_radians();

    let h = (d_dec / 2.0).sin().powi(2) + dec1.cos() * dec2.cos() * (d_ra / 2.0).sin().powi(2);
    (2.0 * h.min(1.0).sqrt().asin()).to_degrees()
}

/// Whitespace tokens of a target name, as a set.
pub fn name_tokens(name: &str) -> BTreeSet<&str> {
    name.split_whitespace().collect()
}

/// Jaccard index of two token sets. Two empty sets score 0: an empty name is
/// no evidence of a match.
pub fn jaccard(a: &BTreeSet<&str>, b: &BTreeSet<&str>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64
}

/// Compare every unordered pair inside one block.
pub fn match_block(
    table: &ObservationTable,
    block: BlockId,
    members: &[usize],
    thresholds: &Thresholds,
) -> Vec<CandidateEdge> {
    if members.len() < 2 {
        return Vec::new();
    }

    // Block vocabulary: tokenize each member once.
    let tokens: Vec<BTreeSet<&str>> = members
        .iter()
        .map(|&id| name_tokens(&table[id].target_name))
        .collect();

    let mut edges = Vec::new();
    for i in 0..members.len() {
        let a = &table[members[i]];
        for j in (i + 1)..members.len() {
            let b = &table[members[j]];

            let temporal_days = (a.epoch_mjd - b.epoch_mjd).abs();
            if temporal_days > thresholds.temporal_days {
                continue;
            }
            let spatial_deg = angular_distance_deg(a.ra, a.dec, b.ra, b.dec);
            if spatial_deg > thresholds.spatial_deg {
                continue;
            }
            let name_similarity = jaccard(&tokens[i], &tokens[j]);
            if name_similarity < thresholds.name_similarity {
                continue;
            }

            edges.push(CandidateEdge {
                lo: a.id.min(b.id),
                hi: a.id.max(b.id),
                block,
                spatial_deg,
                temporal_days,
                name_similarity,
            });
        }
    }
    edges
}

/// Match all blocks and merge the per-block edge lists, sorted by `(lo, hi)`.
///
/// With `parallel`, blocks are matched on the rayon pool. Workers share only
/// the read-only table; the collect is the single merge point.
pub fn match_blocks(
    table: &ObservationTable,
    blocks: &BTreeMap<BlockId, Vec<usize>>,
    thresholds: &Thresholds,
    parallel: bool,
) -> Vec<CandidateEdge> {
    let per_block: Vec<Vec<CandidateEdge>> = if parallel {
        blocks
            .par_iter()
            .map(|(block, members)| match_block(table, *block, members, thresholds))
            .collect()
    } else {
        blocks
            .iter()
            .map(|(block, members)| match_block(table, *block, members, thresholds))
            .collect()
    };

    let mut edges: Vec<CandidateEdge> = per_block.into_iter().flatten().collect();
    edges.sort_by_key(|e| (e.lo, e.hi));
    edges
}
