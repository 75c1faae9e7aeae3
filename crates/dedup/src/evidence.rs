use std::collections::BTreeMap;

use crate::model::{CandidateEdge, Cluster, DedupSummary};
use crate::resolver::Resolution;

/// Compute summary statistics for a finished run.
pub fn compute_summary(
    observations: usize,
    blocks: usize,
    edges: &[CandidateEdge],
    clusters: &[Cluster],
    resolution: &Resolution,
) -> DedupSummary {
    let mut eliminated_by_source: BTreeMap<String, usize> = BTreeMap::new();
    for e in &resolution.eliminations {
        *eliminated_by_source.entry(e.loser_source.clone()).or_insert(0) += 1;
    }

    DedupSummary {
        observations,
        blocks,
        candidate_edges: edges.len(),
        clusters: clusters.len(),
        multi_member_clusters: clusters.iter().filter(|c| c.len() > 1).count(),
        largest_cluster: clusters.iter().map(Cluster::len).max().unwrap_or(0),
        unique_objects: clusters.len(),
        eliminated: resolution.eliminations.len(),
        tie_clusters_broken: resolution.ties_broken,
        tie_clusters_skipped: resolution.ties_skipped,
        eliminated_by_source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EliminationReason, EliminationRecord};

    fn elim(loser: usize, loser_source: &str) -> EliminationRecord {
        EliminationRecord {
            eliminated_id: loser,
            winner_id: 0,
            cluster_id: 0,
            elimination_reason: EliminationReason::InstrumentAge,
            winner_source: "JWST".into(),
            loser_source: loser_source.into(),
        }
    }

    #[test]
    fn summary_counts() {
        let clusters = vec![
            Cluster { id: 0, members: vec![0, 1, 2] },
            Cluster { id: 1, members: vec![3] },
            Cluster { id: 2, members: vec![4, 5] },
        ];
        let resolution = Resolution {
            eliminations: vec![elim(1, "HAWKI"), elim(2, "HAWKI"), elim(5, "ALMA")],
            ties_broken: 1,
            ties_skipped: 0,
        };
        let s = compute_summary(6, 2, &[], &clusters, &resolution);
        assert_eq!(s.observations, 6);
        assert_eq!(s.clusters, 3);
        assert_eq!(s.multi_member_clusters, 2);
        assert_eq!(s.largest_cluster, 3);
        assert_eq!(s.eliminated, 3);
        assert_eq!(s.tie_clusters_broken, 1);
        assert_eq!(s.eliminated_by_source["HAWKI"], 2);
        assert_eq!(s.eliminated_by_source["ALMA"], 1);
    }

    #[test]
    fn empty_run() {
        let s = compute_summary(0, 0, &[], &[], &Resolution::default());
        assert_eq!(s.largest_cluster, 0);
        assert!(s.eliminated_by_source.is_empty());
    }
}
