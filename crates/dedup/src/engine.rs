use std::collections::BTreeMap;

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::blocking::{assign_blocks, group_blocks};
use crate::cluster::build_clusters;
use crate::config::DedupConfig;
use crate::error::DedupError;
use crate::evidence::compute_summary;
use crate::matcher::{match_blocks, Thresholds};
use crate::model::{DedupMeta, DedupResult, ObservationTable};
use crate::representative::select_representatives;
use crate::resolver::resolve_by_instrument_age;

/// Run deduplication per config. Returns both deliverables + summary.
///
/// Fails before any matching if an observation is invalid; no partial result
/// is ever returned.
pub fn run(config: &DedupConfig, table: &ObservationTable) -> Result<DedupResult, DedupError> {
    config.validate()?;
    validate_table(table, &config.resolution.instrument_ages)?;

    let m = &config.matching;
    let block_ids = assign_blocks(table, m.block_size_deg);
    let blocks = group_blocks(&block_ids);
    debug!(blocks = blocks.len(), block_size_deg = m.block_size_deg, "blocked observations");

    let edges = match_blocks(table, &blocks, &Thresholds::from(m), m.parallel);
    debug!(edges = edges.len(), parallel = m.parallel, "matched blocks");

    let clusters = build_clusters(table.len(), &edges, m.clustering);
    let representatives = select_representatives(table, &clusters, &block_ids);
    info!(
        "Reduced from {} to {} unique objects",
        table.len(),
        representatives.len()
    );

    let resolution = resolve_by_instrument_age(
        table,
        &clusters,
        &config.resolution.instrument_ages,
        config.resolution.tie_break,
    )?;
    info!(
        eliminated = resolution.eliminations.len(),
        ties_broken = resolution.ties_broken,
        ties_skipped = resolution.ties_skipped,
        "resolved clusters by instrument age"
    );

    let summary = compute_summary(table.len(), blocks.len(), &edges, &clusters, &resolution);

    Ok(DedupResult {
        meta: DedupMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            input_fingerprint: fingerprint(table),
        },
        summary,
        edges,
        clusters,
        representatives,
        eliminations: resolution.eliminations,
    })
}

/// Reject observations the matcher cannot reason about.
pub fn validate_table(
    table: &ObservationTable,
    instrument_ages: &BTreeMap<String, u32>,
) -> Result<(), DedupError> {
    let invalid = |id: usize, reason: String| DedupError::InvalidObservation { id, reason };

    for obs in table.iter() {
        if !obs.ra.is_finite() || !(0.0..360.0).contains(&obs.ra) {
            return Err(invalid(obs.id, format!("right ascension {} outside [0, 360)", obs.ra)));
        }
        if !obs.dec.is_finite() || !(-90.0..=90.0).contains(&obs.dec) {
            return Err(invalid(obs.id, format!("declination {} outside [-90, 90]", obs.dec)));
        }
        if !obs.epoch_mjd.is_finite() || obs.epoch_mjd < 0.0 {
            return Err(invalid(obs.id, format!("epoch {} is not a non-negative MJD", obs.epoch_mjd)));
        }
        if !instrument_ages.contains_key(&obs.source) {
            return Err(DedupError::UnknownArchive(format!(
                "observation {} has source '{}'",
                obs.id, obs.source
            )));
        }
    }
    Ok(())
}

/// SHA-256 over the normalized core fields, hex-encoded.
pub fn fingerprint(table: &ObservationTable) -> String {
    let mut hasher = Sha256::new();
    for obs in table.iter() {
        hasher.update(obs.target_name.as_bytes());
        hasher.update([0u8]);
        hasher.update(obs.ra.to_le_bytes());
        hasher.update(obs.dec.to_le_bytes());
        hasher.update(obs.epoch_mjd.to_le_bytes());
        hasher.update(obs.source.as_bytes());
        hasher.update([0u8]);
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EliminationReason, Observation};

    fn scenario() -> ObservationTable {
        ObservationTable::new(vec![
            Observation::new("NGC 1234", 10.01, 20.00, 59000.0, "TESS"),
            Observation::new("NGC 1234", 10.02, 20.01, 59002.0, "HAWKI"),
            Observation::new("Other", 50.0, -10.0, 59500.0, "ALMA"),
        ])
    }

    #[test]
    fn scenario_end_to_end() {
        let result = run(&DedupConfig::default(), &scenario()).unwrap();

        assert_eq!(result.edges.len(), 1);
        let members: Vec<Vec<usize>> = result.clusters.iter().map(|c| c.members.clone()).collect();
        assert_eq!(members, vec![vec![0, 1], vec![2]]);

        let rep_ids: Vec<usize> = result.representatives.iter().map(|r| r.observation.id).collect();
        assert_eq!(rep_ids, vec![0, 2]);

        assert_eq!(result.eliminations.len(), 1);
        let e = &result.eliminations[0];
        assert_eq!(e.eliminated_id, 1);
        assert_eq!(e.winner_id, 0);
        assert_eq!(e.cluster_id, 0);
        assert_eq!(e.elimination_reason, EliminationReason::InstrumentAge);
        assert_eq!(e.winner_source, "TESS");
        assert_eq!(e.loser_source, "HAWKI");

        assert_eq!(result.summary.observations, 3);
        assert_eq!(result.summary.unique_objects, 2);
        assert_eq!(result.summary.blocks, 2);
    }

    #[test]
    fn strategies_and_parallelism_agree() {
        let base = run(&DedupConfig::default(), &scenario()).unwrap();
        let mut config = DedupConfig::default();
        config.matching.parallel = true;
        config.matching.clustering = crate::config::ClusterStrategy::Graph;
        let other = run(&config, &scenario()).unwrap();
        assert_eq!(base.edges, other.edges);
        assert_eq!(base.clusters, other.clusters);
        assert_eq!(base.eliminations, other.eliminations);
    }

    #[test]
    fn empty_table_is_fine() {
        let result = run(&DedupConfig::default(), &ObservationTable::default()).unwrap();
        assert!(result.clusters.is_empty());
        assert!(result.representatives.is_empty());
        assert!(result.eliminations.is_empty());
    }

    #[test]
    fn nan_coordinate_rejected_before_matching() {
        let table = ObservationTable::new(vec![
            Observation::new("M31", 10.0, 20.0, 59000.0, "TESS"),
            Observation::new("M31", f64::NAN, 20.0, 59000.0, "TESS"),
        ]);
        let err = run(&DedupConfig::default(), &table).unwrap_err();
        assert!(matches!(err, DedupError::InvalidObservation { id: 1, .. }));
    }

    #[test]
    fn out_of_range_values_rejected() {
        let cases = [
            Observation::new("x", 360.0, 0.0, 59000.0, "TESS"),
            Observation::new("x", 10.0, 90.5, 59000.0, "TESS"),
            Observation::new("x", 10.0, 0.0, -1.0, "TESS"),
        ];
        for obs in cases {
            let table = ObservationTable::new(vec![obs]);
            let err = run(&DedupConfig::default(), &table).unwrap_err();
            assert!(err.is_input_error(), "{err}");
        }
    }

    #[test]
    fn unknown_source_rejected() {
        let table = ObservationTable::new(vec![Observation::new("x", 1.0, 1.0, 1.0, "GAIA")]);
        let err = run(&DedupConfig::default(), &table).unwrap_err();
        assert!(matches!(err, DedupError::UnknownArchive(_)));
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = fingerprint(&scenario());
        assert_eq!(a.len(), 64);
        assert_eq!(a, fingerprint(&scenario()));

        let mut rows: Vec<Observation> = scenario().iter().cloned().collect();
        rows[2].epoch_mjd += 1.0;
        assert_ne!(a, fingerprint(&ObservationTable::new(rows)));
    }
}
