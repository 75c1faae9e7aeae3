// Property-based tests for the deduplication pipeline.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::BTreeSet;

use proptest::prelude::*;
use skymerge_dedup::blocking::block_id;
use skymerge_dedup::cluster::{clusters_by_graph, clusters_by_union_find};
use skymerge_dedup::config::{ClusterStrategy, DedupConfig, TieBreak};
use skymerge_dedup::matcher::angular_distance_deg;
use skymerge_dedup::{run, DedupResult, Observation, ObservationTable};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

const SOURCES: [&str; 4] = ["JWST", "TESS", "ALMA", "HAWKI"];

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Names drawn from a small pool so that matches are common.
fn arb_name() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => Just("NGC 1234".to_string()),
        2 => Just("Vega".to_string()),
        1 => Just("NGC 1234 b".to_string()),
        1 => Just("TOI 700".to_string()),
        1 => Just(String::new()),
    ]
}

/// Observation crowded into a 3°×3° patch over three weeks.
fn arb_observation() -> impl Strategy<Value = Observation> {
    (arb_name(), 0.0..3.0f64, -1.5..1.5f64, 59000.0..59021.0f64, 0..SOURCES.len()).prop_map(
        |(name, ra, dec, epoch, s)| Observation::new(&name, ra, dec, epoch, SOURCES[s]),
    )
}

fn arb_table(max: usize) -> impl Strategy<Value = ObservationTable> {
    prop::collection::vec(arb_observation(), 0..max).prop_map(ObservationTable::new)
}

/// Objects 10° apart, each observed 1–3 times within 0.1° and 3 days.
fn arb_separated_table() -> impl Strategy<Value = ObservationTable> {
    prop::collection::vec(
        prop::collection::vec((0.0..0.1f64, 0.0..0.1f64, 0.0..3.0f64, 0..SOURCES.len()), 1..4),
        1..20,
    )
    .prop_map(|objects| {
        let mut rows = Vec::new();
        for (i, sightings) in objects.iter().enumerate() {
            let name = format!("OBJ {i}");
            for &(dra, ddec, dt, s) in sightings {
                let ra = 10.0 * i as f64 + 5.0 + dra;
                rows.push(Observation::new(&name, ra, 5.0 + ddec, 59000.0 + dt, SOURCES[s]));
            }
        }
        ObservationTable::new(rows)
    })
}

fn with(strategy: ClusterStrategy, parallel: bool) -> DedupConfig {
    let mut config = DedupConfig::default();
    config.matching.clustering = strategy;
    config.matching.parallel = parallel;
    config
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn clusters_partition_the_table(table in arb_table(40)) {
        let result = run(&DedupConfig::default(), &table).unwrap();

        let mut seen = BTreeSet::new();
        for (pos, cluster) in result.clusters.iter().enumerate() {
            prop_assert_eq!(cluster.id, pos);
            prop_assert!(!cluster.members.is_empty());
            prop_assert!(cluster.members.windows(2).all(|w| w[0] < w[1]));
            for &m in &cluster.members {
                prop_assert!(seen.insert(m), "observation {} in two clusters", m);
            }
        }
        prop_assert_eq!(seen.len(), table.len());
        prop_assert!(result.clusters.windows(2).all(|w| w[0].members[0] < w[1].members[0]));
    }

    #[test]
    fn edges_stay_inside_one_block_and_meet_thresholds(table in arb_table(40)) {
        let config = DedupConfig::default();
        let m = &config.matching;
        let result = run(&config, &table).unwrap();

        for e in &result.edges {
            let (a, b) = (&table[e.lo], &table[e.hi]);
            prop_assert!(e.lo < e.hi);
            prop_assert_eq!(block_id(a, m.block_size_deg), e.block);
            prop_assert_eq!(block_id(b, m.block_size_deg), e.block);
            prop_assert!(angular_distance_deg(a.ra, a.dec, b.ra, b.dec) <= m.spatial_threshold_deg);
            prop_assert!((a.epoch_mjd - b.epoch_mjd).abs() <= m.temporal_threshold_days);
            prop_assert!(e.name_similarity >= m.name_threshold);
            prop_assert!(!a.target_name.is_empty() && !b.target_name.is_empty());
        }
        prop_assert!(result.edges.windows(2).all(|w| (w[0].lo, w[0].hi) < (w[1].lo, w[1].hi)));
    }

    #[test]
    fn graph_and_union_find_agree(table in arb_table(40)) {
        let result = run(&DedupConfig::default(), &table).unwrap();
        prop_assert_eq!(
            clusters_by_graph(table.len(), &result.edges),
            clusters_by_union_find(table.len(), &result.edges)
        );
    }

    #[test]
    fn configuration_does_not_change_the_answer(table in arb_table(40)) {
        let base = run(&with(ClusterStrategy::UnionFind, false), &table).unwrap();
        for (strategy, parallel) in [
            (ClusterStrategy::UnionFind, true),
            (ClusterStrategy::Graph, false),
            (ClusterStrategy::Graph, true),
        ] {
            let other = run(&with(strategy, parallel), &table).unwrap();
            prop_assert_eq!(&base.edges, &other.edges);
            prop_assert_eq!(&base.clusters, &other.clusters);
            prop_assert_eq!(&base.eliminations, &other.eliminations);
        }
    }

    #[test]
    fn representative_is_earliest_member(table in arb_table(40)) {
        let result = run(&DedupConfig::default(), &table).unwrap();
        prop_assert_eq!(result.representatives.len(), result.clusters.len());

        for (rep, cluster) in result.representatives.iter().zip(&result.clusters) {
            let chosen = rep.observation.id;
            prop_assert_eq!(rep.cluster_id, cluster.id);
            prop_assert!(cluster.members.contains(&chosen));
            for &m in &cluster.members {
                let (e, best) = (table[m].epoch_mjd, table[chosen].epoch_mjd);
                prop_assert!(best <= e);
                // equal epochs go to the earlier row
                if e == best {
                    prop_assert!(chosen <= m);
                }
            }
        }
    }

    #[test]
    fn resolver_keeps_newest_instrument(table in arb_table(40)) {
        let config = DedupConfig::default();
        let ages = &config.resolution.instrument_ages;
        let result = run(&config, &table).unwrap();

        // earliest_epoch resolves every cluster: all but one member eliminated
        prop_assert_eq!(result.eliminations.len(), table.len() - result.clusters.len());

        let eliminated: BTreeSet<usize> = result.eliminations.iter().map(|e| e.eliminated_id).collect();
        prop_assert_eq!(eliminated.len(), result.eliminations.len());

        for e in &result.eliminations {
            let cluster = &result.clusters[e.cluster_id];
            prop_assert!(cluster.members.contains(&e.winner_id));
            prop_assert!(cluster.members.contains(&e.eliminated_id));
            prop_assert!(!eliminated.contains(&e.winner_id));
            prop_assert!(ages[&e.winner_source] <= ages[&e.loser_source]);
            for &m in &cluster.members {
                prop_assert!(ages[&e.winner_source] <= ages[&table[m].source]);
            }
        }
    }

    #[test]
    fn skip_only_drops_tied_clusters(table in arb_table(40)) {
        let mut config = DedupConfig::default();
        let ages = config.resolution.instrument_ages.clone();
        let broken = run(&config, &table).unwrap();
        config.resolution.tie_break = TieBreak::Skip;
        let skipped = run(&config, &table).unwrap();

        prop_assert_eq!(skipped.summary.tie_clusters_skipped, broken.summary.tie_clusters_broken);
        prop_assert_eq!(&skipped.clusters, &broken.clusters);

        let mut tied = 0;
        for cluster in broken.clusters.iter().filter(|c| c.members.len() > 1) {
            let age = |m: &usize| ages[&table[*m].source];
            let newest = cluster.members.iter().map(age).min().unwrap();
            let at_newest = cluster.members.iter().filter(|m| age(*m) == newest).count();

            let records = |r: &DedupResult| -> Vec<_> {
                r.eliminations.iter().filter(|e| e.cluster_id == cluster.id).cloned().collect()
            };
            if at_newest > 1 {
                tied += 1;
                prop_assert!(records(&skipped).is_empty(), "tied cluster {} resolved", cluster.id);
            } else {
                prop_assert_eq!(records(&skipped), records(&broken));
                prop_assert_eq!(records(&skipped).len(), cluster.members.len() - 1);
            }
        }
        prop_assert_eq!(tied, skipped.summary.tie_clusters_skipped);
    }

    #[test]
    fn rerun_on_crowded_table_adds_no_edges(table in arb_table(40)) {
        assert_rerun_is_stable(&table)?;
    }

    #[test]
    fn rerun_on_separated_objects_is_stable(table in arb_separated_table()) {
        assert_rerun_is_stable(&table)?;
    }
}

/// Deduplicating the representatives again must find nothing left to merge.
fn assert_rerun_is_stable(table: &ObservationTable) -> Result<(), TestCaseError> {
    let config = DedupConfig::default();
    let first = run(&config, table).unwrap();

    let reps = ObservationTable::new(
        first.representatives.iter().map(|r| r.observation.clone()).collect(),
    );
    let second = run(&config, &reps).unwrap();
    prop_assert!(second.edges.is_empty(), "representatives matched again: {:?}", second.edges);
    prop_assert_eq!(second.clusters.len(), reps.len());
    prop_assert!(second.eliminations.is_empty());
    Ok(())
}
