//! Instrument-priority resolution.
//!
//! Independent of representative selection: the winner here is the member
//! from the newest instrument, not the earliest observation, and the two
//! outputs are never reconciled.

use std::collections::BTreeMap;

use crate::config::TieBreak;
use crate::error::DedupError;
use crate::model::{Cluster, EliminationReason, EliminationRecord, ObservationTable};

#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub eliminations: Vec<EliminationRecord>,
    /// Clusters whose newest-instrument tie was broken on epoch.
    pub ties_broken: usize,
    /// Clusters left unresolved under [`TieBreak::Skip`].
    pub ties_skipped: usize,
}

/// Record winner/loser decisions for every multi-member cluster.
pub fn resolve_by_instrument_age(
    table: &ObservationTable,
    clusters: &[Cluster],
    instrument_ages: &BTreeMap<String, u32>,
    tie_break: TieBreak,
) -> Result<Resolution, DedupError> {
    let mut resolution = Resolution::default();

    for cluster in clusters {
        if cluster.len() <= 1 {
            continue;
        }

        let ages = cluster
            .members
            .iter()
            .map(|&id| age_of(table, id, instrument_ages))
            .collect::<Result<Vec<u32>, DedupError>>()?;

        let Some(&min_age) = ages.iter().min() else {
            continue;
        };
        let newest: Vec<usize> = cluster
            .members
            .iter()
            .zip(&ages)
            .filter(|(_, age)| **age == min_age)
            .map(|(&id, _)| id)
            .collect();

        let winner = match newest.as_slice() {
            [only] => *only,
            tied => match tie_break {
                TieBreak::Skip => {
                    resolution.ties_skipped += 1;
                    continue;
                }
                TieBreak::EarliestEpoch => {
                    resolution.ties_broken += 1;
                    earliest(table, tied)
                }
            },
        };

        for (&loser, &age) in cluster.members.iter().zip(&ages) {
            if loser == winner {
                continue;
            }
            let reason = if age == min_age {
                EliminationReason::EpochTiebreak
            } else {
                EliminationReason::InstrumentAge
            };
            resolution.eliminations.push(EliminationRecord {
                eliminated_id: loser,
                winner_id: winner,
                cluster_id: cluster.id,
                elimination_reason: reason,
                winner_source: table[winner].source.clone(),
                loser_source: table[loser].source.clone(),
            });
        }
    }

    Ok(resolution)
}

fn age_of(
    table: &ObservationTable,
    id: usize,
    instrument_ages: &BTreeMap<String, u32>,
) -> Result<u32, DedupError> {
    let source = &table[id].source;
    instrument_ages
        .get(source)
        .copied()
        .ok_or_else(|| DedupError::UnknownArchive(format!("observation {id} has source '{source}'")))
}

/// Earliest epoch among `ids` (non-empty, ascending), first wins on ties.
fn earliest(table: &ObservationTable, ids: &[usize]) -> usize {
    ids.iter()
        .skip(1)
        .fold(ids[0], |best, &id| if table[id].epoch_mjd < table[best].epoch_mjd { id } else { best })
}
