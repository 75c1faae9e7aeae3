use crate::model::{BlockId, Cluster, ObservationTable, Representative};

/// One row per cluster: the member with the earliest epoch.
/// Ties go to the first member in input order.
pub fn select_representatives(
    table: &ObservationTable,
    clusters: &[Cluster],
    block_ids: &[BlockId],
) -> Vec<Representative> {
    clusters
        .iter()
        .filter_map(|cluster| {
            let first = *cluster.members.first()?;
            let chosen = cluster.members.iter().skip(1).fold(first, |best, &id| {
                if table[id].epoch_mjd < table[best].epoch_mjd {
                    id
                } else {
                    best
                }
            });
            Some(Representative {
                cluster_id: cluster.id,
                cluster_size: cluster.len(),
                block_id: block_ids[chosen],
                observation: table[chosen].clone(),
            })
        })
        .collect()
}
