use std::collections::BTreeMap;

use crate::model::{BlockId, Observation, ObservationTable};

/// Grid cell for one observation: `(floor(ra / size), floor(dec / size))`.
pub fn block_id(obs: &Observation, block_size_deg: f64) -> BlockId {
    BlockId {
        ra_cell: (obs.ra / block_size_deg).floor() as i64,
        dec_cell: (obs.dec / block_size_deg).floor() as i64,
    }
}

/// Block id of every observation, indexed by observation id.
pub fn assign_blocks(table: &ObservationTable, block_size_deg: f64) -> Vec<BlockId> {
    table.iter().map(|obs| block_id(obs, block_size_deg)).collect()
}

/// Group observation ids by block. Members keep input order.
///
/// Observations in different blocks are never compared, so a pair sitting on
/// either side of a cell edge is never linked even when it is within the
/// spatial threshold.
pub fn group_blocks(block_ids: &[BlockId]) -> BTreeMap<BlockId, Vec<usize>> {
    let mut blocks: BTreeMap<BlockId, Vec<usize>> = BTreeMap::new();
    for (id, block) in block_ids.iter().enumerate() {
        blocks.entry(*block).or_default().push(id);
    }
    blocks
}
