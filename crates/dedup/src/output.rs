//! Flat CSV writers for the two deliverables.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::OutputConfig;
use crate::error::DedupError;
use crate::model::{DedupResult, EliminationRecord, Representative};

pub const DEDUPLICATED_COLUMNS: [&str; 9] = [
    "cluster_id",
    "id",
    "target_name",
    "ra",
    "dec",
    "epoch_mjd",
    "source",
    "block_id",
    "cluster_size",
];

pub const ELIMINATION_COLUMNS: [&str; 6] = [
    "eliminated_id",
    "winner_id",
    "cluster_id",
    "elimination_reason",
    "winner_source",
    "loser_source",
];

fn csv_err(e: impl std::fmt::Display) -> DedupError {
    DedupError::Io(e.to_string())
}

/// Deduplicated table: fixed columns, then every retained extra column
/// (sorted, empty where a row lacks it).
pub fn write_deduplicated<W: Write>(writer: W, rows: &[Representative]) -> Result<(), DedupError> {
    let extra_columns: BTreeSet<&str> = rows
        .iter()
        .flat_map(|r| r.observation.extra.keys().map(String::as_str))
        .collect();

    let mut w = csv::Writer::from_writer(writer);
    let header = DEDUPLICATED_COLUMNS.iter().copied().chain(extra_columns.iter().copied());
    w.write_record(header).map_err(csv_err)?;

    for r in rows {
        let o = &r.observation;
        let mut record = vec![
            r.cluster_id.to_string(),
            o.id.to_string(),
            o.target_name.clone(),
            o.ra.to_string(),
            o.dec.to_string(),
            o.epoch_mjd.to_string(),
            o.source.clone(),
            r.block_id.to_string(),
            r.cluster_size.to_string(),
        ];
        for col in &extra_columns {
            record.push(o.extra.get(*col).cloned().unwrap_or_default());
        }
        w.write_record(&record).map_err(csv_err)?;
    }
    w.flush().map_err(csv_err)
}

pub fn write_eliminations<W: Write>(writer: W, records: &[EliminationRecord]) -> Result<(), DedupError> {
    let mut w = csv::Writer::from_writer(writer);
    w.write_record(ELIMINATION_COLUMNS).map_err(csv_err)?;
    for e in records {
        w.write_record([
            e.eliminated_id.to_string(),
            e.winner_id.to_string(),
            e.cluster_id.to_string(),
            e.elimination_reason.to_string(),
            e.winner_source.clone(),
            e.loser_source.clone(),
        ])
        .map_err(csv_err)?;
    }
    w.flush().map_err(csv_err)
}

/// Write both files into `dir`. Both are rendered in memory, written to
/// `.tmp` siblings and only then renamed into place. On any failure every
/// file this call created is removed again.
pub fn write_outputs(
    dir: &Path,
    output: &OutputConfig,
    result: &DedupResult,
) -> Result<(PathBuf, PathBuf), DedupError> {
    let mut dedup_buf = Vec::new();
    write_deduplicated(&mut dedup_buf, &result.representatives)?;
    let mut elim_buf = Vec::new();
    write_eliminations(&mut elim_buf, &result.eliminations)?;

    std::fs::create_dir_all(dir)
        .map_err(|e| DedupError::Io(format!("cannot create {}: {e}", dir.display())))?;

    let dedup_path = dir.join(&output.deduplicated);
    let elim_path = dir.join(&output.eliminations);
    let dedup_tmp = tmp_sibling(&dedup_path);
    let elim_tmp = tmp_sibling(&elim_path);

    let staged = write_file(&dedup_tmp, &dedup_buf)
        .and_then(|()| write_file(&elim_tmp, &elim_buf))
        .and_then(|()| rename(&elim_tmp, &elim_path))
        .and_then(|()| {
            rename(&dedup_tmp, &dedup_path).inspect_err(|_| discard(&[&elim_path]))
        });
    if let Err(e) = staged {
        discard(&[&dedup_tmp, &elim_tmp]);
        return Err(e);
    }

    info!(
        deduplicated = %dedup_path.display(),
        eliminations = %elim_path.display(),
        "wrote outputs"
    );
    Ok((dedup_path, elim_path))
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), DedupError> {
    std::fs::write(path, bytes)
        .map_err(|e| DedupError::Io(format!("cannot write {}: {e}", path.display())))
}

fn rename(from: &Path, to: &Path) -> Result<(), DedupError> {
    std::fs::rename(from, to)
        .map_err(|e| DedupError::Io(format!("cannot write {}: {e}", to.display())))
}

/// Best-effort cleanup; the original error is what gets reported.
fn discard(paths: &[&Path]) {
    for path in paths {
        if path.is_file() {
            let _ = std::fs::remove_file(path);
        }
    }
}
