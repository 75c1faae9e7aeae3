//! Archive loading: column mapping, renaming, pruning and unit scaling.
//!
//! Produces normalized observations for the engine. Coordinates and epochs
//! are required: an empty or non-numeric cell aborts the load, so no null
//! ever reaches matching.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use tracing::{debug, info};

use crate::config::{ArchiveConfig, DedupConfig};
use crate::error::DedupError;
use crate::model::{Observation, ObservationTable};

/// Load every configured archive (paths relative to `base_dir`) and merge
/// them in config order.
pub fn load_archives(config: &DedupConfig, base_dir: &Path) -> Result<ObservationTable, DedupError> {
    if config.archives.is_empty() {
        return Err(DedupError::ConfigValidation("no archives configured".into()));
    }

    let mut parts = Vec::with_capacity(config.archives.len());
    for archive in &config.archives {
        let path = base_dir.join(&archive.file);
        let csv_data = std::fs::read_to_string(&path)
            .map_err(|e| DedupError::Io(format!("cannot read {}: {e}", path.display())))?;
        let rows = load_archive_rows(archive, &csv_data)?;
        info!(archive = %archive.tag, rows = rows.len(), "loaded archive");
        parts.push(rows);
    }

    let table = ObservationTable::merge(parts);
    info!("Merged {} archives into {} observations", config.archives.len(), table.len());
    Ok(table)
}

/// Parse one archive CSV into observations tagged with the archive's tag.
pub fn load_archive_rows(archive: &ArchiveConfig, csv_data: &str) -> Result<Vec<Observation>, DedupError> {
    let tag = archive.tag.as_str();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| DedupError::Io(e.to_string()))?
        .iter()
        .map(|h| {
            let h = h.trim();
            archive.rename.get(h).cloned().unwrap_or_else(|| h.to_string())
        })
        .collect();

    let records = reader
        .records()
        .collect::<Result<Vec<csv::StringRecord>, csv::Error>>()
        .map_err(|e| DedupError::Io(format!("archive '{tag}': {e}")))?;

    let col = &archive.columns;
    let idx = |name: &str| -> Result<usize, DedupError> {
        headers.iter().position(|h| h == name).ok_or_else(|| DedupError::MissingColumn {
            archive: tag.into(),
            column: name.into(),
        })
    };

    let name_idx = idx(&col.target_name)?;
    let ra_idx = idx(&col.ra)?;
    let dec_idx = idx(&col.dec)?;
    let epoch_idx = idx(&col.epoch)?;

    let retained = retained_columns(archive, &headers, &records);
    let scale = scale_factors(archive);

    let mut rows = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        let row = i + 1;
        let cell = |ci: usize| record.get(ci).unwrap_or("").trim();

        let ra = required_number(tag, row, &col.ra, cell(ra_idx))?;
        let dec = required_number(tag, row, &col.dec, cell(dec_idx))?;
        let epoch_mjd = required_number(tag, row, &col.epoch, cell(epoch_idx))?;

        let mut extra = BTreeMap::new();
        for &ci in &retained {
            let name = &headers[ci];
            let value = cell(ci);
            let value = match scale.get(name.as_str()) {
                Some(&factor) if !value.is_empty() => {
                    let v: f64 = value.parse().map_err(|_| DedupError::NumericParse {
                        archive: tag.into(),
                        row,
                        column: name.clone(),
                        value: value.into(),
                    })?;
                    (v * factor).to_string()
                }
                _ => value.to_string(),
            };
            extra.insert(name.clone(), value);
        }

        rows.push(Observation {
            id: i,
            target_name: cell(name_idx).to_string(),
            ra,
            dec,
            epoch_mjd,
            source: tag.to_string(),
            extra,
        });
    }

    Ok(rows)
}

/// Non-core columns that survive the drop list and the missing-value cut.
fn retained_columns(archive: &ArchiveConfig, headers: &[String], records: &[csv::StringRecord]) -> Vec<usize> {
    let core: HashSet<&str> = archive.columns.core_columns().into_iter().collect();
    let dropped: HashSet<&str> = archive.drop.iter().map(String::as_str).collect();

    let mut retained = Vec::new();
    for (ci, name) in headers.iter().enumerate() {
        if name.is_empty() || core.contains(name.as_str()) || dropped.contains(name.as_str()) {
            continue;
        }
        if let Some(max) = archive.max_missing_fraction {
            let frac = missing_fraction(records, ci);
            if frac > max {
                debug!(archive = %archive.tag, column = %name, missing = frac, "dropping sparse column");
                continue;
            }
        }
        retained.push(ci);
    }
    retained
}

/// Fraction of rows whose cell in column `ci` is empty.
pub(crate) fn missing_fraction(records: &[csv::StringRecord], ci: usize) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let missing = records
        .iter()
        .filter(|r| r.get(ci).map_or(true, |v| v.trim().is_empty()))
        .count();
    missing as f64 / records.len() as f64
}

fn scale_factors(archive: &ArchiveConfig) -> HashMap<&str, f64> {
    let mut factors = HashMap::new();
    for rule in &archive.scale {
        for column in &rule.columns {
            *factors.entry(column.as_str()).or_insert(1.0) *= rule.factor;
        }
    }
    factors
}

fn required_number(archive: &str, row: usize, column: &str, value: &str) -> Result<f64, DedupError> {
    let missing = || DedupError::MissingValue {
        archive: archive.into(),
        row,
        column: column.into(),
    };
    if value.is_empty() {
        return Err(missing());
    }
    let v: f64 = value.parse().map_err(|_| DedupError::NumericParse {
        archive: archive.into(),
        row,
        column: column.into(),
        value: value.into(),
    })?;
    // "NaN" parses; treat it like an empty cell.
    if v.is_nan() {
        return Err(missing());
    }
    Ok(v)
}
