//! `skymerge run | validate | profile`: config-driven deduplication.

use std::path::{Path, PathBuf};

use serde::Serialize;
use skymerge_dedup::load::load_archives;
use skymerge_dedup::model::{DedupMeta, DedupSummary};
use skymerge_dedup::output::write_outputs;
use skymerge_dedup::profile::{profile_table, TableProfile};
use skymerge_dedup::{DedupConfig, DedupError};
use tracing::info;

use crate::exit_codes::{dedup_exit_code, EXIT_DEDUP_INPUT, EXIT_DEDUP_INVALID_CONFIG, EXIT_DEDUP_OUTPUT};
use crate::CliError;

fn dedup_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

impl From<DedupError> for CliError {
    fn from(err: DedupError) -> Self {
        let hint = match &err {
            DedupError::UnknownArchive(_) => {
                Some("add the archive tag to [resolution.instrument_ages]".to_string())
            }
            DedupError::MissingColumn { .. } => {
                Some("map the column under [archives.columns] or [archives.rename]".to_string())
            }
            DedupError::MissingValue { .. } => {
                Some("coordinates and epochs must be present in every row".to_string())
            }
            _ => None,
        };
        Self { code: dedup_exit_code(&err), message: err.to_string(), hint }
    }
}

/// JSON written by `--json` and `--summary`.
#[derive(Serialize)]
struct RunReport<'a> {
    meta: &'a DedupMeta,
    summary: &'a DedupSummary,
    outputs: Outputs,
}

#[derive(Serialize)]
struct Outputs {
    deduplicated: String,
    eliminations: String,
}

/// Read and validate a config. Returns it with the directory its relative
/// paths resolve against.
fn load_config(config_path: &Path) -> Result<(DedupConfig, PathBuf), CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        dedup_err(EXIT_DEDUP_INPUT, format!("cannot read config {}: {e}", config_path.display()))
    })?;
    let config = DedupConfig::from_toml(&config_str)?;
    let base_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    Ok((config, base_dir))
}

// ============================================================================
// run
// ============================================================================

pub fn cmd_run(
    config_path: PathBuf,
    json_output: bool,
    summary_file: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    parallel: bool,
) -> Result<(), CliError> {
    let (mut config, base_dir) = load_config(&config_path)?;
    if parallel {
        config.matching.parallel = true;
    }

    let table = load_archives(&config, &base_dir)?;
    let result = skymerge_dedup::run(&config, &table)?;

    let dir = out_dir.unwrap_or_else(|| base_dir.join(&config.output.dir));
    let (dedup_path, elim_path) = write_outputs(&dir, &config.output, &result)
        .map_err(|e| dedup_err(EXIT_DEDUP_OUTPUT, e.to_string()))?;

    let report = RunReport {
        meta: &result.meta,
        summary: &result.summary,
        outputs: Outputs {
            deduplicated: dedup_path.display().to_string(),
            eliminations: elim_path.display().to_string(),
        },
    };
    let json_str = serde_json::to_string_pretty(&report)
        .map_err(|e| dedup_err(EXIT_DEDUP_OUTPUT, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = summary_file {
        std::fs::write(path, &json_str).map_err(|e| {
            dedup_err(EXIT_DEDUP_OUTPUT, format!("cannot write summary {}: {e}", path.display()))
        })?;
        info!(path = %path.display(), "wrote summary");
    }

    if json_output {
        println!("{json_str}");
    }

    let s = &result.summary;
    eprintln!(
        "{}: {} observations from {} archive(s) → {} unique objects ({} multi-member clusters)",
        result.meta.config_name,
        s.observations,
        config.archives.len(),
        s.unique_objects,
        s.multi_member_clusters,
    );
    eprintln!(
        "eliminated {} by instrument age ({} tie(s) broken on epoch, {} skipped)",
        s.eliminated, s.tie_clusters_broken, s.tie_clusters_skipped,
    );
    eprintln!("wrote {}", dedup_path.display());
    eprintln!("wrote {}", elim_path.display());

    Ok(())
}

// ============================================================================
// validate
// ============================================================================

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let (config, _) = load_config(&config_path)?;
    if config.archives.is_empty() {
        return Err(dedup_err(EXIT_DEDUP_INVALID_CONFIG, "no archives configured")
            .with_hint("add at least one [[archives]] entry"));
    }

    let tags: Vec<&str> = config.archives.iter().map(|a| a.tag.as_str()).collect();
    eprintln!(
        "valid: '{}' with {} archive(s) [{}], clustering={}, tie_break={}",
        config.name,
        config.archives.len(),
        tags.join(", "),
        config.matching.clustering.as_str(),
        config.resolution.tie_break.as_str(),
    );
    Ok(())
}

// ============================================================================
// profile
// ============================================================================

pub fn cmd_profile(config_path: PathBuf, json_output: bool) -> Result<(), CliError> {
    let (config, base_dir) = load_config(&config_path)?;
    let table = load_archives(&config, &base_dir)?;
    let report = profile_table(&table);

    if json_output {
        let json_str = serde_json::to_string_pretty(&report)
            .map_err(|e| dedup_err(EXIT_DEDUP_OUTPUT, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
        return Ok(());
    }

    for profile in report.archives.iter().chain(std::iter::once(&report.merged)) {
        print_profile(profile);
    }
    Ok(())
}

fn print_profile(p: &TableProfile) {
    println!("{}", p.title);
    println!("{}", "=".repeat(p.title.len()));
    println!("rows:             {}", p.rows);
    println!("distinct targets: {}", p.distinct_targets);
    for (label, stats) in [("ra:", &p.ra), ("dec:", &p.dec), ("epoch_mjd:", &p.epoch_mjd)] {
        if let Some(s) = stats {
            println!("{label:<17} min {:.6}  max {:.6}  mean {:.6}", s.min, s.max, s.mean);
        }
    }
    println!("missing values:");
    for c in &p.columns {
        println!("  {:<24} {:>6.1}%", c.name, c.missing_fraction * 100.0);
    }
    println!();
}
