//! Profiling summaries for each archive and for the merged table.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::{Observation, ObservationTable};

#[derive(Debug, Clone, Serialize)]
pub struct NumericStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub missing_fraction: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableProfile {
    pub title: String,
    pub rows: usize,
    pub distinct_targets: usize,
    pub columns: Vec<ColumnProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ra: Option<NumericStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dec: Option<NumericStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epoch_mjd: Option<NumericStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileReport {
    pub archives: Vec<TableProfile>,
    pub merged: TableProfile,
}

/// Profile every archive (in first-appearance order) and the merged table.
pub fn profile_table(table: &ObservationTable) -> ProfileReport {
    let mut sources: Vec<&str> = Vec::new();
    for obs in table.iter() {
        if !sources.contains(&obs.source.as_str()) {
            sources.push(&obs.source);
        }
    }

    let archives = sources
        .iter()
        .map(|source| {
            let rows: Vec<&Observation> = table.iter().filter(|o| o.source == *source).collect();
            profile_rows(&format!("{source} Dataset Profile"), &rows)
        })
        .collect();

    let all: Vec<&Observation> = table.iter().collect();
    ProfileReport {
        archives,
        merged: profile_rows("Merged Dataset Profile", &all),
    }
}

pub fn profile_rows(title: &str, rows: &[&Observation]) -> TableProfile {
    let extra_columns: BTreeSet<&str> = rows
        .iter()
        .flat_map(|o| o.extra.keys().map(String::as_str))
        .collect();

    let fraction = |missing: usize| {
        if rows.is_empty() {
            0.0
        } else {
            missing as f64 / rows.len() as f64
        }
    };

    let missing_number = |value: fn(&Observation) -> f64| {
        fraction(rows.iter().filter(|o| !value(**o).is_finite()).count())
    };

    // Core columns first; the loader rejects missing coordinates and epochs,
    // so theirs only become nonzero for tables built by hand.
    let mut columns = vec![
        ColumnProfile {
            name: "target_name".into(),
            missing_fraction: fraction(rows.iter().filter(|o| o.target_name.trim().is_empty()).count()),
        },
        ColumnProfile { name: "ra".into(), missing_fraction: missing_number(|o| o.ra) },
        ColumnProfile { name: "dec".into(), missing_fraction: missing_number(|o| o.dec) },
        ColumnProfile { name: "epoch_mjd".into(), missing_fraction: missing_number(|o| o.epoch_mjd) },
    ];
    for name in extra_columns {
        let missing = rows
            .iter()
            .filter(|o| o.extra.get(name).map_or(true, |v| v.is_empty()))
            .count();
        columns.push(ColumnProfile {
            name: name.to_string(),
            missing_fraction: fraction(missing),
        });
    }

    let distinct_targets = rows
        .iter()
        .map(|o| o.target_name.as_str())
        .filter(|n| !n.trim().is_empty())
        .collect::<BTreeSet<_>>()
        .len();

    TableProfile {
        title: title.to_string(),
        rows: rows.len(),
        distinct_targets,
        columns,
        ra: numeric_stats(rows.iter().map(|o| o.ra)),
        dec: numeric_stats(rows.iter().map(|o| o.dec)),
        epoch_mjd: numeric_stats(rows.iter().map(|o| o.epoch_mjd)),
    }
}

fn numeric_stats(values: impl Iterator<Item = f64>) -> Option<NumericStats> {
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        count += 1;
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }
    (count > 0).then(|| NumericStats {
        min,
        max,
        mean: sum / count as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(name: &str, ra: f64, source: &str, extra: &[(&str, &str)]) -> Observation {
        let mut o = Observation::new(name, ra, 0.0, 59000.0, source);
        for (k, v) in extra {
            o.extra.insert(k.to_string(), v.to_string());
        }
        o
    }

    #[test]
    fn per_archive_and_merged() {
        let table = ObservationTable::new(vec![
            obs("NGC 1234", 10.0, "TESS", &[("filters", "TESS")]),
            obs("", 20.0, "TESS", &[("filters", "")]),
            obs("NGC 1234", 30.0, "HAWKI", &[("em_min", "1100")]),
        ]);
        let report = profile_table(&table);

        assert_eq!(report.archives.len(), 2);
        let tess = &report.archives[0];
        assert_eq!(tess.title, "TESS Dataset Profile");
        assert_eq!(tess.rows, 2);
        assert_eq!(tess.distinct_targets, 1);
        assert_eq!(tess.columns[0].name, "target_name");
        assert_eq!(tess.columns[0].missing_fraction, 0.5);
        for core in &tess.columns[1..4] {
            assert_eq!(core.missing_fraction, 0.0, "{}", core.name);
        }
        assert_eq!(tess.columns[4].name, "filters");
        assert_eq!(tess.columns[4].missing_fraction, 0.5);
        let ra = tess.ra.as_ref().unwrap();
        assert_eq!((ra.min, ra.max, ra.mean), (10.0, 20.0, 15.0));

        let merged = &report.merged;
        assert_eq!(merged.rows, 3);
        let names: Vec<&str> = merged.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["target_name", "ra", "dec", "epoch_mjd", "em_min", "filters"]);
        // em_min absent from TESS rows counts as missing
        assert!((merged.columns[4].missing_fraction - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn empty_table_has_no_stats() {
        let report = profile_table(&ObservationTable::default());
        assert!(report.archives.is_empty());
        assert_eq!(report.merged.rows, 0);
        assert!(report.merged.ra.is_none());
        assert_eq!(report.merged.columns.len(), 4);
        assert!(report.merged.columns.iter().all(|c| c.missing_fraction == 0.0));
    }

    #[test]
    fn non_finite_core_value_counts_as_missing() {
        let rows = [obs("Vega", 10.0, "TESS", &[]), obs("Vega", f64::NAN, "TESS", &[])];
        let refs: Vec<&Observation> = rows.iter().collect();
        let profile = profile_rows("t", &refs);

        let ra = profile.columns.iter().find(|c| c.name == "ra").unwrap();
        assert_eq!(ra.missing_fraction, 0.5);
        let dec = profile.columns.iter().find(|c| c.name == "dec").unwrap();
        assert_eq!(dec.missing_fraction, 0.0);
    }
}
