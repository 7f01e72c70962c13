use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use pcd_parser::raster::geotiff::read_chm;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    config::MetricsConfig,
    error::{MetricsError, Result},
    stem_density::stem_density_from_las,
    summary::summary,
    table::{nan_as_empty, read_csv},
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ManifestRow {
    pub short_id: String,
    pub date: NaiveDate,
    pub chm: PathBuf,
    pub las: PathBuf,
    #[serde(default)]
    pub veg_type: Option<String>,
    #[serde(default)]
    pub rehab_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub short_id: String,
    pub date: NaiveDate,
    #[serde(with = "nan_as_empty")]
    pub woody_cover_pct: f64,
    #[serde(with = "nan_as_empty")]
    pub mean_height_m: f64,
    #[serde(with = "nan_as_empty")]
    pub p90_height_m: f64,
    #[serde(with = "nan_as_empty")]
    pub stem_density_per_ha: f64,
    pub area_m2_from_chm: f64,
    pub veg_type: Option<String>,
    pub rehab_year: Option<i32>,
}

/// Relative paths resolve against the manifest's directory.
pub fn read_manifest(path: &Path) -> Result<Vec<ManifestRow>> {
    let base = path.parent().unwrap_or(Path::new(""));
    let rows: Vec<ManifestRow> = read_csv(path)?;
    if rows.is_empty() {
        return Err(MetricsError::EmptyManifest(path.to_path_buf()));
    }
    Ok(rows
        .into_iter()
        .map(|mut row| {
            row.chm = base.join(&row.chm);
            row.las = base.join(&row.las);
            row
        })
        .collect())
}

pub fn analyse_site(row: &ManifestRow, config: &MetricsConfig) -> Result<SiteRecord> {
    let attempt = || -> Result<SiteRecord> {
        let chm = read_chm(&row.chm)?;
        let stats = summary(&chm, config);
        let stems = stem_density_from_las(&row.las, config)?;
        Ok(SiteRecord {
            short_id: row.short_id.clone(),
            date: row.date,
            woody_cover_pct: stats.woody_cover_pct,
            mean_height_m: stats.mean_height_m,
            p90_height_m: stats.p90_height_m,
            stem_density_per_ha: stems,
            area_m2_from_chm: stats.area_m2,
            veg_type: row.veg_type.clone(),
            rehab_year: row.rehab_year,
        })
    };
    attempt().map_err(|e| MetricsError::Site {
        short_id: row.short_id.clone(),
        date: row.date,
        source: Box::new(e),
    })
}

pub fn extract(rows: &[ManifestRow], config: &MetricsConfig) -> Result<Vec<SiteRecord>> {
    log::info!("start extracting statistics for {} surveys...", rows.len());
    let start = std::time::Instant::now();

    let mut records = rows
        .par_iter()
        .map(|row| analyse_site(row, config))
        .collect::<Result<Vec<_>>>()?;
    records.sort_by(|a, b| (&a.short_id, a.date).cmp(&(&b.short_id, b.date)));

    log::info!("finish extracting statistics in {:?}", start.elapsed());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::table::write_csv;

    #[test]
    fn manifest_paths_resolve_against_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.csv");
        fs::write(
            &path,
            "short_id,date,chm,las,veg_type,rehab_year\n\
             b9ceaa,2024-10-01,products/2024-10-01_chm.tif,products/2024-10-01_hag.laz,woodland,2012\n\
             c1d2e3,2025-02-15,/abs/chm.tif,/abs/hag.laz,,\n",
        )
        .unwrap();

        let rows = read_manifest(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].chm, dir.path().join("products/2024-10-01_chm.tif"));
        assert_eq!(rows[0].rehab_year, Some(2012));
        assert_eq!(rows[1].las, PathBuf::from("/abs/hag.laz"));
        assert_eq!(rows[1].veg_type, None);
        assert_eq!(rows[1].date, NaiveDate::from_ymd_opt(2025, 2, 15).unwrap());
    }

    #[test]
    fn empty_manifest_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.csv");
        fs::write(&path, "short_id,date,chm,las\n").unwrap();
        assert!(matches!(
            read_manifest(&path),
            Err(MetricsError::EmptyManifest(_))
        ));
    }

    #[test]
    fn failing_site_is_named_in_the_error() {
        let row = ManifestRow {
            short_id: "b9ceaa".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 10, 1).unwrap(),
            chm: PathBuf::from("missing_chm.tif"),
            las: PathBuf::from("missing_hag.laz"),
            veg_type: None,
            rehab_year: None,
        };
        let err = extract(&[row], &MetricsConfig::default()).unwrap_err();
        assert!(err.to_string().starts_with("site b9ceaa (2024-10-01)"));
    }

    #[test]
    fn site_records_round_trip_with_missing_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.csv");
        let record = SiteRecord {
            short_id: "b9ceaa".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 10, 1).unwrap(),
            woody_cover_pct: f64::NAN,
            mean_height_m: f64::NAN,
            p90_height_m: f64::NAN,
            stem_density_per_ha: 0.0,
            area_m2_from_chm: 0.0,
            veg_type: Some("woodland".to_string()),
            rehab_year: Some(2012),
        };
        write_csv(&path, &[record.clone()]).unwrap();
        let back: Vec<SiteRecord> = read_csv(&path).unwrap();
        assert_eq!(back[0].date, record.date);
        assert!(back[0].p90_height_m.is_nan());
        assert_eq!(back[0].stem_density_per_ha, 0.0);
        assert_eq!(back[0].veg_type.as_deref(), Some("woodland"));
    }
}
