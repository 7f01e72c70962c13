use pcd_core::raster::Raster;

use crate::config::MetricsConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChmSummary {
    pub woody_cover_pct: f64,
    pub mean_height_m: f64,
    pub p90_height_m: f64,
    pub valid_cells: usize,
    pub area_m2: f64,
}

/// A raster without a valid cell yields NaN statistics.
pub fn summary(chm: &Raster, config: &MetricsConfig) -> ChmSummary {
    let mut heights: Vec<f64> = chm.valid_cells().collect();
    let valid_cells = heights.len();
    let area_m2 = valid_cells as f64 * chm.pixel_area();

    if heights.is_empty() {
        return ChmSummary {
            woody_cover_pct: f64::NAN,
            mean_height_m: f64::NAN,
            p90_height_m: f64::NAN,
            valid_cells,
            area_m2,
        };
    }

    let n = valid_cells as f64;
    let woody = heights
        .iter()
        .filter(|&&h| h > config.woody_threshold_m)
        .count();
    let mean = heights.iter().sum::<f64>() / n;

    heights.sort_by(f64::total_cmp);

    ChmSummary {
        woody_cover_pct: woody as f64 / n * 100.0,
        mean_height_m: mean,
        p90_height_m: percentile(&heights, 90.0),
        valid_cells,
        area_m2,
    }
}

pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}
