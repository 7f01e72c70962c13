use std::path::Path;

use pcd_core::pointcloud::{
    grid::OccupancyGrid,
    point::{Point, PointCloud, HEIGHT_ABOVE_GROUND},
};
use pcd_parser::reader::{las::LasPointReader, PointIterator};

use crate::{config::MetricsConfig, error::Result};

const SQUARE_METRES_PER_HECTARE: f64 = 10_000.0;
const CHUNK_SIZE: usize = 100_000;

/// Occupied grid cells of the tall points per hectare of their extent.
pub fn stem_density(points: &[Point], config: &MetricsConfig) -> f64 {
    let stems = PointCloud::new(
        points
            .iter()
            .filter(|p| is_stem_point(p, config))
            .cloned()
            .collect(),
    );
    density_of(&stems, config)
}

fn is_stem_point(point: &Point, config: &MetricsConfig) -> bool {
    point
        .height_above_ground
        .is_some_and(|hag| hag > config.stem_hag_cutoff_m)
}

fn density_of(stems: &PointCloud, config: &MetricsConfig) -> f64 {
    if stems.points.is_empty() {
        return 0.0;
    }

    let xy: Vec<(f64, f64)> = stems.iter().map(|(x, y, _, _)| (x, y)).collect();
    let occupied = OccupancyGrid::from_xy(&xy, config.stem_grid_m).occupied();

    let area_ha = stems.metadata.bounding_volume.area_xy() / SQUARE_METRES_PER_HECTARE;
    if area_ha <= 0.0 {
        log::warn!(
            "{} stem points span no area, stem density is unbounded",
            stems.metadata.point_count
        );
    }

    occupied as f64 / area_ha
}

pub fn stem_density_from_las(path: &Path, config: &MetricsConfig) -> Result<f64> {
    let reader =
        LasPointReader::new(vec![path.to_path_buf()]).require_dimension(HEIGHT_ABOVE_GROUND);

    let mut tall = Vec::new();
    let mut total = 0usize;
    for chunk in PointIterator::new(reader, CHUNK_SIZE) {
        let chunk = chunk?;
        total += chunk.len();
        tall.extend(chunk.into_iter().filter(|p| is_stem_point(p, config)));
    }
    log::debug!(
        "{:?}: {} of {} points above {} m",
        path,
        tall.len(),
        total,
        config.stem_hag_cutoff_m
    );

    Ok(density_of(&PointCloud::new(tall), config))
}
