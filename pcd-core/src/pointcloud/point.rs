pub const CLASS_GROUND: u8 = 2;
pub const CLASS_MEDIUM_VEGETATION: u8 = 4;

pub const HEIGHT_ABOVE_GROUND: &str = "HeightAboveGround";

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub classification: u8,
    pub height_above_ground: Option<f64>,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            classification: 0,
            height_above_ground: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    pub points: Vec<Point>,
    pub metadata: Metadata,
}

impl PointCloud {
    pub fn new(points: Vec<Point>) -> Self {
        let mut bounding_volume = BoundingVolume::empty();
        for point in &points {
            bounding_volume.extend(point.x, point.y, point.z);
        }

        let metadata = Metadata {
            point_count: points.len(),
            bounding_volume,
        };

        PointCloud { points, metadata }
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64, f64, &Point)> {
        self.points
            .iter()
            .map(|point| (point.x, point.y, point.z, point))
    }
}

// Axis-aligned bounds of the point coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundingVolume {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl BoundingVolume {
    pub fn empty() -> Self {
        Self {
            min: [f64::MAX, f64::MAX, f64::MAX],
            max: [f64::MIN, f64::MIN, f64::MIN],
        }
    }

    pub fn extend(&mut self, x: f64, y: f64, z: f64) {
        self.max[0] = self.max[0].max(x);
        self.max[1] = self.max[1].max(y);
        self.max[2] = self.max[2].max(z);
        self.min[0] = self.min[0].min(x);
        self.min[1] = self.min[1].min(y);
        self.min[2] = self.min[2].min(z);
    }

    pub fn is_empty(&self) -> bool {
        self.min[0] > self.max[0]
    }

    pub fn area_xy(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        (self.max[0] - self.min[0]) * (self.max[1] - self.min[1])
    }
}

#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub point_count: usize,
    pub bounding_volume: BoundingVolume,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_volume_tracks_extent() {
        let pc = PointCloud::new(vec![
            Point::new(10.0, 20.0, 1.0),
            Point::new(14.0, 25.0, 3.0),
            Point::new(12.0, 21.0, -1.0),
        ]);
        assert_eq!(pc.metadata.point_count, 3);
        assert_eq!(pc.metadata.bounding_volume.min, [10.0, 20.0, -1.0]);
        assert_eq!(pc.metadata.bounding_volume.max, [14.0, 25.0, 3.0]);
        assert_eq!(pc.metadata.bounding_volume.area_xy(), 20.0);
    }

    #[test]
    fn empty_cloud_has_zero_area() {
        let pc = PointCloud::new(vec![]);
        assert!(pc.metadata.bounding_volume.is_empty());
        assert_eq!(pc.metadata.bounding_volume.area_xy(), 0.0);
    }
}
