/// Single-band raster held in row-major order, e.g. a canopy height model in
/// metres.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: usize,
    pub height: usize,
    pub cells: Vec<f64>,
    pub nodata: Option<f64>,
    pub pixel_size: [f64; 2],
    pub origin: [f64; 2],
}

impl Raster {
    pub fn from_vec(width: usize, height: usize, cells: Vec<f64>) -> Self {
        debug_assert_eq!(width * height, cells.len());
        Self {
            width,
            height,
            cells,
            nodata: None,
            pixel_size: [1.0, 1.0],
            origin: [0.0, 0.0],
        }
    }

    pub fn with_nodata(mut self, nodata: Option<f64>) -> Self {
        self.nodata = nodata;
        self
    }

    pub fn with_georeference(mut self, pixel_size: [f64; 2], origin: [f64; 2]) -> Self {
        self.pixel_size = pixel_size;
        self.origin = origin;
        self
    }

    pub fn is_valid(&self, value: f64) -> bool {
        if value.is_nan() {
            return false;
        }
        match self.nodata {
            Some(nodata) => value != nodata,
            None => true,
        }
    }

    /// Cells that are neither NaN nor equal to the nodata value.
    pub fn valid_cells(&self) -> impl Iterator<Item = f64> + '_ {
        self.cells.iter().copied().filter(|v| self.is_valid(*v))
    }

    pub fn pixel_area(&self) -> f64 {
        (self.pixel_size[0] * self.pixel_size[1]).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodata_and_nan_are_masked() {
        let raster = Raster::from_vec(2, 2, vec![1.0, -9999.0, f64::NAN, 3.0])
            .with_nodata(Some(-9999.0));
        let valid: Vec<f64> = raster.valid_cells().collect();
        assert_eq!(valid, vec![1.0, 3.0]);
    }

    #[test]
    fn pixel_area_ignores_sign_of_y_resolution() {
        let raster = Raster::from_vec(1, 1, vec![0.0]).with_georeference([0.5, -0.5], [0.0, 0.0]);
        assert_eq!(raster.pixel_area(), 0.25);
    }
}
