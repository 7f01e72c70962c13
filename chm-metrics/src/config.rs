use crate::error::{MetricsError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsConfig {
    pub woody_threshold_m: f64,
    /// Points at or below this height above ground are grass and shrub noise.
    pub stem_hag_cutoff_m: f64,
    pub stem_grid_m: f64,
    pub days_per_year: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            woody_threshold_m: 1.0,
            stem_hag_cutoff_m: 2.0,
            stem_grid_m: 2.0,
            days_per_year: 365.25,
        }
    }
}

impl MetricsConfig {
    pub fn with_stem_grid(mut self, grid_m: f64) -> Result<Self> {
        if !(grid_m.is_finite() && grid_m > 0.0) {
            return Err(MetricsError::InvalidGrid(grid_m));
        }
        self.stem_grid_m = grid_m;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_must_be_positive() {
        assert_eq!(
            MetricsConfig::default().with_stem_grid(5.0).unwrap().stem_grid_m,
            5.0
        );
        assert!(MetricsConfig::default().with_stem_grid(0.0).is_err());
        assert!(MetricsConfig::default().with_stem_grid(f64::NAN).is_err());
    }
}
