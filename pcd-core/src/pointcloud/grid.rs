use std::collections::HashSet;

/// Uniform horizontal grid anchored at the minimum coordinate of the points it
/// is built from.
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    cell_size: f64,
    origin: (f64, f64),
    cells: HashSet<(i64, i64)>,
}

impl OccupancyGrid {
    pub fn from_xy(xy: &[(f64, f64)], cell_size: f64) -> Self {
        let origin = xy.iter().fold((f64::MAX, f64::MAX), |acc, &(x, y)| {
            (acc.0.min(x), acc.1.min(y))
        });

        let mut grid = Self {
            cell_size,
            origin,
            cells: HashSet::new(),
        };
        for &(x, y) in xy {
            let index = grid.cell_index(x, y);
            grid.cells.insert(index);
        }
        grid
    }

    fn cell_index(&self, x: f64, y: f64) -> (i64, i64) {
        let x_idx = ((x - self.origin.0) / self.cell_size).floor() as i64;
        let y_idx = ((y - self.origin.1) / self.cell_size).floor() as i64;
        (x_idx, y_idx)
    }

    pub fn occupied(&self) -> usize {
        self.cells.len()
    }
}
