use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TileGridError {
    #[error("tile step must be positive, got {0}")]
    InvalidStep(i64),
    #[error("empty tile range: {axis} min {min} > max {max}")]
    EmptyRange { axis: char, min: i64, max: i64 },
    #[error("tile grid of {0} cells exceeds the limit of {MAX_CELLS}")]
    TooManyCells(u128),
}

pub const MAX_CELLS: u128 = 1_000_000;

fn cells_along(min: i64, max: i64, step: i64) -> u128 {
    (max as i128 - min as i128) as u128 / step as u128 + 1
}

/// Survey tile grid. Tile files are named by the bottom-left corner of their
/// cell, `{x}_{y}...`.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    min_x: i64,
    max_x: i64,
    min_y: i64,
    max_y: i64,
    step: i64,
    excluded: Vec<String>,
    included: Vec<String>,
}

impl TileGrid {
    pub fn new(
        (min_x, max_x): (i64, i64),
        (min_y, max_y): (i64, i64),
        step: i64,
        excluded: Vec<String>,
    ) -> Result<Self, TileGridError> {
        if step <= 0 {
            return Err(TileGridError::InvalidStep(step));
        }
        if min_x > max_x {
            return Err(TileGridError::EmptyRange {
                axis: 'x',
                min: min_x,
                max: max_x,
            });
        }
        if min_y > max_y {
            return Err(TileGridError::EmptyRange {
                axis: 'y',
                min: min_y,
                max: max_y,
            });
        }

        let cells =
            cells_along(min_x, max_x, step).saturating_mul(cells_along(min_y, max_y, step));
        if cells > MAX_CELLS {
            return Err(TileGridError::TooManyCells(cells));
        }

        let mut included = Vec::new();
        let mut x = Some(min_x);
        while let Some(cx) = x.filter(|cx| *cx <= max_x) {
            let mut y = Some(min_y);
            while let Some(cy) = y.filter(|cy| *cy <= max_y) {
                let prefix = format!("{cx}_{cy}");
                if !excluded.contains(&prefix) {
                    included.push(prefix);
                }
                y = cy.checked_add(step);
            }
            x = cx.checked_add(step);
        }

        Ok(Self {
            min_x,
            max_x,
            min_y,
            max_y,
            step,
            excluded,
            included,
        })
    }

    pub fn included_prefixes(&self) -> &[String] {
        &self.included
    }

    pub fn excluded_prefixes(&self) -> &[String] {
        &self.excluded
    }

    pub fn step(&self) -> i64 {
        self.step
    }

    pub fn bounds(&self) -> ((i64, i64), (i64, i64)) {
        ((self.min_x, self.max_x), (self.min_y, self.max_y))
    }

    /// Plain string-prefix match of a file name against the included cells.
    pub fn matches(&self, file_name: &str) -> bool {
        self.included
            .iter()
            .any(|prefix| file_name.starts_with(prefix.as_str()))
    }
}

/// Grid cell encoded at the start of a tile file name.
pub fn parse_tile_prefix(file_name: &str) -> Option<(i64, i64)> {
    let mut parts = file_name.splitn(3, '_');
    let x = parts.next()?.parse().ok()?;
    let y_part = parts.next()?;
    let y_digits: String = y_part
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '-')
        .collect();
    let y = y_digits.parse().ok()?;
    Some((x, y))
}
