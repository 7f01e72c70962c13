pub mod extra_bytes;

use std::path::PathBuf;

use las::Reader;
use pcd_core::pointcloud::point::Point;

use self::extra_bytes::ExtraDimension;
use super::PointReader;
use crate::ParseError;

/// Streams points from one or more LAS/LAZ files, optionally decoding a named
/// extra-bytes dimension into `Point::height_above_ground`.
pub struct LasPointReader {
    files: Vec<PathBuf>,
    current_file_index: usize,
    current_reader: Option<Reader>,
    dimension_name: Option<String>,
    dimension_required: bool,
    current_dimension: Option<ExtraDimension>,
}

impl LasPointReader {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self {
            files,
            current_file_index: 0,
            current_reader: None,
            dimension_name: None,
            dimension_required: false,
            current_dimension: None,
        }
    }

    /// Decode `name` when a file carries it.
    pub fn with_dimension(mut self, name: &str) -> Self {
        self.dimension_name = Some(name.to_string());
        self.dimension_required = false;
        self
    }

    /// Decode `name`; a file without it is a fatal error.
    pub fn require_dimension(mut self, name: &str) -> Self {
        self.dimension_name = Some(name.to_string());
        self.dimension_required = true;
        self
    }

    fn open_next_file(&mut self) -> Result<(), ParseError> {
        if self.current_file_index >= self.files.len() {
            self.current_reader = None;
            return Ok(());
        }

        let path = &self.files[self.current_file_index];
        self.current_file_index += 1;

        let reader = Reader::from_path(path).map_err(|source| ParseError::Las {
            path: path.clone(),
            source,
        })?;
        log::debug!(
            "opened {:?} ({} points)",
            path,
            reader.header().number_of_points()
        );

        self.current_dimension = match &self.dimension_name {
            Some(name) => {
                let header = reader.header();
                let dimension =
                    ExtraDimension::from_vlrs(header.vlrs().iter().chain(header.evlrs()), name)?;
                if dimension.is_none() && self.dimension_required {
                    return Err(ParseError::MissingDimension {
                        path: path.clone(),
                        name: name.clone(),
                    });
                }
                dimension
            }
            None => None,
        };

        self.current_reader = Some(reader);
        Ok(())
    }

    fn convert_las_point(&self, las_point: las::Point) -> Point {
        let height_above_ground = self
            .current_dimension
            .as_ref()
            .and_then(|dim| dim.read(&las_point.extra_bytes));

        Point {
            x: las_point.x,
            y: las_point.y,
            z: las_point.z,
            classification: u8::from(las_point.classification),
            height_above_ground,
        }
    }
}

impl PointReader for LasPointReader {
    fn next_point(&mut self) -> Result<Option<Point>, ParseError> {
        loop {
            let Some(reader) = self.current_reader.as_mut() else {
                self.open_next_file()?;
                if self.current_reader.is_none() {
                    return Ok(None);
                }
                continue;
            };

            let next = reader.points().next();
            match next {
                Some(Ok(las_point)) => {
                    return Ok(Some(self.convert_las_point(las_point)));
                }
                Some(Err(source)) => {
                    let path = self.files[self.current_file_index - 1].clone();
                    log::error!("Error reading LAS point from {:?}: {}", path, source);
                    return Err(ParseError::Las { path, source });
                }
                None => {
                    self.current_reader = None;
                }
            }
        }
    }
}
