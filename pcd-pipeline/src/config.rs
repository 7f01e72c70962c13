use std::{fmt, path::PathBuf, str::FromStr};

use pcd_core::{
    pointcloud::point::{CLASS_GROUND, CLASS_MEDIUM_VEGETATION},
    tile::TileGrid,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingMode {
    /// Separated when `Ground/` and `Non-Ground/` both exist, single otherwise.
    Auto,
    Single,
    Separated,
}

impl FromStr for ProcessingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "single" => Ok(Self::Single),
            "separated" => Ok(Self::Separated),
            other => Err(format!(
                "unknown mode {other:?} (expected auto, single or separated)"
            )),
        }
    }
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::Single => "single",
            Self::Separated => "separated",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HagMethod {
    NearestNeighbour,
    Delaunay,
}

impl HagMethod {
    pub fn stage_type(&self) -> &'static str {
        match self {
            Self::NearestNeighbour => "filters.hag_nn",
            Self::Delaunay => "filters.hag_delaunay",
        }
    }
}

impl FromStr for HagMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nn" => Ok(Self::NearestNeighbour),
            "delaunay" => Ok(Self::Delaunay),
            other => Err(format!("unknown HAG method {other:?} (expected nn or delaunay)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Laszip,
}

impl Compression {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Laszip => "laszip",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextReaderOptions {
    pub header: String,
    pub separator: Option<String>,
    pub spatial_reference: String,
}

impl Default for TextReaderOptions {
    fn default() -> Self {
        Self {
            header: "X,Y,Z".to_string(),
            separator: None,
            // MGA zone 56 on GDA2020
            spatial_reference: "EPSG:7856".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input_root: PathBuf,
    pub output: PathBuf,
    pub mode: ProcessingMode,
    pub ground_dir: String,
    pub non_ground_dir: String,
    pub ground_class: u8,
    pub non_ground_class: u8,
    pub text_reader: TextReaderOptions,
    pub hag_method: HagMethod,
    pub compression: Option<Compression>,
    pub tile_grid: Option<TileGrid>,
    pub copc_output: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn new(input_root: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input_root: input_root.into(),
            output: output.into(),
            mode: ProcessingMode::Auto,
            ground_dir: "Ground".to_string(),
            non_ground_dir: "Non-Ground".to_string(),
            ground_class: CLASS_GROUND,
            non_ground_class: CLASS_MEDIUM_VEGETATION,
            text_reader: TextReaderOptions::default(),
            hag_method: HagMethod::NearestNeighbour,
            compression: Some(Compression::Laszip),
            tile_grid: None,
            copc_output: None,
        }
    }

    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_tile_grid(mut self, grid: TileGrid) -> Self {
        self.tile_grid = Some(grid);
        self
    }
}
