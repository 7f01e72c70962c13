use std::path::PathBuf;

use pcd_core::tile::TileGridError;
use pcd_parser::ParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no input files found under {0:?}")]
    NoInputFiles(PathBuf),
    #[error("input directory {0:?} does not exist")]
    MissingDirectory(PathBuf),
    #[error("invalid job: {0}")]
    InvalidJob(String),
    #[error(transparent)]
    TileGrid(#[from] TileGridError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode job: {0}")]
    Json(#[from] serde_json::Error),
    #[error("point-cloud engine failed ({status}): {stderr}")]
    Engine { status: String, stderr: String },
    #[error("unexpected engine output: {0}")]
    EngineOutput(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
