use std::path::PathBuf;

use pcd_parser::ParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("grid size must be positive, got {0}")]
    InvalidGrid(f64),
    #[error("site {short_id} ({date}): {source}")]
    Site {
        short_id: String,
        date: chrono::NaiveDate,
        #[source]
        source: Box<MetricsError>,
    },
    #[error("manifest {0:?} lists no sites")]
    EmptyManifest(PathBuf),
}

pub type Result<T> = std::result::Result<T, MetricsError>;
