use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("LAS error in {path}: {source}")]
    Las {
        path: PathBuf,
        #[source]
        source: las::Error,
    },
    #[error("TIFF error in {path}: {source}")]
    Tiff {
        path: PathBuf,
        #[source]
        source: tiff::TiffError,
    },
    #[error("LAS file {path:?} missing {name} dimension")]
    MissingDimension { path: PathBuf, name: String },
    #[error("malformed extra bytes descriptor: {0}")]
    ExtraBytes(String),
    #[error("unsupported extension: {0:?}")]
    UnsupportedExtension(String),
    #[error("file extension is not found: {0:?}")]
    MissingExtension(PathBuf),
    #[error("multiple extensions are not supported: {0:?}")]
    MixedExtensions(Vec<String>),
    #[error("unsupported raster sample format in {0:?}")]
    UnsupportedSampleFormat(PathBuf),
}
