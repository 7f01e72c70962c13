pub mod error;
pub mod extension;
pub mod raster;
pub mod reader;

pub use error::ParseError;
