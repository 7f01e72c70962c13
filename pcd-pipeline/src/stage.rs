use std::path::PathBuf;

use pcd_core::pointcloud::point::HEIGHT_ABOVE_GROUND;
use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::config::{Compression, HagMethod, TextReaderOptions};

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Read {
        filename: PathBuf,
        tag: Option<String>,
        text: Option<TextReaderOptions>,
    },
    Reclassify {
        class_code: u8,
        tag: Option<String>,
    },
    /// Empty `inputs` merges every preceding unconsumed reader.
    Merge {
        inputs: Vec<String>,
    },
    DeriveHeight {
        method: HagMethod,
    },
    Write {
        filename: PathBuf,
        compression: Option<Compression>,
        extra_dims: Option<String>,
    },
    WriteCopc {
        filename: PathBuf,
    },
}

impl Stage {
    pub fn stage_type(&self) -> &'static str {
        match self {
            Stage::Read { text: None, .. } => "readers.las",
            Stage::Read { text: Some(_), .. } => "readers.text",
            Stage::Reclassify { .. } => "filters.assign",
            Stage::Merge { .. } => "filters.merge",
            Stage::DeriveHeight { method } => method.stage_type(),
            Stage::Write { .. } => "writers.las",
            Stage::WriteCopc { .. } => "writers.copc",
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Stage::Read { tag, .. } | Stage::Reclassify { tag, .. } => tag.as_deref(),
            _ => None,
        }
    }

    pub fn is_writer(&self) -> bool {
        matches!(self, Stage::Write { .. } | Stage::WriteCopc { .. })
    }

    pub fn read_las(filename: impl Into<PathBuf>) -> Self {
        Stage::Read {
            filename: filename.into(),
            tag: None,
            text: None,
        }
    }

    pub fn write_with_hag(filename: impl Into<PathBuf>, compression: Option<Compression>) -> Self {
        Stage::Write {
            filename: filename.into(),
            compression,
            extra_dims: Some(format!("{HEIGHT_ABOVE_GROUND}=float64")),
        }
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", self.stage_type())?;

        match self {
            Stage::Read {
                filename,
                tag,
                text,
            } => {
                map.serialize_entry("filename", &filename.to_string_lossy())?;
                if let Some(text) = text {
                    map.serialize_entry("header", &text.header)?;
                    if let Some(separator) = &text.separator {
                        map.serialize_entry("separator", separator)?;
                    }
                    map.serialize_entry("spatialreference", &text.spatial_reference)?;
                }
                if let Some(tag) = tag {
                    map.serialize_entry("tag", tag)?;
                }
            }
            Stage::Reclassify { class_code, tag } => {
                map.serialize_entry("assignment", &format!("Classification[:]={class_code}"))?;
                if let Some(tag) = tag {
                    map.serialize_entry("tag", tag)?;
                }
            }
            Stage::Merge { inputs } => {
                if !inputs.is_empty() {
                    map.serialize_entry("inputs", inputs)?;
                }
            }
            Stage::DeriveHeight { .. } => {}
            Stage::Write {
                filename,
                compression,
                extra_dims,
            } => {
                map.serialize_entry("filename", &filename.to_string_lossy())?;
                if let Some(compression) = compression {
                    map.serialize_entry("compression", compression.as_str())?;
                }
                if let Some(extra_dims) = extra_dims {
                    map.serialize_entry("extra_dims", extra_dims)?;
                }
            }
            Stage::WriteCopc { filename } => {
                map.serialize_entry("filename", &filename.to_string_lossy())?;
            }
        }

        map.end()
    }
}
