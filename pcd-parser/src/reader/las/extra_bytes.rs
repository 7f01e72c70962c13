use byteorder::{ByteOrder as _, LittleEndian};
use las::Vlr;

use crate::ParseError;

const KNOWN_VLR_USER_ID: &str = "LASF_Spec";
pub const EXTRA_BYTES_RECORD_ID: u16 = 4;
const RAW_ENTRY_SIZE: usize = 192;

// Field offsets inside a 192 byte EXTRA_BYTES entry.
const DATA_TYPE: usize = 2;
const OPTIONS: usize = 3;
const NAME: std::ops::Range<usize> = 4..36;
const SCALE: usize = 112;
const OFFSET: usize = 136;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtraBytesDataType {
    /// Opaque bytes; the options field holds the byte count.
    Undocumented(u8),
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
    Unsupported(u8),
}

impl ExtraBytesDataType {
    fn from_raw(data_type: u8, options: u8) -> Self {
        match data_type {
            0 => Self::Undocumented(options),
            1 => Self::U8,
            2 => Self::I8,
            3 => Self::U16,
            4 => Self::I16,
            5 => Self::U32,
            6 => Self::I32,
            7 => Self::U64,
            8 => Self::I64,
            9 => Self::F32,
            10 => Self::F64,
            other => Self::Unsupported(other),
        }
    }

    pub fn size(&self) -> Option<usize> {
        match self {
            Self::Undocumented(n) => Some(*n as usize),
            Self::U8 | Self::I8 => Some(1),
            Self::U16 | Self::I16 => Some(2),
            Self::U32 | Self::I32 | Self::F32 => Some(4),
            Self::U64 | Self::I64 | Self::F64 => Some(8),
            Self::Unsupported(_) => None,
        }
    }

    fn decode(&self, bytes: &[u8]) -> Option<f64> {
        let value = match self {
            Self::U8 => bytes[0] as f64,
            Self::I8 => bytes[0] as i8 as f64,
            Self::U16 => LittleEndian::read_u16(bytes) as f64,
            Self::I16 => LittleEndian::read_i16(bytes) as f64,
            Self::U32 => LittleEndian::read_u32(bytes) as f64,
            Self::I32 => LittleEndian::read_i32(bytes) as f64,
            Self::U64 => LittleEndian::read_u64(bytes) as f64,
            Self::I64 => LittleEndian::read_i64(bytes) as f64,
            Self::F32 => LittleEndian::read_f32(bytes) as f64,
            Self::F64 => LittleEndian::read_f64(bytes),
            Self::Undocumented(_) | Self::Unsupported(_) => return None,
        };
        Some(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtraBytesEntry {
    pub name: String,
    pub data_type: ExtraBytesDataType,
    pub scale: Option<f64>,
    pub offset: Option<f64>,
}

/// Parses the descriptors of an EXTRA_BYTES VLR payload.
pub fn parse_descriptors(data: &[u8]) -> Result<Vec<ExtraBytesEntry>, ParseError> {
    if data.len() % RAW_ENTRY_SIZE != 0 {
        return Err(ParseError::ExtraBytes(format!(
            "VLR data size ({} bytes) is not a multiple of {RAW_ENTRY_SIZE}",
            data.len()
        )));
    }

    let entries = data
        .chunks_exact(RAW_ENTRY_SIZE)
        .map(|raw| {
            let options = raw[OPTIONS];
            let name = String::from_utf8_lossy(&raw[NAME])
                .trim_end_matches('\0')
                .to_string();
            ExtraBytesEntry {
                name,
                data_type: ExtraBytesDataType::from_raw(raw[DATA_TYPE], options),
                scale: (options & 0b0000_1000 != 0)
                    .then(|| LittleEndian::read_f64(&raw[SCALE..SCALE + 8])),
                offset: (options & 0b0001_0000 != 0)
                    .then(|| LittleEndian::read_f64(&raw[OFFSET..OFFSET + 8])),
            }
        })
        .collect();
    Ok(entries)
}

/// Location of one named extra dimension within a point's extra bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtraDimension {
    pub byte_offset: usize,
    pub entry: ExtraBytesEntry,
}

impl ExtraDimension {
    pub fn locate(entries: &[ExtraBytesEntry], name: &str) -> Result<Option<Self>, ParseError> {
        let mut byte_offset = 0;
        for entry in entries {
            if entry.name == name {
                if entry.data_type.decode(&[0u8; 8]).is_none() {
                    return Err(ParseError::ExtraBytes(format!(
                        "dimension {name} has non-numeric type {:?}",
                        entry.data_type
                    )));
                }
                return Ok(Some(Self {
                    byte_offset,
                    entry: entry.clone(),
                }));
            }
            byte_offset += entry.data_type.size().ok_or_else(|| {
                ParseError::ExtraBytes(format!(
                    "cannot size extra bytes entry {} of type {:?}",
                    entry.name, entry.data_type
                ))
            })?;
        }
        Ok(None)
    }

    pub fn from_vlrs<'a>(
        vlrs: impl IntoIterator<Item = &'a Vlr>,
        name: &str,
    ) -> Result<Option<Self>, ParseError> {
        for vlr in vlrs {
            if vlr.user_id == KNOWN_VLR_USER_ID && vlr.record_id == EXTRA_BYTES_RECORD_ID {
                let entries = parse_descriptors(&vlr.data)?;
                return Self::locate(&entries, name);
            }
        }
        Ok(None)
    }

    pub fn read(&self, extra_bytes: &[u8]) -> Option<f64> {
        let size = self.entry.data_type.size()?;
        let bytes = extra_bytes.get(self.byte_offset..self.byte_offset + size)?;
        let raw = self.entry.data_type.decode(bytes)?;
        Some(raw * self.entry.scale.unwrap_or(1.0) + self.entry.offset.unwrap_or(0.0))
    }
}
