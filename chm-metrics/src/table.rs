use std::{fs, path::Path};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

/// Writes `rows` as a headed CSV table, creating the parent directory.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    log::info!("wrote {} rows to {:?}", rows.len(), path);
    Ok(())
}

pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<std::result::Result<Vec<T>, _>>()?;
    log::debug!("read {} rows from {:?}", rows.len(), path);
    Ok(rows)
}

/// Missing statistics are NaN in memory and empty cells on disk.
pub mod nan_as_empty {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_none()
        } else {
            serializer.serialize_some(value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    struct Row {
        short_id: String,
        #[serde(with = "nan_as_empty")]
        value: f64,
    }

    #[test]
    fn nan_is_written_as_empty_cell() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/rows.csv");
        write_csv(
            &path,
            &[
                Row {
                    short_id: "b9ceaa".to_string(),
                    value: 1.25,
                },
                Row {
                    short_id: "c1d2e3".to_string(),
                    value: f64::NAN,
                },
            ],
        )
        .unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "short_id,value\nb9ceaa,1.25\nc1d2e3,\n");

        let rows: Vec<Row> = read_csv(&path).unwrap();
        assert_eq!(rows[0].value, 1.25);
        assert!(rows[1].value.is_nan());
    }

    #[test]
    fn missing_table_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_csv::<Row>(&dir.path().join("absent.csv")).is_err());
    }
}
