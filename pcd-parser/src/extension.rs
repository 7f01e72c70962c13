use std::{ffi::OsStr, path::Path};

use crate::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    Las,
    Laz,
    Xyz,
    Csv,
    Txt,
}

impl Extension {
    /// Delimited text coordinates rather than a binary point cloud.
    pub fn is_text(&self) -> bool {
        matches!(self, Extension::Xyz | Extension::Csv | Extension::Txt)
    }
}

pub fn get_extension(extension: &str) -> Result<Extension, ParseError> {
    match extension.to_ascii_lowercase().as_str() {
        "las" => Ok(Extension::Las),
        "laz" => Ok(Extension::Laz),
        "xyz" => Ok(Extension::Xyz),
        "csv" => Ok(Extension::Csv),
        "txt" => Ok(Extension::Txt),
        _ => Err(ParseError::UnsupportedExtension(extension.to_string())),
    }
}

pub fn extension_of(path: &Path) -> Option<Extension> {
    path.extension()
        .and_then(OsStr::to_str)
        .and_then(|ext| get_extension(ext).ok())
}

/// Shared extension of `paths`; a mix of formats is rejected.
pub fn check_and_get_extension<P: AsRef<Path>>(paths: &[P]) -> Result<Extension, ParseError> {
    let mut extensions = vec![];
    for path in paths.iter() {
        let path = path.as_ref();
        match path.extension().and_then(OsStr::to_str) {
            Some(ext) => extensions.push(ext.to_ascii_lowercase()),
            None => return Err(ParseError::MissingExtension(path.to_path_buf())),
        }
    }
    extensions.sort();
    extensions.dedup();

    match extensions.as_slice() {
        [] => Err(ParseError::UnsupportedExtension(String::new())),
        [ext] => get_extension(ext),
        _ => Err(ParseError::MixedExtensions(extensions)),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn extensions_are_case_insensitive() {
        assert_eq!(get_extension("LAZ").unwrap(), Extension::Laz);
        assert!(get_extension("xyz").unwrap().is_text());
        assert!(!get_extension("las").unwrap().is_text());
        assert!(get_extension("tif").is_err());
    }

    #[test]
    fn shared_extension_is_returned() {
        let paths = vec![PathBuf::from("a/1.las"), PathBuf::from("b/2.las")];
        assert_eq!(check_and_get_extension(&paths).unwrap(), Extension::Las);
    }

    #[test]
    fn mixed_extensions_are_rejected() {
        let paths = vec![PathBuf::from("1.las"), PathBuf::from("2.xyz")];
        assert!(matches!(
            check_and_get_extension(&paths),
            Err(ParseError::MixedExtensions(_))
        ));
        let paths = vec![PathBuf::from("README")];
        assert!(matches!(
            check_and_get_extension(&paths),
            Err(ParseError::MissingExtension(_))
        ));
    }
}
