use std::path::{Path, PathBuf};

use glob::{glob, Pattern};
use pcd_core::tile::parse_tile_prefix;
use pcd_parser::extension::{check_and_get_extension, extension_of};

use crate::{
    config::{PipelineConfig, ProcessingMode},
    error::{PipelineError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointRole {
    Ground,
    NonGround,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    PointCloud,
    TextCoordinates,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileFile {
    pub path: PathBuf,
    pub role: Option<PointRole>,
}

impl TileFile {
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }
}

/// Files in scope for one run, with the mode they were discovered in.
#[derive(Debug, Clone, PartialEq)]
pub struct Discovery {
    pub mode: ProcessingMode,
    pub format: InputFormat,
    pub files: Vec<TileFile>,
}

impl Discovery {
    pub fn with_role(&self, role: PointRole) -> impl Iterator<Item = &TileFile> {
        self.files.iter().filter(move |f| f.role == Some(role))
    }
}

pub fn resolve_mode(config: &PipelineConfig) -> ProcessingMode {
    match config.mode {
        ProcessingMode::Auto => {
            let ground = config.input_root.join(&config.ground_dir);
            let non_ground = config.input_root.join(&config.non_ground_dir);
            if ground.is_dir() && non_ground.is_dir() {
                ProcessingMode::Separated
            } else {
                ProcessingMode::Single
            }
        }
        mode => mode,
    }
}

// Later survey deliveries nest the point clouds one level deeper.
fn role_dir(root: &Path, name: &str) -> PathBuf {
    let dir = root.join(name);
    let las_dir = dir.join("LAS");
    if las_dir.is_dir() {
        las_dir
    } else {
        dir
    }
}

fn list_dir(dir: &Path, config: &PipelineConfig) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(PipelineError::MissingDirectory(dir.to_path_buf()));
    }

    let pattern = format!("{}/*", Pattern::escape(&dir.to_string_lossy()));
    let mut paths = Vec::new();
    for entry in glob(&pattern)? {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                log::warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !path.is_file() || extension_of(&path).is_none() {
            continue;
        }
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let in_grid = match &config.tile_grid {
            Some(grid) => grid.matches(name),
            None => true,
        };
        if in_grid {
            paths.push(path);
        } else {
            log::debug!("skipping {:?}, cell {:?} not in tile grid", path, parse_tile_prefix(name));
        }
    }
    paths.sort();
    Ok(paths)
}

/// Lists the point-cloud files in scope for `config`, non-ground before ground
/// in separated mode.
pub fn discover(config: &PipelineConfig) -> Result<Discovery> {
    let mode = resolve_mode(config);
    log::info!("processing mode: {} (requested {})", mode, config.mode);

    let files: Vec<TileFile> = match mode {
        ProcessingMode::Separated => {
            let non_ground = role_dir(&config.input_root, &config.non_ground_dir);
            let ground = role_dir(&config.input_root, &config.ground_dir);
            let mut files: Vec<TileFile> = list_dir(&non_ground, config)?
                .into_iter()
                .map(|path| TileFile {
                    path,
                    role: Some(PointRole::NonGround),
                })
                .collect();
            files.extend(list_dir(&ground, config)?.into_iter().map(|path| TileFile {
                path,
                role: Some(PointRole::Ground),
            }));
            files
        }
        _ => list_dir(&config.input_root, config)?
            .into_iter()
            .map(|path| TileFile { path, role: None })
            .collect(),
    };

    if files.is_empty() {
        return Err(PipelineError::NoInputFiles(config.input_root.clone()));
    }

    let paths: Vec<&Path> = files.iter().map(|f| f.path.as_path()).collect();
    let format = if check_and_get_extension(&paths)?.is_text() {
        InputFormat::TextCoordinates
    } else {
        InputFormat::PointCloud
    };

    for file in &files {
        log::debug!("input: {:?} ({:?})", file.path, file.role);
    }
    log::info!("found {} input files ({:?})", files.len(), format);

    Ok(Discovery {
        mode,
        format,
        files,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pcd_core::tile::TileGrid;

    use super::*;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn auto_mode_without_role_dirs_is_single() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("296000_6426000.las"));
        touch(&dir.path().join("295000_6425000.las"));
        touch(&dir.path().join("notes.txt.bak"));

        let config = PipelineConfig::new(dir.path(), dir.path().join("out.laz"));
        let discovery = discover(&config).unwrap();
        assert_eq!(discovery.mode, ProcessingMode::Single);
        assert_eq!(discovery.format, InputFormat::PointCloud);
        let names: Vec<&str> = discovery.files.iter().map(TileFile::file_name).collect();
        assert_eq!(names, vec!["295000_6425000.las", "296000_6426000.las"]);
    }

    #[test]
    fn auto_mode_detects_separated_layout_with_las_subdir() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Ground/LAS/295000_6425000_gnd.las"));
        touch(&dir.path().join("Non-Ground/LAS/295000_6425000_non-gnd.las"));
        touch(&dir.path().join("Non-Ground/LAS/296000_6425000_non-gnd.las"));

        let config = PipelineConfig::new(dir.path(), dir.path().join("out.laz"));
        let discovery = discover(&config).unwrap();
        assert_eq!(discovery.mode, ProcessingMode::Separated);
        assert_eq!(discovery.with_role(PointRole::NonGround).count(), 2);
        assert_eq!(discovery.with_role(PointRole::Ground).count(), 1);
        assert_eq!(discovery.files[0].role, Some(PointRole::NonGround));
    }

    #[test]
    fn tile_grid_filters_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Ground/295000_6425000.xyz"));
        touch(&dir.path().join("Ground/297000_6425000.xyz"));
        touch(&dir.path().join("Non-Ground/297000_6425000.xyz"));
        touch(&dir.path().join("Non-Ground/299000_6425000.xyz"));
        touch(&dir.path().join("Non-Ground/296000_6427000.xyz"));

        let grid = TileGrid::new(
            (295000, 297000),
            (6425000, 6428000),
            1000,
            vec!["297000_6425000".to_string()],
        )
        .unwrap();
        let config = PipelineConfig::new(dir.path(), dir.path().join("out.laz"))
            .with_mode(ProcessingMode::Separated)
            .with_tile_grid(grid);
        let discovery = discover(&config).unwrap();
        assert_eq!(discovery.format, InputFormat::TextCoordinates);
        let names: Vec<&str> = discovery.files.iter().map(TileFile::file_name).collect();
        assert_eq!(names, vec!["296000_6427000.xyz", "295000_6425000.xyz"]);
    }

    #[test]
    fn empty_directory_is_no_input() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::new(dir.path(), dir.path().join("out.laz"));
        assert!(matches!(
            discover(&config),
            Err(PipelineError::NoInputFiles(_))
        ));
    }

    #[test]
    fn forced_separated_mode_needs_role_dirs() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("295000_6425000.las"));
        let config = PipelineConfig::new(dir.path(), dir.path().join("out.laz"))
            .with_mode(ProcessingMode::Separated);
        assert!(matches!(
            discover(&config),
            Err(PipelineError::MissingDirectory(_))
        ));
    }

    #[test]
    fn mixed_formats_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("295000_6425000.las"));
        touch(&dir.path().join("296000_6425000.xyz"));
        let config = PipelineConfig::new(dir.path(), dir.path().join("out.laz"));
        assert!(matches!(discover(&config), Err(PipelineError::Parse(_))));
    }
}
