use std::path::Path;

use crate::{
    config::{PipelineConfig, ProcessingMode},
    discover::{Discovery, InputFormat, PointRole, TileFile},
    error::{PipelineError, Result},
    job::{Job, JobBuilder},
    stage::Stage,
};

pub trait PipelineBuilder {
    fn build(&self, discovery: &Discovery, config: &PipelineConfig) -> Result<Job>;
}

fn read_stage(file: &TileFile, format: InputFormat, config: &PipelineConfig, tag: Option<String>) -> Stage {
    Stage::Read {
        filename: file.path.clone(),
        tag,
        text: match format {
            InputFormat::TextCoordinates => Some(config.text_reader.clone()),
            InputFormat::PointCloud => None,
        },
    }
}

pub struct SingleDirectoryBuilder;

impl PipelineBuilder for SingleDirectoryBuilder {
    fn build(&self, discovery: &Discovery, config: &PipelineConfig) -> Result<Job> {
        let mut job = JobBuilder::new();
        for file in &discovery.files {
            job = job.push(read_stage(file, discovery.format, config, None));
        }
        if discovery.files.len() > 1 {
            job = job.push(Stage::Merge { inputs: vec![] });
        }
        job.push(Stage::Write {
            filename: config.output.clone(),
            compression: config.compression,
            extra_dims: None,
        })
        .build()
    }
}

pub struct SeparatedBuilder;

impl PipelineBuilder for SeparatedBuilder {
    fn build(&self, discovery: &Discovery, config: &PipelineConfig) -> Result<Job> {
        let mut job = JobBuilder::new();
        let mut inputs = Vec::new();

        for (i, file) in discovery.with_role(PointRole::NonGround).enumerate() {
            let tag = generate_tag("ng", i);
            job = job
                .push(read_stage(file, discovery.format, config, None))
                .push(Stage::Reclassify {
                    class_code: config.non_ground_class,
                    tag: Some(tag.clone()),
                });
            inputs.push(tag);
        }

        for (i, file) in discovery.with_role(PointRole::Ground).enumerate() {
            let tag = generate_tag("g", i);
            job = match discovery.format {
                // text deliveries carry no classification of their own
                InputFormat::TextCoordinates => job
                    .push(read_stage(file, discovery.format, config, None))
                    .push(Stage::Reclassify {
                        class_code: config.ground_class,
                        tag: Some(tag.clone()),
                    }),
                InputFormat::PointCloud => {
                    job.push(read_stage(file, discovery.format, config, Some(tag.clone())))
                }
            };
            inputs.push(tag);
        }

        if inputs.len() != discovery.files.len() {
            return Err(PipelineError::InvalidJob(format!(
                "{} of {} files carry a ground/non-ground role",
                inputs.len(),
                discovery.files.len()
            )));
        }

        if inputs.len() > 1 {
            job = job.push(Stage::Merge { inputs });
        }

        job.push(Stage::DeriveHeight {
            method: config.hag_method,
        })
        .push(Stage::write_with_hag(&config.output, config.compression))
        .build()
    }
}

fn generate_tag(prefix: &str, index: usize) -> String {
    format!("{}_{}", prefix, index + 1)
}

pub fn builder_for(mode: ProcessingMode) -> Box<dyn PipelineBuilder> {
    match mode {
        ProcessingMode::Separated => Box::new(SeparatedBuilder),
        ProcessingMode::Single | ProcessingMode::Auto => Box::new(SingleDirectoryBuilder),
    }
}

pub fn assemble(discovery: &Discovery, config: &PipelineConfig) -> Result<Job> {
    if discovery.files.is_empty() {
        return Err(PipelineError::NoInputFiles(config.input_root.clone()));
    }
    let job = builder_for(discovery.mode).build(discovery, config)?;
    log::info!(
        "assembled job: {} stages, {} readers, merge: {}, height above ground: {}",
        job.stages().len(),
        job.reads().count(),
        job.has_merge(),
        job.derives_height()
    );
    Ok(job)
}

/// Follow-up job writing a spatially indexed copy of a combined cloud.
pub fn copc_job(combined: &Path, copc_output: &Path) -> Result<Job> {
    JobBuilder::new()
        .push(Stage::read_las(combined))
        .push(Stage::WriteCopc {
            filename: copc_output.to_path_buf(),
        })
        .build()
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, path::PathBuf};

    use super::*;

    fn single(names: &[&str]) -> Discovery {
        Discovery {
            mode: ProcessingMode::Single,
            format: InputFormat::PointCloud,
            files: names
                .iter()
                .map(|n| TileFile {
                    path: PathBuf::from("input/rehab").join(n),
                    role: None,
                })
                .collect(),
        }
    }

    fn separated(non_ground: usize, ground: usize, format: InputFormat) -> Discovery {
        let ext = match format {
            InputFormat::PointCloud => "las",
            InputFormat::TextCoordinates => "xyz",
        };
        let mut files = Vec::new();
        for i in 0..non_ground {
            files.push(TileFile {
                path: PathBuf::from(format!("Non-Ground/29{i}000_6425000_non-gnd.{ext}")),
                role: Some(PointRole::NonGround),
            });
        }
        for i in 0..ground {
            files.push(TileFile {
                path: PathBuf::from(format!("Ground/29{i}000_6425000_gnd.{ext}")),
                role: Some(PointRole::Ground),
            });
        }
        Discovery {
            mode: ProcessingMode::Separated,
            format,
            files,
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig::new("input/rehab", "output/lidar_combined.laz")
    }

    #[test]
    fn single_mode_two_files() {
        let discovery = single(&["295000_6425000.las", "296000_6426000.las"]);
        let job = assemble(&discovery, &config()).unwrap();
        assert_eq!(job.count("readers.las"), 2);
        assert_eq!(job.count("filters.merge"), 1);
        assert_eq!(job.count("writers.las"), 1);
        assert_eq!(job.count("filters.assign"), 0);
        assert!(!job.derives_height());
        assert_eq!(job.stages().len(), 4);
    }

    #[test]
    fn single_mode_one_file_has_no_merge() {
        let job = assemble(&single(&["295000_6425000.las"]), &config()).unwrap();
        assert_eq!(job.count("readers.las"), 1);
        assert!(!job.has_merge());
        assert_eq!(job.stages().len(), 2);
    }

    #[test]
    fn single_mode_writer_requests_compression() {
        let job = assemble(&single(&["a.las", "b.las", "c.las"]), &config()).unwrap();
        let value = serde_json::to_value(&job).unwrap();
        let last = value["pipeline"].as_array().unwrap().last().unwrap().clone();
        assert_eq!(last["type"], "writers.las");
        assert_eq!(last["filename"], "output/lidar_combined.laz");
        assert_eq!(last["compression"], "laszip");
        assert!(last.get("extra_dims").is_none());
        assert_eq!(job.reads().count(), 3);
    }

    #[test]
    fn separated_las_tags_every_file_once() {
        let discovery = separated(2, 3, InputFormat::PointCloud);
        let job = assemble(&discovery, &config()).unwrap();

        let tags = job.tags();
        assert_eq!(tags.len(), 5);
        assert_eq!(tags.iter().collect::<HashSet<_>>().len(), 5);
        assert_eq!(tags, vec!["ng_1", "ng_2", "g_1", "g_2", "g_3"]);

        // only non-ground LAS files are reclassified
        assert_eq!(job.count("filters.assign"), 2);
        assert!(job.stages().iter().all(|s| match s {
            Stage::Reclassify { class_code, .. } => *class_code == 4,
            _ => true,
        }));

        match &job.stages()[job.stages().len() - 3] {
            Stage::Merge { inputs } => assert_eq!(inputs.len(), 5),
            other => panic!("expected merge, got {other:?}"),
        }
        assert!(matches!(
            job.stages()[job.stages().len() - 2],
            Stage::DeriveHeight { .. }
        ));
        let value = serde_json::to_value(job.stages().last().unwrap()).unwrap();
        assert_eq!(value["extra_dims"], "HeightAboveGround=float64");
    }

    #[test]
    fn separated_text_reclassifies_ground_too() {
        let discovery = separated(1, 2, InputFormat::TextCoordinates);
        let job = assemble(&discovery, &config()).unwrap();
        assert_eq!(job.count("readers.text"), 3);
        assert_eq!(job.count("filters.assign"), 3);
        let ground_codes: Vec<u8> = job
            .stages()
            .iter()
            .filter_map(|s| match s {
                Stage::Reclassify {
                    class_code,
                    tag: Some(tag),
                } if tag.starts_with("g_") => Some(*class_code),
                _ => None,
            })
            .collect();
        assert_eq!(ground_codes, vec![2, 2]);
        // tags sit on the assign stages, readers stay untagged
        assert!(job.reads().all(|s| s.tag().is_none()));
    }

    #[test]
    fn separated_single_file_skips_merge_but_derives_height() {
        let discovery = separated(0, 1, InputFormat::PointCloud);
        let job = assemble(&discovery, &config()).unwrap();
        assert!(!job.has_merge());
        assert!(job.derives_height());
        assert!(!job.is_streamable());
    }

    #[test]
    fn unassigned_roles_are_rejected_in_separated_mode() {
        let mut discovery = separated(1, 1, InputFormat::PointCloud);
        discovery.files[0].role = None;
        assert!(assemble(&discovery, &config()).is_err());
    }

    #[test]
    fn empty_discovery_short_circuits() {
        let discovery = single(&[]);
        assert!(matches!(
            assemble(&discovery, &config()),
            Err(PipelineError::NoInputFiles(_))
        ));
    }

    #[test]
    fn copc_job_reads_combined_output() {
        let job = copc_job(
            Path::new("output/2025_03_combined.laz"),
            Path::new("output/2025_03_combined.copc.laz"),
        )
        .unwrap();
        assert_eq!(job.count("readers.las"), 1);
        assert_eq!(job.count("writers.copc"), 1);
        assert_eq!(job.output(), Path::new("output/2025_03_combined.copc.laz"));
    }
}
