use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use crate::{
    config::Compression,
    error::{PipelineError, Result},
    job::{Job, JobBuilder},
    runner::{run_job, ExecutionReport, Executor},
    stage::Stage,
};

/// Merges files one at a time. The output is only written by a final rename.
pub struct IncrementalMerge {
    output: PathBuf,
    compression: Option<Compression>,
    streaming: bool,
}

impl IncrementalMerge {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            compression: Some(Compression::Laszip),
            streaming: true,
        }
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    fn writer(&self, filename: &Path) -> Stage {
        Stage::Write {
            filename: filename.to_path_buf(),
            compression: self.compression,
            extra_dims: None,
        }
    }

    pub fn plan(&self, files: &[PathBuf], work_dir: &Path) -> Result<Vec<Job>> {
        let (first, rest) = files
            .split_first()
            .ok_or_else(|| PipelineError::NoInputFiles(work_dir.to_path_buf()))?;

        let mut current = work_dir.join("step_0.laz");
        let mut jobs = vec![JobBuilder::new()
            .push(Stage::read_las(first))
            .push(self.writer(&current))
            .build()?];

        for (i, file) in rest.iter().enumerate() {
            let next = work_dir.join(format!("step_{}.laz", i + 1));
            jobs.push(
                JobBuilder::new()
                    .push(Stage::read_las(&current))
                    .push(Stage::read_las(file))
                    .push(Stage::Merge { inputs: vec![] })
                    .push(self.writer(&next))
                    .build()?,
            );
            current = next;
        }
        Ok(jobs)
    }

    pub fn run(&self, executor: &dyn Executor, files: &[PathBuf]) -> Result<ExecutionReport> {
        let parent = match self.output.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;
        // same filesystem as the output, so the final rename is atomic
        let work_dir = tempfile::Builder::new()
            .prefix(".incremental-merge-")
            .tempdir_in(&parent)?;

        let jobs = self.plan(files, work_dir.path())?;
        let start = Instant::now();
        let mut point_count = 0;
        let mut previous: Option<&Path> = None;

        for (i, job) in jobs.iter().enumerate() {
            log::info!("merge step {}/{}: {:?}", i + 1, jobs.len(), files[i]);
            point_count = run_job(executor, job, self.streaming)?.point_count;
            if let Some(previous) = previous {
                fs::remove_file(previous)?;
            }
            previous = Some(job.output());
        }

        if let Some(finished) = previous {
            fs::rename(finished, &self.output)?;
        }
        log::info!(
            "incremental merge of {} files complete: {:?}",
            files.len(),
            self.output
        );

        Ok(ExecutionReport {
            point_count,
            elapsed: start.elapsed(),
        })
    }
}
