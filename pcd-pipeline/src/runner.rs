use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    time::{Duration, Instant},
};

use serde::Deserialize;

use crate::{
    error::{PipelineError, Result},
    job::Job,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOptions {
    /// Run chunk by chunk instead of loading every point.
    pub streaming: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    pub point_count: u64,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PointSummary {
    pub num_points: u64,
    #[serde(default)]
    pub density: Option<f64>,
}

pub trait Executor {
    fn execute(&self, job: &Job, options: &ExecOptions) -> Result<u64>;

    fn summary(&self, path: &Path) -> Result<PointSummary>;
}

/// Runs jobs through the `pdal` command line tool.
pub struct PdalCli {
    program: PathBuf,
}

impl Default for PdalCli {
    fn default() -> Self {
        Self::new("pdal")
    }
}

impl PdalCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, args: &[&str], stdin: Option<&[u8]>) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input)?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(PipelineError::Engine {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

impl Executor for PdalCli {
    fn execute(&self, job: &Job, options: &ExecOptions) -> Result<u64> {
        if let Some(parent) = job.output().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = job.to_json_pretty()?;
        let mut args = vec!["pipeline", "--stdin"];
        if options.streaming {
            args.push("--stream");
        }
        self.run(&args, Some(json.as_bytes()))?;

        Ok(self.summary(job.output())?.num_points)
    }

    fn summary(&self, path: &Path) -> Result<PointSummary> {
        let path = path.to_string_lossy();
        let stdout = self.run(&["info", "--summary", &path], None)?;
        parse_summary(&stdout)
    }
}

#[derive(Deserialize)]
struct InfoOutput {
    summary: PointSummary,
}

pub fn parse_summary(stdout: &[u8]) -> Result<PointSummary> {
    let info: InfoOutput = serde_json::from_slice(stdout)
        .map_err(|e| PipelineError::EngineOutput(format!("no usable summary: {e}")))?;
    Ok(info.summary)
}

pub fn run_job(executor: &dyn Executor, job: &Job, streaming: bool) -> Result<ExecutionReport> {
    let options = ExecOptions {
        streaming: streaming && job.is_streamable(),
    };
    if streaming && !options.streaming {
        log::info!("job derives height above ground, running without streaming");
    }

    log::info!(
        "start processing: {} stages -> {:?} (streaming: {})",
        job.stages().len(),
        job.output(),
        options.streaming
    );
    let start = Instant::now();
    let point_count = executor.execute(job, &options)?;
    let elapsed = start.elapsed();
    log::info!(
        "finish processing: {} points written to {:?} in {:?}",
        point_count,
        job.output(),
        elapsed
    );

    Ok(ExecutionReport {
        point_count,
        elapsed,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spacing {
    pub density: f64,
    /// Nominal distance between points, rounded to centimetres.
    pub spacing: f64,
}

impl Spacing {
    pub fn from_density(density: f64) -> Result<Self> {
        if !(density.is_finite() && density > 0.0) {
            return Err(PipelineError::EngineOutput(format!(
                "point density must be positive, got {density}"
            )));
        }
        let spacing = (1.0 / density.sqrt() * 100.0).round() / 100.0;
        Ok(Self { density, spacing })
    }
}

pub fn point_spacing(executor: &dyn Executor, path: &Path) -> Result<Spacing> {
    let summary = executor.summary(path)?;
    let density = summary
        .density
        .ok_or_else(|| PipelineError::EngineOutput(format!("no density reported for {path:?}")))?;
    let spacing = Spacing::from_density(density)?;
    log::info!(
        "{:?}: {:.2} points per m², nominal spacing {:.2} m",
        path,
        spacing.density,
        spacing.spacing
    );
    Ok(spacing)
}
