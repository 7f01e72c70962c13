use std::{collections::HashSet, path::Path};

use serde::Serialize;

use crate::{
    error::{PipelineError, Result},
    stage::Stage,
};

/// Only `JobBuilder::build` creates one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pipeline: Vec<Stage>,
}

impl Job {
    pub fn stages(&self) -> &[Stage] {
        &self.pipeline
    }

    pub fn count(&self, stage_type: &str) -> usize {
        self.pipeline
            .iter()
            .filter(|s| s.stage_type() == stage_type)
            .count()
    }

    pub fn reads(&self) -> impl Iterator<Item = &Stage> {
        self.pipeline
            .iter()
            .filter(|s| matches!(s, Stage::Read { .. }))
    }

    pub fn tags(&self) -> Vec<&str> {
        self.pipeline.iter().filter_map(Stage::tag).collect()
    }

    pub fn has_merge(&self) -> bool {
        self.pipeline
            .iter()
            .any(|s| matches!(s, Stage::Merge { .. }))
    }

    pub fn derives_height(&self) -> bool {
        self.pipeline
            .iter()
            .any(|s| matches!(s, Stage::DeriveHeight { .. }))
    }

    pub fn is_streamable(&self) -> bool {
        !self.derives_height()
    }

    pub fn output(&self) -> &Path {
        match self.pipeline.last() {
            Some(Stage::Write { filename, .. }) | Some(Stage::WriteCopc { filename }) => filename,
            // unreachable for built jobs
            _ => Path::new(""),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Default)]
pub struct JobBuilder {
    stages: Vec<Stage>,
}

impl JobBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn extend(mut self, stages: impl IntoIterator<Item = Stage>) -> Self {
        self.stages.extend(stages);
        self
    }

    pub fn build(self) -> Result<Job> {
        let invalid = |msg: String| Err(PipelineError::InvalidJob(msg));

        if !self.stages.iter().any(|s| matches!(s, Stage::Read { .. })) {
            return invalid("job has no reader".to_string());
        }

        let mut tags = HashSet::new();
        for stage in &self.stages {
            if let Stage::Merge { inputs } = stage {
                for input in inputs {
                    if !tags.contains(input.as_str()) {
                        return invalid(format!("merge input {input:?} does not name an earlier stage"));
                    }
                }
            }
            if let Some(tag) = stage.tag() {
                if !tags.insert(tag) {
                    return invalid(format!("duplicate tag {tag:?}"));
                }
            }
        }

        let writers = self.stages.iter().filter(|s| s.is_writer()).count();
        if writers != 1 {
            return invalid(format!("expected exactly one writer, found {writers}"));
        }
        if !self.stages.last().is_some_and(Stage::is_writer) {
            return invalid("writer must be the last stage".to_string());
        }

        Ok(Job {
            pipeline: self.stages,
        })
    }
}
