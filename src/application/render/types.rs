use std::{
    io,
    path::{Path, PathBuf},
};

use tempfile::TempPath;
use thiserror::Error;

use crate::{domain::formula::FormulaBatch, util::process::ToolError};

/// Why a batch could not be rendered. Never fatal: callers fall back to the
/// unrendered markup.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to prepare scratch file: {0}")]
    Scratch(#[source] io::Error),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("failed to read renderer output {}: {source}", path.display())]
    Output { path: PathBuf, source: io::Error },
    #[error("failed to parse renderer output: {message}")]
    Parse { message: String },
    #[error("renderer produced {produced} embeds for {expected} formulas")]
    CountMismatch { expected: usize, produced: usize },
}

impl RenderError {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }
}

/// Embeds produced for a batch, in batch order, together with any files they
/// reference. The files are deleted when this value is dropped.
#[derive(Debug, Default)]
pub struct RenderedEmbeds {
    embeds: Vec<String>,
    artifacts: Vec<TempPath>,
}

impl RenderedEmbeds {
    pub fn new(embeds: Vec<String>) -> Self {
        Self {
            embeds,
            artifacts: Vec::new(),
        }
    }

    pub fn with_artifacts(embeds: Vec<String>, artifacts: Vec<TempPath>) -> Self {
        Self { embeds, artifacts }
    }

    pub fn embeds(&self) -> &[String] {
        &self.embeds
    }

    pub fn len(&self) -> usize {
        self.embeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeds.is_empty()
    }

    pub fn into_parts(self) -> (Vec<String>, RenderArtifacts) {
        (self.embeds, RenderArtifacts(self.artifacts))
    }
}

/// Files backing rendered embeds; they must outlive the PDF build.
#[derive(Debug, Default)]
pub struct RenderArtifacts(Vec<TempPath>);

impl RenderArtifacts {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One way of turning a formula batch into embeds.
///
/// On success exactly `batch.len()` embeds are returned in batch order.
/// Temporary files are created under `scratch_dir` only.
pub trait FormulaRenderer: Send + Sync {
    fn name(&self) -> &'static str;

    fn render(&self, batch: &FormulaBatch, scratch_dir: &Path)
    -> Result<RenderedEmbeds, RenderError>;
}

pub(crate) fn ensure_count(batch: &FormulaBatch, produced: usize) -> Result<(), RenderError> {
    if produced != batch.len() {
        return Err(RenderError::CountMismatch {
            expected: batch.len(),
            produced,
        });
    }
    Ok(())
}
