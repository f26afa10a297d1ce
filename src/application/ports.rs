//! Seams between the conversion pipeline and the outside world.

use std::{io, path::PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    domain::{problem::ProblemRef, types::RenderMode},
    util::process::ToolError,
};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid problem URL `{url}`: {message}")]
    InvalidUrl { url: String, message: String },
    #[error("failed to reach {url}: {message}")]
    Connection { url: String, message: String },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("failed to read the body of {url}: {message}")]
    Body { url: String, message: String },
}

/// Where problem pages come from.
#[async_trait]
pub trait ProblemPageSource: Send + Sync {
    /// Return the full HTML of the problem page. Any non-2xx answer is an error.
    async fn fetch_page(&self, problem: &ProblemRef) -> Result<String, FetchError>;
}

#[derive(Debug, Error)]
pub enum PdfError {
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("failed to prepare PDF input: {0}")]
    Scratch(#[source] io::Error),
    #[error("PDF builder exited successfully but {} was not written", path.display())]
    MissingOutput { path: PathBuf },
}

/// Everything needed to lay out one statement as a PDF.
#[derive(Debug, Clone)]
pub struct PdfJob {
    /// Statement fragment with formulas already spliced in.
    pub html: String,
    /// Directory relative resources (formula images) are resolved against.
    pub base_dir: PathBuf,
    pub output_path: PathBuf,
    pub mode: RenderMode,
}

pub trait PdfBuilder: Send + Sync {
    fn build(&self, job: &PdfJob) -> Result<(), PdfError>;
}
