use std::{io, path::PathBuf};

use thiserror::Error;

use crate::{
    application::{
        ports::{FetchError, PdfError},
        statement::StatementError,
    },
    config::LoadError,
    domain::error::DomainError,
    infra::error::InfraError,
};

/// Every way a conversion can fail. Any of these ends the run with status 1.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Statement(#[from] StatementError),
    #[error("failed to build PDF: {0}")]
    Pdf(#[from] PdfError),
    #[error("failed to create output directory {}: {source}", path.display())]
    OutputDir { path: PathBuf, source: io::Error },
    #[error("failed to prepare scratch directory {}: {source}", path.display())]
    Scratch { path: PathBuf, source: io::Error },
}
