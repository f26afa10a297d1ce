use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    time::Instant,
};

use lol_html::{RewriteStrSettings, element, rewrite_str};
use tempfile::TempPath;
use tracing::debug;

use crate::{
    application::{
        markup::{collect_marked, mark_inner},
        render::types::{FormulaRenderer, RenderError, RenderedEmbeds, ensure_count},
    },
    domain::formula::FormulaBatch,
    util::process,
};

const DOCUMENT_PREAMBLE: &str =
    "\\documentclass{minimal}\\usepackage[utf8]{inputenc}\\begin{document}";
const DOCUMENT_END: &str = "\\end{document}";

/// Compiles the batch as one LaTeX document with `make4ht` and reads one
/// paragraph per formula back out of the generated HTML.
#[derive(Debug, Clone)]
pub(crate) struct BatchDocumentRenderer {
    cli_path: PathBuf,
}

impl BatchDocumentRenderer {
    pub(crate) fn new(cli_path: PathBuf) -> Self {
        Self { cli_path }
    }
}

impl FormulaRenderer for BatchDocumentRenderer {
    fn name(&self) -> &'static str {
        "make4ht"
    }

    fn render(
        &self,
        batch: &FormulaBatch,
        scratch_dir: &Path,
    ) -> Result<RenderedEmbeds, RenderError> {
        if batch.is_empty() {
            return Ok(RenderedEmbeds::default());
        }

        let started_at = Instant::now();
        let mut source = tempfile::Builder::new()
            .prefix("formulas-")
            .suffix(".tex")
            .tempfile_in(scratch_dir)
            .map_err(RenderError::Scratch)?;
        source
            .write_all(latex_document(batch).as_bytes())
            .map_err(RenderError::Scratch)?;
        source.flush().map_err(RenderError::Scratch)?;

        let file_name = source
            .path()
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| RenderError::parse("scratch file has no name"))?;
        let stem = source
            .path()
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_owned)
            .ok_or_else(|| RenderError::parse("scratch file name is not UTF-8"))?;

        let result = process::run_captured(
            &self.cli_path,
            Command::new(&self.cli_path)
                .arg("-u")
                .arg(&file_name)
                .arg("svg")
                .current_dir(scratch_dir)
                .stdin(Stdio::null()),
        );
        // Everything make4ht derived from the source lives and dies with the embeds.
        let artifacts = derived_artifacts(scratch_dir, &stem, source.path());
        drop(source);

        if let Err(err) = result {
            debug!(
                target = "cf2pdf::render::make4ht",
                op = "make4ht::render",
                result = "error",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                error = %err,
                "make4ht invocation failed"
            );
            return Err(err.into());
        }

        let html_path = scratch_dir.join(format!("{stem}.html"));
        let html = fs::read_to_string(&html_path).map_err(|source| RenderError::Output {
            path: html_path.clone(),
            source,
        })?;
        let embeds = paragraphs(&html)?;
        ensure_count(batch, embeds.len())?;

        debug!(
            target = "cf2pdf::render::make4ht",
            op = "make4ht::render",
            result = "ok",
            formulas = batch.len(),
            artifacts = artifacts.len(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Formulas rendered via make4ht"
        );

        Ok(RenderedEmbeds::with_artifacts(embeds, artifacts))
    }
}

/// One `$...$` paragraph per formula; blank lines separate paragraphs.
fn latex_document(batch: &FormulaBatch) -> String {
    let body = batch
        .iter()
        .map(|formula| format!("${}$", formula.content()))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{DOCUMENT_PREAMBLE}{body}{DOCUMENT_END}")
}

/// Files named after `stem` (`.html`, `.css`, `.4ct`, `*.svg`, ...), minus the
/// source itself which has its own guard.
fn derived_artifacts(scratch_dir: &Path, stem: &str, source: &Path) -> Vec<TempPath> {
    let Ok(entries) = fs::read_dir(scratch_dir) else {
        return Vec::new();
    };

    entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path != source)
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(stem))
        })
        .filter_map(|path| TempPath::try_from_path(path).ok())
        .collect()
}

fn paragraphs(html: &str) -> Result<Vec<String>, RenderError> {
    let rewritten = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("p", |el| {
                mark_inner(el);
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::parse(err.to_string()))?;

    Ok(collect_marked(&rewritten)
        .into_iter()
        .map(|paragraph| paragraph.trim().to_string())
        .collect())
}
