use std::{
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    time::Instant,
};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::{
    application::render::types::{FormulaRenderer, RenderError, RenderedEmbeds, ensure_count},
    domain::formula::{Formula, FormulaBatch},
    util::process,
};

/// Renders every formula to its own SVG with `tex2svg`, one process per
/// formula, all running at once.
///
/// Processes are awaited in submission order and the first failure fails the
/// batch. Siblings are never killed; they are still awaited so that no child
/// outlives the call.
#[derive(Debug, Clone)]
pub(crate) struct SvgRenderer {
    cli_path: PathBuf,
}

impl SvgRenderer {
    pub(crate) fn new(cli_path: PathBuf) -> Self {
        Self { cli_path }
    }

    fn spawn_one(&self, formula: &Formula, output: &NamedTempFile) -> Result<Child, RenderError> {
        let stdout = output.reopen().map_err(RenderError::Scratch)?;
        let mut command = Command::new(&self.cli_path);
        if formula.is_inline() {
            command.arg("--inline");
        }
        command
            .arg(format!(" {}", formula.content()))
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::piped());
        Ok(process::spawn(&self.cli_path, &mut command)?)
    }
}

impl FormulaRenderer for SvgRenderer {
    fn name(&self) -> &'static str {
        "tex2svg"
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
        let outputs = batch
            .iter()
            .map(|_| {
                tempfile::Builder::new()
                    .prefix("formula-")
                    .suffix(".svg")
                    .tempfile_in(scratch_dir)
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(RenderError::Scratch)?;

        let mut children = Vec::with_capacity(outputs.len());
        let mut failure: Option<RenderError> = None;
        for (formula, output) in batch.iter().zip(&outputs) {
            match self.spawn_one(formula, output) {
                Ok(child) => children.push(child),
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        for child in children {
            let outcome = process::wait(&self.cli_path, child);
            if failure.is_none() {
                failure = outcome.err().map(RenderError::from);
            }
        }

        if let Some(err) = failure {
            debug!(
                target = "cf2pdf::render::tex2svg",
                op = "tex2svg::render",
                result = "error",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                exit_code = exit_code_of(&err),
                error = %err,
                "tex2svg invocation failed"
            );
            return Err(err);
        }

        let embeds = outputs
            .iter()
            .map(|output| image_embed(output.path()))
            .collect::<Result<Vec<_>, _>>()?;
        ensure_count(batch, embeds.len())?;

        debug!(
            target = "cf2pdf::render::tex2svg",
            op = "tex2svg::render",
            result = "ok",
            formulas = batch.len(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Formulas rendered via tex2svg"
        );

        let artifacts = outputs
            .into_iter()
            .map(NamedTempFile::into_temp_path)
            .collect();
        Ok(RenderedEmbeds::with_artifacts(embeds, artifacts))
    }
}

/// Images are referenced by file name; the PDF builder resolves them against
/// the scratch directory.
fn image_embed(svg: &Path) -> Result<String, RenderError> {
    let name = svg
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| RenderError::parse("SVG file name is not UTF-8"))?;
    Ok(format!(r#"<img src="{name}" align="middle" />"#))
}

fn exit_code_of(err: &RenderError) -> i64 {
    match err {
        RenderError::Tool(tool) => tool.exit_code().map(i64::from).unwrap_or(-1),
        _ => -1,
    }
}
