//! The conversion pipeline: fetch, select, render formulas, build the PDF.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use tracing::{debug, info, warn};

use crate::{
    application::{
        error::AppError,
        formulas,
        ports::{PdfBuilder, PdfJob, ProblemPageSource},
        render::{FormulaRenderer, RenderArtifacts},
        statement::extract_statement,
    },
    domain::{problem::ProblemRef, types::RenderMode},
};

/// Statement markup after formula rendering, plus the files its embeds point at.
#[derive(Debug)]
pub struct FormulaRendering {
    pub html: String,
    /// False only when the renderer failed and the markup was kept as it was.
    pub rendered: bool,
    pub artifacts: RenderArtifacts,
}

impl FormulaRendering {
    fn unchanged(html: &str, rendered: bool) -> Self {
        Self {
            html: html.to_string(),
            rendered,
            artifacts: RenderArtifacts::default(),
        }
    }
}

/// Render every formula in `html` and splice the embeds back.
///
/// Never fails: when the renderer errors or returns the wrong number of
/// embeds, a warning is logged and the markup comes back byte-identical.
pub fn render_formulas(
    html: &str,
    renderer: &dyn FormulaRenderer,
    scratch_dir: &Path,
) -> FormulaRendering {
    let batch = formulas::extract(html);
    if batch.is_empty() {
        return FormulaRendering::unchanged(html, true);
    }

    debug!(
        target = "cf2pdf::convert",
        op = "render_formulas",
        strategy = renderer.name(),
        formulas = batch.len(),
        "Rendering formulas"
    );

    let rendered = match renderer.render(&batch, scratch_dir) {
        Ok(rendered) => rendered,
        Err(err) => {
            warn!(
                target = "cf2pdf::convert",
                op = "render_formulas",
                strategy = renderer.name(),
                error = %err,
                "Couldn't render formulas with {}, keeping raw LaTeX",
                renderer.name()
            );
            return FormulaRendering::unchanged(html, false);
        }
    };

    let (embeds, artifacts) = rendered.into_parts();
    let embeds = match batch.pair_with(embeds) {
        Ok(embeds) => embeds,
        Err(err) => {
            warn!(
                target = "cf2pdf::convert",
                op = "render_formulas",
                strategy = renderer.name(),
                error = %err,
                "Couldn't render formulas with {}, keeping raw LaTeX",
                renderer.name()
            );
            return FormulaRendering::unchanged(html, false);
        }
    };

    FormulaRendering {
        html: formulas::splice(html, &embeds),
        rendered: true,
        artifacts,
    }
}

/// Runs one problem through the whole pipeline.
pub struct ConversionService {
    source: Arc<dyn ProblemPageSource>,
    renderer: Arc<dyn FormulaRenderer>,
    pdf: Arc<dyn PdfBuilder>,
    mode: RenderMode,
    scratch_dir: PathBuf,
}

impl ConversionService {
    pub fn new(
        source: Arc<dyn ProblemPageSource>,
        renderer: Arc<dyn FormulaRenderer>,
        pdf: Arc<dyn PdfBuilder>,
        mode: RenderMode,
        scratch_dir: PathBuf,
    ) -> Self {
        Self {
            source,
            renderer,
            pdf,
            mode,
            scratch_dir,
        }
    }

    /// Convert `problem` and return the path of the written PDF.
    pub async fn convert(
        &self,
        problem: &ProblemRef,
        output_dir: &Path,
    ) -> Result<PathBuf, AppError> {
        let started_at = Instant::now();

        debug!(
            target = "cf2pdf::convert",
            op = "fetch",
            problem = %problem,
            "Fetching problem page"
        );
        let page = self.source.fetch_page(problem).await?;
        info!(target = "cf2pdf::convert", op = "fetch", problem = %problem, "fetched");

        let statement = extract_statement(&page)?;

        fs::create_dir_all(output_dir).map_err(|source| AppError::OutputDir {
            path: output_dir.to_path_buf(),
            source,
        })?;
        fs::create_dir_all(&self.scratch_dir).map_err(|source| AppError::Scratch {
            path: self.scratch_dir.clone(),
            source,
        })?;
        let scratch = tempfile::Builder::new()
            .prefix("cf2pdf-")
            .tempdir_in(&self.scratch_dir)
            .map_err(|source| AppError::Scratch {
                path: self.scratch_dir.clone(),
                source,
            })?;

        let rendering = render_formulas(&statement, self.renderer.as_ref(), scratch.path());
        if rendering.rendered {
            info!(
                target = "cf2pdf::convert",
                op = "render_formulas",
                strategy = self.renderer.name(),
                artifacts = rendering.artifacts.len(),
                "rendered latex"
            );
        }

        let output_path = output_dir.join(problem.pdf_file_name());
        debug!(
            target = "cf2pdf::convert",
            op = "build_pdf",
            output = %output_path.display(),
            "Building PDF"
        );
        self.pdf.build(&PdfJob {
            html: rendering.html,
            base_dir: scratch.path().to_path_buf(),
            output_path: output_path.clone(),
            mode: self.mode,
        })?;
        drop(rendering.artifacts);

        info!(
            target = "cf2pdf::convert",
            op = "convert",
            output = %output_path.display(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "done"
        );
        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{
        ports::{FetchError, PdfError},
        render::{RenderError, RenderedEmbeds},
        statement::StatementError,
    };
    use crate::domain::formula::FormulaBatch;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Wraps every formula as `[i:content]` / `[d:content]`.
    struct Bracketing;

    impl FormulaRenderer for Bracketing {
        fn name(&self) -> &'static str {
            "bracketing"
        }

        fn render(
            &self,
            batch: &FormulaBatch,
            _scratch_dir: &Path,
        ) -> Result<RenderedEmbeds, RenderError> {
            Ok(RenderedEmbeds::new(
                batch
                    .iter()
                    .map(|formula| {
                        let kind = if formula.is_inline() { 'i' } else { 'd' };
                        format!("[{kind}:{}]", formula.content())
                    })
                    .collect(),
            ))
        }
    }

    struct ShortCounting;

    impl FormulaRenderer for ShortCounting {
        fn name(&self) -> &'static str {
            "short"
        }

        fn render(
            &self,
            _batch: &FormulaBatch,
            _scratch_dir: &Path,
        ) -> Result<RenderedEmbeds, RenderError> {
            Ok(RenderedEmbeds::new(vec!["only one".to_string()]))
        }
    }

    struct Failing;

    impl FormulaRenderer for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn render(
            &self,
            _batch: &FormulaBatch,
            _scratch_dir: &Path,
        ) -> Result<RenderedEmbeds, RenderError> {
            Err(RenderError::parse("boom"))
        }
    }

    /// Panics when called; proves the renderer is skipped.
    struct Unreachable;

    impl FormulaRenderer for Unreachable {
        fn name(&self) -> &'static str {
            "unreachable"
        }

        fn render(
            &self,
            _batch: &FormulaBatch,
            _scratch_dir: &Path,
        ) -> Result<RenderedEmbeds, RenderError> {
            panic!("renderer must not be called without formulas")
        }
    }

    #[test]
    fn splices_inline_and_display_embeds() {
        let scratch = TempDir::new().expect("scratch");
        let html = "<p>Let $$$n$$$ be given.</p><p>$$$$$$x^2$$$$$$</p>";

        let rendering = render_formulas(html, &Bracketing, scratch.path());
        assert_eq!(
            rendering.html,
            r#"<p>Let [i:n] be given.</p><p><div style="text-align:center;">[d:x^2]</div></p>"#
        );
        assert!(rendering.rendered);
    }

    #[test]
    fn markup_without_formulas_skips_renderer() {
        let scratch = TempDir::new().expect("scratch");
        let html = "<p>No math, $5 only.</p>";

        let rendering = render_formulas(html, &Unreachable, scratch.path());
        assert_eq!(rendering.html, html);
        assert!(rendering.rendered);
    }

    #[test]
    fn count_mismatch_keeps_markup_byte_identical() {
        let scratch = TempDir::new().expect("scratch");
        let html = "<p>a $$$x$$$ and $$$y$$$</p>";

        let rendering = render_formulas(html, &ShortCounting, scratch.path());
        assert_eq!(rendering.html, html);
        assert!(!rendering.rendered);
    }

    #[test]
    fn renderer_failure_keeps_markup_byte_identical() {
        let scratch = TempDir::new().expect("scratch");
        let html = "<p>a $$$x$$$</p>";

        let rendering = render_formulas(html, &Failing, scratch.path());
        assert_eq!(rendering.html, html);
        assert!(!rendering.rendered);
    }

    struct StaticPage(Result<String, u16>);

    #[async_trait]
    impl ProblemPageSource for StaticPage {
        async fn fetch_page(&self, problem: &ProblemRef) -> Result<String, FetchError> {
            self.0.clone().map_err(|status| FetchError::Status {
                url: problem.page_path(),
                status,
            })
        }
    }

    #[derive(Default)]
    struct RecordingPdf {
        jobs: Mutex<Vec<PdfJob>>,
    }

    impl PdfBuilder for RecordingPdf {
        fn build(&self, job: &PdfJob) -> Result<(), PdfError> {
            fs::write(&job.output_path, b"%PDF").map_err(PdfError::Scratch)?;
            self.jobs.lock().expect("jobs lock").push(job.clone());
            Ok(())
        }
    }

    fn service(
        page: Result<String, u16>,
        pdf: Arc<RecordingPdf>,
        scratch_dir: PathBuf,
    ) -> ConversionService {
        ConversionService::new(
            Arc::new(StaticPage(page)),
            Arc::new(Bracketing),
            pdf,
            RenderMode::Graphics,
            scratch_dir,
        )
    }

    #[tokio::test]
    async fn converts_statement_into_pdf() {
        let dir = TempDir::new().expect("temp dir");
        let pdf = Arc::new(RecordingPdf::default());
        let page = r#"<div class="problemindexholder"><p>Given $$$n$$$.</p></div>"#;
        let service = service(Ok(page.to_string()), Arc::clone(&pdf), dir.path().join(".cache"));
        let problem = ProblemRef::new(1900, "A").expect("problem");

        let output = service
            .convert(&problem, &dir.path().join("out"))
            .await
            .expect("converted");

        assert_eq!(output, dir.path().join("out").join("1900A.pdf"));
        assert!(output.exists());
        let jobs = pdf.jobs.lock().expect("jobs lock");
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].html, "<p>Given [i:n].</p>");
        assert_eq!(jobs[0].mode, RenderMode::Graphics);
        assert!(
            !jobs[0].base_dir.exists(),
            "per-conversion scratch directory should be removed"
        );
    }

    #[tokio::test]
    async fn http_error_is_fatal_and_creates_nothing() {
        let dir = TempDir::new().expect("temp dir");
        let pdf = Arc::new(RecordingPdf::default());
        let service = service(Err(404), Arc::clone(&pdf), dir.path().join(".cache"));
        let problem = ProblemRef::new(1, "Z").expect("problem");

        let err = service
            .convert(&problem, &dir.path().join("out"))
            .await
            .expect_err("404 is fatal");

        assert!(matches!(err, AppError::Fetch(FetchError::Status { status: 404, .. })));
        assert!(!dir.path().join("out").exists());
        assert!(pdf.jobs.lock().expect("jobs lock").is_empty());
    }

    #[tokio::test]
    async fn missing_statement_is_fatal() {
        let dir = TempDir::new().expect("temp dir");
        let pdf = Arc::new(RecordingPdf::default());
        let service = service(
            Ok("<html><body>Not found</body></html>".to_string()),
            Arc::clone(&pdf),
            dir.path().join(".cache"),
        );
        let problem = ProblemRef::new(1, "A").expect("problem");

        let err = service
            .convert(&problem, dir.path())
            .await
            .expect_err("no statement");

        assert!(matches!(
            err,
            AppError::Statement(StatementError::MissingFragment { .. })
        ));
        assert!(!dir.path().join("1A.pdf").exists());
    }
}
