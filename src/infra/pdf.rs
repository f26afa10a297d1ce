//! PDF output through the `weasyprint` command-line tool.

use std::{
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    time::Instant,
};

use tracing::{debug, warn};

use crate::{
    application::ports::{PdfBuilder, PdfError, PdfJob},
    config::PdfSettings,
    domain::types::RenderMode,
    util::process,
};

/// Statement stylesheets, applied in this order.
const STATEMENT_STYLESHEETS: [&str; 6] = [
    "ttypography.css",
    "problem-statement.css",
    "clear.css",
    "style.css",
    "font_cuprum.css",
    "font_pt_sans_narrow.css",
];
/// Extra rules for the CHTML markup produced in default mode.
const ENGINE_STYLESHEET: &str = "tex2html.css";

#[derive(Debug, Clone)]
pub struct WeasyprintBuilder {
    cli_path: PathBuf,
    stylesheets_dir: PathBuf,
}

impl WeasyprintBuilder {
    pub fn new(settings: &PdfSettings) -> Self {
        Self {
            cli_path: settings.weasyprint_path.clone(),
            stylesheets_dir: settings.stylesheets_dir.clone(),
        }
    }

    /// Stylesheets for `mode` that exist on disk. Missing ones are skipped with a warning.
    fn stylesheets(&self, mode: RenderMode) -> Vec<PathBuf> {
        let engine = (mode == RenderMode::Default).then_some(ENGINE_STYLESHEET);
        STATEMENT_STYLESHEETS
            .into_iter()
            .chain(engine)
            .map(|name| self.stylesheets_dir.join(name))
            .filter(|path| {
                let present = path.is_file();
                if !present {
                    warn!(
                        target = "cf2pdf::pdf",
                        op = "weasyprint::stylesheets",
                        path = %path.display(),
                        "Stylesheet {} not found, skipping",
                        path.display()
                    );
                }
                present
            })
            .collect()
    }
}

fn standalone_document(fragment: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n</head>\n<body>\n{fragment}\n</body>\n</html>\n"
    )
}

impl PdfBuilder for WeasyprintBuilder {
    fn build(&self, job: &PdfJob) -> Result<(), PdfError> {
        let started_at = Instant::now();

        let mut input = tempfile::Builder::new()
            .prefix("statement-")
            .suffix(".html")
            .tempfile_in(&job.base_dir)
            .map_err(PdfError::Scratch)?;
        input
            .write_all(standalone_document(&job.html).as_bytes())
            .map_err(PdfError::Scratch)?;
        input.flush().map_err(PdfError::Scratch)?;

        let mut command = Command::new(&self.cli_path);
        command.arg("--base-url").arg(&job.base_dir);
        for stylesheet in self.stylesheets(job.mode) {
            command.arg("-s").arg(stylesheet);
        }
        command
            .arg(input.path())
            .arg(&job.output_path)
            .stdin(Stdio::null());

        process::run_captured(&self.cli_path, &mut command).inspect_err(|err| {
            warn!(
                target = "cf2pdf::pdf",
                op = "weasyprint::build",
                result = "error",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                exit_code = err.exit_code().map(i64::from).unwrap_or(-1),
                error = %err,
                "weasyprint invocation failed"
            );
        })?;

        ensure_written(&job.output_path)?;
        debug!(
            target = "cf2pdf::pdf",
            op = "weasyprint::build",
            result = "ok",
            output = %job.output_path.display(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "PDF written"
        );
        Ok(())
    }
}

fn ensure_written(path: &Path) -> Result<(), PdfError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PdfError::MissingOutput {
            path: path.to_path_buf(),
        })
    }
}
