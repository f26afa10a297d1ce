use std::{
    cell::RefCell,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    rc::Rc,
    time::Instant,
};

use lol_html::{EndTagHandler, RewriteStrSettings, element, rewrite_str};
use tracing::debug;

use crate::{
    application::{
        markup::{collect_marked, mark_outer},
        render::types::{FormulaRenderer, RenderError, RenderedEmbeds, ensure_count},
    },
    domain::formula::FormulaBatch,
    util::process,
};

const ROW_SEPARATOR: &str = r" \\ ";
const NORMALIZED_CLASS: &str = "mjx-chtml mjx-math";

/// Renders the whole batch with a single `tex2htmlcss --inline` call, one
/// formula per row, and recovers one CHTML box per row from the output.
#[derive(Debug, Clone)]
pub(crate) struct InlineEngineRenderer {
    cli_path: PathBuf,
}

impl InlineEngineRenderer {
    pub(crate) fn new(cli_path: PathBuf) -> Self {
        Self { cli_path }
    }
}

impl FormulaRenderer for InlineEngineRenderer {
    fn name(&self) -> &'static str {
        "tex2htmlcss"
    }

    fn render(
        &self,
        batch: &FormulaBatch,
        _scratch_dir: &Path,
    ) -> Result<RenderedEmbeds, RenderError> {
        if batch.is_empty() {
            return Ok(RenderedEmbeds::default());
        }

        let started_at = Instant::now();
        let stdout = process::run_captured(
            &self.cli_path,
            Command::new(&self.cli_path)
                .arg("--inline")
                .arg(engine_argument(batch))
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped()),
        )
        .inspect_err(|err| {
            debug!(
                target = "cf2pdf::render::tex2htmlcss",
                op = "tex2htmlcss::render",
                result = "error",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                error = %err,
                "tex2htmlcss invocation failed"
            );
        })?;

        let markup = String::from_utf8(stdout)
            .map_err(|err| RenderError::parse(format!("engine output is not UTF-8: {err}")))?;
        let embeds = split_rows(&markup)?;
        ensure_count(batch, embeds.len())?;

        debug!(
            target = "cf2pdf::render::tex2htmlcss",
            op = "tex2htmlcss::render",
            result = "ok",
            formulas = batch.len(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Formulas rendered via tex2htmlcss"
        );

        Ok(RenderedEmbeds::new(embeds))
    }
}

/// `" a \\ b \\"`: every formula is a row, including the last one.
fn engine_argument(batch: &FormulaBatch) -> String {
    let rows = batch
        .iter()
        .map(|formula| formula.content())
        .collect::<Vec<_>>()
        .join(ROW_SEPARATOR);
    format!(" {rows} \\\\")
}

#[derive(Default)]
struct RowScan {
    /// Box index claimed by each `mjx-block`, in document order.
    blocks: Vec<Option<usize>>,
    open_blocks: Vec<usize>,
    boxes: usize,
}

/// Each `span.mjx-block` except the engine's trailing one contributes its
/// first descendant `span.mjx-box`; blocks without a box contribute nothing.
fn split_rows(markup: &str) -> Result<Vec<String>, RenderError> {
    let scan = Rc::new(RefCell::new(RowScan::default()));

    let rewritten = rewrite_str(
        markup,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("span.mjx-block", {
                    let scan = Rc::clone(&scan);
                    move |el| {
                        let index = {
                            let mut scan = scan.borrow_mut();
                            let index = scan.blocks.len();
                            scan.blocks.push(None);
                            scan.open_blocks.push(index);
                            index
                        };

                        let close_scan = Rc::clone(&scan);
                        let close: EndTagHandler<'static> = Box::new(move |_end| {
                            close_scan
                                .borrow_mut()
                                .open_blocks
                                .retain(|open| *open != index);
                            Ok(())
                        });
                        match el.end_tag_handlers() {
                            Some(handlers) => handlers.push(close),
                            None => scan.borrow_mut().open_blocks.retain(|open| *open != index),
                        }
                        Ok(())
                    }
                }),
                element!("span.mjx-box", {
                    let scan = Rc::clone(&scan);
                    move |el| {
                        let claimed = {
                            let mut scan = scan.borrow_mut();
                            let waiting: Vec<usize> = scan
                                .open_blocks
                                .iter()
                                .copied()
                                .filter(|block| scan.blocks[*block].is_none())
                                .collect();
                            if waiting.is_empty() {
                                false
                            } else {
                                let box_index = scan.boxes;
                                scan.boxes += 1;
                                for block in waiting {
                                    scan.blocks[block] = Some(box_index);
                                }
                                true
                            }
                        };

                        if claimed {
                            el.set_attribute("class", NORMALIZED_CLASS)?;
                            mark_outer(el);
                        }
                        Ok(())
                    }
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::parse(err.to_string()))?;

    let boxes = collect_marked(&rewritten);
    let scan = scan.borrow();
    if boxes.len() != scan.boxes {
        return Err(RenderError::parse(format!(
            "expected {} captured boxes, found {}",
            scan.boxes,
            boxes.len()
        )));
    }

    let row_blocks = scan.blocks.len().saturating_sub(1);
    Ok(scan.blocks[..row_blocks]
        .iter()
        .filter_map(|claimed| claimed.map(|index| boxes[index].clone()))
        .collect())
}
