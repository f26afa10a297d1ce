mod batch_document;
mod graphics;
mod inline_engine;

use std::path::{Path, PathBuf};

use crate::{
    application::render::types::{FormulaRenderer, RenderError, RenderedEmbeds},
    config::RenderSettings,
    domain::{formula::FormulaBatch, types::RenderMode},
};

use self::{
    batch_document::BatchDocumentRenderer, graphics::SvgRenderer,
    inline_engine::InlineEngineRenderer,
};

/// Executables behind the three rendering strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderToolchain {
    pub tex2svg: PathBuf,
    pub tex2htmlcss: PathBuf,
    pub make4ht: PathBuf,
}

impl From<&RenderSettings> for RenderToolchain {
    fn from(settings: &RenderSettings) -> Self {
        Self {
            tex2svg: settings.tex2svg_path.clone(),
            tex2htmlcss: settings.tex2htmlcss_path.clone(),
            make4ht: settings.make4ht_path.clone(),
        }
    }
}

/// The strategy picked for a run. Chosen once from the render mode.
#[derive(Debug, Clone)]
pub struct RenderStrategy {
    inner: Strategy,
}

#[derive(Debug, Clone)]
enum Strategy {
    InlineEngine(InlineEngineRenderer),
    BatchDocument(BatchDocumentRenderer),
    PerFormulaSvg(SvgRenderer),
}

impl RenderStrategy {
    pub fn from_mode(mode: RenderMode, toolchain: &RenderToolchain) -> Self {
        let inner = match mode {
            RenderMode::Default => {
                Strategy::InlineEngine(InlineEngineRenderer::new(toolchain.tex2htmlcss.clone()))
            }
            RenderMode::Fast => {
                Strategy::BatchDocument(BatchDocumentRenderer::new(toolchain.make4ht.clone()))
            }
            RenderMode::Graphics => {
                Strategy::PerFormulaSvg(SvgRenderer::new(toolchain.tex2svg.clone()))
            }
        };
        Self { inner }
    }

    fn renderer(&self) -> &dyn FormulaRenderer {
        match &self.inner {
            Strategy::InlineEngine(renderer) => renderer,
            Strategy::BatchDocument(renderer) => renderer,
            Strategy::PerFormulaSvg(renderer) => renderer,
        }
    }
}

impl FormulaRenderer for RenderStrategy {
    fn name(&self) -> &'static str {
        self.renderer().name()
    }

    fn render(
        &self,
        batch: &FormulaBatch,
        scratch_dir: &Path,
    ) -> Result<RenderedEmbeds, RenderError> {
        self.renderer().render(batch, scratch_dir)
    }
}
