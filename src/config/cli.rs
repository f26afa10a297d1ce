use std::path::PathBuf;

use clap::{Args, Parser, ValueHint, builder::BoolishValueParser};

use crate::domain::types::RenderMode;

/// Command-line arguments for the cf2pdf binary.
#[derive(Debug, Parser)]
#[command(
    name = "cf2pdf",
    version,
    about = "Convert a Codeforces problem statement into a PDF"
)]
pub struct CliArgs {
    /// Numeric contest id, e.g. 1900.
    #[arg(value_name = "CONTEST_ID")]
    pub contest_id: u64,

    /// Problem label within the contest, e.g. A or B1.
    #[arg(value_name = "PROBLEM")]
    pub problem: String,

    #[command(flatten)]
    pub mode: ModeFlags,

    /// Directory the PDF is written to; created when missing.
    #[arg(
        short = 'd',
        long = "output-dir",
        value_name = "DIR",
        default_value = ".",
        value_hint = ValueHint::DirPath
    )]
    pub output_dir: PathBuf,

    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "CF2PDF_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,
}

/// Formula rendering strategy. Without a flag the configured mode applies.
#[derive(Debug, Args, Default, Clone, Copy)]
#[group(multiple = false)]
pub struct ModeFlags {
    /// Render formulas as one LaTeX document with make4ht.
    #[arg(short = 'f', long = "fast")]
    pub fast: bool,

    /// Render every formula to its own SVG image with tex2svg.
    #[arg(short = 'g', long = "graphics")]
    pub graphics: bool,
}

impl ModeFlags {
    pub fn selected(&self) -> Option<RenderMode> {
        if self.fast {
            Some(RenderMode::Fast)
        } else if self.graphics {
            Some(RenderMode::Graphics)
        } else {
            None
        }
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the judge base URL problem pages are fetched from.
    #[arg(long = "fetch-base-url", value_name = "URL")]
    pub fetch_base_url: Option<String>,

    /// Override the directory scratch files are created in.
    #[arg(long = "render-scratch-dir", value_name = "PATH")]
    pub scratch_dir: Option<PathBuf>,

    /// Override the tex2svg executable used in graphics mode.
    #[arg(long = "render-tex2svg-path", value_name = "PATH")]
    pub tex2svg_path: Option<PathBuf>,

    /// Override the tex2htmlcss executable used in default mode.
    #[arg(long = "render-tex2htmlcss-path", value_name = "PATH")]
    pub tex2htmlcss_path: Option<PathBuf>,

    /// Override the make4ht executable used in fast mode.
    #[arg(long = "render-make4ht-path", value_name = "PATH")]
    pub make4ht_path: Option<PathBuf>,

    /// Override the weasyprint executable.
    #[arg(long = "pdf-weasyprint-path", value_name = "PATH")]
    pub weasyprint_path: Option<PathBuf>,

    /// Override the directory statement stylesheets are read from.
    #[arg(long = "pdf-stylesheets-dir", value_name = "PATH")]
    pub stylesheets_dir: Option<PathBuf>,
}
