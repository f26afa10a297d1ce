//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

pub use cli::{CliArgs, ModeFlags, Overrides};

use crate::domain::types::RenderMode;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "cf2pdf";
const ENV_PREFIX: &str = "CF2PDF";
const DEFAULT_BASE_URL: &str = "https://codeforces.com";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_USER_AGENT: &str = concat!("cf2pdf/", env!("CARGO_PKG_VERSION"));
const DEFAULT_SCRATCH_DIR: &str = ".cache";
const DEFAULT_TEX2SVG_PATH: &str = "tex2svg";
const DEFAULT_TEX2HTMLCSS_PATH: &str = "tex2htmlcss";
const DEFAULT_MAKE4HT_PATH: &str = "make4ht";
const DEFAULT_WEASYPRINT_PATH: &str = "weasyprint";
const DEFAULT_STYLESHEETS_DIR: &str = "styles";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub fetch: FetchSettings,
    pub render: RenderSettings,
    pub pdf: PdfSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Colored one-line messages meant for a human at a terminal.
    Console,
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "unknown log format `{other}` (expected console, compact or json)"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub base_url: Url,
    pub timeout: Duration,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub mode: RenderMode,
    pub scratch_dir: PathBuf,
    pub tex2svg_path: PathBuf,
    pub tex2htmlcss_path: PathBuf,
    pub make4ht_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct PdfSettings {
    pub weasyprint_path: PathBuf,
    pub stylesheets_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);
    if let Some(mode) = cli.mode.selected() {
        raw.render.mode = Some(mode.as_str().to_string());
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    fetch: RawFetchSettings,
    render: RawRenderSettings,
    pdf: RawPdfSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.fetch_base_url.as_ref() {
            self.fetch.base_url = Some(url.clone());
        }
        if let Some(dir) = overrides.scratch_dir.as_ref() {
            self.render.scratch_dir = Some(dir.clone());
        }
        if let Some(path) = overrides.tex2svg_path.as_ref() {
            self.render.tex2svg_path = Some(path.clone());
        }
        if let Some(path) = overrides.tex2htmlcss_path.as_ref() {
            self.render.tex2htmlcss_path = Some(path.clone());
        }
        if let Some(path) = overrides.make4ht_path.as_ref() {
            self.render.make4ht_path = Some(path.clone());
        }
        if let Some(path) = overrides.weasyprint_path.as_ref() {
            self.pdf.weasyprint_path = Some(path.clone());
        }
        if let Some(dir) = overrides.stylesheets_dir.as_ref() {
            self.pdf.stylesheets_dir = Some(dir.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            fetch,
            render,
            pdf,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            fetch: build_fetch_settings(fetch)?,
            render: build_render_settings(render)?,
            pdf: build_pdf_settings(pdf)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        match logging.format {
            Some(format) => LogFormat::from_str(&format)
                .map_err(|reason| LoadError::invalid("logging.format", reason))?,
            None => LogFormat::Console,
        }
    };

    Ok(LoggingSettings { level, format })
}

fn build_fetch_settings(fetch: RawFetchSettings) -> Result<FetchSettings, LoadError> {
    let raw_url = fetch
        .base_url
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let base_url = Url::parse(raw_url.trim())
        .map_err(|err| LoadError::invalid("fetch.base_url", format!("failed to parse: {err}")))?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "fetch.base_url",
            format!("unsupported scheme `{}`", base_url.scheme()),
        ));
    }

    let timeout_secs = fetch.timeout_seconds.unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "fetch.timeout_seconds",
            "must be greater than zero",
        ));
    }

    let user_agent = fetch
        .user_agent
        .map(|agent| agent.trim().to_string())
        .filter(|agent| !agent.is_empty())
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

    Ok(FetchSettings {
        base_url,
        timeout: Duration::from_secs(timeout_secs),
        user_agent,
    })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let mode = match render.mode {
        Some(mode) => RenderMode::from_str(&mode)
            .map_err(|reason| LoadError::invalid("render.mode", reason))?,
        None => RenderMode::default(),
    };

    Ok(RenderSettings {
        mode,
        scratch_dir: non_empty_path(render.scratch_dir, DEFAULT_SCRATCH_DIR, "render.scratch_dir")?,
        tex2svg_path: non_empty_path(
            render.tex2svg_path,
            DEFAULT_TEX2SVG_PATH,
            "render.tex2svg_path",
        )?,
        tex2htmlcss_path: non_empty_path(
            render.tex2htmlcss_path,
            DEFAULT_TEX2HTMLCSS_PATH,
            "render.tex2htmlcss_path",
        )?,
        make4ht_path: non_empty_path(
            render.make4ht_path,
            DEFAULT_MAKE4HT_PATH,
            "render.make4ht_path",
        )?,
    })
}

fn build_pdf_settings(pdf: RawPdfSettings) -> Result<PdfSettings, LoadError> {
    Ok(PdfSettings {
        weasyprint_path: non_empty_path(
            pdf.weasyprint_path,
            DEFAULT_WEASYPRINT_PATH,
            "pdf.weasyprint_path",
        )?,
        stylesheets_dir: non_empty_path(
            pdf.stylesheets_dir,
            DEFAULT_STYLESHEETS_DIR,
            "pdf.stylesheets_dir",
        )?,
    })
}

fn non_empty_path(
    value: Option<PathBuf>,
    default: &str,
    key: &'static str,
) -> Result<PathBuf, LoadError> {
    let path = value.unwrap_or_else(|| PathBuf::from(default));
    if path.as_os_str().is_empty() {
        return Err(LoadError::invalid(key, "path must not be empty"));
    }
    Ok(path)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    format: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawFetchSettings {
    base_url: Option<String>,
    timeout_seconds: Option<u64>,
    user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    mode: Option<String>,
    scratch_dir: Option<PathBuf>,
    tex2svg_path: Option<PathBuf>,
    tex2htmlcss_path: Option<PathBuf>,
    make4ht_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPdfSettings {
    weasyprint_path: Option<PathBuf>,
    stylesheets_dir: Option<PathBuf>,
}
