//! Shared domain enumerations.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Selects which external toolchain turns LaTeX into embeddable markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// `tex2htmlcss`: one engine call for the whole batch, CHTML output.
    #[default]
    Default,
    /// `make4ht`: one LaTeX document compiled to HTML.
    Fast,
    /// `tex2svg`: one SVG per formula.
    Graphics,
}

impl RenderMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RenderMode::Default => "default",
            RenderMode::Fast => "fast",
            RenderMode::Graphics => "graphics",
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(RenderMode::Default),
            "fast" => Ok(RenderMode::Fast),
            "graphics" => Ok(RenderMode::Graphics),
            other => Err(format!(
                "unknown render mode `{other}` (expected default|fast|graphics)"
            )),
        }
    }
}
