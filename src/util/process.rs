//! Invocation of external executables where exit status 0 is the only success signal.

use std::{
    io::{self, ErrorKind},
    path::Path,
    process::{Child, Command, ExitStatus, Output},
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("`{tool}` is not installed or not on PATH: {source}")]
    NotFound { tool: String, source: io::Error },
    #[error("failed to launch `{tool}`: {source}")]
    Spawn { tool: String, source: io::Error },
    #[error("failed while waiting for `{tool}`: {source}")]
    Wait { tool: String, source: io::Error },
    #[error("`{tool}` failed (exit {exit_code:?}): {stderr}")]
    Exit {
        tool: String,
        exit_code: Option<i32>,
        stderr: String,
    },
}

impl ToolError {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ToolError::Exit { exit_code, .. } => *exit_code,
            _ => None,
        }
    }

    pub fn spawn(tool: &Path, source: io::Error) -> Self {
        let tool = tool_name(tool);
        if source.kind() == ErrorKind::NotFound {
            ToolError::NotFound { tool, source }
        } else {
            ToolError::Spawn { tool, source }
        }
    }
}

/// Run `command` to completion and return its stdout, failing on any non-zero exit.
pub fn run_captured(tool: &Path, command: &mut Command) -> Result<Vec<u8>, ToolError> {
    let output = command
        .output()
        .map_err(|err| ToolError::spawn(tool, err))?;
    ensure_success(tool, &output)?;
    Ok(output.stdout)
}

/// Start `command` without waiting for it.
pub fn spawn(tool: &Path, command: &mut Command) -> Result<Child, ToolError> {
    command.spawn().map_err(|err| ToolError::spawn(tool, err))
}

/// Block until `child` exits, collecting any piped stderr for diagnostics.
pub fn wait(tool: &Path, child: Child) -> Result<(), ToolError> {
    let output = child.wait_with_output().map_err(|source| ToolError::Wait {
        tool: tool_name(tool),
        source,
    })?;
    ensure_success(tool, &output)
}

fn ensure_success(tool: &Path, output: &Output) -> Result<(), ToolError> {
    if output.status.success() {
        return Ok(());
    }
    Err(exit_error(tool, output.status, &output.stderr))
}

fn exit_error(tool: &Path, status: ExitStatus, stderr: &[u8]) -> ToolError {
    ToolError::Exit {
        tool: tool_name(tool),
        exit_code: status.code(),
        stderr: String::from_utf8_lossy(stderr).trim().to_string(),
    }
}

fn tool_name(tool: &Path) -> String {
    tool.display().to_string()
}
