//! Shared subprocess line-streaming helper (spec §4.7): both the compile
//! and deploy runners spawn a CLI, stream stdout/stderr line by line, and
//! keyword-classify each line into a `LogKind` as it arrives.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

use crate::job::LogKind;
use crate::{Error, Result};

/// Classify a single output line by keyword, case-insensitively.
/// `error`/`failed`/`fatal` outrank `warn`, which outrank `success`/`done`.
pub fn classify_line(line: &str) -> LogKind {
    let lower = line.to_ascii_lowercase();
    if lower.contains("error") || lower.contains("failed") || lower.contains("fatal") {
        LogKind::Error
    } else if lower.contains("warn") {
        LogKind::Warning
    } else if lower.contains("success") || lower.contains("done") || lower.contains("finished") {
        LogKind::Success
    } else {
        LogKind::Info
    }
}

/// Spawn `program` with `args` in `cwd`, streaming each stdout/stderr line
/// to `on_line` as it is classified. Returns the process exit status.
///
/// `on_line` is called synchronously per line in arrival order across both
/// streams combined; callers that need strict interleaving ordering should
/// not rely on stdout/stderr being merged chronologically, since each
/// stream is read independently.
pub async fn stream_command<F>(
    program: &str,
    args: &[&str],
    cwd: &std::path::Path,
    mut on_line: F,
) -> Result<std::process::ExitStatus>
where
    F: FnMut(LogKind, &str),
{
    let mut child: Child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::ToolchainMissing(format!("{program}: {e}")))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::Internal("child has no stdout handle".into()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| Error::Internal("child has no stderr handle".into()))?;

    let mut stdout_lines = BufReader::new(stdout).lines();
    let mut stderr_lines = BufReader::new(stderr).lines();

    loop {
        tokio::select! {
            line = stdout_lines.next_line() => {
                match line.map_err(|e| Error::Internal(e.to_string()))? {
                    Some(l) => on_line(classify_line(&l), &l),
                    None => break,
                }
            }
            line = stderr_lines.next_line() => {
                match line.map_err(|e| Error::Internal(e.to_string()))? {
                    Some(l) => on_line(classify_line(&l), &l),
                    None => continue,
                }
            }
        }
    }

    // Drain any remaining stderr after stdout has closed.
    while let Some(l) = stderr_lines
        .next_line()
        .await
        .map_err(|e| Error::Internal(e.to_string()))?
    {
        on_line(classify_line(&l), &l);
    }

    child
        .wait()
        .await
        .map_err(|e| Error::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_error_over_warn() {
        assert_eq!(classify_line("WARNING: error compiling"), LogKind::Error);
    }

    #[test]
    fn classifies_plain_warning() {
        assert_eq!(classify_line("warn: deprecated flag"), LogKind::Warning);
    }

    #[test]
    fn classifies_success() {
        assert_eq!(classify_line("Build finished successfully"), LogKind::Success);
    }

    #[test]
    fn classifies_fatal_as_error() {
        assert_eq!(classify_line("fatal: could not read Cargo.toml"), LogKind::Error);
    }

    #[test]
    fn defaults_to_info() {
        assert_eq!(classify_line("Compiling wasmforge-target v0.1.0"), LogKind::Info);
    }
}
