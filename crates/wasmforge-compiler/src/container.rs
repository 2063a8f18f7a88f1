//! Container compile backend: runs the build inside a short-lived Docker
//! container when the native toolchain is absent (spec §4.6 step 2).

use std::path::Path;
use std::time::Duration;

use bollard::container::{
    Config, CreateContainerOptions, LogOutput, LogsOptions, RemoveContainerOptions,
    StartContainerOptions, WaitContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::HostConfig;
use bollard::Docker;
use futures::StreamExt;
use wasmforge_core::job::{CompileBackend, CompileResult, LogKind, LogRecord};
use wasmforge_core::subprocess::classify_line;
use wasmforge_core::{Error, Result};

use crate::layout;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

pub async fn is_available(docker: &Docker) -> bool {
    docker.ping().await.is_ok()
}

pub async fn ensure_image(docker: &Docker, image: &str) -> Result<()> {
    if docker.inspect_image(image).await.is_ok() {
        return Ok(());
    }

    let options = CreateImageOptions {
        from_image: image.to_string(),
        ..Default::default()
    };
    let mut stream = docker.create_image(Some(options), None, None);
    while let Some(result) = stream.next().await {
        result.map_err(|e| Error::Internal(format!("failed to pull {image}: {e}")))?;
    }
    Ok(())
}

pub async fn compile(
    docker: &Docker,
    image: &str,
    build_root: &Path,
    output_dir: &Path,
    job_id: &str,
    mut emit_log: impl FnMut(LogRecord),
) -> Result<CompileResult> {
    ensure_image(docker, image).await?;

    std::fs::create_dir_all(output_dir).map_err(|e| Error::Internal(e.to_string()))?;
    let container_name = format!("wasmforge-compile-{job_id}");

    let binds = vec![
        format!("{}:/workspace:rw", build_root.display()),
        format!("{}:/output:rw", output_dir.display()),
    ];

    let config = Config {
        image: Some(image.to_string()),
        working_dir: Some("/workspace".to_string()),
        attach_stdout: Some(true),
        attach_stderr: Some(true),
        tty: Some(false),
        host_config: Some(HostConfig {
            binds: Some(binds),
            ..Default::default()
        }),
        ..Default::default()
    };

    let create_options = CreateContainerOptions {
        name: container_name.clone(),
        platform: None,
    };

    docker
        .create_container(Some(create_options), config)
        .await
        .map_err(|e| Error::Internal(format!("failed to create compile container: {e}")))?;

    docker
        .start_container(&container_name, None::<StartContainerOptions<String>>)
        .await
        .map_err(|e| Error::Internal(format!("failed to start compile container: {e}")))?;

    let logs_options = LogsOptions::<String> {
        follow: true,
        stdout: true,
        stderr: true,
        ..Default::default()
    };
    let mut log_stream = docker.logs(&container_name, Some(logs_options));

    loop {
        tokio::select! {
            chunk = log_stream.next() => {
                match chunk {
                    Some(Ok(output)) => {
                        let line = match output {
                            LogOutput::StdOut { message } | LogOutput::StdErr { message } | LogOutput::Console { message } => {
                                String::from_utf8_lossy(&message).trim_end().to_string()
                            }
                            LogOutput::StdIn { .. } => continue,
                        };
                        if line.is_empty() {
                            continue;
                        }
                        emit_log(classify_container_line(&line));
                    }
                    Some(Err(e)) => {
                        emit_log(LogRecord::new(LogKind::Warning, format!("log stream error: {e}")));
                    }
                    None => break,
                }
            }
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
        }
    }

    let wait_options = WaitContainerOptions { condition: "not-running" };
    let mut wait_stream = docker.wait_container(&container_name, Some(wait_options));
    let exit_code = wait_stream
        .next()
        .await
        .and_then(|r| r.ok())
        .map(|r| r.status_code)
        .unwrap_or(-1);

    let _ = docker
        .remove_container(
            &container_name,
            Some(RemoveContainerOptions {
                force: true,
                ..Default::default()
            }),
        )
        .await;

    if exit_code != 0 {
        return Err(Error::CompilerFailed(format!(
            "compile container exited with code {exit_code}"
        )));
    }

    let per_job_output = output_dir.join(job_id);
    let artifact_dir = if per_job_output.is_dir() {
        per_job_output
    } else {
        output_dir.to_path_buf()
    };
    let artifact = layout::find_wasm_artifact(&artifact_dir)?;
    let bytes = std::fs::read(&artifact).map_err(|e| Error::Internal(e.to_string()))?;
    let filename = artifact
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("out.wasm")
        .to_string();

    Ok(CompileResult {
        wasm_bytes: bytes,
        wasm_filename: filename,
        backend_used: CompileBackend::Container,
    })
}

/// Parse a container log line as structured JSON when possible
/// (`{kind, message, timestamp}`), else fall back to keyword
/// classification (spec §4.6 step 2).
fn classify_container_line(line: &str) -> LogRecord {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(line) {
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            let kind = match value.get("kind").and_then(|k| k.as_str()) {
                Some("error") => LogKind::Error,
                Some("warning") => LogKind::Warning,
                Some("success") => LogKind::Success,
                Some("debug") => LogKind::Debug,
                _ => LogKind::Info,
            };
            return LogRecord::new(kind, message.to_string());
        }
    }
    LogRecord::new(classify_line(line), line.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_container_line_prefers_structured_json() {
        let record = classify_container_line(r#"{"kind":"warning","message":"low disk space","timestamp":"x"}"#);
        assert_eq!(record.kind, LogKind::Warning);
        assert_eq!(record.message, "low disk space");
    }

    #[test]
    fn classify_container_line_defaults_unknown_kind_to_info() {
        let record = classify_container_line(r#"{"kind":"bogus","message":"hi"}"#);
        assert_eq!(record.kind, LogKind::Info);
    }

    #[test]
    fn classify_container_line_falls_back_to_keyword_classification() {
        let record = classify_container_line("error: compilation failed");
        assert_eq!(record.kind, LogKind::Error);
        assert_eq!(record.message, "error: compilation failed");
    }

    #[test]
    fn classify_container_line_ignores_json_without_a_message_field() {
        let record = classify_container_line(r#"{"kind":"error"}"#);
        assert_eq!(record.kind, LogKind::Error);
        assert_eq!(record.message, r#"{"kind":"error"}"#);
    }
}
