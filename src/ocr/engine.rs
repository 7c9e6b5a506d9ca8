//! Subprocess bridge to the external OCR tool.
//!
//! The tool receives a JSON payload as its final argument and replies
//! with JSON on stdout. The recognition itself is opaque to us.

use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Errors from one OCR subprocess invocation.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Failed to spawn OCR process: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("OCR process timed out after {0}s")]
    Timeout(u64),

    #[error("OCR process failed: {0}")]
    Failed(String),

    #[error("Invalid OCR output: {0}")]
    InvalidOutput(String),
}

#[derive(Deserialize)]
struct OcrResponse {
    success: bool,
    #[serde(default)]
    processed_content: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Handle to the configured external OCR command.
#[derive(Clone)]
pub struct OcrEngine {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl OcrEngine {
    pub fn new(program: String, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program,
            args,
            timeout,
        }
    }

    /// Run the OCR tool over raw entity content.
    ///
    /// Returns the processed content with image references resolved to
    /// text. The process is killed if it exceeds the timeout.
    pub async fn process(&self, content: &str) -> Result<String, OcrError> {
        let payload = serde_json::json!({ "content": content }).to_string();

        debug!(program = %self.program, "invoking OCR subprocess");

        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(&payload)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        // Dropping the future on timeout kills the child via kill_on_drop.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| OcrError::Timeout(self.timeout.as_secs()))??;

        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Failed(format!(
                "exit {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let response: OcrResponse = serde_json::from_str(stdout.trim()).map_err(|e| {
            let stderr = String::from_utf8_lossy(&output.stderr);
            OcrError::InvalidOutput(format!("{} (stderr: {})", e, stderr.trim()))
        })?;

        if response.success {
            response
                .processed_content
                .ok_or_else(|| OcrError::InvalidOutput("missing processed_content".to_string()))
        } else {
            Err(OcrError::Failed(
                response
                    .error
                    .unwrap_or_else(|| "unknown OCR error".to_string()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(script: &str) -> OcrEngine {
        OcrEngine::new(
            "sh".to_string(),
            vec!["-c".to_string(), script.to_string(), "sh".to_string()],
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_successful_response() {
        let eng = engine(r#"echo '{"success": true, "processed_content": "ocr text"}'"#);
        let out = eng.process("raw").await.unwrap();
        assert_eq!(out, "ocr text");
    }

    #[tokio::test]
    async fn test_tool_reported_error() {
        let eng = engine(r#"echo '{"success": false, "error": "bad image"}'"#);
        let err = eng.process("raw").await.unwrap_err();
        assert!(matches!(err, OcrError::Failed(ref msg) if msg.contains("bad image")));
    }

    #[tokio::test]
    async fn test_garbage_stdout() {
        let eng = engine("echo not-json");
        let err = eng.process("raw").await.unwrap_err();
        assert!(matches!(err, OcrError::InvalidOutput(_)));
    }

    #[tokio::test]
    async fn test_nonzero_exit_captures_stderr() {
        let eng = engine("echo boom >&2; exit 3");
        let err = eng.process("raw").await.unwrap_err();
        assert!(matches!(err, OcrError::Failed(ref msg) if msg.contains("boom")));
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let eng = OcrEngine::new(
            "sleep".to_string(),
            vec!["30".to_string()],
            Duration::from_millis(100),
        );
        let err = eng.process("raw").await.unwrap_err();
        assert!(matches!(err, OcrError::Timeout(_)));
    }
}
