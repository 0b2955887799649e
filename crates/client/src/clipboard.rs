//! Copy-to-clipboard for job uids.
//!
//! The platform clipboard may be missing entirely (headless hosts, SSH
//! sessions).  Copying never fails the caller: any error becomes a
//! visible [`Notice`].

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Upper bound for the clipboard helper process.
const CLIPBOARD_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("No clipboard available")]
    Unavailable,

    #[error("Clipboard command failed: {0}")]
    Command(String),

    #[error("Clipboard command timed out")]
    Timeout,
}

#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Feedback shown to the operator after a copy attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

/// Copy a job uid, turning any clipboard failure into an error notice.
pub async fn copy_uid(clipboard: &dyn Clipboard, uid: &str) -> Notice {
    match clipboard.write_text(uid).await {
        Ok(()) => Notice::Info(format!("Copied {uid}")),
        Err(e) => {
            tracing::warn!(uid, error = %e, "Copy to clipboard failed");
            Notice::Error(format!("Could not copy UID: {e}"))
        }
    }
}

/// Clipboard backed by an external helper reading from stdin
/// (`pbcopy`, `wl-copy`, `xclip`, `clip`).
#[derive(Debug, Clone)]
pub struct CommandClipboard {
    program: Option<String>,
    args: Vec<String>,
}

impl CommandClipboard {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: Some(program.into()),
            args,
        }
    }

    /// Pick a helper for the current platform.
    ///
    /// `THESIS_CLIPBOARD_CMD` (program followed by arguments) overrides the
    /// detection.  When nothing applies the clipboard reports
    /// [`ClipboardError::Unavailable`].
    pub fn detect() -> Self {
        if let Ok(cmd) = std::env::var("THESIS_CLIPBOARD_CMD") {
            let mut parts = cmd.split_whitespace().map(str::to_string);
            if let Some(program) = parts.next() {
                return Self::new(program, parts.collect());
            }
        }

        if cfg!(target_os = "macos") {
            Self::new("pbcopy", Vec::new())
        } else if cfg!(target_os = "windows") {
            Self::new("clip", Vec::new())
        } else if std::env::var_os("WAYLAND_DISPLAY").is_some() {
            Self::new("wl-copy", Vec::new())
        } else if std::env::var_os("DISPLAY").is_some() {
            Self::new("xclip", vec!["-selection".into(), "clipboard".into()])
        } else {
            Self {
                program: None,
                args: Vec::new(),
            }
        }
    }

    async fn pipe(&self, program: &str, text: &str) -> Result<(), ClipboardError> {
        let mut child = Command::new(program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ClipboardError::Command(format!("{program}: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| ClipboardError::Command(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ClipboardError::Command(e.to_string()))?;
        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ClipboardError::Command(format!(
                "{program} exited with {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim(),
            )))
        }
    }
}

#[async_trait]
impl Clipboard for CommandClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let program = self.program.as_deref().ok_or(ClipboardError::Unavailable)?;
        tokio::time::timeout(CLIPBOARD_TIMEOUT, self.pipe(program, text))
            .await
            .map_err(|_| ClipboardError::Timeout)?
    }
}
