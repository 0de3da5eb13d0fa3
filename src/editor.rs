//! Composing a commit message in an external editor.
//!
//! The caller owns the terminal: it leaves raw mode and the alternate screen
//! before [`MessageEditor::edit`] and restores both afterwards.

use std::env;
use std::fs;
use std::io::Write;
use std::process::{Command, Stdio};

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("could not prepare message file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        source: std::io::Error,
    },
    #[error("`{0}` exited with an error")]
    Exited(String),
}

const TEMPLATE: &str = "\n# Write the commit message above. Lines starting with '#' are ignored.\n# An empty message aborts the commit.\n";

pub trait MessageEditor {
    /// Open the editor and return the message, or `None` when it was left empty.
    fn edit(&self) -> Result<Option<String>, EditorError>;
}

pub struct ExternalEditor {
    command: String,
}

impl ExternalEditor {
    /// `$GIT_EDITOR`, then `$EDITOR`, then the configured override, then `vi`.
    pub fn from_env(configured: Option<&str>) -> Self {
        let command = ["GIT_EDITOR", "EDITOR"]
            .iter()
            .filter_map(|var| env::var(var).ok())
            .chain(configured.map(str::to_string))
            .find(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "vi".to_string());
        Self { command }
    }
}

impl MessageEditor for ExternalEditor {
    fn edit(&self) -> Result<Option<String>, EditorError> {
        let mut file = tempfile::Builder::new()
            .prefix("gitbuddy-EDITMSG-")
            .tempfile()?;
        file.write_all(TEMPLATE.as_bytes())?;
        file.flush()?;
        let path = file.path().to_path_buf();

        // Commands like "code --wait" carry their own arguments.
        let mut parts = self.command.split_whitespace();
        let program = parts.next().unwrap_or("vi");
        tracing::info!(editor = %self.command, "launching editor");
        let status = Command::new(program)
            .args(parts)
            .arg(&path)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status();

        let result = match status {
            Ok(s) if s.success() => fs::read_to_string(&path)
                .map(|text| strip_comments(&text))
                .map_err(EditorError::from),
            Ok(_) => Err(EditorError::Exited(self.command.clone())),
            Err(source) => Err(EditorError::Launch {
                command: self.command.clone(),
                source,
            }),
        };
        result
    }
}

/// Drop `#` lines and surrounding blank lines, like git's default cleanup.
pub fn strip_comments(text: &str) -> Option<String> {
    let kept: Vec<&str> = text
        .lines()
        .filter(|line| !line.starts_with('#'))
        .map(str::trim_end)
        .collect();
    let message = kept.join("\n").trim().to_string();
    (!message.is_empty()).then_some(message)
}
