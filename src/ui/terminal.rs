//! Terminal prompts
//!
//! Questions are styled with crossterm and answered on stdin. An empty line
//! or end of input dismisses the prompt.

use std::io::{Write, stdout};
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use crossterm::{
    execute,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
};
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::debug;

use super::InteractionSurface;
use crate::error::{GitError, PromptError, Result};
use crate::git::{END_OF_OPTIONS, reject_option_like};

/// Interaction surface on the controlling terminal
pub struct TerminalSurface {
    input: Mutex<BufReader<Stdin>>,
    /// Tool for `git difftool`; plain `git diff` when unset
    diff_tool: Option<String>,
}

impl TerminalSurface {
    pub fn new(diff_tool: Option<String>) -> Self {
        Self {
            input: Mutex::new(BufReader::new(tokio::io::stdin())),
            diff_tool,
        }
    }

    /// Read one trimmed line; `None` on end of input
    async fn read_answer(&self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = self
            .input
            .lock()
            .await
            .read_line(&mut line)
            .await
            .map_err(|e| PromptError::ReadFailed(e.to_string()))?;

        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn render_question(&self, text: &str, hint: &str) -> Result<()> {
        let mut out = stdout();
        execute!(
            out,
            SetForegroundColor(Color::Cyan),
            SetAttribute(Attribute::Bold),
            Print("? "),
            SetAttribute(Attribute::Reset),
            Print(text),
            SetForegroundColor(Color::DarkGrey),
            Print(format!(" {} ", hint)),
            ResetColor,
        )
        .map_err(|e| PromptError::RenderFailed(e.to_string()))?;
        out.flush()
            .map_err(|e| PromptError::RenderFailed(e.to_string()))?;
        Ok(())
    }

    fn render_options(&self, title: &str, options: &[String]) -> Result<()> {
        let mut out = stdout();
        execute!(
            out,
            SetAttribute(Attribute::Bold),
            Print(format!("{}\n", title)),
            SetAttribute(Attribute::Reset),
        )
        .map_err(|e| PromptError::RenderFailed(e.to_string()))?;

        for (i, option) in options.iter().enumerate() {
            execute!(
                out,
                SetForegroundColor(Color::Yellow),
                Print(format!("  {:>2}) ", i + 1)),
                ResetColor,
                Print(format!("{}\n", option)),
            )
            .map_err(|e| PromptError::RenderFailed(e.to_string()))?;
        }
        Ok(())
    }
}

/// Interpret a yes/no answer; anything else is a "no"
fn parse_yes(answer: &str) -> bool {
    matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Interpret a 1-based menu answer
fn parse_choice(answer: &str, count: usize) -> Option<usize> {
    let n: usize = answer.parse().ok()?;
    (1..=count).contains(&n).then(|| n - 1)
}

#[async_trait]
impl InteractionSurface for TerminalSurface {
    async fn confirm(&self, prompt: &str) -> Result<bool> {
        self.render_question(prompt, "[y/N]")?;
        Ok(self.read_answer().await?.is_some_and(|a| parse_yes(&a)))
    }

    async fn choose(&self, title: &str, options: &[String]) -> Result<Option<usize>> {
        if options.is_empty() {
            return Ok(None);
        }

        self.render_options(title, options)?;
        loop {
            self.render_question("Choice", &format!("[1-{}, empty to cancel]", options.len()))?;
            let Some(answer) = self.read_answer().await? else {
                return Ok(None);
            };
            if answer.is_empty() {
                return Ok(None);
            }
            if let Some(index) = parse_choice(&answer, options.len()) {
                return Ok(Some(index));
            }
            debug!("Ignoring invalid menu answer {:?}", answer);
        }
    }

    async fn open_side_by_side_diff(
        &self,
        repo: &Path,
        path: &str,
        ref_a: &str,
        ref_b: &str,
    ) -> Result<()> {
        reject_option_like(ref_a)?;
        reject_option_like(ref_b)?;

        let mut cmd = Command::new("git");
        cmd.current_dir(repo);

        match &self.diff_tool {
            Some(tool) => {
                cmd.args(["difftool", "-y"])
                    .arg(format!("--tool={}", tool))
                    .args([END_OF_OPTIONS, ref_a, ref_b, "--", path]);
            }
            None => {
                cmd.args(["--no-pager", "diff", "--color=always", END_OF_OPTIONS])
                    .args([ref_a, ref_b, "--", path]);
            }
        }

        let status = cmd
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| GitError::SpawnFailed {
                operation: "diff".to_string(),
                target: format!("{} ({})", repo.display(), path),
                reason: e.to_string(),
            })?;

        if !status.success() {
            return Err(GitError::CommandFailed {
                operation: "diff".to_string(),
                target: format!("{} ({} {}..{})", repo.display(), path, ref_a, ref_b),
                stderr: format!("exited with {}", status),
            }
            .into());
        }
        Ok(())
    }
}
