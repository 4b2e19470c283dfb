use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::error::ShareError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared,
    /// The user closed the share UI without picking a target.
    Dismissed,
}

/// Hands a set of local files to the user in one interaction.
#[async_trait]
pub trait ShareSink: Send + Sync {
    async fn share(&self, locators: &[PathBuf]) -> Result<ShareOutcome, ShareError>;
}

/// Runs `program [args...] <locator>...` and waits for it to exit.
#[derive(Debug, Clone)]
pub struct CommandShareSink {
    program: String,
    args: Vec<String>,
    dismiss_code: Option<i32>,
}

impl CommandShareSink {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            dismiss_code: None,
        }
    }

    /// Exit code the program uses to say the user backed out. Any other
    /// non-zero code is an error.
    pub fn with_dismiss_code(mut self, code: Option<i32>) -> Self {
        self.dismiss_code = code;
        self
    }
}

#[async_trait]
impl ShareSink for CommandShareSink {
    async fn share(&self, locators: &[PathBuf]) -> Result<ShareOutcome, ShareError> {
        info!(program = %self.program, files = locators.len(), "sharing files");
        let status = Command::new(&self.program)
            .args(&self.args)
            .args(locators)
            .status()
            .await
            .map_err(|source| ShareError::Launch {
                program: self.program.clone(),
                source,
            })?;

        if status.success() {
            Ok(ShareOutcome::Shared)
        } else if self.dismiss_code.is_some() && status.code() == self.dismiss_code {
            info!(program = %self.program, "share dismissed");
            Ok(ShareOutcome::Dismissed)
        } else {
            Err(ShareError::Exit {
                program: self.program.clone(),
                status: status.to_string(),
            })
        }
    }
}

/// Prints the locators, one per line. The default when no program is set.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrintShareSink;

#[async_trait]
impl ShareSink for PrintShareSink {
    async fn share(&self, locators: &[PathBuf]) -> Result<ShareOutcome, ShareError> {
        for locator in locators {
            println!("{}", locator.display());
        }
        Ok(ShareOutcome::Shared)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn command_sink_reports_exit_status() {
        let ok = CommandShareSink::new("true", vec![]);
        assert_eq!(
            ok.share(&[PathBuf::from("/tmp/a")]).await.unwrap(),
            ShareOutcome::Shared
        );

        let failing = CommandShareSink::new("false", vec![]);
        assert!(matches!(
            failing.share(&[]).await,
            Err(ShareError::Exit { .. })
        ));

        let missing = CommandShareSink::new("/nonexistent/share-helper", vec![]);
        assert!(matches!(
            missing.share(&[]).await,
            Err(ShareError::Launch { .. })
        ));
    }

    #[tokio::test]
    async fn designated_exit_code_means_dismissed() {
        let exit3 = || vec!["-c".to_string(), "exit 3".to_string(), "sh".to_string()];

        let sink = CommandShareSink::new("sh", exit3()).with_dismiss_code(Some(3));
        assert_eq!(
            sink.share(&[PathBuf::from("/tmp/a")]).await.unwrap(),
            ShareOutcome::Dismissed
        );

        let other = CommandShareSink::new("sh", exit3()).with_dismiss_code(Some(4));
        assert!(matches!(
            other.share(&[]).await,
            Err(ShareError::Exit { .. })
        ));
    }
}
