//! External packaging tool boundary
//!
//! The actual box file is produced by an external tool the orchestrator
//! invokes exactly once per run. The trait seam exists so the release cycle
//! can be exercised in tests with a scripted packager instead of a real
//! multi-minute packaging run.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::info;

/// Produces a box artifact for a base name at a given output path
///
/// Contract: on success the tool writes `output` and exits 0. Any other exit
/// status is a failure, and so is a missing output file despite exit 0 - a
/// silent-failure class the tool is known to exhibit. Judging both conditions
/// is the orchestrator's job; implementations only report the exit code.
#[async_trait]
pub trait Packager: Send + Sync {
    /// Run the packaging step, returning the tool's exit code
    async fn package(&self, base_name: &str, output: &Path) -> Result<i32>;
}

/// Invokes the configured packaging executable as a subprocess
///
/// Stdio is inherited so the operator sees the tool's own progress output.
/// No timeout is enforced: packaging duration is unbounded and
/// operator-supervised.
pub struct CommandPackager {
    tool: PathBuf,
}

impl CommandPackager {
    pub fn new(tool: impl Into<PathBuf>) -> Self {
        Self { tool: tool.into() }
    }
}

#[async_trait]
impl Packager for CommandPackager {
    async fn package(&self, base_name: &str, output: &Path) -> Result<i32> {
        info!(
            "Invoking {} for {} -> {}",
            self.tool.display(),
            base_name,
            output.display()
        );

        let status = Command::new(&self.tool)
            .arg(base_name)
            .arg(output)
            .status()
            .await
            .with_context(|| format!("Failed to launch packaging tool {}", self.tool.display()))?;

        Ok(status.code().unwrap_or(-1))
    }
}
