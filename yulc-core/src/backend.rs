//! Compiler backends.
//!
//! Everything downstream talks to a backend through [`CompilerBackend`]
//! only. [`NativeSolc`] drives a `solc` binary over `--standard-json`;
//! [`InProcessBackend`] wraps a compile function that lives in this
//! process (a linked compiler, or a stand-in for tests).

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::CompileError;
use crate::standard_json::{CompilerInput, CompilerOutput};

#[async_trait]
pub trait CompilerBackend: Send + Sync {
    /// Version this backend compiles with, e.g. `0.8.17`.
    fn version(&self) -> &str;

    async fn compile(&self, input: &CompilerInput) -> Result<CompilerOutput, CompileError>;
}

/// A `solc` executable run once per compilation.
#[derive(Debug, Clone)]
pub struct NativeSolc {
    path: PathBuf,
    version: String,
}

impl NativeSolc {
    pub fn new(path: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version: version.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Asks the binary at `path` for its version (`solc --version`).
    pub async fn probe(path: &Path) -> Result<String, CompileError> {
        let output = Command::new(path)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|err| CompileError::Backend(format!("failed to run {}: {err}", path.display())))?;
        if !output.status.success() {
            return Err(CompileError::Backend(format!(
                "{} --version exited with {}",
                path.display(),
                output.status
            )));
        }
        parse_version(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
            CompileError::Backend(format!("{} did not report a version", path.display()))
        })
    }
}

#[async_trait]
impl CompilerBackend for NativeSolc {
    fn version(&self) -> &str {
        &self.version
    }

    async fn compile(&self, input: &CompilerInput) -> Result<CompilerOutput, CompileError> {
        let request = serde_json::to_vec(input)
            .map_err(|err| CompileError::Backend(format!("failed to encode compiler input: {err}")))?;
        debug!(solc = %self.path.display(), bytes = request.len(), "invoking solc");

        let mut child = Command::new(&self.path)
            .arg("--standard-json")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                CompileError::Backend(format!("failed to start {}: {err}", self.path.display()))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&request)
                .await
                .map_err(|err| CompileError::Backend(format!("failed to write to solc: {err}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|err| CompileError::Backend(format!("failed to wait for solc: {err}")))?;
        if !output.status.success() {
            return Err(CompileError::Backend(format!(
                "solc exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|err| CompileError::Backend(format!("unreadable solc output: {err}")))
    }
}

/// A backend whose compile step is a plain function call.
pub struct InProcessBackend<F> {
    version: String,
    compile: F,
}

impl<F> InProcessBackend<F>
where
    F: Fn(&CompilerInput) -> Result<CompilerOutput, CompileError> + Send + Sync,
{
    pub fn new(version: impl Into<String>, compile: F) -> Self {
        Self {
            version: version.into(),
            compile,
        }
    }
}

#[async_trait]
impl<F> CompilerBackend for InProcessBackend<F>
where
    F: Fn(&CompilerInput) -> Result<CompilerOutput, CompileError> + Send + Sync,
{
    fn version(&self) -> &str {
        &self.version
    }

    async fn compile(&self, input: &CompilerInput) -> Result<CompilerOutput, CompileError> {
        (self.compile)(input)
    }
}

/// Pulls `0.8.17` out of `Version: 0.8.17+commit.8df45f5f.Linux.g++`.
pub fn parse_version(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.trim().strip_prefix("Version:"))
        .map(|rest| {
            rest.trim()
                .split(|c: char| c == '+' || c.is_whitespace())
                .next()
                .unwrap_or_default()
                .to_string()
        })
        .filter(|version| !version.is_empty())
}
