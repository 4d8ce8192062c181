use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::backend::{CompilerBackend, NativeSolc};
use crate::error::CompileError;

/// Hands out a backend for a requested compiler version.
#[async_trait]
pub trait BackendSelector: Send + Sync {
    async fn select(&self, version: &str) -> Result<Arc<dyn CompilerBackend>, CompileError>;
}

/// Backends registered up front, keyed by their version.
#[derive(Default, Clone)]
pub struct StaticSelector {
    backends: HashMap<String, Arc<dyn CompilerBackend>>,
}

impl StaticSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, backend: Arc<dyn CompilerBackend>) -> Self {
        self.backends.insert(backend.version().to_string(), backend);
        self
    }
}

#[async_trait]
impl BackendSelector for StaticSelector {
    async fn select(&self, version: &str) -> Result<Arc<dyn CompilerBackend>, CompileError> {
        self.backends
            .get(version)
            .cloned()
            .ok_or_else(|| CompileError::BackendUnavailable {
                version: version.to_string(),
                reason: "no backend registered for this version".to_string(),
            })
    }
}

/// Finds a native `solc` binary for the requested version.
///
/// Candidates, in order: the explicit binary, `solc-<version>` and
/// `<version>/solc-<version>` inside each search directory, then `solc` on
/// `PATH`. A candidate is used only if `solc --version` reports exactly the
/// requested version.
#[derive(Debug, Clone, Default)]
pub struct SolcResolver {
    explicit: Option<PathBuf>,
    search_dirs: Vec<PathBuf>,
    use_path: bool,
}

impl SolcResolver {
    pub fn new() -> Self {
        Self {
            use_path: true,
            ..Self::default()
        }
    }

    pub fn with_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit = Some(path.into());
        self
    }

    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dirs.push(dir.into());
        self
    }

    /// Skip `PATH` lookup; only explicit and search-dir candidates count.
    pub fn without_path_lookup(mut self) -> Self {
        self.use_path = false;
        self
    }

    fn candidates(&self, version: &str) -> Vec<PathBuf> {
        let versioned = format!("solc-{version}{}", std::env::consts::EXE_SUFFIX);
        let mut candidates: Vec<PathBuf> = self.explicit.iter().cloned().collect();
        for dir in &self.search_dirs {
            candidates.push(dir.join(&versioned));
            candidates.push(dir.join(version).join(&versioned));
        }
        if self.use_path {
            if let Some(path) = std::env::var_os("PATH") {
                let plain = format!("solc{}", std::env::consts::EXE_SUFFIX);
                candidates.extend(std::env::split_paths(&path).map(|dir| dir.join(&plain)));
            }
        }
        candidates
    }
}

#[async_trait]
impl BackendSelector for SolcResolver {
    async fn select(&self, version: &str) -> Result<Arc<dyn CompilerBackend>, CompileError> {
        let mut rejected = Vec::new();
        for candidate in self.candidates(version) {
            if !candidate.is_file() {
                continue;
            }
            match NativeSolc::probe(&candidate).await {
                Ok(found) if found == version => {
                    debug!(solc = %candidate.display(), version, "selected solc");
                    return Ok(Arc::new(NativeSolc::new(candidate, version)));
                }
                Ok(found) => rejected.push(format!("{} is {found}", candidate.display())),
                Err(err) => rejected.push(err.to_string()),
            }
        }
        let reason = if rejected.is_empty() {
            "no solc binary found".to_string()
        } else {
            format!("no matching solc binary ({})", rejected.join("; "))
        };
        Err(CompileError::BackendUnavailable {
            version: version.to_string(),
            reason,
        })
    }
}
