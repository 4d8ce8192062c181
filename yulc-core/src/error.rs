use std::path::PathBuf;

use thiserror::Error;

/// A Yul+ source that could not be lexed or transpiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at {line}:{column}: {message}")]
pub struct DialectSyntaxError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl DialectSyntaxError {
    /// Builds an error located at byte `offset` of `source`.
    pub fn at(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let (line, column) = line_column(source, offset);
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let prefix = &source[..offset.min(source.len())];
    let line = prefix.matches('\n').count() + 1;
    let column = match prefix.rfind('\n') {
        Some(newline) => prefix[newline + 1..].chars().count() + 1,
        None => prefix.chars().count() + 1,
    };
    (line, column)
}

/// Everything that can make a single file fail to compile.
///
/// None of these abort a run: the pipeline records the failure against
/// the offending file and moves on to the next one.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to read source {}: {source}", path.display())]
    SourceIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    DialectSyntax(#[from] DialectSyntaxError),
    #[error("solc {version} is not available: {reason}")]
    BackendUnavailable { version: String, reason: String },
    #[error("compiler backend failed: {0}")]
    Backend(String),
    #[error("compilation failed:\n{}", messages.join("\n"))]
    CompilationDiagnostic { messages: Vec<String> },
    #[error("compiler produced no contract object for {source_name}")]
    NoCompiledOutput { source_name: String },
    #[error("compiler returned malformed {field} for {contract}: {value:?}")]
    InvalidBytecode {
        contract: String,
        field: &'static str,
        value: String,
    },
    #[error("contract name {contract_name} already produced by {first_source}")]
    DuplicateContractName {
        contract_name: String,
        first_source: String,
    },
    #[error("failed to record artifact: {0}")]
    Sink(String),
}

/// A project configuration file that could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
