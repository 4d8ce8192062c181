//! Core of the Yul / Yul+ build pipeline.
//!
//! The pipeline is roughly, per source file:
//!
//!   contracts/**/*.yul | *.yulp
//!     -> sources     (discovery, source/contract names)
//!     -> transpiler  (Yul+ only: Yul text + signature/topic side-table)
//!     -> selector    (solc backend for the configured version)
//!     -> compiler    (standard-JSON input, backend call)
//!     -> diagnostics (warnings / errors to the operator)
//!     -> artifact    (hh-sol-artifact-1 record, handed to the sink)
//!
//! Higher-level tools (the CLI, build task runners) should depend on this
//! crate rather than reimplementing the pipeline.

// ---------------------------------------------------------------------
// Error handling and configuration
// ---------------------------------------------------------------------

pub mod config;
pub mod error;

// ---------------------------------------------------------------------
// Front-end: discovery and the Yul+ transpiler
// ---------------------------------------------------------------------

pub mod sources;
pub mod lexer;
pub mod abi;
pub mod builtins;
pub mod transpiler;

// ---------------------------------------------------------------------
// Back-end: solc standard JSON and backend selection
// ---------------------------------------------------------------------

pub mod standard_json;
pub mod backend;
pub mod selector;
pub mod compiler;

// ---------------------------------------------------------------------
// Results: diagnostics, artifacts and orchestration
// ---------------------------------------------------------------------

pub mod diagnostics;
pub mod artifact;
pub mod pipeline;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use artifact::{Artifact, ArtifactSink, FsArtifactSink};
pub use backend::{CompilerBackend, InProcessBackend, NativeSolc};
pub use config::{BuildSettings, YulConfig};
pub use diagnostics::{ConsoleReporter, Reporter};
pub use error::{CompileError, ConfigError, DialectSyntaxError};
pub use pipeline::{Pipeline, RunReport};
pub use selector::{BackendSelector, SolcResolver, StaticSelector};
pub use transpiler::{Transpiled, transpile};
