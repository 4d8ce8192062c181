use tracing::debug;

use crate::backend::CompilerBackend;
use crate::config::BuildSettings;
use crate::error::CompileError;
use crate::standard_json::{CompilerInput, CompilerOutput};

/// Compiles one Yul source with `backend` and returns the raw output.
///
/// Always requests every output and runs the optimizer with zero runs; the
/// configured `yulDetails` are passed through untouched. Diagnostics and
/// contract objects are left for the caller to interpret.
pub async fn invoke(
    backend: &dyn CompilerBackend,
    source: &str,
    settings: &BuildSettings,
) -> Result<CompilerOutput, CompileError> {
    let input = CompilerInput::yul(source, settings.yul_details.clone());
    debug!(version = backend.version(), "compiling Yul source");
    backend.compile(&input).await
}
