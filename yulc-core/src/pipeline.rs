//! Per-file compilation driver.
//!
//! Each discovered file walks the stages below in order and either ends up
//! in the artifact sink or is recorded as a failure. Files are processed
//! one after another and never affect each other, except that a contract
//! name can only be sunk once per run.
//!
//!   Located -> Transpiled (Yul+ only) -> BackendSelected -> Invoked
//!     -> Diagnosed -> Synthesized -> Sunk

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use tracing::{Instrument, debug, info_span};

use crate::artifact::{Artifact, ArtifactSink, synthesize, synthesize_abi};
use crate::compiler::invoke;
use crate::config::BuildSettings;
use crate::diagnostics::{Reporter, report_diagnostics};
use crate::error::CompileError;
use crate::selector::BackendSelector;
use crate::sources::{Dialect, SourceFile, discover};
use crate::transpiler::transpile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Located,
    Transpiled,
    BackendSelected,
    Invoked,
    Diagnosed,
    Synthesized,
    Sunk,
}

/// A file that did not make it to the sink, and the stage it failed to reach.
#[derive(Debug)]
pub struct FileFailure {
    pub source_name: String,
    pub stage: Stage,
    pub error: CompileError,
}

#[derive(Debug, Default)]
pub struct RunReport {
    /// Source names of the files whose artifacts were recorded.
    pub sunk: Vec<String>,
    pub failures: Vec<FileFailure>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Pipeline<'a> {
    project_root: PathBuf,
    sources_dir: PathBuf,
    settings: BuildSettings,
    selector: &'a dyn BackendSelector,
    reporter: &'a dyn Reporter,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        project_root: impl Into<PathBuf>,
        sources_dir: impl Into<PathBuf>,
        settings: BuildSettings,
        selector: &'a dyn BackendSelector,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            project_root: project_root.into(),
            sources_dir: sources_dir.into(),
            settings,
            selector,
            reporter,
        }
    }

    /// Compiles every Yul and Yul+ file under the sources directory,
    /// recording each artifact as soon as it is ready.
    pub async fn run(&self, sink: &mut dyn ArtifactSink) -> RunReport {
        let files = discover(&self.project_root, &self.sources_dir);
        debug!(count = files.len(), sources = %self.sources_dir.display(), "discovered sources");

        let mut report = RunReport::default();
        let mut sunk_names: HashMap<String, String> = HashMap::new();
        for file in files {
            self.reporter.compiling(&file);
            let span = info_span!("compile", source = %file.source_name);
            let result = match self.compile_file(&file).instrument(span).await {
                Ok(artifact) => sink_artifact(sink, &mut sunk_names, artifact),
                Err(failure) => Err(failure),
            };
            match result {
                Ok(()) => report.sunk.push(file.source_name),
                Err((stage, error)) => {
                    self.reporter.failed(&file, &error);
                    report.failures.push(FileFailure {
                        source_name: file.source_name,
                        stage,
                        error,
                    });
                }
            }
        }
        report
    }

    /// Runs one file up to (not including) the sink.
    pub async fn compile_file(&self, file: &SourceFile) -> Result<Artifact, (Stage, CompileError)> {
        let text = fs::read_to_string(&file.path).map_err(|source| {
            let error = CompileError::SourceIo {
                path: file.path.clone(),
                source,
            };
            (Stage::Located, error)
        })?;

        let (yul, abi) = match file.dialect {
            Dialect::Yul => (text, Vec::new()),
            Dialect::Yulp => {
                let transpiled = transpile(&text)
                    .map_err(|err| (Stage::Transpiled, CompileError::from(err)))?;
                debug!(
                    signatures = transpiled.signatures.len(),
                    topics = transpiled.topics.len(),
                    "transpiled Yul+"
                );
                let abi = synthesize_abi(&transpiled.signatures, &transpiled.topics);
                (transpiled.yul, abi)
            }
        };

        let backend = self
            .selector
            .select(&self.settings.version)
            .await
            .map_err(|err| (Stage::BackendSelected, err))?;
        let output = invoke(backend.as_ref(), &yul, &self.settings)
            .await
            .map_err(|err| (Stage::Invoked, err))?;

        let summary = report_diagnostics(self.reporter, file, &output.errors);
        debug!(warnings = summary.warnings, errors = summary.errors.len(), "diagnosed");

        synthesize(&output, file, abi).map_err(|err| {
            let err = match err {
                CompileError::NoCompiledOutput { .. } if !summary.errors.is_empty() => {
                    CompileError::CompilationDiagnostic {
                        messages: summary.errors.clone(),
                    }
                }
                other => other,
            };
            (Stage::Synthesized, err)
        })
    }
}

fn sink_artifact(
    sink: &mut dyn ArtifactSink,
    sunk_names: &mut HashMap<String, String>,
    artifact: Artifact,
) -> Result<(), (Stage, CompileError)> {
    if let Some(first_source) = sunk_names.get(&artifact.contract_name) {
        return Err((
            Stage::Sunk,
            CompileError::DuplicateContractName {
                contract_name: artifact.contract_name,
                first_source: first_source.clone(),
            },
        ));
    }
    let names = (artifact.contract_name.clone(), artifact.source_name.clone());
    sink.record(artifact).map_err(|err| (Stage::Sunk, err))?;
    sunk_names.insert(names.0, names.1);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::AbiFragment;
    use crate::backend::InProcessBackend;
    use crate::diagnostics::{RecordingReporter, ReportEvent};
    use crate::selector::StaticSelector;
    use crate::standard_json::{
        Bytecode, CompiledContract, CompilerInput, CompilerOutput, Diagnostic, Evm, Severity,
        VIRTUAL_SOURCE,
    };
    use indexmap::IndexMap;
    use std::collections::BTreeMap;
    use std::path::Path;
    use std::sync::Arc;

    /// Stand-in for solc driven by markers in the source text.
    fn fake_solc(input: &CompilerInput) -> Result<CompilerOutput, CompileError> {
        let content = &input.sources[VIRTUAL_SOURCE].content;
        let mut output = CompilerOutput::default();
        if content.contains("WARN") {
            output.errors.push(Diagnostic {
                severity: Severity::Warning,
                message: "shadowed variable".to_string(),
                formatted_message: Some("Warning: shadowed variable".to_string()),
            });
        }
        if content.contains("BROKEN") {
            output.errors.push(Diagnostic {
                severity: Severity::Error,
                message: "undeclared identifier".to_string(),
                formatted_message: Some("DeclarationError: undeclared identifier".to_string()),
            });
        }
        if content.contains("BROKEN") || content.contains("NOTHING") {
            return Ok(output);
        }
        let deployed_bytecode = (!content.contains("NORUNTIME")).then(|| Bytecode {
            object: "6001".to_string(),
            function_debug_data: None,
        });
        let objects = IndexMap::from([(
            "Object".to_string(),
            CompiledContract {
                evm: Evm {
                    bytecode: Some(Bytecode {
                        object: "600160005260206000f3".to_string(),
                        function_debug_data: None,
                    }),
                    deployed_bytecode,
                },
            },
        )]);
        output.contracts = BTreeMap::from([(VIRTUAL_SOURCE.to_string(), objects)]);
        Ok(output)
    }

    fn selector() -> StaticSelector {
        StaticSelector::new().with(Arc::new(InProcessBackend::new("0.8.17", fake_solc)))
    }

    fn project(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        for (name, content) in files {
            let path = dir.path().join("contracts").join(name);
            fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
            fs::write(path, content).expect("write source");
        }
        dir
    }

    async fn run(root: &Path, reporter: &RecordingReporter) -> (RunReport, Vec<Artifact>) {
        let selector = selector();
        let pipeline = Pipeline::new(
            root,
            root.join("contracts"),
            BuildSettings::default(),
            &selector,
            reporter,
        );
        let mut artifacts = Vec::new();
        let report = pipeline.run(&mut artifacts).await;
        (report, artifacts)
    }

    #[tokio::test]
    async fn trivial_yul_round_trips() {
        let dir = project(&[("Foo.yul", "{ mstore(0, 1) return(0, 32) }")]);
        let reporter = RecordingReporter::new();
        let (report, artifacts) = run(dir.path(), &reporter).await;

        assert!(report.is_success());
        assert_eq!(report.sunk, ["contracts/Foo.yul"]);
        let artifact = &artifacts[0];
        assert_eq!(artifact.contract_name, "Foo");
        assert!(artifact.abi.is_empty());
        assert_eq!(artifact.bytecode, "0x600160005260206000f3");
        assert_eq!(artifact.deployed_bytecode, "0x6001");
        assert_eq!(
            reporter.events(),
            [ReportEvent::Compiling("contracts/Foo.yul".to_string())]
        );
    }

    #[tokio::test]
    async fn warnings_do_not_stop_a_file() {
        let dir = project(&[("Warn.yul", "{ /* WARN */ }")]);
        let reporter = RecordingReporter::new();
        let (report, artifacts) = run(dir.path(), &reporter).await;

        assert!(report.is_success());
        assert_eq!(artifacts.len(), 1);
        assert!(reporter.events().contains(&ReportEvent::Warning(
            "contracts/Warn.yul".to_string(),
            "Warning: shadowed variable".to_string()
        )));
    }

    #[tokio::test]
    async fn transpile_failure_is_isolated_to_its_file() {
        let dir = project(&[
            ("A.yulp", "{ sstore(0, 1) }"),
            ("B.yulp", "{ let s := sig\"function broken(\" }"),
            ("C.yulp", "{ sstore(1, 2) }"),
        ]);
        let reporter = RecordingReporter::new();
        let (report, artifacts) = run(dir.path(), &reporter).await;

        assert_eq!(report.sunk, ["contracts/A.yulp", "contracts/C.yulp"]);
        assert_eq!(artifacts.len(), 2);
        assert_eq!(report.failures.len(), 1);
        let failure = &report.failures[0];
        assert_eq!(failure.source_name, "contracts/B.yulp");
        assert_eq!(failure.stage, Stage::Transpiled);
        assert!(matches!(failure.error, CompileError::DialectSyntax(_)));

        let failed: Vec<_> = reporter
            .events()
            .into_iter()
            .filter(|event| matches!(event, ReportEvent::Failed(..)))
            .collect();
        assert_eq!(failed.len(), 1);
        assert!(matches!(&failed[0], ReportEvent::Failed(name, _) if name == "contracts/B.yulp"));
    }

    #[tokio::test]
    async fn missing_runtime_code_yields_empty_deployed_bytecode() {
        let dir = project(&[("Init.yul", "{ /* NORUNTIME */ }")]);
        let reporter = RecordingReporter::new();
        let (_, artifacts) = run(dir.path(), &reporter).await;
        assert_eq!(artifacts[0].deployed_bytecode, "0x");
    }

    #[tokio::test]
    async fn yulp_artifacts_carry_synthesized_abi() {
        let dir = project(&[(
            "Token.yulp",
            r#"{
  switch shr(224, calldataload(0))
  case sig"function transfer(address to, uint256 amount)" {
    log1(0, 0, topic"event Transfer(address indexed from, address indexed to, uint256 amount)")
  }
}"#,
        )]);
        let reporter = RecordingReporter::new();
        let (report, artifacts) = run(dir.path(), &reporter).await;

        assert!(report.is_success());
        assert_eq!(
            artifacts[0].abi,
            [
                AbiFragment::Function("function transfer(address to, uint256 amount)".to_string()),
                AbiFragment::Event(
                    "event Transfer(address indexed from, address indexed to, uint256 amount)"
                        .to_string()
                ),
            ]
        );
        assert_eq!(artifacts[0].contract_name, "Token");
    }

    #[tokio::test]
    async fn error_diagnostics_without_output_fail_the_file() {
        let dir = project(&[("Bad.yul", "{ BROKEN }"), ("Good.yul", "{}")]);
        let reporter = RecordingReporter::new();
        let (report, artifacts) = run(dir.path(), &reporter).await;

        assert_eq!(report.sunk, ["contracts/Good.yul"]);
        assert_eq!(artifacts.len(), 1);
        let failure = &report.failures[0];
        assert_eq!(failure.stage, Stage::Synthesized);
        assert!(matches!(
            &failure.error,
            CompileError::CompilationDiagnostic { messages }
                if messages == &["DeclarationError: undeclared identifier".to_string()]
        ));
    }

    #[tokio::test]
    async fn silent_empty_output_is_no_compiled_output() {
        let dir = project(&[("Empty.yul", "{ /* NOTHING */ }")]);
        let reporter = RecordingReporter::new();
        let (report, _) = run(dir.path(), &reporter).await;
        assert!(matches!(
            report.failures[0].error,
            CompileError::NoCompiledOutput { .. }
        ));
    }

    #[tokio::test]
    async fn unavailable_backend_fails_each_file() {
        let dir = project(&[("A.yul", "{}"), ("B.yul", "{}")]);
        let reporter = RecordingReporter::new();
        let selector = StaticSelector::new();
        let settings = BuildSettings {
            version: "0.4.0".to_string(),
            yul_details: None,
        };
        let pipeline = Pipeline::new(
            dir.path(),
            dir.path().join("contracts"),
            settings,
            &selector,
            &reporter,
        );
        let mut artifacts = Vec::new();
        let report = pipeline.run(&mut artifacts).await;

        assert!(artifacts.is_empty());
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures.iter().all(|failure| {
            failure.stage == Stage::BackendSelected
                && matches!(failure.error, CompileError::BackendUnavailable { .. })
        }));
    }

    #[tokio::test]
    async fn duplicate_contract_names_keep_the_first() {
        let dir = project(&[("A.yul", "{}"), ("nested/A.yul", "{}")]);
        let reporter = RecordingReporter::new();
        let (report, artifacts) = run(dir.path(), &reporter).await;

        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].source_name, "contracts/A.yul");
        let failure = &report.failures[0];
        assert_eq!(failure.source_name, "contracts/nested/A.yul");
        assert!(matches!(
            &failure.error,
            CompileError::DuplicateContractName { first_source, .. } if first_source == "contracts/A.yul"
        ));
    }

    #[tokio::test]
    async fn no_sources_means_no_work() {
        let dir = tempfile::tempdir().expect("tempdir");
        let reporter = RecordingReporter::new();
        let (report, artifacts) = run(dir.path(), &reporter).await;
        assert!(report.is_success());
        assert!(report.sunk.is_empty());
        assert!(artifacts.is_empty());
        assert!(reporter.events().is_empty());
    }
}
