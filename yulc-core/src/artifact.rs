//! Artifact records and where they go once synthesized.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::abi::{AbiFragment, Signature, Topic};
use crate::error::CompileError;
use crate::sources::SourceFile;
use crate::standard_json::{Bytecode, CompilerOutput, VIRTUAL_SOURCE};

/// Schema tag understood by the artifact store.
pub const ARTIFACT_FORMAT: &str = "hh-sol-artifact-1";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(rename = "_format")]
    pub format: &'static str,
    pub contract_name: String,
    pub source_name: String,
    pub abi: Vec<AbiFragment>,
    /// `0x`-prefixed creation code.
    pub bytecode: String,
    /// `0x`-prefixed runtime code; exactly `0x` when there is none.
    pub deployed_bytecode: String,
    /// Always empty: Yul artifacts never link libraries.
    pub link_references: BTreeMap<String, Value>,
    pub deployed_link_references: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_debug_data: Option<Value>,
}

/// Function fragments followed by event fragments.
pub fn synthesize_abi(signatures: &[Signature], topics: &[Topic]) -> Vec<AbiFragment> {
    signatures
        .iter()
        .map(AbiFragment::from)
        .chain(topics.iter().map(AbiFragment::from))
        .collect()
}

/// Builds the artifact for `file` from the backend output.
///
/// The first contract object reported under the virtual source wins. Yul
/// sources compile to a single object, so any further objects are only
/// logged.
pub fn synthesize(
    output: &CompilerOutput,
    file: &SourceFile,
    abi: Vec<AbiFragment>,
) -> Result<Artifact, CompileError> {
    let no_output = || CompileError::NoCompiledOutput {
        source_name: file.source_name.clone(),
    };
    let objects = output.contracts.get(VIRTUAL_SOURCE).ok_or_else(no_output)?;
    let (object_name, contract) = objects.first().ok_or_else(no_output)?;
    if objects.len() > 1 {
        let ignored: Vec<&str> = objects.keys().skip(1).map(String::as_str).collect();
        warn!(
            source = %file.source_name,
            selected = %object_name,
            ?ignored,
            "backend reported several contract objects; using the first"
        );
    }

    let bytecode = hex_field(file, "bytecode", contract.evm.bytecode.as_ref())?;
    let deployed_bytecode =
        hex_field(file, "deployedBytecode", contract.evm.deployed_bytecode.as_ref())?;

    Ok(Artifact {
        format: ARTIFACT_FORMAT,
        contract_name: file.contract_name.clone(),
        source_name: file.source_name.clone(),
        abi,
        bytecode,
        deployed_bytecode,
        link_references: BTreeMap::new(),
        deployed_link_references: BTreeMap::new(),
        function_debug_data: contract
            .evm
            .bytecode
            .as_ref()
            .and_then(|code| code.function_debug_data.clone()),
    })
}

fn hex_field(
    file: &SourceFile,
    field: &'static str,
    code: Option<&Bytecode>,
) -> Result<String, CompileError> {
    let object = code.map_or("", |code| code.object.as_str());
    let payload = object.strip_prefix("0x").unwrap_or(object);
    hex::decode(payload).map_err(|_| CompileError::InvalidBytecode {
        contract: file.contract_name.clone(),
        field,
        value: object.to_string(),
    })?;
    Ok(format!("0x{payload}"))
}

/// Receives artifacts one at a time as files finish compiling.
pub trait ArtifactSink: Send {
    fn record(&mut self, artifact: Artifact) -> Result<(), CompileError>;
}

impl ArtifactSink for Vec<Artifact> {
    fn record(&mut self, artifact: Artifact) -> Result<(), CompileError> {
        self.push(artifact);
        Ok(())
    }
}

/// Writes `<root>/<sourceName>/<contractName>.json`.
#[derive(Debug, Clone)]
pub struct FsArtifactSink {
    root: PathBuf,
    written: Vec<PathBuf>,
}

impl FsArtifactSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            written: Vec::new(),
        }
    }

    pub fn artifact_path(&self, artifact: &Artifact) -> PathBuf {
        self.root
            .join(&artifact.source_name)
            .join(format!("{}.json", artifact.contract_name))
    }

    /// Every file written so far, in recording order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ArtifactSink for FsArtifactSink {
    fn record(&mut self, artifact: Artifact) -> Result<(), CompileError> {
        let path = self.artifact_path(&artifact);
        let json = serde_json::to_string_pretty(&artifact)
            .map_err(|err| CompileError::Sink(format!("failed to encode artifact: {err}")))?;
        write_file(&path, json.as_bytes())?;
        debug!(path = %path.display(), "wrote artifact");
        self.written.push(path);
        Ok(())
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), CompileError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            CompileError::Sink(format!("failed to create directory {}: {err}", parent.display()))
        })?;
    }
    fs::write(path, bytes)
        .map_err(|err| CompileError::Sink(format!("failed to write {}: {err}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::Dialect;
    use crate::standard_json::{CompiledContract, Evm};
    use indexmap::IndexMap;
    use serde_json::json;

    fn file() -> SourceFile {
        SourceFile::new(
            Path::new("/project"),
            PathBuf::from("/project/contracts/Foo.yul"),
            Dialect::Yul,
        )
    }

    fn code(object: &str) -> Option<Bytecode> {
        Some(Bytecode {
            object: object.to_string(),
            function_debug_data: None,
        })
    }

    fn output_with(objects: Vec<(&str, Evm)>) -> CompilerOutput {
        let objects: IndexMap<String, CompiledContract> = objects
            .into_iter()
            .map(|(name, evm)| (name.to_string(), CompiledContract { evm }))
            .collect();
        CompilerOutput {
            errors: Vec::new(),
            contracts: BTreeMap::from([(VIRTUAL_SOURCE.to_string(), objects)]),
        }
    }

    #[test]
    fn plain_yul_has_empty_abi_and_hex_bytecode() {
        let output = output_with(vec![(
            "Foo",
            Evm {
                bytecode: code("6080604052"),
                deployed_bytecode: code("6080"),
            },
        )]);
        let artifact = synthesize(&output, &file(), Vec::new()).expect("synthesize");
        assert_eq!(artifact.format, "hh-sol-artifact-1");
        assert_eq!(artifact.contract_name, "Foo");
        assert_eq!(artifact.source_name, "contracts/Foo.yul");
        assert!(artifact.abi.is_empty());
        assert_eq!(artifact.bytecode, "0x6080604052");
        assert_eq!(artifact.deployed_bytecode, "0x6080");
    }

    #[test]
    fn missing_runtime_code_defaults_to_empty_payload() {
        let output = output_with(vec![(
            "Foo",
            Evm {
                bytecode: code("00"),
                deployed_bytecode: None,
            },
        )]);
        let artifact = synthesize(&output, &file(), Vec::new()).expect("synthesize");
        assert_eq!(artifact.deployed_bytecode, "0x");
    }

    #[test]
    fn does_not_double_prefix() {
        let output = output_with(vec![(
            "Foo",
            Evm {
                bytecode: code("0x00"),
                deployed_bytecode: code(""),
            },
        )]);
        let artifact = synthesize(&output, &file(), Vec::new()).expect("synthesize");
        assert_eq!(artifact.bytecode, "0x00");
        assert_eq!(artifact.deployed_bytecode, "0x");
    }

    #[test]
    fn rejects_non_hex_payloads() {
        let output = output_with(vec![(
            "Foo",
            Evm {
                bytecode: code("__$lib$__"),
                deployed_bytecode: None,
            },
        )]);
        let err = synthesize(&output, &file(), Vec::new()).unwrap_err();
        assert!(matches!(err, CompileError::InvalidBytecode { field: "bytecode", .. }));
    }

    #[test]
    fn zero_objects_is_fatal() {
        let err = synthesize(&output_with(Vec::new()), &file(), Vec::new()).unwrap_err();
        assert!(matches!(err, CompileError::NoCompiledOutput { .. }));
        let err = synthesize(&CompilerOutput::default(), &file(), Vec::new()).unwrap_err();
        assert!(matches!(err, CompileError::NoCompiledOutput { .. }));
    }

    #[test]
    fn first_object_wins() {
        let output = output_with(vec![
            ("Second", Evm { bytecode: code("02"), deployed_bytecode: None }),
            ("First", Evm { bytecode: code("01"), deployed_bytecode: None }),
        ]);
        let artifact = synthesize(&output, &file(), Vec::new()).expect("synthesize");
        assert_eq!(artifact.bytecode, "0x02");
        assert_eq!(artifact.contract_name, "Foo", "named after the file, not the object");
    }

    #[test]
    fn carries_debug_data_through() {
        let debug_data = json!({ "fun_f_1": { "entryPoint": 12, "id": null } });
        let output = output_with(vec![(
            "Foo",
            Evm {
                bytecode: Some(Bytecode {
                    object: "00".to_string(),
                    function_debug_data: Some(debug_data.clone()),
                }),
                deployed_bytecode: None,
            },
        )]);
        let artifact = synthesize(&output, &file(), Vec::new()).expect("synthesize");
        assert_eq!(artifact.function_debug_data, Some(debug_data));
    }

    #[test]
    fn abi_lists_functions_then_events_without_framing() {
        let signatures = vec![Signature::parse(r#"sig"function balanceOf(address owner)""#).expect("sig")];
        let topics = vec![Topic::parse(r#"topic"event Approval(address indexed owner)""#).expect("topic")];
        let abi = synthesize_abi(&signatures, &topics);
        assert_eq!(
            abi,
            vec![
                AbiFragment::Function("function balanceOf(address owner)".to_string()),
                AbiFragment::Event("event Approval(address indexed owner)".to_string()),
            ]
        );
    }

    #[test]
    fn serializes_the_artifact_record_shape() {
        let output = output_with(vec![("Foo", Evm { bytecode: code("00"), deployed_bytecode: None })]);
        let artifact = synthesize(&output, &file(), Vec::new()).expect("synthesize");
        assert_eq!(
            serde_json::to_value(&artifact).expect("serialize"),
            json!({
                "_format": "hh-sol-artifact-1",
                "contractName": "Foo",
                "sourceName": "contracts/Foo.yul",
                "abi": [],
                "bytecode": "0x00",
                "deployedBytecode": "0x",
                "linkReferences": {},
                "deployedLinkReferences": {}
            })
        );
    }

    #[test]
    fn fs_sink_uses_source_name_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = output_with(vec![("Foo", Evm { bytecode: code("00"), deployed_bytecode: None })]);
        let artifact = synthesize(&output, &file(), Vec::new()).expect("synthesize");

        let mut sink = FsArtifactSink::new(dir.path());
        sink.record(artifact).expect("record");

        let expected = dir.path().join("contracts/Foo.yul/Foo.json");
        assert_eq!(sink.written(), [expected.clone()]);
        let written: Value =
            serde_json::from_str(&fs::read_to_string(expected).expect("read")).expect("json");
        assert_eq!(written["contractName"], "Foo");
    }

    #[test]
    fn fs_sink_keeps_outside_sources_under_its_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let outside = SourceFile::new(
            Path::new("/project"),
            PathBuf::from("/shared/contracts/Foo.yul"),
            Dialect::Yul,
        );
        let output = output_with(vec![("Foo", Evm { bytecode: code("00"), deployed_bytecode: None })]);
        let artifact = synthesize(&output, &outside, Vec::new()).expect("synthesize");

        let sink = FsArtifactSink::new(dir.path());
        let path = sink.artifact_path(&artifact);
        assert!(path.starts_with(dir.path()));
        assert_eq!(path, dir.path().join("shared/contracts/Foo.yul/Foo.json"));
    }
}
