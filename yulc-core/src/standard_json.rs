//! `solc --standard-json` input and output, restricted to what a
//! single-file Yul compilation sends and reads back.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Virtual filename every source is compiled under.
pub const VIRTUAL_SOURCE: &str = "Target.yul";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompilerInput {
    pub language: &'static str,
    pub sources: BTreeMap<String, SourceContent>,
    pub settings: Settings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceContent {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub output_selection: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    pub optimizer: Optimizer,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Optimizer {
    pub enabled: bool,
    pub runs: u32,
    pub details: OptimizerDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizerDetails {
    pub yul: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yul_details: Option<Map<String, Value>>,
}

impl CompilerInput {
    /// A single Yul source with every output selected and the optimizer
    /// on at zero runs.
    pub fn yul(content: impl Into<String>, yul_details: Option<Map<String, Value>>) -> Self {
        let everything = vec!["*".to_string()];
        let per_contract = BTreeMap::from([
            ("*".to_string(), everything.clone()),
            (String::new(), everything),
        ]);
        Self {
            language: "Yul",
            sources: BTreeMap::from([(
                VIRTUAL_SOURCE.to_string(),
                SourceContent {
                    content: content.into(),
                },
            )]),
            settings: Settings {
                output_selection: BTreeMap::from([("*".to_string(), per_contract)]),
                optimizer: Optimizer {
                    enabled: true,
                    runs: 0,
                    details: OptimizerDetails {
                        yul: true,
                        yul_details,
                    },
                },
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CompilerOutput {
    #[serde(default)]
    pub errors: Vec<Diagnostic>,
    /// virtual filename -> contract object name -> compiled object, in the
    /// order the backend reported them.
    #[serde(default)]
    pub contracts: BTreeMap<String, IndexMap<String, CompiledContract>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Severity {
    Warning,
    Error,
}

impl From<String> for Severity {
    fn from(value: String) -> Self {
        if value == "warning" {
            Severity::Warning
        } else {
            Severity::Error
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub formatted_message: Option<String>,
}

impl Diagnostic {
    /// The backend's pre-rendered text, falling back to the bare message.
    pub fn text(&self) -> &str {
        self.formatted_message
            .as_deref()
            .unwrap_or(&self.message)
            .trim_end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CompiledContract {
    #[serde(default)]
    pub evm: Evm,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evm {
    #[serde(default)]
    pub bytecode: Option<Bytecode>,
    #[serde(default)]
    pub deployed_bytecode: Option<Bytecode>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bytecode {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub function_debug_data: Option<Value>,
}
