//! Interface declarations found in Yul+ sources.
//!
//! `sig"..."` and `topic"..."` literals carry a human-readable function or
//! event declaration. This module canonicalizes those declarations, hashes
//! them, and turns them into ABI fragments for the artifact.

use serde::{Serialize, Serializer};
use sha3::{Digest, Keccak256};

/// Framing around a function declaration: `sig"` ... `"`.
pub const SIG_PREFIX: &str = "sig\"";
/// Framing around an event declaration: `topic"` ... `"`.
pub const TOPIC_PREFIX: &str = "topic\"";

/// A `sig"..."` literal and its 4-byte selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Literal exactly as written, framing included.
    pub raw: String,
    /// `name(type,...)`
    pub canonical: String,
    pub selector: [u8; 4],
}

/// A `topic"..."` literal and its 32-byte event topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub raw: String,
    pub canonical: String,
    pub hash: [u8; 32],
}

impl Signature {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let declaration = strip_framing(raw, SIG_PREFIX)?;
        let canonical = canonical_declaration(declaration, "function")?;
        let digest = keccak256(&canonical);
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&digest[..4]);
        Ok(Self {
            raw: raw.to_string(),
            canonical,
            selector,
        })
    }

    /// Hex literal that replaces the `sig"..."` in emitted Yul.
    pub fn literal(&self) -> String {
        format!("0x{}", hex::encode(self.selector))
    }
}

impl Topic {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let declaration = strip_framing(raw, TOPIC_PREFIX)?;
        let canonical = canonical_declaration(declaration, "event")?;
        Ok(Self {
            raw: raw.to_string(),
            hash: keccak256(&canonical),
            canonical,
        })
    }

    pub fn literal(&self) -> String {
        format!("0x{}", hex::encode(self.hash))
    }
}

/// One entry of a synthesized ABI, in human-readable form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiFragment {
    Function(String),
    Event(String),
}

impl AbiFragment {
    pub fn as_str(&self) -> &str {
        match self {
            AbiFragment::Function(text) | AbiFragment::Event(text) => text,
        }
    }
}

impl From<&Signature> for AbiFragment {
    fn from(signature: &Signature) -> Self {
        AbiFragment::Function(unframe(&signature.raw, SIG_PREFIX).to_string())
    }
}

impl From<&Topic> for AbiFragment {
    fn from(topic: &Topic) -> Self {
        AbiFragment::Event(unframe(&topic.raw, TOPIC_PREFIX).to_string())
    }
}

impl Serialize for AbiFragment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Drops the prefix and the closing quote. `raw` was produced by the
/// lexer, so both are known to be present.
fn unframe<'a>(raw: &'a str, prefix: &str) -> &'a str {
    raw.get(prefix.len()..raw.len().saturating_sub(1))
        .unwrap_or_default()
}

fn strip_framing<'a>(raw: &'a str, prefix: &str) -> Result<&'a str, String> {
    if raw.len() > prefix.len() && raw.starts_with(prefix) && raw.ends_with('"') {
        Ok(unframe(raw, prefix))
    } else {
        Err(format!("expected {prefix}...\" literal"))
    }
}

fn keccak256(text: &str) -> [u8; 32] {
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&Keccak256::digest(text.as_bytes()));
    hash
}

/// `function transfer(address to, uint amount) returns (bool)` →
/// `transfer(address,uint256)`.
fn canonical_declaration(declaration: &str, keyword: &str) -> Result<String, String> {
    let declaration = declaration.trim();
    let rest = declaration
        .strip_prefix(keyword)
        .filter(|rest| rest.starts_with(char::is_whitespace))
        .ok_or_else(|| format!("declaration must start with '{keyword}'"))?
        .trim_start();

    let open = rest
        .find('(')
        .ok_or_else(|| format!("missing parameter list in '{declaration}'"))?;
    let name = rest[..open].trim_end();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
        return Err(format!("invalid {keyword} name '{name}'"));
    }

    let close = matching_paren(rest, open)
        .ok_or_else(|| format!("unbalanced parentheses in '{declaration}'"))?;
    let params = canonical_params(&rest[open + 1..close])?;
    Ok(format!("{name}({params})"))
}

fn canonical_params(list: &str) -> Result<String, String> {
    if list.trim().is_empty() {
        return Ok(String::new());
    }
    split_top_level(list)
        .into_iter()
        .map(canonical_param)
        .collect::<Result<Vec<_>, _>>()
        .map(|params| params.join(","))
}

fn canonical_param(param: &str) -> Result<String, String> {
    let param = param.trim();
    if param.is_empty() {
        return Err("empty parameter".to_string());
    }
    let tuple = param.strip_prefix("tuple").unwrap_or(param);
    if tuple.starts_with('(') {
        let close =
            matching_paren(tuple, 0).ok_or_else(|| format!("unbalanced tuple '{param}'"))?;
        let inner = canonical_params(&tuple[1..close])?;
        let suffix = tuple[close + 1..]
            .split_whitespace()
            .next()
            .filter(|s| s.starts_with('['))
            .unwrap_or("");
        return Ok(format!("({inner}){suffix}"));
    }
    let ty = param.split_whitespace().next().unwrap_or(param);
    Ok(normalize_type(ty))
}

fn normalize_type(ty: &str) -> String {
    let split = ty.find('[').unwrap_or(ty.len());
    let (base, dims) = ty.split_at(split);
    let base = match base {
        "uint" => "uint256",
        "int" => "int256",
        "byte" => "bytes1",
        other => other,
    };
    format!("{base}{dims}")
}

fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (index, ch) in text.char_indices().skip_while(|(i, _)| *i < open) {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (index, ch) in list.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&list[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts
}
