//! Helper functions Yul+ makes available without a declaration.
//!
//! A Yul+ source may call any of these as if they were Yul builtins. The
//! transpiler injects the Yul definition of each helper that a code block
//! actually calls, so plain Yul output never references an undefined name.

/// Metadata about a single injectable helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelperDescriptor {
    /// Name the source calls the helper by.
    pub name: &'static str,

    /// Yul definition inserted into the calling block.
    pub definition: &'static str,
}

/// The complete list of helpers known to the transpiler, in injection order.
pub const HELPERS: &[HelperDescriptor] = &[
    HelperDescriptor {
        name: "require",
        definition: "function require(condition) { if iszero(condition) { revert(0, 0) } }",
    },
    HelperDescriptor {
        name: "mslice",
        definition: "function mslice(position, length) -> result { if gt(length, 32) { revert(0, 0) } result := div(mload(position), exp(2, sub(256, mul(length, 8)))) }",
    },
    HelperDescriptor {
        name: "safeAdd",
        definition: "function safeAdd(x, y) -> z { z := add(x, y) if lt(z, x) { revert(0, 0) } }",
    },
    HelperDescriptor {
        name: "safeSub",
        definition: "function safeSub(x, y) -> z { if lt(x, y) { revert(0, 0) } z := sub(x, y) }",
    },
    HelperDescriptor {
        name: "safeMul",
        definition: "function safeMul(x, y) -> z { if gt(y, 0) { if gt(x, div(not(0), y)) { revert(0, 0) } } z := mul(x, y) }",
    },
    HelperDescriptor {
        name: "safeDiv",
        definition: "function safeDiv(x, y) -> z { if iszero(y) { revert(0, 0) } z := div(x, y) }",
    },
];

/// Look up a helper by the name a source calls it with.
pub fn find_helper(name: &str) -> Option<&'static HelperDescriptor> {
    HELPERS.iter().find(|helper| helper.name == name)
}
