//! Per-extension comment grammar tables.
//!
//! Each supported file extension maps to the lexical tokens used to
//! recognize comments in that file type: single-line prefix tokens plus
//! (start, end) pairs for block comments. One shared scanning algorithm
//! consumes these tables, so adding a dialect is a data change here, not a
//! code change in the extractors.

/// Start/end tokens for a block comment form.
///
/// Symmetric pairs (e.g. `"""` / `"""`) are allowed; the extractor treats
/// them specially when open and close land on the same line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPair {
    pub start: &'static str,
    pub end: &'static str,
}

impl TokenPair {
    pub fn is_symmetric(&self) -> bool {
        self.start == self.end
    }
}

/// Comment grammar for one family of file types.
#[derive(Debug, Clone, Copy)]
pub struct CommentPattern {
    /// Single-line comment prefix tokens (e.g. `//`, `#`)
    pub single_line: &'static [&'static str],
    /// Block comment token pairs (e.g. `/*` ... `*/`)
    pub multi_line: &'static [TokenPair],
}

const C_STYLE: CommentPattern = CommentPattern {
    single_line: &["//"],
    multi_line: &[TokenPair { start: "/*", end: "*/" }],
};

const PYTHON: CommentPattern = CommentPattern {
    single_line: &["#"],
    multi_line: &[
        TokenPair { start: "\"\"\"", end: "\"\"\"" },
        TokenPair { start: "'''", end: "'''" },
    ],
};

const HASH_ONLY: CommentPattern = CommentPattern {
    single_line: &["#"],
    multi_line: &[],
};

/// Look up the comment grammar for a file extension (with leading dot).
///
/// Returns None for unregistered extensions; callers short-circuit with an
/// empty result rather than an error.
pub fn for_extension(ext: &str) -> Option<&'static CommentPattern> {
    match ext {
        ".go" | ".js" | ".jsx" | ".ts" | ".tsx" | ".rs" | ".c" | ".h" | ".cpp" | ".java" => {
            Some(&C_STYLE)
        }
        ".py" => Some(&PYTHON),
        ".sh" => Some(&HASH_ONLY),
        _ => None,
    }
}

/// Whether any comment grammar is registered for this extension.
pub fn is_supported(ext: &str) -> bool {
    for_extension(ext).is_some()
}

/// Extract the extension (with leading dot) from a path, if any.
pub fn extension_of(path: &std::path::Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
}
