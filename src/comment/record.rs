//! Comment record type and the helpers shared by both extractors:
//! content truncation, context-window capture, fingerprinting.

use crate::comment::classify::ActionKind;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Maximum comment content length before truncation
pub const MAX_COMMENT_LEN: usize = 1000;

/// Suffix appended to truncated content
pub const TRUNCATION_SUFFIX: &str = "...(truncated)";

/// Context lines captured before and after a record's start line
pub const CONTEXT_WINDOW: usize = 5;

/// One marker-bearing comment detected in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRecord {
    /// Source file the comment lives in
    pub file_path: PathBuf,
    /// First physical line of the block (1-indexed)
    pub start_line: usize,
    /// Last physical line for blocks spanning more than one line;
    /// None when the record is exactly one line
    pub end_line: Option<usize>,
    /// Marker-bearing text with comment syntax stripped and physical lines
    /// joined by single spaces; truncated at MAX_COMMENT_LEN
    pub content: String,
    /// The untouched original comment block, never truncated
    pub raw_text: String,
    /// Surrounding source lines for readability
    pub context_lines: Vec<String>,
    /// Which marker the block resolved to
    pub action: ActionKind,
    /// Stable digest for deduplication
    pub fingerprint: String,
}

impl CommentRecord {
    /// Human location phrase: "at line N" or "at lines N-M".
    pub fn location(&self) -> String {
        match self.end_line {
            Some(end) if end != self.start_line => {
                format!("at lines {}-{}", self.start_line, end)
            }
            _ => format!("at line {}", self.start_line),
        }
    }
}

/// Truncate comment content if it exceeds MAX_COMMENT_LEN.
///
/// Cuts on a char boundary so multi-byte text can't split a code point.
pub fn truncate_content(content: &str) -> String {
    if content.len() <= MAX_COMMENT_LEN {
        return content.to_string();
    }
    let mut cut = MAX_COMMENT_LEN;
    while !content.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{}", &content[..cut], TRUNCATION_SUFFIX)
}

/// Capture CONTEXT_WINDOW lines before and after `target` (0-indexed into
/// `lines`), numbering each and marking the target line with `>`.
pub fn context_lines(lines: &[&str], target: usize) -> Vec<String> {
    let start = target.saturating_sub(CONTEXT_WINDOW);
    let end = (target + CONTEXT_WINDOW + 1).min(lines.len());

    (start..end)
        .map(|i| {
            let prefix = if i == target { "> " } else { "  " };
            format!("{}{}: {}", prefix, i + 1, lines[i])
        })
        .collect()
}

/// Fingerprint a comment occurrence for deduplication.
///
/// Identical (path, start line, content, action) always digest identically;
/// 8 bytes of SHA-256 keeps collisions negligible for realistic working sets.
pub fn fingerprint(path: &Path, start_line: usize, content: &str, action: ActionKind) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!(
        "{}:{}:{}:{}",
        path.display(),
        start_line,
        content,
        action.marker()
    ));
    let digest = hasher.finalize();
    digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_content_untouched() {
        assert_eq!(truncate_content("short comment"), "short comment");
    }

    #[test]
    fn test_truncate_exactly_at_limit_untouched() {
        let s = "x".repeat(MAX_COMMENT_LEN);
        assert_eq!(truncate_content(&s), s);
    }

    #[test]
    fn test_truncate_long_content_gets_suffix() {
        let s = "y".repeat(MAX_COMMENT_LEN + 50);
        let out = truncate_content(&s);
        assert!(out.ends_with(TRUNCATION_SUFFIX));
        assert_eq!(out.len(), MAX_COMMENT_LEN + TRUNCATION_SUFFIX.len());
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        // Fill so a multi-byte char straddles the cut point.
        let mut s = "a".repeat(MAX_COMMENT_LEN - 1);
        s.push_str("日本語のコメント");
        let out = truncate_content(&s);
        assert!(out.ends_with(TRUNCATION_SUFFIX));
        // No panic and everything before the suffix is valid UTF-8 by construction.
        assert!(out.len() <= MAX_COMMENT_LEN + TRUNCATION_SUFFIX.len());
    }

    #[test]
    fn test_context_window_mid_file() {
        let lines: Vec<String> = (1..=20).map(|i| format!("line {}", i)).collect();
        let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
        let ctx = context_lines(&refs, 9); // line 10

        assert_eq!(ctx.len(), CONTEXT_WINDOW * 2 + 1);
        assert_eq!(ctx.first().unwrap(), "  5: line 5");
        assert!(ctx.contains(&"> 10: line 10".to_string()));
        assert_eq!(ctx.last().unwrap(), "  15: line 15");
    }

    #[test]
    fn test_context_window_clamps_at_file_start() {
        let refs = vec!["a", "b", "c"];
        let ctx = context_lines(&refs, 0);
        assert_eq!(ctx[0], "> 1: a");
        assert_eq!(ctx.len(), 3);
    }

    #[test]
    fn test_context_window_clamps_at_file_end() {
        let refs = vec!["a", "b", "c"];
        let ctx = context_lines(&refs, 2);
        assert_eq!(ctx.last().unwrap(), "> 3: c");
        assert_eq!(ctx.len(), 3);
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let p = Path::new("test.go");
        let a = fingerprint(p, 5, "Test comment", ActionKind::Question);
        let b = fingerprint(p, 5, "Test comment", ActionKind::Question);
        assert_eq!(a, b);
        assert_eq!(a.len(), 16); // 8 bytes hex
    }

    #[test]
    fn test_fingerprint_sensitive_to_each_field() {
        let p = Path::new("test.go");
        let base = fingerprint(p, 5, "Test comment", ActionKind::Question);

        assert_ne!(base, fingerprint(Path::new("other.go"), 5, "Test comment", ActionKind::Question));
        assert_ne!(base, fingerprint(p, 6, "Test comment", ActionKind::Question));
        assert_ne!(base, fingerprint(p, 5, "Different content", ActionKind::Question));
        assert_ne!(base, fingerprint(p, 5, "Test comment", ActionKind::Command));
    }

    #[test]
    fn test_location_phrasing() {
        let single = CommentRecord {
            file_path: PathBuf::from("test.go"),
            start_line: 5,
            end_line: None,
            content: "x".into(),
            raw_text: "x".into(),
            context_lines: vec![],
            action: ActionKind::Question,
            fingerprint: String::new(),
        };
        assert_eq!(single.location(), "at line 5");

        let multi = CommentRecord { end_line: Some(8), ..single.clone() };
        assert_eq!(multi.location(), "at lines 5-8");

        // Same-line block: end equal to start renders as a single line.
        let same = CommentRecord { end_line: Some(5), ..single };
        assert_eq!(same.location(), "at line 5");
    }
}
