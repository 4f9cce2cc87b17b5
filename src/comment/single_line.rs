//! Single-line comment extraction.
//!
//! One forward pass over the file's lines. A line whose only content is a
//! comment ("whole-line") opens a group that greedily absorbs subsequent
//! whole-line comments of the same token, marker-bearing or not; the group
//! closes at the first line that isn't one (code, blank, or an inline
//! comment). Inline (trailing) comments are always standalone records and
//! never join a group.

use crate::comment::classify::classify_block;
use crate::comment::record::{
    CommentRecord, context_lines, fingerprint, truncate_content,
};
use crate::comment::MAX_LINE_LEN;
use crate::log::log_debug;
use std::path::Path;

/// Comment body after the first token occurrence, trimmed.
/// Later occurrences of the token stay part of the body.
fn body_after_token(line: &str, token: &str) -> Option<String> {
    line.find(token)
        .map(|idx| line[idx + token.len()..].trim().to_string())
}

/// A line is a whole-line comment when nothing but whitespace precedes the token.
fn is_whole_line_comment(line: &str, token: &str) -> bool {
    match line.find(token) {
        Some(idx) => line[..idx].trim().is_empty(),
        None => false,
    }
}

/// Extract marker-bearing single-line comments for one comment token.
///
/// `lines` is the full file split on `\n`; records come back in line order.
pub fn extract(path: &Path, lines: &[&str], token: &str) -> Vec<CommentRecord> {
    let mut records = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if line.len() > MAX_LINE_LEN {
            log_debug(
                "comment",
                "line.skip.too_long",
                &format!("{}:{} exceeds {} bytes", path.display(), i + 1, MAX_LINE_LEN),
            );
            i += 1;
            continue;
        }

        let Some(idx) = line.find(token) else {
            i += 1;
            continue;
        };

        if line[..idx].trim().is_empty() {
            // Whole-line comment: absorb the contiguous run below it.
            let mut end = i;
            while end + 1 < lines.len() && is_whole_line_comment(lines[end + 1], token) {
                end += 1;
            }

            let bodies: Vec<String> = (i..=end)
                .filter_map(|j| body_after_token(lines[j], token))
                .filter(|b| !b.is_empty())
                .collect();

            if let Some(action) = classify_block(bodies.iter().map(String::as_str)) {
                let combined = bodies.join(" ");
                let content = truncate_content(&combined);
                let raw_text = lines[i..=end].join("\n");
                records.push(CommentRecord {
                    file_path: path.to_path_buf(),
                    start_line: i + 1,
                    end_line: (end > i).then_some(end + 1),
                    fingerprint: fingerprint(path, i + 1, &content, action),
                    content,
                    raw_text,
                    context_lines: context_lines(lines, i),
                    action,
                });
            }

            i = end + 1;
        } else {
            // Inline comment: always a standalone single-line record.
            if let Some(body) = body_after_token(line, token) {
                if let Some(action) = classify_block([body.as_str()]) {
                    let content = truncate_content(&body);
                    records.push(CommentRecord {
                        file_path: path.to_path_buf(),
                        start_line: i + 1,
                        end_line: None,
                        fingerprint: fingerprint(path, i + 1, &content, action),
                        content,
                        raw_text: line.to_string(),
                        context_lines: context_lines(lines, i),
                        action,
                    });
                }
            }
            i += 1;
        }
    }

    records
}
