//! Block-comment extraction.
//!
//! Sequential scan per (start, end) token pair with an in-comment flag.
//! Open and close on the same line make a complete block only when
//! non-whitespace content sits strictly between the tokens; an empty
//! `/**/` or `""""""` never yields a block. For symmetric pairs (`"""`)
//! "between" means between the first and last occurrence on the line.
//! An unterminated block at EOF yields nothing without disturbing the
//! blocks that closed before it.

use crate::comment::classify::classify_block;
use crate::comment::patterns::{CommentPattern, TokenPair};
use crate::comment::record::{
    CommentRecord, context_lines, fingerprint, truncate_content,
};
use crate::comment::MAX_LINE_LEN;
use crate::log::log_debug;
use std::path::Path;

/// Byte offsets of non-overlapping occurrences of `needle` in `hay`.
fn occurrences(hay: &str, needle: &str) -> Vec<usize> {
    let mut found = Vec::new();
    let mut from = 0;
    while let Some(pos) = hay[from..].find(needle) {
        found.push(from + pos);
        from += pos + needle.len();
    }
    found
}

/// Whether a line opens AND closes a block with real content in between.
fn completes_on_same_line(line: &str, pair: &TokenPair) -> bool {
    if pair.is_symmetric() {
        let occ = occurrences(line, pair.start);
        if occ.len() < 2 {
            return false;
        }
        let between = &line[occ[0] + pair.start.len()..occ[occ.len() - 1]];
        return !between.trim().is_empty();
    }

    match (line.find(pair.start), line.find(pair.end)) {
        (Some(s), Some(e)) if s + pair.start.len() <= e => {
            !line[s + pair.start.len()..e].trim().is_empty()
        }
        _ => false,
    }
}

/// Strip block tokens and per-line continuation markers, returning the
/// cleaned logical lines of a raw block.
///
/// All of the dialect's block tokens are removed (a Python block opened
/// with `"""` may still contain a stray `'''`), then each line is trimmed,
/// loses one leading `*` (boxed C-style comments), and empty lines drop out.
fn clean_block_lines(raw: &str, pattern: &CommentPattern) -> Vec<String> {
    let mut text = raw.to_string();
    for pair in pattern.multi_line {
        text = text.replace(pair.start, "").replace(pair.end, "");
    }

    text.split('\n')
        .map(|line| {
            let trimmed = line.trim();
            trimmed.strip_prefix('*').unwrap_or(trimmed).trim().to_string()
        })
        .filter(|line| !line.is_empty())
        .collect()
}

/// Extract marker-bearing block comments for one token pair.
pub fn extract(
    path: &Path,
    lines: &[&str],
    pair: &TokenPair,
    pattern: &CommentPattern,
) -> Vec<CommentRecord> {
    let mut records = Vec::new();
    let mut in_comment = false;
    let mut block_start = 0usize;
    let mut block_lines: Vec<&str> = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if line.len() > MAX_LINE_LEN {
            log_debug(
                "comment",
                "line.skip.too_long",
                &format!("{}:{} exceeds {} bytes", path.display(), i + 1, MAX_LINE_LEN),
            );
            continue;
        }

        if !in_comment {
            if !line.contains(pair.start) {
                continue;
            }
            if completes_on_same_line(line, pair) {
                if let Some(record) = build_record(path, lines, i, i, &[line], pattern) {
                    records.push(record);
                }
            } else {
                in_comment = true;
                block_start = i;
                block_lines = vec![line];
            }
            continue;
        }

        block_lines.push(line);
        if line.contains(pair.end) {
            if let Some(record) =
                build_record(path, lines, block_start, i, &block_lines, pattern)
            {
                records.push(record);
            }
            in_comment = false;
            block_lines = Vec::new();
        }
    }

    // A dangling open block at EOF produces no record.
    records
}

/// Clean, classify, and assemble one closed block into a record.
fn build_record(
    path: &Path,
    lines: &[&str],
    start: usize,
    end: usize,
    block_lines: &[&str],
    pattern: &CommentPattern,
) -> Option<CommentRecord> {
    let raw_text = block_lines.join("\n");
    let cleaned = clean_block_lines(&raw_text, pattern);
    let action = classify_block(cleaned.iter().map(String::as_str))?;

    let content = truncate_content(&cleaned.join(" "));
    Some(CommentRecord {
        file_path: path.to_path_buf(),
        start_line: start + 1,
        end_line: (end > start).then_some(end + 1),
        fingerprint: fingerprint(path, start + 1, &content, action),
        content,
        raw_text,
        context_lines: context_lines(lines, start),
        action,
    })
}
