//! File-level opt-out scanning.
//!
//! A file whose comments contain the sentinel anywhere (single-line body
//! or multi-line block, any position, any case) is excluded
//! from extraction entirely. All-or-nothing: one sentinel suppresses every
//! marker in the file.

use crate::comment::patterns::CommentPattern;

/// Case-insensitive sentinel that disables extraction for a whole file.
pub const OPT_OUT_SENTINEL: &str = "no_aiwatch";

/// Whether `content` opts the file out of marker extraction.
pub fn file_opts_out(content: &str, pattern: &CommentPattern) -> bool {
    let lines: Vec<&str> = content.split('\n').collect();

    // Single-line comment bodies.
    for line in &lines {
        for token in pattern.single_line {
            if let Some(idx) = line.find(token) {
                let body = &line[idx + token.len()..];
                if body.to_lowercase().contains(OPT_OUT_SENTINEL) {
                    return true;
                }
            }
        }
    }

    // Multi-line blocks, tokenized the same way the extractor does.
    for pair in pattern.multi_line {
        let mut in_comment = false;
        let mut block = String::new();

        for line in &lines {
            if !in_comment {
                if !line.contains(pair.start) {
                    continue;
                }
                in_comment = true;
                block.clear();
                block.push_str(line);
                // A same-line close (or symmetric token repeated) ends the
                // block immediately.
                let rest = &line[line.find(pair.start).unwrap() + pair.start.len()..];
                if rest.contains(pair.end) {
                    if block.to_lowercase().contains(OPT_OUT_SENTINEL) {
                        return true;
                    }
                    in_comment = false;
                }
                continue;
            }

            block.push('\n');
            block.push_str(line);
            if line.contains(pair.end) {
                if block.to_lowercase().contains(OPT_OUT_SENTINEL) {
                    return true;
                }
                in_comment = false;
            }
        }

        // Dangling block at EOF still counts: the sentinel's intent is clear
        // even if the comment never closes.
        if in_comment && block.to_lowercase().contains(OPT_OUT_SENTINEL) {
            return true;
        }
    }

    false
}
