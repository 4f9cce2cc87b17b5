//! Comment-marker extraction engine.
//!
//! Scans source text for `AI?` / `AI!` / `AI:` tagged comments across the
//! registered comment dialects, groups adjacent comments into blocks,
//! classifies them, and produces [`CommentRecord`]s ready for prompt
//! rendering. Detection is lexical per file extension, not syntax-aware:
//! a marker inside a string literal can false-positive, which is an
//! accepted trade for never parsing the language.

pub mod cache;
pub mod classify;
pub mod opt_out;
pub mod patterns;
pub mod prompt;
pub mod record;

mod multi_line;
mod single_line;

pub use cache::ProcessedCache;
pub use classify::ActionKind;
pub use record::CommentRecord;

use crate::log::{log_debug, log_info};
use std::path::Path;

/// Skip files larger than this (bytes)
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Skip individual lines longer than this (bytes)
pub const MAX_LINE_LEN: usize = 10 * 1024;

/// Skip files with more lines than this
pub const MAX_TOTAL_LINES: usize = 50_000;

/// I/O-class failures of the owning-read extraction entry point.
///
/// Unsupported extensions, empty content, and resource-limit skips are not
/// errors; they yield an empty result.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to stat {path}: {source}")]
    Stat {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
}

/// Extract marker comments from already-read file content.
///
/// Returns an empty vec for unregistered extensions, opted-out files, and
/// over-limit content. Records come back in ascending start-line order.
pub fn extract_from_content(path: &Path, content: &str) -> Vec<CommentRecord> {
    let Some(ext) = patterns::extension_of(path) else {
        return Vec::new();
    };
    let Some(pattern) = patterns::for_extension(&ext) else {
        log_debug(
            "comment",
            "extract.skip.unsupported",
            &format!("no comment grammar for {}", ext),
        );
        return Vec::new();
    };

    if opt_out::file_opts_out(content, pattern) {
        log_info(
            "comment",
            "extract.skip.opt_out",
            &format!("{} carries the opt-out sentinel", path.display()),
        );
        return Vec::new();
    }

    let lines: Vec<&str> = content.split('\n').collect();
    if lines.len() > MAX_TOTAL_LINES {
        log_info(
            "comment",
            "extract.skip.too_many_lines",
            &format!("{}: {} lines exceeds limit {}", path.display(), lines.len(), MAX_TOTAL_LINES),
        );
        return Vec::new();
    }

    let mut records = Vec::new();
    for token in pattern.single_line {
        records.extend(single_line::extract(path, &lines, token));
    }
    for pair in pattern.multi_line {
        records.extend(multi_line::extract(path, &lines, pair, pattern));
    }

    // Single-line and multi-line passes each emit in order; merge them.
    records.sort_by_key(|r| r.start_line);

    log_debug(
        "comment",
        "extract.done",
        &format!("{} records in {}", records.len(), path.display()),
    );
    records
}

/// Extract marker comments from a file on disk, owning the read.
///
/// Size limits are enforced before reading; over-limit files yield an empty
/// `Ok`. Only stat/read failures surface as errors.
pub fn extract_from_path(path: &Path) -> Result<Vec<CommentRecord>, ExtractError> {
    let Some(ext) = patterns::extension_of(path) else {
        return Ok(Vec::new());
    };
    if !patterns::is_supported(&ext) {
        return Ok(Vec::new());
    }

    let meta = std::fs::metadata(path).map_err(|source| ExtractError::Stat {
        path: path.display().to_string(),
        source,
    })?;
    if meta.len() > MAX_FILE_SIZE {
        log_info(
            "comment",
            "extract.skip.too_large",
            &format!("{}: {} bytes exceeds limit {}", path.display(), meta.len(), MAX_FILE_SIZE),
        );
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path).map_err(|source| ExtractError::Read {
        path: path.display().to_string(),
        source,
    })?;

    Ok(extract_from_content(path, &content))
}
