//! Prompt rendering.
//!
//! Turns classified records into the literal text injected into the wrapped
//! program. Wording is tool-facing product copy; the structure (location
//! phrasing, action vs. context separation, Command wording winning in a
//! batch) is load-bearing for downstream consumers.

use crate::comment::classify::ActionKind;
use crate::comment::record::CommentRecord;
use std::fmt::Write;

/// Render the prompt for one record, with optional context records appended.
pub fn render_prompt(record: &CommentRecord, context: &[CommentRecord]) -> String {
    let mut prompt = match record.action {
        ActionKind::Command => format!(
            "See {} {} and surrounding context. Make the appropriate changes. \
             YOU MUST replace the AI! marker with [ai] when done.",
            record.file_path.display(),
            record.location()
        ),
        ActionKind::Question => format!(
            "See {} {} and surrounding context. Answer the question(s), but \
             DO NOT MAKE CHANGES. Replace the AI? marker with [ai] when done.",
            record.file_path.display(),
            record.location()
        ),
        ActionKind::Context => format!(
            "Context from {} {}: {}",
            record.file_path.display(),
            record.location(),
            record.content
        ),
    };

    append_context_section(&mut prompt, context);
    prompt
}

/// Render one prompt covering several records fired in the same batch.
///
/// Command wording applies when any record is a Command; context records
/// never appear as bullets, only under the related-context section.
pub fn render_batch_prompt(records: &[CommentRecord], context: &[CommentRecord]) -> String {
    let any_command = records.iter().any(|r| r.action == ActionKind::Command);

    let mut prompt = if any_command {
        String::from(
            "See the following locations and surrounding context. Make the \
             appropriate changes. YOU MUST replace each AI! and AI? marker \
             with [ai] when done.",
        )
    } else {
        String::from(
            "See the following locations and surrounding context. Answer the \
             question(s), but DO NOT MAKE CHANGES. Replace each AI? marker \
             with [ai] when done.",
        )
    };

    for record in records {
        let _ = write!(prompt, "\n- {} {}", record.file_path.display(), record.location());
    }

    append_context_section(&mut prompt, context);
    prompt
}

fn append_context_section(prompt: &mut String, context: &[CommentRecord]) {
    if context.is_empty() {
        return;
    }
    prompt.push_str("\n\nRelated context comments:");
    for record in context {
        let _ = write!(
            prompt,
            "\n- {} {}: {}",
            record.file_path.display(),
            record.location(),
            record.content
        );
    }
}
