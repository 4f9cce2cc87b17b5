//! Marker classification for comment text.
//!
//! A comment line carries a marker only when the token sits at a boundary:
//! `AI?` / `AI!` as the whole trailing word (or the entire line, or the very
//! start), `AI:` only at the start of a line. Matching is case-insensitive.
//! Interior occurrences (`This AI? comment`) and look-alike words
//! (`hawaii?`, `samurai!`) never match.

/// Action requested by a marker, in ascending priority order.
///
/// When one block carries several markers, the highest-priority candidate
/// wins: Command > Question > Context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionKind {
    /// `AI:` marks supplementary context, never dispatched on its own
    Context,
    /// `AI?` asks for an answer without making changes
    Question,
    /// `AI!` asks for the described change to be made
    Command,
}

impl ActionKind {
    /// The literal marker token, canonical case (used in fingerprints).
    pub fn marker(&self) -> &'static str {
        match self {
            ActionKind::Command => "AI!",
            ActionKind::Question => "AI?",
            ActionKind::Context => "AI:",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.marker())
    }
}

/// Classify a single logical line of comment-stripped text.
///
/// Rules are evaluated in order and the first match wins for this line;
/// block-level resolution across lines happens in [`classify_block`].
pub fn line_candidate(line: &str) -> Option<ActionKind> {
    let lower = line.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }

    if lower.ends_with(" ai!") || lower == "ai!" {
        return Some(ActionKind::Command);
    }
    if lower.ends_with(" ai?") || lower == "ai?" {
        return Some(ActionKind::Question);
    }
    if lower.starts_with("ai!") {
        return Some(ActionKind::Command);
    }
    if lower.starts_with("ai?") {
        return Some(ActionKind::Question);
    }
    // Colon form is only valid at the start of a line; a trailing `ai:`
    // never qualifies.
    if lower.starts_with("ai:") {
        return Some(ActionKind::Context);
    }

    None
}

/// Resolve the action type for a whole comment block.
///
/// Scans every line and returns the highest-priority candidate found, or
/// None when no line carries a marker (the caller discards the block).
pub fn classify_block<'a, I>(lines: I) -> Option<ActionKind>
where
    I: IntoIterator<Item = &'a str>,
{
    lines.into_iter().filter_map(line_candidate).max()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_markers() {
        assert_eq!(line_candidate("Fix this function AI!"), Some(ActionKind::Command));
        assert_eq!(line_candidate("This is a test comment AI?"), Some(ActionKind::Question));
    }

    #[test]
    fn test_bare_markers() {
        assert_eq!(line_candidate("AI!"), Some(ActionKind::Command));
        assert_eq!(line_candidate("ai?"), Some(ActionKind::Question));
    }

    #[test]
    fn test_prefix_markers() {
        assert_eq!(line_candidate("AI? What should this do?"), Some(ActionKind::Question));
        assert_eq!(line_candidate("AI! fix the loop below"), Some(ActionKind::Command));
        assert_eq!(line_candidate("AI: there's the placeholder"), Some(ActionKind::Context));
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(line_candidate("Comment ai?"), Some(ActionKind::Question));
        assert_eq!(line_candidate("Refactor this aI!"), Some(ActionKind::Command));
        assert_eq!(line_candidate("ai: needs attention"), Some(ActionKind::Context));
    }

    #[test]
    fn test_interior_markers_never_match() {
        assert_eq!(line_candidate("This AI? comment has marker in middle"), None);
        assert_eq!(line_candidate("This AI? comment also has AI! marker"), None);
    }

    #[test]
    fn test_word_boundary_lookalikes_never_match() {
        assert_eq!(line_candidate("Traveling to hawaii?"), None);
        assert_eq!(line_candidate("The brave samurai!"), None);
        assert_eq!(line_candidate("Welcome to Hawaii:"), None);
        assert_eq!(line_candidate("CommentAI?"), None);
    }

    #[test]
    fn test_trailing_colon_never_matches() {
        assert_eq!(line_candidate("This comment ends with AI:"), None);
    }

    #[test]
    fn test_interior_colon_with_trailing_bang() {
        // AI: mid-line does not count; the trailing AI! does.
        assert_eq!(
            line_candidate("This comment AI: has markers in various places AI!"),
            Some(ActionKind::Command)
        );
    }

    #[test]
    fn test_per_line_first_match_order() {
        // Suffix rules are checked before prefix rules: a line starting with
        // ai! but ending with " ai?" contributes Question.
        assert_eq!(line_candidate("ai! also asks ai?"), Some(ActionKind::Question));
        // Prefix colon loses to a trailing command marker.
        assert_eq!(
            line_candidate("AI: This function needs optimization AI!"),
            Some(ActionKind::Command)
        );
    }

    #[test]
    fn test_block_priority_command_wins() {
        let lines = [
            "AI: This needs attention",
            "What about error handling AI?",
            "Fix the performance issues AI!",
        ];
        assert_eq!(classify_block(lines), Some(ActionKind::Command));
    }

    #[test]
    fn test_block_priority_question_over_context() {
        let lines = ["AI: Check this implementation", "for thread safety issues AI?"];
        assert_eq!(classify_block(lines), Some(ActionKind::Question));
    }

    #[test]
    fn test_block_question_and_command_anywhere() {
        // Command outranks Question regardless of which line comes first.
        let lines = ["First comment ai?", "Second comment AI!", "Third comment Ai?"];
        assert_eq!(classify_block(lines), Some(ActionKind::Command));
    }

    #[test]
    fn test_block_only_context() {
        let lines = ["AI: This only has colon marker"];
        assert_eq!(classify_block(lines), Some(ActionKind::Context));
    }

    #[test]
    fn test_block_without_markers() {
        let lines = ["This is a comment", "without any markers", "just regular comments"];
        assert_eq!(classify_block(lines), None);
    }

    #[test]
    fn test_empty_lines_ignored() {
        assert_eq!(line_candidate(""), None);
        assert_eq!(line_candidate("   "), None);
        assert_eq!(classify_block(["", "  ", "needs a look AI?"]), Some(ActionKind::Question));
    }
}
