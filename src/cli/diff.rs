//! Colorized diff output for templates
//!
//! Compares freshly synthesized templates with the ones in the output
//! directory using the similar crate.

use colored::Colorize;
use serde::Serialize;
use similar::{ChangeTag, DiffOp, TextDiff};
use std::fmt::Write;

/// 1-based (old_start, old_len, new_start, new_len) of a hunk
fn hunk_ranges(ops: &[DiffOp]) -> (usize, usize, usize, usize) {
    let (Some(first), Some(last)) = (ops.first(), ops.last()) else {
        return (1, 0, 1, 0);
    };
    let old_start = first.old_range().start;
    let new_start = first.new_range().start;
    let old_len = last.old_range().end.saturating_sub(old_start);
    let new_len = last.new_range().end.saturating_sub(new_start);
    (old_start + 1, old_len, new_start + 1, new_len)
}

/// Diff display options
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Number of context lines to show
    pub context_lines: usize,
    /// Use colors
    pub use_color: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            context_lines: 3,
            use_color: true,
        }
    }
}

/// Colorized unified diff generator
#[derive(Debug, Clone, Default)]
pub struct ColorizedDiff {
    options: DiffOptions,
}

impl ColorizedDiff {
    /// Create a new colorized diff with custom options
    pub fn with_options(options: DiffOptions) -> Self {
        Self { options }
    }

    /// Unified diff between two texts
    pub fn diff(&self, old: &str, new: &str, old_name: &str, new_name: &str) -> String {
        let diff = TextDiff::from_lines(old, new);
        let mut output = String::new();

        self.line(&mut output, &format!("--- {}", old_name), Some(ChangeTag::Delete));
        self.line(&mut output, &format!("+++ {}", new_name), Some(ChangeTag::Insert));

        for hunk in diff
            .unified_diff()
            .context_radius(self.options.context_lines)
            .iter_hunks()
        {
            let (old_start, old_len, new_start, new_len) = hunk_ranges(hunk.ops());
            let header = format!("@@ -{},{} +{},{} @@", old_start, old_len, new_start, new_len);
            if self.options.use_color {
                let _ = writeln!(output, "{}", header.cyan());
            } else {
                let _ = writeln!(output, "{}", header);
            }

            for change in hunk.iter_changes() {
                let value = change.value().trim_end_matches('\n');
                let (sign, tag) = match change.tag() {
                    ChangeTag::Delete => ('-', Some(ChangeTag::Delete)),
                    ChangeTag::Insert => ('+', Some(ChangeTag::Insert)),
                    ChangeTag::Equal => (' ', None),
                };
                self.line(&mut output, &format!("{}{}", sign, value), tag);
                if change.missing_newline() {
                    let _ = writeln!(output, "\\ No newline at end of file");
                }
            }
        }

        output
    }

    fn line(&self, output: &mut String, text: &str, tag: Option<ChangeTag>) {
        if !self.options.use_color {
            let _ = writeln!(output, "{}", text);
            return;
        }
        let _ = match tag {
            Some(ChangeTag::Delete) => writeln!(output, "{}", text.red()),
            Some(ChangeTag::Insert) => writeln!(output, "{}", text.green()),
            _ => writeln!(output, "{}", text.dimmed()),
        };
    }

    /// Line counts of a diff
    pub fn summary(&self, old: &str, new: &str) -> DiffSummary {
        let diff = TextDiff::from_lines(old, new);
        let mut additions = 0;
        let mut deletions = 0;

        for change in diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => additions += 1,
                ChangeTag::Delete => deletions += 1,
                ChangeTag::Equal => {}
            }
        }

        DiffSummary {
            additions,
            deletions,
        }
    }
}

/// Diff summary statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    /// Number of lines added
    pub additions: usize,
    /// Number of lines deleted
    pub deletions: usize,
}

impl DiffSummary {
    pub fn has_changes(&self) -> bool {
        self.additions > 0 || self.deletions > 0
    }

    /// Format as a colored string
    pub fn format(&self, use_color: bool) -> String {
        if !self.has_changes() {
            return "no changes".to_string();
        }
        let added = format!("+{}", self.additions);
        let removed = format!("-{}", self.deletions);
        if use_color {
            format!("{}, {}", added.green(), removed.red())
        } else {
            format!("{}, {}", added, removed)
        }
    }
}

/// How a stack's template differs from the one on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StackChange {
    /// No template on disk yet
    Added,
    /// Template differs
    Modified,
    /// Template is identical
    Unchanged,
}

impl StackChange {
    pub fn classify(old: Option<&str>, new: &str) -> Self {
        match old {
            None => StackChange::Added,
            Some(old) if old == new => StackChange::Unchanged,
            Some(_) => StackChange::Modified,
        }
    }
}

impl std::fmt::Display for StackChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StackChange::Added => write!(f, "added"),
            StackChange::Modified => write!(f, "modified"),
            StackChange::Unchanged => write!(f, "unchanged"),
        }
    }
}
