//! Position in the remote hierarchy during a walk.
//!
//! A [`TraversalContext`] is a value, not shared state: descending into a
//! folder produces a new context through [`TraversalContext::child`] and the
//! parent's context is untouched, so leaving a folder is just returning from
//! the recursive call that owns the child context.

use std::fmt;
use std::path::{Path, PathBuf};

/// Ordered path segments from the root label down to the current folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraversalContext {
    segments: Vec<String>,
}

impl TraversalContext {
    /// Context positioned at the top of a root.
    pub fn root(label: impl Into<String>) -> Self {
        Self {
            segments: vec![label.into()],
        }
    }

    /// Context for the folder `name` below this one.
    #[must_use]
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(name.into());
        Self { segments }
    }

    /// All segments, root label first. Never empty.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The root label.
    #[must_use]
    pub fn root_label(&self) -> &str {
        &self.segments[0]
    }

    /// Folder names below the root.
    #[must_use]
    pub fn folders(&self) -> &[String] {
        &self.segments[1..]
    }

    /// Number of folders entered below the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len() - 1
    }

    /// Local directory mirroring this position under `base`.
    #[must_use]
    pub fn local_dir(&self, base: &Path) -> PathBuf {
        let mut dir = base.to_path_buf();
        for segment in &self.segments {
            dir.push(sanitize_segment(segment));
        }
        dir
    }
}

impl fmt::Display for TraversalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// Makes a remote display name safe to use as one local path component.
///
/// Replaces characters that are invalid on common filesystems
/// (`/ \ : * ? " < > |` and control characters), strips trailing dots and
/// spaces, and never returns an empty, `.` or `..` component.
#[must_use]
pub fn sanitize_segment(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = sanitized.trim().trim_end_matches(['.', ' ']);

    match trimmed {
        "" | "." | ".." => "_".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_does_not_mutate_parent() {
        let root = TraversalContext::root("Biology");
        let unit = root.child("Unit1");

        assert_eq!(root.segments(), ["Biology"]);
        assert_eq!(unit.segments(), ["Biology", "Unit1"]);
        assert_eq!(unit.depth(), 1);
        assert_eq!(unit.folders(), ["Unit1"]);
        assert_eq!(unit.root_label(), "Biology");
    }

    #[test]
    fn test_display_joins_with_slash() {
        let ctx = TraversalContext::root("English").child("Week 1").child("Reading");
        assert_eq!(ctx.to_string(), "English/Week 1/Reading");
    }

    #[test]
    fn test_local_dir_sanitizes_each_segment() {
        let ctx = TraversalContext::root("Bio: Basics").child("../escape").child("Q&A?");
        let dir = ctx.local_dir(Path::new("/mirror"));
        assert_eq!(
            dir,
            Path::new("/mirror").join("Bio_ Basics").join(".._escape").join("Q&A_")
        );
    }

    #[test]
    fn test_sanitize_segment_rejects_dot_components() {
        assert_eq!(sanitize_segment(".."), "_");
        assert_eq!(sanitize_segment("."), "_");
        assert_eq!(sanitize_segment(""), "_");
        assert_eq!(sanitize_segment("   "), "_");
    }

    #[test]
    fn test_sanitize_segment_strips_trailing_dots_and_spaces() {
        assert_eq!(sanitize_segment("Draft. "), "Draft");
        assert_eq!(sanitize_segment("notes.docx"), "notes.docx");
    }

    #[test]
    fn test_sanitize_segment_replaces_control_characters() {
        assert_eq!(sanitize_segment("a\tb\nc"), "a_b_c");
    }
}
