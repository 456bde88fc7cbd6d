use std::fmt;

use serde::Serialize;

use crate::context::TraversalContext;

/// The folder list of a level shrank between two visits in the same pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriftEvent {
    /// Slash-joined path of the level whose listing changed.
    pub path: String,
    /// Folder count seen before descending into the last child.
    pub previous: usize,
    /// Folder count seen after returning from it.
    pub current: usize,
}

impl DriftEvent {
    /// Compares folder counts before and after a child visit.
    ///
    /// Only a strictly smaller refreshed count is drift; a level that grew or
    /// stayed the same is walked with the refreshed listing.
    #[must_use]
    pub fn detect(context: &TraversalContext, previous: usize, current: usize) -> Option<Self> {
        (current < previous).then(|| Self {
            path: context.to_string(),
            previous,
            current,
        })
    }

    /// Folders that disappeared.
    #[must_use]
    pub fn missing(&self) -> usize {
        self.previous - self.current
    }
}

impl fmt::Display for DriftEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} folder(s) before, {} after",
            self.path, self.previous, self.current
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_shrink_only() {
        let context = TraversalContext::root("Biology").child("Unit1");
        assert_eq!(DriftEvent::detect(&context, 3, 3), None);
        assert_eq!(DriftEvent::detect(&context, 3, 4), None);

        let event = DriftEvent::detect(&context, 3, 2).unwrap_or_else(|| panic!("no drift"));
        assert_eq!(event.path, "Biology/Unit1");
        assert_eq!(event.missing(), 1);
        assert_eq!(event.to_string(), "Biology/Unit1: 3 folder(s) before, 2 after");
    }
}
