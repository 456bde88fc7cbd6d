//! Filtering and ordering of flattened manifest rows.

use std::cmp::Ordering;

use super::ManifestEntry;

/// Minimum Jaro-Winkler similarity for a name to count as a fuzzy match.
const FUZZY_MATCH_THRESHOLD: f64 = 0.88;

/// Column to order rows by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    Name,
    Root,
    Folder,
    /// Newest first unless reversed.
    #[default]
    Date,
}

/// Row selection for listing synced files.
#[derive(Debug, Clone, Default)]
pub struct EntryQuery {
    /// Keep only rows of this root label.
    pub root: Option<String>,
    /// Case-insensitive term matched against name, root and folder.
    pub search: Option<String>,
    pub sort: SortKey,
    pub reverse: bool,
}

impl EntryQuery {
    /// Applies the filters and ordering to `entries`.
    #[must_use]
    pub fn apply(&self, entries: Vec<ManifestEntry>) -> Vec<ManifestEntry> {
        let term = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase);

        let mut rows: Vec<ManifestEntry> = entries
            .into_iter()
            .filter(|entry| self.root.as_deref().is_none_or(|root| entry.root == root))
            .filter(|entry| term.as_deref().is_none_or(|term| matches_term(entry, term)))
            .collect();

        rows.sort_by(|a, b| compare(a, b, self.sort));
        if self.reverse {
            rows.reverse();
        }
        rows
    }
}

fn matches_term(entry: &ManifestEntry, term: &str) -> bool {
    let name = entry.name.to_lowercase();
    if name.contains(term)
        || entry.root.to_lowercase().contains(term)
        || entry.folder.to_lowercase().contains(term)
    {
        return true;
    }
    let stem = name.rsplit_once('.').map_or(name.as_str(), |(stem, _)| stem);
    strsim::jaro_winkler(stem, term) >= FUZZY_MATCH_THRESHOLD
}

fn compare(a: &ManifestEntry, b: &ManifestEntry, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortKey::Root => a.root.cmp(&b.root).then_with(|| a.name.cmp(&b.name)),
        SortKey::Folder => a.folder.cmp(&b.folder).then_with(|| a.name.cmp(&b.name)),
        // Timestamps are fixed-width, so string order is chronological.
        SortKey::Date => b.synced_at.cmp(&a.synced_at).then_with(|| a.name.cmp(&b.name)),
    }
}
