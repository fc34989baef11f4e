// Catalog index: constant-time lookup of catalog entries by id, then by name.

use std::collections::HashMap;
use std::sync::Arc;

use crate::model::{CatalogEntry, OwnedItem};

/// Lookup structure over one catalog snapshot.
///
/// Account records do not always carry an identifier, so lookups fall back
/// to a case-insensitive match on the display name.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    entries: Arc<Vec<CatalogEntry>>,
    by_id: HashMap<u64, usize>,
    by_name: HashMap<String, usize>,
}

impl CatalogIndex {
    /// Index a catalog. When two entries share an id or name, the first wins.
    pub fn new(entries: Arc<Vec<CatalogEntry>>) -> Self {
        let mut by_id = HashMap::with_capacity(entries.len());
        let mut by_name = HashMap::with_capacity(entries.len());

        for (idx, entry) in entries.iter().enumerate() {
            if let Some(id) = entry.id {
                by_id.entry(id).or_insert(idx);
            }
            by_name.entry(name_key(&entry.name)).or_insert(idx);
        }

        Self {
            entries,
            by_id,
            by_name,
        }
    }

    pub fn by_id(&self, id: u64) -> Option<&CatalogEntry> {
        self.by_id.get(&id).map(|&idx| &self.entries[idx])
    }

    pub fn by_name(&self, name: &str) -> Option<&CatalogEntry> {
        self.by_name.get(&name_key(name)).map(|&idx| &self.entries[idx])
    }

    /// Resolve an owned card: identifier first, display name as fallback.
    pub fn lookup(&self, item: &OwnedItem) -> Option<&CatalogEntry> {
        item.id
            .and_then(|id| self.by_id(id))
            .or_else(|| self.by_name(&item.name))
    }

    pub fn entries(&self) -> &Arc<Vec<CatalogEntry>> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}
