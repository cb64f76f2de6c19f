use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Bytes on disk; zero for directories
    pub size: u64,
    /// Lower-cased extension with leading dot, or empty
    pub extension: String,
}

impl InventoryEntry {
    pub fn file(size: u64, extension: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::File,
            size,
            extension: extension.into(),
        }
    }

    pub fn directory() -> Self {
        Self {
            kind: EntryKind::Directory,
            size: 0,
            extension: String::new(),
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Inventory of a repository snapshot, keyed by `/`-separated relative path.
///
/// Ordered so that every consumer sees the same iteration order for the
/// same tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectStructure {
    entries: BTreeMap<String, InventoryEntry>,
}

impl ProjectStructure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, entry: InventoryEntry) {
        self.entries.insert(path.into(), entry);
    }

    pub fn get(&self, path: &str) -> Option<&InventoryEntry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.get(path).is_some_and(InventoryEntry::is_file)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &InventoryEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn files(&self) -> impl Iterator<Item = (&str, &InventoryEntry)> {
        self.iter().filter(|(_, e)| e.is_file())
    }

    /// Root-level file names matching `predicate`
    pub fn root_files_matching<'a>(
        &'a self,
        predicate: impl Fn(&str) -> bool + 'a,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.files()
            .map(|(path, _)| path)
            .filter(|path| !path.contains('/'))
            .filter(move |path| predicate(path))
    }
}

impl FromIterator<(String, InventoryEntry)> for ProjectStructure {
    fn from_iter<T: IntoIterator<Item = (String, InventoryEntry)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
