//! Filesystem scanner
//!
//! Walks an acquired snapshot once and records every surviving file and
//! directory in a [`ProjectStructure`]. Dotfiles are dropped unless
//! allow-listed, dependency caches are always dropped, and entries that
//! cannot be read are skipped with a warning instead of failing the scan.

mod inventory;

pub use inventory::{EntryKind, InventoryEntry, ProjectStructure};

use anyhow::{bail, Result};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Dot-prefixed names that survive the hidden-entry rule
    pub allowed_dotfiles: Vec<String>,
    /// Directory or file names that are never visited
    pub excluded_names: Vec<String>,
    /// Also honor the repository's own `.gitignore`
    pub respect_gitignore: bool,
    pub max_depth: usize,
    pub max_entries: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            allowed_dotfiles: [".env.example", ".gitignore", ".github", ".gitlab-ci.yml"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            excluded_names: [
                "node_modules",
                "vendor",
                "__pycache__",
                "bower_components",
                "target",
                "dist",
                "build",
                "venv",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            respect_gitignore: false,
            max_depth: 20,
            max_entries: 50_000,
        }
    }
}

impl ScanConfig {
    pub fn is_excluded(&self, name: &str) -> bool {
        if self.excluded_names.iter().any(|n| n == name) {
            return true;
        }
        name.starts_with('.') && !self.allowed_dotfiles.iter().any(|n| n == name)
    }
}

pub struct Scanner {
    config: Arc<ScanConfig>,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn scan(&self, root_path: &Path) -> Result<ProjectStructure> {
        if !root_path.is_dir() {
            bail!("Scan root is not a directory: {}", root_path.display());
        }

        let start = Instant::now();
        let filter_config = Arc::clone(&self.config);

        let walker = WalkBuilder::new(root_path)
            .hidden(false)
            .ignore(false)
            .parents(false)
            .git_global(false)
            .git_exclude(false)
            .git_ignore(self.config.respect_gitignore)
            .require_git(false)
            .follow_links(false)
            .max_depth(Some(self.config.max_depth))
            .filter_entry(move |entry| {
                entry.depth() == 0
                    || !filter_config.is_excluded(&entry.file_name().to_string_lossy())
            })
            .build();

        let mut structure = ProjectStructure::new();
        let mut skipped = 0usize;

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "Skipping unreadable entry");
                    skipped += 1;
                    continue;
                }
            };

            if entry.depth() == 0 {
                continue;
            }

            if structure.len() >= self.config.max_entries {
                warn!(
                    max_entries = self.config.max_entries,
                    "Reached inventory limit, stopping scan"
                );
                break;
            }

            let Some(rel_path) = relative_key(root_path, entry.path()) else {
                continue;
            };

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!(path = %rel_path, error = %err, "Skipping entry without metadata");
                    skipped += 1;
                    continue;
                }
            };

            if metadata.is_dir() {
                structure.insert(rel_path, InventoryEntry::directory());
            } else if metadata.is_file() {
                let extension = extension_of(entry.path());
                structure.insert(rel_path, InventoryEntry::file(metadata.len(), extension));
            } else {
                debug!(path = %rel_path, "Skipping special file");
            }
        }

        info!(
            root = %root_path.display(),
            entries = structure.len(),
            skipped,
            scan_time_ms = start.elapsed().as_millis() as u64,
            "Filesystem scan complete"
        );

        Ok(structure)
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(ScanConfig::default())
    }
}

fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let rel: PathBuf = path.strip_prefix(root).ok()?.to_path_buf();
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}
