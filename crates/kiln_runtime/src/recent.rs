//! Recently used items, persisted one per line

use std::io;
use std::path::{Path, PathBuf};

/// Most-recent-first list of item names backed by a text file.
///
/// Inserted into the world as a resource by the binary, so plugins can read
/// and update it; the binary saves it after shutdown.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentList {
    path: PathBuf,
    capacity: usize,
    items: Vec<String>,
}

impl RecentList {
    /// Empty list that saves to `path`
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity,
            items: Vec::new(),
        }
    }

    /// Read the list from `path`. A missing or unreadable file yields an
    /// empty list.
    pub fn load(path: impl Into<PathBuf>, capacity: usize) -> Self {
        let mut list = Self::new(path, capacity);
        match std::fs::read_to_string(&list.path) {
            Ok(content) => {
                for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    if list.items.len() >= capacity {
                        break;
                    }
                    if !list.contains(line) {
                        list.items.push(line.to_string());
                    }
                }
                log::debug!("Loaded {} recent items from {}", list.items.len(), list.path.display());
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No recent list at {}", list.path.display());
            }
            Err(e) => {
                log::warn!("Failed to read recent list {}: {}", list.path.display(), e);
            }
        }
        list
    }

    /// Move `item` to the front, dropping the oldest entry past capacity
    pub fn push(&mut self, item: impl Into<String>) {
        let item = item.into();
        self.items.retain(|existing| *existing != item);
        self.items.insert(0, item);
        self.items.truncate(self.capacity);
    }

    pub fn contains(&self, item: &str) -> bool {
        self.items.iter().any(|existing| existing == item)
    }

    pub fn most_recent(&self) -> Option<&str> {
        self.items.first().map(String::as_str)
    }

    /// Items, most recent first
    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the list back to its file
    pub fn save(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut content = self.items.join("\n");
        content.push('\n');
        std::fs::write(&self.path, content)
    }
}
