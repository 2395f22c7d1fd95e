//! In-memory drive backend
//!
//! Mirrors the id-addressed semantics of the real service (names are
//! searchable, not unique) for tests and dry runs.

use super::{DriveFile, DriveService};
use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct Entry {
    id: String,
    parent: String,
    name: String,
    folder: bool,
    content: Option<Bytes>,
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, Entry>,
    counter: u64,
}

/// An in-memory `DriveService`
#[derive(Debug, Default)]
pub struct MemoryDrive {
    state: Mutex<State>,
}

impl MemoryDrive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries directly under a parent
    pub fn children(&self, parent: &str) -> Vec<DriveFile> {
        let state = self.state.lock().expect("drive state poisoned");
        let mut files: Vec<DriveFile> = state
            .entries
            .values()
            .filter(|e| e.parent == parent)
            .map(|e| DriveFile {
                id: e.id.clone(),
                name: e.name.clone(),
            })
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        files
    }

    /// Content of a file entry, if any
    pub fn content(&self, id: &str) -> Option<Bytes> {
        let state = self.state.lock().expect("drive state poisoned");
        state.entries.get(id).and_then(|e| e.content.clone())
    }

    /// Total number of folder entries
    pub fn folder_count(&self) -> usize {
        let state = self.state.lock().expect("drive state poisoned");
        state.entries.values().filter(|e| e.folder).count()
    }

    /// Resolve a folder chain under a root to the innermost folder id
    pub fn resolve_chain(&self, root: &str, segments: &[String]) -> Option<String> {
        let state = self.state.lock().expect("drive state poisoned");
        let mut parent = root.to_string();
        for segment in segments {
            let entry = state
                .entries
                .values()
                .find(|e| e.folder && e.parent == parent && &e.name == segment)?;
            parent = entry.id.clone();
        }
        Some(parent)
    }

    fn insert(&self, parent: &str, name: &str, folder: bool, content: Option<Bytes>) -> String {
        let mut state = self.state.lock().expect("drive state poisoned");
        state.counter += 1;
        let kind = if folder { "folder" } else { "file" };
        let id = format!("{kind}-{}", state.counter);
        state.entries.insert(
            id.clone(),
            Entry {
                id: id.clone(),
                parent: parent.to_string(),
                name: name.to_string(),
                folder,
                content,
            },
        );
        id
    }
}

#[async_trait]
impl DriveService for MemoryDrive {
    async fn list(&self, parent: &str, name: &str, folders_only: bool) -> Result<Vec<DriveFile>> {
        let state = self.state.lock().expect("drive state poisoned");
        Ok(state
            .entries
            .values()
            .filter(|e| e.parent == parent && e.name == name && (!folders_only || e.folder))
            .map(|e| DriveFile {
                id: e.id.clone(),
                name: e.name.clone(),
            })
            .collect())
    }

    async fn create_folder(&self, parent: &str, name: &str) -> Result<String> {
        Ok(self.insert(parent, name, true, None))
    }

    async fn upload_file(&self, parent: &str, name: &str, content: Bytes) -> Result<String> {
        Ok(self.insert(parent, name, false, Some(content)))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().expect("drive state poisoned");
        state.entries.remove(id);
        Ok(())
    }
}
