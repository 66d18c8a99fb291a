use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::timestamp::now_millis;

pub const TODO_FILENAME: &str = "todos.json";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TodoError {
    #[error("no task with id {0}")]
    NotFound(i64),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: i64,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: i64,
    #[serde(default)]
    pub completed_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TodoStats {
    pub total: usize,
    pub completed: usize,
}

/// Todo list backed by a JSON file.
#[derive(Debug)]
pub struct TodoStore {
    path: PathBuf,
    items: Vec<TodoItem>,
}

impl TodoStore {
    /// Loads the list at `path`. A missing or unreadable file gives an empty list.
    pub fn open(path: &Path) -> Self {
        let items = match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Failed to parse todo list {}: {}", path.display(), e);
                Vec::new()
            }),
            Err(e) => {
                debug!("No todo list loaded from {}: {}", path.display(), e);
                Vec::new()
            }
        };

        Self {
            path: path.to_path_buf(),
            items,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn items(&self) -> &[TodoItem] {
        &self.items
    }

    pub fn get(&self, id: i64) -> Option<&TodoItem> {
        self.items.iter().find(|t| t.id == id)
    }

    fn get_mut(&mut self, id: i64) -> Result<&mut TodoItem, TodoError> {
        self.items
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(TodoError::NotFound(id))
    }

    /// Appends a task created at `now`; blank text is ignored.
    pub fn add_at(&mut self, text: &str, now: i64) -> Option<i64> {
        if text.trim().is_empty() {
            return None;
        }
        // ids are creation times, nudged forward when two land on the same millisecond
        let id = match self.items.iter().map(|t| t.id).max() {
            Some(last) if last >= now => last.checked_add(1).unwrap_or(now),
            _ => now,
        };
        self.items.push(TodoItem {
            id,
            text: text.to_string(),
            completed: false,
            created_at: now,
            completed_at: None,
        });

        Some(id)
    }

    #[inline]
    pub fn add(&mut self, text: &str) -> Option<i64> {
        self.add_at(text, now_millis())
    }

    pub fn toggle_at(&mut self, id: i64, now: i64) -> Result<bool, TodoError> {
        let item = self.get_mut(id)?;
        item.completed = !item.completed;
        item.completed_at = item.completed.then_some(now);

        Ok(item.completed)
    }

    #[inline]
    pub fn toggle(&mut self, id: i64) -> Result<bool, TodoError> {
        self.toggle_at(id, now_millis())
    }

    pub fn delete(&mut self, id: i64) -> Result<TodoItem, TodoError> {
        let index = self
            .items
            .iter()
            .position(|t| t.id == id)
            .ok_or(TodoError::NotFound(id))?;

        Ok(self.items.remove(index))
    }

    /// Marks every open task done. Returns how many changed.
    pub fn complete_all_at(&mut self, now: i64) -> usize {
        let mut count = 0;
        for item in self.items.iter_mut().filter(|t| !t.completed) {
            item.completed = true;
            item.completed_at = Some(now);
            count += 1;
        }

        count
    }

    #[inline]
    pub fn complete_all(&mut self) -> usize {
        self.complete_all_at(now_millis())
    }

    /// Drops finished tasks. Returns how many were removed.
    pub fn delete_completed(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|t| !t.completed);

        before - self.items.len()
    }

    pub fn stats(&self) -> TodoStats {
        TodoStats {
            total: self.items.len(),
            completed: self.items.iter().filter(|t| t.completed).count(),
        }
    }

    pub fn save(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        let mut f = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut f, &self.items)?;
        f.persist(&self.path)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        debug!("Saved {} tasks to {}", self.items.len(), self.path.display());

        Ok(())
    }
}

// tests
#[test]
fn test_add_and_ids() {
    let mut store = TodoStore::open(Path::new("/nonexistent/todos.json"));
    assert!(store.items().is_empty());
    assert_eq!(store.add_at("   ", 10), None);
    assert_eq!(store.add_at("first", 10), Some(10));
    assert_eq!(store.add_at("second", 10), Some(11));
    assert_eq!(store.add_at("third", 5), Some(12));
    assert_eq!(store.add_at("later", 100), Some(100));
    assert_eq!(store.get(11).unwrap().text, "second");
    assert_eq!(store.stats(), TodoStats { total: 4, completed: 0 });
}

#[test]
fn test_toggle_and_bulk() {
    let mut store = TodoStore::open(Path::new("/nonexistent/todos.json"));
    let a = store.add_at("a", 1).unwrap();
    let b = store.add_at("b", 2).unwrap();
    let c = store.add_at("c", 3).unwrap();

    assert_eq!(store.toggle_at(a, 50), Ok(true));
    assert_eq!(store.get(a).unwrap().completed_at, Some(50));
    assert_eq!(store.toggle_at(a, 60), Ok(false));
    assert_eq!(store.get(a).unwrap().completed_at, None);
    assert_eq!(store.toggle_at(999, 60), Err(TodoError::NotFound(999)));

    store.toggle_at(b, 70).unwrap();
    assert_eq!(store.complete_all_at(80), 2);
    assert_eq!(store.get(b).unwrap().completed_at, Some(70));
    assert_eq!(store.get(c).unwrap().completed_at, Some(80));
    assert_eq!(store.stats(), TodoStats { total: 3, completed: 3 });

    assert_eq!(store.delete(c).unwrap().text, "c");
    assert_eq!(store.delete(c), Err(TodoError::NotFound(c)));
    assert_eq!(store.delete_completed(), 2);
    assert!(store.items().is_empty());
}

#[test]
fn test_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join(TODO_FILENAME);
    let mut store = TodoStore::open(&path);
    store.add_at("write tests", 1_700_000_000_000).unwrap();
    store.toggle_at(1_700_000_000_000, 1_700_000_000_500).unwrap();
    store.add_at("ship", 1_700_000_001_000).unwrap();
    store.save().unwrap();

    let reloaded = TodoStore::open(&path);
    assert_eq!(reloaded.items(), store.items());

    let raw = fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"createdAt\": 1700000000000"));
    assert!(raw.contains("\"completedAt\": null"));
}

#[test]
fn test_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(TODO_FILENAME);
    fs::write(&path, "{not json").unwrap();
    assert!(TodoStore::open(&path).items().is_empty());

    fs::write(
        &path,
        r#"[{"id":1,"text":"old","completed":true,"createdAt":1,"completedAt":2}]"#,
    )
    .unwrap();
    let store = TodoStore::open(&path);
    assert_eq!(store.stats(), TodoStats { total: 1, completed: 1 });
}

#[test]
fn test_id_at_upper_bound() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(TODO_FILENAME);
    fs::write(
        &path,
        r#"[{"id":9223372036854775807,"text":"edited","completed":false,"createdAt":1,"completedAt":null}]"#,
    )
    .unwrap();
    let mut store = TodoStore::open(&path);
    assert_eq!(store.add_at("next", 10), Some(10));
    assert_eq!(store.stats().total, 2);
}
