use std::collections::{HashMap, HashSet};

use crate::checkpoint::CheckpointEntry;
use crate::models::TaskResult;

/// Arena of checkpoint entries with one slot per `(task_id, comment_id)`.
/// Stores fold their log into this once on open and answer queries from it.
#[derive(Clone, Debug, Default)]
pub struct CheckpointIndex {
    entries: Vec<CheckpointEntry>,
    slots: HashMap<(String, String), usize>,
}

impl CheckpointIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `entry` would change the index. A failed entry never
    /// replaces an ok one.
    pub fn accepts(&self, entry: &CheckpointEntry) -> bool {
        match self.slot(&entry.task_id, &entry.comment_id) {
            Some(existing) => !(existing.is_ok() && !entry.is_ok()),
            None => true,
        }
    }

    /// Returns `false` when the entry was rejected.
    pub fn apply(&mut self, entry: CheckpointEntry) -> bool {
        if !self.accepts(&entry) {
            return false;
        }
        let key = (entry.task_id.clone(), entry.comment_id.clone());
        match self.slots.get(&key).copied() {
            Some(position) => self.entries[position] = entry,
            None => {
                self.slots.insert(key, self.entries.len());
                self.entries.push(entry);
            }
        }
        true
    }

    pub fn slot(&self, task_id: &str, comment_id: &str) -> Option<&CheckpointEntry> {
        self.slots
            .get(&(task_id.to_string(), comment_id.to_string()))
            .map(|&position| &self.entries[position])
    }

    pub fn already_done(&self, task_id: &str) -> HashSet<String> {
        self.ok_entries(task_id)
            .map(|entry| entry.comment_id.clone())
            .collect()
    }

    pub fn completed(&self, task_id: &str) -> HashMap<String, TaskResult> {
        self.ok_entries(task_id)
            .map(|entry| (entry.comment_id.clone(), entry.result()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn ok_entries<'a>(&'a self, task_id: &'a str) -> impl Iterator<Item = &'a CheckpointEntry> {
        self.entries
            .iter()
            .filter(move |entry| entry.task_id == task_id && entry.is_ok())
    }
}
