// List registry
//
// Stores named, ordered lists of pending resource descriptors and
// generates collision-free names when the caller supplies none.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::distributions::Alphanumeric;
use rand::Rng;

use loadweave_error::{OrchestrationError, OrchestrationResult};

use crate::list::LoadList;

pub(crate) type ListHandle = Arc<Mutex<LoadList>>;

/// Registry of load lists, keyed by their (unique) names.
#[derive(Debug, Default)]
pub(crate) struct ListRegistry {
    lists: HashMap<String, ListHandle>,
}

impl ListRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize a caller-supplied name: trimmed, inner whitespace
    /// mapped to underscores.
    pub fn normalize_name(raw: &str) -> String {
        raw.trim()
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .collect()
    }

    /// Generate a name not currently present in the registry.
    pub fn generate_name(&self, suffix_length: usize) -> String {
        loop {
            let suffix: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(suffix_length)
                .map(char::from)
                .collect();
            let name = format!("list_{}", suffix);
            if !self.lists.contains_key(&name) {
                return name;
            }
        }
    }

    /// Insert a list under its name; duplicate names are an error.
    pub fn insert(&mut self, list: LoadList) -> OrchestrationResult<ListHandle> {
        let name = list.name.clone();
        if self.lists.contains_key(&name) {
            return Err(OrchestrationError::DuplicateListName(name));
        }
        let handle = Arc::new(Mutex::new(list));
        self.lists.insert(name, handle.clone());
        Ok(handle)
    }

    pub fn get(&self, name: &str) -> Option<ListHandle> {
        self.lists.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lists.contains_key(name)
    }

    /// Drop every list; names become reusable.
    pub fn clear(&mut self) {
        self.lists.clear();
    }
}
