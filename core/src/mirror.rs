//! Local copy of the item collection held by a client.
//!
//! # Design
//! The mirror only changes in response to confirmed server results. When a
//! mutation fails the mirror keeps its current contents and is flagged stale,
//! because the client cannot know whether the change took effect; the caller
//! is expected to list again before trusting it.

use crate::error::ApiError;
use crate::types::Item;

#[derive(Debug, Clone, Default)]
pub struct ItemMirror {
    items: Vec<Item>,
    last_error: Option<ApiError>,
    stale: bool,
}

impl ItemMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn last_error(&self) -> Option<&ApiError> {
        self.last_error.as_ref()
    }

    /// True after a failed mutation until the next successful list.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Replaces the contents with a fresh listing.
    pub fn replace_all(&mut self, items: Vec<Item>) {
        self.items = items;
        self.last_error = None;
        self.stale = false;
    }

    /// A failed listing leaves nothing trustworthy to show.
    pub fn list_failed(&mut self, error: ApiError) {
        self.items.clear();
        self.last_error = Some(error);
        self.stale = true;
    }

    pub fn created(&mut self, item: Item) {
        self.items.push(item);
    }

    pub fn updated(&mut self, item: Item) {
        match self.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
    }

    pub fn deleted(&mut self, id: &str) {
        self.items.retain(|item| item.id != id);
    }

    pub fn mutation_failed(&mut self, error: ApiError) {
        self.last_error = Some(error);
        self.stale = true;
    }
}
