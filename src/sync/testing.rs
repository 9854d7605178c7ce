use anyhow::Result;
use chrono::{DateTime, Utc};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use crate::error::SyncError;
use crate::sync::client::{LibraryClient, LikedItem, Page};

pub fn utc(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .expect("rfc3339 timestamp")
        .with_timezone(&Utc)
}

pub fn liked(uri: &str, at: &str) -> LikedItem {
    LikedItem {
        uri: uri.to_string(),
        liked_at: utc(at),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCall {
    pub owner: String,
    pub name: String,
    pub id: String,
}

/// In-memory library paging with `offset:N` cursors.
pub struct FakeLibrary {
    page_size: usize,
    user_id: String,
    liked: RefCell<Vec<LikedItem>>,
    collections: RefCell<BTreeMap<String, Vec<String>>>,
    creates: RefCell<Vec<CreateCall>>,
    adds: RefCell<Vec<(String, Vec<String>)>>,
    liked_fetches: Cell<usize>,
    user_lookups: Cell<usize>,
    fail_adds: Cell<bool>,
}

fn offset_of(cursor: Option<&str>) -> usize {
    cursor
        .and_then(|c| c.strip_prefix("offset:"))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

fn page_of<T: Clone>(all: &[T], cursor: Option<&str>, size: usize) -> Page<T> {
    let start = offset_of(cursor).min(all.len());
    let end = (start + size).min(all.len());
    Page {
        items: all[start..end].to_vec(),
        next: (end < all.len()).then(|| format!("offset:{end}")),
    }
}

impl FakeLibrary {
    pub fn new() -> Self {
        Self {
            page_size: 50,
            user_id: "listener".to_string(),
            liked: RefCell::new(Vec::new()),
            collections: RefCell::new(BTreeMap::new()),
            creates: RefCell::new(Vec::new()),
            adds: RefCell::new(Vec::new()),
            liked_fetches: Cell::new(0),
            user_lookups: Cell::new(0),
            fail_adds: Cell::new(false),
        }
    }

    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    /// Liked items in feed order, newest first.
    pub fn with_liked(self, items: Vec<LikedItem>) -> Self {
        *self.liked.borrow_mut() = items;
        self
    }

    /// Simulates a new like arriving at the top of the feed.
    pub fn like(&self, item: LikedItem) {
        self.liked.borrow_mut().insert(0, item);
    }

    pub fn seed_collection(&self, id: &str, uris: &[&str]) {
        self.collections.borrow_mut().insert(
            id.to_string(),
            uris.iter().map(|u| (*u).to_string()).collect(),
        );
    }

    pub fn fail_adds(&self, fail: bool) {
        self.fail_adds.set(fail);
    }

    pub fn collection(&self, id: &str) -> Vec<String> {
        self.collections
            .borrow()
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn creates(&self) -> Vec<CreateCall> {
        self.creates.borrow().clone()
    }

    pub fn adds(&self) -> Vec<(String, Vec<String>)> {
        self.adds.borrow().clone()
    }

    pub fn write_count(&self) -> usize {
        self.creates.borrow().len() + self.adds.borrow().len()
    }

    pub fn liked_page_fetches(&self) -> usize {
        self.liked_fetches.get()
    }

    pub fn user_lookups(&self) -> usize {
        self.user_lookups.get()
    }

    pub fn reset_calls(&self) {
        self.creates.borrow_mut().clear();
        self.adds.borrow_mut().clear();
        self.liked_fetches.set(0);
        self.user_lookups.set(0);
    }
}

impl LibraryClient for FakeLibrary {
    fn list_liked_items(&self, cursor: Option<&str>) -> Result<Page<LikedItem>> {
        self.liked_fetches.set(self.liked_fetches.get() + 1);
        Ok(page_of(&self.liked.borrow(), cursor, self.page_size))
    }

    fn current_user_id(&self) -> Result<String> {
        self.user_lookups.set(self.user_lookups.get() + 1);
        Ok(self.user_id.clone())
    }

    fn create_collection(&self, owner: &str, name: &str) -> Result<String> {
        let id = format!("pl-{}", self.creates.borrow().len() + 1);
        self.creates.borrow_mut().push(CreateCall {
            owner: owner.to_string(),
            name: name.to_string(),
            id: id.clone(),
        });
        self.collections.borrow_mut().insert(id.clone(), Vec::new());
        Ok(id)
    }

    fn add_items(&self, collection_id: &str, uris: &[String]) -> Result<()> {
        if self.fail_adds.get() {
            return Err(SyncError::transport(502, "bad gateway").into());
        }
        let mut collections = self.collections.borrow_mut();
        let Some(members) = collections.get_mut(collection_id) else {
            return Err(SyncError::transport(404, format!("no playlist {collection_id}")).into());
        };
        members.extend(uris.iter().cloned());
        self.adds
            .borrow_mut()
            .push((collection_id.to_string(), uris.to_vec()));
        Ok(())
    }

    fn list_collection_items(
        &self,
        collection_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<String>> {
        let collections = self.collections.borrow();
        let Some(members) = collections.get(collection_id) else {
            return Err(SyncError::transport(404, format!("no playlist {collection_id}")).into());
        };
        Ok(page_of(members, cursor, self.page_size))
    }
}
