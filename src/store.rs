//! In-memory document store.
//!
//! Holds every ingested [`Document`] for the lifetime of the process.
//! A single `std::sync::RwLock` guards both the id → document map and the
//! insertion ledger, so `put` is one atomic replace and readers see either
//! the old or the new document, never a mix.
//!
//! The ledger backs [`most_recent_id`](DocumentStore::most_recent_id), the
//! fallback used when a caller omits a document id. It is shared by every
//! caller: with several users uploading concurrently, "most recent" means
//! whoever uploaded last. Per-user partitioning is not provided.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::models::Document;

#[derive(Default)]
struct Inner {
    docs: HashMap<String, Arc<Document>>,
    /// Document ids in insertion order; the last entry is the most recent.
    order: Vec<String>,
}

/// Process-lifetime document store. Construct once and share via `Arc`.
#[derive(Default)]
pub struct DocumentStore {
    inner: RwLock<Inner>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document, replacing any previous document with the same id.
    ///
    /// A replaced id moves to the end of the ledger.
    pub fn put(&self, doc: Document) {
        let id = doc.id.clone();
        let mut inner = self.write();
        if inner.docs.insert(id.clone(), Arc::new(doc)).is_some() {
            inner.order.retain(|existing| existing != &id);
        }
        inner.order.push(id);
    }

    /// Fetch a document snapshot by id.
    pub fn get(&self, id: &str) -> Option<Arc<Document>> {
        self.read().docs.get(id).cloned()
    }

    /// The id of the last inserted document, if any.
    pub fn most_recent_id(&self) -> Option<String> {
        self.read().order.last().cloned()
    }

    pub fn len(&self) -> usize {
        self.read().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every document. Used at shutdown and test teardown.
    pub fn clear(&self) {
        let mut inner = self.write();
        inner.docs.clear();
        inner.order.clear();
    }

    // Every mutation is a single insert or clear, so the data behind a
    // poisoned lock is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}
