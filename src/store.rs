//! Bounded in-memory mail store
//!
//! A process-wide FIFO collection of received mail, capped at
//! [`MailStore::DEFAULT_CAPACITY`] records. When the cap is reached the
//! oldest record is evicted to make room for the next insertion. Records
//! are keyed by a monotonically increasing id that is never reused, even
//! after eviction or deletion.
//!
//! The store is shared between the SMTP and POP3 servers via `Arc`; a
//! single mutex guards the interior so a [`MailStore::list`] snapshot is
//! never observed mid-insert.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// A normalized message handed to the store by ingestion.
///
/// The store treats every field as opaque; nothing is parsed or
/// validated here.
#[derive(Debug, Clone, Default)]
pub struct IncomingMail {
    pub sender: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body_text: String,
    pub body_html: Option<String>,
    /// Original wire-format bytes, kept verbatim for POP3 RETR.
    pub raw: Vec<u8>,
}

/// A stored mail record.
///
/// Immutable once inserted: `id` and the raw bytes never change, the
/// only mutation the store supports is removal.
#[derive(Debug, Clone)]
pub struct MailRecord {
    pub id: u64,
    pub received_at: DateTime<Utc>,
    pub sender: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body_text: String,
    pub body_html: Option<String>,
    pub raw: Vec<u8>,
}

impl MailRecord {
    /// Byte length of the original wire-format message.
    ///
    /// Zero when the original bytes were not available at insertion.
    #[must_use]
    pub fn raw_size(&self) -> usize {
        self.raw.len()
    }
}

#[derive(Debug)]
struct Inner {
    records: VecDeque<MailRecord>,
    next_id: u64,
}

/// Bounded FIFO store of [`MailRecord`]s.
///
/// All operations lock the interior mutex for their full duration and
/// complete without suspension; each is O(capacity) at worst.
#[derive(Debug)]
pub struct MailStore {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl MailStore {
    /// Records kept before the oldest is evicted.
    pub const DEFAULT_CAPACITY: usize = 100;

    /// Create a store with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a store with an explicit capacity bound.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "store capacity must be at least 1");
        Self {
            capacity,
            inner: Mutex::new(Inner {
                records: VecDeque::with_capacity(capacity),
                next_id: 1,
            }),
        }
    }

    /// Insert a message, evicting the oldest record if at capacity.
    ///
    /// Assigns the next id, stamps the arrival time, and returns a copy
    /// of the stored record. Never fails.
    pub fn insert(&self, mail: IncomingMail) -> MailRecord {
        let mut inner = self.lock();

        if inner.records.len() >= self.capacity {
            if let Some(evicted) = inner.records.pop_front() {
                info!(id = evicted.id, "FIFO limit reached, evicted oldest mail");
            }
        }

        let record = MailRecord {
            id: inner.next_id,
            received_at: Utc::now(),
            sender: mail.sender,
            recipients: mail.recipients,
            subject: mail.subject,
            body_text: mail.body_text,
            body_html: mail.body_html,
            raw: mail.raw,
        };
        inner.next_id += 1;

        debug!(id = record.id, from = %record.sender, "stored mail");
        inner.records.push_back(record.clone());
        record
    }

    /// A copy of the current contents in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<MailRecord> {
        let inner = self.lock();
        debug!(count = inner.records.len(), "listing mail");
        inner.records.iter().cloned().collect()
    }

    /// Look up a record by id.
    #[must_use]
    pub fn get_by_id(&self, id: u64) -> Option<MailRecord> {
        let inner = self.lock();
        let found = inner.records.iter().find(|r| r.id == id).cloned();
        if found.is_some() {
            debug!(id, "retrieved mail");
        } else {
            debug!(id, "mail not found");
        }
        found
    }

    /// Remove a record by id. Returns whether a removal occurred.
    ///
    /// Deleting an id that is absent (never existed, already deleted,
    /// or evicted) is not an error; the call simply returns `false`.
    pub fn delete_by_id(&self, id: u64) -> bool {
        let mut inner = self.lock();
        let Some(index) = inner.records.iter().position(|r| r.id == id) else {
            debug!(id, "delete skipped, mail not found");
            return false;
        };
        drop(inner.records.remove(index));
        debug!(id, "deleted mail");
        true
    }

    /// Empty the store and reset id assignment.
    ///
    /// Intended for test and administrative tooling between runs; the
    /// protocol engines never call this.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.records.clear();
        inner.next_id = 1;
        info!("store cleared");
    }

    /// Number of records currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MailStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail(subject: &str) -> IncomingMail {
        IncomingMail {
            sender: "alice@example.com".to_string(),
            recipients: vec!["bob@example.com".to_string()],
            subject: subject.to_string(),
            body_text: "hello".to_string(),
            body_html: None,
            raw: format!("Subject: {subject}\r\n\r\nhello").into_bytes(),
        }
    }

    #[test]
    fn ids_increase_monotonically() {
        let store = MailStore::new();
        let a = store.insert(mail("a"));
        let b = store.insert(mail("b"));
        let c = store.insert(mail("c"));
        assert!(a.id < b.id);
        assert!(b.id < c.id);
    }

    #[test]
    fn capacity_bound_holds_after_every_insert() {
        let store = MailStore::with_capacity(3);
        for i in 0..10 {
            store.insert(mail(&format!("m{i}")));
            assert!(store.len() <= 3);
        }
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn eviction_drops_oldest_and_never_reuses_ids() {
        let store = MailStore::with_capacity(3);
        for i in 0..5 {
            store.insert(mail(&format!("m{i}")));
        }
        let ids: Vec<u64> = store.list().iter().map(|r| r.id).collect();
        // m0 and m1 were evicted; ids keep increasing past them.
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn hundred_and_one_inserts_keep_the_last_hundred() {
        let store = MailStore::new();
        let mut inserted = Vec::new();
        for i in 0..101 {
            inserted.push(store.insert(mail(&format!("m{i}"))));
        }
        let listed = store.list();
        assert_eq!(listed.len(), 100);
        // The first survivor is the second record ever inserted.
        assert_eq!(listed[0].id, inserted[1].id);
        assert_eq!(listed[0].subject, "m1");
    }

    #[test]
    fn list_is_a_defensive_copy() {
        let store = MailStore::new();
        store.insert(mail("a"));
        let mut listed = store.list();
        listed.clear();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn get_by_id_finds_stored_mail() {
        let store = MailStore::new();
        let record = store.insert(mail("a"));
        assert_eq!(store.get_by_id(record.id).unwrap().subject, "a");
        assert!(store.get_by_id(record.id + 1).is_none());
    }

    #[test]
    fn delete_is_idempotent() {
        let store = MailStore::new();
        let record = store.insert(mail("a"));
        assert!(store.delete_by_id(record.id));
        assert!(!store.delete_by_id(record.id));
        assert!(store.is_empty());
    }

    #[test]
    fn deleted_ids_are_not_reassigned() {
        let store = MailStore::new();
        let a = store.insert(mail("a"));
        store.delete_by_id(a.id);
        let b = store.insert(mail("b"));
        assert!(b.id > a.id);
    }

    #[test]
    fn clear_resets_id_assignment() {
        let store = MailStore::new();
        store.insert(mail("a"));
        store.insert(mail("b"));
        store.clear();
        assert!(store.is_empty());
        let record = store.insert(mail("c"));
        assert_eq!(record.id, 1);
    }

    #[test]
    fn raw_size_reports_wire_length() {
        let store = MailStore::new();
        let record = store.insert(mail("a"));
        assert_eq!(record.raw_size(), record.raw.len());

        let empty = store.insert(IncomingMail::default());
        assert_eq!(empty.raw_size(), 0);
    }
}
