use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tracing::debug;

use alarmq_core::{AlarmEntry, AlarmId};

/// Position of an entry in the queue.
///
/// Orders by instant, then id. `slot` is unique per insert, so two keys are
/// equal only if they refer to the same insertion, even when an id is
/// re-inserted at the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotKey {
    instant: DateTime<Utc>,
    id: AlarmId,
    slot: u64,
}

impl SlotKey {
    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    pub fn id(&self) -> AlarmId {
        self.id
    }
}

/// Pending alarms ordered ascending by `(instant, id)`, with an id index for
/// direct removal.
#[derive(Debug, Default)]
pub struct ScheduleQueue {
    entries: BTreeMap<SlotKey, AlarmEntry>,
    index: HashMap<AlarmId, SlotKey>,
    next_slot: u64,
}

impl ScheduleQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry and return its slot.
    ///
    /// Callers remove any entry with the same id first. If one is still
    /// present it is replaced, so the queue never holds two entries per id.
    pub fn insert(&mut self, entry: AlarmEntry) -> SlotKey {
        let key = SlotKey {
            instant: entry.instant(),
            id: entry.id(),
            slot: self.next_slot,
        };
        self.next_slot += 1;

        if let Some(stale) = self.index.insert(entry.id(), key) {
            self.entries.remove(&stale);
        }
        self.entries.insert(key, entry);
        key
    }

    /// Remove the entry with `id`, if any.
    pub fn remove_by_id(&mut self, id: AlarmId) -> Option<AlarmEntry> {
        let key = self.index.remove(&id)?;
        let removed = self.entries.remove(&key);
        if let Some(entry) = &removed {
            debug!(alarm_id = id, "{} was removed", entry);
        }
        removed
    }

    pub fn peek_min(&self) -> Option<&AlarmEntry> {
        self.entries.first_key_value().map(|(_, entry)| entry)
    }

    /// Slot of the current head. Used to detect head changes by identity.
    pub fn head_slot(&self) -> Option<SlotKey> {
        self.entries.first_key_value().map(|(key, _)| *key)
    }

    pub fn pop_min(&mut self) -> Option<AlarmEntry> {
        let (key, entry) = self.entries.pop_first()?;
        self.index.remove(&key.id);
        Some(entry)
    }

    /// Entries in ascending `(instant, id)` order.
    pub fn iter(&self) -> impl Iterator<Item = &AlarmEntry> {
        self.entries.values()
    }

    /// Entries with their slots, in ascending order.
    pub fn iter_slots(&self) -> impl Iterator<Item = (SlotKey, &AlarmEntry)> {
        self.entries.iter().map(|(key, entry)| (*key, entry))
    }

    pub fn get(&self, id: AlarmId) -> Option<&AlarmEntry> {
        self.index.get(&id).and_then(|key| self.entries.get(key))
    }

    pub fn contains(&self, id: AlarmId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alarmq_core::AlarmKind;
    use chrono::{Duration, TimeZone};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn entry(id: AlarmId, secs: i64) -> AlarmEntry {
        AlarmEntry::new(id, at(secs), AlarmKind::NORMAL)
    }

    #[test]
    fn empty_queue() {
        let mut queue = ScheduleQueue::new();
        assert!(queue.is_empty());
        assert!(queue.peek_min().is_none());
        assert!(queue.pop_min().is_none());
        assert!(queue.head_slot().is_none());
        assert!(queue.remove_by_id(1).is_none());
    }

    #[test]
    fn orders_by_instant() {
        let mut queue = ScheduleQueue::new();
        queue.insert(entry(1, 300));
        queue.insert(entry(2, 100));
        queue.insert(entry(3, 200));

        let ids: Vec<AlarmId> = queue.iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert_eq!(queue.peek_min().unwrap().id(), 2);
    }

    #[test]
    fn equal_instants_tie_break_by_id() {
        let mut queue = ScheduleQueue::new();
        queue.insert(entry(9, 100));
        queue.insert(entry(4, 100));
        queue.insert(entry(6, 100));

        let ids: Vec<AlarmId> = queue.iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec![4, 6, 9]);
    }

    #[test]
    fn pop_min_drains_in_order() {
        let mut queue = ScheduleQueue::new();
        queue.insert(entry(1, 50));
        queue.insert(entry(2, 10));

        assert_eq!(queue.pop_min().unwrap().id(), 2);
        assert!(!queue.contains(2));
        assert_eq!(queue.pop_min().unwrap().id(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn remove_by_id_keeps_order() {
        let mut queue = ScheduleQueue::new();
        queue.insert(entry(1, 10));
        queue.insert(entry(2, 20));
        queue.insert(entry(3, 30));

        let removed = queue.remove_by_id(2).unwrap();
        assert_eq!(removed.instant(), at(20));
        assert!(queue.get(2).is_none());
        assert_eq!(queue.len(), 2);

        let ids: Vec<AlarmId> = queue.iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn insert_same_id_replaces() {
        let mut queue = ScheduleQueue::new();
        queue.insert(entry(1, 200));
        queue.insert(entry(1, 300));

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.get(1).unwrap().instant(), at(300));
    }

    #[test]
    fn reinsert_at_same_instant_gets_new_slot() {
        let mut queue = ScheduleQueue::new();
        let first = queue.insert(entry(1, 100));
        queue.remove_by_id(1);
        let second = queue.insert(entry(1, 100));

        assert_ne!(first, second);
        assert_eq!(first.instant(), second.instant());
        assert_eq!(queue.head_slot(), Some(second));
    }
}
