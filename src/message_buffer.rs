//! Bounded per-channel message tail.
//!
//! Messages are strictly append-ordered by insertion; updates mutate in
//! place at their cursor. The count/age policy is enforced by the shard
//! handler after insertions via [`MessageBuffer::enforce`].

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::events::MessagePatch;
use crate::model::MessageState;

/// Ordered tail of recent messages for one channel, plus the one-slot
/// pending-edit holding area for edits that arrive before their create.
#[derive(Debug, Default)]
pub struct MessageBuffer {
    messages: VecDeque<MessageState>,

    /// An update we had no stored message for. Inserting it as a new record
    /// would break ordering (unknown messages exist around it), so it waits
    /// here until the matching create arrives. One slot, last-write-wins.
    pending_edit: Option<MessagePatch>,
}

fn older_than(now: DateTime<Utc>, created: DateTime<Utc>, max_age: Duration) -> bool {
    let age = now.signed_duration_since(created);
    age.num_milliseconds() > max_age.as_millis() as i64
}

impl MessageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &MessageState> {
        self.messages.iter()
    }

    /// Append a new message. A pending edit with the same id is merged into
    /// the record first. Returns false when the message is already past the
    /// age cap and was not stored.
    pub fn insert(
        &mut self,
        mut msg: MessageState,
        now: DateTime<Utc>,
        max_age: Option<Duration>,
    ) -> bool {
        if self.pending_edit.as_ref().is_some_and(|p| p.id == msg.id) {
            if let Some(pending) = self.pending_edit.take() {
                msg.apply_patch(&pending);
            }
        }

        if let (Some(max_age), Some(created)) = (max_age, msg.created_at) {
            if older_than(now, created, max_age) {
                return false;
            }
        }

        self.messages.push_back(msg);
        true
    }

    /// Patch the stored message with this id in place. Recent messages are
    /// the usual targets, so the scan runs newest-first. When no message
    /// matches, the patch is parked in the pending-edit slot and false is
    /// returned.
    pub fn apply_update(&mut self, patch: &MessagePatch) -> bool {
        if let Some(msg) = self.messages.iter_mut().rev().find(|m| m.id == patch.id) {
            msg.apply_patch(patch);
            return true;
        }

        self.pending_edit = Some(patch.clone());
        false
    }

    /// Remove the message with this id, or flag it deleted when `mark` is
    /// set. Returns whether a message matched.
    pub fn remove(&mut self, id: u64, mark: bool) -> bool {
        for i in (0..self.messages.len()).rev() {
            if self.messages[i].id == id {
                if mark {
                    self.messages[i].deleted = true;
                } else {
                    self.messages.remove(i);
                }
                return true;
            }
        }

        false
    }

    /// Bulk form of [`remove`](Self::remove).
    pub fn remove_bulk(&mut self, ids: &[u64], mark: bool) {
        for &id in ids {
            self.remove(id, mark);
        }
    }

    /// Apply the retention policy: drop the oldest entries beyond
    /// `max_count`, then drop everything at or past the first entry (scanning
    /// newest to oldest) older than `max_age`. Entries with no known creation
    /// time are exempt from the age check but still count toward the cap.
    pub fn enforce(
        &mut self,
        now: DateTime<Utc>,
        max_count: Option<usize>,
        max_age: Option<Duration>,
    ) {
        if let Some(max_count) = max_count {
            while self.messages.len() > max_count {
                self.messages.pop_front();
            }
        }

        let Some(max_age) = max_age else {
            return;
        };

        for i in (0..self.messages.len()).rev() {
            let Some(created) = self.messages[i].created_at else {
                continue;
            };

            if older_than(now, created, max_age) {
                // Everything before this one is older still.
                self.messages.drain(..=i);
                break;
            }
        }
    }

    /// Collect up to `limit` messages with id below `before` into `out`,
    /// newest last. `before = 0` means no id bound, `limit = 0` no count
    /// bound.
    pub fn collect_recent(&self, before: u64, limit: usize, out: &mut Vec<MessageState>) {
        let start = out.len();
        for msg in self.messages.iter().rev() {
            if before != 0 && msg.id >= before {
                continue;
            }
            out.push(msg.clone());
            if limit != 0 && out.len() - start >= limit {
                break;
            }
        }

        out[start..].reverse();
    }
}
