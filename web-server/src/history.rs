// web-server/src/history.rs
use common::models::HistoryEntry;
use std::collections::VecDeque;

/// Default cap for a live history window; channel views use 200,
/// the dashboard sparkline view 100.
pub const DEFAULT_WINDOW_CAP: usize = 200;

/// Bounded, time-ordered in-memory history for one channel.
///
/// Entries are appended in arrival order (the transport delivers per-channel
/// events in non-decreasing `createdAt` order, nothing is re-sorted) and the
/// oldest entries are evicted first once the cap is exceeded. Redelivery is
/// not de-duplicated: at-most-once delivery per room is a precondition.
#[derive(Debug)]
pub struct HistoryWindow {
    channel_id: String,
    cap: usize,
    entries: VecDeque<HistoryEntry>,
}

impl HistoryWindow {
    pub fn new(channel_id: impl Into<String>, cap: usize) -> Self {
        Self {
            channel_id: channel_id.into(),
            cap: cap.max(1),
            entries: VecDeque::new(),
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn oldest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    /// Initialize the window from a server-side history read, keeping only
    /// entries for this channel and only the newest `cap` of them.
    pub fn seed(&mut self, entries: Vec<HistoryEntry>) {
        self.entries.clear();
        for entry in entries {
            if entry.channel_id == self.channel_id {
                self.push(entry);
            }
        }
    }

    /// Fold one realtime event into the window.
    ///
    /// Events for other channels are ignored (the server may multiplex
    /// several rooms through one connection); returns whether the entry
    /// was accepted.
    pub fn merge(&mut self, entry: HistoryEntry) -> bool {
        if entry.channel_id != self.channel_id {
            return false;
        }
        self.push(entry);
        true
    }

    fn push(&mut self, entry: HistoryEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.cap {
            self.entries.pop_front();
        }
    }
}
