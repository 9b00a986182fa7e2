//! Playback queue with a bounded materialized window
//!
//! The queue is an ordered list of entries with a single current index.
//! Only the entries in `[index-1, index+K-2]` may hold stream resources;
//! everything else is kept `Unresolved`. This module is pure bookkeeping:
//! resolution itself is driven by the engine.

use crate::error::{PlaybackError, Result};
use crate::settings::MIN_WINDOW_SIZE;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use sbsource::{CanonicalTrack, SourceError, SourceFailure, StreamDescriptor, TrackKey};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Stable identity of an entry, in insertion order
pub type EntryId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionState {
    Unresolved,
    Resolving,
    Resolved,
    Failed,
}

#[derive(Debug, Clone)]
pub struct QueueEntry {
    id: EntryId,
    track: CanonicalTrack,
    state: ResolutionState,
    stream: Option<StreamDescriptor>,
    failure: Option<SourceFailure>,
    /// Bumped whenever a resolution starts or the entry is evicted; a
    /// completion carrying an older epoch is stale
    epoch: u64,
    cancel: Option<CancellationToken>,
}

impl QueueEntry {
    fn new(id: EntryId, track: CanonicalTrack) -> Self {
        Self {
            id,
            track,
            state: ResolutionState::Unresolved,
            stream: None,
            failure: None,
            epoch: 0,
            cancel: None,
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn track(&self) -> &CanonicalTrack {
        &self.track
    }

    pub fn state(&self) -> ResolutionState {
        self.state
    }

    pub fn stream(&self) -> Option<&StreamDescriptor> {
        self.stream.as_ref()
    }

    pub fn failure(&self) -> Option<&SourceFailure> {
        self.failure.as_ref()
    }

    /// Unresolved, or resolved with a stream URL that has expired since
    pub fn needs_resolution(&self, now: DateTime<Utc>) -> bool {
        match self.state {
            ResolutionState::Unresolved => true,
            ResolutionState::Resolved => self.stream.as_ref().is_none_or(|s| s.is_expired_at(now)),
            ResolutionState::Resolving | ResolutionState::Failed => false,
        }
    }

    fn release(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.state = ResolutionState::Unresolved;
        self.stream = None;
        self.failure = None;
        self.epoch += 1;
    }
}

/// A resolution the engine has to run
#[derive(Debug, Clone)]
pub struct ResolutionTicket {
    pub id: EntryId,
    pub epoch: u64,
    pub track: CanonicalTrack,
    pub cancel: CancellationToken,
}

#[derive(Debug)]
pub struct PlaybackQueue {
    entries: Vec<QueueEntry>,
    current_index: Option<usize>,
    window_size: usize,
    next_id: EntryId,
}

impl PlaybackQueue {
    pub fn new(window_size: usize) -> Self {
        Self {
            entries: Vec::new(),
            current_index: None,
            window_size: window_size.max(MIN_WINDOW_SIZE),
            next_id: 0,
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current(&self) -> Option<&QueueEntry> {
        self.current_index.and_then(|idx| self.entries.get(idx))
    }

    pub fn get(&self, index: usize) -> Option<&QueueEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn index_of(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    pub fn position_of(&self, key: &TrackKey) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.track.service == key.service && e.track.id == key.id)
    }

    /// Entries after the current one
    pub fn upcoming_len(&self) -> usize {
        match self.current_index {
            None => self.entries.len(),
            Some(idx) => self.entries.len().saturating_sub(idx + 1),
        }
    }

    /// Number of entries holding something other than `Unresolved`
    pub fn materialized_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.state != ResolutionState::Unresolved)
            .count()
    }

    /// Drops every entry, cancelling their resolutions
    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            entry.release();
        }
        self.entries.clear();
        self.current_index = None;
    }

    /// Appends tracks; the first entry becomes current when the queue was
    /// empty. Returns the number of entries added.
    pub fn append_or_init(&mut self, tracks: Vec<CanonicalTrack>) -> usize {
        let was_empty = self.entries.is_empty();
        let added = tracks.len();
        for track in tracks {
            let id = self.next_id;
            self.next_id += 1;
            self.entries.push(QueueEntry::new(id, track));
        }
        if was_empty && !self.entries.is_empty() {
            self.current_index = Some(0);
        }
        added
    }

    pub fn set_index(&mut self, index: usize) -> Result<()> {
        if index < self.entries.len() {
            self.current_index = Some(index);
            Ok(())
        } else {
            Err(PlaybackError::IndexOutOfBound {
                index,
                len: self.entries.len(),
            })
        }
    }

    /// Moves to the next entry; `None` at the end
    pub fn step_next(&mut self) -> Option<usize> {
        let next = match self.current_index {
            None if !self.entries.is_empty() => 0,
            None => return None,
            Some(idx) if idx + 1 < self.entries.len() => idx + 1,
            Some(_) => return None,
        };
        self.current_index = Some(next);
        Some(next)
    }

    /// Moves to the previous entry; `None` at the start
    pub fn step_previous(&mut self) -> Option<usize> {
        let previous = self.current_index?.checked_sub(1)?;
        self.current_index = Some(previous);
        Some(previous)
    }

    /// Indices allowed to hold resources: `[index-1, index+K-2]`
    pub fn window(&self) -> Option<RangeInclusive<usize>> {
        let idx = self.current_index?;
        let last = self.entries.len().checked_sub(1)?;
        let start = idx.saturating_sub(1);
        let end = idx.saturating_add(self.window_size - 2).min(last);
        Some(start..=end)
    }

    /// Indices resolved ahead of time: `[index, index+K-2]`. The entry
    /// before the current one keeps what it has but is not re-resolved.
    pub fn prefetch_range(&self) -> Option<RangeInclusive<usize>> {
        let idx = self.current_index?;
        let window = self.window()?;
        Some(idx..=*window.end())
    }

    /// Resets every entry outside the window to `Unresolved`.
    ///
    /// Returns the number of entries that released resources.
    pub fn evict_outside(&mut self) -> usize {
        let Some(window) = self.window() else {
            return 0;
        };
        let mut evicted = 0;
        for (index, entry) in self.entries.iter_mut().enumerate() {
            if !window.contains(&index) && entry.state != ResolutionState::Unresolved {
                debug!(index, track = %entry.track.key(), "evicting entry");
                entry.release();
                evicted += 1;
            }
        }
        evicted
    }

    /// Gives a `Failed` entry another chance to resolve.
    ///
    /// Returns whether the entry was failed.
    pub fn retry_failed(&mut self, index: usize) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) if entry.state == ResolutionState::Failed => {
                entry.release();
                true
            }
            _ => false,
        }
    }

    /// Marks the prefetch range entries that need a stream as `Resolving`
    /// and returns what has to be resolved
    pub fn claim_resolutions(
        &mut self,
        now: DateTime<Utc>,
        parent: &CancellationToken,
    ) -> Vec<ResolutionTicket> {
        let Some(range) = self.prefetch_range() else {
            return Vec::new();
        };
        let mut tickets = Vec::new();
        for entry in &mut self.entries[range] {
            if !entry.needs_resolution(now) {
                continue;
            }
            let cancel = parent.child_token();
            entry.state = ResolutionState::Resolving;
            entry.stream = None;
            entry.failure = None;
            entry.epoch += 1;
            entry.cancel = Some(cancel.clone());
            tickets.push(ResolutionTicket {
                id: entry.id,
                epoch: entry.epoch,
                track: entry.track.clone(),
                cancel,
            });
        }
        tickets
    }

    /// Records the outcome of a resolution.
    ///
    /// Returns the entry index and its new state, or `None` when the
    /// outcome is stale (entry evicted, re-claimed or removed meanwhile).
    pub fn complete(
        &mut self,
        id: EntryId,
        epoch: u64,
        outcome: std::result::Result<StreamDescriptor, SourceError>,
    ) -> Option<(usize, ResolutionState)> {
        let index = self.index_of(id)?;
        let entry = &mut self.entries[index];
        if entry.epoch != epoch || entry.state != ResolutionState::Resolving {
            return None;
        }
        entry.cancel = None;
        match outcome {
            Ok(stream) => {
                entry.state = ResolutionState::Resolved;
                entry.stream = Some(stream);
            }
            Err(SourceError::Cancelled) => {
                entry.state = ResolutionState::Unresolved;
            }
            Err(error) => {
                entry.state = ResolutionState::Failed;
                entry.failure = Some(SourceFailure::from(&error));
            }
        }
        Some((index, entry.state))
    }

    /// Uniform random permutation of the entries after the current one
    pub fn shuffle_upcoming<R: rand::Rng + ?Sized>(&mut self, rng: &mut R) {
        let start = self.current_index.map_or(0, |idx| idx + 1);
        if let Some(upcoming) = self.entries.get_mut(start..) {
            upcoming.shuffle(rng);
        }
    }

    /// Puts the entries after the current one back in insertion order
    pub fn restore_upcoming_order(&mut self) {
        let start = self.current_index.map_or(0, |idx| idx + 1);
        if let Some(upcoming) = self.entries.get_mut(start..) {
            upcoming.sort_by_key(|e| e.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbsource::{ServiceType, StreamKind};

    fn tracks(ids: &[&str]) -> Vec<CanonicalTrack> {
        ids.iter()
            .map(|id| CanonicalTrack::new(ServiceType::SoundCloud, *id, format!("Track {}", id)))
            .collect()
    }

    fn stream(id: &str) -> StreamDescriptor {
        StreamDescriptor::new(format!("https://cdn/{}.mp3", id), StreamKind::Direct, None)
    }

    /// Claims and immediately resolves everything in the prefetch range
    fn resolve_window(queue: &mut PlaybackQueue) {
        let parent = CancellationToken::new();
        for ticket in queue.claim_resolutions(Utc::now(), &parent) {
            queue.complete(ticket.id, ticket.epoch, Ok(stream(&ticket.track.id)));
        }
    }

    fn states(queue: &PlaybackQueue) -> Vec<ResolutionState> {
        queue.entries().iter().map(QueueEntry::state).collect()
    }

    #[test]
    fn test_append_sets_current_once() {
        let mut queue = PlaybackQueue::new(5);
        assert_eq!(queue.current_index(), None);
        assert_eq!(queue.append_or_init(tracks(&["a", "b"])), 2);
        assert_eq!(queue.current_index(), Some(0));

        queue.set_index(1).unwrap();
        queue.append_or_init(tracks(&["c"]));
        assert_eq!(queue.current_index(), Some(1));
        assert_eq!(queue.upcoming_len(), 1);
    }

    #[test]
    fn test_set_index_out_of_bound() {
        let mut queue = PlaybackQueue::new(5);
        queue.append_or_init(tracks(&["a"]));
        assert_eq!(
            queue.set_index(3),
            Err(PlaybackError::IndexOutOfBound { index: 3, len: 1 })
        );
    }

    #[test]
    fn test_steps_stop_at_the_boundaries() {
        let mut queue = PlaybackQueue::new(5);
        assert_eq!(queue.step_next(), None);

        queue.append_or_init(tracks(&["a", "b"]));
        assert_eq!(queue.step_previous(), None);
        assert_eq!(queue.step_next(), Some(1));
        assert_eq!(queue.step_next(), None);
        assert_eq!(queue.current_index(), Some(1));
    }

    #[test]
    fn test_window_bounds() {
        let mut queue = PlaybackQueue::new(5);
        queue.append_or_init(tracks(&["0", "1", "2", "3", "4", "5", "6", "7"]));

        assert_eq!(queue.window(), Some(0..=3));
        assert_eq!(queue.prefetch_range(), Some(0..=3));

        queue.set_index(4).unwrap();
        assert_eq!(queue.window(), Some(3..=7));
        assert_eq!(queue.prefetch_range(), Some(4..=7));

        queue.set_index(7).unwrap();
        assert_eq!(queue.window(), Some(6..=7));
    }

    #[test]
    fn test_window_of_two_keeps_previous_without_resolving_it() {
        let mut queue = PlaybackQueue::new(2);
        queue.append_or_init(tracks(&["A", "B", "C"]));
        resolve_window(&mut queue);
        assert_eq!(
            states(&queue),
            vec![
                ResolutionState::Resolved,
                ResolutionState::Unresolved,
                ResolutionState::Unresolved
            ]
        );

        queue.step_next();
        queue.evict_outside();
        resolve_window(&mut queue);
        // A is index-1: kept, not evicted
        assert_eq!(states(&queue)[0], ResolutionState::Resolved);

        queue.step_next();
        assert_eq!(queue.evict_outside(), 1);
        resolve_window(&mut queue);

        queue.step_previous();
        queue.evict_outside();
        resolve_window(&mut queue);
        assert_eq!(queue.current().unwrap().track().id, "B");
        assert_eq!(states(&queue)[0], ResolutionState::Unresolved);
        assert!(queue.get(0).unwrap().stream().is_none());
    }

    #[test]
    fn test_materialized_entries_never_exceed_the_window() {
        let ids: Vec<String> = (0..20).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let mut queue = PlaybackQueue::new(3);
        queue.append_or_init(tracks(&refs));

        for _ in 0..12 {
            queue.step_next();
            queue.evict_outside();
            resolve_window(&mut queue);
            assert!(queue.materialized_count() <= queue.window_size());
        }

        let window = queue.window().unwrap();
        for (index, entry) in queue.entries().iter().enumerate() {
            if !window.contains(&index) {
                assert_eq!(entry.state(), ResolutionState::Unresolved, "index {}", index);
            }
        }
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        let mut queue = PlaybackQueue::new(2);
        queue.append_or_init(tracks(&["A", "B", "C"]));
        let parent = CancellationToken::new();
        let tickets = queue.claim_resolutions(Utc::now(), &parent);
        assert_eq!(tickets.len(), 1);
        let ticket = &tickets[0];

        queue.step_next();
        queue.step_next();
        queue.evict_outside();
        assert!(ticket.cancel.is_cancelled());

        assert_eq!(queue.complete(ticket.id, ticket.epoch, Ok(stream("A"))), None);
        assert_eq!(queue.get(0).unwrap().state(), ResolutionState::Unresolved);
    }

    #[test]
    fn test_failure_is_recorded() {
        let mut queue = PlaybackQueue::new(2);
        queue.append_or_init(tracks(&["A"]));
        let tickets = queue.claim_resolutions(Utc::now(), &CancellationToken::new());
        let outcome = queue.complete(
            tickets[0].id,
            tickets[0].epoch,
            Err(SourceError::NotFound("track removed".into())),
        );
        assert_eq!(outcome, Some((0, ResolutionState::Failed)));
        assert_eq!(queue.current().unwrap().failure().unwrap().title, "Not found");

        // failed entries are not claimed again while they stay in the window
        assert!(queue
            .claim_resolutions(Utc::now(), &CancellationToken::new())
            .is_empty());
    }

    #[test]
    fn test_retry_failed_makes_the_entry_claimable() {
        let mut queue = PlaybackQueue::new(2);
        queue.append_or_init(tracks(&["A"]));
        let first = queue.claim_resolutions(Utc::now(), &CancellationToken::new());
        queue.complete(
            first[0].id,
            first[0].epoch,
            Err(SourceError::NotFound("track removed".into())),
        );

        assert!(queue.retry_failed(0));
        assert_eq!(queue.current().unwrap().state(), ResolutionState::Unresolved);
        assert!(queue.current().unwrap().failure().is_none());
        assert!(!queue.retry_failed(0));
        assert!(!queue.retry_failed(5));

        let second = queue.claim_resolutions(Utc::now(), &CancellationToken::new());
        assert_eq!(second.len(), 1);
        assert!(second[0].epoch > first[0].epoch);
    }

    #[test]
    fn test_huge_window_does_not_overflow() {
        let mut queue = PlaybackQueue::new(usize::MAX);
        queue.append_or_init(tracks(&["0", "1", "2"]));
        queue.set_index(1).unwrap();
        assert_eq!(queue.window(), Some(0..=2));
        assert_eq!(queue.prefetch_range(), Some(1..=2));
    }

    #[test]
    fn test_expired_stream_is_claimed_again() {
        let mut queue = PlaybackQueue::new(2);
        queue.append_or_init(tracks(&["A"]));
        let tickets = queue.claim_resolutions(Utc::now(), &CancellationToken::new());
        let expiring =
            StreamDescriptor::new("https://cdn/a.mp3?expire=1700000000", StreamKind::Direct, None);
        queue.complete(tickets[0].id, tickets[0].epoch, Ok(expiring));

        let before = DateTime::from_timestamp(1_600_000_000, 0).unwrap();
        assert!(!queue.current().unwrap().needs_resolution(before));
        assert_eq!(
            queue
                .claim_resolutions(Utc::now(), &CancellationToken::new())
                .len(),
            1
        );
    }

    #[test]
    fn test_shuffle_keeps_current_and_restores_order() {
        let ids: Vec<String> = (0..30).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let mut queue = PlaybackQueue::new(5);
        queue.append_or_init(tracks(&refs));
        queue.set_index(3).unwrap();

        queue.shuffle_upcoming(&mut rand::rng());
        assert_eq!(queue.current().unwrap().track().id, "3");
        let prefix: Vec<&str> = queue.entries()[..4]
            .iter()
            .map(|e| e.track().id.as_str())
            .collect();
        assert_eq!(prefix, vec!["0", "1", "2", "3"]);

        let mut upcoming: Vec<u64> = queue.entries()[4..].iter().map(QueueEntry::id).collect();
        upcoming.sort_unstable();
        assert_eq!(upcoming, (4..30).collect::<Vec<u64>>());

        queue.restore_upcoming_order();
        let order: Vec<&str> = queue.entries().iter().map(|e| e.track().id.as_str()).collect();
        assert_eq!(order, refs);
    }

    #[test]
    fn test_position_of_uses_service_and_id() {
        let mut queue = PlaybackQueue::new(5);
        queue.append_or_init(tracks(&["a", "b"]));
        let key = TrackKey {
            service: ServiceType::SoundCloud,
            id: "b".to_string(),
        };
        assert_eq!(queue.position_of(&key), Some(1));

        let other = TrackKey {
            service: ServiceType::YouTube,
            id: "b".to_string(),
        };
        assert_eq!(queue.position_of(&other), None);
    }
}
