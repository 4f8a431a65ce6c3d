// Songs planned during one session, keyed by the track they follow

use std::collections::HashMap;
use log::debug;

use crate::data::Track;

/// A song scheduled to follow an anchor track
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedInsertion {
    /// Track after which `song` is placed
    pub anchor: Track,
    /// The song to insert
    pub song: Track,
    /// Queue time at which the anchor ends, including earlier planned insertions
    pub anchor_end_ms: u64,
}

/// Songs to insert, keyed by the anchor they follow
#[derive(Debug, Clone, Default)]
pub struct InsertionPlan {
    leading: Vec<Track>,
    after: HashMap<String, PlannedInsertion>,
}

impl InsertionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a song before the track currently playing. Returns its position in the leading block.
    pub fn push_leading(&mut self, song: Track) -> usize {
        debug!("Planning {} as leading insertion #{}", song, self.leading.len() + 1);
        self.leading.push(song);
        self.leading.len() - 1
    }

    /// Total duration of all leading insertions
    pub fn leading_duration_ms(&self) -> u64 {
        self.leading.iter().map(|t| t.duration_ms).sum()
    }

    pub fn leading(&self) -> &[Track] {
        &self.leading
    }

    /// The insertion planned after the track with this key, if any
    pub fn successor_of(&self, anchor_key: &str) -> Option<&PlannedInsertion> {
        self.after.get(anchor_key)
    }

    pub fn is_anchor(&self, anchor_key: &str) -> bool {
        self.after.contains_key(anchor_key)
    }

    /// Schedule `song` after `anchor`.
    ///
    /// An anchor holds a single song; a second insertion at the same anchor is
    /// refused and handed back unchanged.
    pub fn insert_after(&mut self, anchor: Track, song: Track, anchor_end_ms: u64) -> Result<(), PlannedInsertion> {
        let key = anchor.key();
        let planned = PlannedInsertion { anchor, song, anchor_end_ms };

        if self.after.contains_key(&key) {
            return Err(planned);
        }

        debug!("Planning {} after {} ({} ms)", planned.song, planned.anchor, anchor_end_ms);
        self.after.insert(key, planned);
        Ok(())
    }

    /// Planned insertions in queue timeline order
    pub fn after_in_timeline_order(&self) -> Vec<&PlannedInsertion> {
        let mut entries: Vec<&PlannedInsertion> = self.after.values().collect();
        entries.sort_by_key(|p| p.anchor_end_ms);
        entries
    }

    /// Number of songs planned in total
    pub fn len(&self) -> usize {
        self.leading.len() + self.after.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
