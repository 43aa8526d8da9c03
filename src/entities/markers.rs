//! Synchronization markers sent to the external marker sink.
//!
//! Two groups share one integer value space:
//! - **Technical** markers are emitted by the state machine itself
//!   (standby, preload, sequence boundaries, periodic sync)
//! - **Stimulus** markers are referenced by name or number in sequence files
//!   and resolved through a [`MarkerTable`]
//!
//! Unknown stimulus names never stop playback: they fall back to the
//! `generic_stimulus` value and a warning is logged.

use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::error::MarkerTableError;

/// Name of the fallback stimulus marker
pub const GENERIC_STIMULUS: &str = "generic_stimulus";

/// Value used for [`GENERIC_STIMULUS`] when the table does not define it
const GENERIC_STIMULUS_VALUE: i32 = 1;

/// Opaque marker value as delivered to the sink
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Marker(pub i32);

impl Marker {
    pub fn value(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Markers emitted by the playback state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Technical {
    StandbyStart = 200,
    StandbyEnd = 201,
    PreloadCompleted = 202,
    PreSeqStart = 203,
    SeqStart = 204,
    SeqEnd = 205,
    IntraBlockPauseStart = 206,
    Sync50Frames = 207,
    FeedbackQuit = 254,
}

impl Technical {
    pub const ALL: [Technical; 9] = [
        Technical::StandbyStart,
        Technical::StandbyEnd,
        Technical::PreloadCompleted,
        Technical::PreSeqStart,
        Technical::SeqStart,
        Technical::SeqEnd,
        Technical::IntraBlockPauseStart,
        Technical::Sync50Frames,
        Technical::FeedbackQuit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Technical::StandbyStart => "standby_start",
            Technical::StandbyEnd => "standby_end",
            Technical::PreloadCompleted => "preload_completed",
            Technical::PreSeqStart => "pre_seq_start",
            Technical::SeqStart => "seq_start",
            Technical::SeqEnd => "seq_end",
            Technical::IntraBlockPauseStart => "intra_block_pause_start",
            Technical::Sync50Frames => "sync_50_frames",
            Technical::FeedbackQuit => "feedback_quit",
        }
    }

    pub fn marker(self) -> Marker {
        Marker(self as i32)
    }

    /// Reverse lookup, used when logging outgoing markers
    pub fn from_marker(marker: Marker) -> Option<Technical> {
        Self::ALL.into_iter().find(|t| t.marker() == marker)
    }
}

impl From<Technical> for Marker {
    fn from(t: Technical) -> Self {
        t.marker()
    }
}

/// Stimulus marker as resolved from a sequence file token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkerTuple {
    pub name: String,
    pub marker: Marker,
}

/// Stimulus marker names and their values, in definition order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerTable {
    stimuli: IndexMap<String, i32>,
}

impl Default for MarkerTable {
    fn default() -> Self {
        let mut stimuli = IndexMap::new();
        stimuli.insert(GENERIC_STIMULUS.to_string(), GENERIC_STIMULUS_VALUE);
        Self { stimuli }
    }
}

impl MarkerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build table from name/value pairs; `generic_stimulus` is added when absent
    pub fn from_map(mut stimuli: IndexMap<String, i32>) -> Self {
        if !stimuli.contains_key(GENERIC_STIMULUS) {
            stimuli.insert(GENERIC_STIMULUS.to_string(), GENERIC_STIMULUS_VALUE);
        }
        Self { stimuli }
    }

    /// Load a JSON object of `{"name": value}` pairs
    pub fn load(path: &Path) -> Result<Self, MarkerTableError> {
        let text = std::fs::read_to_string(path).map_err(|source| MarkerTableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let stimuli: IndexMap<String, i32> =
            serde_json::from_str(&text).map_err(|source| MarkerTableError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("Loaded {} stimulus markers from {}", stimuli.len(), path.display());
        Ok(Self::from_map(stimuli))
    }

    pub fn insert(&mut self, name: &str, value: i32) {
        self.stimuli.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<Marker> {
        self.stimuli.get(name).map(|&v| Marker(v))
    }

    pub fn generic(&self) -> Marker {
        self.get(GENERIC_STIMULUS).unwrap_or(Marker(GENERIC_STIMULUS_VALUE))
    }

    /// First name registered for a value
    pub fn name_of(&self, marker: Marker) -> Option<&str> {
        self.stimuli
            .iter()
            .find(|&(_, &v)| v == marker.0)
            .map(|(name, _)| name.as_str())
    }

    pub fn contains_value(&self, marker: Marker) -> bool {
        self.name_of(marker).is_some()
    }

    /// Resolve a sequence file token (integer literal or marker name)
    pub fn resolve(&self, token: &str) -> MarkerTuple {
        if let Ok(value) = token.parse::<i32>() {
            let marker = Marker(value);
            let name = self.name_of(marker).unwrap_or(token).to_string();
            return MarkerTuple { name, marker };
        }

        match self.get(token) {
            Some(marker) => MarkerTuple {
                name: token.to_string(),
                marker,
            },
            None => {
                warn!("Unknown marker '{}', using {}", token, GENERIC_STIMULUS);
                MarkerTuple {
                    name: GENERIC_STIMULUS.to_string(),
                    marker: self.generic(),
                }
            }
        }
    }

    /// Values used by more than one name, sorted
    pub fn duplicate_values(&self) -> Vec<i32> {
        let mut counts: HashMap<i32, usize> = HashMap::new();
        for &v in self.stimuli.values() {
            *counts.entry(v).or_default() += 1;
        }
        let mut dups: Vec<i32> = counts
            .into_iter()
            .filter(|&(_, n)| n > 1)
            .map(|(v, _)| v)
            .collect();
        dups.sort_unstable();
        dups
    }

    pub fn len(&self) -> usize {
        self.stimuli.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stimuli.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Marker)> {
        self.stimuli.iter().map(|(k, &v)| (k.as_str(), Marker(v)))
    }
}
