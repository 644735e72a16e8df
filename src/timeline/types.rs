//! Record data types matching the prompt export shape.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique record identifier as assigned by the external store.
pub type RecordId = i64;

/// Sentinel project for records that carry no project.
pub const UNKNOWN_PROJECT: &str = "unknown";

pub const HOUR_MS: f64 = 3_600_000.0;
pub const DAY_MS: f64 = 86_400_000.0;

/// A 1–5 star rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: u8) -> Option<Self> {
        (1..=5).contains(&value).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rating::new(value).ok_or_else(|| format!("rating out of range: {}", value))
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

/// Visual category of a marker, derived from its rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RatingTier {
    Unrated,
    Low,
    Medium,
    High,
}

impl RatingTier {
    pub fn of(rating: Option<Rating>) -> Self {
        match rating.map(Rating::value) {
            None => RatingTier::Unrated,
            Some(1..=2) => RatingTier::Low,
            Some(3) => RatingTier::Medium,
            Some(_) => RatingTier::High,
        }
    }
}

/// How a rating request combines with the record's existing rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingAction {
    /// Always store the requested rating.
    Set,
    /// Store the requested rating, or clear it when it equals the current one.
    Toggle,
}

impl RatingAction {
    pub fn resolve(self, current: Option<Rating>, requested: Rating) -> Option<Rating> {
        match self {
            RatingAction::Set => Some(requested),
            RatingAction::Toggle if current == Some(requested) => None,
            RatingAction::Toggle => Some(requested),
        }
    }
}

/// One timestamped prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    /// Epoch milliseconds
    pub timestamp: i64,
    pub display: String,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub rating: Option<Rating>,
    #[serde(default)]
    pub note: Option<String>,
}

impl Record {
    /// Project identifier, falling back to the `unknown` sentinel.
    pub fn project_id(&self) -> &str {
        self.project
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(UNKNOWN_PROJECT)
    }

    /// Content length in characters (not bytes).
    pub fn display_len(&self) -> usize {
        self.display.chars().count()
    }

    pub fn tier(&self) -> RatingTier {
        RatingTier::of(self.rating)
    }
}

/// Last path segment of a project identifier, used for lane labels.
pub fn short_project_name(project: &str) -> &str {
    project
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(project)
}

/// Closed interval of time in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    pub fn new(start: f64, end: f64) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        let t = timestamp as f64;
        t >= self.start && t <= self.end
    }

    pub fn span(&self) -> f64 {
        self.end - self.start
    }
}

/// The resident record collection with an id index.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<Record>,
    index: HashMap<RecordId, usize>,
}

impl RecordStore {
    pub fn new(records: Vec<Record>) -> Self {
        let mut store = Self::default();
        for record in records {
            if store.index.contains_key(&record.id) {
                tracing::warn!("Duplicate record id {}, keeping first occurrence", record.id);
                continue;
            }
            store.index.insert(record.id, store.records.len());
            store.records.push(record);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.index.get(&id).map(|&i| &self.records[i])
    }

    pub fn get_mut(&mut self, id: RecordId) -> Option<&mut Record> {
        self.index.get(&id).map(|&i| &mut self.records[i])
    }

    /// Mutate the only writable field. Returns false when the id is unknown.
    pub fn set_rating(&mut self, id: RecordId, rating: Option<Rating>) -> bool {
        match self.get_mut(id) {
            Some(record) => {
                record.rating = rating;
                true
            }
            None => false,
        }
    }

    /// Earliest and latest timestamps, if any records exist.
    pub fn time_bounds(&self) -> Option<(i64, i64)> {
        let min = self.records.iter().map(|r| r.timestamp).min()?;
        let max = self.records.iter().map(|r| r.timestamp).max()?;
        Some((min, max))
    }

    /// Records whose timestamp falls inside `window`.
    pub fn in_window(&self, window: TimeWindow) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(move |r| window.contains(r.timestamp))
    }

    /// Look up `ids` and return them ordered by timestamp ascending (id breaks ties).
    /// Unknown ids are dropped.
    pub fn sorted_by_time<I>(&self, ids: I) -> Vec<&Record>
    where
        I: IntoIterator<Item = RecordId>,
    {
        let mut out: Vec<&Record> = ids.into_iter().filter_map(|id| self.get(id)).collect();
        out.sort_by_key(|r| (r.timestamp, r.id));
        out
    }

    /// Every record ordered by timestamp ascending.
    pub fn all_sorted_by_time(&self) -> Vec<&Record> {
        let mut out: Vec<&Record> = self.records.iter().collect();
        out.sort_by_key(|r| (r.timestamp, r.id));
        out
    }
}
