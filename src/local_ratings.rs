//! Local mirror of ratings made in crawl mode.
//!
//! Stored as a JSON object of record id to rating next to the settings file
//! and applied over freshly loaded records at startup.

use crate::settings::{config_file, read_json, write_json, SettingsError};
use crate::timeline::{Rating, Record, RecordId};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct LocalRatings {
    path: Option<PathBuf>,
    ratings: BTreeMap<RecordId, Rating>,
}

impl LocalRatings {
    pub fn load() -> Self {
        match config_file("ratings.json") {
            Ok(path) => Self::load_from(path),
            Err(e) => {
                tracing::warn!("{}, local ratings disabled", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: PathBuf) -> Self {
        let ratings = if path.exists() {
            read_json(&path).unwrap_or_else(|e| {
                tracing::warn!("{}, starting with no local ratings", e);
                BTreeMap::new()
            })
        } else {
            BTreeMap::new()
        };
        Self {
            path: Some(path),
            ratings,
        }
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    pub fn get(&self, id: RecordId) -> Option<Rating> {
        self.ratings.get(&id).copied()
    }

    /// Record or clear one rating and write the file.
    pub fn set(&mut self, id: RecordId, rating: Option<Rating>) -> Result<(), SettingsError> {
        match rating {
            Some(r) => {
                self.ratings.insert(id, r);
            }
            None => {
                self.ratings.remove(&id);
            }
        }
        match &self.path {
            Some(path) => write_json(path, &self.ratings),
            None => Ok(()),
        }
    }

    /// Overlay stored ratings onto `records`. Returns how many changed.
    pub fn apply(&self, records: &mut [Record]) -> usize {
        let mut applied = 0;
        for record in records.iter_mut() {
            if let Some(&rating) = self.ratings.get(&record.id) {
                if record.rating != Some(rating) {
                    record.rating = Some(rating);
                    applied += 1;
                }
            }
        }
        if applied > 0 {
            tracing::info!("Applied {} local rating overrides", applied);
        }
        applied
    }
}
