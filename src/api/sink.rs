//! Fire-and-forget rating writes.
//!
//! A failed write is logged and reported back once; it is never retried and
//! never rolls back the local rating.

use super::client::ApiClient;
use crate::timeline::RatingChange;
use std::sync::mpsc::{self, Receiver, Sender};

pub trait RatingSink {
    fn submit(&self, change: RatingChange);
}

/// Result of one background write, for status display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub change: RatingChange,
    pub error: Option<String>,
}

/// Posts each change from its own thread.
pub struct HttpRatingSink {
    api: ApiClient,
    outcomes: Sender<WriteOutcome>,
}

impl HttpRatingSink {
    pub fn new(api: ApiClient) -> (Self, Receiver<WriteOutcome>) {
        let (tx, rx) = mpsc::channel();
        (Self { api, outcomes: tx }, rx)
    }
}

impl RatingSink for HttpRatingSink {
    fn submit(&self, change: RatingChange) {
        let api = self.api.clone();
        let tx = self.outcomes.clone();
        std::thread::spawn(move || {
            let error = match api.post_rating(change.id, change.rating) {
                Ok(()) => {
                    tracing::debug!("Saved rating {:?} for prompt {}", change.rating, change.id);
                    None
                }
                Err(e) => {
                    tracing::warn!("Failed to save rating for prompt {}: {}", change.id, e);
                    Some(e.to_string())
                }
            };
            let _ = tx.send(WriteOutcome { change, error });
        });
    }
}

/// Used with `--offline`: ratings stay local.
#[derive(Debug, Default)]
pub struct NullRatingSink;

impl RatingSink for NullRatingSink {
    fn submit(&self, change: RatingChange) {
        tracing::debug!("Offline, rating for prompt {} kept locally", change.id);
    }
}
