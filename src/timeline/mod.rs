//! Timeline engine: record model, time scale and transform, lane ordering,
//! rendering geometry, interaction modes and playback.
//!
//! Everything in here is UI-toolkit agnostic; `app.rs` paints what the
//! controller computes.

pub mod axis;
pub mod controller;
pub mod crawl;
pub mod loader;
pub mod mode;
pub mod playback;
pub mod project_order;
pub mod render;
pub mod rerank;
pub mod scale;
pub mod selection;
pub mod transform;
pub mod types;
pub mod viewport;

pub use controller::{EngineConfig, Key, RatingChange, RatingSource, TimelineController, ViewInput};
pub use loader::{load_records, LoadError};
pub use mode::Mode;
pub use types::{Rating, RatingTier, Record, RecordId, RecordStore};
