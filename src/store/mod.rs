//! Bike and review storage behind one interface.
//!
//! [`MemoryStore`] keeps everything in process; [`LogStore`] additionally
//! appends every change to a segment file and replays it on open. Both hold
//! a [`Catalog`](crate::catalog::Catalog) behind a lock, so listing and
//! lookup behave identically.

pub mod log;
pub mod memory;

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Result;
use crate::filter::BikeFilter;
use crate::model::{Bike, BikeUpdate, NewBike, NewReview, Review};

pub use self::log::{CompactionStats, LogStore};
pub use self::memory::MemoryStore;

pub trait CatalogStore: Send + Sync {
    /// Bikes matching every constraint in `filter`, in its sort order.
    fn list_bikes(&self, filter: &BikeFilter) -> Result<Vec<Bike>>;

    /// Fails with `BikeNotFound` rather than returning an empty value.
    fn get_bike(&self, id: u64) -> Result<Bike>;

    fn create_bike(&self, payload: NewBike) -> Result<Bike>;

    fn update_bike(&self, id: u64, update: BikeUpdate) -> Result<Bike>;

    /// Newest first. An unknown bike simply has no reviews.
    fn list_reviews(&self, bike_id: u64) -> Result<Vec<Review>>;

    fn create_review(&self, bike_id: u64, user_id: &str, payload: NewReview) -> Result<Review>;

    fn bike_count(&self) -> Result<usize>;
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
