use std::sync::RwLock;

use tracing::debug;

use super::{now_millis, CatalogStore};
use crate::catalog::Catalog;
use crate::error::{Result, ShowroomError};
use crate::filter::BikeFilter;
use crate::model::{Bike, BikeUpdate, NewBike, NewReview, Review};

/// Volatile store; contents vanish with the process.
#[derive(Debug)]
pub struct MemoryStore {
    catalog: RwLock<Catalog>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { catalog: RwLock::new(Catalog::new()) }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogStore for MemoryStore {
    fn list_bikes(&self, filter: &BikeFilter) -> Result<Vec<Bike>> {
        let catalog = self.catalog.read().map_err(|_| ShowroomError::Poisoned)?;
        Ok(catalog.list(filter))
    }

    fn get_bike(&self, id: u64) -> Result<Bike> {
        let catalog = self.catalog.read().map_err(|_| ShowroomError::Poisoned)?;
        catalog.get(id).cloned().ok_or(ShowroomError::BikeNotFound(id))
    }

    fn create_bike(&self, payload: NewBike) -> Result<Bike> {
        let mut catalog = self.catalog.write().map_err(|_| ShowroomError::Poisoned)?;
        let bike = catalog.prepare_bike(payload)?;
        catalog.insert_bike(bike.clone());
        debug!("stored bike {} ({})", bike.id, bike.name);
        Ok(bike)
    }

    fn update_bike(&self, id: u64, update: BikeUpdate) -> Result<Bike> {
        let mut catalog = self.catalog.write().map_err(|_| ShowroomError::Poisoned)?;
        let bike = catalog.prepare_update(id, update)?;
        catalog.replace_bike(bike.clone());
        Ok(bike)
    }

    fn list_reviews(&self, bike_id: u64) -> Result<Vec<Review>> {
        let catalog = self.catalog.read().map_err(|_| ShowroomError::Poisoned)?;
        Ok(catalog.reviews_for(bike_id))
    }

    fn create_review(&self, bike_id: u64, user_id: &str, payload: NewReview) -> Result<Review> {
        let mut catalog = self.catalog.write().map_err(|_| ShowroomError::Poisoned)?;
        let review = catalog.prepare_review(bike_id, user_id, payload, now_millis())?;
        catalog.insert_review(review.clone());
        Ok(review)
    }

    fn bike_count(&self) -> Result<usize> {
        let catalog = self.catalog.read().map_err(|_| ShowroomError::Poisoned)?;
        Ok(catalog.len())
    }
}
