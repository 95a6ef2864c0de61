use std::collections::HashMap;

use crate::error::{Result, ShowroomError};
use crate::filter::BikeFilter;
use crate::model::{Bike, BikeUpdate, NewBike, NewReview, Review};

/// In-memory showroom: bikes in creation order plus an id index.
///
/// Both stores keep one of these behind a lock; the log-backed one also
/// rebuilds it by replaying its segment.
#[derive(Debug, Default)]
pub struct Catalog {
    bikes: Vec<Bike>,
    by_id: HashMap<u64, usize>,
    reviews: Vec<Review>,
    next_bike_id: u64,
    next_review_id: u64,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            next_bike_id: 1,
            next_review_id: 1,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.bikes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bikes.is_empty()
    }

    pub fn bikes(&self) -> &[Bike] {
        &self.bikes
    }

    pub fn all_reviews(&self) -> &[Review] {
        &self.reviews
    }

    pub fn list(&self, filter: &BikeFilter) -> Vec<Bike> {
        filter.apply(&self.bikes)
    }

    pub fn get(&self, id: u64) -> Option<&Bike> {
        self.by_id.get(&id).map(|&slot| &self.bikes[slot])
    }

    pub fn contains(&self, id: u64) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Builds the bike the next `create` would store, without storing it.
    pub fn prepare_bike(&self, payload: NewBike) -> Result<Bike> {
        payload.validate()?;
        Ok(payload.into_bike(self.next_bike_id))
    }

    /// Applies an update to a copy of the stored bike.
    pub fn prepare_update(&self, id: u64, update: BikeUpdate) -> Result<Bike> {
        update.validate()?;
        let mut bike = self.get(id).cloned().ok_or(ShowroomError::BikeNotFound(id))?;
        update.apply(&mut bike);
        Ok(bike)
    }

    pub fn prepare_review(
        &self,
        bike_id: u64,
        user_id: &str,
        payload: NewReview,
        created_at: u64,
    ) -> Result<Review> {
        if user_id.trim().is_empty() {
            return Err(ShowroomError::Unauthorized);
        }
        payload.validate()?;
        if !self.contains(bike_id) {
            return Err(ShowroomError::BikeNotFound(bike_id));
        }
        Ok(Review {
            id: self.next_review_id,
            bike_id,
            user_id: user_id.to_string(),
            rating: payload.rating,
            comment: payload.comment,
            created_at,
        })
    }

    /// Stores a bike under its own id. Ids at or past the counter move it
    /// forward, so replayed bikes never collide with new ones.
    pub fn insert_bike(&mut self, bike: Bike) {
        self.next_bike_id = self.next_bike_id.max(bike.id + 1);
        match self.by_id.get(&bike.id) {
            Some(&slot) => self.bikes[slot] = bike,
            None => {
                self.by_id.insert(bike.id, self.bikes.len());
                self.bikes.push(bike);
            }
        }
    }

    /// Replaces a stored bike. Unknown ids are ignored.
    pub fn replace_bike(&mut self, bike: Bike) -> bool {
        match self.by_id.get(&bike.id) {
            Some(&slot) => {
                self.bikes[slot] = bike;
                true
            }
            None => false,
        }
    }

    pub fn insert_review(&mut self, review: Review) {
        self.next_review_id = self.next_review_id.max(review.id + 1);
        self.reviews.push(review);
    }

    /// Reviews of one bike, newest first; same-millisecond ties go to the later id.
    pub fn reviews_for(&self, bike_id: u64) -> Vec<Review> {
        let mut found: Vec<Review> = self
            .reviews
            .iter()
            .filter(|r| r.bike_id == bike_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(name: &str) -> NewBike {
        NewBike::new(name, "Honda", "Standard", 90000, 2023, 110, "img.png")
    }

    #[test]
    fn ids_start_at_one_and_grow() {
        let mut catalog = Catalog::new();
        let a = catalog.prepare_bike(payload("Shine")).unwrap();
        catalog.insert_bike(a);
        let b = catalog.prepare_bike(payload("Unicorn")).unwrap();
        catalog.insert_bike(b);

        let ids: Vec<u64> = catalog.bikes().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn replayed_ids_advance_the_counter() {
        let mut catalog = Catalog::new();
        catalog.insert_bike(payload("Old").into_bike(41));
        let next = catalog.prepare_bike(payload("New")).unwrap();
        assert_eq!(next.id, 42);
    }

    #[test]
    fn update_of_missing_bike_is_not_found() {
        let catalog = Catalog::new();
        let err = catalog.prepare_update(9, BikeUpdate::default()).unwrap_err();
        assert!(matches!(err, ShowroomError::BikeNotFound(9)));
    }

    #[test]
    fn review_needs_an_existing_bike_and_a_user() {
        let mut catalog = Catalog::new();
        catalog.insert_bike(payload("Shine").into_bike(1));
        let review = NewReview { rating: 4, comment: "smooth ride".into() };

        assert!(matches!(
            catalog.prepare_review(2, "u1", review.clone(), 10),
            Err(ShowroomError::BikeNotFound(2))
        ));
        assert!(matches!(
            catalog.prepare_review(1, " ", review.clone(), 10),
            Err(ShowroomError::Unauthorized)
        ));
        assert_eq!(catalog.prepare_review(1, "u1", review, 10).unwrap().id, 1);
    }

    #[test]
    fn reviews_newest_first() {
        let mut catalog = Catalog::new();
        catalog.insert_bike(payload("Shine").into_bike(1));
        for (at, comment) in [(100, "first one"), (300, "third one"), (200, "second one"), (300, "fourth one")] {
            let r = catalog
                .prepare_review(1, "u", NewReview { rating: 3, comment: comment.into() }, at)
                .unwrap();
            catalog.insert_review(r);
        }
        let reviews = catalog.reviews_for(1);
        let order: Vec<&str> = reviews.iter().map(|r| r.comment.as_str()).collect();
        assert_eq!(order, vec!["fourth one", "third one", "second one", "first one"]);
        assert!(catalog.reviews_for(2).is_empty());
    }
}
