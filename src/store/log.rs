use std::fs;
use std::path::Path;
use std::sync::{Mutex, RwLock};

use tracing::{info, warn};

use super::{now_millis, CatalogStore};
use crate::catalog::Catalog;
use crate::error::{Result, ShowroomError};
use crate::filter::BikeFilter;
use crate::model::{Bike, BikeUpdate, NewBike, NewReview, Review};
use crate::storage::{CatalogImage, LogEntry, Segment};

/// Durable store: every change is appended to a [`Segment`] before it
/// becomes visible, and the catalog is rebuilt from the segment on open.
///
/// Lock order is catalog, then segment.
#[derive(Debug)]
pub struct LogStore {
    segment: Mutex<Segment>,
    catalog: RwLock<Catalog>,
    strict_durability: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionStats {
    pub bikes: usize,
    pub reviews: usize,
    pub bytes_before: u64,
    pub bytes_after: u64,
}

impl LogStore {
    pub fn open(path: &Path, strict_durability: bool) -> Result<Self> {
        let mut segment = Segment::new(path, strict_durability)?;
        let entries = segment.replay()?;

        let mut catalog = Catalog::new();
        let replayed = entries.len();
        for entry in entries {
            apply(&mut catalog, entry);
        }
        info!(
            "opened {} ({} entries, {} bikes, {} reviews)",
            path.display(),
            replayed,
            catalog.len(),
            catalog.all_reviews().len()
        );

        Ok(Self {
            segment: Mutex::new(segment),
            catalog: RwLock::new(catalog),
            strict_durability,
        })
    }

    /// Appends `entry` and, only once that succeeded, applies it.
    fn commit(&self, catalog: &mut Catalog, entry: LogEntry) -> Result<()> {
        self.segment
            .lock()
            .map_err(|_| ShowroomError::Poisoned)?
            .append(&entry)?;
        apply(catalog, entry);
        Ok(())
    }

    // --- SNAPSHOTS ---

    /// rkyv image of every bike and review.
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        let catalog = self.catalog.read().map_err(|_| ShowroomError::Poisoned)?;
        let image = image_of(&catalog);
        info!("[SNAPSHOT] serializing {} bikes, {} reviews", image.bikes.len(), image.reviews.len());
        Ok(image.to_bytes()?)
    }

    /// Replaces the whole showroom with a snapshot, on disk and in memory.
    pub fn restore(&self, snapshot: &[u8]) -> Result<()> {
        info!("[RESTORE] reading snapshot ({} bytes)", snapshot.len());
        let image = CatalogImage::from_bytes(snapshot).map_err(|e| ShowroomError::Encoding(e.to_string()))?;

        let mut catalog = self.catalog.write().map_err(|_| ShowroomError::Poisoned)?;
        let mut segment = self.segment.lock().map_err(|_| ShowroomError::Poisoned)?;

        self.rewrite(&mut segment, &image)?;

        let mut restored = Catalog::new();
        for entry in image.entries() {
            apply(&mut restored, entry);
        }
        *catalog = restored;

        info!("[RESTORE] {} bikes, {} reviews", catalog.len(), catalog.all_reviews().len());
        Ok(())
    }

    /// Folds every update into its bike so the segment holds exactly one
    /// entry per bike and per review.
    pub fn compact(&self) -> Result<CompactionStats> {
        // Writers need the catalog write lock, so a read lock stops them.
        let catalog = self.catalog.read().map_err(|_| ShowroomError::Poisoned)?;
        let mut segment = self.segment.lock().map_err(|_| ShowroomError::Poisoned)?;

        let bytes_before = segment.len();
        let image = image_of(&catalog);
        self.rewrite(&mut segment, &image)?;

        let stats = CompactionStats {
            bikes: image.bikes.len(),
            reviews: image.reviews.len(),
            bytes_before,
            bytes_after: segment.len(),
        };
        info!(
            "[GC] compaction complete: {} -> {} bytes ({} bikes, {} reviews)",
            stats.bytes_before, stats.bytes_after, stats.bikes, stats.reviews
        );
        Ok(stats)
    }

    /// Writes `image` to a sibling file and swaps it in place of the segment.
    fn rewrite(&self, segment: &mut Segment, image: &CatalogImage) -> Result<()> {
        let live_path = segment.file_path.clone();
        let new_path = live_path.with_extension("compacted");
        if new_path.exists() {
            warn!("removing stale {}", new_path.display());
            fs::remove_file(&new_path)?;
        }

        let mut fresh = Segment::new(&new_path, true)?;
        for entry in image.entries() {
            fresh.append(&entry)?;
        }
        drop(fresh);

        fs::rename(&new_path, &live_path)?;
        *segment = Segment::new(&live_path, self.strict_durability)?;
        Ok(())
    }
}

fn apply(catalog: &mut Catalog, entry: LogEntry) {
    match entry {
        LogEntry::BikeCreated(bike) => catalog.insert_bike(bike),
        LogEntry::BikeUpdated(bike) => {
            let id = bike.id;
            if !catalog.replace_bike(bike) {
                warn!("update for unknown bike {} skipped", id);
            }
        }
        LogEntry::ReviewCreated(review) => catalog.insert_review(review),
    }
}

fn image_of(catalog: &Catalog) -> CatalogImage {
    CatalogImage {
        bikes: catalog.bikes().to_vec(),
        reviews: catalog.all_reviews().to_vec(),
    }
}

impl CatalogStore for LogStore {
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
        self.commit(&mut catalog, LogEntry::BikeCreated(bike.clone()))?;
        info!("created bike {} ({})", bike.id, bike.name);
        Ok(bike)
    }

    fn update_bike(&self, id: u64, update: BikeUpdate) -> Result<Bike> {
        let mut catalog = self.catalog.write().map_err(|_| ShowroomError::Poisoned)?;
        let bike = catalog.prepare_update(id, update)?;
        self.commit(&mut catalog, LogEntry::BikeUpdated(bike.clone()))?;
        info!("updated bike {}", id);
        Ok(bike)
    }

    fn list_reviews(&self, bike_id: u64) -> Result<Vec<Review>> {
        let catalog = self.catalog.read().map_err(|_| ShowroomError::Poisoned)?;
        Ok(catalog.reviews_for(bike_id))
    }

    fn create_review(&self, bike_id: u64, user_id: &str, payload: NewReview) -> Result<Review> {
        let mut catalog = self.catalog.write().map_err(|_| ShowroomError::Poisoned)?;
        let review = catalog.prepare_review(bike_id, user_id, payload, now_millis())?;
        self.commit(&mut catalog, LogEntry::ReviewCreated(review.clone()))?;
        Ok(review)
    }

    fn bike_count(&self) -> Result<usize> {
        let catalog = self.catalog.read().map_err(|_| ShowroomError::Poisoned)?;
        Ok(catalog.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn duke() -> NewBike {
        NewBike::new("KTM Duke 390", "KTM", "Trending", 311000, 2024, 399, "duke.png")
    }

    #[test]
    fn reopen_restores_bikes_updates_and_reviews() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("showroom.dat");

        {
            let store = LogStore::open(&path, false).unwrap();
            let bike = store.create_bike(duke()).unwrap();
            store
                .update_bike(bike.id, BikeUpdate { price: Some(299000), ..Default::default() })
                .unwrap();
            store
                .create_review(bike.id, "rider-1", NewReview { rating: 5, comment: "Sharp handling".into() })
                .unwrap();
        }

        let store = LogStore::open(&path, false).unwrap();
        let bike = store.get_bike(1).unwrap();
        assert_eq!(bike.price, 299000);
        assert_eq!(store.list_reviews(1).unwrap().len(), 1);
        assert_eq!(store.create_bike(duke()).unwrap().id, 2);
    }

    #[test]
    fn compaction_folds_updates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("showroom.dat");
        let store = LogStore::open(&path, false).unwrap();

        let bike = store.create_bike(duke()).unwrap();
        for price in [300000, 295000, 290000] {
            store
                .update_bike(bike.id, BikeUpdate { price: Some(price), ..Default::default() })
                .unwrap();
        }

        let stats = store.compact().unwrap();
        assert_eq!(stats.bikes, 1);
        assert!(stats.bytes_after < stats.bytes_before);

        store.create_bike(duke()).unwrap();
        drop(store);

        let store = LogStore::open(&path, false).unwrap();
        assert_eq!(store.get_bike(1).unwrap().price, 290000);
        assert_eq!(store.bike_count().unwrap(), 2);
    }

    #[test]
    fn restore_replaces_contents() {
        let dir = TempDir::new().unwrap();
        let source = LogStore::open(&dir.path().join("a.dat"), false).unwrap();
        source.create_bike(duke()).unwrap();
        let snapshot = source.snapshot().unwrap();

        let target_path = dir.path().join("b.dat");
        let target = LogStore::open(&target_path, false).unwrap();
        target.create_bike(duke()).unwrap();
        target.create_bike(duke()).unwrap();
        target.restore(&snapshot).unwrap();
        assert_eq!(target.bike_count().unwrap(), 1);
        drop(target);

        let reopened = LogStore::open(&target_path, false).unwrap();
        assert_eq!(reopened.bike_count().unwrap(), 1);
    }

    #[test]
    fn rejected_payload_leaves_log_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("showroom.dat");
        let store = LogStore::open(&path, false).unwrap();

        let mut bad = duke();
        bad.name = String::new();
        assert!(store.create_bike(bad).is_err());
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }
}
