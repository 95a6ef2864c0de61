//! Motorcycle showroom backend: catalog listing with filters and sort
//! orders, bike reviews, an EMI calculator and WhatsApp enquiry links.

pub mod catalog;
pub mod emi;
pub mod error;
pub mod filter;
pub mod leads;
pub mod manager;
pub mod model;
pub mod parser;
pub mod seed;
pub mod server;
pub mod storage;
pub mod store;

pub use crate::error::{Result, ShowroomError};
pub use crate::filter::{BikeFilter, SortOrder};
pub use crate::model::{Bike, BikeUpdate, Category, NewBike, NewReview, Review};
pub use crate::store::{CatalogStore, LogStore, MemoryStore};
