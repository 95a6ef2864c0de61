use std::fmt;

use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ShowroomError};

/// Showroom shelf a bike is listed under.
///
/// The five named shelves are the ones the storefront links to; any other
/// label is kept verbatim so older rows (e.g. "Premium") survive a round trip.
#[derive(Archive, RkyvDeserialize, RkyvSerialize, Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[archive(check_bytes)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Trending,
    Popular,
    Electric,
    Upcoming,
    Standard,
    Other(String),
}

impl Category {
    pub const LISTED: [Category; 5] = [
        Category::Trending,
        Category::Popular,
        Category::Electric,
        Category::Upcoming,
        Category::Standard,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Category::Trending => "Trending",
            Category::Popular => "Popular",
            Category::Electric => "Electric",
            Category::Upcoming => "Upcoming",
            Category::Standard => "Standard",
            Category::Other(label) => label,
        }
    }
}

impl From<String> for Category {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Trending" => Category::Trending,
            "Popular" => Category::Popular,
            "Electric" => Category::Electric,
            "Upcoming" => Category::Upcoming,
            "Standard" => Category::Standard,
            _ => Category::Other(label),
        }
    }
}

impl From<&str> for Category {
    fn from(label: &str) -> Self {
        Category::from(label.to_string())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        match category {
            Category::Other(label) => label,
            named => named.as_str().to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bike on the showroom floor.
#[derive(Archive, RkyvDeserialize, RkyvSerialize, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[archive(check_bytes)]
#[serde(rename_all = "camelCase")]
pub struct Bike {
    /// Assigned by the store on creation, never reused.
    pub id: u64,
    pub name: String,
    /// Ex-showroom price in whole rupees.
    pub price: u64,
    pub year: u32,
    /// Engine displacement; 0 for electric drivetrains.
    pub cc: u32,
    pub mileage: Option<String>,
    pub transmission: Option<String>,
    pub power: Option<String>,
    pub torque: Option<String>,
    pub top_speed: Option<String>,
    pub fuel_type: Option<String>,
    pub abs: Option<String>,
    pub weight: Option<String>,
    pub tank_capacity: Option<String>,
    pub rating: Option<String>,
    pub image_url: String,
    pub brand: String,
    pub description: Option<String>,
    pub category: Category,
    pub available_colors: Vec<String>,
}

/// Creation payload: everything but the id.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewBike {
    pub name: String,
    pub price: u64,
    pub year: u32,
    pub cc: u32,
    #[serde(default)]
    pub mileage: Option<String>,
    #[serde(default)]
    pub transmission: Option<String>,
    #[serde(default)]
    pub power: Option<String>,
    #[serde(default)]
    pub torque: Option<String>,
    #[serde(default)]
    pub top_speed: Option<String>,
    #[serde(default)]
    pub fuel_type: Option<String>,
    #[serde(default)]
    pub abs: Option<String>,
    #[serde(default)]
    pub weight: Option<String>,
    #[serde(default)]
    pub tank_capacity: Option<String>,
    #[serde(default)]
    pub rating: Option<String>,
    pub image_url: String,
    pub brand: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: Category,
    #[serde(default)]
    pub available_colors: Vec<String>,
}

impl NewBike {
    /// Minimal payload; descriptive fields start unset.
    pub fn new(
        name: impl Into<String>,
        brand: impl Into<String>,
        category: impl Into<Category>,
        price: u64,
        year: u32,
        cc: u32,
        image_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            price,
            year,
            cc,
            mileage: None,
            transmission: None,
            power: None,
            torque: None,
            top_speed: None,
            fuel_type: None,
            abs: None,
            weight: None,
            tank_capacity: None,
            rating: None,
            image_url: image_url.into(),
            brand: brand.into(),
            description: None,
            category: category.into(),
            available_colors: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_text("name", &self.name)?;
        require_text("imageUrl", &self.image_url)?;
        require_text("brand", &self.brand)?;
        require_text("category", self.category.as_str())?;
        if let Some(rating) = &self.rating {
            check_rating(rating)?;
        }
        Ok(())
    }

    pub fn into_bike(self, id: u64) -> Bike {
        Bike {
            id,
            name: self.name,
            price: self.price,
            year: self.year,
            cc: self.cc,
            mileage: self.mileage,
            transmission: self.transmission,
            power: self.power,
            torque: self.torque,
            top_speed: self.top_speed,
            fuel_type: self.fuel_type,
            abs: self.abs,
            weight: self.weight,
            tank_capacity: self.tank_capacity,
            rating: self.rating,
            image_url: self.image_url,
            brand: self.brand,
            description: self.description,
            category: self.category,
            available_colors: self.available_colors,
        }
    }
}

/// Partial update. Absent fields keep their stored value.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BikeUpdate {
    pub name: Option<String>,
    pub price: Option<u64>,
    pub year: Option<u32>,
    pub cc: Option<u32>,
    pub mileage: Option<String>,
    pub transmission: Option<String>,
    pub power: Option<String>,
    pub torque: Option<String>,
    pub top_speed: Option<String>,
    pub fuel_type: Option<String>,
    pub abs: Option<String>,
    pub weight: Option<String>,
    pub tank_capacity: Option<String>,
    pub rating: Option<String>,
    pub image_url: Option<String>,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub available_colors: Option<Vec<String>>,
}

impl BikeUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            require_text("name", name)?;
        }
        if let Some(url) = &self.image_url {
            require_text("imageUrl", url)?;
        }
        if let Some(brand) = &self.brand {
            require_text("brand", brand)?;
        }
        if let Some(category) = &self.category {
            require_text("category", category.as_str())?;
        }
        if let Some(rating) = &self.rating {
            check_rating(rating)?;
        }
        Ok(())
    }

    pub fn apply(self, bike: &mut Bike) {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(v) = value {
                *slot = v;
            }
        }
        fn set_opt<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        set(&mut bike.name, self.name);
        set(&mut bike.price, self.price);
        set(&mut bike.year, self.year);
        set(&mut bike.cc, self.cc);
        set_opt(&mut bike.mileage, self.mileage);
        set_opt(&mut bike.transmission, self.transmission);
        set_opt(&mut bike.power, self.power);
        set_opt(&mut bike.torque, self.torque);
        set_opt(&mut bike.top_speed, self.top_speed);
        set_opt(&mut bike.fuel_type, self.fuel_type);
        set_opt(&mut bike.abs, self.abs);
        set_opt(&mut bike.weight, self.weight);
        set_opt(&mut bike.tank_capacity, self.tank_capacity);
        set_opt(&mut bike.rating, self.rating);
        set(&mut bike.image_url, self.image_url);
        set(&mut bike.brand, self.brand);
        set_opt(&mut bike.description, self.description);
        set(&mut bike.category, self.category);
        set(&mut bike.available_colors, self.available_colors);
    }
}

/// A customer review of one bike.
#[derive(Archive, RkyvDeserialize, RkyvSerialize, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[archive(check_bytes)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: u64,
    pub bike_id: u64,
    pub user_id: String,
    pub rating: u8,
    pub comment: String,
    /// Unix milliseconds, stamped by the store.
    pub created_at: u64,
}

pub const MIN_COMMENT_CHARS: usize = 5;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NewReview {
    pub rating: u8,
    pub comment: String,
}

impl NewReview {
    pub fn validate(&self) -> Result<()> {
        if !(1..=5).contains(&self.rating) {
            return Err(ShowroomError::validation("rating", "must be between 1 and 5"));
        }
        if self.comment.chars().count() < MIN_COMMENT_CHARS {
            return Err(ShowroomError::validation(
                "comment",
                format!("must be at least {} characters", MIN_COMMENT_CHARS),
            ));
        }
        Ok(())
    }
}

fn require_text(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ShowroomError::validation(field, "is required"));
    }
    Ok(())
}

fn check_rating(rating: &str) -> Result<()> {
    match rating.trim().parse::<f64>() {
        Ok(r) if (0.0..=5.0).contains(&r) => Ok(()),
        _ => Err(ShowroomError::validation("rating", "must be a number between 0 and 5")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_keeps_unknown_labels() {
        let c: Category = serde_json::from_str("\"Premium\"").unwrap();
        assert_eq!(c, Category::Other("Premium".into()));
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"Premium\"");

        let e: Category = serde_json::from_str("\"Electric\"").unwrap();
        assert_eq!(e, Category::Electric);
    }

    #[test]
    fn new_bike_defaults_optional_fields() {
        let json = r#"{"name":"Ather 450X","price":138000,"year":2024,"cc":0,
            "imageUrl":"ather.png","brand":"Ather","category":"Electric"}"#;
        let bike: NewBike = serde_json::from_str(json).unwrap();
        assert!(bike.mileage.is_none());
        assert!(bike.available_colors.is_empty());
        bike.validate().unwrap();
    }

    #[test]
    fn new_bike_rejects_blank_required_text() {
        let bike = NewBike::new("  ", "KTM", "Trending", 1, 2024, 390, "x.png");
        let err = bike.validate().unwrap_err();
        assert_eq!(err.field(), Some("name"));

        let bike = NewBike::new("Duke", "KTM", "", 1, 2024, 390, "x.png");
        assert_eq!(bike.validate().unwrap_err().field(), Some("category"));
    }

    #[test]
    fn negative_price_is_a_decode_error() {
        let json = r#"{"name":"X","price":-5,"year":2024,"cc":100,
            "imageUrl":"x","brand":"B","category":"Standard"}"#;
        assert!(serde_json::from_str::<NewBike>(json).is_err());
    }

    #[test]
    fn update_touches_only_present_fields() {
        let mut bike = NewBike::new("Duke 390", "KTM", "Trending", 311000, 2024, 399, "d.png").into_bike(7);
        let update = BikeUpdate { price: Some(299000), mileage: Some("28 kmpl".into()), ..Default::default() };
        update.validate().unwrap();
        update.apply(&mut bike);

        assert_eq!(bike.id, 7);
        assert_eq!(bike.price, 299000);
        assert_eq!(bike.mileage.as_deref(), Some("28 kmpl"));
        assert_eq!(bike.name, "Duke 390");
    }

    #[test]
    fn review_bounds() {
        assert!(NewReview { rating: 0, comment: "great bike".into() }.validate().is_err());
        assert!(NewReview { rating: 6, comment: "great bike".into() }.validate().is_err());
        assert!(NewReview { rating: 5, comment: "ok".into() }.validate().is_err());
        assert!(NewReview { rating: 1, comment: "meh!!".into() }.validate().is_ok());
    }

    #[test]
    fn serializes_camel_case() {
        let bike = NewBike::new("R15", "Yamaha", "Trending", 182000, 2024, 155, "r15.png").into_bike(1);
        let v = serde_json::to_value(&bike).unwrap();
        assert_eq!(v["imageUrl"], "r15.png");
        assert!(v.get("availableColors").is_some());
        assert!(v.get("topSpeed").is_some());
    }
}
