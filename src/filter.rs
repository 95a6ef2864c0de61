use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShowroomError};
use crate::model::Bike;

/// Result ordering for a catalog listing.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    PriceAsc,
    PriceDesc,
    /// Newest model year first.
    Latest,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::PriceAsc => "price_asc",
            SortOrder::PriceDesc => "price_desc",
            SortOrder::Latest => "latest",
        }
    }

    /// Stable: bikes that compare equal keep their incoming order.
    pub fn sort(&self, bikes: &mut [Bike]) {
        match self {
            SortOrder::PriceAsc => bikes.sort_by(|a, b| a.price.cmp(&b.price)),
            SortOrder::PriceDesc => bikes.sort_by(|a, b| b.price.cmp(&a.price)),
            SortOrder::Latest => bikes.sort_by(|a, b| b.year.cmp(&a.year)),
        }
    }
}

impl FromStr for SortOrder {
    type Err = ShowroomError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "price_asc" => Ok(SortOrder::PriceAsc),
            "price_desc" => Ok(SortOrder::PriceDesc),
            "latest" => Ok(SortOrder::Latest),
            other => Err(ShowroomError::validation(
                "sort",
                format!("unknown sort order '{}'", other),
            )),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed, validated listing constraints. `None` means "no constraint".
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BikeFilter {
    pub brand: Option<String>,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    #[serde(rename = "minCC")]
    pub min_cc: Option<u32>,
    #[serde(rename = "maxCC")]
    pub max_cc: Option<u32>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort: Option<SortOrder>,
}

impl BikeFilter {
    pub fn is_unconstrained(&self) -> bool {
        self.brand.is_none()
            && self.min_price.is_none()
            && self.max_price.is_none()
            && self.min_cc.is_none()
            && self.max_cc.is_none()
            && self.category.is_none()
            && self.search.is_none()
    }

    pub fn matches(&self, bike: &Bike) -> bool {
        let needle = self.search.as_ref().map(|s| s.to_lowercase());
        self.matches_with(bike, needle.as_deref())
    }

    fn matches_with(&self, bike: &Bike, needle: Option<&str>) -> bool {
        if let Some(brand) = &self.brand {
            if bike.brand != *brand {
                return false;
            }
        }
        if self.min_price.map_or(false, |min| bike.price < min) {
            return false;
        }
        if self.max_price.map_or(false, |max| bike.price > max) {
            return false;
        }
        if self.min_cc.map_or(false, |min| bike.cc < min) {
            return false;
        }
        if self.max_cc.map_or(false, |max| bike.cc > max) {
            return false;
        }
        if let Some(category) = &self.category {
            if bike.category.as_str() != category {
                return false;
            }
        }
        if let Some(needle) = needle {
            if !bike.name.to_lowercase().contains(needle) {
                return false;
            }
        }
        true
    }

    /// Runs the listing: conjunctive filter, then the optional stable sort.
    /// Without a sort order the source order is kept.
    pub fn apply<'a, I>(&self, bikes: I) -> Vec<Bike>
    where
        I: IntoIterator<Item = &'a Bike>,
    {
        let needle = self.search.as_ref().map(|s| s.to_lowercase());
        let mut selected: Vec<Bike> = bikes
            .into_iter()
            .filter(|bike| self.matches_with(bike, needle.as_deref()))
            .cloned()
            .collect();

        if let Some(order) = self.sort {
            order.sort(&mut selected);
        }
        selected
    }
}

/// Listing parameters exactly as they arrive on a query string.
///
/// Nothing here is trusted; [`BikeQuery::parse`] turns it into a
/// [`BikeFilter`] or reports the first offending field.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct BikeQuery {
    pub brand: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    #[serde(rename = "minCC")]
    pub min_cc: Option<String>,
    #[serde(rename = "maxCC")]
    pub max_cc: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
}

impl BikeQuery {
    pub fn parse(self) -> Result<BikeFilter> {
        Ok(BikeFilter {
            brand: present(self.brand),
            min_price: number("minPrice", self.min_price)?,
            max_price: number("maxPrice", self.max_price)?,
            min_cc: number("minCC", self.min_cc)?,
            max_cc: number("maxCC", self.max_cc)?,
            category: present(self.category),
            search: present(self.search),
            sort: present(self.sort).map(|s| s.parse()).transpose()?,
        })
    }
}

// Browsers send empty inputs as `key=`; those mean "not set".
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn number<T: FromStr>(field: &'static str, raw: Option<String>) -> Result<Option<T>> {
    match present(raw) {
        None => Ok(None),
        Some(text) => text
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ShowroomError::validation(field, format!("'{}' is not a non-negative integer", text))),
    }
}
