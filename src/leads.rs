//! WhatsApp enquiry links.
//!
//! A lead is just a prefilled chat with the dealer: `https://wa.me/<phone>?text=<message>`.
//! Nothing is sent from here; the buyer's own client opens the link.

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ShowroomError};
use crate::model::Bike;

pub const DEFAULT_PHONE: &str = "919390389606";
pub const DEFAULT_DEALER: &str = "Rakesh";

const WHATSAPP_BASE: &str = "https://wa.me/";

/// Who receives enquiries.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Dealer {
    /// International format, digits only (no `+`).
    pub phone: String,
    pub name: String,
}

impl Default for Dealer {
    fn default() -> Self {
        Self { phone: DEFAULT_PHONE.to_string(), name: DEFAULT_DEALER.to_string() }
    }
}

impl Dealer {
    pub fn new(phone: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let dealer = Self { phone: phone.into(), name: name.into() };
        dealer.validate()?;
        Ok(dealer)
    }

    pub fn validate(&self) -> Result<()> {
        if self.phone.is_empty() || !self.phone.chars().all(|c| c.is_ascii_digit()) {
            return Err(ShowroomError::validation("phone", "must be digits only, with country code"));
        }
        if self.name.trim().is_empty() {
            return Err(ShowroomError::validation("name", "is required"));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LeadKind {
    /// Quick "Enquire" button on a listing card.
    #[default]
    Card,
    /// "Get WhatsApp Offer" on the detail page; carries price and year.
    Offer,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Lead {
    pub message: String,
    pub url: String,
}

pub fn enquiry_message(bike: &Bike, kind: LeadKind, dealer: &Dealer) -> String {
    match kind {
        LeadKind::Card => format!(
            "Hi, I'm interested in the {}. Can you provide more details?",
            bike.name
        ),
        LeadKind::Offer => format!(
            "Hello {},\nI am interested in this bike:\n\nBike Name: {}\nPrice: {}\nManufactured Year: {}\n\nPlease share full details and availability.",
            dealer.name,
            bike.name,
            format_inr(bike.price),
            bike.year
        ),
    }
}

pub fn whatsapp_link(bike: &Bike, kind: LeadKind, dealer: &Dealer) -> Result<Lead> {
    dealer.validate()?;
    let message = enquiry_message(bike, kind, dealer);
    let url = Url::parse_with_params(&format!("{}{}", WHATSAPP_BASE, dealer.phone), &[("text", &message)])
        .map_err(|e| ShowroomError::validation("phone", e.to_string()))?;
    Ok(Lead { message, url: url.into() })
}

/// Showroom price tag: three significant digits, lakh grouping, e.g. `₹1,82,000`.
pub fn format_inr(amount: u64) -> String {
    format_inr_exact(round_significant(amount, 3))
}

/// Whole rupees with lakh grouping and no rounding, e.g. `₹5,915`.
pub fn format_inr_exact(amount: u64) -> String {
    let digits = amount.to_string();
    if digits.len() <= 3 {
        return format!("₹{}", digits);
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 2 {
        groups.push(&head[end - 2..end]);
        end -= 2;
    }
    groups.push(&head[..end]);
    groups.reverse();

    format!("₹{},{}", groups.join(","), tail)
}

// Amounts too close to u64::MAX to round up are returned as is.
fn round_significant(amount: u64, keep: u32) -> u64 {
    let digits = amount.checked_ilog10().map_or(1, |d| d + 1);
    if digits <= keep {
        return amount;
    }
    let factor = 10u64.pow(digits - keep);
    amount
        .checked_add(factor / 2)
        .map_or(amount, |bumped| bumped / factor * factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewBike;

    fn r15() -> Bike {
        NewBike::new("Yamaha R15 V4", "Yamaha", "Trending", 182000, 2024, 155, "r15.png").into_bike(1)
    }

    #[test]
    fn lakh_grouping() {
        assert_eq!(format_inr(0), "₹0");
        assert_eq!(format_inr(999), "₹999");
        assert_eq!(format_inr(182000), "₹1,82,000");
        assert_eq!(format_inr(935000), "₹9,35,000");
        assert_eq!(format_inr(1234567), "₹12,30,000");
        assert_eq!(format_inr(13_850_000), "₹1,39,00,000");
        assert_eq!(format_inr(u64::MAX), "₹1,84,46,74,40,73,70,95,51,615");
    }

    #[test]
    fn exact_amounts_keep_every_rupee() {
        assert_eq!(format_inr_exact(5915), "₹5,915");
        assert_eq!(format_inr(5915), "₹5,920");
        assert_eq!(format_inr_exact(212_940), "₹2,12,940");
        assert_eq!(format_inr_exact(42), "₹42");
    }

    #[test]
    fn card_link() {
        let lead = whatsapp_link(&r15(), LeadKind::Card, &Dealer::default()).unwrap();
        assert_eq!(lead.message, "Hi, I'm interested in the Yamaha R15 V4. Can you provide more details?");
        assert!(lead.url.starts_with("https://wa.me/919390389606?text="));
        assert!(!lead.url.contains(' '));
    }

    #[test]
    fn offer_message_carries_price_and_year() {
        let dealer = Dealer::new("911234567890", "Asha").unwrap();
        let lead = whatsapp_link(&r15(), LeadKind::Offer, &dealer).unwrap();
        assert!(lead.message.starts_with("Hello Asha,"));
        assert!(lead.message.contains("Price: ₹1,82,000"));
        assert!(lead.message.contains("Manufactured Year: 2024"));
        assert!(lead.url.starts_with("https://wa.me/911234567890?text="));
    }

    #[test]
    fn rejects_formatted_phone_numbers() {
        assert!(Dealer::new("+91 93903 89606", "Rakesh").is_err());
    }
}
