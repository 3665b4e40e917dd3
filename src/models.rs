use serde::{Deserialize, Serialize};
use std::fmt;

/// Fully rendered ad page plus the URL it was fetched from.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub url: String,
    pub html: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DealKind {
    Bogo,
    Discount,
    PriceDrop,
    Other,
}

impl fmt::Display for DealKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DealKind::Bogo => "BOGO",
            DealKind::Discount => "Discount",
            DealKind::PriceDrop => "Price Drop",
            DealKind::Other => "Deal",
        };
        write!(f, "{label}")
    }
}

/// One matched entry from the weekly ad, in document order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub product_name: String,
    pub discount_text: String,
    pub current_price: Option<String>,
    pub savings: Option<String>,
    pub kind: DealKind,
    pub is_bogo: bool,
    #[serde(skip)]
    pub full_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deal_kind_labels() {
        assert_eq!(DealKind::Bogo.to_string(), "BOGO");
        assert_eq!(DealKind::PriceDrop.to_string(), "Price Drop");
        assert_eq!(DealKind::Other.to_string(), "Deal");
    }

    #[test]
    fn test_deal_serializes_without_full_text() {
        let deal = Deal {
            product_name: "Wonder Bread".to_string(),
            discount_text: "$2.50 off".to_string(),
            current_price: Some("$2.50".to_string()),
            savings: None,
            kind: DealKind::Other,
            is_bogo: false,
            full_text: "Wonder Bread $2.50 off".to_string(),
        };
        let json = serde_json::to_string(&deal).unwrap();
        assert!(json.contains("Wonder Bread"));
        assert!(!json.contains("full_text"));
    }
}
