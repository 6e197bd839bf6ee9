use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fridge {
    pub id: String,
    pub name: String,
    #[serde(rename = "createdOn", default)]
    pub created_on: Option<String>,
}

/// A stock entry: one item stored in one fridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FridgeItem {
    pub id: String,
    #[serde(rename = "fridgeId")]
    pub fridge_id: String,
    #[serde(rename = "itemId")]
    pub item_id: String,
    #[serde(rename = "itemName", default)]
    pub item_name: String,
    #[serde(rename = "bestBeforeDate")]
    pub best_before_date: String,
    #[serde(rename = "storedAt")]
    pub stored_at: String,
}

impl FridgeItem {
    pub fn best_before(&self) -> Option<NaiveDate> {
        parse_api_date(&self.best_before_date)
    }

    pub fn stored_on(&self) -> Option<NaiveDate> {
        parse_api_date(&self.stored_at)
    }
}

/// Request body for adding stock to a fridge.
#[derive(Debug, Clone, Serialize)]
pub struct NewFridgeItem {
    #[serde(rename = "itemId")]
    pub item_id: String,
    #[serde(rename = "bestBeforeDate")]
    pub best_before_date: NaiveDate,
    #[serde(rename = "storedAt")]
    pub stored_at: NaiveDate,
}

/// Request body for changing the dates on an existing stock entry.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StockDates {
    #[serde(rename = "bestBeforeDate")]
    pub best_before_date: NaiveDate,
    #[serde(rename = "storedAt")]
    pub stored_at: NaiveDate,
}

/// Parse a date the backend sent either as `YYYY-MM-DD` or as a full
/// RFC 3339 timestamp.
pub(crate) fn parse_api_date(value: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.date_naive());
    }
    // Timestamps without an offset, e.g. "2025-03-01T10:00:00"
    value
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}
