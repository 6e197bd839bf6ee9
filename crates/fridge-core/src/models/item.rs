use serde::{Deserialize, Serialize};

use super::fridge::parse_api_date;

/// A catalog entry describing something that can be stored in a fridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    #[serde(rename = "createdOn", default)]
    pub created_on: Option<String>,
}

impl Item {
    pub fn created_date(&self) -> Option<chrono::NaiveDate> {
        self.created_on.as_deref().and_then(parse_api_date)
    }
}

/// Request body for creating or renaming an item.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ItemName<'a> {
    pub name: &'a str,
}
