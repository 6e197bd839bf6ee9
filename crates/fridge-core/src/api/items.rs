//! Catalog endpoints under `/items`.

use crate::models::item::ItemName;
use crate::models::Item;

use super::{ApiClient, ApiError, RequestSpec};

impl ApiClient {
    pub async fn list_items(&self) -> Result<Vec<Item>, ApiError> {
        self.fetch(&RequestSpec::get("/items")).await
    }

    pub async fn create_item(&self, name: &str) -> Result<(), ApiError> {
        let spec = RequestSpec::post("/items").json(&ItemName { name })?;
        self.send(&spec).await
    }

    pub async fn rename_item(&self, id: &str, name: &str) -> Result<(), ApiError> {
        let spec = RequestSpec::put(format!("/items/{}", id)).json(&ItemName { name })?;
        self.send(&spec).await
    }

    pub async fn delete_item(&self, id: &str) -> Result<(), ApiError> {
        self.send(&RequestSpec::delete(format!("/items/{}", id))).await
    }
}
