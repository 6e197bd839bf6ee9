//! Fridge endpoints under `/fridges`, including per-fridge stock.

use serde::Serialize;

use crate::models::{Fridge, FridgeItem, NewFridgeItem, StockDates};

use super::{ApiClient, ApiError, RequestSpec};

#[derive(Serialize)]
struct FridgeName<'a> {
    name: &'a str,
}

impl ApiClient {
    // ===== Fridges =====

    pub async fn list_fridges(&self) -> Result<Vec<Fridge>, ApiError> {
        self.fetch(&RequestSpec::get("/fridges")).await
    }

    pub async fn create_fridge(&self, name: &str) -> Result<(), ApiError> {
        let spec = RequestSpec::post("/fridges").json(&FridgeName { name })?;
        self.send(&spec).await
    }

    pub async fn delete_fridge(&self, id: &str) -> Result<(), ApiError> {
        self.send(&RequestSpec::delete(format!("/fridges/{}", id))).await
    }

    // ===== Stock =====

    pub async fn list_fridge_items(&self, fridge_id: &str) -> Result<Vec<FridgeItem>, ApiError> {
        self.fetch(&RequestSpec::get(format!("/fridges/{}/items", fridge_id)))
            .await
    }

    pub async fn add_fridge_item(&self, fridge_id: &str, entry: &NewFridgeItem) -> Result<(), ApiError> {
        let spec = RequestSpec::post(format!("/fridges/{}/items", fridge_id)).json(entry)?;
        self.send(&spec).await
    }

    pub async fn update_fridge_item(
        &self,
        fridge_id: &str,
        fridge_item_id: &str,
        dates: StockDates,
    ) -> Result<(), ApiError> {
        let spec = RequestSpec::put(format!("/fridges/{}/items/{}", fridge_id, fridge_item_id))
            .json(&dates)?;
        self.send(&spec).await
    }

    pub async fn remove_fridge_item(&self, fridge_id: &str, fridge_item_id: &str) -> Result<(), ApiError> {
        self.send(&RequestSpec::delete(format!(
            "/fridges/{}/items/{}",
            fridge_id, fridge_item_id
        )))
        .await
    }
}
