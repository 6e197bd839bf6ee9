//! Data models for Fridge Tracker entities.
//!
//! - `Item`: an entry in the user's catalog of item definitions
//! - `Fridge`, `FridgeItem`: named fridges and the stock stored in them
//! - `ApiErrorResponse`: the backend's application-level error body

pub mod error;
pub mod fridge;
pub mod item;

pub use error::ApiErrorResponse;
pub use fridge::{Fridge, FridgeItem, NewFridgeItem, StockDates};
pub use item::Item;
