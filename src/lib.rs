//! foodlens library
//!
//! Food product lookup across USDA FoodData Central and Open Food Facts, with
//! a TTL cache and user-authored custom products on top of a key-value store.
//! `lookup::FoodLookup` is the entry point.

pub mod cache;
pub mod cli;
pub mod clock;
pub mod config;
pub mod custom;
pub mod data;
pub mod lookup;
pub mod store;

pub use data::{FoodProduct, FoodSource, NewFoodProduct};
pub use lookup::{FoodLookup, DEFAULT_SEARCH_LIMIT};
