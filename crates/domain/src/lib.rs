//! Order and promocode core.
//!
//! This crate provides:
//! - `OrderService`: basket resolution, line-item mutation, status
//!   transitions and guest-to-user merge
//! - `PromocodeService`: eligibility checks and discount application
//! - `Catalog`: the food lookup collaborator
//! - Total recomputation shared by both services

pub mod catalog;
pub mod config;
pub mod error;
mod operation;
pub mod order;
pub mod promocode;

pub use catalog::{Catalog, CatalogError, FoodItem, InMemoryCatalog};
pub use config::ServiceConfig;
pub use error::{DomainError, ErrorKind};
pub use order::{BasketRef, FoodLineItem, MergeOutcome, Order, OrderError, OrderService, compute_total};
pub use promocode::{EligibilityFacts, PromocodeError, PromocodeService};

pub use order_store::{NewPromocode, Promocode, PromocodeKind};
