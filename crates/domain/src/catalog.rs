//! Food catalog collaborator.
//!
//! Orders snapshot catalog entries into their line items; the catalog itself
//! is owned elsewhere and only read here.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{FoodId, Money, RestaurantId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// A catalog entry as seen at lookup time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodItem {
    pub id: FoodId,
    pub name: String,
    pub price: Money,
    /// Portion weight in grams.
    pub weight: i32,
    #[serde(default)]
    pub image_url: String,
    pub restaurant_id: RestaurantId,
}

/// Errors returned by a [`Catalog`].
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No food with this id.
    #[error("Food {0} not found in catalog")]
    NotFound(FoodId),

    /// The catalog could not be reached.
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

/// Read access to the food catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Looks up a food by id.
    async fn food_by_id(&self, id: FoodId) -> Result<FoodItem, CatalogError>;
}

/// Catalog held in memory, used by tests and by the service when no
/// external catalog is configured.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    items: Arc<RwLock<HashMap<FoodId, FoodItem>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog pre-filled with `items`.
    pub fn with_items(items: impl IntoIterator<Item = FoodItem>) -> Self {
        let items = items.into_iter().map(|item| (item.id, item)).collect();
        Self {
            items: Arc::new(RwLock::new(items)),
        }
    }

    /// Inserts or replaces an entry.
    pub async fn insert(&self, item: FoodItem) {
        self.items.write().await.insert(item.id, item);
    }

    /// Returns the number of entries.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn food_by_id(&self, id: FoodId) -> Result<FoodItem, CatalogError> {
        self.items
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(CatalogError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pizza() -> FoodItem {
        FoodItem {
            id: FoodId::new(1),
            name: "Pizza".to_string(),
            price: Money::new(500),
            weight: 450,
            image_url: String::new(),
            restaurant_id: RestaurantId::new(7),
        }
    }

    #[tokio::test]
    async fn lookup_finds_inserted_item() {
        let catalog = InMemoryCatalog::new();
        catalog.insert(pizza()).await;

        let item = catalog.food_by_id(FoodId::new(1)).await.unwrap();
        assert_eq!(item.name, "Pizza");
        assert_eq!(catalog.len().await, 1);
    }

    #[tokio::test]
    async fn lookup_of_unknown_food_fails() {
        let catalog = InMemoryCatalog::with_items([pizza()]);
        let result = catalog.food_by_id(FoodId::new(2)).await;
        assert!(matches!(result, Err(CatalogError::NotFound(id)) if id == FoodId::new(2)));
    }

    #[test]
    fn deserializes_without_image() {
        let json = r#"{"id":3,"name":"Soup","price":250,"weight":300,"restaurant_id":1}"#;
        let item: FoodItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.price, Money::new(250));
        assert!(item.image_url.is_empty());
    }
}
