//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container and need a Docker daemon,
//! so they are ignored by default. Run with:
//!
//! ```bash
//! cargo test -p order-store --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{FoodId, GuestToken, Money, OrderStatus, Owner, RestaurantId, UserId};
use order_store::{
    LineItemRecord, LineItemRepository, NewPromocode, OrderRepository, PostgresStore,
    PromocodeKind, PromocodeRepository, Store, StoreError, Transaction,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_order_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let store = PostgresStore::connect(&info.connection_string, 5)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE promocode_redemption, order_food, orders, promocode RESTART IDENTITY")
        .execute(store.pool())
        .await
        .unwrap();

    store
}

fn line_item(order: &order_store::OrderRecord, food: i64, count: u32, price: i64) -> LineItemRecord {
    let now = Utc::now();
    LineItemRecord {
        order_id: order.id,
        food_id: FoodId::new(food),
        count,
        name: format!("food-{food}"),
        weight: 250,
        price: Money::new(price),
        image_url: format!("https://img.example/{food}.png"),
        restaurant_id: RestaurantId::new(1),
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
#[ignore = "requires docker"]
#[serial]
async fn insert_and_find_basket() {
    let store = get_test_store().await;
    let owner = Owner::User(UserId::new(1));

    let mut tx = store.begin().await.unwrap();
    let basket = tx.insert_basket(&owner, Utc::now()).await.unwrap().unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let found = tx.find_basket(&owner).await.unwrap().unwrap();
    assert_eq!(found.id, basket.id);
    assert_eq!(found.status, OrderStatus::Basket);
    assert_eq!(found.owner, owner);
}

#[tokio::test]
#[ignore = "requires docker"]
#[serial]
async fn unique_index_rejects_second_basket() {
    let store = get_test_store().await;
    let owner = Owner::Guest(GuestToken::new("guest-a"));

    let mut tx = store.begin().await.unwrap();
    assert!(tx.insert_basket(&owner, Utc::now()).await.unwrap().is_some());
    assert!(tx.insert_basket(&owner, Utc::now()).await.unwrap().is_none());
    tx.commit().await.unwrap();
}

#[tokio::test]
#[ignore = "requires docker"]
#[serial]
async fn concurrent_basket_creation_yields_one_row() {
    let store = get_test_store().await;
    let owner = Owner::User(UserId::new(42));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        let owner = owner.clone();
        handles.push(tokio::spawn(async move {
            let mut tx = store.begin().await.unwrap();
            let basket = match tx.insert_basket(&owner, Utc::now()).await.unwrap() {
                Some(basket) => basket,
                None => tx.find_basket(&owner).await.unwrap().unwrap(),
            };
            tx.commit().await.unwrap();
            basket.id
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);

    let mut tx = store.begin().await.unwrap();
    assert_eq!(tx.list_orders(&owner).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "requires docker"]
#[serial]
async fn rollback_discards_writes() {
    let store = get_test_store().await;
    let owner = Owner::User(UserId::new(1));

    {
        let mut tx = store.begin().await.unwrap();
        tx.insert_basket(&owner, Utc::now()).await.unwrap();
    }

    let mut tx = store.begin().await.unwrap();
    assert!(tx.find_basket(&owner).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires docker"]
#[serial]
async fn line_items_upsert_and_keep_position() {
    let store = get_test_store().await;
    let owner = Owner::User(UserId::new(1));

    let mut tx = store.begin().await.unwrap();
    let basket = tx.insert_basket(&owner, Utc::now()).await.unwrap().unwrap();
    tx.upsert_line_item(&line_item(&basket, 10, 1, 500))
        .await
        .unwrap();
    tx.upsert_line_item(&line_item(&basket, 20, 1, 300))
        .await
        .unwrap();
    tx.upsert_line_item(&line_item(&basket, 10, 3, 550))
        .await
        .unwrap();

    let items = tx.list_line_items(basket.id).await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].food_id, FoodId::new(10));
    assert_eq!(items[0].count, 3);
    assert_eq!(items[0].price, Money::new(550));
    assert_eq!(items[1].food_id, FoodId::new(20));

    assert!(tx.delete_line_item(basket.id, FoodId::new(20)).await.unwrap());
    assert!(!tx.delete_line_item(basket.id, FoodId::new(20)).await.unwrap());
    assert_eq!(tx.delete_line_items(basket.id).await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires docker"]
#[serial]
async fn update_order_persists_all_columns() {
    let store = get_test_store().await;
    let owner = Owner::User(UserId::new(1));

    let mut tx = store.begin().await.unwrap();
    let mut order = tx.insert_basket(&owner, Utc::now()).await.unwrap().unwrap();
    order.status = OrderStatus::Placed;
    order.placed_at = Some(Utc::now());
    order.address = Some("Main st. 1".to_string());
    order.extra_address = Some("apt 5".to_string());
    order.total = Money::new(1300);
    order.restaurant_id = Some(RestaurantId::new(2));
    tx.update_order(&order).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let loaded = tx.lock_order(order.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, OrderStatus::Placed);
    assert_eq!(loaded.address.as_deref(), Some("Main st. 1"));
    assert_eq!(loaded.total, Money::new(1300));
    assert_eq!(loaded.restaurant_id, Some(RestaurantId::new(2)));
}

#[tokio::test]
#[ignore = "requires docker"]
#[serial]
async fn reassign_guest_orders_moves_history() {
    let store = get_test_store().await;
    let token = GuestToken::new("guest-b");
    let guest = Owner::Guest(token.clone());

    let mut tx = store.begin().await.unwrap();
    let mut delivered = tx.insert_basket(&guest, Utc::now()).await.unwrap().unwrap();
    delivered.status = OrderStatus::Delivered;
    tx.update_order(&delivered).await.unwrap();
    tx.insert_basket(&guest, Utc::now()).await.unwrap().unwrap();

    let moved = tx
        .reassign_guest_orders(&token, UserId::new(9))
        .await
        .unwrap();
    assert_eq!(moved, 2);
    assert!(tx.list_orders(&guest).await.unwrap().is_empty());
    assert_eq!(
        tx.count_delivered(&Owner::User(UserId::new(9)), None)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
#[ignore = "requires docker"]
#[serial]
async fn reassign_into_existing_basket_conflicts() {
    let store = get_test_store().await;
    let token = GuestToken::new("guest-c");

    let mut tx = store.begin().await.unwrap();
    tx.insert_basket(&Owner::Guest(token.clone()), Utc::now())
        .await
        .unwrap();
    tx.insert_basket(&Owner::User(UserId::new(3)), Utc::now())
        .await
        .unwrap();

    let result = tx.reassign_guest_orders(&token, UserId::new(3)).await;
    assert!(matches!(result, Err(StoreError::Conflict { .. })));
}

#[tokio::test]
#[ignore = "requires docker"]
#[serial]
async fn promocode_round_trip_and_redemptions() {
    let store = get_test_store().await;

    let mut tx = store.begin().await.unwrap();
    let code = tx
        .insert_promocode(NewPromocode::new(
            "PIZZA15",
            15,
            Utc::now() + Duration::days(7),
            PromocodeKind::FirstAtRestaurant {
                restaurant_id: RestaurantId::new(5),
            },
        ))
        .await
        .unwrap();

    let loaded = tx.find_promocode_by_code("PIZZA15").await.unwrap().unwrap();
    assert_eq!(loaded.id, code.id);
    assert_eq!(loaded.discount_pct, 15);
    assert_eq!(loaded.kind, code.kind);
    assert!(tx.find_promocode_by_code("NOPE").await.unwrap().is_none());

    let order = tx
        .insert_basket(&Owner::User(UserId::new(1)), Utc::now())
        .await
        .unwrap()
        .unwrap();
    tx.record_redemption(order.id, code.id, Utc::now())
        .await
        .unwrap();
    assert_eq!(tx.count_redemptions(order.id, code.id).await.unwrap(), 1);
}
