use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    FoodId, GuestToken, Money, OrderId, OrderStatus, Owner, PromocodeId, RestaurantId, UserId,
};
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};

use crate::{
    LineItemRecord, NewPromocode, OrderRecord, Promocode, PromocodeKind, Result, StoreError,
    repository::{LineItemRepository, OrderRepository, PromocodeRepository, Store, Transaction},
};

const ORDER_COLUMNS: &str = "id, user_id, guest_token, status, created_at, placed_at, \
     delivered_at, address, extra_address, total, promocode_id, commented, restaurant_id";

const LINE_ITEM_COLUMNS: &str = "order_id, food_id, count, name, weight, price, image_url, \
     restaurant_id, created_at, updated_at";

const PROMOCODE_COLUMNS: &str = "id, code, kind, discount_pct, expires_at, restaurant_id, min_sum";

/// PostgreSQL-backed order store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a new pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(StoreError::query("connect"))?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    type Tx = PgTransaction;

    async fn begin(&self) -> Result<PgTransaction> {
        let tx = self.pool.begin().await.map_err(StoreError::query("begin"))?;
        Ok(PgTransaction { tx })
    }
}

/// Transaction over a [`PostgresStore`]. Rolled back when dropped.
pub struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await.map_err(StoreError::query("commit"))
    }
}

fn owner_column(owner: &Owner) -> &'static str {
    match owner {
        Owner::User(_) => "user_id",
        Owner::Guest(_) => "guest_token",
    }
}

fn bind_owner<'q>(
    query: Query<'q, Postgres, PgArguments>,
    owner: &'q Owner,
) -> Query<'q, Postgres, PgArguments> {
    match owner {
        Owner::User(id) => query.bind(id.get()),
        Owner::Guest(token) => query.bind(token.as_str()),
    }
}

fn row_to_order(op: &'static str, row: PgRow) -> Result<OrderRecord> {
    let err = StoreError::query(op);

    let owner = Owner::from_columns(
        row.try_get("user_id").map_err(err)?,
        row.try_get("guest_token").map_err(err)?,
    )
    .ok_or_else(|| StoreError::corrupt(op, "order must have exactly one owner"))?;

    let status: String = row.try_get("status").map_err(err)?;
    let status = OrderStatus::parse(&status)
        .ok_or_else(|| StoreError::corrupt(op, format!("unknown order status '{status}'")))?;

    Ok(OrderRecord {
        id: OrderId::new(row.try_get("id").map_err(err)?),
        owner,
        status,
        created_at: row.try_get("created_at").map_err(err)?,
        placed_at: row.try_get("placed_at").map_err(err)?,
        delivered_at: row.try_get("delivered_at").map_err(err)?,
        address: row.try_get("address").map_err(err)?,
        extra_address: row.try_get("extra_address").map_err(err)?,
        total: Money::new(row.try_get("total").map_err(err)?),
        promocode_id: row
            .try_get::<Option<i64>, _>("promocode_id")
            .map_err(err)?
            .map(PromocodeId::new),
        commented: row.try_get("commented").map_err(err)?,
        restaurant_id: row
            .try_get::<Option<i64>, _>("restaurant_id")
            .map_err(err)?
            .map(RestaurantId::new),
    })
}

fn row_to_line_item(op: &'static str, row: PgRow) -> Result<LineItemRecord> {
    let err = StoreError::query(op);

    let count: i32 = row.try_get("count").map_err(err)?;
    let count = u32::try_from(count)
        .map_err(|_| StoreError::corrupt(op, format!("negative line item count {count}")))?;

    Ok(LineItemRecord {
        order_id: OrderId::new(row.try_get("order_id").map_err(err)?),
        food_id: FoodId::new(row.try_get("food_id").map_err(err)?),
        count,
        name: row.try_get("name").map_err(err)?,
        weight: row.try_get("weight").map_err(err)?,
        price: Money::new(row.try_get("price").map_err(err)?),
        image_url: row.try_get("image_url").map_err(err)?,
        restaurant_id: RestaurantId::new(row.try_get("restaurant_id").map_err(err)?),
        created_at: row.try_get("created_at").map_err(err)?,
        updated_at: row.try_get("updated_at").map_err(err)?,
    })
}

fn row_to_promocode(op: &'static str, row: PgRow) -> Result<Promocode> {
    let err = StoreError::query(op);

    let kind: String = row.try_get("kind").map_err(err)?;
    let kind = PromocodeKind::from_columns(
        &kind,
        row.try_get("restaurant_id").map_err(err)?,
        row.try_get("min_sum").map_err(err)?,
    )
    .ok_or_else(|| StoreError::corrupt(op, format!("invalid promocode kind '{kind}'")))?;

    let discount_pct: i16 = row.try_get("discount_pct").map_err(err)?;
    let discount_pct = u8::try_from(discount_pct)
        .ok()
        .filter(|pct| *pct <= 100)
        .ok_or_else(|| StoreError::corrupt(op, format!("discount {discount_pct}% out of range")))?;

    Ok(Promocode {
        id: PromocodeId::new(row.try_get("id").map_err(err)?),
        code: row.try_get("code").map_err(err)?,
        discount_pct,
        expires_at: row.try_get("expires_at").map_err(err)?,
        kind,
    })
}

fn to_count(op: &'static str, count: i64) -> Result<u64> {
    u64::try_from(count).map_err(|_| StoreError::corrupt(op, format!("negative count {count}")))
}

#[async_trait]
impl OrderRepository for PgTransaction {
    async fn find_basket(&mut self, owner: &Owner) -> Result<Option<OrderRecord>> {
        const OP: &str = "find_basket";
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE {} = $1 AND status = 'basket' FOR UPDATE",
            owner_column(owner)
        );

        let row = bind_owner(sqlx::query(&sql), owner)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(StoreError::query(OP))?;

        row.map(|row| row_to_order(OP, row)).transpose()
    }

    async fn insert_basket(
        &mut self,
        owner: &Owner,
        created_at: DateTime<Utc>,
    ) -> Result<Option<OrderRecord>> {
        const OP: &str = "insert_basket";
        let column = owner_column(owner);
        let sql = format!(
            r#"
            INSERT INTO orders ({column}, status, created_at, total, commented)
            VALUES ($1, 'basket', $2, 0, FALSE)
            ON CONFLICT ({column}) WHERE status = 'basket' DO NOTHING
            RETURNING {ORDER_COLUMNS}
            "#
        );

        let row = bind_owner(sqlx::query(&sql), owner)
            .bind(created_at)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(StoreError::query(OP))?;

        row.map(|row| row_to_order(OP, row)).transpose()
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<OrderRecord>> {
        const OP: &str = "lock_order";
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");

        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(StoreError::query(OP))?;

        row.map(|row| row_to_order(OP, row)).transpose()
    }

    async fn list_orders(&mut self, owner: &Owner) -> Result<Vec<OrderRecord>> {
        const OP: &str = "list_orders";
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE {} = $1 ORDER BY created_at DESC, id DESC",
            owner_column(owner)
        );

        let rows = bind_owner(sqlx::query(&sql), owner)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(StoreError::query(OP))?;

        rows.into_iter().map(|row| row_to_order(OP, row)).collect()
    }

    async fn update_order(&mut self, order: &OrderRecord) -> Result<()> {
        const OP: &str = "update_order";
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                user_id = $2,
                guest_token = $3,
                status = $4,
                placed_at = $5,
                delivered_at = $6,
                address = $7,
                extra_address = $8,
                total = $9,
                promocode_id = $10,
                commented = $11,
                restaurant_id = $12
            WHERE id = $1
            "#,
        )
        .bind(order.id.get())
        .bind(order.owner.user_id().map(|id| id.get()))
        .bind(order.owner.guest_token().map(GuestToken::as_str))
        .bind(order.status.as_str())
        .bind(order.placed_at)
        .bind(order.delivered_at)
        .bind(order.address.as_deref())
        .bind(order.extra_address.as_deref())
        .bind(order.total.amount())
        .bind(order.promocode_id.map(|id| id.get()))
        .bind(order.commented)
        .bind(order.restaurant_id.map(|id| id.get()))
        .execute(&mut *self.tx)
        .await
        .map_err(StoreError::query(OP))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict { op: OP });
        }
        Ok(())
    }

    async fn delete_order(&mut self, id: OrderId) -> Result<()> {
        // order_food and promocode_redemption cascade.
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(StoreError::query("delete_order"))?;
        Ok(())
    }

    async fn reassign_guest_orders(&mut self, token: &GuestToken, user: UserId) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE orders SET user_id = $2, guest_token = NULL WHERE guest_token = $1",
        )
        .bind(token.as_str())
        .bind(user.get())
        .execute(&mut *self.tx)
        .await
        .map_err(StoreError::query("reassign_guest_orders"))?;

        Ok(result.rows_affected())
    }

    async fn count_delivered(
        &mut self,
        owner: &Owner,
        restaurant_id: Option<RestaurantId>,
    ) -> Result<u64> {
        const OP: &str = "count_delivered";
        let sql = format!(
            "SELECT COUNT(*) FROM orders WHERE {} = $1 AND status = 'delivered' \
             AND ($2::BIGINT IS NULL OR restaurant_id = $2)",
            owner_column(owner)
        );

        let count: i64 = bind_owner(sqlx::query(&sql), owner)
            .bind(restaurant_id.map(|id| id.get()))
            .fetch_one(&mut *self.tx)
            .await
            .map_err(StoreError::query(OP))?
            .try_get(0)
            .map_err(StoreError::query(OP))?;

        to_count(OP, count)
    }
}

#[async_trait]
impl LineItemRepository for PgTransaction {
    async fn list_line_items(&mut self, order_id: OrderId) -> Result<Vec<LineItemRecord>> {
        const OP: &str = "list_line_items";
        let sql = format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM order_food WHERE order_id = $1 ORDER BY position ASC"
        );

        let rows = sqlx::query(&sql)
            .bind(order_id.get())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(StoreError::query(OP))?;

        rows.into_iter()
            .map(|row| row_to_line_item(OP, row))
            .collect()
    }

    async fn find_line_item(
        &mut self,
        order_id: OrderId,
        food_id: FoodId,
    ) -> Result<Option<LineItemRecord>> {
        const OP: &str = "find_line_item";
        let sql = format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM order_food WHERE order_id = $1 AND food_id = $2"
        );

        let row = sqlx::query(&sql)
            .bind(order_id.get())
            .bind(food_id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(StoreError::query(OP))?;

        row.map(|row| row_to_line_item(OP, row)).transpose()
    }

    async fn upsert_line_item(&mut self, item: &LineItemRecord) -> Result<()> {
        const OP: &str = "upsert_line_item";
        let count = i32::try_from(item.count)
            .map_err(|_| StoreError::corrupt(OP, format!("count {} too large", item.count)))?;

        sqlx::query(
            r#"
            INSERT INTO order_food
                (order_id, food_id, count, name, weight, price, image_url, restaurant_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (order_id, food_id) DO UPDATE SET
                count = EXCLUDED.count,
                name = EXCLUDED.name,
                weight = EXCLUDED.weight,
                price = EXCLUDED.price,
                image_url = EXCLUDED.image_url,
                restaurant_id = EXCLUDED.restaurant_id,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(item.order_id.get())
        .bind(item.food_id.get())
        .bind(count)
        .bind(&item.name)
        .bind(item.weight)
        .bind(item.price.amount())
        .bind(&item.image_url)
        .bind(item.restaurant_id.get())
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(StoreError::query(OP))?;

        Ok(())
    }

    async fn delete_line_item(&mut self, order_id: OrderId, food_id: FoodId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM order_food WHERE order_id = $1 AND food_id = $2")
            .bind(order_id.get())
            .bind(food_id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(StoreError::query("delete_line_item"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_line_items(&mut self, order_id: OrderId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM order_food WHERE order_id = $1")
            .bind(order_id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(StoreError::query("delete_line_items"))?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl PromocodeRepository for PgTransaction {
    async fn find_promocode_by_code(&mut self, code: &str) -> Result<Option<Promocode>> {
        const OP: &str = "find_promocode_by_code";
        let sql = format!("SELECT {PROMOCODE_COLUMNS} FROM promocode WHERE code = $1");

        let row = sqlx::query(&sql)
            .bind(code)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(StoreError::query(OP))?;

        row.map(|row| row_to_promocode(OP, row)).transpose()
    }

    async fn find_promocode(&mut self, id: PromocodeId) -> Result<Option<Promocode>> {
        const OP: &str = "find_promocode";
        let sql = format!("SELECT {PROMOCODE_COLUMNS} FROM promocode WHERE id = $1");

        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(StoreError::query(OP))?;

        row.map(|row| row_to_promocode(OP, row)).transpose()
    }

    async fn insert_promocode(&mut self, promocode: NewPromocode) -> Result<Promocode> {
        const OP: &str = "insert_promocode";
        let id: i64 = sqlx::query(
            r#"
            INSERT INTO promocode (code, kind, discount_pct, expires_at, restaurant_id, min_sum)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&promocode.code)
        .bind(promocode.kind.as_str())
        .bind(i16::from(promocode.discount_pct))
        .bind(promocode.expires_at)
        .bind(promocode.kind.restaurant_id().map(|id| id.get()))
        .bind(promocode.kind.min_sum().map(|sum| sum.amount()))
        .fetch_one(&mut *self.tx)
        .await
        .map_err(StoreError::query(OP))?
        .try_get("id")
        .map_err(StoreError::query(OP))?;

        Ok(promocode.into_promocode(PromocodeId::new(id)))
    }

    async fn record_redemption(
        &mut self,
        order_id: OrderId,
        promocode_id: PromocodeId,
        redeemed_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO promocode_redemption (order_id, promocode_id, redeemed_at) VALUES ($1, $2, $3)",
        )
        .bind(order_id.get())
        .bind(promocode_id.get())
        .bind(redeemed_at)
        .execute(&mut *self.tx)
        .await
        .map_err(StoreError::query("record_redemption"))?;

        Ok(())
    }

    async fn count_redemptions(
        &mut self,
        order_id: OrderId,
        promocode_id: PromocodeId,
    ) -> Result<u64> {
        const OP: &str = "count_redemptions";
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM promocode_redemption WHERE order_id = $1 AND promocode_id = $2",
        )
        .bind(order_id.get())
        .bind(promocode_id.get())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(StoreError::query(OP))?;

        to_count(OP, count)
    }
}
