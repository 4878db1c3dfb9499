//! Postgres-backed catalog and order store.
//!
//! ## Schema
//!
//! Created by the embedded migrations under `crates/infra/migrations`:
//!
//! - `shipping_packs(quantity)`: the pack catalog;
//! - `orders(id, number_of_items, created_at, updated_at)`;
//! - `order_shipping(id, order_id, pack_size, shipping_pack_quantity, ...)`:
//!   one row per pack size an order ships.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | Any other | `Query` |
//! | PoolClosed / Io / PoolTimedOut | N/A | `Unavailable` |
//! | Other | N/A | `Query` |
//!
//! Counts are stored as `BIGINT`; values that do not fit `u64` (or are zero
//! where the domain requires a positive number) surface as `Corrupt`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use packship_core::{OrderId, ShippingLineId};
use packship_orders::{Order, ShippingLine};
use packship_packing::PackSize;

use super::r#trait::{OrderStore, PackCatalogStore, StoreError};

const MAX_CONNECTIONS: u32 = 10;

/// Postgres-backed store.
///
/// `Send + Sync`; clones share the same connection pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a connection pool against `database_url`.
    #[instrument(skip(database_url), err)]
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Open a connection pool from discrete connection settings.
    #[instrument(skip(options), err)]
    pub async fn connect_with(options: PgConnectOptions) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the embedded schema migrations.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&*self.pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load_lines(&self, order_id: Option<OrderId>) -> Result<Vec<ShippingLine>, StoreError> {
        let rows = match order_id {
            Some(id) => {
                sqlx::query(
                    r#"
                    SELECT id, order_id, pack_size, shipping_pack_quantity, created_at
                    FROM order_shipping
                    WHERE order_id = $1
                    ORDER BY pack_size DESC
                    "#,
                )
                .bind(id.as_uuid())
                .fetch_all(&*self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, order_id, pack_size, shipping_pack_quantity, created_at
                    FROM order_shipping
                    ORDER BY created_at DESC, order_id DESC, pack_size DESC
                    "#,
                )
                .fetch_all(&*self.pool)
                .await
            }
        }
        .map_err(|e| map_sqlx_error("load_lines", e))?;

        rows.iter()
            .map(|row| {
                let line = ShippingLineRow::from_row(row)
                    .map_err(|e| StoreError::Corrupt(format!("failed to decode shipping row: {e}")))?;
                ShippingLine::try_from(line)
            })
            .collect()
    }
}

#[async_trait]
impl PackCatalogStore for PostgresStore {
    #[instrument(skip(self), err)]
    async fn list_pack_sizes(&self) -> Result<Vec<PackSize>, StoreError> {
        let rows = sqlx::query("SELECT quantity FROM shipping_packs ORDER BY quantity DESC")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_pack_sizes", e))?;

        rows.iter()
            .map(|row| {
                let quantity: i64 = row
                    .try_get("quantity")
                    .map_err(|e| StoreError::Corrupt(format!("failed to decode pack row: {e}")))?;
                pack_size_from_db(quantity)
            })
            .collect()
    }

    #[instrument(skip(self, sizes), fields(pack_count = sizes.len()), err)]
    async fn replace_pack_sizes(&self, sizes: &[PackSize]) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query("DELETE FROM shipping_packs")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("clear_pack_sizes", e))?;

        for size in sizes {
            let quantity = to_db_count(size.items(), "pack size")?;
            if let Err(e) = sqlx::query(
                "INSERT INTO shipping_packs (quantity) VALUES ($1) ON CONFLICT (quantity) DO NOTHING",
            )
            .bind(quantity)
            .execute(&mut *tx)
            .await
            {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(map_sqlx_error("insert_pack_size", e));
            }
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    /// Insert the order row and all of its shipping lines in one transaction.
    #[instrument(
        skip(self, order),
        fields(
            order_id = %order.id_typed(),
            number_of_items = order.number_of_items(),
            line_count = order.shipping().len()
        ),
        err
    )]
    async fn create_order(&self, order: &Order) -> Result<(), StoreError> {
        let number_of_items = to_db_count(order.number_of_items(), "number_of_items")?;
        let lines = order
            .shipping()
            .iter()
            .map(|line| {
                Ok((
                    line,
                    to_db_count(line.pack_size.items(), "pack size")?,
                    to_db_count(line.quantity, "pack quantity")?,
                ))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO orders (id, number_of_items, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(*order.id_typed().as_uuid())
        .bind(number_of_items)
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(map_sqlx_error("insert_order", e));
        }

        for (line, pack_size, quantity) in lines {
            let inserted = sqlx::query(
                r#"
                INSERT INTO order_shipping
                    (id, order_id, pack_size, shipping_pack_quantity, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $5)
                "#,
            )
            .bind(line.id.as_uuid())
            .bind(line.order_id.as_uuid())
            .bind(pack_size)
            .bind(quantity)
            .bind(line.created_at)
            .execute(&mut *tx)
            .await;

            if let Err(e) = inserted {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(map_sqlx_error("insert_order_shipping", e));
            }
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, number_of_items, created_at, updated_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_order", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let order = OrderRow::from_row(&row)
            .map_err(|e| StoreError::Corrupt(format!("failed to decode order row: {e}")))?;
        let lines = self.load_lines(Some(id)).await?;
        order.into_order(lines).map(Some)
    }

    #[instrument(skip(self), err)]
    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, number_of_items, created_at, updated_at
            FROM orders
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_orders", e))?;

        let mut lines_by_order: HashMap<OrderId, Vec<ShippingLine>> = HashMap::new();
        for line in self.load_lines(None).await? {
            lines_by_order.entry(line.order_id).or_default().push(line);
        }

        rows.iter()
            .map(|row| {
                let order = OrderRow::from_row(row)
                    .map_err(|e| StoreError::Corrupt(format!("failed to decode order row: {e}")))?;
                let lines = lines_by_order
                    .remove(&OrderId::from_uuid(order.id))
                    .unwrap_or_default();
                order.into_order(lines)
            })
            .collect()
    }

    #[instrument(skip(self), err)]
    async fn list_shipping(&self) -> Result<Vec<ShippingLine>, StoreError> {
        self.load_lines(None).await
    }

    #[instrument(skip(self), err)]
    async fn health(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&*self.pool)
            .await
            .map(|_| ())
            .map_err(|e| map_sqlx_error("health", e))
    }
}

struct OrderRow {
    id: uuid::Uuid,
    number_of_items: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for OrderRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderRow {
            id: row.try_get("id")?,
            number_of_items: row.try_get("number_of_items")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl OrderRow {
    fn into_order(self, lines: Vec<ShippingLine>) -> Result<Order, StoreError> {
        let number_of_items = from_db_count(self.number_of_items, "number_of_items")?;
        Order::rehydrate(
            OrderId::from_uuid(self.id),
            number_of_items,
            lines,
            self.created_at,
            self.updated_at,
        )
        .map_err(|e| StoreError::Corrupt(format!("order {}: {e}", self.id)))
    }
}

struct ShippingLineRow {
    id: uuid::Uuid,
    order_id: uuid::Uuid,
    pack_size: i64,
    shipping_pack_quantity: i64,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ShippingLineRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ShippingLineRow {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            pack_size: row.try_get("pack_size")?,
            shipping_pack_quantity: row.try_get("shipping_pack_quantity")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<ShippingLineRow> for ShippingLine {
    type Error = StoreError;

    fn try_from(row: ShippingLineRow) -> Result<Self, Self::Error> {
        Ok(ShippingLine {
            id: ShippingLineId::from_uuid(row.id),
            order_id: OrderId::from_uuid(row.order_id),
            pack_size: pack_size_from_db(row.pack_size)?,
            quantity: from_db_count(row.shipping_pack_quantity, "shipping_pack_quantity")?,
            created_at: row.created_at,
        })
    }
}

fn pack_size_from_db(value: i64) -> Result<PackSize, StoreError> {
    let items = from_db_count(value, "pack size")?;
    PackSize::new(items).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn from_db_count(value: i64, column: &str) -> Result<u64, StoreError> {
    u64::try_from(value)
        .map_err(|_| StoreError::Corrupt(format!("{column} is negative: {value}")))
}

fn to_db_count(value: u64, what: &str) -> Result<i64, StoreError> {
    i64::try_from(value)
        .map_err(|_| StoreError::Query(format!("{what} {value} does not fit a BIGINT column")))
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                _ => StoreError::Query(msg),
            }
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
            StoreError::Unavailable(format!("{operation}: {err}"))
        }
        _ => StoreError::Query(format!("sqlx error in {}: {}", operation, err)),
    }
}
