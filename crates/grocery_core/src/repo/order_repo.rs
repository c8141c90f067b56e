//! Order repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist orders created at checkout and admin edits.
//! - Serve owner-filtered and admin (all orders) listings.
//!
//! # Invariants
//! - `update_status` is a targeted single-column write and accepts any
//!   status regardless of the stored one (last write wins).
//! - Listings are sorted by `created_at DESC, id DESC`.
//! - Only mirror pulls overwrite by id; checkout inserts never replace a row.

use crate::model::order::{NewOrder, Order, OrderId, OrderStatus};
use crate::model::user::normalize_email;
use crate::repo::{parse_decimal, RepoError, RepoResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};

const ORDER_SELECT_SQL: &str = "SELECT
    id,
    user_email,
    delivery_date,
    delivery_address,
    region,
    comuna,
    comments,
    total,
    status,
    created_at
FROM orders";

const ORDER_INSERT_WITH_ID_SQL: &str = "INSERT INTO orders (
    id, user_email, delivery_date, delivery_address, region,
    comuna, comments, total, status, created_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)";

const ORDER_UPSERT_TAIL_SQL: &str = "ON CONFLICT(id) DO UPDATE SET
    user_email = excluded.user_email,
    delivery_date = excluded.delivery_date,
    delivery_address = excluded.delivery_address,
    region = excluded.region,
    comuna = excluded.comuna,
    comments = excluded.comments,
    total = excluded.total,
    status = excluded.status,
    created_at = excluded.created_at;";

const DATE_FORMAT: &str = "%Y-%m-%d";

macro_rules! order_params {
    ($order:expr) => {
        params![
            $order.id,
            normalize_email(&$order.user_email),
            $order.delivery_date.map(format_date),
            $order.delivery_address,
            $order.region,
            $order.comuna,
            $order.comments,
            $order.total.to_string(),
            $order.status.as_str(),
            $order.created_at,
        ]
    };
}

/// Repository interface for cached orders.
pub trait OrderRepository {
    /// Inserts a new `PENDING` order and returns the stored record.
    fn insert(&self, order: &NewOrder, created_at: i64) -> RepoResult<Order>;
    /// Inserts an order under a caller-chosen id. An existing row with that id
    /// is never touched; the collision is reported as `RepoError::Conflict`.
    fn insert_with_id(&self, order: &Order) -> RepoResult<()>;
    /// Inserts or overwrites an order keeping its id (used by mirror pulls).
    fn upsert(&self, order: &Order) -> RepoResult<()>;
    fn update(&self, order: &Order) -> RepoResult<()>;
    fn update_status(&self, id: OrderId, status: OrderStatus) -> RepoResult<()>;
    fn delete(&self, id: OrderId) -> RepoResult<()>;
    fn get(&self, id: OrderId) -> RepoResult<Option<Order>>;
    fn list_by_user(&self, email: &str) -> RepoResult<Vec<Order>>;
    fn list_all(&self) -> RepoResult<Vec<Order>>;
}

/// SQLite-backed order repository.
pub struct SqliteOrderRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOrderRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_orders(&self, sql: &str, email: Option<&str>) -> RepoResult<Vec<Order>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = match email {
            Some(email) => stmt.query([email])?,
            None => stmt.query([])?,
        };
        let mut orders = Vec::new();
        while let Some(row) = rows.next()? {
            orders.push(parse_order_row(row)?);
        }
        Ok(orders)
    }
}

impl OrderRepository for SqliteOrderRepository<'_> {
    fn insert(&self, order: &NewOrder, created_at: i64) -> RepoResult<Order> {
        let user_email = normalize_email(&order.user_email);
        self.conn.execute(
            "INSERT INTO orders (
                user_email,
                delivery_date,
                delivery_address,
                region,
                comuna,
                comments,
                total,
                status,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                user_email,
                order.delivery_date.map(format_date),
                order.delivery_address,
                order.region,
                order.comuna,
                order.comments,
                order.total.to_string(),
                OrderStatus::Pending.as_str(),
                created_at,
            ],
        )?;

        Ok(Order {
            id: self.conn.last_insert_rowid(),
            user_email,
            delivery_date: order.delivery_date,
            delivery_address: order.delivery_address.clone(),
            region: order.region.clone(),
            comuna: order.comuna.clone(),
            comments: order.comments.clone(),
            total: order.total,
            status: OrderStatus::Pending,
            created_at,
        })
    }

    fn insert_with_id(&self, order: &Order) -> RepoResult<()> {
        let sql = format!("{ORDER_INSERT_WITH_ID_SQL};");
        match self.conn.execute(&sql, order_params!(order)) {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _)) if is_key_conflict(&err) => {
                Err(RepoError::Conflict {
                    entity: "order",
                    key: order.id.to_string(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn upsert(&self, order: &Order) -> RepoResult<()> {
        self.conn.execute(
            &format!("{ORDER_INSERT_WITH_ID_SQL} {ORDER_UPSERT_TAIL_SQL}"),
            order_params!(order),
        )?;
        Ok(())
    }

    fn update(&self, order: &Order) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE orders
             SET
                user_email = ?1,
                delivery_date = ?2,
                delivery_address = ?3,
                region = ?4,
                comuna = ?5,
                comments = ?6,
                total = ?7,
                status = ?8
             WHERE id = ?9;",
            params![
                normalize_email(&order.user_email),
                order.delivery_date.map(format_date),
                order.delivery_address,
                order.region,
                order.comuna,
                order.comments,
                order.total.to_string(),
                order.status.as_str(),
                order.id,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("order", order.id));
        }
        Ok(())
    }

    fn update_status(&self, id: OrderId, status: OrderStatus) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE orders SET status = ?1 WHERE id = ?2;",
            params![status.as_str(), id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("order", id));
        }
        Ok(())
    }

    fn delete(&self, id: OrderId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM orders WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("order", id));
        }
        Ok(())
    }

    fn get(&self, id: OrderId) -> RepoResult<Option<Order>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ORDER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_order_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_by_user(&self, email: &str) -> RepoResult<Vec<Order>> {
        let email = normalize_email(email);
        self.query_orders(
            &format!(
                "{ORDER_SELECT_SQL} WHERE user_email = ?1 ORDER BY created_at DESC, id DESC;"
            ),
            Some(email.as_str()),
        )
    }

    fn list_all(&self) -> RepoResult<Vec<Order>> {
        self.query_orders(
            &format!("{ORDER_SELECT_SQL} ORDER BY created_at DESC, id DESC;"),
            None,
        )
    }
}

fn is_key_conflict(err: &rusqlite::ffi::Error) -> bool {
    matches!(
        err.extended_code,
        rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY | rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_order_row(row: &Row<'_>) -> RepoResult<Order> {
    let delivery_date = match row.get::<_, Option<String>>("delivery_date")? {
        Some(value) => Some(NaiveDate::parse_from_str(&value, DATE_FORMAT).map_err(|_| {
            RepoError::InvalidData(format!("invalid date `{value}` in orders.delivery_date"))
        })?),
        None => None,
    };

    let status_text: String = row.get("status")?;
    let status = status_text.parse::<OrderStatus>().map_err(|_| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in orders.status"))
    })?;

    let total_text: String = row.get("total")?;

    Ok(Order {
        id: row.get("id")?,
        user_email: row.get("user_email")?,
        delivery_date,
        delivery_address: row.get("delivery_address")?,
        region: row.get("region")?,
        comuna: row.get("comuna")?,
        comments: row.get("comments")?,
        total: parse_decimal(&total_text, "orders.total")?,
        status,
        created_at: row.get("created_at")?,
    })
}
