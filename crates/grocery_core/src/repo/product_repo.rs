//! Product repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide catalog reads and bulk cache mutation primitives.
//! - Keep SQL details inside the cache persistence boundary.
//!
//! # Invariants
//! - `upsert_all` overwrites rows by `id` in a single transaction; either
//!   every row lands or none does.
//! - An incoming row replaces any cached row sharing its `id` or its `code`.
//! - List order is deterministic: `category ASC, name ASC, id ASC`.

use crate::model::product::{Product, ProductId};
use crate::repo::{parse_decimal, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const PRODUCT_SELECT_SQL: &str = "SELECT
    id,
    code,
    name,
    description,
    category,
    price,
    stock,
    image_url,
    created_at
FROM products";

const PRODUCT_UPSERT_SQL: &str = "INSERT INTO products (
    id, code, name, description, category, price, stock, image_url, created_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
ON CONFLICT(id) DO UPDATE SET
    code = excluded.code,
    name = excluded.name,
    description = excluded.description,
    category = excluded.category,
    price = excluded.price,
    stock = excluded.stock,
    image_url = excluded.image_url,
    created_at = excluded.created_at;";

const PRODUCT_EVICT_CODE_SQL: &str = "DELETE FROM products WHERE code = ?1 AND id <> ?2;";

/// Repository interface for the cached catalog.
pub trait ProductRepository {
    fn count(&self) -> RepoResult<u64>;
    fn list_all(&self) -> RepoResult<Vec<Product>>;
    fn get_by_id(&self, id: ProductId) -> RepoResult<Option<Product>>;
    fn get_by_code(&self, code: &str) -> RepoResult<Option<Product>>;
    /// Inserts or overwrites every product by id, atomically. A cached row
    /// holding the same code under another id is replaced.
    fn upsert_all(&self, products: &[Product]) -> RepoResult<usize>;
    /// Overwrites one existing product.
    fn update(&self, product: &Product) -> RepoResult<()>;
    fn update_stock(&self, id: ProductId, stock: i64) -> RepoResult<()>;
    fn delete_all(&self) -> RepoResult<usize>;
    /// Distinct categories sorted by name.
    fn list_categories(&self) -> RepoResult<Vec<String>>;
}

/// SQLite-backed product repository.
pub struct SqliteProductRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProductRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ProductRepository for SqliteProductRepository<'_> {
    fn count(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM products;", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn list_all(&self) -> RepoResult<Vec<Product>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PRODUCT_SELECT_SQL} ORDER BY category ASC, name ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut products = Vec::new();
        while let Some(row) = rows.next()? {
            products.push(parse_product_row(row)?);
        }
        Ok(products)
    }

    fn get_by_id(&self, id: ProductId) -> RepoResult<Option<Product>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PRODUCT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_product_row(row)?)),
            None => Ok(None),
        }
    }

    fn get_by_code(&self, code: &str) -> RepoResult<Option<Product>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PRODUCT_SELECT_SQL} WHERE code = ?1;"))?;
        let mut rows = stmt.query([code.trim()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_product_row(row)?)),
            None => Ok(None),
        }
    }

    fn upsert_all(&self, products: &[Product]) -> RepoResult<usize> {
        for product in products {
            product.validate()?;
        }

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut evict = tx.prepare(PRODUCT_EVICT_CODE_SQL)?;
            let mut stmt = tx.prepare(PRODUCT_UPSERT_SQL)?;
            for product in products {
                evict.execute(params![product.code.trim(), product.id])?;
                stmt.execute(params![
                    product.id,
                    product.code.trim(),
                    product.name,
                    product.description,
                    product.category,
                    product.price.to_string(),
                    product.stock,
                    product.image_url,
                    product.created_at,
                ])?;
            }
        }
        tx.commit()?;
        Ok(products.len())
    }

    fn update(&self, product: &Product) -> RepoResult<()> {
        product.validate()?;

        let changed = self.conn.execute(
            "UPDATE products
             SET
                code = ?1,
                name = ?2,
                description = ?3,
                category = ?4,
                price = ?5,
                stock = ?6,
                image_url = ?7
             WHERE id = ?8;",
            params![
                product.code.trim(),
                product.name,
                product.description,
                product.category,
                product.price.to_string(),
                product.stock,
                product.image_url,
                product.id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found("product", product.id));
        }
        Ok(())
    }

    fn update_stock(&self, id: ProductId, stock: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE products SET stock = ?1 WHERE id = ?2;",
            params![stock, id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("product", id));
        }
        Ok(())
    }

    fn delete_all(&self) -> RepoResult<usize> {
        Ok(self.conn.execute("DELETE FROM products;", [])?)
    }

    fn list_categories(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT category FROM products ORDER BY category ASC;")?;
        let categories = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }
}

fn parse_product_row(row: &Row<'_>) -> RepoResult<Product> {
    let price_text: String = row.get("price")?;
    Ok(Product {
        id: row.get("id")?,
        code: row.get("code")?,
        name: row.get("name")?,
        description: row.get("description")?,
        category: row.get("category")?,
        price: parse_decimal(&price_text, "products.price")?,
        stock: row.get("stock")?,
        image_url: row.get("image_url")?,
        created_at: row.get("created_at")?,
    })
}
