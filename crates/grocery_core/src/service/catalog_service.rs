//! Product catalog cache/sync service.
//!
//! # Responsibility
//! - Present one live read model of the catalog.
//! - Reconcile three sources: bundled seed asset, local cache, REST API.
//!
//! # Invariants
//! - `get_all` never fails; cache errors surface as an empty list.
//! - Seeding only happens while the products table is empty.
//! - A refresh either overwrites every fetched row in one transaction or
//!   leaves the cache untouched. Failures are logged and swallowed.
//! - Nothing is retried.

use crate::db::{CacheTable, LocalCache};
use crate::model::product::{Product, ProductId};
use crate::remote::api::{ApiClient, ApiProduct};
use crate::repo::product_repo::{ProductRepository, SqliteProductRepository};
use crate::repo::RepoResult;
use crate::service::{ServiceError, ServiceResult};
use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Catalog bundled with the binary for first-run seeding.
pub const BUNDLED_CATALOG: &str = include_str!("../../assets/seed_products.json");

/// Parses a seed catalog in the `GET /productos` wire shape.
pub fn parse_seed_catalog(json: &str) -> ServiceResult<Vec<Product>> {
    let products: Vec<ApiProduct> = serde_json::from_str(json).map_err(ServiceError::Seed)?;
    Ok(products.into_iter().map(Product::from).collect())
}

/// Catalog service over the shared cache and the REST API.
#[derive(Clone)]
pub struct CatalogService {
    cache: Arc<LocalCache>,
    api: Arc<dyn ApiClient>,
    seed: &'static str,
}

impl CatalogService {
    pub fn new(cache: Arc<LocalCache>, api: Arc<dyn ApiClient>) -> Self {
        Self {
            cache,
            api,
            seed: BUNDLED_CATALOG,
        }
    }

    /// Replaces the bundled seed asset.
    pub fn with_seed(mut self, seed: &'static str) -> Self {
        self.seed = seed;
        self
    }

    /// Live view of the full cached catalog.
    pub fn get_all(&self) -> watch::Receiver<Vec<Product>> {
        self.cache.live_query(CacheTable::Products, |conn| {
            SqliteProductRepository::new(conn).list_all()
        })
    }

    /// Seeds the cache from the bundled asset when it holds no products.
    ///
    /// Returns the number of inserted rows (`0` when already populated).
    pub fn initialize_database_if_needed(&self) -> ServiceResult<usize> {
        let existing = self
            .cache
            .read(|conn| SqliteProductRepository::new(conn).count())?;
        if existing > 0 {
            info!(
                "event=catalog_seed module=service status=skipped existing={}",
                existing
            );
            return Ok(0);
        }

        let products = parse_seed_catalog(self.seed)?;
        let inserted = self.insert_all(&products)?;
        info!(
            "event=catalog_seed module=service status=ok inserted={}",
            inserted
        );
        Ok(inserted)
    }

    /// Pulls `GET /productos` and overwrites matching cache rows.
    ///
    /// Returns `true` when fresh rows landed. Any failure leaves the stale
    /// cache authoritative and returns `false`.
    pub async fn refresh_products_from_network(&self) -> bool {
        let started_at = Instant::now();
        let products = match self.api.fetch_products().await {
            Ok(products) => products,
            Err(err) => {
                warn!(
                    "event=catalog_refresh module=service status=error stage=fetch duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                return false;
            }
        };

        match self.insert_all(&products) {
            Ok(count) => {
                info!(
                    "event=catalog_refresh module=service status=ok count={} duration_ms={}",
                    count,
                    started_at.elapsed().as_millis()
                );
                true
            }
            Err(err) => {
                warn!(
                    "event=catalog_refresh module=service status=error stage=store duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                false
            }
        }
    }

    /// Inserts or overwrites products by id in one transaction.
    pub fn insert_all(&self, products: &[Product]) -> RepoResult<usize> {
        self.cache.write(CacheTable::Products, |conn| {
            SqliteProductRepository::new(conn).upsert_all(products)
        })
    }

    pub fn delete_all(&self) -> RepoResult<usize> {
        self.cache.write(CacheTable::Products, |conn| {
            SqliteProductRepository::new(conn).delete_all()
        })
    }

    pub fn get_by_id(&self, id: ProductId) -> RepoResult<Option<Product>> {
        self.cache
            .read(|conn| SqliteProductRepository::new(conn).get_by_id(id))
    }

    pub fn get_by_code(&self, code: &str) -> RepoResult<Option<Product>> {
        self.cache
            .read(|conn| SqliteProductRepository::new(conn).get_by_code(code))
    }

    /// Snapshot of the cached catalog (non-live).
    pub fn list_all(&self) -> RepoResult<Vec<Product>> {
        self.cache
            .read(|conn| SqliteProductRepository::new(conn).list_all())
    }

    pub fn list_categories(&self) -> RepoResult<Vec<String>> {
        self.cache
            .read(|conn| SqliteProductRepository::new(conn).list_categories())
    }

    /// Administrative overwrite of one product.
    pub fn update_product(&self, product: &Product) -> RepoResult<()> {
        self.cache.write(CacheTable::Products, |conn| {
            SqliteProductRepository::new(conn).update(product)
        })
    }

    pub fn update_stock(&self, id: ProductId, stock: i64) -> RepoResult<()> {
        self.cache.write(CacheTable::Products, |conn| {
            SqliteProductRepository::new(conn).update_stock(id, stock)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_seed_catalog, BUNDLED_CATALOG};

    #[test]
    fn bundled_catalog_parses_with_unique_ids_and_codes() {
        let products = parse_seed_catalog(BUNDLED_CATALOG).unwrap();
        assert!(!products.is_empty());

        let mut ids: Vec<_> = products.iter().map(|product| product.id).collect();
        let mut codes: Vec<_> = products.iter().map(|product| product.code.clone()).collect();
        ids.sort_unstable();
        ids.dedup();
        codes.sort();
        codes.dedup();
        assert_eq!(ids.len(), products.len());
        assert_eq!(codes.len(), products.len());
        assert!(products.iter().all(|product| product.validate().is_ok()));
    }

    #[test]
    fn malformed_seed_is_reported() {
        assert!(parse_seed_catalog("{ not json").is_err());
    }
}
