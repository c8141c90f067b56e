//! Catalog browsing state container.
//!
//! # Responsibility
//! - Combine search text, category filter and the cached product stream into
//!   one `CatalogView`.
//!
//! # Invariants
//! - Text and category filters intersect; an empty text or `None` category
//!   disables that filter.
//! - Text matching is case-insensitive containment on name or description.
//! - The view is recomputed on every upstream change.

use crate::model::product::Product;
use std::collections::BTreeSet;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Snapshot rendered by the catalog screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogView {
    pub query: String,
    pub category: Option<String>,
    pub products: Vec<Product>,
    /// Distinct categories of the unfiltered catalog, sorted.
    pub categories: Vec<String>,
}

impl CatalogView {
    pub fn build(all: &[Product], query: &str, category: Option<&str>) -> Self {
        Self {
            query: query.to_string(),
            category: category.map(str::to_string),
            products: filter_products(all, query, category),
            categories: categories_of(all),
        }
    }
}

/// Applies the text and category filters.
pub fn filter_products(products: &[Product], query: &str, category: Option<&str>) -> Vec<Product> {
    let needle = query.trim().to_lowercase();
    products
        .iter()
        .filter(|product| category.map_or(true, |category| product.category == category))
        .filter(|product| {
            needle.is_empty()
                || product.name.to_lowercase().contains(&needle)
                || product.description.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

fn categories_of(products: &[Product]) -> Vec<String> {
    products
        .iter()
        .map(|product| product.category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub struct CatalogState {
    query: watch::Sender<String>,
    category: watch::Sender<Option<String>>,
    view: watch::Receiver<CatalogView>,
    task: JoinHandle<()>,
}

impl CatalogState {
    /// Starts combining over `products`. Must be called within a Tokio runtime.
    pub fn new(mut products: watch::Receiver<Vec<Product>>) -> Self {
        let (query, mut query_rx) = watch::channel(String::new());
        let (category, mut category_rx) = watch::channel(None::<String>);
        let initial = CatalogView::build(&products.borrow_and_update(), "", None);
        let (view_tx, view) = watch::channel(initial);

        let task = tokio::spawn(async move {
            loop {
                let upstream_open = tokio::select! {
                    changed = query_rx.changed() => changed.is_ok(),
                    changed = category_rx.changed() => changed.is_ok(),
                    changed = products.changed() => changed.is_ok(),
                };
                if !upstream_open {
                    break;
                }
                let next = CatalogView::build(
                    &products.borrow_and_update(),
                    &query_rx.borrow_and_update(),
                    category_rx.borrow_and_update().as_deref(),
                );
                view_tx.send_replace(next);
            }
        });

        Self {
            query,
            category,
            view,
            task,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CatalogView> {
        self.view.clone()
    }

    pub fn current(&self) -> CatalogView {
        self.view.borrow().clone()
    }

    pub fn set_query(&self, query: &str) {
        self.query.send_replace(query.to_string());
    }

    /// `None` shows every category.
    pub fn set_category(&self, category: Option<&str>) {
        self.category.send_replace(category.map(str::to_string));
    }
}

impl Drop for CatalogState {
    fn drop(&mut self) {
        self.task.abort();
    }
}
