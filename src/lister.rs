//! Date-bounded product listing.
//!
//! Catalog keys look like `{type}/{tile}/{yyyy}/{mm}/{dd}/{product}/{file}`
//! and the store lists them in lexicographic order, so a listing seeded with
//! the start-day marker returns everything observed on or after the start,
//! and one seeded with the marker of the day after the end returns
//! everything past the window. Their difference is the window itself.
use crate::error::CatalogError;
use crate::s3::CatalogStore;
use crate::tile::TileId;
use crate::window::SearchWindow;
use std::collections::HashSet;
use tracing::debug;

/// Products found under one catalog prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Distinct product directories, in key order
    pub products: Vec<String>,
    /// Summed over every file, not per product
    pub total_bytes: u64,
}

pub fn catalog_prefix(product_type: &str, tile: &TileId) -> String {
    format!("{product_type}/{tile}")
}

/// The product directory of a key: the key without its file name.
pub fn product_dir(key: &str) -> &str {
    key.rsplit_once('/').map_or("", |(dir, _)| dir)
}

pub async fn list_products(
    store: &impl CatalogStore,
    product_type: &str,
    tile: &TileId,
    window: &SearchWindow,
) -> Result<Listing, CatalogError> {
    let prefix = catalog_prefix(product_type, tile);
    list_prefix(store, &prefix, window).await
}

pub async fn list_prefix(
    store: &impl CatalogStore,
    prefix: &str,
    window: &SearchWindow,
) -> Result<Listing, CatalogError> {
    let start_marker = window.start_marker(prefix);
    let from_start = store.list_objects(prefix, Some(&start_marker)).await?;

    let past_end: HashSet<String> = match window.end_marker(prefix) {
        Some(end_marker) => store
            .list_objects(prefix, Some(&end_marker))
            .await?
            .into_iter()
            .map(|object| object.key)
            .collect(),
        None => HashSet::new(),
    };

    let mut listing = Listing::default();
    let mut seen = HashSet::new();
    for object in from_start.iter().filter(|o| !past_end.contains(&o.key)) {
        listing.total_bytes += object.size;
        let product = product_dir(&object.key);
        if seen.insert(product) {
            listing.products.push(product.to_string());
        }
    }
    debug!(
        "{prefix}: {} objects from {start_marker}, {} past the window, {} products",
        from_start.len(),
        past_end.len(),
        listing.products.len()
    );
    Ok(listing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryCatalog;
    use chrono::NaiveDate;

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::with_keys(&[
            "FSC/31TCH/2025/01/31/P0/a.tif",
            "FSC/31TCH/2025/02/01/P1/a.tif",
            "FSC/31TCH/2025/02/01/P1/b.tif",
            "FSC/31TCH/2025/02/02/P2/b.tif",
            "FSC/31TCH/2025/02/03/P3/c.tif",
            "FSC/31TCH/2025/02/04/P4/d.tif",
            "FSC/31TDH/2025/02/02/Q1/a.tif",
            "GFSC/31TCH/2025/02/02/G1/a.tif",
        ])
    }

    fn tile() -> TileId {
        TileId::parse("T31TCH").unwrap()
    }

    #[tokio::test]
    async fn test_window_excludes_both_sides() {
        let window = SearchWindow::parse("2025-02-01", "2025-02-03").unwrap();
        let listing = list_products(&catalog(), "FSC", &tile(), &window)
            .await
            .unwrap();
        assert_eq!(
            listing.products,
            vec![
                "FSC/31TCH/2025/02/01/P1",
                "FSC/31TCH/2025/02/02/P2",
                "FSC/31TCH/2025/02/03/P3",
            ]
        );
    }

    #[tokio::test]
    async fn test_bytes_are_summed_per_file() {
        let window = SearchWindow::parse("2025-02-01", "2025-02-01").unwrap();
        let listing = list_products(&catalog(), "FSC", &tile(), &window)
            .await
            .unwrap();
        assert_eq!(listing.products, vec!["FSC/31TCH/2025/02/01/P1"]);
        let expected = ("FSC/31TCH/2025/02/01/P1/a.tif".len() * 2) as u64;
        assert_eq!(listing.total_bytes, expected);
    }

    #[tokio::test]
    async fn test_single_day_window() {
        let window = SearchWindow::parse("2025-02-02", "2025-02-02").unwrap();
        let listing = list_products(&catalog(), "FSC", &tile(), &window)
            .await
            .unwrap();
        assert_eq!(listing.products, vec!["FSC/31TCH/2025/02/02/P2"]);
    }

    #[tokio::test]
    async fn test_adjacent_windows_partition_the_range() {
        let store = catalog();
        let whole = SearchWindow::parse("2025-01-31", "2025-02-04").unwrap();
        let left = SearchWindow::parse("2025-01-31", "2025-02-02").unwrap();
        let right = SearchWindow::parse("2025-02-03", "2025-02-04").unwrap();

        let whole = list_products(&store, "FSC", &tile(), &whole).await.unwrap();
        let left = list_products(&store, "FSC", &tile(), &left).await.unwrap();
        let right = list_products(&store, "FSC", &tile(), &right).await.unwrap();

        let left_set: HashSet<_> = left.products.iter().collect();
        let right_set: HashSet<_> = right.products.iter().collect();
        assert!(left_set.is_disjoint(&right_set));

        let union: HashSet<_> = left_set.union(&right_set).cloned().collect();
        let whole_set: HashSet<_> = whole.products.iter().collect();
        assert_eq!(union, whole_set);
        assert_eq!(left.total_bytes + right.total_bytes, whole.total_bytes);
    }

    #[tokio::test]
    async fn test_empty_window_is_not_an_error() {
        let window = SearchWindow::parse("2024-01-01", "2024-12-31").unwrap();
        let listing = list_products(&catalog(), "FSC", &tile(), &window)
            .await
            .unwrap();
        assert_eq!(listing, Listing::default());
    }

    #[tokio::test]
    async fn test_open_ended_window_uses_one_listing() {
        let store = catalog();
        let start = NaiveDate::from_ymd_opt(2025, 2, 3).unwrap();
        let window = SearchWindow::new(start, NaiveDate::MAX).unwrap();
        let listing = list_products(&store, "FSC", &tile(), &window)
            .await
            .unwrap();
        assert_eq!(
            listing.products,
            vec!["FSC/31TCH/2025/02/03/P3", "FSC/31TCH/2025/02/04/P4"]
        );
        assert_eq!(store.list_calls(), 1);
    }

    #[test]
    fn test_product_dir() {
        assert_eq!(
            product_dir("FSC/31TCH/2025/02/01/P1/a.tif"),
            "FSC/31TCH/2025/02/01/P1"
        );
        assert_eq!(product_dir("a.tif"), "");
    }
}
