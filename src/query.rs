use crate::config::QueryConfig;
use crate::error::{Error, ValidationError};
use crate::lister;
use crate::resolver::{AreaOfInterest, TileResolver};
use crate::s3::CatalogStore;
use crate::window::SearchWindow;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub aoi: AreaOfInterest,
    pub product_types: Vec<String>,
    pub window: SearchWindow,
}

/// Distinct product directories, in discovery order, and their summed size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub products: Vec<String>,
    pub total_bytes: u64,
}

impl QueryResult {
    /// One product directory per line.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let content: String = self.products.iter().map(|p| format!("{p}\n")).collect();
        fs::write(path, content)
    }

    /// Blank lines are ignored; the byte total is not stored and reads as 0.
    pub fn read<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let content = fs::read_to_string(path)?;
        let products = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Self {
            products,
            total_bytes: 0,
        })
    }

    fn extend(&mut self, listing: lister::Listing, seen: &mut HashSet<String>) {
        self.total_bytes += listing.total_bytes;
        for product in listing.products {
            if seen.insert(product.clone()) {
                self.products.push(product);
            }
        }
    }
}

pub struct QueryEngine<'a, S> {
    store: &'a S,
    resolver: &'a TileResolver,
    config: &'a QueryConfig,
}

impl<'a, S: CatalogStore> QueryEngine<'a, S> {
    pub fn new(store: &'a S, resolver: &'a TileResolver, config: &'a QueryConfig) -> Self {
        Self {
            store,
            resolver,
            config,
        }
    }

    /// Resolves the area of interest, checks the product types against the
    /// catalog, then lists every (product type, tile) pair over the window.
    /// Tiles are resolved before any catalog call so an empty area fails
    /// without touching the network.
    pub async fn build_query(&self, request: &QueryRequest) -> Result<QueryResult, Error> {
        let tiles = self.resolver.resolve(&request.aoi)?;
        if tiles.is_empty() {
            return Err(ValidationError::NoTiles.into());
        }

        for product_type in &request.product_types {
            if !self.store.has_prefix(&format!("{product_type}/")).await? {
                return Err(ValidationError::UnknownProductType(product_type.clone()).into());
            }
        }

        info!(
            "Query parameters: tiles {:?}, product types {:?}",
            tiles.iter().map(|t| t.as_str()).collect::<Vec<_>>(),
            request.product_types
        );
        info!("Search period : {}", request.window);

        let mut result = QueryResult::default();
        let mut seen = HashSet::new();
        for product_type in &request.product_types {
            info!("    Looking for product type : {product_type}");
            for tile in &tiles {
                let listing =
                    lister::list_products(self.store, product_type, tile, &request.window).await?;
                result.extend(listing, &mut seen);
            }
        }

        info!("Total number of products found : {}", result.products.len());
        if result.products.is_empty() {
            warn!("No product found for the entire query !");
        }
        info!(
            "Total size of products found (Mb): {}",
            (result.total_bytes as f64 / 1_000_000.0).round()
        );
        if result.products.len() > self.config.max_results {
            warn!(
                "Nb of products ({}) above the download threshold of {}",
                result.products.len(),
                self.config.max_results
            );
        }
        Ok(result)
    }

    /// Writes the result to the query file in `output_dir`, replacing any
    /// previous one.
    pub fn persist(&self, result: &QueryResult, output_dir: &Path) -> Result<PathBuf, Error> {
        let path = output_dir.join(&self.config.artifact_name);
        info!("Listing query results in {}", path.display());
        result.write(&path)?;
        Ok(path)
    }
}
