//! Utility functions for creating s3 clients, and the catalog boundary the
//! query and download logic is written against
use crate::config::CatalogConfig;
use crate::error::CatalogError;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::Client;
use std::path::Path;

/// An object as returned by a catalog listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CatalogObject {
    pub key: String,
    pub size: u64,
}

/// Builds a client for the catalog endpoint. Credentials come from the
/// standard provider chain, optionally narrowed to a named profile.
pub async fn client_from_config(config: &CatalogConfig) -> Client {
    let mut loader = aws_config::from_env();
    if let Some(profile) = &config.profile {
        loader = loader.profile_name(profile);
    }
    let base_config = loader.load().await;

    let s3_config = aws_sdk_s3::config::Builder::from(&base_config)
        .endpoint_url(&config.endpoint_url)
        .region(Region::new(config.region.clone()))
        .force_path_style(true)
        .build();

    Client::from_conf(s3_config)
}

pub trait CatalogStore {
    /// Every object under `prefix` whose key sorts strictly after `marker`,
    /// in ascending key order.
    async fn list_objects(
        self: &Self,
        prefix: &str,
        marker: Option<&str>,
    ) -> Result<Vec<CatalogObject>, CatalogError>;

    /// Whether at least one object exists under `prefix`.
    async fn has_prefix(self: &Self, prefix: &str) -> Result<bool, CatalogError>;

    /// Writes the object at `key` to `dst`, returning the number of bytes written.
    async fn download(self: &Self, key: &str, dst: &Path) -> Result<u64, CatalogError>;
}
