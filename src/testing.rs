//! In-memory catalog emulating the ordered, marker-seeded listing of an S3 bucket.
use crate::error::CatalogError;
use crate::s3::{CatalogObject, CatalogStore};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryCatalog {
    objects: BTreeMap<String, Vec<u8>>,
    list_calls: Mutex<usize>,
    download_calls: Mutex<usize>,
    // Errors replayed, in order, by downloads of keys under a prefix
    download_failures: Mutex<FailureQueues>,
    // Errors replayed, in order, by listings of a prefix
    listing_failures: Mutex<FailureQueues>,
}

type FailureQueues = HashMap<String, VecDeque<CatalogError>>;

fn next_failure(queues: &Mutex<FailureQueues>, path: &str) -> Option<CatalogError> {
    let mut queues = queues.lock().unwrap();
    queues
        .iter_mut()
        .find(|(prefix, queue)| path.starts_with(prefix.as_str()) && !queue.is_empty())
        .and_then(|(_, queue)| queue.pop_front())
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys(keys: &[&str]) -> Self {
        let mut catalog = Self::new();
        for key in keys {
            catalog.insert(key, key.as_bytes());
        }
        catalog
    }

    pub fn insert(&mut self, key: &str, content: &[u8]) {
        self.objects.insert(key.to_string(), content.to_vec());
    }

    pub fn fail_downloads(&self, prefix: &str, errors: Vec<CatalogError>) {
        self.download_failures
            .lock()
            .unwrap()
            .entry(prefix.to_string())
            .or_default()
            .extend(errors);
    }

    pub fn fail_listings(&self, prefix: &str, errors: Vec<CatalogError>) {
        self.listing_failures
            .lock()
            .unwrap()
            .entry(prefix.to_string())
            .or_default()
            .extend(errors);
    }

    pub fn list_calls(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }

    pub fn download_calls(&self) -> usize {
        *self.download_calls.lock().unwrap()
    }
}

impl CatalogStore for MemoryCatalog {
    async fn list_objects(
        self: &Self,
        prefix: &str,
        marker: Option<&str>,
    ) -> Result<Vec<CatalogObject>, CatalogError> {
        *self.list_calls.lock().unwrap() += 1;
        if let Some(err) = next_failure(&self.listing_failures, prefix) {
            return Err(err);
        }
        Ok(self
            .objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .filter(|(key, _)| marker.map_or(true, |m| key.as_str() > m))
            .map(|(key, content)| CatalogObject {
                key: key.clone(),
                size: content.len() as u64,
            })
            .collect())
    }

    async fn has_prefix(self: &Self, prefix: &str) -> Result<bool, CatalogError> {
        *self.list_calls.lock().unwrap() += 1;
        Ok(self.objects.keys().any(|key| key.starts_with(prefix)))
    }

    async fn download(self: &Self, key: &str, dst: &Path) -> Result<u64, CatalogError> {
        *self.download_calls.lock().unwrap() += 1;
        if let Some(err) = next_failure(&self.download_failures, key) {
            return Err(err);
        }
        let content = self
            .objects
            .get(key)
            .ok_or_else(|| CatalogError::NotFound(key.to_string()))?;
        fs::write(dst, content)?;
        Ok(content.len() as u64)
    }
}
