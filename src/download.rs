use crate::config::DownloadConfig;
use crate::error::{CatalogError, Error, FailureKind};
use crate::query::QueryResult;
use crate::s3::CatalogStore;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// How the download of one product ended.
#[derive(Debug)]
pub enum DownloadOutcome {
    Downloaded {
        files: usize,
        bytes: u64,
        attempts: u32,
    },
    Failed {
        attempts: u32,
        error: CatalogError,
    },
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Downloaded { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Downloaded { .. } => None,
            Self::Failed { error, .. } => Some(error.kind()),
        }
    }
}

#[derive(Debug)]
pub struct ProductOutcome {
    pub product: String,
    pub outcome: DownloadOutcome,
}

/// Per-product outcomes of a run, in artifact order. A run stops at the
/// first failed product, so only the last entry can be a failure.
#[derive(Debug, Default)]
pub struct DownloadReport {
    pub outcomes: Vec<ProductOutcome>,
}

impl DownloadReport {
    pub fn downloaded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_success()).count()
    }

    /// The run's final verdict: the report itself, or the failure that ended it.
    pub fn into_result(mut self) -> Result<Self, Error> {
        match self.outcomes.pop() {
            Some(ProductOutcome {
                product,
                outcome: DownloadOutcome::Failed { attempts, error },
            }) => Err(Error::Download {
                product,
                attempts,
                source: error,
            }),
            Some(last) => {
                self.outcomes.push(last);
                Ok(self)
            }
            None => Ok(self),
        }
    }
}

struct Transfer {
    files: usize,
    bytes: u64,
}

pub struct DownloadExecutor<'a, S> {
    store: &'a S,
    config: &'a DownloadConfig,
    output_root: PathBuf,
}

impl<'a, S: CatalogStore> DownloadExecutor<'a, S> {
    pub fn new(store: &'a S, config: &'a DownloadConfig, output_root: &Path) -> Self {
        Self {
            store,
            config,
            output_root: output_root.to_path_buf(),
        }
    }

    /// Directory every product is downloaded into.
    pub fn result_dir(&self) -> PathBuf {
        self.output_root.join(&self.config.result_dir)
    }

    /// Downloads every product listed in the query file at `artifact`.
    pub async fn run(&self, artifact: &Path) -> Result<DownloadReport, Error> {
        let products = QueryResult::read(artifact)
            .map_err(|source| Error::Artifact {
                path: artifact.to_path_buf(),
                source,
            })?
            .products;
        self.execute(&products).await
    }

    pub async fn execute(&self, products: &[String]) -> Result<DownloadReport, Error> {
        if products.len() > self.config.max_products {
            return Err(Error::DownloadThreshold {
                count: products.len(),
                threshold: self.config.max_products,
            });
        }

        info!("start downloading {} products", products.len());
        let mut report = DownloadReport::default();
        for (index, product) in products.iter().enumerate() {
            info!("[{}/{}] {product}", index + 1, products.len());
            let outcome = self.download_product(product).await;
            let failed = !outcome.is_success();
            report.outcomes.push(ProductOutcome {
                product: product.clone(),
                outcome,
            });
            if failed {
                break;
            }
        }
        Ok(report)
    }

    /// Retries the whole product on transient failures, up to the configured
    /// number of attempts with a fixed delay between them.
    pub async fn download_product(&self, product: &str) -> DownloadOutcome {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.try_download_product(product).await {
                Ok(Transfer { files, bytes }) => {
                    return DownloadOutcome::Downloaded {
                        files,
                        bytes,
                        attempts: attempt,
                    }
                }
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    warn!(
                        "{product}: {err}, retrying in {}s ({attempt}/{max_attempts})",
                        self.config.retry_delay_secs
                    );
                    tokio::time::sleep(self.config.retry_delay()).await;
                    attempt += 1;
                }
                Err(err) => {
                    error!("{product}: {err}");
                    return DownloadOutcome::Failed {
                        attempts: attempt,
                        error: err,
                    };
                }
            }
        }
    }

    async fn try_download_product(&self, product: &str) -> Result<Transfer, CatalogError> {
        let product = product.trim_end_matches('/');
        let product_name = base_name(product);
        let objects = self
            .store
            .list_objects(&format!("{product}/"), None)
            .await?;

        let mut transfer = Transfer { files: 0, bytes: 0 };
        for object in objects {
            let dst = self
                .result_dir()
                .join(product_name)
                .join(base_name(&object.key));
            if let Some(parent) = dst.parent() {
                fs::create_dir_all(parent)?;
            }
            transfer.bytes += self.store.download(&object.key, &dst).await?;
            transfer.files += 1;
        }
        Ok(transfer)
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
