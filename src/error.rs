use std::path::PathBuf;
use thiserror::Error;

/// Exit status for argument and input validation failures.
pub const EXIT_VALIDATION: i32 = -2;
pub const EXIT_NOT_FOUND: i32 = 12;
pub const EXIT_ACCESS_DENIED: i32 = 78;
pub const EXIT_FAILURE: i32 = 1;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("{0}")]
    Argument(String),
    #[error("--date-start or --date-end : invalid date '{0}', expected YYYY-MM-DD")]
    DateFormat(String),
    #[error("--date-start {start} is after --date-end {end}")]
    DateOrder { start: String, end: String },
    #[error("--tiles : {0} has an incorrect tile format, should be T##XXX or ##XXX")]
    TileFormat(String),
    #[error("--epsg : {0}")]
    Crs(String),
    #[error("geometry : {0}")]
    Geometry(String),
    #[error("geometry : only Polygon or MultiPolygon is accepted, got {0}")]
    UnsupportedGeometry(String),
    #[error("--vector : unable to read {path}: {reason}")]
    Vector { path: PathBuf, reason: String },
    #[error("tile grid : unable to read {path}: {reason}")]
    Grid { path: PathBuf, reason: String },
    #[error("--product-type : {0} does not exist")]
    UnknownProductType(String),
    #[error("No tiles were identified")]
    NoTiles,
}

/// Failure classes a catalog operation can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NotFound,
    AccessDenied,
    TransientUnavailable,
    Unexpected,
}

impl FailureKind {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::NotFound => EXIT_NOT_FOUND,
            Self::AccessDenied => EXIT_ACCESS_DENIED,
            // A transient failure that outlived its retries is a plain failure
            Self::TransientUnavailable | Self::Unexpected => EXIT_FAILURE,
        }
    }
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("The file does not exist: {0}")]
    NotFound(String),
    #[error("Access denied, check your permissions: {0}")]
    AccessDenied(String),
    #[error("S3 503 error (Service Unavailable): {0}")]
    ServiceUnavailable(String),
    #[error("Unable to reach the catalog endpoint: {0}")]
    Connectivity(String),
    #[error("Unexpected error: {0}")]
    Unexpected(String),
    #[error("Local file error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotFound(_) => FailureKind::NotFound,
            Self::AccessDenied(_) => FailureKind::AccessDenied,
            Self::ServiceUnavailable(_) | Self::Connectivity(_) => {
                FailureKind::TransientUnavailable
            }
            Self::Unexpected(_) | Self::Io(_) => FailureKind::Unexpected,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == FailureKind::TransientUnavailable
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Error while parsing query_file {path}: {source}")]
    Artifact {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Nb of products ({count}) above the download threshold of {threshold}")]
    DownloadThreshold { count: usize, threshold: usize },
    #[error("download of {product} failed after {attempts} attempt(s): {source}")]
    Download {
        product: String,
        attempts: u32,
        source: CatalogError,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => EXIT_VALIDATION,
            // Not-found and access-denied statuses only report download failures
            Self::Download { source, .. } => source.kind().exit_code(),
            Self::Catalog(_)
            | Self::Artifact { .. }
            | Self::DownloadThreshold { .. }
            | Self::Io(_) => EXIT_FAILURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classes() {
        assert!(CatalogError::ServiceUnavailable("503".into()).is_transient());
        assert!(CatalogError::Connectivity("dns".into()).is_transient());
        assert!(!CatalogError::NotFound("404".into()).is_transient());
        assert!(!CatalogError::AccessDenied("403".into()).is_transient());
        assert!(!CatalogError::Unexpected("500".into()).is_transient());
    }

    #[test]
    fn test_exit_codes() {
        let download = |source| Error::Download {
            product: "FSC/31TCH/2025/02/01/P1".to_string(),
            attempts: 1,
            source,
        };
        assert_eq!(Error::from(ValidationError::NoTiles).exit_code(), -2);
        assert_eq!(download(CatalogError::NotFound("k".into())).exit_code(), 12);
        assert_eq!(download(CatalogError::AccessDenied("k".into())).exit_code(), 78);
        assert_eq!(download(CatalogError::ServiceUnavailable("k".into())).exit_code(), 1);
        assert_eq!(download(CatalogError::Unexpected("k".into())).exit_code(), 1);
        let threshold = Error::DownloadThreshold {
            count: 501,
            threshold: 500,
        };
        assert_eq!(threshold.exit_code(), 1);
    }

    #[test]
    fn test_query_time_catalog_errors_are_plain_failures() {
        assert_eq!(Error::from(CatalogError::AccessDenied("FSC/".into())).exit_code(), 1);
        assert_eq!(Error::from(CatalogError::NotFound("HRWSI".into())).exit_code(), 1);
        assert_eq!(Error::from(CatalogError::Connectivity("dns".into())).exit_code(), 1);
    }
}
