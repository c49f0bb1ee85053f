use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::s3::{self, CatalogObject, CatalogStore};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::Client;
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// The HR-WSI catalog bucket behind an S3-compatible endpoint.
pub struct Hrwsi {
    client: Client,
    bucket: String,
}

impl Hrwsi {
    pub fn new(client: Client, bucket: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
        }
    }

    pub async fn from_config(config: &CatalogConfig) -> Self {
        info!(
            "Set S3 client to access bucket {} at {}",
            config.bucket, config.endpoint_url
        );
        let client = s3::client_from_config(config).await;
        Self::new(client, &config.bucket)
    }
}

impl CatalogStore for Hrwsi {
    async fn list_objects(
        self: &Self,
        prefix: &str,
        marker: Option<&str>,
    ) -> Result<Vec<CatalogObject>, CatalogError> {
        let mut objects: Vec<CatalogObject> = vec![];
        let mut marker = marker.map(str::to_owned);

        loop {
            let output = self
                .client
                .list_objects()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_marker(marker.clone())
                .send()
                .await
                .map_err(classify_sdk_error)?;

            for object in output.contents() {
                if let Some(key) = object.key() {
                    objects.push(CatalogObject {
                        key: key.to_string(),
                        size: object.size().unwrap_or_default().max(0) as u64,
                    });
                }
            }

            marker = next_page_marker(
                output.is_truncated().unwrap_or(false),
                output.next_marker(),
                objects.last().map(|o| o.key.as_str()),
            );
            if marker.is_none() {
                break;
            }
            debug!("Listing {prefix} continues after {marker:?}");
        }
        Ok(objects)
    }

    async fn has_prefix(self: &Self, prefix: &str) -> Result<bool, CatalogError> {
        let output = self
            .client
            .list_objects()
            .bucket(&self.bucket)
            .prefix(prefix)
            .max_keys(1)
            .send()
            .await
            .map_err(classify_sdk_error)?;
        Ok(!output.contents().is_empty())
    }

    async fn download(self: &Self, key: &str, dst: &Path) -> Result<u64, CatalogError> {
        let mut object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        let mut file = File::create(dst)?;
        let mut byte_count = 0_u64;
        while let Some(bytes) = object
            .body
            .try_next()
            .await
            .map_err(|e| CatalogError::Connectivity(DisplayErrorContext(&e).to_string()))?
        {
            file.write_all(&bytes)?;
            byte_count += bytes.len() as u64;
        }
        Ok(byte_count)
    }
}

/// Marker of the next ListObjects page, `None` once the listing is complete.
/// NextMarker is only sent alongside a delimiter; otherwise the listing
/// resumes after the last key received.
fn next_page_marker(
    is_truncated: bool,
    next_marker: Option<&str>,
    last_key: Option<&str>,
) -> Option<String> {
    if !is_truncated {
        return None;
    }
    next_marker.or(last_key).map(str::to_owned)
}

fn classify_sdk_error<E>(err: SdkError<E, HttpResponse>) -> CatalogError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let message = DisplayErrorContext(&err).to_string();
    let status = match &err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            return CatalogError::Connectivity(message)
        }
        SdkError::ServiceError(e) => Some(e.raw().status().as_u16()),
        SdkError::ResponseError(e) => Some(e.raw().status().as_u16()),
        _ => None,
    };
    classify(status, err.code(), message)
}

/// Maps an HTTP status and S3 error code onto a catalog failure class.
/// The status wins when both are present.
fn classify(status: Option<u16>, code: Option<&str>, message: String) -> CatalogError {
    match (status, code) {
        (Some(404), _) => CatalogError::NotFound(message),
        (Some(403), _) => CatalogError::AccessDenied(message),
        (Some(503), _) => CatalogError::ServiceUnavailable(message),
        (_, Some("NoSuchKey" | "NoSuchBucket" | "NotFound")) => CatalogError::NotFound(message),
        (_, Some("AccessDenied" | "Forbidden")) => CatalogError::AccessDenied(message),
        (_, Some("ServiceUnavailable" | "SlowDown")) => CatalogError::ServiceUnavailable(message),
        _ => CatalogError::Unexpected(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    fn kind(status: Option<u16>, code: Option<&str>) -> FailureKind {
        classify(status, code, String::new()).kind()
    }

    #[test]
    fn test_classify_by_status() {
        assert_eq!(kind(Some(404), None), FailureKind::NotFound);
        assert_eq!(kind(Some(403), None), FailureKind::AccessDenied);
        assert_eq!(kind(Some(503), None), FailureKind::TransientUnavailable);
        assert_eq!(kind(Some(500), None), FailureKind::Unexpected);
    }

    #[test]
    fn test_classify_by_code() {
        assert_eq!(kind(None, Some("NoSuchKey")), FailureKind::NotFound);
        assert_eq!(kind(None, Some("AccessDenied")), FailureKind::AccessDenied);
        assert_eq!(kind(None, Some("SlowDown")), FailureKind::TransientUnavailable);
        assert_eq!(kind(None, Some("InternalError")), FailureKind::Unexpected);
        assert_eq!(kind(None, None), FailureKind::Unexpected);
    }

    #[test]
    fn test_next_page_marker() {
        let last = Some("FSC/31TCH/2025/02/01/P1/b.xml");
        assert_eq!(next_page_marker(false, None, last), None);
        assert_eq!(
            next_page_marker(true, None, last).as_deref(),
            Some("FSC/31TCH/2025/02/01/P1/b.xml")
        );
        assert_eq!(
            next_page_marker(true, Some("FSC/31TCH/2025/02/01/P1/"), last).as_deref(),
            Some("FSC/31TCH/2025/02/01/P1/")
        );
        assert_eq!(next_page_marker(true, None, None), None);
    }

    #[test]
    fn test_status_takes_precedence() {
        assert_eq!(kind(Some(403), Some("NoSuchKey")), FailureKind::AccessDenied);
    }
}
