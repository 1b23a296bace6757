//! Mapping of AWS SDK failures onto store errors

use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::head_object::HeadObjectError;
use multiput_core::StoreError;

/// Any SDK failure becomes a service error tagged with the operation name
pub(crate) fn service_error<E, R>(operation: &str, err: SdkError<E, R>) -> StoreError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    StoreError::Service(format!("{} failed: {}", operation, DisplayErrorContext(err)))
}

/// Head probes separate "no such key" from every other failure
pub(crate) fn head_error(
    bucket: &str,
    key: &str,
    err: SdkError<HeadObjectError, HttpResponse>,
) -> StoreError {
    let modeled = err
        .as_service_error()
        .map(HeadObjectError::is_not_found)
        .unwrap_or(false);
    let status = err.raw_response().map(|response| response.status().as_u16());

    if is_missing(modeled, status) {
        StoreError::NotFound(format!("{}/{}", bucket, key))
    } else {
        service_error("HeadObject", err)
    }
}

/// A head probe failed because the key does not exist
///
/// HEAD responses carry no body, so a bare 404 counts even when the SDK
/// could not model the error.
pub(crate) fn is_missing(modeled_not_found: bool, status: Option<u16>) -> bool {
    modeled_not_found || status == Some(404)
}

/// A response that should have carried a field did not
pub(crate) fn missing_field(operation: &str, field: &str) -> StoreError {
    StoreError::Rejected(format!("{} response has no {}", operation, field))
}
