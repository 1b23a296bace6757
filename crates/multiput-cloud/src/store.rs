//! S3Store - the multipart capability surface over the AWS SDK

use crate::error::{head_error, missing_field, service_error};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart as SdkCompletedPart};
use aws_sdk_s3::Client;
use bytes::Bytes;
use multiput_core::config::{AwsConfig, DEFAULT_REGION};
use multiput_core::{
    CompletedObject, CompletedPart, MultipartStore, ObjectInfo, StoreError, UploadSession,
};
use tracing::{debug, trace};

/// Client configuration for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Settings {
    /// Region the bucket lives in
    pub region: String,
    /// Named profile from the shared AWS config files; the default chain when `None`
    pub profile: Option<String>,
    /// Endpoint override for S3-compatible stores, addressed path-style
    pub endpoint: Option<String>,
}

impl Default for S3Settings {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            profile: None,
            endpoint: None,
        }
    }
}

impl From<&AwsConfig> for S3Settings {
    fn from(config: &AwsConfig) -> Self {
        Self {
            region: config.region.clone(),
            profile: config.profile.clone(),
            endpoint: config.endpoint.clone(),
        }
    }
}

impl S3Settings {
    /// Whether requests address buckets in the path rather than the host name
    pub fn force_path_style(&self) -> bool {
        self.endpoint.is_some()
    }
}

/// Amazon S3 (or compatible) bucket access
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Build a client from `settings`
    ///
    /// Credentials resolve lazily on the first request, from the named profile
    /// when one is given and from the default provider chain otherwise.
    pub async fn connect(settings: &S3Settings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()));
        if let Some(profile) = &settings.profile {
            debug!("using AWS profile {}", profile);
            loader = loader.profile_name(profile);
        }
        if let Some(endpoint) = &settings.endpoint {
            debug!("using endpoint {}", endpoint);
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(settings.force_path_style())
            .build();

        Self::from_client(Client::from_conf(s3_config))
    }

    /// Wrap an already configured SDK client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn sdk_part_number(part_number: u32) -> Result<i32, StoreError> {
    i32::try_from(part_number)
        .map_err(|_| StoreError::Rejected(format!("part number {} out of range", part_number)))
}

#[async_trait]
impl MultipartStore for S3Store {
    async fn create_session(&self, bucket: &str, key: &str) -> Result<UploadSession, StoreError> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| service_error("CreateMultipartUpload", e))?;

        let session_id = output
            .upload_id()
            .ok_or_else(|| missing_field("CreateMultipartUpload", "UploadId"))?
            .to_string();

        Ok(UploadSession {
            bucket: bucket.to_string(),
            key: key.to_string(),
            session_id,
        })
    }

    async fn upload_part(
        &self,
        session: &UploadSession,
        part_number: u32,
        payload: Bytes,
    ) -> Result<CompletedPart, StoreError> {
        trace!(
            "UploadPart {} of {} ({} bytes)",
            part_number,
            session.session_id,
            payload.len()
        );
        let output = self
            .client
            .upload_part()
            .bucket(&session.bucket)
            .key(&session.key)
            .upload_id(&session.session_id)
            .part_number(sdk_part_number(part_number)?)
            .content_length(payload.len() as i64)
            .body(ByteStream::from(payload))
            .send()
            .await
            .map_err(|e| service_error("UploadPart", e))?;

        let etag = output
            .e_tag()
            .ok_or_else(|| missing_field("UploadPart", "ETag"))?
            .to_string();

        Ok(CompletedPart { part_number, etag })
    }

    async fn complete_session(
        &self,
        session: &UploadSession,
        parts: &[CompletedPart],
    ) -> Result<CompletedObject, StoreError> {
        let sdk_parts = parts
            .iter()
            .map(|part| {
                Ok(SdkCompletedPart::builder()
                    .e_tag(&part.etag)
                    .part_number(sdk_part_number(part.part_number)?)
                    .build())
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        let output = self
            .client
            .complete_multipart_upload()
            .bucket(&session.bucket)
            .key(&session.key)
            .upload_id(&session.session_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(sdk_parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| service_error("CompleteMultipartUpload", e))?;

        Ok(CompletedObject {
            bucket: output.bucket().unwrap_or(&session.bucket).to_string(),
            key: output.key().unwrap_or(&session.key).to_string(),
            etag: output.e_tag().map(str::to_string),
        })
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo, StoreError> {
        let output = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| head_error(bucket, key, e))?;

        Ok(ObjectInfo {
            key: key.to_string(),
            size: output.content_length().and_then(|n| u64::try_from(n).ok()),
            etag: output.e_tag().map(str::to_string),
        })
    }

    async fn list_sessions(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut key_marker: Option<String> = None;
        let mut upload_id_marker: Option<String> = None;

        loop {
            let output = self
                .client
                .list_multipart_uploads()
                .bucket(bucket)
                .prefix(prefix)
                .set_key_marker(key_marker.take())
                .set_upload_id_marker(upload_id_marker.take())
                .send()
                .await
                .map_err(|e| service_error("ListMultipartUploads", e))?;

            keys.extend(
                output
                    .uploads()
                    .iter()
                    .filter_map(|upload| upload.key().map(str::to_string)),
            );

            if !output.is_truncated().unwrap_or(false) {
                break;
            }
            key_marker = output.next_key_marker().map(str::to_string);
            upload_id_marker = output.next_upload_id_marker().map(str::to_string);
            if key_marker.is_none() && upload_id_marker.is_none() {
                break;
            }
        }

        debug!("{} active multipart uploads under {}", keys.len(), prefix);
        Ok(keys)
    }
}
