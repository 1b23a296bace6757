//! Round trip against a real bucket
//!
//! Skipped unless `MULTIPUT_S3_TEST_BUCKET` is set. The region comes from
//! `MULTIPUT_S3_TEST_REGION`, an S3-compatible endpoint such as MinIO from
//! `MULTIPUT_S3_TEST_ENDPOINT`, and credentials from the default chain.

use multiput_cloud::{S3Settings, S3Store};
use multiput_core::{query_status, upload, Error, StatusQuery, UploadOptions, UploadStatus};
use multiput_testing::fixtures::create_random_source_file;
use multiput_testing::TestDir;
use std::sync::Arc;
use uuid::Uuid;

const MIB: usize = 1024 * 1024;

fn live_target() -> Option<(String, S3Settings)> {
    let bucket = std::env::var("MULTIPUT_S3_TEST_BUCKET").ok()?;
    let mut settings = S3Settings::default();
    if let Ok(region) = std::env::var("MULTIPUT_S3_TEST_REGION") {
        settings.region = region;
    }
    settings.endpoint = std::env::var("MULTIPUT_S3_TEST_ENDPOINT").ok();
    Some((bucket, settings))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_upload_then_status_ready() {
    let Some((bucket, settings)) = live_target() else {
        eprintln!("MULTIPUT_S3_TEST_BUCKET not set, skipping");
        return;
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();

    // S3 rejects non-final parts under 5 MiB
    let test_dir = TestDir::new().unwrap();
    let (path, _) = create_random_source_file(&test_dir, "live.bin", 11 * MIB + 17).unwrap();
    let key = format!("multiput-test/live/{}", Uuid::new_v4());

    let store = Arc::new(S3Store::connect(&settings).await);
    let report = upload(
        store.clone(),
        &path,
        &bucket,
        2,
        UploadOptions {
            parallelism: 2,
            file_key: Some(key.clone()),
        },
    )
    .await
    .unwrap();
    assert_eq!(report.parts, 3);

    let query = StatusQuery::new(&bucket, "multiput-test", "live", &key["multiput-test/live/".len()..]);
    assert_eq!(
        query_status(store.as_ref(), &query).await.unwrap(),
        UploadStatus::Ready
    );

    let absent = StatusQuery::new(&bucket, "multiput-test", "live", "never-uploaded");
    assert!(matches!(
        query_status(store.as_ref(), &absent).await,
        Err(Error::NotFound { .. })
    ));
}
