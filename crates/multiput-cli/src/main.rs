//! multiput - Command-line interface for parallel multipart uploads
//!
//! Two operations are exposed:
//! - `upload` splits a local file into chunks and uploads them as the parts of
//!   one multipart session
//! - `status` reports whether an upload is ready, still creating, or absent

use anyhow::Result;
use clap::{Parser, Subcommand};
use multiput_cloud::{build_runtime, S3Settings, S3Store};
use multiput_core::config::{AwsConfig, Config};
use multiput_core::progress::ProgressReporter;
use multiput_core::{Stage, StatusQuery, UploadOptions};
use std::fmt;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// multiput - Upload large files to S3 as parallel multipart uploads
#[derive(Parser)]
#[command(name = "multiput")]
#[command(author, version, about = "Upload large files to S3 as parallel multipart uploads", long_about = None)]
struct Cli {
    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a local file as one object
    Upload {
        /// Local file to upload
        source: PathBuf,

        /// Destination bucket
        bucket: String,

        /// Number of chunks the file is split into
        chunks: Option<u64>,

        /// Named profile from the shared AWS config
        #[arg(long)]
        profile: Option<String>,

        /// Bucket region
        #[arg(long)]
        region: Option<String>,

        /// Number of simultaneously running part uploads
        #[arg(short, long)]
        parallel: Option<u64>,

        /// Object key; a fresh UUID when omitted
        #[arg(long)]
        file_key: Option<String>,

        /// Endpoint override for S3-compatible stores
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Report whether an upload is ready or still being created
    Status {
        /// Bucket holding the upload
        bucket: String,

        /// User segment of the key
        user: String,

        /// Application segment of the key
        app: String,

        /// File segment of the key
        file_key: String,

        /// Named profile from the shared AWS config
        #[arg(long)]
        profile: Option<String>,

        /// Bucket region
        #[arg(long)]
        region: Option<String>,

        /// Endpoint override for S3-compatible stores
        #[arg(long)]
        endpoint: Option<String>,

        /// Output format as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or initialize configuration
    Config {
        /// Show current configuration
        #[arg(long, conflicts_with_all = ["path", "init"])]
        show: bool,

        /// Show configuration file path
        #[arg(long, conflicts_with_all = ["show", "init"])]
        path: bool,

        /// Write the default configuration file
        #[arg(long, conflicts_with_all = ["show", "path"])]
        init: bool,
    },
}

/// An upload failure the orchestrator has already logged
#[derive(Debug)]
struct Reported(multiput_core::Error);

impl fmt::Display for Reported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for Reported {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.0)
    }
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    match run() {
        Ok(()) => process::exit(0),
        Err(e) => {
            if !e.is::<Reported>() {
                error!("Error: {}", e);
            }
            process::exit(map_error_to_exit_code(&e));
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Upload {
            source,
            bucket,
            chunks,
            profile,
            region,
            parallel,
            file_key,
            endpoint,
        } => {
            let config = Config::load()?;
            let chunk_count = chunks.unwrap_or(config.upload.chunks);
            let parallelism = parallel.unwrap_or(config.upload.parallel);
            let settings = connection_settings(&config.aws, profile, region, endpoint);
            debug!("connection settings: {:?}", settings);

            let options = UploadOptions {
                parallelism,
                file_key,
            };
            let progress = Arc::new(ProgressReporter::new(!cli.quiet));

            let runtime = build_runtime(usize::try_from(parallelism).unwrap_or(usize::MAX))?;
            let report = runtime.block_on(async {
                let store = Arc::new(S3Store::connect(&settings).await);
                multiput_core::upload_with_progress(
                    store,
                    &source,
                    &bucket,
                    chunk_count,
                    options,
                    progress,
                )
                .await
            });

            match report {
                Ok(report) => {
                    info!("{} parts assembled into {}", report.parts, report.key);
                    println!("{} uploaded to {}", report.key, report.bucket);
                }
                Err(e) => return Err(Reported(e).into()),
            }
        }

        Commands::Status {
            bucket,
            user,
            app,
            file_key,
            profile,
            region,
            endpoint,
            json,
        } => {
            let config = Config::load()?;
            let settings = connection_settings(&config.aws, profile, region, endpoint);
            let query = StatusQuery::new(bucket, user, app, file_key);
            debug!("querying status of {} in {}", query.key(), query.bucket);

            let runtime = build_runtime(1)?;
            let status = runtime.block_on(async {
                let store = S3Store::connect(&settings).await;
                multiput_core::query_status(&store, &query).await
            })?;

            if json {
                let output = serde_json::json!({ "status": status });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("{}", status);
            }
        }

        Commands::Config { show, path, init } => {
            if show {
                let config = Config::load()?;
                println!("{}", toml::to_string_pretty(&config)?);
            } else if path {
                println!("{}", Config::config_path()?.display());
            } else if init {
                let config_path = Config::config_path()?;
                if config_path.exists() {
                    info!(
                        "Configuration already exists at {}",
                        config_path.display()
                    );
                } else {
                    let written = Config::init()?;
                    info!("Default configuration written to {}", written.display());
                }
                println!("{}", config_path.display());
            } else {
                eprintln!("Please specify --show, --path, or --init");
            }
        }
    }

    Ok(())
}

/// Command-line flags win over the config file
fn connection_settings(
    aws: &AwsConfig,
    profile: Option<String>,
    region: Option<String>,
    endpoint: Option<String>,
) -> S3Settings {
    let mut settings = S3Settings::from(aws);
    if let Some(profile) = profile {
        settings.profile = Some(profile);
    }
    if let Some(region) = region {
        settings.region = region;
    }
    if let Some(endpoint) = endpoint {
        settings.endpoint = Some(endpoint);
    }
    settings
}

/// Map errors to exit codes:
/// - 0: Success
/// - 1: General error, including a failed upload
/// - 2: IO error on the local source
/// - 3: Invalid arguments or chunk plan
/// - 4: Upload not found
fn map_error_to_exit_code(err: &anyhow::Error) -> i32 {
    let core_err = err
        .downcast_ref::<Reported>()
        .map(|reported| &reported.0)
        .or_else(|| err.downcast_ref::<multiput_core::Error>());

    if let Some(core_err) = core_err {
        match core_err {
            multiput_core::Error::Upload {
                stage: Stage::Stat | Stage::Open,
                ..
            } => 2,
            multiput_core::Error::Upload { .. } => 1,
            multiput_core::Error::Io(_) => 2,
            multiput_core::Error::InvalidPlan(_) => 3,
            multiput_core::Error::NotFound { .. } => 4,
            multiput_core::Error::Store(_) => 1,
            multiput_core::Error::Config(_) => 1,
            multiput_core::Error::Join(_) => 1,
        }
    } else if err.is::<std::io::Error>() {
        2
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multiput_core::StoreError;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_config() {
        let aws = AwsConfig {
            region: "eu-west-3".into(),
            profile: Some("from-file".into()),
            endpoint: None,
        };

        let settings = connection_settings(&aws, None, Some("us-west-2".into()), None);
        assert_eq!(settings.region, "us-west-2");
        assert_eq!(settings.profile.as_deref(), Some("from-file"));

        let settings = connection_settings(&aws, Some("cli".into()), None, None);
        assert_eq!(settings.profile.as_deref(), Some("cli"));
        assert_eq!(settings.region, "eu-west-3");
    }

    #[test]
    fn test_exit_codes() {
        let not_found = anyhow::Error::new(multiput_core::Error::NotFound { key: "f".into() });
        assert_eq!(map_error_to_exit_code(&not_found), 4);

        let plan = anyhow::Error::new(Reported(multiput_core::Error::InvalidPlan("zero".into())));
        assert_eq!(map_error_to_exit_code(&plan), 3);

        let missing = multiput_core::Error::from(std::io::Error::from(std::io::ErrorKind::NotFound))
            .at(Stage::Stat);
        assert_eq!(map_error_to_exit_code(&Reported(missing).into()), 2);

        let part = multiput_core::Error::from(StoreError::Service("boom".into())).at(Stage::UploadPart);
        assert_eq!(map_error_to_exit_code(&Reported(part).into()), 1);

        assert_eq!(map_error_to_exit_code(&anyhow::anyhow!("other")), 1);
    }
}
